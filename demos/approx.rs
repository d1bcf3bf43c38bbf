use std::error::Error;

use lattice::{Activations, Dataset, DenseNet, DerivativeCache};
use rand::{prelude::*, thread_rng};

fn gen_xy(size: usize) -> Dataset {
    let mut rng = thread_rng();

    let mutator = |x: f64| x.powi(2);

    let (mut x, mut y): Dataset = (vec![], vec![]);

    for _ in 0..size {
        let xv: f64 = rng.gen_range(0.0..1.0);
        x.push(vec![xv]);
        y.push(vec![mutator(xv)]);
    }

    (x, y)
}

fn main() -> Result<(), Box<dyn Error>> {
    let (x, y) = gen_xy(10000);

    let mut net = DenseNet::new(
        -0.5,
        0.5,
        99,
        &[
            (1, Activations::Linear),
            (8, Activations::Tanh),
            (1, Activations::Linear),
        ],
    )?;

    net.set_derivative_cache(DerivativeCache::Analytic)
        .get_trainer()
        .set_learning_rate(0.05)
        .set_decay(0.999)
        .set_epochs(2000)
        .set_sample_size(32)
        .until(100, 1e-6)
        .train(x, y)?
        .loss_graph();

    let (x, y) = gen_xy(10);
    let testxy = x.into_iter().zip(y.into_iter());

    for (x, y) in testxy {
        let y_pred = net.predict(&x)?;
        println!("{:?} =?= {:?}", y_pred, y);
    }

    Ok(())
}
