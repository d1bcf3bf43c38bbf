use std::error::Error;

use lattice::f;
use lattice::Activations;
use lattice::DenseNet;
use lattice::DerivativeCache;
use rand::{prelude::*, thread_rng};

fn gen_training_data() -> (Vec<f64>, Vec<f64>) {
    let mut rng = thread_rng();

    let classes: Vec<(Vec<f64>, Vec<f64>)> = vec![
        (vec![0., 1.], vec![1., 0.]),
        (vec![1., 1.], vec![0., 1.]),
        (vec![1., 0.], vec![1., 0.]),
        (vec![0., 0.], vec![0., 1.]),
    ];

    let data = classes.choose(&mut rng).unwrap();
    (data.0.clone(), data.1.clone())
}

fn main() -> Result<(), Box<dyn Error>> {
    let (mut x, mut y) = (vec![], vec![]);
    for _ in 0..5000 {
        let (_x, _y) = gen_training_data();
        x.push(_x);
        y.push(_y);
    }

    let mut net = DenseNet::new(
        -1.,
        1.,
        1234,
        &[
            (2, Activations::Linear),
            (4, Activations::Sigmoid),
            (2, Activations::Sigmoid),
        ],
    )?;

    net.set_derivative_cache(DerivativeCache::Analytic)
        .get_trainer()
        .set_learning_rate(0.5)
        .set_decay(0.999)
        .set_epochs(3000)
        .set_sample_size(4)
        .verbose()
        .train(x, y)?;

    let mut correct = 0;
    let mut total = 0;

    for _ in 0..50 {
        let (tx, ty) = gen_training_data();
        let y_pred = net.predict(&tx)?;

        total += 1;
        if f::argmax(&y_pred) == f::argmax(&ty) {
            correct += 1;
        }
    }

    println!("Accuracy: {}%", (correct as f64 / total as f64) * 100.);
    Ok(())
}
