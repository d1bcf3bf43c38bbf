use plotly::{Bar, Plot};
use rand::{prelude::*, thread_rng};

use crate::f;

use super::dense::{DenseNet, NetError};

#[derive(Clone)]
pub struct Hyper {
    pub epochs: usize,
    pub sample_size: usize,
    pub learning_rate: f64,
    pub decay: f64,
}

impl Hyper {
    pub fn new() -> Hyper {
        Hyper {
            learning_rate: 0.001,
            decay: 1.,
            epochs: 1000,
            sample_size: 10,
        }
    }
}

/// Per-example gradient descent over a dataset. Each epoch draws a random
/// sample of examples and runs one full pass plus one training step for
/// every example in it; the sampling only picks which examples are seen,
/// gradients are never accumulated across them.
pub struct Trainer<'a> {
    net: &'a mut DenseNet,
    hyper: Hyper,
    losses: Vec<f64>,
    early_terminate: Box<dyn Fn(&Vec<f64>) -> bool>,
    verbose: bool,
}

impl Trainer<'_> {
    pub fn new(net: &mut DenseNet) -> Trainer {
        Trainer {
            net,
            hyper: Hyper::new(),
            early_terminate: Box::new(|_| false),
            losses: vec![],
            verbose: false,
        }
    }

    pub fn override_hyper(&mut self, hyper: Hyper) -> &mut Self {
        self.hyper = hyper;
        self
    }

    pub fn verbose(&mut self) -> &mut Self {
        self.verbose = true;
        self
    }

    pub fn set_learning_rate(&mut self, rate: f64) -> &mut Self {
        self.hyper.learning_rate = rate;
        self
    }

    pub fn set_decay(&mut self, decay: f64) -> &mut Self {
        self.hyper.decay = decay;
        self
    }

    pub fn set_epochs(&mut self, epochs: usize) -> &mut Self {
        self.hyper.epochs = epochs;
        self
    }

    pub fn set_sample_size(&mut self, sample_size: usize) -> &mut Self {
        self.hyper.sample_size = sample_size;
        self
    }

    /// Stop once the average epoch-over-epoch loss improvement across the
    /// last `patience` epochs falls below `min_delta`.
    pub fn until(&mut self, patience: usize, min_delta: f64) -> &mut Self {
        let early_terminate = move |losses: &Vec<f64>| {
            let len = losses.len();
            if patience + 2 > len {
                return false;
            }

            let mut deltas: Vec<f64> = vec![];
            for i in ((len - patience)..len).rev() {
                deltas.push(losses[i - 1] - losses[i]);
            }

            let avg_delta = deltas.iter().sum::<f64>() / deltas.len() as f64;
            avg_delta < min_delta
        };

        self.early_terminate = Box::new(early_terminate);
        self
    }

    pub fn until_some(
        &mut self,
        early_terminate: impl Fn(&Vec<f64>) -> bool + 'static,
    ) -> &mut Self {
        self.early_terminate = Box::new(early_terminate);
        self
    }

    pub fn train(&mut self, x: Vec<Vec<f64>>, y: Vec<Vec<f64>>) -> Result<&mut Self, NetError> {
        let xy: Vec<(Vec<f64>, Vec<f64>)> = x.into_iter().zip(y.into_iter()).collect();
        if xy.is_empty() {
            return Ok(self);
        }

        let mut rng = thread_rng();

        for epoch in 0..self.hyper.epochs {
            let sample = xy.choose_multiple(&mut rng, self.hyper.sample_size);
            let mut epoch_loss: Vec<f64> = vec![];

            for (x, y) in sample {
                self.net.forward_on(x)?;
                let pred = self.net.output().to_vec();
                epoch_loss.push(f::mse(&pred, y));

                self.net.train_step(y, self.hyper.learning_rate)?;
            }

            self.hyper.learning_rate *= self.hyper.decay;

            let avg_loss = epoch_loss.iter().sum::<f64>() / epoch_loss.len() as f64;
            self.losses.push(avg_loss);

            if self.verbose {
                println!("epoch {} loss {}", epoch, avg_loss);
            }

            if (self.early_terminate)(&self.losses) {
                break;
            }
        }

        Ok(self)
    }

    pub fn losses(&self) -> &[f64] {
        &self.losses
    }

    pub fn loss_graph(&mut self) -> &mut Self {
        let epochs = (0..self.losses.len()).collect::<Vec<usize>>();
        let trace = Bar::new(epochs, self.losses.clone());

        let mut plot = Plot::new();
        plot.add_trace(trace);
        plot.show();

        self
    }
}
