use std::fmt::Debug;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// A layer's activation capability: the function and its derivative.
pub trait Activation {
    fn a(&self, x: f64) -> f64;
    fn d(&self, x: f64) -> f64;
}

impl Debug for dyn Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActivationFn")
    }
}

pub struct Sigmoid;

impl Sigmoid {
    pub fn new() -> Rc<Sigmoid> {
        Rc::new(Sigmoid)
    }
}

impl Activation for Sigmoid {
    fn a(&self, x: f64) -> f64 {
        1. / (1. + (-x).exp())
    }

    fn d(&self, x: f64) -> f64 {
        let s = self.a(x);
        s * (1. - s)
    }
}

pub struct Tanh;

impl Tanh {
    pub fn new() -> Rc<Tanh> {
        Rc::new(Tanh)
    }
}

impl Activation for Tanh {
    fn a(&self, x: f64) -> f64 {
        x.tanh()
    }

    fn d(&self, x: f64) -> f64 {
        1. - x.tanh().powi(2)
    }
}

pub struct Linear;

impl Linear {
    pub fn new() -> Rc<Linear> {
        Rc::new(Linear)
    }
}

impl Activation for Linear {
    fn a(&self, x: f64) -> f64 {
        x
    }

    fn d(&self, _x: f64) -> f64 {
        1.
    }
}

pub struct Relu;

impl Relu {
    pub fn new() -> Rc<Relu> {
        Rc::new(Relu)
    }
}

impl Activation for Relu {
    fn a(&self, x: f64) -> f64 {
        if x < 0. {
            return 0.;
        }
        x
    }

    fn d(&self, x: f64) -> f64 {
        if x < 0. {
            return 0.;
        }
        1.
    }
}

// Negative slope 0.05 on both sides of the pair.
pub struct LeakyRelu;

impl LeakyRelu {
    pub fn new() -> Rc<LeakyRelu> {
        Rc::new(LeakyRelu)
    }
}

impl Activation for LeakyRelu {
    fn a(&self, x: f64) -> f64 {
        if x < 0. {
            return 0.05 * x;
        }
        x
    }

    fn d(&self, x: f64) -> f64 {
        if x < 0. {
            return 0.05;
        }
        1.
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activations {
    Sigmoid,
    Tanh,
    Linear,
    Relu,
    LeakyRelu,
}

impl Activations {
    pub fn wake(&self) -> Rc<dyn Activation> {
        match self {
            Activations::Sigmoid => Sigmoid::new(),
            Activations::Tanh => Tanh::new(),
            Activations::Linear => Linear::new(),
            Activations::Relu => Relu::new(),
            Activations::LeakyRelu => LeakyRelu::new(),
        }
    }
}
