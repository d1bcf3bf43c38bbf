use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activation::Activations;
use crate::twister::Twister64;

use super::trainer::Trainer;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("a network needs at least an input and an output layer, got {0}")]
    TooFewLayers(usize),
    #[error("layer {0} has zero width")]
    EmptyLayer(usize),
    #[error("expected {expected} values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("stored topology {found:?} does not match this network's {expected:?}")]
    TopologyMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("weight image is {got} bytes where {expected} were expected")]
    BadImageSize { expected: usize, got: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] bincode::Error),
}

/// What the full forward pass stores in the per-neuron derivative slot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeCache {
    /// Re-applies the layer's activation to the post-activation output.
    /// The default.
    Reactivation,
    /// Evaluates the activation's derivative at the pre-activation sum.
    Analytic,
}

/// A fully-connected feedforward network over dense `f64` buffers.
///
/// The topology is fixed at construction. Layer 0 holds the raw input,
/// every later layer owns a weight matrix (one row per neuron, one column
/// per upstream neuron), a bias vector, and per-neuron output, derivative
/// and error slots. Callers write the input through `input_mut` or
/// `set_input`, run a forward pass, and read the prediction from `output`.
#[derive(Serialize, Deserialize, Clone)]
pub struct DenseNet {
    lower_range: f64,
    upper_range: f64,
    layer_sizes: Vec<usize>,
    activations: Vec<Activations>,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    outputs: Vec<Array1<f64>>,
    derivatives: Vec<Array1<f64>>,
    errors: Vec<Array1<f64>>,
    derivative_cache: DerivativeCache,
    rng: Twister64,
}

// draw/u64::MAX stretched onto [lower, lower + |lower| + upper]. The exact
// expression is a seed-reproducibility contract and must not be replaced
// with a symmetric uniform sample.
fn init_draw(rng: &mut Twister64, lower: f64, upper: f64) -> f64 {
    lower + rng.next_f64() * (lower.abs() + upper)
}

impl DenseNet {
    /// Builds a network from `(width, activation)` pairs, one per layer;
    /// the first pair is the input layer and its activation is never
    /// applied.
    ///
    /// `range_a` and `range_b` shape the initial weight distribution:
    /// every weight and bias starts at
    /// `range_a + draw * (|range_a| + range_b)` with `draw` uniform on
    /// [0, 1] from the twister seeded with `seed`. `range_a` is the
    /// additive offset (the low endpoint) and `range_b` the upper extent.
    /// The argument order and the asymmetric use of `abs` are part of the
    /// reproducibility contract.
    pub fn new(
        range_a: f64,
        range_b: f64,
        seed: u64,
        layers: &[(usize, Activations)],
    ) -> Result<DenseNet, NetError> {
        if layers.len() < 2 {
            return Err(NetError::TooFewLayers(layers.len()));
        }
        for (i, (width, _)) in layers.iter().enumerate() {
            if *width == 0 {
                return Err(NetError::EmptyLayer(i));
            }
        }

        let layer_sizes: Vec<usize> = layers.iter().map(|(width, _)| *width).collect();
        let activations: Vec<Activations> = layers.iter().map(|(_, act)| *act).collect();

        let mut weights = vec![Array2::zeros((0, 0))];
        let mut biases = vec![Array1::zeros(0)];
        let mut outputs = vec![Array1::zeros(layer_sizes[0])];
        let mut derivatives = vec![Array1::zeros(0)];
        let mut errors = vec![Array1::zeros(0)];

        for layer in 1..layer_sizes.len() {
            weights.push(Array2::zeros((layer_sizes[layer], layer_sizes[layer - 1])));
            biases.push(Array1::zeros(layer_sizes[layer]));
            outputs.push(Array1::zeros(layer_sizes[layer]));
            derivatives.push(Array1::zeros(layer_sizes[layer]));
            errors.push(Array1::zeros(layer_sizes[layer]));
        }

        let mut net = DenseNet {
            lower_range: range_a,
            upper_range: range_b,
            layer_sizes,
            activations,
            weights,
            biases,
            outputs,
            derivatives,
            errors,
            derivative_cache: DerivativeCache::Reactivation,
            rng: Twister64::from_seed(seed),
        };
        net.reset();

        Ok(net)
    }

    /// Re-draws every bias and weight from the twister's current position.
    /// Continues the stream rather than re-seeding, so a run of
    /// create-reset-reset trials is reproducible as a whole.
    pub fn reset(&mut self) {
        for layer in 1..self.layer_sizes.len() {
            for neuron in 0..self.layer_sizes[layer] {
                self.biases[layer][neuron] =
                    init_draw(&mut self.rng, self.lower_range, self.upper_range);
                for prev in 0..self.layer_sizes[layer - 1] {
                    self.weights[layer][[neuron, prev]] =
                        init_draw(&mut self.rng, self.lower_range, self.upper_range);
                }
            }
        }
    }

    pub fn set_derivative_cache(&mut self, strategy: DerivativeCache) -> &mut Self {
        self.derivative_cache = strategy;
        self
    }

    pub fn derivative_cache(&self) -> DerivativeCache {
        self.derivative_cache
    }

    /// Inference-only pass. Activations are computed layer by layer; the
    /// derivative slots are left untouched.
    pub fn forward_fast(&mut self) {
        for layer in 1..self.layer_sizes.len() {
            let act = self.activations[layer].wake();
            for neuron in 0..self.layer_sizes[layer] {
                let mut sum = self.biases[layer][neuron];
                for prev in 0..self.layer_sizes[layer - 1] {
                    sum += self.outputs[layer - 1][prev] * self.weights[layer][[neuron, prev]];
                }
                self.outputs[layer][neuron] = act.a(sum);
            }
        }
    }

    /// Training pass. Same arithmetic as `forward_fast`, plus the
    /// per-neuron derivative cache that `train_step` consumes.
    pub fn forward(&mut self) {
        for layer in 1..self.layer_sizes.len() {
            let act = self.activations[layer].wake();
            for neuron in 0..self.layer_sizes[layer] {
                let mut sum = self.biases[layer][neuron];
                for prev in 0..self.layer_sizes[layer - 1] {
                    sum += self.outputs[layer - 1][prev] * self.weights[layer][[neuron, prev]];
                }
                let out = act.a(sum);
                self.outputs[layer][neuron] = out;
                self.derivatives[layer][neuron] = match self.derivative_cache {
                    DerivativeCache::Reactivation => act.a(out),
                    DerivativeCache::Analytic => act.d(sum),
                };
            }
        }
    }

    /// Copies `x` into the input layer.
    pub fn set_input(&mut self, x: &[f64]) -> Result<(), NetError> {
        if x.len() != self.layer_sizes[0] {
            return Err(NetError::DimensionMismatch {
                expected: self.layer_sizes[0],
                got: x.len(),
            });
        }
        for (slot, v) in self.outputs[0].iter_mut().zip(x) {
            *slot = *v;
        }
        Ok(())
    }

    /// Writes `x` into the input layer and runs the fast pass; returns a
    /// copy of the prediction.
    pub fn predict(&mut self, x: &[f64]) -> Result<Vec<f64>, NetError> {
        self.set_input(x)?;
        self.forward_fast();
        Ok(self.output().to_vec())
    }

    /// Writes `x` into the input layer and runs the full pass, priming the
    /// derivative cache for `train_step`.
    pub fn forward_on(&mut self, x: &[f64]) -> Result<(), NetError> {
        self.set_input(x)?;
        self.forward();
        Ok(())
    }

    /// One gradient-descent step against `target`, consuming the state of
    /// the full forward pass that must have just run for the same input.
    ///
    /// Error terms stay readable through `errors` afterwards, but only
    /// until the next call mutates them.
    pub fn train_step(&mut self, target: &[f64], learning_rate: f64) -> Result<(), NetError> {
        let last = self.layer_sizes.len() - 1;
        if target.len() != self.layer_sizes[last] {
            return Err(NetError::DimensionMismatch {
                expected: self.layer_sizes[last],
                got: target.len(),
            });
        }

        for neuron in 0..self.layer_sizes[last] {
            self.errors[last][neuron] =
                (self.outputs[last][neuron] - target[neuron]) * self.derivatives[last][neuron];
        }

        // Layer 0 carries no weights and never receives an error term.
        for layer in (1..last).rev() {
            for neuron in 0..self.layer_sizes[layer] {
                let mut sum = 0.;
                for next in 0..self.layer_sizes[layer + 1] {
                    sum += self.weights[layer + 1][[next, neuron]] * self.errors[layer + 1][next];
                }
                self.errors[layer][neuron] = sum * self.derivatives[layer][neuron];
            }
        }

        for layer in 1..=last {
            for neuron in 0..self.layer_sizes[layer] {
                let delta = -learning_rate * self.errors[layer][neuron];
                self.biases[layer][neuron] += delta;
                for prev in 0..self.layer_sizes[layer - 1] {
                    self.weights[layer][[neuron, prev]] += delta * self.outputs[layer - 1][prev];
                }
            }
        }

        Ok(())
    }

    pub fn get_trainer(&mut self) -> Trainer {
        Trainer::new(self)
    }

    /// Flat binary image: a `u64` layer count, the `u64` widths in order,
    /// then for each layer past the input its bias vector followed by each
    /// neuron's incoming weight row. Native-endian scalars, no padding, no
    /// framing; the reader must already know the topology.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.image_len());

        buf.extend_from_slice(&(self.layer_sizes.len() as u64).to_ne_bytes());
        for width in &self.layer_sizes {
            buf.extend_from_slice(&(*width as u64).to_ne_bytes());
        }

        for layer in 1..self.layer_sizes.len() {
            for neuron in 0..self.layer_sizes[layer] {
                buf.extend_from_slice(&self.biases[layer][neuron].to_ne_bytes());
            }
            for neuron in 0..self.layer_sizes[layer] {
                for prev in 0..self.layer_sizes[layer - 1] {
                    buf.extend_from_slice(&self.weights[layer][[neuron, prev]].to_ne_bytes());
                }
            }
        }

        buf
    }

    /// Reads a flat binary image produced by `to_bytes` into the existing
    /// buffers. The stored layer count and widths must match this network;
    /// nothing is overwritten until every check has passed.
    pub fn read_bytes(&mut self, bytes: &[u8]) -> Result<(), NetError> {
        let expected = self.image_len();
        if bytes.len() < 8 {
            return Err(NetError::BadImageSize {
                expected,
                got: bytes.len(),
            });
        }

        let mut cursor = bytes;
        let count = read_u64(&mut cursor) as usize;
        if count != self.layer_sizes.len() {
            // Report whatever widths the image actually carries.
            let readable = count.min(cursor.len() / 8);
            let mut found = Vec::with_capacity(readable);
            for _ in 0..readable {
                found.push(read_u64(&mut cursor) as usize);
            }
            return Err(NetError::TopologyMismatch {
                expected: self.layer_sizes.clone(),
                found,
            });
        }

        if bytes.len() < 8 * (1 + count) {
            return Err(NetError::BadImageSize {
                expected,
                got: bytes.len(),
            });
        }

        let mut found = Vec::with_capacity(count);
        for _ in 0..count {
            found.push(read_u64(&mut cursor) as usize);
        }
        if found != self.layer_sizes {
            return Err(NetError::TopologyMismatch {
                expected: self.layer_sizes.clone(),
                found,
            });
        }
        if bytes.len() != expected {
            return Err(NetError::BadImageSize {
                expected,
                got: bytes.len(),
            });
        }

        for layer in 1..self.layer_sizes.len() {
            for neuron in 0..self.layer_sizes[layer] {
                self.biases[layer][neuron] = read_f64(&mut cursor);
            }
            for neuron in 0..self.layer_sizes[layer] {
                for prev in 0..self.layer_sizes[layer - 1] {
                    self.weights[layer][[neuron, prev]] = read_f64(&mut cursor);
                }
            }
        }

        Ok(())
    }

    /// Writes the flat binary image to `path`. The image is staged next to
    /// the destination and renamed into place on success, so a failed
    /// export never leaves a torn file under the final name.
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<(), NetError> {
        let path = path.as_ref();
        let staging = path.with_extension("part");
        fs::write(&staging, self.to_bytes())?;
        fs::rename(&staging, path)?;
        Ok(())
    }

    /// Loads a flat binary image from `path` into the existing buffers.
    /// Topology and size are validated before anything is overwritten; on
    /// any failure the network is unchanged.
    pub fn import<P: AsRef<Path>>(&mut self, path: P) -> Result<(), NetError> {
        let bytes = fs::read(path)?;
        self.read_bytes(&bytes)
    }

    /// Self-describing snapshot of the whole network, twister state
    /// included, unlike the fixed-topology flat image.
    pub fn dump(&self) -> Result<Vec<u8>, NetError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn load(serialized: &[u8]) -> Result<DenseNet, NetError> {
        Ok(bincode::deserialize(serialized)?)
    }

    pub fn depth(&self) -> usize {
        self.layer_sizes.len()
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn input_width(&self) -> usize {
        self.layer_sizes[0]
    }

    pub fn output_width(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    /// Writable view of the input layer.
    pub fn input_mut(&mut self) -> ArrayViewMut1<f64> {
        self.outputs[0].view_mut()
    }

    /// The last layer's activations, i.e. the current prediction.
    pub fn output(&self) -> ArrayView1<f64> {
        self.outputs[self.layer_sizes.len() - 1].view()
    }

    pub fn weights(&self, layer: usize) -> &Array2<f64> {
        &self.weights[layer]
    }

    pub fn weights_mut(&mut self, layer: usize) -> &mut Array2<f64> {
        &mut self.weights[layer]
    }

    pub fn biases(&self, layer: usize) -> &Array1<f64> {
        &self.biases[layer]
    }

    pub fn biases_mut(&mut self, layer: usize) -> &mut Array1<f64> {
        &mut self.biases[layer]
    }

    pub fn errors(&self, layer: usize) -> &Array1<f64> {
        &self.errors[layer]
    }

    pub fn derivatives(&self, layer: usize) -> &Array1<f64> {
        &self.derivatives[layer]
    }

    fn image_len(&self) -> usize {
        let mut scalars = 1 + self.layer_sizes.len();
        for layer in 1..self.layer_sizes.len() {
            scalars += self.layer_sizes[layer] * (1 + self.layer_sizes[layer - 1]);
        }
        scalars * 8
    }
}

fn read_u64(cursor: &mut &[u8]) -> u64 {
    let (head, rest) = cursor.split_at(8);
    *cursor = rest;
    let mut word = [0u8; 8];
    word.copy_from_slice(head);
    u64::from_ne_bytes(word)
}

fn read_f64(cursor: &mut &[u8]) -> f64 {
    let (head, rest) = cursor.split_at(8);
    *cursor = rest;
    let mut word = [0u8; 8];
    word.copy_from_slice(head);
    f64::from_ne_bytes(word)
}
