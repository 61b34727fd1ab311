use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::Batch;
use crate::layer::{Init, Layer};
use crate::num::{self, Prediction};
use crate::{loss, Error, Result};

/// Input entries at or below this value count as blank when deciding whether
/// a drawing is too empty to classify.
const ACTIVE_THRESHOLD: f32 = 0.01;

/// Default number of active entries `predict` requires before running the
/// network. Tuned for 28×28 drawings; shrink it (or set it to 0) for models
/// with small input dimensions.
const DEFAULT_MIN_ACTIVE_INPUTS: usize = 5;

/// Feed-forward classifier: dense layers with ReLU hidden activations and a
/// softmax output, trained by per-example backpropagation.
#[derive(Debug, Clone)]
pub struct Network {
    sizes: Vec<usize>,
    layers: Vec<Layer>,
    min_active_inputs: usize,
}

/// Reusable forward/backward buffers for a specific [`Network`].
///
/// Holds one pre-activation row, one activation row, and one delta row per
/// layer. Allocate once via [`Network::trace`] and reuse across calls; the
/// output of the most recent forward pass lives in the last activation row.
#[derive(Debug, Clone)]
pub struct Trace {
    /// Pre-activation values `z = W x + b` per layer.
    zs: Vec<Vec<f32>>,
    /// Post-activation values per layer (ReLU, softmax on the last).
    activations: Vec<Vec<f32>>,
    /// Backpropagated error per layer.
    deltas: Vec<Vec<f32>>,
}

impl Trace {
    pub fn new(network: &Network) -> Self {
        let rows: Vec<Vec<f32>> = network
            .layers
            .iter()
            .map(|l| vec![0.0; l.out_dim()])
            .collect();
        Self {
            zs: rows.clone(),
            activations: rows.clone(),
            deltas: rows,
        }
    }

    /// Output of the most recent forward pass (softmax probabilities).
    #[inline]
    pub fn output(&self) -> &[f32] {
        self.activations
            .last()
            .expect("network must have at least one layer")
            .as_slice()
    }
}

impl Network {
    /// Builds a network from a list of layer sizes including input and output
    /// dims, e.g. `[784, 128, 64, 10]`. Weights are Xavier-Gaussian, biases
    /// start at zero.
    pub fn new_with_seed(sizes: &[usize], seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(sizes, &mut rng)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(sizes: &[usize], rng: &mut R) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::InvalidConfig(
                "sizes must include input and output dims".to_owned(),
            ));
        }
        if sizes.contains(&0) {
            return Err(Error::InvalidConfig(
                "all layer sizes must be > 0".to_owned(),
            ));
        }

        let mut layers = Vec::with_capacity(sizes.len() - 1);
        for w in sizes.windows(2) {
            layers.push(Layer::new_with_rng(w[0], w[1], Init::XavierNormal, rng)?);
        }

        Ok(Self {
            sizes: sizes.to_vec(),
            layers,
            min_active_inputs: DEFAULT_MIN_ACTIVE_INPUTS,
        })
    }

    #[inline]
    pub fn layer_sizes(&self) -> &[usize] {
        &self.sizes
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.sizes[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    #[inline]
    pub fn min_active_inputs(&self) -> usize {
        self.min_active_inputs
    }

    /// Adjusts how many above-threshold entries `predict` requires before it
    /// runs the network instead of returning the blank-input fallback.
    pub fn set_min_active_inputs(&mut self, count: usize) {
        self.min_active_inputs = count;
    }

    /// Allocates forward/backward buffers for this network.
    pub fn trace(&self) -> Trace {
        Trace::new(self)
    }

    /// Forward pass for a single sample, filling `trace` with per-layer
    /// pre-activations and activations.
    ///
    /// Hidden layers apply elementwise ReLU; the output layer applies a
    /// numerically stable softmax. Rejects inputs whose length does not match
    /// the network's input dim.
    pub fn forward(&self, input: &[f32], trace: &mut Trace) -> Result<()> {
        if input.len() != self.input_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.input_dim(),
                actual: input.len(),
            });
        }
        debug_assert_eq!(trace.zs.len(), self.layers.len());
        debug_assert_eq!(trace.activations.len(), self.layers.len());

        let last = self.layers.len() - 1;
        let Trace {
            zs, activations, ..
        } = trace;

        for (idx, layer) in self.layers.iter().enumerate() {
            let inputs: &[f32] = if idx == 0 { input } else { &activations[idx - 1] };
            layer.affine(inputs, &mut zs[idx]);

            if idx < last {
                for o in 0..layer.out_dim() {
                    activations[idx][o] = num::relu(zs[idx][o]);
                }
            } else {
                activations[idx].copy_from_slice(&zs[idx]);
                num::softmax_in_place(&mut activations[idx]);
            }
        }

        Ok(())
    }

    /// Classifies a single sample.
    ///
    /// Inputs with fewer than [`Network::min_active_inputs`] entries above
    /// 0.01 are treated as blank drawings and answered with the
    /// low-confidence fallback (class 0, uniform confidence) instead of
    /// running the network. Inputs whose maximum exceeds 1 are rescaled by
    /// that maximum. If the forward pass produces any NaN or infinite
    /// activation, the same fallback is returned; NaN never reaches the
    /// caller.
    pub fn predict(&self, input: &[f32]) -> Result<Prediction> {
        let mut trace = self.trace();
        self.predict_with_trace(input, &mut trace)
    }

    /// [`Network::predict`] with caller-provided buffers (no allocation).
    pub fn predict_with_trace(&self, input: &[f32], trace: &mut Trace) -> Result<Prediction> {
        if input.len() != self.input_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.input_dim(),
                actual: input.len(),
            });
        }

        let active = input.iter().filter(|&&v| v > ACTIVE_THRESHOLD).count();
        if active < self.min_active_inputs {
            return Ok(Prediction::fallback(self.output_dim()));
        }

        let max = input.iter().fold(f32::MIN, |m, &v| m.max(v));
        let rescaled: Vec<f32>;
        let input = if max > 1.0 {
            rescaled = input.iter().map(|&v| v / max).collect();
            &rescaled[..]
        } else {
            input
        };

        self.forward(input, trace)?;
        let output = trace.output();
        if output.iter().any(|v| !v.is_finite()) {
            return Ok(Prediction::fallback(self.output_dim()));
        }

        Ok(Prediction::from_probabilities(output.to_vec()))
    }

    /// Backpropagation for a single example: forward pass, cross-entropy
    /// loss, then an in-place plain-SGD update of every layer. Returns the
    /// example's loss.
    ///
    /// `target` is a one-hot (or soft) vector of length `output_dim`.
    pub fn backward(&mut self, input: &[f32], target: &[f32], learning_rate: f32) -> Result<f32> {
        let mut trace = self.trace();
        self.backward_with_trace(input, target, learning_rate, &mut trace)
    }

    /// [`Network::backward`] with caller-provided buffers (no allocation).
    pub fn backward_with_trace(
        &mut self,
        input: &[f32],
        target: &[f32],
        learning_rate: f32,
        trace: &mut Trace,
    ) -> Result<f32> {
        if target.len() != self.output_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.output_dim(),
                actual: target.len(),
            });
        }
        validate_learning_rate(learning_rate)?;

        self.forward(input, trace)?;

        let last = self.layers.len() - 1;
        let Trace {
            zs,
            activations,
            deltas,
        } = trace;

        // Output layer: cross-entropy loss and the closed-form
        // softmax-plus-cross-entropy gradient, delta = output - target.
        let loss = loss::cross_entropy(&activations[last], target);
        for (i, &t) in target.iter().enumerate() {
            deltas[last][i] = activations[last][i] - t;
        }

        // Hidden deltas, walking backward: each unit accumulates downstream
        // deltas through its outgoing weights, gated by ReLU' at the unit's
        // pre-activation.
        for idx in (1..=last).rev() {
            let layer = &self.layers[idx];
            let weights = layer.weights();
            let in_dim = layer.in_dim();

            let (lower, upper) = deltas.split_at_mut(idx);
            let d_out = &upper[0];
            let d_prev = &mut lower[idx - 1];

            for j in 0..in_dim {
                let mut acc = 0.0_f32;
                for k in 0..layer.out_dim() {
                    acc = weights[k * in_dim + j].mul_add(d_out[k], acc);
                }
                d_prev[j] = acc * num::relu_grad(zs[idx - 1][j]);
            }
        }

        // Plain gradient descent, in place. Deltas were all computed against
        // the pre-update weights above.
        for idx in 0..=last {
            let inputs: &[f32] = if idx == 0 { input } else { &activations[idx - 1] };
            let delta = &deltas[idx];
            let layer = &mut self.layers[idx];
            let in_dim = layer.in_dim();

            let biases = layer.biases_mut();
            for (b, &d) in biases.iter_mut().zip(delta) {
                *b -= learning_rate * d;
            }

            let weights = layer.weights_mut();
            for (k, &d) in delta.iter().enumerate() {
                let row = k * in_dim;
                let step = learning_rate * d;
                for (j, &x) in inputs.iter().enumerate() {
                    weights[row + j] -= step * x;
                }
            }
        }

        Ok(loss)
    }

    /// Trains on a batch by applying [`Network::backward`] to each example in
    /// order, strictly sequentially, so every example sees the updates of the
    /// examples before it. Returns the mean loss over the batch.
    ///
    /// An empty batch returns loss 0 without touching any state.
    pub fn train(&mut self, batch: &Batch, learning_rate: f32) -> Result<f32> {
        if batch.is_empty() {
            return Ok(0.0);
        }
        self.check_batch_dims(batch)?;
        validate_learning_rate(learning_rate)?;

        let mut trace = self.trace();
        let mut total = 0.0_f32;
        for idx in 0..batch.len() {
            total += self.backward_with_trace(
                batch.input(idx),
                batch.target(idx),
                learning_rate,
                &mut trace,
            )?;
        }
        Ok(total / batch.len() as f32)
    }

    /// Fraction of batch examples whose predicted class matches
    /// `argmax(target)`. An empty batch evaluates to 0.
    pub fn evaluate(&self, batch: &Batch) -> Result<f32> {
        if batch.is_empty() {
            return Ok(0.0);
        }
        self.check_batch_dims(batch)?;

        let mut trace = self.trace();
        let mut correct = 0_usize;
        for idx in 0..batch.len() {
            let pred = self.predict_with_trace(batch.input(idx), &mut trace)?;
            if pred.class == num::argmax(batch.target(idx)) {
                correct += 1;
            }
        }
        Ok(correct as f32 / batch.len() as f32)
    }

    /// Re-draws all weights from the construction-time distribution and
    /// zeroes all biases, discarding everything learned.
    pub fn reset_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for layer in &mut self.layers {
            layer.reinit_with_rng(rng);
        }
    }

    pub fn reset_with_seed(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.reset_with_rng(&mut rng);
    }

    fn check_batch_dims(&self, batch: &Batch) -> Result<()> {
        if batch.input_dim() != self.input_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.input_dim(),
                actual: batch.input_dim(),
            });
        }
        if batch.target_dim() != self.output_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.output_dim(),
                actual: batch.target_dim(),
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_learning_rate(learning_rate: f32) -> Result<()> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {learning_rate}"
        )));
    }
    Ok(())
}
