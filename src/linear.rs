//! Single-layer linear-softmax classifier.
//!
//! Multinomial logistic regression over flattened image vectors, trained one
//! example at a time. This is the model behind the "draw a digit, label it,
//! watch it learn" workflow; the deeper [`crate::Network`] exists for batch
//! training against a real dataset. The two are kept as separate components
//! on purpose: a hidden-layer-free network computes the same function, but
//! the explicit version is the one worth reading.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layer::{Init, Layer};
use crate::network::validate_learning_rate;
use crate::num::{self, Prediction};
use crate::{loss, Error, Result};

const DEFAULT_LEARNING_RATE: f32 = 0.1;

/// Construction draws weights uniformly from `[-INIT_LIMIT, INIT_LIMIT)`.
const INIT_LIMIT: f32 = 0.005;

#[derive(Debug, Clone)]
pub struct LinearClassifier {
    /// Affine scores `s = W x + b`, shape (num_classes, input_dim).
    layer: Layer,
    learning_rate: f32,
}

impl LinearClassifier {
    pub fn new_with_seed(input_dim: usize, num_classes: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(input_dim, num_classes, &mut rng)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        input_dim: usize,
        num_classes: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let layer = Layer::new_with_rng(
            input_dim,
            num_classes,
            Init::Uniform { limit: INIT_LIMIT },
            rng,
        )?;
        Ok(Self {
            layer,
            learning_rate: DEFAULT_LEARNING_RATE,
        })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layer.in_dim()
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.layer.out_dim()
    }

    #[inline]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Sets the step size used by subsequent [`LinearClassifier::train`]
    /// calls. Must be finite and > 0.
    pub fn set_learning_rate(&mut self, rate: f32) -> Result<()> {
        validate_learning_rate(rate)?;
        self.learning_rate = rate;
        Ok(())
    }

    /// Classifies a single sample: affine scores, stable softmax, argmax
    /// (first index on ties). No side effects.
    pub fn predict(&self, input: &[f32]) -> Result<Prediction> {
        self.check_input(input)?;

        let mut probs = vec![0.0_f32; self.num_classes()];
        self.layer.affine(input, &mut probs);
        num::softmax_in_place(&mut probs);
        Ok(Prediction::from_probabilities(probs))
    }

    /// One step of per-example gradient descent toward `target_class`.
    /// Returns the example's cross-entropy loss before the update.
    pub fn train(&mut self, input: &[f32], target_class: usize) -> Result<f32> {
        self.check_input(input)?;
        if target_class >= self.num_classes() {
            return Err(Error::InvalidData(format!(
                "target class {target_class} out of range for {} classes",
                self.num_classes()
            )));
        }

        let mut probs = vec![0.0_f32; self.num_classes()];
        self.layer.affine(input, &mut probs);
        num::softmax_in_place(&mut probs);
        let example_loss = loss::cross_entropy_class(&probs, target_class);

        // Gradient w.r.t. the scores is p - onehot(target).
        probs[target_class] -= 1.0;
        let grad = probs;

        let lr = self.learning_rate;
        let in_dim = self.layer.in_dim();

        for (b, &g) in self.layer.biases_mut().iter_mut().zip(&grad) {
            *b -= lr * g;
        }

        let weights = self.layer.weights_mut();
        for (c, &g) in grad.iter().enumerate() {
            let row = c * in_dim;
            let step = lr * g;
            for (j, &x) in input.iter().enumerate() {
                // Zero entries contribute nothing to the update; skipping
                // them keeps sparse drawings cheap.
                if x != 0.0 {
                    weights[row + j] -= step * x;
                }
            }
        }

        Ok(example_loss)
    }

    /// Re-draws the weights from the construction-time uniform distribution
    /// and zeroes the biases. The learning rate is left as-is.
    pub fn reset_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.layer.reinit_with_rng(rng);
    }

    pub fn reset_with_seed(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.reset_with_rng(&mut rng);
    }

    fn check_input(&self, input: &[f32]) -> Result<()> {
        if input.len() != self.input_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.input_dim(),
                actual: input.len(),
            });
        }
        Ok(())
    }
}
