use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{Error, Result};

/// Weight initialization distribution.
///
/// A layer remembers its distribution so a model reset re-draws from the same
/// one it was constructed with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// Gaussian with mean 0 and standard deviation `sqrt(2 / (in_dim + out_dim))`
    /// (Xavier/Glorot).
    XavierNormal,
    /// Uniform in `[-limit, limit)`.
    Uniform { limit: f32 },
}

impl Init {
    pub fn validate(self) -> Result<()> {
        match self {
            Init::XavierNormal => Ok(()),
            Init::Uniform { limit } => {
                if !(limit.is_finite() && limit > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "uniform init limit must be finite and > 0, got {limit}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// A dense affine map `z = W x + b`.
///
/// Activation functions are not part of the layer; the network decides what
/// to apply on top (ReLU for hidden layers, softmax at the output), and the
/// linear classifier uses the bare affine map directly.
#[derive(Debug, Clone)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    init: Init,
    /// Row-major matrix with shape (out_dim, in_dim).
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        init: Init,
        rng: &mut R,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        init.validate()?;

        let mut layer = Self {
            in_dim,
            out_dim,
            init,
            weights: vec![0.0; in_dim * out_dim],
            biases: vec![0.0; out_dim],
        };
        layer.reinit_with_rng(rng);
        Ok(layer)
    }

    /// Re-draws every weight from the construction-time distribution and
    /// zeroes the biases, discarding all learned state.
    pub fn reinit_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match self.init {
            Init::XavierNormal => {
                let stddev = (2.0 / (self.in_dim + self.out_dim) as f32).sqrt();
                let normal =
                    Normal::new(0.0, stddev).expect("stddev is finite and positive for valid dims");
                for w in self.weights.iter_mut() {
                    *w = normal.sample(rng);
                }
            }
            Init::Uniform { limit } => {
                for w in self.weights.iter_mut() {
                    *w = rng.gen_range(-limit..limit);
                }
            }
        }
        self.biases.fill(0.0);
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Affine map for a single sample: writes `z = W x + b` into `zs`.
    ///
    /// Shape contract:
    /// - `inputs.len() == self.in_dim`
    /// - `zs.len() == self.out_dim`
    #[inline]
    pub fn affine(&self, inputs: &[f32], zs: &mut [f32]) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(zs.len(), self.out_dim);

        for o in 0..self.out_dim {
            let mut sum = self.biases[o];
            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                sum = self.weights[row + i].mul_add(inputs[i], sum);
            }
            zs[o] = sum;
        }
    }
}
