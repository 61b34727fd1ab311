//! A trainable multi-class digit classifier.
//!
//! `digit-mlp` is a small-core, from-scratch implementation of the model side
//! of an interactive digit-teaching tool: the host collects labeled drawings
//! (or batches of dataset images) and trains a classifier in real time while
//! watching loss and accuracy evolve. Two model variants are provided:
//!
//! - [`Network`]: a multi-layer perceptron with configurable layer sizes,
//!   ReLU hidden activations, and a softmax output trained with
//!   cross-entropy loss by per-example backpropagation.
//! - [`LinearClassifier`]: a single affine layer plus softmax (multinomial
//!   logistic regression), trained one labeled example at a time.
//!
//! Both operate on fixed-length `f32` feature vectors; the reference use is
//! flattened 28×28 grayscale drawings (784 features, 10 classes), but
//! nothing is specific to that shape.
//!
//! # Design goals
//!
//! - Predictable performance: reuse buffers ([`Trace`]) instead of
//!   allocating on the per-sample hot path.
//! - Clear contracts: shapes are explicit and validated at the API boundary.
//! - Robust by default: blank or numerically invalid inputs produce a
//!   low-confidence fallback [`Prediction`] instead of errors or NaN, so a
//!   drawing front end never crashes on an empty canvas.
//! - Deterministic when asked: every source of randomness (weight init,
//!   reset, shuffling) is seeded explicitly.
//!
//! # Errors vs fallbacks
//!
//! This crate distinguishes caller bugs from bad data:
//!
//! - Wrong input/target lengths are contract violations and surface as
//!   [`Error::DimensionMismatch`].
//! - Blank drawings and non-finite activations are data-quality conditions
//!   and surface as [`Prediction::fallback`] (class 0, uniform confidence).
//! - Empty batches are neutral: loss 0, accuracy 0, no state touched.
//!
//! # Quick start
//!
//! ```rust
//! use digit_mlp::{Batch, Network};
//!
//! # fn main() -> digit_mlp::Result<()> {
//! let mut net = Network::new_with_seed(&[8, 16, 3], 0)?;
//!
//! let xs = vec![vec![0.9, 0.8, 0.7, 0.9, 0.8, 0.0, 0.0, 0.1]; 4];
//! let ys = vec![vec![1.0, 0.0, 0.0]; 4];
//! let batch = Batch::from_rows(&xs, &ys)?;
//!
//! for _ in 0..50 {
//!     net.train(&batch, 0.1)?;
//! }
//!
//! let pred = net.predict(&xs[0])?;
//! assert_eq!(pred.class, 0);
//! # Ok(())
//! # }
//! ```
//!
//! # Teaching by hand
//!
//! The manual workflow accumulates labeled drawings in an [`ExampleStore`]
//! and trains the linear model against them:
//!
//! ```rust
//! use digit_mlp::{ExampleStore, LinearClassifier, TeachConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn main() -> digit_mlp::Result<()> {
//! let mut store = ExampleStore::new(16, 10)?;
//! store.push(&[0.9; 16], 3)?;
//!
//! let mut model = LinearClassifier::new_with_seed(16, 10, 0)?;
//! let mut rng = StdRng::seed_from_u64(0);
//! let report = model.teach(&store, &TeachConfig::default(), &mut rng)?;
//!
//! assert!(report.final_loss() < 0.1);
//! assert_eq!(model.predict(&[0.9; 16])?.class, 3);
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod layer;
pub mod linear;
pub mod loss;
pub mod network;
pub mod num;
pub mod trainer;

pub use data::{Batch, DatasetProvider, ExampleStore, MemoryDataset};
pub use error::{Error, Result};
pub use layer::{Init, Layer};
pub use linear::LinearClassifier;
pub use network::{Network, Trace};
pub use num::Prediction;
pub use trainer::{
    EpochReport, FitConfig, FitReport, TeachConfig, TeachEpoch, TeachReport,
};
