//! Training loop drivers.
//!
//! The models expose synchronous `train`/`evaluate` calls; this module adds
//! the orchestration on top: epochs, batch scheduling, learning-rate decay,
//! and metric collection. Hosts that need to interleave training with other
//! work drive [`Network::run_epoch`] themselves or hang a callback on
//! [`Network::fit_with`]; the core never yields internally.

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::{DatasetProvider, ExampleStore};
use crate::linear::LinearClassifier;
use crate::network::{validate_learning_rate, Network};
use crate::{Error, Result};

/// Configuration for [`Network::fit`].
///
/// The effective learning rate for epoch `e` (0-based) is
/// `base_learning_rate * lr_decay^e`. Evaluation runs on epochs where
/// `e % eval_every == 0` and on the last epoch; other epochs carry the most
/// recent accuracy forward.
#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    pub epochs: usize,
    pub batches_per_epoch: usize,
    pub batch_size: usize,
    pub eval_batch_size: usize,
    pub base_learning_rate: f32,
    pub lr_decay: f32,
    pub eval_every: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batches_per_epoch: 10,
            batch_size: 32,
            eval_batch_size: 200,
            base_learning_rate: 0.1,
            lr_decay: 0.95,
            eval_every: 2,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if self.batches_per_epoch == 0 {
            return Err(Error::InvalidConfig(
                "batches_per_epoch must be > 0".to_owned(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if self.eval_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "eval_batch_size must be > 0".to_owned(),
            ));
        }
        if self.eval_every == 0 {
            return Err(Error::InvalidConfig("eval_every must be > 0".to_owned()));
        }
        validate_learning_rate(self.base_learning_rate)?;
        if !(self.lr_decay.is_finite() && self.lr_decay > 0.0 && self.lr_decay <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "lr_decay must be in (0, 1], got {}",
                self.lr_decay
            )));
        }
        Ok(())
    }

    /// Decayed learning rate for a 0-based epoch index.
    #[inline]
    pub fn learning_rate_for(&self, epoch: usize) -> f32 {
        self.base_learning_rate * self.lr_decay.powi(epoch as i32)
    }
}

/// Metrics collected for one training epoch. `epoch` is 1-based.
#[derive(Debug, Clone, Copy)]
pub struct EpochReport {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub learning_rate: f32,
}

/// Full training history, one entry per epoch.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
}

impl FitReport {
    pub fn final_loss(&self) -> f32 {
        self.epochs.last().map_or(0.0, |e| e.loss)
    }

    pub fn final_accuracy(&self) -> f32 {
        self.epochs.last().map_or(0.0, |e| e.accuracy)
    }
}

impl Network {
    /// Runs one training epoch: `batches_per_epoch` fresh batches at the
    /// decayed learning rate, then an evaluation pass when the epoch falls on
    /// an `eval_every` boundary (or is the last). `last_accuracy` is echoed
    /// into the report on non-evaluation epochs.
    ///
    /// This is the incremental entry point: a host that wants to keep a UI
    /// responsive calls it once per scheduling slice, with `epoch` counting
    /// up from 0.
    pub fn run_epoch<P: DatasetProvider>(
        &mut self,
        data: &mut P,
        cfg: &FitConfig,
        epoch: usize,
        last_accuracy: f32,
    ) -> Result<EpochReport> {
        cfg.validate()?;

        let learning_rate = cfg.learning_rate_for(epoch);
        let mut epoch_loss = 0.0_f32;
        for batch_idx in 0..cfg.batches_per_epoch {
            let batch = data.next_train_batch(cfg.batch_size)?;
            let batch_loss = self.train(&batch, learning_rate)?;
            trace!("epoch {epoch} batch {batch_idx}: loss={batch_loss:.4}");
            epoch_loss += batch_loss;
        }
        let loss = epoch_loss / cfg.batches_per_epoch as f32;

        let accuracy = if epoch % cfg.eval_every == 0 || epoch + 1 == cfg.epochs {
            let test = data.next_test_batch(cfg.eval_batch_size)?;
            self.evaluate(&test)?
        } else {
            last_accuracy
        };

        debug!(
            "epoch {}/{}: loss={loss:.4} accuracy={:.2}% lr={learning_rate:.4}",
            epoch + 1,
            cfg.epochs,
            accuracy * 100.0
        );

        Ok(EpochReport {
            epoch: epoch + 1,
            loss,
            accuracy,
            learning_rate,
        })
    }

    /// Trains for `cfg.epochs` epochs against `data` and returns the history.
    pub fn fit<P: DatasetProvider>(&mut self, data: &mut P, cfg: &FitConfig) -> Result<FitReport> {
        self.fit_with(data, cfg, |_| {})
    }

    /// [`Network::fit`] with a hook invoked after every epoch. The hook is
    /// where a host yields, repaints, or decides to surface progress; the
    /// training itself stays fully synchronous.
    pub fn fit_with<P, F>(&mut self, data: &mut P, cfg: &FitConfig, mut hook: F) -> Result<FitReport>
    where
        P: DatasetProvider,
        F: FnMut(&EpochReport),
    {
        cfg.validate()?;

        let mut epochs = Vec::with_capacity(cfg.epochs);
        let mut accuracy = 0.0_f32;
        for epoch in 0..cfg.epochs {
            let report = self.run_epoch(data, cfg, epoch, accuracy)?;
            accuracy = report.accuracy;
            hook(&report);
            epochs.push(report);
        }

        Ok(FitReport { epochs })
    }
}

/// Configuration for [`LinearClassifier::teach`].
#[derive(Debug, Clone, Copy)]
pub struct TeachConfig {
    pub epochs: usize,
    pub learning_rate: f32,
}

impl Default for TeachConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            learning_rate: 0.1,
        }
    }
}

impl TeachConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        validate_learning_rate(self.learning_rate)
    }
}

/// Per-epoch loss from a teach run. `epoch` is 1-based.
#[derive(Debug, Clone, Copy)]
pub struct TeachEpoch {
    pub epoch: usize,
    pub loss: f32,
}

#[derive(Debug, Clone)]
pub struct TeachReport {
    pub epochs: Vec<TeachEpoch>,
}

impl TeachReport {
    pub fn final_loss(&self) -> f32 {
        self.epochs.last().map_or(0.0, |e| e.loss)
    }
}

impl LinearClassifier {
    /// Trains against the hand-labeled examples in `store`: each epoch
    /// shuffles the example order and runs one gradient step per example,
    /// reporting the mean loss. The configured learning rate is installed on
    /// the model before the first step.
    pub fn teach<R: Rng + ?Sized>(
        &mut self,
        store: &ExampleStore,
        cfg: &TeachConfig,
        rng: &mut R,
    ) -> Result<TeachReport> {
        self.teach_with(store, cfg, rng, |_| {})
    }

    /// [`LinearClassifier::teach`] with a hook invoked after every epoch.
    pub fn teach_with<R, F>(
        &mut self,
        store: &ExampleStore,
        cfg: &TeachConfig,
        rng: &mut R,
        mut hook: F,
    ) -> Result<TeachReport>
    where
        R: Rng + ?Sized,
        F: FnMut(&TeachEpoch),
    {
        cfg.validate()?;
        if store.is_empty() {
            return Err(Error::InvalidData("no examples to train on".to_owned()));
        }
        if store.input_dim() != self.input_dim() {
            return Err(Error::DimensionMismatch {
                expected: self.input_dim(),
                actual: store.input_dim(),
            });
        }
        if store.num_classes() != self.num_classes() {
            return Err(Error::DimensionMismatch {
                expected: self.num_classes(),
                actual: store.num_classes(),
            });
        }

        self.set_learning_rate(cfg.learning_rate)?;

        let mut order: Vec<usize> = (0..store.len()).collect();
        let mut epochs = Vec::with_capacity(cfg.epochs);
        for epoch in 0..cfg.epochs {
            order.shuffle(rng);

            let mut total = 0.0_f32;
            for &idx in &order {
                total += self.train(store.input(idx), store.label(idx))?;
            }
            let loss = total / store.len() as f32;
            debug!("teach epoch {}/{}: loss={loss:.4}", epoch + 1, cfg.epochs);

            let report = TeachEpoch {
                epoch: epoch + 1,
                loss,
            };
            hook(&report);
            epochs.push(report);
        }

        Ok(TeachReport { epochs })
    }
}
