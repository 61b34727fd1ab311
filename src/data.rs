//! Batch storage and data sources.
//!
//! The training loops operate on slices into contiguous, validated storage to
//! avoid per-step allocations. [`Batch`] is the unit the models consume;
//! [`DatasetProvider`] is the contract a data source implements;
//! [`MemoryDataset`] is the in-memory provider used for fixed train/test
//! pools; [`ExampleStore`] accumulates hand-labeled examples for the manual
//! training workflow.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Error, Result};

/// Active-pixel requirements a drawing must meet before it is accepted as a
/// training example.
const MIN_ACTIVE_PIXELS: usize = 5;
const ACTIVE_PIXEL_THRESHOLD: f32 = 0.1;

/// A batch of supervised examples: inputs and one-hot (or soft) targets.
///
/// Stored as contiguous buffers with row-major layout:
/// - `inputs.len() == len * input_dim`
/// - `targets.len() == len * target_dim`
///
/// Zero-length batches are legal; the models answer them with neutral
/// results (loss 0, accuracy 0) without touching any state.
#[derive(Debug, Clone)]
pub struct Batch {
    inputs: Vec<f32>,
    targets: Vec<f32>,
    len: usize,
    input_dim: usize,
    target_dim: usize,
}

impl Batch {
    /// Builds a batch from flat buffers with shapes `(len, input_dim)` and
    /// `(len, target_dim)`.
    pub fn from_flat(
        inputs: Vec<f32>,
        targets: Vec<f32>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 || target_dim == 0 {
            return Err(Error::InvalidData(
                "input_dim and target_dim must be > 0".to_owned(),
            ));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {input_dim}",
                inputs.len()
            )));
        }
        let len = inputs.len() / input_dim;
        if targets.len() != len * target_dim {
            return Err(Error::InvalidData(format!(
                "targets length {} does not match len * target_dim ({len} * {target_dim})",
                targets.len()
            )));
        }

        Ok(Self {
            inputs,
            targets,
            len,
            input_dim,
            target_dim,
        })
    }

    /// Builds a batch from per-example rows. Rows must be non-empty and
    /// uniform; use [`Batch::empty`] for a zero-length batch.
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::InvalidData(
                "from_rows requires at least one example; use Batch::empty".to_owned(),
            ));
        }
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }

        let input_dim = inputs[0].len();
        let target_dim = targets[0].len();
        for (i, row) in inputs.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::InvalidData(format!(
                    "input row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
        }
        for (i, row) in targets.iter().enumerate() {
            if row.len() != target_dim {
                return Err(Error::InvalidData(format!(
                    "target row {i} has len {}, expected {target_dim}",
                    row.len()
                )));
            }
        }

        let mut inputs_flat = Vec::with_capacity(inputs.len() * input_dim);
        for row in inputs {
            inputs_flat.extend_from_slice(row);
        }
        let mut targets_flat = Vec::with_capacity(targets.len() * target_dim);
        for row in targets {
            targets_flat.extend_from_slice(row);
        }

        Self::from_flat(inputs_flat, targets_flat, input_dim, target_dim)
    }

    /// A zero-length batch with the given dims.
    pub fn empty(input_dim: usize, target_dim: usize) -> Result<Self> {
        Self::from_flat(Vec::new(), Vec::new(), input_dim, target_dim)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    /// The `idx`-th input row. Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    /// The `idx`-th target row. Panics if `idx >= len`.
    #[inline]
    pub fn target(&self, idx: usize) -> &[f32] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }
}

/// A source of training and evaluation batches.
///
/// Implementations return freshly assembled batches of the requested size and
/// may cycle or reshuffle an underlying fixed pool; that policy belongs to
/// the provider, not to the models.
pub trait DatasetProvider {
    fn next_train_batch(&mut self, size: usize) -> Result<Batch>;
    fn next_test_batch(&mut self, size: usize) -> Result<Batch>;
}

/// In-memory [`DatasetProvider`] over fixed train/test pools.
///
/// Batches are drawn by walking a shuffled index order, cycling modulo the
/// pool size for batches larger than the pool, and the order is reshuffled
/// after every batch. All shuffling runs on an owned seeded RNG, so a given
/// seed always produces the same sequence of batches.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    train: Batch,
    test: Batch,
    train_order: Vec<usize>,
    test_order: Vec<usize>,
    rng: StdRng,
}

impl MemoryDataset {
    pub fn new(train: Batch, test: Batch, seed: u64) -> Result<Self> {
        if train.is_empty() || test.is_empty() {
            return Err(Error::InvalidData(
                "train and test pools must be non-empty".to_owned(),
            ));
        }
        if train.input_dim() != test.input_dim() || train.target_dim() != test.target_dim() {
            return Err(Error::InvalidData(format!(
                "train pool is ({}, {}) per example but test pool is ({}, {})",
                train.input_dim(),
                train.target_dim(),
                test.input_dim(),
                test.target_dim()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train_order: Vec<usize> = (0..train.len()).collect();
        let mut test_order: Vec<usize> = (0..test.len()).collect();
        train_order.shuffle(&mut rng);
        test_order.shuffle(&mut rng);

        Ok(Self {
            train,
            test,
            train_order,
            test_order,
            rng,
        })
    }

    #[inline]
    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    #[inline]
    pub fn test_len(&self) -> usize {
        self.test.len()
    }

    fn next_batch(pool: &Batch, order: &mut [usize], rng: &mut StdRng, size: usize) -> Batch {
        let mut inputs = Vec::with_capacity(size * pool.input_dim());
        let mut targets = Vec::with_capacity(size * pool.target_dim());

        for i in 0..size {
            let idx = order[i % order.len()];
            inputs.extend_from_slice(pool.input(idx));
            targets.extend_from_slice(pool.target(idx));
        }
        order.shuffle(rng);

        Batch::from_flat(inputs, targets, pool.input_dim(), pool.target_dim())
            .expect("rows copied from a validated pool")
    }
}

impl DatasetProvider for MemoryDataset {
    fn next_train_batch(&mut self, size: usize) -> Result<Batch> {
        Ok(Self::next_batch(
            &self.train,
            &mut self.train_order,
            &mut self.rng,
            size,
        ))
    }

    fn next_test_batch(&mut self, size: usize) -> Result<Batch> {
        Ok(Self::next_batch(
            &self.test,
            &mut self.test_order,
            &mut self.rng,
            size,
        ))
    }
}

/// Append-only store of hand-labeled training examples.
///
/// Accumulated by host action (one push per accepted drawing) and cleared
/// only explicitly. Deliberately independent of any model instance: resetting
/// a model does not clear examples, and clearing examples does not reset a
/// model.
#[derive(Debug, Clone)]
pub struct ExampleStore {
    input_dim: usize,
    num_classes: usize,
    features: Vec<f32>,
    labels: Vec<usize>,
}

impl ExampleStore {
    pub fn new(input_dim: usize, num_classes: usize) -> Result<Self> {
        if input_dim == 0 || num_classes == 0 {
            return Err(Error::InvalidData(
                "input_dim and num_classes must be > 0".to_owned(),
            ));
        }
        Ok(Self {
            input_dim,
            num_classes,
            features: Vec::new(),
            labels: Vec::new(),
        })
    }

    /// Appends a labeled example.
    ///
    /// Rejects feature vectors of the wrong length, labels outside
    /// `[0, num_classes)`, and drawings with fewer than five entries above
    /// 0.1 (too faint to be worth learning from).
    pub fn push(&mut self, features: &[f32], label: usize) -> Result<()> {
        if features.len() != self.input_dim {
            return Err(Error::DimensionMismatch {
                expected: self.input_dim,
                actual: features.len(),
            });
        }
        if label >= self.num_classes {
            return Err(Error::InvalidData(format!(
                "label {label} out of range for {} classes",
                self.num_classes
            )));
        }
        let active = features
            .iter()
            .filter(|&&v| v > ACTIVE_PIXEL_THRESHOLD)
            .count();
        if active < MIN_ACTIVE_PIXELS {
            return Err(Error::InvalidData(format!(
                "drawing has only {active} active pixels; need at least {MIN_ACTIVE_PIXELS}"
            )));
        }

        self.features.extend_from_slice(features);
        self.labels.push(label);
        Ok(())
    }

    /// Removes every stored example.
    pub fn clear(&mut self) {
        self.features.clear();
        self.labels.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// The `idx`-th feature vector. Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.features[start..start + self.input_dim]
    }

    /// The `idx`-th label. Panics if `idx >= len`.
    #[inline]
    pub fn label(&self, idx: usize) -> usize {
        self.labels[idx]
    }

    /// Number of stored examples per class.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0_usize; self.num_classes];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible(dim: usize) -> Vec<f32> {
        (0..dim).map(|i| if i % 2 == 0 { 0.8 } else { 0.0 }).collect()
    }

    #[test]
    fn batch_from_flat_validates_shapes() {
        assert!(Batch::from_flat(vec![0.0; 6], vec![0.0; 3], 2, 1).is_ok());
        assert!(Batch::from_flat(vec![0.0; 5], vec![0.0; 3], 2, 1).is_err());
        assert!(Batch::from_flat(vec![0.0; 6], vec![0.0; 2], 2, 1).is_err());
        assert!(Batch::from_flat(vec![], vec![], 0, 1).is_err());
    }

    #[test]
    fn batch_rows_round_trip_through_accessors() {
        let xs = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let ys = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let batch = Batch::from_rows(&xs, &ys).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.input(1), &[3.0, 4.0]);
        assert_eq!(batch.target(0), &[1.0, 0.0]);
    }

    #[test]
    fn batch_from_rows_rejects_ragged_rows() {
        let xs = vec![vec![1.0, 2.0], vec![3.0]];
        let ys = vec![vec![1.0], vec![0.0]];
        assert!(Batch::from_rows(&xs, &ys).is_err());
    }

    #[test]
    fn empty_batch_has_dims_but_no_rows() {
        let batch = Batch::empty(784, 10).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.input_dim(), 784);
        assert_eq!(batch.target_dim(), 10);
    }

    #[test]
    fn memory_dataset_is_deterministic_per_seed() {
        let pool = Batch::from_rows(
            &(0..8).map(|i| vec![i as f32, 0.0]).collect::<Vec<_>>(),
            &(0..8).map(|i| vec![(i % 2) as f32, ((i + 1) % 2) as f32]).collect::<Vec<_>>(),
        )
        .unwrap();

        let mut a = MemoryDataset::new(pool.clone(), pool.clone(), 42).unwrap();
        let mut b = MemoryDataset::new(pool.clone(), pool, 42).unwrap();

        for _ in 0..3 {
            let ba = a.next_train_batch(4).unwrap();
            let bb = b.next_train_batch(4).unwrap();
            for i in 0..4 {
                assert_eq!(ba.input(i), bb.input(i));
                assert_eq!(ba.target(i), bb.target(i));
            }
        }
    }

    #[test]
    fn memory_dataset_cycles_when_batch_exceeds_pool() {
        let pool = Batch::from_rows(&[vec![1.0], vec![2.0]], &[vec![1.0], vec![0.0]]).unwrap();
        let mut data = MemoryDataset::new(pool.clone(), pool, 0).unwrap();

        let batch = data.next_train_batch(5).unwrap();
        assert_eq!(batch.len(), 5);
        for i in 0..5 {
            let v = batch.input(i)[0];
            assert!(v == 1.0 || v == 2.0);
        }
    }

    #[test]
    fn memory_dataset_rejects_mismatched_pools() {
        let train = Batch::from_rows(&[vec![1.0, 2.0]], &[vec![1.0]]).unwrap();
        let test = Batch::from_rows(&[vec![1.0]], &[vec![1.0]]).unwrap();
        assert!(MemoryDataset::new(train, test, 0).is_err());
    }

    #[test]
    fn store_accepts_visible_drawings_and_counts_classes() {
        let mut store = ExampleStore::new(16, 10).unwrap();
        store.push(&visible(16), 3).unwrap();
        store.push(&visible(16), 3).unwrap();
        store.push(&visible(16), 7).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.label(2), 7);
        let counts = store.class_counts();
        assert_eq!(counts[3], 2);
        assert_eq!(counts[7], 1);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn store_rejects_faint_and_invalid_examples() {
        let mut store = ExampleStore::new(16, 10).unwrap();

        let faint = vec![0.05_f32; 16];
        assert!(store.push(&faint, 1).is_err());

        let mut four_pixels = vec![0.0_f32; 16];
        for v in four_pixels.iter_mut().take(4) {
            *v = 0.9;
        }
        assert!(store.push(&four_pixels, 1).is_err());

        assert!(store.push(&visible(8), 1).is_err());
        assert!(store.push(&visible(16), 10).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn clear_removes_examples() {
        let mut store = ExampleStore::new(16, 10).unwrap();
        store.push(&visible(16), 0).unwrap();
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.class_counts(), vec![0; 10]);
    }
}
