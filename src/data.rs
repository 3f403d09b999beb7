use std::cell::Cell;

use rand::{ SeedableRng, rngs::StdRng, seq::SliceRandom };

use crate::{
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
};


/// Examples and their class labels, one label per leading row.

#[derive(Debug, Clone)]
pub struct Batch<T: Real> {
  inputs: Tensor<T>,
  labels: Vec<usize>,
}

impl<T: Real> Batch<T> {
  pub fn new(inputs: Tensor<T>, labels: Vec<usize>) -> Result<Self> {
    let rows = if inputs.rank() == 0 { 1 } else { inputs.dim(0) };
    if rows != labels.len() {
      return Err(Error::LabelCount { expected: rows, found: labels.len() })
    }
    if labels.is_empty() {
      return Err(Error::InvalidData("a batch needs at least one example".into()))
    }
    Ok(Self { inputs, labels })
  }

  pub fn inputs(&self) -> &Tensor<T> {
    &self.inputs
  }

  pub fn labels(&self) -> &[usize] {
    &self.labels
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  /// Inputs viewed as `[len, width]` rows, sharing storage.
  ///
  /// Examples of shape `[28, 28]` flatten into rows of 784 values.

  pub fn flatten(&self, width: usize) -> Result<Tensor<T>> {
    let shape = self.inputs.shape().flatten_rows();
    if shape[-1] != width {
      return Err(Error::InputWidth { expected: width, found: shape[-1] })
    }
    Ok(self.inputs.reshape(&[self.len(), width]))
  }
}


/// Source of training batches. Every call to [batches](DataProvider::batches)
/// starts a fresh pass over the data.

pub trait DataProvider<T: Real> {
  fn batches(&self) -> Box<dyn Iterator<Item = Batch<T>> + '_>;
}

impl<T: Real> DataProvider<T> for Vec<Batch<T>> {
  fn batches(&self) -> Box<dyn Iterator<Item = Batch<T>> + '_> {
    Box::new(self.iter().cloned())
  }
}

impl<T: Real> DataProvider<T> for [Batch<T>] {
  fn batches(&self) -> Box<dyn Iterator<Item = Batch<T>> + '_> {
    Box::new(self.iter().cloned())
  }
}


/// Labelled examples held in memory, served in fixed size batches.
///
/// The last batch of a pass holds the remainder when the number of
/// examples is not a multiple of the batch size. With a seed, examples
/// are reshuffled for every pass, reproducibly.

#[derive(Debug, Clone)]
pub struct InMemoryDataset<T: Real> {
  inputs: Tensor<T>,
  labels: Vec<usize>,
  batch_size: usize,
  seed: Option<u64>,
  epoch: Cell<u64>,
}

impl<T: Real> InMemoryDataset<T> {
  /// `inputs` holds one example per leading row.

  pub fn new(inputs: Tensor<T>, labels: Vec<usize>, batch_size: usize) -> Result<Self> {
    if batch_size == 0 {
      return Err(Error::InvalidData("batch size must be positive".into()))
    }
    if inputs.rank() == 0 {
      return Err(Error::InvalidData("inputs need a leading example dimension".into()))
    }
    if inputs.dim(0) != labels.len() {
      return Err(Error::LabelCount { expected: inputs.dim(0), found: labels.len() })
    }
    Ok(Self { inputs, labels, batch_size, seed: None, epoch: Cell::new(0) })
  }

  pub fn shuffled(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn batch_size(&self) -> usize {
    self.batch_size
  }

  /// Dimensions of a single example.

  pub fn sample_dims(&self) -> &[usize] {
    &self.inputs.shape().dims[1..]
  }

  fn gather(&self, indices: &[usize]) -> Batch<T> {
    let width: usize = self.sample_dims().iter().product();
    let raw = self.inputs.raw();
    let mut data = Vec::with_capacity(indices.len() * width);
    for &i in indices {
      data.extend_from_slice(&raw[i * width..(i + 1) * width]);
    }
    let mut dims = vec![indices.len()];
    dims.extend_from_slice(self.sample_dims());
    Batch {
      inputs: Tensor::new(&dims, data),
      labels: indices.iter().map(|&i| self.labels[i] ).collect(),
    }
  }
}

impl<T: Real> DataProvider<T> for InMemoryDataset<T> {
  fn batches(&self) -> Box<dyn Iterator<Item = Batch<T>> + '_> {
    let mut order: Vec<usize> = (0..self.len()).collect();
    if let Some(seed) = self.seed {
      let epoch = self.epoch.get();
      self.epoch.set(epoch + 1);
      order.shuffle(&mut StdRng::seed_from_u64(seed.wrapping_add(epoch)));
    }
    let chunks: Vec<Vec<usize>> = order
      .chunks(self.batch_size)
      .map(|chunk| chunk.to_vec() )
      .collect();
    Box::new(chunks.into_iter().map(move |indices| self.gather(&indices) ))
  }
}


/// Generated datasets for demos and tests.

pub mod synthetic {
  use rand::{ SeedableRng, rngs::StdRng };

  use crate::{ scalar::Real, tensor::Tensor };

  /// Gaussian clusters, one per class, around randomly placed centers.
  ///
  /// Returns `samples` examples of shape `sample_dims` together with
  /// their labels. Classes are assigned round robin.

  pub fn blobs<T: Real>(
    samples: usize,
    sample_dims: &[usize],
    classes: usize,
    spread: T,
    seed: u64,
  ) -> (Tensor<T>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let width: usize = sample_dims.iter().product();
    let centers = Tensor::<T>::randn(&[classes.max(1), width], &mut rng);
    let noise = Tensor::<T>::randn(&[samples, width], &mut rng);
    let labels: Vec<usize> = (0..samples).map(|i| i % classes.max(1) ).collect();

    let centers = centers.raw();
    let data = noise.raw()
      .chunks(width.max(1))
      .zip(&labels)
      .flat_map(|(row, &label)| {
        let center = &centers[label * width..(label + 1) * width];
        row.iter().zip(center).map(|(&n, &c)| c + n * spread ).collect::<Vec<_>>()
      })
      .collect();

    let mut dims = vec![samples];
    dims.extend_from_slice(sample_dims);
    (Tensor::new(&dims, data), labels)
  }
}
