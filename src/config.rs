//! Training configuration, loaded from JSON.
//!
//! Every field has a default, so a config file only needs to name what
//! it changes:
//!
//! ```json
//! {
//!   "layers": [784, 256, 10],
//!   "activation": { "leaky_relu": { "alpha": 0.01 } },
//!   "optimizer": { "kind": "adam", "beta1": 0.9, "beta2": 0.999 },
//!   "learning_rate": 0.001
//! }
//! ```

use std::path::Path;

use rand::{ SeedableRng, rngs::StdRng };
use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  scalar::Real,
  module::{ Activation, Module, Sequential },
  optimize::{ Optimizer, Strategy, Sgd, Momentum, Nesterov, Adam },
};


/// Parameter update rule and its hyper-parameters.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OptimizerConfig {
  Sgd,
  Momentum {
    #[serde(default = "default_momentum")]
    momentum: f64,
  },
  Nesterov {
    #[serde(default = "default_momentum")]
    momentum: f64,
  },
  Adam {
    #[serde(default = "default_beta1")]
    beta1: f64,
    #[serde(default = "default_beta2")]
    beta2: f64,
  },
}

fn default_momentum() -> f64 { 0.9 }
fn default_beta1() -> f64 { 0.9 }
fn default_beta2() -> f64 { 0.999 }

impl OptimizerConfig {
  pub fn strategy<T: Real>(&self) -> Box<dyn Strategy<T>> {
    match *self {
      Self::Sgd => Box::new(Sgd),
      Self::Momentum { momentum } => Box::new(Momentum::new(T::of(momentum))),
      Self::Nesterov { momentum } => Box::new(Nesterov::new(T::of(momentum))),
      Self::Adam { beta1, beta2 } => Box::new(Adam::new(T::of(beta1), T::of(beta2))),
    }
  }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
  /// Widths of the affine stages, input first, classes last.
  pub layers: Vec<usize>,
  /// Non-linearity between affine stages.
  pub activation: Activation<f64>,
  pub optimizer: OptimizerConfig,
  pub learning_rate: f64,
  pub epochs: usize,
  pub batch_size: usize,
  /// Seeds weight initialization and shuffling.
  pub seed: u64,
  /// Number of examples in the generated demo dataset.
  pub samples: usize,
}

impl Default for TrainingConfig {
  fn default() -> Self {
    Self {
      layers: vec![784, 128, 64, 10],
      activation: Activation::ReLU,
      optimizer: OptimizerConfig::Sgd,
      learning_rate: 0.01,
      epochs: 5,
      batch_size: 64,
      seed: 42,
      samples: 2048,
    }
  }
}

impl TrainingConfig {
  pub fn from_json_str(json: &str) -> Result<Self> {
    let config: Self = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    Self::from_json_str(&std::fs::read_to_string(path)?)
  }

  pub fn validate(&self) -> Result<()> {
    if self.layers.len() < 2 || self.layers.contains(&0) {
      return Err(Error::InvalidConfig(format!("layers must hold at least two positive widths, got {:?}", self.layers)))
    }
    if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
      return Err(Error::InvalidConfig(format!("learning_rate must be positive, got {}", self.learning_rate)))
    }
    if self.batch_size == 0 {
      return Err(Error::InvalidConfig("batch_size must be positive".into()))
    }
    if self.samples == 0 {
      return Err(Error::InvalidConfig("samples must be positive".into()))
    }
    if let Activation::LogSoftmax = self.activation {
      return Err(Error::InvalidConfig("log_softmax can only end a model".into()))
    }
    Ok(())
  }

  pub fn activation<T: Real>(&self) -> Activation<T> {
    match self.activation {
      Activation::ReLU => Activation::ReLU,
      Activation::LeakyReLU { alpha } => Activation::LeakyReLU { alpha: T::of(alpha) },
      Activation::Sigmoid => Activation::Sigmoid,
      Activation::Tanh => Activation::Tanh,
      Activation::LogSoftmax => Activation::LogSoftmax,
    }
  }

  /// Freshly initialized model, reproducible from [seed](Self::seed).

  pub fn build_model<T: Real>(&self) -> Result<Sequential<T>> {
    let mut rng = StdRng::seed_from_u64(self.seed);
    Sequential::mlp(&self.layers, self.activation(), &mut rng)
  }

  /// Optimizer bound to all parameters of `model`.

  pub fn build_optimizer<T, M>(&self, model: &M) -> Optimizer<T, Box<dyn Strategy<T>>>
  where
    T: Real,
    M: Module<T> + ?Sized,
  {
    Optimizer::new(model.parameters(), T::of(self.learning_rate), self.optimizer.strategy())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = TrainingConfig::from_json_str("{}").unwrap();
    assert_eq!(config, TrainingConfig::default());
    let model = config.build_model::<f32>().unwrap();
    assert_eq!(model.input_width(), Some(784));
    assert_eq!(model.classes(), 10);
  }

  #[test]
  fn partial_override() {
    let config = TrainingConfig::from_json_str(r#"{
      "layers": [4, 3],
      "activation": { "leaky_relu": { "alpha": 0.2 } },
      "optimizer": { "kind": "momentum" },
      "epochs": 2
    }"#).unwrap();
    assert_eq!(config.layers, vec![4, 3]);
    assert_eq!(config.activation::<f32>(), Activation::LeakyReLU { alpha: 0.2 });
    assert_eq!(config.optimizer, OptimizerConfig::Momentum { momentum: 0.9 });
    assert_eq!(config.epochs, 2);
    assert_eq!(config.batch_size, 64);

    let model = config.build_model::<f64>().unwrap();
    let optimizer = config.build_optimizer(&model);
    assert_eq!(optimizer.parameters().len(), 2);
  }

  #[test]
  fn same_seed_same_model() {
    let config = TrainingConfig { layers: vec![5, 4, 2], ..Default::default() };
    let a = config.build_model::<f64>().unwrap();
    let b = config.build_model::<f64>().unwrap();
    for (a, b) in a.parameters().iter().zip(b.parameters()) {
      assert_eq!(a.tensor(), b.tensor());
    }
  }

  #[test]
  fn rejects_invalid_values() {
    assert!(matches!(TrainingConfig::from_json_str(r#"{"layers": [10]}"#), Err(Error::InvalidConfig(_))));
    assert!(matches!(TrainingConfig::from_json_str(r#"{"learning_rate": -1.0}"#), Err(Error::InvalidConfig(_))));
    assert!(matches!(TrainingConfig::from_json_str(r#"{"batch_size": 0}"#), Err(Error::InvalidConfig(_))));
    assert!(matches!(TrainingConfig::from_json_str(r#"{"samples": 0}"#), Err(Error::InvalidConfig(_))));
    assert!(matches!(TrainingConfig::from_json_str(r#"{"epochs": "many"}"#), Err(Error::Config(_))));
  }
}
