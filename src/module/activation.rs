use serde::{ Serialize, Deserialize };

use crate::{
  error::Result,
  ops::Ops,
  scalar::Real,
  variable::Variable,
  module::{ Module, Parameter },
};


/// Fixed non-linear stage without parameters.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation<T> {
  #[serde(rename = "relu")]
  ReLU,
  #[serde(rename = "leaky_relu")]
  LeakyReLU { alpha: T },
  Sigmoid,
  Tanh,
  /// Row-wise log-probabilities, used as the final stage of a classifier.
  LogSoftmax,
}

impl<T: Real> Module<T> for Activation<T> {
  fn forward(&self, input: &Variable<T>) -> Result<Variable<T>> {
    Ok(match *self {
      Self::ReLU => input.relu(),
      Self::LeakyReLU { alpha } => input.leaky_relu(alpha),
      Self::Sigmoid => input.sigmoid(),
      Self::Tanh => input.tanh(),
      Self::LogSoftmax => input.log_softmax(),
    })
  }

  fn parameters(&self) -> Vec<Parameter<T>> {
    vec![]
  }

  fn input_width(&self) -> Option<usize> {
    None
  }

  fn output_width(&self, input: usize) -> usize {
    input
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::Tensor;

  #[test]
  fn applies_elementwise() {
    let x = Tensor::new(&[1, 3], vec![-1.0, 0.0, 2.0]).tracked();
    let y = Activation::LeakyReLU { alpha: 0.5 }.forward(&x).unwrap();
    assert_eq!(y.tensor(), &Tensor::new(&[1, 3], vec![-0.5, 0.0, 2.0]));
    assert_eq!(Activation::<f64>::ReLU.output_width(7), 7);
  }

  #[test]
  fn log_softmax_rows() {
    let x = Tensor::new(&[2, 3], vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0]).tracked();
    let y = Activation::LogSoftmax.forward(&x).unwrap();
    for row in y.exp().iter_rows() {
      assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
  }

  #[test]
  fn deserializes_from_config_names() {
    let act: Activation<f32> = serde_json::from_str(r#""relu""#).unwrap();
    assert_eq!(act, Activation::ReLU);
    let act: Activation<f32> = serde_json::from_str(r#"{"leaky_relu":{"alpha":0.1}}"#).unwrap();
    assert_eq!(act, Activation::LeakyReLU { alpha: 0.1 });
    let act: Activation<f32> = serde_json::from_str(r#""log_softmax""#).unwrap();
    assert_eq!(act, Activation::LogSoftmax);
  }
}
