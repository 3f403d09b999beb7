use rand::Rng;

use crate::{
  error::Result,
  ops::Ops,
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
  module::{ Module, Parameter },
};


/// Affine stage computing `x · weight + bias` for rows `x`.
///
/// Weights are stored as `[input, output]`, so a batch of
/// `[b, input]` rows maps to `[b, output]`.

#[derive(Debug, Clone)]
pub struct Linear<T: Real> {
  pub weight: Variable<T>,
  pub bias: Variable<T>,
}

impl<T: Real> Linear<T> {
  /// Initialize weights and bias uniformly in `±1/sqrt(input)`.

  pub fn new<R: Rng + ?Sized>(input: usize, output: usize, rng: &mut R) -> Self {
    let bound = T::one() / T::count(input.max(1)).sqrt();
    Self {
      weight: Tensor::uniform(&[input, output], -bound, bound, rng).trained(),
      bias: Tensor::uniform(&[output], -bound, bound, rng).trained(),
    }
  }

  pub fn from_tensors(weight: Tensor<T>, bias: Tensor<T>) -> Self {
    assert!(weight.rank() == 2 && bias.rank() == 1 && weight.dim(1) == bias.size(),
      "Weight {} doesn't fit bias {}", weight.shape(), bias.shape());
    Self { weight: weight.trained(), bias: bias.trained() }
  }

  pub fn in_features(&self) -> usize {
    self.weight.dim(0)
  }

  pub fn out_features(&self) -> usize {
    self.weight.dim(1)
  }
}

impl<T: Real> Module<T> for Linear<T> {
  fn forward(&self, input: &Variable<T>) -> Result<Variable<T>> {
    Ok(input.mm(&self.weight).add_rows(&self.bias))
  }

  fn parameters(&self) -> Vec<Parameter<T>> {
    vec![
      Parameter::new("weight", self.weight.clone()),
      Parameter::new("bias", self.bias.clone()),
    ]
  }

  fn input_width(&self) -> Option<usize> {
    Some(self.in_features())
  }

  fn output_width(&self, _input: usize) -> usize {
    self.out_features()
  }
}
