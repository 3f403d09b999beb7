use log::debug;
use rand::Rng;

mod linear;
mod activation;

pub use linear::Linear;
pub use activation::Activation;

use crate::{
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
};


/// Trainable tensor owned by a model, addressed by name.

#[derive(Debug, Clone)]
pub struct Parameter<T: Real> {
  pub name: String,
  pub variable: Variable<T>,
}

impl<T: Real> Parameter<T> {
  pub fn new(name: impl Into<String>, variable: Variable<T>) -> Self {
    Self { name: name.into(), variable }
  }

  pub fn tensor(&self) -> &Tensor<T> {
    self.variable.tensor()
  }

  pub fn grad(&self) -> Option<&Tensor<T>> {
    self.variable.grad()
  }
}


/// A differentiable computation with a fixed input and output width.

pub trait Module<T: Real> {
  fn forward(&self, input: &Variable<T>) -> Result<Variable<T>>;

  /// All trainable parameters, in a stable order.
  fn parameters(&self) -> Vec<Parameter<T>>;

  /// Width of the input rows this module accepts. `None` for
  /// modules that work on any width.
  fn input_width(&self) -> Option<usize>;

  /// Width of the rows this module produces for inputs of `input` width.
  fn output_width(&self, input: usize) -> usize;

  fn num_parameters(&self) -> usize {
    self.parameters().iter().map(|param| param.tensor().size() ).sum()
  }
}


/// One step of a [Sequential] model.

#[derive(Debug, Clone)]
pub enum Stage<T: Real> {
  Linear(Linear<T>),
  Activation(Activation<T>),
}

impl<T: Real> Stage<T> {
  pub fn linear<R: Rng + ?Sized>(input: usize, output: usize, rng: &mut R) -> Self {
    Self::Linear(Linear::new(input, output, rng))
  }

  fn module(&self) -> &dyn Module<T> {
    match self {
      Self::Linear(linear) => linear,
      Self::Activation(activation) => activation,
    }
  }
}

impl<T: Real> From<Linear<T>> for Stage<T> {
  fn from(linear: Linear<T>) -> Self {
    Self::Linear(linear)
  }
}

impl<T: Real> From<Activation<T>> for Stage<T> {
  fn from(activation: Activation<T>) -> Self {
    Self::Activation(activation)
  }
}


/// Ordered composition of stages, checked at construction so that every
/// stage accepts what its predecessor produces.

#[derive(Debug, Clone)]
pub struct Sequential<T: Real> {
  stages: Vec<Stage<T>>,
  input_width: usize,
  output_width: usize,
}

impl<T: Real> Sequential<T> {
  pub fn new(stages: Vec<Stage<T>>) -> Result<Self> {
    let input_width = stages.iter()
      .find_map(|stage| stage.module().input_width() )
      .ok_or_else(|| Error::InvalidModel("a model needs at least one linear stage".into()) )?;
    let mut width = input_width;
    for (i, stage) in stages.iter().enumerate() {
      let module = stage.module();
      if let Some(expected) = module.input_width() {
        if expected != width {
          return Err(Error::WidthMismatch { stage: i, expected, found: width })
        }
      }
      width = module.output_width(width);
    }
    debug!("built model {input_width} -> {width} with {} stages", stages.len());
    Ok(Self { stages, input_width, output_width: width })
  }

  /// Standard perceptron: linear stages of the given widths joined by
  /// `activation`, ending in log-probabilities.

  pub fn mlp<R: Rng + ?Sized>(widths: &[usize], activation: Activation<T>, rng: &mut R) -> Result<Self> {
    if widths.len() < 2 {
      return Err(Error::InvalidModel(format!("need at least two widths, got {widths:?}")))
    }
    let mut stages = vec![];
    for (i, pair) in widths.windows(2).enumerate() {
      if i > 0 { stages.push(activation.into()) }
      stages.push(Stage::linear(pair[0], pair[1], rng));
    }
    stages.push(Activation::LogSoftmax.into());
    Self::new(stages)
  }

  pub fn stages(&self) -> &[Stage<T>] {
    &self.stages
  }

  /// Number of classes a classifier built from this model distinguishes.

  pub fn classes(&self) -> usize {
    self.output_width
  }
}

impl<T: Real> Module<T> for Sequential<T> {
  fn forward(&self, input: &Variable<T>) -> Result<Variable<T>> {
    let found = if input.rank() == 2 { input.dim(-1) } else { input.size() };
    if input.rank() != 2 || found != self.input_width {
      return Err(Error::InputWidth { expected: self.input_width, found })
    }
    self.stages.iter().try_fold(input.clone(), |x, stage| stage.module().forward(&x) )
  }

  fn parameters(&self) -> Vec<Parameter<T>> {
    self.stages.iter()
      .enumerate()
      .flat_map(|(i, stage)| {
        stage.module().parameters().into_iter().map(move |param| {
          Parameter::new(format!("{i}.{}", param.name), param.variable)
        })
      })
      .collect()
  }

  fn input_width(&self) -> Option<usize> {
    Some(self.input_width)
  }

  fn output_width(&self, _input: usize) -> usize {
    self.output_width
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };

  fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
  }

  #[test]
  fn chained_widths() {
    let model = Sequential::<f32>::mlp(&[784, 128, 64, 10], Activation::ReLU, &mut rng()).unwrap();
    assert_eq!(model.stages().len(), 6);
    assert_eq!(model.input_width(), Some(784));
    assert_eq!(model.classes(), 10);
    assert_eq!(model.num_parameters(), 784 * 128 + 128 + 128 * 64 + 64 + 64 * 10 + 10);
    let output = model.forward(&Tensor::zeros(&[5, 784]).tracked()).unwrap();
    assert_eq!(output.shape().dims, vec![5, 10]);
  }

  #[test]
  fn parameter_names() {
    let model = Sequential::<f32>::mlp(&[4, 3, 2], Activation::Tanh, &mut rng()).unwrap();
    let names: Vec<_> = model.parameters().into_iter().map(|p| p.name ).collect();
    assert_eq!(names, vec!["0.weight", "0.bias", "2.weight", "2.bias"]);
  }

  #[test]
  fn rejects_mismatched_stages() {
    let mut rng = rng();
    let stages = vec![
      Stage::linear(784, 128, &mut rng),
      Activation::ReLU.into(),
      Stage::linear(64, 10, &mut rng),
    ];
    match Sequential::<f32>::new(stages) {
      Err(Error::WidthMismatch { stage, expected, found }) => {
        assert_eq!((stage, expected, found), (2, 64, 128));
      },
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn rejects_models_without_linear_stage() {
    let stages = vec![Activation::<f32>::ReLU.into()];
    assert!(matches!(Sequential::<f32>::new(stages), Err(Error::InvalidModel(_))));
    assert!(matches!(Sequential::<f32>::mlp(&[3], Activation::ReLU, &mut rng()), Err(Error::InvalidModel(_))));
  }

  #[test]
  fn rejects_wrong_input_width() {
    let model = Sequential::<f32>::mlp(&[784, 128, 64, 10], Activation::ReLU, &mut rng()).unwrap();
    let result = model.forward(&Tensor::zeros(&[4, 783]).tracked());
    assert!(matches!(result, Err(Error::InputWidth { expected: 784, found: 783 })));
    let result = model.forward(&Tensor::zeros(&[4, 28, 28]).tracked());
    assert!(matches!(result, Err(Error::InputWidth { .. })));
  }
}
