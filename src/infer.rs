use itertools::Itertools;

use crate::{
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
  variable::no_grad,
  module::Module,
};


fn input_width<T: Real, M: Module<T> + ?Sized>(model: &M, example: usize) -> usize {
  model.input_width().unwrap_or(example)
}


/// Class probabilities for a batch of examples, as `[b, classes]`.
///
/// `inputs` holds one example per leading row, in any shape that
/// flattens to the model's input width. The model must end in a
/// log-probability stage.

pub fn predict_proba_batch<T, M>(model: &M, inputs: &Tensor<T>) -> Result<Tensor<T>>
where
  T: Real,
  M: Module<T> + ?Sized,
{
  let rows = if inputs.rank() == 0 { 1 } else { inputs.dim(0) };
  let width = input_width(model, inputs.size() / rows.max(1));
  if rows == 0 || inputs.size() != rows * width {
    let found = if rows == 0 { 0 } else { inputs.size() / rows };
    return Err(Error::InputWidth { expected: width, found })
  }
  no_grad(|| {
    let logp = model.forward(&inputs.reshape(&[rows, width]).tracked())?;
    Ok(logp.tensor().exp())
  })
}


/// Probability distribution over classes for a single example.
///
/// Runs without recording a graph, so no gradient bookkeeping is
/// touched. The result is non-negative and sums to one.

pub fn predict_proba<T, M>(model: &M, input: &Tensor<T>) -> Result<Vec<T>>
where
  T: Real,
  M: Module<T> + ?Sized,
{
  let width = input_width(model, input.size());
  if input.size() != width {
    return Err(Error::InputWidth { expected: width, found: input.size() })
  }
  Ok(predict_proba_batch(model, &input.reshape(&[1, width]))?.into_raw())
}


/// Most likely class for a single example.

pub fn predict<T, M>(model: &M, input: &Tensor<T>) -> Result<usize>
where
  T: Real,
  M: Module<T> + ?Sized,
{
  Ok(predict_proba(model, input)?
    .iter()
    .position_max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal) )
    .unwrap_or(0))
}
