use crate::{
  error::{ Error, Result },
  ops::Ops,
  scalar::Real,
  shape::Shape,
  variable::Variable,
};


/// Scores model outputs against integer class labels.

pub trait Loss<T: Real> {
  fn loss(&self, output: &Variable<T>, labels: &[usize]) -> Result<Variable<T>>;
}


fn check_labels<T: Real>(output: &Variable<T>, labels: &[usize]) -> Result<()> {
  if output.rank() != 2 {
    let (lhs, rhs) = (output.shape().clone(), Shape::new(&[labels.len()]));
    return Err(Error::ShapeMismatch { op: "loss", lhs, rhs })
  }
  let rows = output.dim(0);
  if labels.len() != rows {
    return Err(Error::LabelCount { expected: rows, found: labels.len() })
  }
  let classes = output.dim(-1);
  match labels.iter().find(|&&label| label >= classes ) {
    Some(&label) => Err(Error::LabelOutOfRange { label, classes }),
    None => Ok(()),
  }
}


/// Mean negative log-likelihood for models that produce log-probabilities.

#[derive(Debug, Clone, Copy, Default)]
pub struct NllLoss;

impl<T: Real> Loss<T> for NllLoss {
  fn loss(&self, output: &Variable<T>, labels: &[usize]) -> Result<Variable<T>> {
    check_labels(output, labels)?;
    Ok(output.nll(labels))
  }
}


/// Log-softmax followed by [NllLoss], for models that produce raw scores.

#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl<T: Real> Loss<T> for CrossEntropyLoss {
  fn loss(&self, output: &Variable<T>, labels: &[usize]) -> Result<Variable<T>> {
    check_labels(output, labels)?;
    Ok(output.cross_entropy(labels))
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::Tensor;

  #[test]
  fn nll_of_uniform_prediction() {
    let logp = Tensor::fill(&[4, 10], -(10.0f64).ln()).tracked();
    let loss = NllLoss.loss(&logp, &[0, 3, 9, 5]).unwrap();
    assert!((loss.item() - (10.0f64).ln()).abs() < 1e-12);
  }

  #[test]
  fn cross_entropy_of_logits() {
    let logits = Tensor::new(&[2, 2], vec![0.0, 0.0, 5.0, 5.0]).tracked();
    let loss = CrossEntropyLoss.loss(&logits, &[1, 0]).unwrap();
    assert!((loss.item() - (2.0f64).ln()).abs() < 1e-12);
  }

  #[test]
  fn validates_labels() {
    let logp = Tensor::<f32>::zeros(&[3, 10]).tracked();
    assert!(matches!(NllLoss.loss(&logp, &[1, 2]), Err(Error::LabelCount { expected: 3, found: 2 })));
    assert!(matches!(NllLoss.loss(&logp, &[1, 2, 10]), Err(Error::LabelOutOfRange { label: 10, classes: 10 })));
  }
}
