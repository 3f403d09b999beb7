use crate::{
  tensor::Tensor,
  scalar::Real,
};


// Eager element-wise and row-wise kernels. Their differentiable
// counterparts live in variable::mops.

impl<T: Real> Tensor<T> {
  pub fn relu(&self) -> Self {
    self.vectorize(|a| a.max(T::zero()) )
  }

  pub fn leaky_relu(&self, alpha: T) -> Self {
    self.vectorize(|a| if a > T::zero() { a } else { a * alpha })
  }

  pub fn sigmoid(&self) -> Self {
    self.vectorize(|a| T::one() / (T::one() + (-a).exp()) )
  }

  pub fn tanh(&self) -> Self {
    self.vectorize(|a| a.tanh() )
  }

  /// Numerically stable log-softmax over the last dimension.

  pub fn log_softmax(&self) -> Self {
    let width = self.dim(-1);
    let data = self.raw()
      .chunks(width)
      .flat_map(|row| {
        let max = row.iter().copied().fold(T::neg_infinity(), T::max);
        let lse = row.iter().map(|&a| (a - max).exp() ).sum::<T>().ln();
        row.iter().map(move |&a| (a - max) - lse )
      })
      .collect();
    Self::from_shape(self.shape().clone(), data)
  }

  pub fn softmax(&self) -> Self {
    self.log_softmax().exp()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn activations() {
    let x = Tensor::vec(&[-2.0, 0.0, 3.0]);
    assert_eq!(x.relu(), Tensor::vec(&[0.0, 0.0, 3.0]));
    assert_eq!(x.leaky_relu(0.1), Tensor::vec(&[-0.2, 0.0, 3.0]));
    assert_eq!(x.sigmoid().row(0)[1], 0.5);
    assert_eq!(x.tanh().row(0)[1], 0.0);
  }

  #[test]
  fn softmax_rows_sum_to_one() {
    let x = Tensor::new(&[3, 4], (0..12).map(|i| i as f64 * 0.7 - 3.0 ).collect());
    for row in x.softmax().iter_rows() {
      let sum: f64 = row.iter().sum();
      assert!((sum - 1.0).abs() < 1e-12);
      assert!(row.iter().all(|&p| p >= 0.0 ));
    }
  }

  #[test]
  fn log_softmax_is_stable() {
    let x = Tensor::new(&[1, 3], vec![1000.0f32, 1000.0, 1000.0]);
    let expected = -(3.0f32).ln();
    for logp in x.log_softmax().row(0) {
      assert!((logp - expected).abs() < 1e-5);
    }
    let x = Tensor::new(&[1, 2], vec![1000.0f32, 999.0]);
    let logp = x.log_softmax().row(0);
    let lse = (1.0f32 + (-1.0f32).exp()).ln();
    assert!((logp[0] + lse).abs() < 1e-6);
    assert!((logp[1] + 1.0 + lse).abs() < 1e-6);
  }
}
