use crate::scalar::Real;


/// Differentiable operations available on a [Variable](crate::Variable).
///
/// Each call records a node in the computation graph (unless grad mode is
/// off, see [no_grad](crate::no_grad)), so gradients can later flow back
/// through it.
///
/// Shape preconditions are asserted, like the eager [Tensor](crate::Tensor)
/// kernels they build on. Callers validate user input beforehand.

pub trait Ops<I: Real>: Sized {
  /// Matrix product of `[m, k]` and `[k, n]`.
  fn mm(&self, rhs: &Self) -> Self;

  /// Add a `[n]` vector to every row of a `[m, n]` matrix.
  fn add_rows(&self, row: &Self) -> Self;

  /// Element-wise product of equally shaped operands.
  fn mul(&self, rhs: &Self) -> Self;

  /// Sum of all elements, as a scalar.
  fn sum(&self) -> Self;

  fn reshape(&self, dims: &[usize]) -> Self;
  fn exp(&self) -> Self;
  fn relu(&self) -> Self;
  fn leaky_relu(&self, alpha: I) -> Self;
  fn sigmoid(&self) -> Self;
  fn tanh(&self) -> Self;

  /// Log-probabilities over the last dimension.
  fn log_softmax(&self) -> Self;

  /// Mean negative log-likelihood of `labels` under row-wise log-probabilities.
  fn nll(&self, labels: &[usize]) -> Self;

  fn cross_entropy(&self, labels: &[usize]) -> Self {
    self.log_softmax().nll(labels)
  }
}
