use std::fmt::{ Debug, Display };

use rand::distributions::uniform::SampleUniform;
use num_traits::{ Float, NumAssignOps };
use serde::{ Serialize, de::DeserializeOwned };

use crate::tensor::cops;


/// Floating point types that may be stored in a [Tensor](crate::Tensor)
/// and differentiated through.
///
/// Implemented for [f32] and [f64]. Matrix products dispatch through
/// [Real::gemm], which uses the `matrixmultiply` kernels when the
/// `unsafe` feature is enabled.

pub trait Real:
  Float + NumAssignOps + std::iter::Sum + SampleUniform
  + Default + Debug + Display + Send + Sync
  + Serialize + DeserializeOwned + 'static
{
  /// Convert a literal into this type.
  fn of(value: f64) -> Self;

  fn count(n: usize) -> Self {
    Self::of(n as f64)
  }

  /// Multiply a row-major `[m, k]` matrix with a row-major `[k, n]` matrix.
  fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self]) -> Vec<Self>;
}

impl Real for f32 {
  fn of(value: f64) -> Self {
    value as f32
  }

  #[cfg(feature = "unsafe")]
  fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self]) -> Vec<Self> {
    cops::sgemm(m, k, n, lhs, rhs)
  }

  #[cfg(not(feature = "unsafe"))]
  fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self]) -> Vec<Self> {
    cops::matmul(m, k, n, lhs, rhs)
  }
}

impl Real for f64 {
  fn of(value: f64) -> Self {
    value
  }

  #[cfg(feature = "unsafe")]
  fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self]) -> Vec<Self> {
    cops::dgemm(m, k, n, lhs, rhs)
  }

  #[cfg(not(feature = "unsafe"))]
  fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self]) -> Vec<Self> {
    cops::matmul(m, k, n, lhs, rhs)
  }
}
