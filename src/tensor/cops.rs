use num_traits::Float;


/// Reference matrix product over row-major storage.

pub fn matmul<T: Float>(m: usize, k: usize, n: usize, lhs: &[T], rhs: &[T]) -> Vec<T> {
  debug_assert_eq!(lhs.len(), m * k);
  debug_assert_eq!(rhs.len(), k * n);
  let mut data = vec![T::zero(); m * n];
  for i in 0..m {
    for p in 0..k {
      let a = lhs[i * k + p];
      for j in 0..n {
        data[i * n + j] = data[i * n + j] + a * rhs[p * n + j];
      }
    }
  }
  data
}

#[cfg(feature = "unsafe")]
pub fn sgemm(m: usize, k: usize, n: usize, lhs: &[f32], rhs: &[f32]) -> Vec<f32> {
  assert_eq!(lhs.len(), m * k);
  assert_eq!(rhs.len(), k * n);
  let mut data = vec![0.0; m * n];
  // Both operands are contiguous and sized according to the asserts above
  unsafe {
    matrixmultiply::sgemm(
      m, k, n,
      1.0,
      lhs.as_ptr(), k as isize, 1,
      rhs.as_ptr(), n as isize, 1,
      0.0,
      data.as_mut_ptr(), n as isize, 1,
    );
  }
  data
}

#[cfg(feature = "unsafe")]
pub fn dgemm(m: usize, k: usize, n: usize, lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
  assert_eq!(lhs.len(), m * k);
  assert_eq!(rhs.len(), k * n);
  let mut data = vec![0.0; m * n];
  unsafe {
    matrixmultiply::dgemm(
      m, k, n,
      1.0,
      lhs.as_ptr(), k as isize, 1,
      rhs.as_ptr(), n as isize, 1,
      0.0,
      data.as_mut_ptr(), n as isize, 1,
    );
  }
  data
}
