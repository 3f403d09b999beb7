use serde::{ Serialize, Deserialize };

use crate::internal::*;


/// The shape of a [Tensor](crate::Tensor).
///
/// Tensors are always stored contiguously in row-major order,
/// so a shape is fully described by its dimensions.

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
  pub dims: Vec<usize>,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    Self { dims: dims.to_vec() }
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  /// Collapse all trailing dimensions into one, keeping the first.

  pub fn flatten_rows(&self) -> Self {
    match self.dims.split_first() {
      Some((&rows, rest)) => Self::new(&[rows, rest.iter().product()]),
      None => Self::new(&[1, 1]),
    }
  }
}

impl std::ops::Index<isize> for Shape {
  type Output = usize;

  fn index(&self, idx: isize) -> &Self::Output {
    let idx = negative_index(idx, self.rank());
    &self.dims[idx]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape{:?}", self.dims)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn size() {
    assert_eq!(Shape::new(&[4, 28, 28]).size(), 3136);
    assert_eq!(Shape::new(&[]).size(), 1);
  }

  #[test]
  fn negative_indexing() {
    let shape = Shape::new(&[2, 3, 4]);
    assert_eq!(shape[-1], 4);
    assert_eq!(shape[-3], 2);
    assert_eq!(shape[1], 3);
  }

  #[test]
  fn flatten_rows() {
    assert_eq!(Shape::new(&[4, 1, 28, 28]).flatten_rows().dims, vec![4, 784]);
    assert_eq!(Shape::new(&[5]).flatten_rows().dims, vec![5, 1]);
  }
}
