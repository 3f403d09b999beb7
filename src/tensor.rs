use std::rc::Rc;
use std::cell::{ Ref, RefMut, RefCell };

use rand::Rng;
use itertools::Itertools;
use serde::{ Serialize, Deserialize };

pub(crate) mod cops;
mod lops;

use crate::{
  internal::*,
  shape::Shape,
  scalar::Real,
  variable::Variable,
};


/// Dense multidimensional array of [Real] values.
///
/// Cloning a tensor is cheap and yields a handle to the same storage,
/// which is how parameters get mutated in place by an optimizer while
/// the model keeps using them. Use [detach](Tensor::detach) for a copy.
///
/// Call [trained](Tensor::trained) or [tracked](Tensor::tracked) to
/// wrap a tensor in a differentiable [Variable].

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Tensor<T: Real> {
  shape: Shape,
  data: Rc<RefCell<Vec<T>>>,
}

impl<T: Real> PartialEq for Tensor<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.shape == rhs.shape && *self.raw() == *rhs.raw()
  }
}

impl<T: Real> Tensor<T> {
  pub fn from_shape(shape: Shape, data: Vec<T>) -> Self {
    assert_eq!(shape.size(), data.len(),
      "{} doesn't match data length {}", shape, data.len());
    Self { shape, data: Rc::new(RefCell::new(data)) }
  }

  pub fn new(shape: &[usize], data: Vec<T>) -> Self {
    Self::from_shape(Shape::new(shape), data)
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn scalar(item: T) -> Self {
    Self::new(&[], vec![item])
  }

  pub fn fill(shape: &[usize], filler: T) -> Self {
    Self::new(shape, vec![filler; shape.iter().product()])
  }

  pub fn zeros(shape: &[usize]) -> Self {
    Self::fill(shape, T::zero())
  }

  pub fn ones(shape: &[usize]) -> Self {
    Self::fill(shape, T::one())
  }

  pub fn randn<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Self {
    let len = shape.iter().product();
    let mut data = vec![T::zero(); len];
    for i in 0..(len + 1) / 2 {
      let j = i * 2;
      let (r1, r2): (T, T) = randn(rng);
      data[j] = r1;
      if j + 1 < len { data[j + 1] = r2 }
    }
    Self::new(shape, data)
  }

  pub fn uniform<R: Rng + ?Sized>(shape: &[usize], low: T, high: T, rng: &mut R) -> Self {
    let data = (0..shape.iter().product())
      .map(|_| rng.gen_range(low, high) )
      .collect();
    Self::new(shape, data)
  }

  pub fn shape(&self) -> &Shape {
    &self.shape
  }

  pub fn dim(&self, idx: isize) -> usize {
    self.shape[idx]
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  pub fn raw(&self) -> Ref<Vec<T>> {
    self.data.borrow()
  }

  pub fn raw_mut(&self) -> RefMut<Vec<T>> {
    self.data.borrow_mut()
  }

  pub fn to_vec(&self) -> Vec<T> {
    self.raw().clone()
  }

  pub fn into_raw(self) -> Vec<T> {
    match Rc::try_unwrap(self.data) {
      Ok(cell) => cell.into_inner(),
      Err(shared) => shared.borrow().clone(),
    }
  }

  pub fn item(&self) -> T {
    assert!(self.size() == 1,
      "Can't extract item from non-scalar {}", self.shape);
    self.raw()[0]
  }

  pub fn shared_with(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.data, &other.data)
  }

  /// Copy into fresh storage.

  pub fn detach(&self) -> Self {
    Self::from_shape(self.shape.clone(), self.to_vec())
  }

  /// View the same storage with different dimensions.

  pub fn reshape(&self, dims: &[usize]) -> Self {
    let shape = Shape::new(dims);
    assert_eq!(shape.size(), self.size(),
      "Can't reshape {} into {}", self.shape, shape);
    Self { shape, data: self.data.clone() }
  }

  /// Overwrite this tensor's values in place.

  pub fn assign(&self, other: &Self) {
    assert_eq!(self.size(), other.size(),
      "Could not assign {} tensor with {} tensor", self.shape, other.shape);
    if self.shared_with(other) { return }
    self.raw_mut().copy_from_slice(&other.raw());
  }

  pub fn refill(&self, filler: T) {
    self.raw_mut().iter_mut().for_each(|a| *a = filler );
  }

  /// Add another tensor's values in place.

  pub fn accumulate(&self, other: &Self) {
    assert_eq!(self.shape, other.shape,
      "Could not accumulate {} into {}", other.shape, self.shape);
    let other = if self.shared_with(other) { other.detach() } else { other.clone() };
    let mut data = self.raw_mut();
    for (a, &b) in data.iter_mut().zip(other.raw().iter()) {
      *a += b;
    }
  }

  pub fn zip<F>(&self, rhs: &Self, cb: F) -> Self
  where
    F: Fn(T, T) -> T,
  {
    assert_eq!(self.shape, rhs.shape,
      "Can't combine {} with {}", self.shape, rhs.shape);
    let data = self.raw().iter()
      .zip(rhs.raw().iter())
      .map(|(&a, &b)| cb(a, b) )
      .collect();
    Self::from_shape(self.shape.clone(), data)
  }

  pub fn vectorize<F>(&self, cb: F) -> Self
  where
    F: FnMut(T) -> T,
  {
    let data = self.raw().iter().copied().map(cb).collect();
    Self::from_shape(self.shape.clone(), data)
  }

  pub fn row(&self, index: usize) -> Vec<T> {
    let width = self.dim(-1);
    self.raw()[index * width .. (index + 1) * width].to_vec()
  }

  pub fn iter_rows(&self) -> impl Iterator<Item = Vec<T>> + '_ {
    (0..self.dim(0)).map(move |i| self.row(i) )
  }

  /// Matrix product of two `[m, k]` and `[k, n]` tensors.

  pub fn mm(&self, rhs: &Self) -> Self {
    assert!(self.rank() == 2 && rhs.rank() == 2 && self.dim(1) == rhs.dim(0),
      "Can't multiply {} with {}", self.shape, rhs.shape);
    let (m, k, n) = (self.dim(0), self.dim(1), rhs.dim(1));
    let data = T::gemm(m, k, n, &self.raw(), &rhs.raw());
    Self::new(&[m, n], data)
  }

  /// Transpose a matrix, materializing the result.

  pub fn transpose(&self) -> Self {
    assert_eq!(self.rank(), 2, "Can only transpose matrices, got {}", self.shape);
    let (rows, cols) = (self.dim(0), self.dim(1));
    let raw = self.raw();
    let mut data = Vec::with_capacity(raw.len());
    for j in 0..cols {
      for i in 0..rows {
        data.push(raw[i * cols + j]);
      }
    }
    Self::new(&[cols, rows], data)
  }

  /// Add a vector to every row of a matrix.

  pub fn add_rows(&self, row: &Self) -> Self {
    let width = self.dim(-1);
    assert!(row.rank() == 1 && row.size() == width,
      "Can't add {} to rows of {}", row.shape, self.shape);
    let row = row.raw();
    let data = self.raw().iter()
      .enumerate()
      .map(|(i, &a)| a + row[i % width] )
      .collect();
    Self::from_shape(self.shape.clone(), data)
  }

  /// Sum a matrix over its rows, producing one value per column.

  pub fn sum_rows(&self) -> Self {
    let width = self.dim(-1);
    let mut sums = vec![T::zero(); width];
    for (i, &a) in self.raw().iter().enumerate() {
      sums[i % width] += a;
    }
    Self::vec(&sums)
  }

  pub fn sum(&self) -> T {
    self.raw().iter().copied().sum()
  }

  pub fn mean(&self) -> T {
    self.sum() / T::count(self.size())
  }

  pub fn exp(&self) -> Self {
    self.vectorize(|a| a.exp() )
  }

  /// Index of the greatest value in every row.

  pub fn argmax_rows(&self) -> Vec<usize> {
    self.iter_rows()
      .map(|row| row.iter()
        .position_max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal) )
        .unwrap_or(0)
      )
      .collect()
  }

  pub fn is_zero(&self) -> bool {
    self.raw().iter().all(|a| a.is_zero() )
  }

  pub fn max_abs_diff(&self, other: &Self) -> T {
    self.zip(other, |a, b| (a - b).abs() )
      .raw()
      .iter()
      .copied()
      .fold(T::zero(), T::max)
  }

  pub fn trained(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), true)
  }

  pub fn tracked(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), false)
  }
}

impl<T: Real> std::ops::Neg for &Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    self.vectorize(|a| -a )
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident, $symbol:tt) => {
    impl<T: Real> std::ops::$trait for &Tensor<T> { // &tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        self.zip(rhs, |a, b| a $symbol b )
      }
    }

    impl<T: Real> std::ops::$trait for Tensor<T> { // tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        &self $symbol &rhs
      }
    }

    impl<T: Real> std::ops::$trait<T> for &Tensor<T> { // &tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        self.vectorize(|a| a $symbol rhs )
      }
    }

    impl<T: Real> std::ops::$trait<T> for Tensor<T> { // tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        &self $symbol rhs
      }
    }
  };
}

add_operator!(Add, add, +);
add_operator!(Sub, sub, -);
add_operator!(Mul, mul, *);
add_operator!(Div, div, /);

impl<T: Real> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    print_chunks(0, &self.shape, &self.raw(), f)
  }
}

fn print_chunks<T: std::fmt::Debug>(idx: usize, shape: &Shape, vec: &[T], f: &mut std::fmt::Formatter) -> std::fmt::Result {
  let indent = " ".repeat(idx * 2);
  if shape.rank() == 0 {
    write!(f, "{indent}{:?}", vec[0])?;
  } else if idx == shape.rank() - 1 {
    writeln!(f, "{indent}{:?}", vec)?;
  } else {
    writeln!(f, "{indent}[")?;
    for chunk in vec.chunks((vec.len() / shape.dims[idx]).max(1)) {
      print_chunks(idx + 1, shape, chunk, f)?;
    }
    writeln!(f, "{indent}]")?;
  }
  Ok(())
}
