use crate::{
  tensor::Tensor,
  variable::{ Variable, BinaryOp, UnaryOp },
  scalar::Real,
  ops::Ops,
};


impl<T: Real> Ops<T> for Variable<T> {
  fn mm(&self, rhs: &Self) -> Self {
    self.binary_op(MatMul, rhs)
  }

  fn add_rows(&self, row: &Self) -> Self {
    self.binary_op(AddRows, row)
  }

  fn mul(&self, rhs: &Self) -> Self {
    self.binary_op(Mul, rhs)
  }

  fn sum(&self) -> Self {
    self.unary_op(Sum)
  }

  fn reshape(&self, dims: &[usize]) -> Self {
    self.unary_op(Reshape { dims: dims.to_vec() })
  }

  fn exp(&self) -> Self {
    self.unary_op(Exp)
  }

  fn relu(&self) -> Self {
    self.unary_op(ReLU)
  }

  fn leaky_relu(&self, alpha: T) -> Self {
    self.unary_op(LeakyReLU { alpha })
  }

  fn sigmoid(&self) -> Self {
    self.unary_op(Sigmoid)
  }

  fn tanh(&self) -> Self {
    self.unary_op(Tanh)
  }

  fn log_softmax(&self) -> Self {
    self.unary_op(LogSoftmax)
  }

  fn nll(&self, labels: &[usize]) -> Self {
    self.unary_op(Nll { labels: labels.to_vec() })
  }
}


#[derive(Debug, Clone)]
pub struct MatMul;

impl<T: Real> BinaryOp<T> for MatMul {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs.mm(rhs)
  }

  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>)
  {(
    grad.mm(&rhs.transpose()),
    lhs.transpose().mm(grad),
  )}
}


#[derive(Debug, Clone)]
pub struct AddRows;

impl<T: Real> BinaryOp<T> for AddRows {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs.add_rows(rhs)
  }

  fn derive(&self, _lhs: &Tensor<T>, _rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>)
  {(
    grad.clone(),
    grad.sum_rows(),
  )}
}


#[derive(Debug, Clone)]
pub struct Mul;

impl<T: Real> BinaryOp<T> for Mul {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs * rhs
  }

  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>)
  {(
    grad * rhs,
    grad * lhs,
  )}
}


#[derive(Debug, Clone)]
pub struct Sum;

impl<T: Real> UnaryOp<T> for Sum {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    Tensor::scalar(lhs.sum())
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    Tensor::fill(&lhs.shape().dims, grad.item())
  }
}


#[derive(Debug, Clone)]
pub struct Reshape {
  dims: Vec<usize>,
}

impl<T: Real> UnaryOp<T> for Reshape {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.reshape(&self.dims)
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    grad.reshape(&lhs.shape().dims)
  }
}


#[derive(Debug, Clone)]
pub struct Exp;

impl<T: Real> UnaryOp<T> for Exp {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.exp()
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    grad * &lhs.exp()
  }
}


#[derive(Debug, Clone)]
pub struct ReLU;

impl<T: Real> UnaryOp<T> for ReLU {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.relu()
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    grad.zip(lhs, |g, a| if a > T::zero() { g } else { T::zero() })
  }
}


#[derive(Debug, Clone)]
pub struct LeakyReLU<T> {
  alpha: T,
}

impl<T: Real> UnaryOp<T> for LeakyReLU<T> {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.leaky_relu(self.alpha)
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    grad.zip(lhs, |g, a| if a > T::zero() { g } else { g * self.alpha })
  }
}


#[derive(Debug, Clone)]
pub struct Sigmoid;

impl<T: Real> UnaryOp<T> for Sigmoid {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.sigmoid()
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    grad.zip(&lhs.sigmoid(), |g, s| g * s * (T::one() - s) )
  }
}


#[derive(Debug, Clone)]
pub struct Tanh;

impl<T: Real> UnaryOp<T> for Tanh {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.tanh()
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    grad.zip(&lhs.tanh(), |g, t| g * (T::one() - t * t) )
  }
}


#[derive(Debug, Clone)]
pub struct LogSoftmax;

impl<T: Real> UnaryOp<T> for LogSoftmax {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.log_softmax()
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    let width = lhs.dim(-1);
    let softmax = lhs.softmax();
    let softmax = softmax.raw();
    let data = grad.raw()
      .chunks(width)
      .zip(softmax.chunks(width))
      .flat_map(|(g, s)| {
        let total: T = g.iter().copied().sum();
        g.iter().zip(s).map(move |(&g, &s)| g - s * total )
      })
      .collect();
    Tensor::from_shape(lhs.shape().clone(), data)
  }
}


#[derive(Debug, Clone)]
pub struct Nll {
  labels: Vec<usize>,
}

impl<T: Real> UnaryOp<T> for Nll {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    let (rows, width) = (lhs.dim(0), lhs.dim(-1));
    assert!(lhs.rank() == 2 && rows == self.labels.len(),
      "Can't score {} against {} labels", lhs.shape(), self.labels.len());
    let raw = lhs.raw();
    let total: T = self.labels.iter()
      .enumerate()
      .map(|(i, &label)| {
        assert!(label < width, "Label {label} out of range for {width} classes");
        raw[i * width + label]
      })
      .sum();
    Tensor::scalar(-total / T::count(rows))
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    let (rows, width) = (lhs.dim(0), lhs.dim(-1));
    let out = Tensor::zeros(&lhs.shape().dims);
    let g = -grad.item() / T::count(rows);
    {
      let mut raw = out.raw_mut();
      for (i, &label) in self.labels.iter().enumerate() {
        raw[i * width + label] = g;
      }
    }
    out
  }
}
