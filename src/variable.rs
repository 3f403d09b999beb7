use std::rc::Rc;
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::fmt::Debug;

pub(crate) mod mops;

use crate::{
  error::{ Error, Result },
  tensor::Tensor,
  scalar::Real,
};


pub fn make_id() -> usize {
  static LAST_ID: AtomicUsize = AtomicUsize::new(0);
  LAST_ID.fetch_add(1, Ordering::Relaxed)
}


thread_local! {
  static GRAD_MODE: Cell<bool> = Cell::new(true);
}

/// Whether operations on [Variable]s currently record a computation graph.

pub fn is_grad_enabled() -> bool {
  GRAD_MODE.with(|mode| mode.get() )
}

/// Run `f` without recording any computation graph.
///
/// Every [Variable] produced inside is detached from its inputs and carries
/// no gradient. The previous mode is restored afterwards, even on panic.

pub fn no_grad<R, F: FnOnce() -> R>(f: F) -> R {
  struct Restore(bool);

  impl Drop for Restore {
    fn drop(&mut self) {
      GRAD_MODE.with(|mode| mode.set(self.0) );
    }
  }

  let _restore = Restore(GRAD_MODE.with(|mode| mode.replace(false) ));
  f()
}


/// Unary computational operation that can also compute its derivative.

pub trait UnaryOp<T: Real>: Debug {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T>;
  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T>;
}


/// Binary computational operation that can also compute its derivative.

pub trait BinaryOp<T: Real>: Debug {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T>;
  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>);
}


#[derive(Debug)]
enum Op<T: Real> {
  Unary(Box<dyn UnaryOp<T>>),
  Binary(Box<dyn BinaryOp<T>>),
}


/// Node in a computation graph, containing a [Variable]'s data and gradient,
/// as well as the operation used to create it.

#[derive(Debug)]
struct Node<T: Real> {
  id: usize,
  data: Tensor<T>,
  grad: Option<Tensor<T>>,
  op: Option<Op<T>>,
  previous: Vec<Rc<Self>>,
  trainable: bool,
}

impl<T: Real> Node<T> {
  fn reset_gradient(&self, filler: T) {
    if let Some(grad) = &self.grad {
      grad.refill(filler);
    }
  }

  fn backward(&self) {
    if let (Some(op), Some(grad)) = (&self.op, &self.grad) {
      let lhs = &self.previous[0];
      let changes = match op {
        Op::Unary(op) => vec![op.derive(&lhs.data, grad)],
        Op::Binary(op) => {
          let rhs = &self.previous[1];
          let (l, r) = op.derive(&lhs.data, &rhs.data, grad);
          vec![l, r]
        },
      };
      for (change, prev) in changes.iter().zip(self.previous.iter()) {
        if let Some(grad) = &prev.grad {
          grad.accumulate(change);
        }
      }
    }
  }
}


/// Variables track the computational operations used to create them and allow
/// for computing their gradient with respect to all trainable inputs involved.
///
/// They get created by calling [tracked](Tensor::tracked) or
/// [trained](Tensor::trained) on a [Tensor]. Trained variables are graph
/// leaves that own a gradient accumulator; tracked ones are constants.
///
/// Variables dereference to their underlying [Tensor] for read access.

#[derive(Debug, Clone)]
pub struct Variable<T: Real> {
  node: Rc<Node<T>>,
}

impl<T: Real> std::ops::Deref for Variable<T> {
  type Target = Tensor<T>;

  fn deref(&self) -> &Self::Target {
    &self.node.data
  }
}

impl<T: Real> Variable<T> {
  pub(crate) fn from_tensor(tensor: Tensor<T>, trainable: bool) -> Self {
    Self {
      node: Rc::new(Node {
        id: make_id(),
        grad: trainable.then(|| Tensor::zeros(&tensor.shape().dims) ),
        data: tensor,
        op: None,
        previous: vec![],
        trainable,
      }),
    }
  }

  fn operation(op: Op<T>, data: Tensor<T>, inputs: &[&Self]) -> Self {
    let grad = is_grad_enabled() && inputs.iter().any(|input| input.requires_grad() );
    let node = if grad {
      Node {
        id: make_id(),
        grad: Some(Tensor::zeros(&data.shape().dims)),
        data,
        op: Some(op),
        previous: inputs.iter().map(|input| input.node.clone() ).collect(),
        trainable: false,
      }
    } else {
      Node { id: make_id(), grad: None, data, op: None, previous: vec![], trainable: false }
    };
    Self { node: Rc::new(node) }
  }

  pub fn id(&self) -> usize {
    self.node.id
  }

  pub fn tensor(&self) -> &Tensor<T> {
    &self.node.data
  }

  pub fn grad(&self) -> Option<&Tensor<T>> {
    self.node.grad.as_ref()
  }

  pub fn is_trainable(&self) -> bool {
    self.node.trainable
  }

  pub fn requires_grad(&self) -> bool {
    self.node.grad.is_some()
  }

  pub fn unary_op(&self, op: impl UnaryOp<T> + 'static) -> Self {
    let data = op.run(&self.node.data);
    Self::operation(Op::Unary(Box::new(op)), data, &[self])
  }

  pub fn binary_op(&self, op: impl BinaryOp<T> + 'static, rhs: &Self) -> Self {
    let data = op.run(&self.node.data, &rhs.node.data);
    Self::operation(Op::Binary(Box::new(op)), data, &[self, rhs])
  }

  /// Compute gradients across this Variable's entire graph.
  ///
  /// Gradients of trainable leaves are added to whatever they already
  /// hold. Clear them first to get the gradient of this output alone.

  pub fn backward(&self) -> Result<()> {
    let grad = self.grad().ok_or(Error::NotDifferentiable)?;
    if self.size() != 1 { return Err(Error::NonScalarBackward(self.shape().clone())) }
    let history = self.history();
    for node in &history {
      if !node.trainable { node.reset_gradient(T::zero()) }
    }
    grad.accumulate(&Tensor::ones(&grad.shape().dims));
    for node in history.iter().rev() {
      node.backward();
    }
    Ok(())
  }

  /// List all trainable parameters in this Variable's graph.

  pub fn parameters(&self) -> Vec<Self> {
    self.history()
      .into_iter()
      .filter(|node| node.trainable )
      .map(|node| Self { node } )
      .collect()
  }

  /// Set gradients to zero for this Variable's entire graph.

  pub fn reset(&self) {
    for node in self.history() {
      node.reset_gradient(T::zero());
    }
  }

  fn history(&self) -> Vec<Rc<Node<T>>> {
    let mut history = vec![];
    Self::history_recurse(&self.node, &mut history, &mut HashSet::new());
    history
  }

  fn history_recurse(node: &Rc<Node<T>>, history: &mut Vec<Rc<Node<T>>>, visited: &mut HashSet<usize>) {
    if !visited.insert(node.id) { return }
    for prev in &node.previous {
      Self::history_recurse(prev, history, visited);
    }
    history.push(node.clone());
  }

  /// Compute a function's gradient with respect to `input` numerically
  /// and compare it to the automatically derived solution.
  ///
  /// `generator` must produce a scalar. Returns the mean absolute
  /// difference between both gradients.

  pub fn check_gradients<F>(input: &Tensor<T>, generator: F) -> Result<T>
  where
    F: Fn(&Self) -> Self
  {
    let eps = T::of(1e-3);
    let two = T::of(2.0);
    // Compute gradient using auto diff
    let var = input.detach().trained();
    generator(&var).backward()?;
    let grad = var.grad().ok_or(Error::NotDifferentiable)?.detach();
    // Compute gradient numerically for every element of input
    let num_grad = no_grad(|| {
      (0..input.size()).map(|i| {
        let probe = |delta: T| {
          let shifted = input.detach();
          shifted.raw_mut()[i] += delta;
          generator(&shifted.tracked()).item()
        };
        (probe(eps) - probe(-eps)) / (two * eps)
      }).collect::<Vec<_>>()
    });
    let num_grad = Tensor::from_shape(grad.shape().clone(), num_grad);
    Ok((&grad - &num_grad).vectorize(|a| a.abs() ).mean())
  }

  /// Number of nodes, operations and trainable scalars in this Variable's graph.

  pub fn statistics(&self) -> (usize, usize, usize) {
    let history = self.history();
    let num_ops = history.iter().filter(|node| node.op.is_some() ).count();
    let num_trainable_params = history.iter()
      .filter(|node| node.trainable )
      .map(|node| node.data.size() )
      .sum();
    (history.len(), num_ops, num_trainable_params)
  }
}

impl<T: Real> std::fmt::Display for Variable<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let title = if self.node.trainable { "Trainable" } else if self.requires_grad() {
      "Computed"
    } else {
      "Tracked"
    };
    write!(f, "{title} {}", self.tensor())
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::Ops;

  #[test]
  fn x_squared() {
    let x = Tensor::new(&[1, 2], vec![3.0, 5.0]).trained();
    let z = x.mul(&x).sum();
    z.backward().unwrap();
    assert_eq!(z.item(), 34.0);
    assert_eq!(x.grad(), Some(&Tensor::new(&[1, 2], vec![6.0, 10.0])));
  }

  #[test]
  fn gradients_accumulate_until_reset() {
    let w = Tensor::new(&[2, 1], vec![0.5, -1.0]).trained();
    let x = Tensor::new(&[1, 2], vec![2.0, 3.0]).tracked();
    let forward = || x.mm(&w).sum();

    forward().backward().unwrap();
    let first = w.grad().unwrap().detach();
    assert_eq!(first, Tensor::new(&[2, 1], vec![2.0, 3.0]));

    // Second pass over a fresh graph without clearing sums up
    forward().backward().unwrap();
    assert_eq!(w.grad().unwrap(), &(&first * 2.0));

    // Repeated backward over the same graph sums up as well
    let loss = forward();
    loss.reset();
    loss.backward().unwrap();
    loss.backward().unwrap();
    assert_eq!(w.grad().unwrap(), &(&first * 2.0));

    loss.reset();
    assert!(w.grad().unwrap().is_zero());
  }

  #[test]
  fn constants_are_not_differentiable() {
    let x = Tensor::vec(&[1.0, 2.0]).tracked();
    assert!(matches!(x.relu().backward(), Err(Error::NotDifferentiable)));
  }

  #[test]
  fn backward_requires_scalar() {
    let x = Tensor::vec(&[1.0, 2.0]).trained();
    assert!(matches!(x.relu().backward(), Err(Error::NonScalarBackward(_))));
  }

  #[test]
  fn no_grad_detaches() {
    let w = Tensor::new(&[2, 2], vec![1.0, 0.0, 0.0, 1.0]).trained();
    let x = Tensor::new(&[1, 2], vec![1.0, 2.0]).tracked();
    let y = no_grad(|| {
      assert!(!is_grad_enabled());
      x.mm(&w).sum()
    });
    assert!(is_grad_enabled());
    assert!(!y.requires_grad());
    assert!(y.parameters().is_empty());
    assert_eq!(y.item(), 3.0);
  }

  #[test]
  fn no_grad_restores_on_panic() {
    let result = std::panic::catch_unwind(|| no_grad(|| panic!("boom") ));
    assert!(result.is_err());
    assert!(is_grad_enabled());
  }

  #[test]
  fn parameters_and_statistics() {
    let w = Tensor::<f32>::zeros(&[3, 2]).trained();
    let b = Tensor::<f32>::zeros(&[2]).trained();
    let x = Tensor::<f32>::ones(&[4, 3]).tracked();
    let y = x.mm(&w).add_rows(&b).relu().sum();
    let ids: Vec<_> = y.parameters().iter().map(|p| p.id() ).collect();
    assert_eq!(ids, vec![w.id(), b.id()]);
    assert_eq!(y.statistics(), (7, 4, 8));
  }
}
