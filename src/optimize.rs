use std::collections::HashMap;

use log::debug;

use crate::{
  error::Result,
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
  module::Parameter,
};


/// An optimization strategy to be used with [Optimizer].
///
/// Returns the change to be added to `param`.

pub trait Strategy<T: Real> {
  fn update(&mut self, param: &Variable<T>, grad: &Tensor<T>, rate: T, step: usize) -> Tensor<T>;
}

impl<T: Real> Strategy<T> for Box<dyn Strategy<T>> {
  fn update(&mut self, param: &Variable<T>, grad: &Tensor<T>, rate: T, step: usize) -> Tensor<T> {
    (**self).update(param, grad, rate, step)
  }
}


/// Gradient based optimizer, bound to a fixed set of parameters for
/// its entire lifetime.

#[derive(Debug)]
pub struct Optimizer<T: Real, S: Strategy<T>> {
  parameters: Vec<Parameter<T>>,
  strategy: S,
  pub learning_rate: T,
  step: usize,
}

impl<T: Real, S: Strategy<T>> Optimizer<T, S> {
  pub fn new(parameters: Vec<Parameter<T>>, learning_rate: T, strategy: S) -> Self {
    debug!("optimizer bound to {} parameter tensors, learning rate {learning_rate}", parameters.len());
    Self { parameters, strategy, learning_rate, step: 1 }
  }

  pub fn parameters(&self) -> &[Parameter<T>] {
    &self.parameters
  }

  /// Number of updates applied so far.

  pub fn steps(&self) -> usize {
    self.step - 1
  }

  /// Reset the gradients of all bound parameters to zero.

  pub fn zero_grad(&self) {
    for param in &self.parameters {
      if let Some(grad) = param.grad() {
        grad.refill(T::zero());
      }
    }
  }

  /// Update all bound parameters in place from their current gradients.

  pub fn step(&mut self) {
    for param in &self.parameters {
      let Some(grad) = param.grad() else { continue };

      // Execute strategy
      let change = self.strategy.update(&param.variable, grad, self.learning_rate, self.step);

      // Apply change
      let weights = param.tensor();
      weights.assign(&(weights + &change));
    }
    self.step += 1;
  }

  /// Back-propagate `loss`, update parameters and clear gradients.

  pub fn minimize(&mut self, loss: &Variable<T>) -> Result<()> {
    loss.backward()?;
    self.step();
    self.zero_grad();
    Ok(())
  }
}


/// Plain gradient descent, `param -= rate * grad`.

#[derive(Debug, Clone, Default)]
pub struct Sgd;

impl<T: Real> Strategy<T> for Sgd {
  fn update(&mut self, _param: &Variable<T>, grad: &Tensor<T>, rate: T, _step: usize) -> Tensor<T> {
    grad * -rate
  }
}


/// Gradient descent with momentum

#[derive(Debug, Clone)]
pub struct Momentum<T: Real> {
  pub momentum: T,
  v: HashMap<usize, Tensor<T>>,
}

impl<T: Real> Momentum<T> {
  pub fn new(momentum: T) -> Self {
    Self { momentum, v: HashMap::new() }
  }
}

impl<T: Real> Default for Momentum<T> {
  fn default() -> Self {
    Self::new(T::of(0.9))
  }
}

impl<T: Real> Strategy<T> for Momentum<T> {
  fn update(&mut self, param: &Variable<T>, grad: &Tensor<T>, rate: T, _step: usize) -> Tensor<T> {
    let v = self.v.entry(param.id())
      .or_insert_with(|| Tensor::zeros(&param.shape().dims) );
    v.assign(&(&(&*v * self.momentum) - &(grad * rate)));
    v.detach()
  }
}


/// Gradient descent with Nesterov momentum

#[derive(Debug, Clone)]
pub struct Nesterov<T: Real> {
  pub momentum: T,
  v: HashMap<usize, Tensor<T>>,
}

impl<T: Real> Nesterov<T> {
  pub fn new(momentum: T) -> Self {
    Self { momentum, v: HashMap::new() }
  }
}

impl<T: Real> Default for Nesterov<T> {
  fn default() -> Self {
    Self::new(T::of(0.9))
  }
}

impl<T: Real> Strategy<T> for Nesterov<T> {
  fn update(&mut self, param: &Variable<T>, grad: &Tensor<T>, rate: T, _step: usize) -> Tensor<T> {
    let v = self.v.entry(param.id())
      .or_insert_with(|| Tensor::zeros(&param.shape().dims) );
    let v_prev = v.detach();
    v.assign(&(&(&*v * self.momentum) - &(grad * rate)));
    &(&v_prev * -self.momentum) + &(&*v * (T::one() + self.momentum))
  }
}


/// Adaptive Moment Estimation (ADAM)

#[derive(Debug, Clone)]
pub struct Adam<T: Real> {
  pub beta1: T,
  pub beta2: T,
  pub epsilon: T,
  m: HashMap<usize, Tensor<T>>,
  v: HashMap<usize, Tensor<T>>,
}

impl<T: Real> Adam<T> {
  pub fn new(beta1: T, beta2: T) -> Self {
    Self {
      beta1,
      beta2,
      epsilon: T::of(1e-8),
      m: HashMap::new(),
      v: HashMap::new(),
    }
  }
}

impl<T: Real> Default for Adam<T> {
  fn default() -> Self {
    Self::new(T::of(0.9), T::of(0.999))
  }
}

impl<T: Real> Strategy<T> for Adam<T> {
  fn update(&mut self, param: &Variable<T>, grad: &Tensor<T>, rate: T, step: usize) -> Tensor<T> {
    let dims = &param.shape().dims;
    let m = self.m.entry(param.id()).or_insert_with(|| Tensor::zeros(dims) );
    m.assign(&(&(&*m * self.beta1) + &(grad * (T::one() - self.beta1))));
    let v = self.v.entry(param.id()).or_insert_with(|| Tensor::zeros(dims) );
    v.assign(&(&(&*v * self.beta2) + &(&(grad * grad) * (T::one() - self.beta2))));
    let step = T::count(step);
    let mt = &*m / (T::one() - self.beta1.powf(step));
    let vt = &*v / (T::one() - self.beta2.powf(step));
    let epsilon = self.epsilon;
    mt.zip(&vt, |m, v| -rate * m / (v.sqrt() + epsilon) )
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::Ops;

  fn quadratic_param() -> (Parameter<f64>, Variable<f64>) {
    let w = Tensor::new(&[1, 2], vec![3.0, -2.0]).trained();
    (Parameter::new("w", w.clone()), w)
  }

  // Minimize sum(w²), whose optimum is zero
  fn descend<S: Strategy<f64>>(strategy: S, rate: f64, steps: usize) -> f64 {
    let (param, w) = quadratic_param();
    let mut optimizer = Optimizer::new(vec![param], rate, strategy);
    for _ in 0..steps {
      let loss = w.mul(&w).sum();
      optimizer.minimize(&loss).unwrap();
    }
    w.mul(&w).sum().item()
  }

  #[test]
  fn strategies_converge() {
    assert!(descend(Sgd, 0.1, 100) < 1e-6);
    assert!(descend(Momentum::default(), 0.01, 300) < 1e-3);
    assert!(descend(Nesterov::default(), 0.01, 300) < 1e-3);
    assert!(descend(Adam::default(), 0.1, 300) < 5e-2);
    assert!(descend(Box::new(Sgd) as Box<dyn Strategy<f64>>, 0.1, 100) < 1e-6);
  }

  #[test]
  fn sgd_step() {
    let (param, w) = quadratic_param();
    let mut optimizer = Optimizer::new(vec![param], 0.5, Sgd);
    optimizer.zero_grad();
    w.mul(&w).sum().backward().unwrap();
    optimizer.step();
    // w - 0.5 * 2w
    assert!(w.is_zero());
    assert_eq!(optimizer.steps(), 1);
  }

  #[test]
  fn zero_gradients_leave_parameters_unchanged() {
    let (param, w) = quadratic_param();
    let before = w.detach();
    let mut optimizer = Optimizer::new(vec![param], 0.5, Sgd);
    optimizer.zero_grad();
    optimizer.step();
    assert_eq!(w.tensor(), &before);
  }

  #[test]
  fn zero_grad_clears_bound_parameters() {
    let (param, w) = quadratic_param();
    let optimizer = Optimizer::new(vec![param], 0.5, Sgd);
    w.mul(&w).sum().backward().unwrap();
    assert!(!w.grad().unwrap().is_zero());
    optimizer.zero_grad();
    assert!(w.grad().unwrap().is_zero());
  }
}
