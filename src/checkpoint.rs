use std::collections::HashMap;
use std::path::Path;

use log::info;
use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
  module::Module,
};


/// Named parameter values of a model, detached from its graph.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Checkpoint<T: Real> {
  pub parameters: Vec<(String, Tensor<T>)>,
}

impl<T: Real> Checkpoint<T> {
  pub fn of<M: Module<T> + ?Sized>(model: &M) -> Self {
    Self {
      parameters: model.parameters()
        .into_iter()
        .map(|param| (param.name, param.variable.detach()) )
        .collect(),
    }
  }

  /// Overwrite the model's parameters in place.
  ///
  /// Names and shapes must match exactly. Nothing is written unless
  /// every parameter fits.

  pub fn restore<M: Module<T> + ?Sized>(&self, model: &M) -> Result<()> {
    let mut saved: HashMap<&str, &Tensor<T>> = self.parameters.iter()
      .map(|(name, tensor)| (name.as_str(), tensor) )
      .collect();
    let mut updates = vec![];
    for param in model.parameters() {
      let tensor = saved.remove(param.name.as_str())
        .ok_or_else(|| Error::ParameterMismatch(format!("{} is missing", param.name)) )?;
      if tensor.shape() != param.tensor().shape() {
        return Err(Error::ParameterMismatch(format!("{} has shape {}, expected {}",
          param.name, tensor.shape(), param.tensor().shape())))
      }
      updates.push((param, tensor));
    }
    if let Some(name) = saved.keys().next() {
      return Err(Error::ParameterMismatch(format!("{name} is not part of the model")))
    }
    for (param, tensor) in updates {
      param.tensor().assign(tensor);
    }
    Ok(())
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(self)?)
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    Ok(postcard::from_bytes(bytes)?)
  }
}


/// Write all parameters of `model` to `path`.

pub fn save<T, M, P>(model: &M, path: P) -> Result<()>
where
  T: Real,
  M: Module<T> + ?Sized,
  P: AsRef<Path>,
{
  let checkpoint = Checkpoint::of(model);
  std::fs::write(path.as_ref(), checkpoint.to_bytes()?)?;
  info!("saved {} parameter tensors to {}", checkpoint.parameters.len(), path.as_ref().display());
  Ok(())
}


/// Read parameters from `path` into `model`.

pub fn load<T, M, P>(model: &M, path: P) -> Result<()>
where
  T: Real,
  M: Module<T> + ?Sized,
  P: AsRef<Path>,
{
  let checkpoint = Checkpoint::<T>::from_bytes(&std::fs::read(path.as_ref())?)?;
  checkpoint.restore(model)?;
  info!("loaded {} parameter tensors from {}", checkpoint.parameters.len(), path.as_ref().display());
  Ok(())
}
