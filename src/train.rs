use log::{ debug, info, trace };

use crate::{
  error::{ Error, Result },
  scalar::Real,
  variable::{ Variable, no_grad },
  module::Module,
  loss::Loss,
  optimize::{ Optimizer, Strategy },
  data::{ Batch, DataProvider },
};


/// Outcome of a single pass over the training data.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport<T: Real> {
  /// One-based epoch number.
  pub epoch: usize,
  /// Mean of the per-batch losses.
  pub mean_loss: T,
  pub batches: usize,
}


// Batch inputs as rows of the model's input width
fn rows<T, M>(model: &M, batch: &Batch<T>) -> Result<Variable<T>>
where
  T: Real,
  M: Module<T> + ?Sized,
{
  let width = model.input_width()
    .unwrap_or_else(|| batch.inputs().size() / batch.len().max(1) );
  Ok(batch.flatten(width)?.tracked())
}


/// Train `model` for a number of epochs and report the mean loss of each.
///
/// Every batch runs forward, loss, backward and a parameter update, with
/// gradients cleared beforehand. Any error aborts the run.

pub fn train<T, M, L, S, D>(
  model: &M,
  loss: &L,
  optimizer: &mut Optimizer<T, S>,
  data: &D,
  epochs: usize,
) -> Result<Vec<EpochReport<T>>>
where
  T: Real,
  M: Module<T> + ?Sized,
  L: Loss<T> + ?Sized,
  S: Strategy<T>,
  D: DataProvider<T> + ?Sized,
{
  debug!("training {} parameters for {epochs} epochs", model.num_parameters());
  let reports = (1..=epochs)
    .map(|epoch| train_epoch(model, loss, optimizer, data, epoch) )
    .collect::<Result<Vec<_>>>()?;
  if let (Some(first), Some(last)) = (reports.first(), reports.last()) {
    debug!("training done, loss {} -> {}", first.mean_loss, last.mean_loss);
  }
  Ok(reports)
}


/// A single pass over `data`. Fails with [Error::EmptyEpoch] if the
/// provider yields no batches.

pub fn train_epoch<T, M, L, S, D>(
  model: &M,
  loss: &L,
  optimizer: &mut Optimizer<T, S>,
  data: &D,
  epoch: usize,
) -> Result<EpochReport<T>>
where
  T: Real,
  M: Module<T> + ?Sized,
  L: Loss<T> + ?Sized,
  S: Strategy<T>,
  D: DataProvider<T> + ?Sized,
{
  let mut running = T::zero();
  let mut batches = 0;
  for batch in data.batches() {
    let input = rows(model, &batch)?;
    optimizer.zero_grad();
    let output = model.forward(&input)?;
    let value = loss.loss(&output, batch.labels())?;
    value.backward()?;
    optimizer.step();

    let value = value.item();
    trace!("epoch {epoch} batch {batches}: loss {value}");
    running += value;
    batches += 1;
  }
  if batches == 0 { return Err(Error::EmptyEpoch { epoch }) }

  let mean_loss = running / T::count(batches);
  info!("epoch {epoch}: mean loss {mean_loss} over {batches} batches");
  Ok(EpochReport { epoch, mean_loss, batches })
}


/// Fraction of examples whose most likely class matches their label.

pub fn evaluate<T, M, D>(model: &M, data: &D) -> Result<T>
where
  T: Real,
  M: Module<T> + ?Sized,
  D: DataProvider<T> + ?Sized,
{
  no_grad(|| {
    let mut correct = 0;
    let mut total = 0;
    for batch in data.batches() {
      let output = model.forward(&rows(model, &batch)?)?;
      correct += output.argmax_rows()
        .iter()
        .zip(batch.labels())
        .filter(|(predicted, label)| predicted == label )
        .count();
      total += batch.len();
    }
    if total == 0 { return Err(Error::InvalidData("nothing to evaluate".into())) }
    Ok(T::count(correct) / T::count(total))
  })
}
