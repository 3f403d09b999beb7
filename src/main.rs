use anyhow::{ Context, Result };
use log::info;

use microtrain::{
  Module, NllLoss, Tensor,
  config::TrainingConfig,
  data::{ InMemoryDataset, synthetic },
  infer::predict_proba,
  train::{ train, evaluate },
};

fn main() -> Result<()> {
  env_logger::init();

  // Optional JSON config as the only argument
  let config = match std::env::args().nth(1) {
    Some(path) => TrainingConfig::from_file(&path)
      .with_context(|| format!("failed to load config from {path}"))?,
    None => TrainingConfig::default(),
  };
  info!("{config:?}");

  let width = config.layers[0];
  let classes = config.layers[config.layers.len() - 1];
  let (inputs, labels) = synthetic::blobs::<f32>(config.samples, &[width], classes, 1.0, config.seed);
  let sample = Tensor::vec(&inputs.row(0));
  let data = InMemoryDataset::new(inputs, labels, config.batch_size)?.shuffled(config.seed);

  let model = config.build_model::<f32>()?;
  let mut optimizer = config.build_optimizer(&model);
  info!("model has {} parameters", model.num_parameters());

  let reports = train(&model, &NllLoss, &mut optimizer, &data, config.epochs)?;
  for report in &reports {
    println!("epoch {}: loss {:.4}", report.epoch, report.mean_loss);
  }
  println!("accuracy {:.3}", evaluate(&model, &data)?);

  let probs = predict_proba(&model, &sample)?;
  println!("class distribution for the first sample: {probs:.3?}");
  Ok(())
}
