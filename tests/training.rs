use rand::{ SeedableRng, rngs::StdRng };

use microtrain::{
  Error, Loss, Module, NllLoss, Sequential, Activation, Tensor,
  optimize::{ Optimizer, Sgd },
  data::{ Batch, InMemoryDataset, synthetic },
  train::train,
  infer::predict_proba,
};


fn mnist_shaped(seed: u64) -> Sequential<f64> {
  Sequential::mlp(&[784, 128, 64, 10], Activation::ReLU, &mut StdRng::seed_from_u64(seed)).unwrap()
}

fn images(batch: usize, seed: u64) -> Tensor<f64> {
  Tensor::uniform(&[batch, 28, 28], 0.0, 1.0, &mut StdRng::seed_from_u64(seed))
}


#[test]
fn forward_yields_log_distributions() {
  let model = mnist_shaped(0);
  let input = images(5, 1).reshape(&[5, 784]).tracked();
  let output = model.forward(&input).unwrap();
  assert_eq!(output.shape().dims, vec![5, 10]);
  for row in output.tensor().exp().iter_rows() {
    assert!(row.iter().all(|&p| p >= 0.0 ));
    assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-5);
  }
}

#[test]
fn single_step_equals_sgd_update() {
  let learning_rate = 0.1;
  let labels = vec![0, 3, 9, 5];
  let batch = Batch::new(images(4, 2), labels.clone()).unwrap();

  // Gradient of the batch loss on an untouched copy of the model
  let reference = mnist_shaped(7);
  let input = batch.flatten(784).unwrap().tracked();
  let loss = NllLoss.loss(&reference.forward(&input).unwrap(), &labels).unwrap();
  loss.backward().unwrap();

  let model = mnist_shaped(7);
  let mut optimizer = Optimizer::new(model.parameters(), learning_rate, Sgd);
  let reports = train(&model, &NllLoss, &mut optimizer, &vec![batch], 1).unwrap();
  assert_eq!(reports[0].batches, 1);
  assert!((reports[0].mean_loss - loss.item()).abs() < 1e-12);

  for (trained, reference) in model.parameters().iter().zip(reference.parameters()) {
    let grad = reference.grad().unwrap();
    assert!(!grad.is_zero(), "{} has no gradient", reference.name);
    let expected = reference.tensor() - &(grad * learning_rate);
    assert!(trained.tensor().max_abs_diff(&expected) < 1e-9, "{} was not updated by p - lr * g", trained.name);
  }
}

#[test]
fn gradients_accumulate_until_cleared() {
  let model = mnist_shaped(3);
  let optimizer = Optimizer::new(model.parameters(), 0.1, Sgd);
  let input = images(2, 4).reshape(&[2, 784]).tracked();
  let backward = || {
    let loss = NllLoss.loss(&model.forward(&input).unwrap(), &[1, 8]).unwrap();
    loss.backward().unwrap();
  };

  optimizer.zero_grad();
  backward();
  let once: Vec<Tensor<f64>> = model.parameters().iter().map(|p| p.grad().unwrap().detach() ).collect();
  backward();
  for (param, once) in model.parameters().iter().zip(&once) {
    let twice = param.grad().unwrap();
    assert!(twice.max_abs_diff(&(once * 2.0)) < 1e-9);
  }

  optimizer.zero_grad();
  assert!(model.parameters().iter().all(|p| p.grad().unwrap().is_zero() ));
  backward();
  for (param, once) in model.parameters().iter().zip(&once) {
    assert!(param.grad().unwrap().max_abs_diff(once) < 1e-9);
  }
}

#[test]
fn zero_gradient_leaves_parameters_unchanged() {
  let model = mnist_shaped(5);
  let before: Vec<Tensor<f64>> = model.parameters().iter().map(|p| p.tensor().detach() ).collect();
  let mut optimizer = Optimizer::new(model.parameters(), 0.1, Sgd);
  optimizer.zero_grad();
  optimizer.step();
  for (param, before) in model.parameters().iter().zip(&before) {
    assert_eq!(param.tensor(), before);
  }
}

#[test]
fn loss_decreases_on_separable_data() {
  let mut rng = StdRng::seed_from_u64(21);
  let model = Sequential::<f64>::mlp(&[16, 32, 4], Activation::ReLU, &mut rng).unwrap();
  let mut optimizer = Optimizer::new(model.parameters(), 0.1, Sgd);
  let (inputs, labels) = synthetic::blobs(256, &[16], 4, 0.5, 9);
  let data = InMemoryDataset::new(inputs, labels, 32).unwrap().shuffled(3);

  let reports = train(&model, &NllLoss, &mut optimizer, &data, 8).unwrap();
  let first = reports.first().unwrap().mean_loss;
  let last = reports.last().unwrap().mean_loss;
  assert!(last < first, "loss went from {first} to {last}");
  assert!(last < 0.75 * first, "loss went from {first} to {last}");
  assert!(reports.windows(2).all(|pair| pair[1].mean_loss <= pair[0].mean_loss * 1.05 ),
    "loss did not trend down: {:?}", reports.iter().map(|r| r.mean_loss ).collect::<Vec<_>>());
}

#[test]
fn final_batch_may_be_smaller() {
  let model = Sequential::<f64>::mlp(&[784, 10], Activation::ReLU, &mut StdRng::seed_from_u64(0)).unwrap();
  let mut optimizer = Optimizer::new(model.parameters(), 0.01, Sgd);
  let data = InMemoryDataset::new(images(10, 6), (0..10).collect(), 4).unwrap();
  let reports = train(&model, &NllLoss, &mut optimizer, &data, 2).unwrap();
  assert!(reports.iter().all(|report| report.batches == 3 ));
  assert_eq!(optimizer.steps(), 6);
}

#[test]
fn wrong_input_width_is_rejected() {
  let model = mnist_shaped(0);
  let mut optimizer = Optimizer::new(model.parameters(), 0.1, Sgd);
  let data = vec![Batch::new(Tensor::zeros(&[4, 783]), vec![0, 1, 2, 3]).unwrap()];
  let result = train(&model, &NllLoss, &mut optimizer, &data, 1);
  assert!(matches!(result, Err(Error::InputWidth { expected: 784, found: 783 })));

  let result = model.forward(&Tensor::zeros(&[4, 783]).tracked());
  assert!(matches!(result, Err(Error::InputWidth { expected: 784, found: 783 })));

  let result = predict_proba(&model, &Tensor::zeros(&[783]));
  assert!(matches!(result, Err(Error::InputWidth { expected: 784, found: 783 })));
}

#[test]
fn prediction_is_a_distribution() {
  let model = mnist_shaped(8);
  let probs = predict_proba(&model, &images(1, 9).reshape(&[28, 28])).unwrap();
  assert_eq!(probs.len(), 10);
  assert!(probs.iter().all(|&p| p >= 0.0 ));
  assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-5);
  assert!(model.parameters().iter().all(|p| p.grad().unwrap().is_zero() ));
}
