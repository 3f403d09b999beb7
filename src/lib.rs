//! Train multilayer perceptrons with reverse-mode automatic differentiation.
//! Tiny. Few dependencies. CPU only.
//!
//! # Features
//!
//! - **Checked models** — [Sequential] verifies at construction that every
//! stage accepts the width its predecessor produces, and rejects inputs of
//! the wrong width with an error instead of a panic.
//!
//! - **Explicit gradients** — Parameter gradients accumulate across backward
//! passes until cleared, just like the training loop expects.
//!
//! - **In-place updates** — Tensors share their storage, so an [optimize::Optimizer]
//! bound to a model's parameters mutates them without taking ownership.
//!
//! - **Inference without bookkeeping** — [no_grad] disables graph recording,
//! which [infer::predict_proba] uses to return plain probabilities.
//!
//! # Examples
//!
//! Training a small classifier on generated data:
//! ```
//! use rand::{ SeedableRng, rngs::StdRng };
//! use microtrain::{
//!   Tensor, Module, Sequential, Activation, NllLoss,
//!   optimize::{ Optimizer, Sgd },
//!   data::{ InMemoryDataset, synthetic },
//!   train::train,
//!   infer::predict_proba,
//! };
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let model = Sequential::<f32>::mlp(&[8, 16, 3], Activation::ReLU, &mut rng).unwrap();
//! let mut optimizer = Optimizer::new(model.parameters(), 0.05, Sgd);
//!
//! let (inputs, labels) = synthetic::blobs(96, &[8], 3, 0.5, 1);
//! let data = InMemoryDataset::new(inputs.clone(), labels, 16).unwrap();
//!
//! let reports = train(&model, &NllLoss, &mut optimizer, &data, 3).unwrap();
//! assert_eq!(reports.len(), 3);
//!
//! let probs = predict_proba(&model, &Tensor::vec(&inputs.row(0))).unwrap();
//! assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
//! ```
//!
//! # Optional features
//!
//! - `unsafe` *(default)* — Accelerated matrix math using [matrixmultiply] crate.

mod internal;
mod shape;
mod tensor;
mod variable;
mod error;

pub mod ops;
pub mod scalar;
pub mod module;
pub mod loss;
pub mod optimize;
pub mod data;
pub mod train;
pub mod infer;
pub mod checkpoint;
pub mod config;

pub use shape::Shape;
pub use tensor::Tensor;
pub use variable::{ Variable, UnaryOp, BinaryOp, no_grad, is_grad_enabled };
pub use error::{ Error, Result };
pub use module::{ Module, Sequential, Stage, Linear, Activation, Parameter };
pub use loss::{ Loss, NllLoss, CrossEntropyLoss };
