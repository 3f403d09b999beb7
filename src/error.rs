use std::fmt;

use crate::Shape;


/// All errors that can occur while building, training or running a model.

#[derive(Debug)]
pub enum Error {
  /// Input batch width does not match the model's declared input width.
  InputWidth { expected: usize, found: usize },
  /// A stage expects a different width than its predecessor produces.
  WidthMismatch { stage: usize, expected: usize, found: usize },
  /// The stage list cannot form a model.
  InvalidModel(String),
  /// Two tensors can't be combined by an operation.
  ShapeMismatch { op: &'static str, lhs: Shape, rhs: Shape },
  /// Number of labels differs from the number of examples in the batch.
  LabelCount { expected: usize, found: usize },
  /// A label does not name one of the model's classes.
  LabelOutOfRange { label: usize, classes: usize },
  /// Backward was called on a value that does not carry a gradient.
  NotDifferentiable,
  /// Backward requires a single-element output.
  NonScalarBackward(Shape),
  /// The data provider yielded no batches for an epoch.
  EmptyEpoch { epoch: usize },
  /// A dataset or batch is malformed.
  InvalidData(String),
  /// A configuration value is out of range.
  InvalidConfig(String),
  /// A checkpoint doesn't fit the model it is loaded into.
  ParameterMismatch(String),
  Io(std::io::Error),
  Serialization(postcard::Error),
  Config(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::InputWidth { expected, found } => {
        write!(f, "model expects inputs of width {expected}, got {found}")
      },
      Self::WidthMismatch { stage, expected, found } => {
        write!(f, "stage {stage} expects width {expected}, but the previous stage produces {found}")
      },
      Self::InvalidModel(msg) => write!(f, "invalid model: {msg}"),
      Self::ShapeMismatch { op, lhs, rhs } => {
        write!(f, "{op} can't combine {lhs} with {rhs}")
      },
      Self::LabelCount { expected, found } => {
        write!(f, "expected {expected} labels, got {found}")
      },
      Self::LabelOutOfRange { label, classes } => {
        write!(f, "label {label} is out of range for {classes} classes")
      },
      Self::NotDifferentiable => write!(f, "cannot compute gradients for a constant"),
      Self::NonScalarBackward(shape) => {
        write!(f, "backward requires a scalar output, got {shape}")
      },
      Self::EmptyEpoch { epoch } => write!(f, "epoch {epoch} produced no batches"),
      Self::InvalidData(msg) => write!(f, "invalid data: {msg}"),
      Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
      Self::ParameterMismatch(msg) => write!(f, "parameter mismatch: {msg}"),
      Self::Io(e) => write!(f, "io error: {e}"),
      Self::Serialization(e) => write!(f, "serialization error: {e}"),
      Self::Config(e) => write!(f, "config error: {e}"),
    }
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Serialization(e) => Some(e),
      Self::Config(e) => Some(e),
      _ => None,
    }
  }
}

impl From<std::io::Error> for Error {
  fn from(e: std::io::Error) -> Self {
    Self::Io(e)
  }
}

impl From<postcard::Error> for Error {
  fn from(e: postcard::Error) -> Self {
    Self::Serialization(e)
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Config(e)
  }
}
