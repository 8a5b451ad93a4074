//! PCOS prediction: offline training pipeline plus a small inference API.
//!
//! The `train` binary fits the three artifacts (imputer, scaler, classifier)
//! from a labeled CSV; the `pcos-api` binary loads them once at startup and
//! serves `POST /predict`. The encoding and preprocessing contract lives in
//! [`features`] and [`preprocess`] and is shared by both binaries.

pub mod columns;
pub mod dataset;
pub mod features;
pub mod model;
pub mod preprocess;
pub mod server;
pub mod training;

/// Directory the training pipeline writes artifacts to and the server reads
/// them from. Relative to the working directory of both binaries.
pub const MODEL_DIR: &str = "model";

pub const IMPUTER_FILE: &str = "imputer.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const CLASSIFIER_FILE: &str = "svm.json";
