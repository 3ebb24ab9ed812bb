//! Assessment: classification of discovered objects into upgrade strategies.

pub mod classifier;

pub use classifier::{Classification, Classifier, DatabaseAssessment};
