//! Spoofing-likelihood inference with a frozen, pre-trained model.

pub mod model;
pub mod scorer;

pub use model::{ModelArtifact, ModelParameters, TreeNode};
pub use scorer::ClassifierScorer;
