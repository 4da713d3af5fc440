//! Fixed-layout numeric summaries of a track, fed to the classifier.

pub mod extractor;
pub mod layout;
pub mod vector;

pub use extractor::FeatureExtractor;
pub use layout::{layout_hash, LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::{FeatureError, FeatureVector};
