use ndarray::Array1;

use super::layout::FEATURE_LAYOUT;

/// A track whose summaries cannot be scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("feature {index} ({name}) is not finite")]
    NonFinite { index: usize, name: &'static str },
}

/// Fixed-length feature vector tagged with the layout version it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    version: u8,
    values: Array1<f64>,
}

impl FeatureVector {
    /// Rejects vectors whose elements are not all finite.
    pub fn new(version: u8, values: Vec<f64>) -> Result<Self, FeatureError> {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            let name = FEATURE_LAYOUT.get(index).copied().unwrap_or("?");
            return Err(FeatureError::NonFinite { index, name });
        }
        Ok(Self {
            version,
            values: Array1::from(values),
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
