//! Frozen classifier artifact as exported by the offline training job.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::features::{layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
use crate::prelude::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_version: String,
    pub feature_version: u8,
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_hash: Option<u32>,
    pub parameters: ModelParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParameters {
    /// Logistic regression over standardized features: `(x - mean) / scale`.
    Logistic {
        intercept: f64,
        coefficients: Vec<f64>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    /// Probability-averaging forest of binary trees.
    Forest { trees: Vec<TreeNode> },
}

/// `feature <= threshold` descends left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        probability: f64,
    },
}

impl TreeNode {
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { probability } => return *probability,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn validate(&self) -> AnalysisResult<()> {
        match self {
            TreeNode::Leaf { probability } => {
                if !(0.0..=1.0).contains(probability) {
                    return Err(invalid(format!("leaf probability {} outside [0, 1]", probability)));
                }
                Ok(())
            }
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= FEATURE_COUNT {
                    return Err(invalid(format!("split on unknown feature index {}", feature)));
                }
                if !threshold.is_finite() {
                    return Err(invalid(format!("split threshold {} is not finite", threshold)));
                }
                left.validate()?;
                right.validate()
            }
        }
    }
}

fn invalid(message: String) -> AnalysisError {
    AnalysisError::Configuration(format!("model artifact: {}", message))
}

impl ModelArtifact {
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Configuration(format!("cannot read model {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> AnalysisResult<Self> {
        serde_json::from_str(text).map_err(|e| invalid(e.to_string()))
    }

    /// Checks the artifact against the compiled feature layout.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.feature_version != FEATURE_VERSION {
            return Err(invalid(format!(
                "feature version {} does not match layout version {}",
                self.feature_version, FEATURE_VERSION
            )));
        }
        if self.feature_names.len() != FEATURE_COUNT {
            return Err(invalid(format!(
                "{} feature names, layout has {}",
                self.feature_names.len(),
                FEATURE_COUNT
            )));
        }
        if let Some((i, (got, want))) = self
            .feature_names
            .iter()
            .zip(FEATURE_LAYOUT)
            .enumerate()
            .find(|(_, (got, want))| got.as_str() != **want)
        {
            return Err(invalid(format!(
                "feature {} is {:?}, layout expects {:?}",
                i, got, want
            )));
        }
        if let Some(hash) = self.layout_hash {
            if hash != layout_hash() {
                return Err(invalid(format!(
                    "layout hash {:08x} does not match {:08x}",
                    hash,
                    layout_hash()
                )));
            }
        }

        match &self.parameters {
            ModelParameters::Logistic {
                intercept,
                coefficients,
                mean,
                scale,
            } => {
                for (name, values) in [("coefficients", coefficients), ("mean", mean), ("scale", scale)] {
                    if values.len() != FEATURE_COUNT {
                        return Err(invalid(format!(
                            "{} has {} entries, expected {}",
                            name,
                            values.len(),
                            FEATURE_COUNT
                        )));
                    }
                    if values.iter().any(|v| !v.is_finite()) {
                        return Err(invalid(format!("{} contains non-finite values", name)));
                    }
                }
                if !intercept.is_finite() {
                    return Err(invalid("intercept is not finite".into()));
                }
                if scale.iter().any(|s| *s == 0.0) {
                    return Err(invalid("scale contains zeros".into()));
                }
                Ok(())
            }
            ModelParameters::Forest { trees } => {
                if trees.is_empty() {
                    return Err(invalid("forest has no trees".into()));
                }
                trees.iter().try_for_each(TreeNode::validate)
            }
        }
    }
}
