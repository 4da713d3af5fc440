use ndarray::Array1;
use std::path::Path;

use super::model::{ModelArtifact, ModelParameters, TreeNode};
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_VERSION};
use crate::prelude::{AnalysisError, AnalysisResult};
use crate::telemetry::log::LogManager;

enum Compiled {
    Logistic {
        intercept: f64,
        coefficients: Array1<f64>,
        mean: Array1<f64>,
        scale: Array1<f64>,
    },
    Forest(Vec<TreeNode>),
}

/// Inference over a validated, frozen model artifact.
pub struct ClassifierScorer {
    model_version: String,
    compiled: Compiled,
    logger: LogManager,
}

impl ClassifierScorer {
    pub fn new(artifact: ModelArtifact) -> AnalysisResult<Self> {
        artifact.validate()?;
        let compiled = match artifact.parameters {
            ModelParameters::Logistic {
                intercept,
                coefficients,
                mean,
                scale,
            } => Compiled::Logistic {
                intercept,
                coefficients: Array1::from(coefficients),
                mean: Array1::from(mean),
                scale: Array1::from(scale),
            },
            ModelParameters::Forest { trees } => Compiled::Forest(trees),
        };
        let logger = LogManager::new("classifier");
        logger.record(&format!("loaded model {}", artifact.model_version));
        Ok(Self {
            model_version: artifact.model_version,
            compiled,
            logger,
        })
    }

    pub fn load(path: &Path) -> AnalysisResult<Self> {
        Self::new(ModelArtifact::load(path)?)
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Probability that the track was spoofed, clamped to [0, 1].
    pub fn score(&self, features: &FeatureVector) -> AnalysisResult<f64> {
        if features.version() != FEATURE_VERSION || features.len() != FEATURE_COUNT {
            return Err(AnalysisError::Configuration(format!(
                "feature vector v{} with {} values does not fit model layout v{} with {}",
                features.version(),
                features.len(),
                FEATURE_VERSION,
                FEATURE_COUNT
            )));
        }
        let x = features.values();

        let probability = match &self.compiled {
            Compiled::Logistic {
                intercept,
                coefficients,
                mean,
                scale,
            } => {
                let standardized = (x - mean) / scale;
                let z = intercept + standardized.dot(coefficients);
                1.0 / (1.0 + (-z).exp())
            }
            Compiled::Forest(trees) => {
                let row = x.to_vec();
                trees.iter().map(|t| t.evaluate(&row)).sum::<f64>() / trees.len() as f64
            }
        };

        if !probability.is_finite() {
            return Err(AnalysisError::Configuration(format!(
                "model {} produced a non-finite score",
                self.model_version
            )));
        }
        let probability = probability.clamp(0.0, 1.0);
        self.logger
            .detail(&format!("score {:.4} from {}", probability, self.model_version));
        Ok(probability)
    }
}
