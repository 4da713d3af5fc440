use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use chrono::{DateTime, Utc};
use gnsscore::classifier::ClassifierScorer;
use gnsscore::{AnalysisOutcome, AnalysisRequest, AnalysisResult, Analyzer, CancelFlag};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Owns the shared analyzer and feeds it logs from files or uploads.
#[derive(Clone)]
pub struct Runner {
    analyzer: Arc<Analyzer>,
}

impl Runner {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        Self { analyzer }
    }

    /// Loads the model named by the config once and builds the analyzer.
    pub fn from_config(config: &WorkflowConfig) -> anyhow::Result<Self> {
        let scorer = match &config.model_path {
            Some(path) => Some(
                ClassifierScorer::load(path)
                    .with_context(|| format!("loading model {}", path.display()))?,
            ),
            None => None,
        };
        let analyzer = Analyzer::new(config.analysis.clone(), scorer)
            .context("building analyzer from workflow config")?;
        Ok(Self::new(Arc::new(analyzer)))
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn analyze(
        &self,
        file_name: &str,
        payload: &[u8],
        analyzed_at: DateTime<Utc>,
        cancel: &CancelFlag,
    ) -> AnalysisResult<AnalysisOutcome> {
        self.analyzer.analyze(
            AnalysisRequest {
                file_name,
                payload,
                analyzed_at,
            },
            cancel,
        )
    }

    pub fn analyze_file(&self, path: &Path, analyzed_at: DateTime<Utc>) -> anyhow::Result<AnalysisOutcome> {
        let payload =
            fs::read(path).with_context(|| format!("reading receiver log {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let outcome = self
            .analyze(&file_name, &payload, analyzed_at, &CancelFlag::new())
            .with_context(|| format!("analyzing {}", path.display()))?;
        Ok(outcome)
    }
}
