use anyhow::Context;
use gnsscore::AnalysisConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Deployment settings: where to listen, which model to load, and every
/// analysis threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub bind: SocketAddr,
    /// Frozen classifier artifact. Without one, reports carry `spoofing_score: null`.
    pub model_path: Option<PathBuf>,
    pub max_upload_bytes: u64,
    pub analysis: AnalysisConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            model_path: None,
            max_upload_bytes: 32 * 1024 * 1024,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let mut config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        // relative model paths resolve against the config file
        if let (Some(model), Some(dir)) = (&config.model_path, path_ref.parent()) {
            if model.is_relative() {
                config.model_path = Some(dir.join(model));
            }
        }
        config
            .analysis
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_load_reads_yaml_over_defaults() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"bind: 0.0.0.0:8080\nmodel_path: models/baseline-logreg.json\nanalysis:\n  detectors:\n    hdop_ceiling: 6.0\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.bind.port(), 8080);
        assert_eq!(cfg.analysis.detectors.hdop_ceiling, 6.0);
        assert_eq!(cfg.analysis.detectors.max_plausible_speed_mps, 120.0);
        assert_eq!(cfg.max_upload_bytes, 32 * 1024 * 1024);
        let model = cfg.model_path.unwrap();
        assert!(model.is_absolute());
        assert!(model.ends_with("models/baseline-logreg.json"));
    }

    #[test]
    fn invalid_thresholds_fail_to_load() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"analysis:\n  detectors:\n    sat_drop_fraction: 1.5\n")
            .unwrap();
        let path = temp.into_temp_path();
        let err = WorkflowConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("sat_drop_fraction"));
    }

    #[test]
    fn bundled_workflow_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("workflow.yaml");
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.analysis, AnalysisConfig::default());
        assert_eq!(cfg.bind, WorkflowConfig::default().bind);
        assert!(cfg.model_path.unwrap().exists());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = WorkflowConfig::load("/nonexistent/workflow.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/workflow.yaml"));
    }
}
