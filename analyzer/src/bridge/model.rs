use gnsscore::features::LayoutInfo;
use gnsscore::telemetry::MetricsSnapshot;
use gnsscore::{AnalysisError, Diagnostics};
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
    /// Layout the classifier inputs are built with; model artifacts must match it.
    pub feature_layout: LayoutInfo,
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
}

/// Query string of `POST /analyze`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeQuery {
    pub file_name: Option<String>,
}

impl AnalyzeQuery {
    pub fn file_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("upload.nmea")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn status_for(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::Input(_) => StatusCode::BAD_REQUEST,
        AnalysisError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::Configuration(_) | AnalysisError::Report(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `x-analysis-warnings` value: `kind=count` pairs, comma separated.
pub fn warnings_header(diagnostics: &Diagnostics) -> String {
    diagnostics
        .warnings
        .iter()
        .map(|w| format!("{}={}", w.kind.as_str(), w.count))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnsscore::WarningKind;

    #[test]
    fn blank_file_name_falls_back() {
        let query = AnalyzeQuery {
            file_name: Some("  ".into()),
        };
        assert_eq!(query.file_name(), "upload.nmea");
    }

    #[test]
    fn warnings_render_as_pairs() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.warn(WarningKind::TimeReorder, "late");
        diagnostics.warn_n(WarningKind::NoDateSource, 3, "assumed");
        assert_eq!(
            warnings_header(&diagnostics),
            "time-reorder=1,no-date-source=3"
        );
    }

    #[test]
    fn input_errors_are_client_errors() {
        assert_eq!(
            status_for(&AnalysisError::Input("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AnalysisError::Configuration("model".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
