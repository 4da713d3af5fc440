use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::report::ReportError;

/// Request-level failures of one analysis.
///
/// Malformed sentences are not represented here: they are skipped and counted
/// in [`Diagnostics`]. Too little data for a stage degrades the matching report
/// field to `null` / `insufficient-data` instead of failing the request.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("analysis cancelled")]
    Cancelled,
    #[error("report rejected: {0}")]
    Report(#[from] ReportError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Cooperative cancellation shared between a request owner and the pipeline.
///
/// The pipeline polls it at every sentence boundary and between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> AnalysisResult<()> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// An epoch was stamped with a carried-forward or assumed date.
    NoDateSource,
    /// A late epoch fell outside the reorder tolerance and was dropped.
    TimeReorder,
    /// A satellites-in-view group never completed and was dropped.
    IncompleteSatelliteGroup,
    /// The track summaries were not finite, so no spoofing score was produced.
    UnscorableFeatures,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::NoDateSource => "no-date-source",
            WarningKind::TimeReorder => "time-reorder",
            WarningKind::IncompleteSatelliteGroup => "incomplete-satellite-group",
            WarningKind::UnscorableFeatures => "unscorable-features",
        }
    }
}

/// One warning kind, recorded once per analysis with an occurrence count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub count: usize,
    pub detail: String,
}

/// Recoverable findings collected while parsing and building the track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub parse_errors: usize,
    pub warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn record_parse_error(&mut self) {
        self.parse_errors += 1;
    }

    /// Records one occurrence of `kind`. The first detail is kept.
    pub fn warn(&mut self, kind: WarningKind, detail: impl Into<String>) {
        self.warn_n(kind, 1, detail);
    }

    pub fn warn_n(&mut self, kind: WarningKind, count: usize, detail: impl Into<String>) {
        if count == 0 {
            return;
        }
        match self.warnings.iter_mut().find(|w| w.kind == kind) {
            Some(existing) => existing.count += count,
            None => self.warnings.push(Warning {
                kind,
                count,
                detail: detail.into(),
            }),
        }
    }

    pub fn warning(&self, kind: WarningKind) -> Option<&Warning> {
        self.warnings.iter().find(|w| w.kind == kind)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.iter().map(|w| w.count).sum()
    }
}
