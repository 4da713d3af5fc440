//! Analysis core for offline GNSS receiver logs.
//!
//! A log flows through one linear batch transform: NMEA sentences are decoded
//! and merged into a time-ordered track, which feeds the feature extractor,
//! the rule-based detectors and the satellite consistency check. The frozen
//! classifier scores the features and everything lands in one report.

pub mod classifier;
pub mod config;
pub mod detection;
pub mod features;
pub mod math;
pub mod nmea;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod telemetry;
pub mod track;

#[cfg(test)]
mod testing;

pub use config::AnalysisConfig;
pub use pipeline::{AnalysisOutcome, AnalysisRequest, Analyzer};
pub use prelude::{AnalysisError, AnalysisResult, CancelFlag, Diagnostics, Warning, WarningKind};
pub use report::AnalysisReport;
