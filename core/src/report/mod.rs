//! The analysis report: the one JSON document an analysis produces.

pub mod assembler;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detection::{AnomalyEvent, EphemerisConsistency};
use crate::nmea::GnssSystem;
use crate::track::Sample;

pub use assembler::{ReportAssembler, ReportMeta};

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("non-finite value in {0}")]
    NonFinite(String),
    #[error("spoofing score {0} outside [0, 1]")]
    ScoreOutOfRange(f64),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    pub file_name: String,
    pub analyzed_at: DateTime<Utc>,
    pub duration_sec: f64,
    pub sample_count: usize,
    pub gnss_systems: Vec<GnssSystem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_anomalies: usize,
    pub spoofing_suspected_count: usize,
    pub jamming_suspected_count: usize,
    pub has_spoofing_suspected: bool,
    pub has_jamming_suspected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSection {
    pub samples: Vec<Sample>,
}

/// Per-satellite aggregate over the whole log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteStat {
    pub system: Option<GnssSystem>,
    pub prn: u32,
    pub epochs_seen: usize,
    pub epochs_visible: usize,
    pub cn0_mean_dbhz: Option<f64>,
    pub cn0_min_dbhz: Option<f64>,
    pub cn0_max_dbhz: Option<f64>,
}

/// Field order here is the JSON field order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub meta: Meta,
    pub summary: Summary,
    pub track: TrackSection,
    pub anomalies: Vec<AnomalyEvent>,
    pub satellite_stats: Vec<SatelliteStat>,
    pub ephemeris_consistency: EphemerisConsistency,
    pub spoofing_score: Option<f64>,
}

impl AnalysisReport {
    /// Every float must be finite and the score must be a probability.
    pub fn validate(&self) -> Result<(), ReportError> {
        check("meta.duration_sec", Some(self.meta.duration_sec))?;
        for (i, s) in self.track.samples.iter().enumerate() {
            for (name, value) in [
                ("lat", s.lat),
                ("lon", s.lon),
                ("alt_m", s.alt_m),
                ("speed_mps", s.speed_mps),
                ("heading_deg", s.heading_deg),
                ("hdop", s.hdop),
                ("vdop", s.vdop),
                ("pdop", s.pdop),
                ("cn0_mean_dbhz", s.cn0_mean_dbhz),
                ("cn0_min_dbhz", s.cn0_min_dbhz),
                ("cn0_max_dbhz", s.cn0_max_dbhz),
            ] {
                if value.map_or(false, |v| !v.is_finite()) {
                    return Err(ReportError::NonFinite(format!("track.samples[{}].{}", i, name)));
                }
            }
        }
        for (i, event) in self.anomalies.iter().enumerate() {
            let evidence = event.evidence();
            if !evidence.measured.is_finite() || !evidence.bound.is_finite() {
                return Err(ReportError::NonFinite(format!("anomalies[{}].evidence", i)));
            }
        }
        for stat in &self.satellite_stats {
            for value in [stat.cn0_mean_dbhz, stat.cn0_min_dbhz, stat.cn0_max_dbhz] {
                check("satellite_stats", value)?;
            }
        }
        if let Some(score) = self.spoofing_score {
            check("spoofing_score", Some(score))?;
            if !(0.0..=1.0).contains(&score) {
                return Err(ReportError::ScoreOutOfRange(score));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        self.validate()?;
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check(field: &str, value: Option<f64>) -> Result<(), ReportError> {
    match value {
        Some(v) if !v.is_finite() => Err(ReportError::NonFinite(field.to_string())),
        _ => Ok(()),
    }
}
