//! Every calibration threshold used by the analysis core.
//!
//! The defaults are starting points for a ground vehicle or low-altitude drone
//! logging at 1 Hz. Deployments supply their own values through the driver's
//! workflow file; nothing in the pipeline hard-codes a threshold.

use serde::{Deserialize, Serialize};

use crate::prelude::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub parser: ParserConfig,
    pub track: TrackConfig,
    pub detectors: DetectorConfig,
    pub consistency: ConsistencyConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Treat lines without a `*hh` checksum as malformed.
    pub require_checksum: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            require_checksum: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// How far (seconds) behind the newest epoch a late epoch may arrive and
    /// still be inserted in order.
    pub reorder_tolerance_s: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            reorder_tolerance_s: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// time-jump: largest gap between epochs accepted without a cause.
    pub max_time_gap_s: f64,
    /// time-jump: fewer used satellites than this on either side explains a gap.
    pub plausible_cause_min_sats: u32,
    /// time-jump: a CN0 mean below this on either side explains a gap.
    pub plausible_cause_min_cn0_dbhz: f64,
    /// position-jump: platform speed bound.
    pub max_plausible_speed_mps: f64,
    /// position-jump: multiplier applied to `max_plausible_speed_mps * dt`.
    pub position_safety_factor: f64,
    /// position-jump: displacement bound while the receiver reports standing still.
    pub static_jump_m: f64,
    /// position-jump: speeds below this on both fixes count as standing still.
    pub static_max_speed_mps: f64,
    /// velocity-inconsistent: platform acceleration bound.
    pub max_acceleration_mps2: f64,
    /// cn0-dropout: CN0 mean floor.
    pub cn0_floor_dbhz: f64,
    /// cn0-dropout: the floor must be undercut for more than this many epochs.
    pub cn0_dropout_epochs: usize,
    /// satellite-count-drop: relative drop from the window peak.
    pub sat_drop_fraction: f64,
    /// satellite-count-drop: look-back window.
    pub sat_drop_window_s: f64,
    /// satellite-count-drop: window peaks below this are ignored.
    pub sat_drop_min_reference: u32,
    /// hdop-spike: HDOP ceiling.
    pub hdop_ceiling: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_time_gap_s: 5.0,
            plausible_cause_min_sats: 6,
            plausible_cause_min_cn0_dbhz: 30.0,
            max_plausible_speed_mps: 120.0,
            position_safety_factor: 1.5,
            static_jump_m: 20.0,
            static_max_speed_mps: 1.0,
            max_acceleration_mps2: 20.0,
            cn0_floor_dbhz: 20.0,
            cn0_dropout_epochs: 5,
            sat_drop_fraction: 0.5,
            sat_drop_window_s: 2.0,
            sat_drop_min_reference: 6,
            hdop_ceiling: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Satellites at or above this CN0 count as genuinely visible.
    pub visibility_cn0_dbhz: f64,
    /// Allowed difference between used and visible satellite counts.
    pub count_margin: u32,
    /// Fewer checkable epochs than this yields `insufficient-data`.
    pub min_epochs: usize,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            visibility_cn0_dbhz: 20.0,
            count_margin: 2,
            min_epochs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Tracks shorter than this are not scored (`spoofing_score = null`).
    pub min_samples: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { min_samples: 2 }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        let d = &self.detectors;
        positive("track.reorder_tolerance_s", self.track.reorder_tolerance_s, true)?;
        positive("detectors.max_time_gap_s", d.max_time_gap_s, false)?;
        positive("detectors.max_plausible_speed_mps", d.max_plausible_speed_mps, false)?;
        positive("detectors.position_safety_factor", d.position_safety_factor, false)?;
        positive("detectors.static_jump_m", d.static_jump_m, false)?;
        positive("detectors.static_max_speed_mps", d.static_max_speed_mps, true)?;
        positive("detectors.max_acceleration_mps2", d.max_acceleration_mps2, false)?;
        positive("detectors.sat_drop_window_s", d.sat_drop_window_s, false)?;
        positive("detectors.hdop_ceiling", d.hdop_ceiling, false)?;
        finite("detectors.cn0_floor_dbhz", d.cn0_floor_dbhz)?;
        finite(
            "detectors.plausible_cause_min_cn0_dbhz",
            d.plausible_cause_min_cn0_dbhz,
        )?;
        finite(
            "consistency.visibility_cn0_dbhz",
            self.consistency.visibility_cn0_dbhz,
        )?;
        if !(0.0..1.0).contains(&d.sat_drop_fraction) {
            return Err(AnalysisError::Configuration(format!(
                "detectors.sat_drop_fraction must be in [0, 1), got {}",
                d.sat_drop_fraction
            )));
        }
        if self.classifier.min_samples == 0 {
            return Err(AnalysisError::Configuration(
                "classifier.min_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn finite(name: &str, value: f64) -> AnalysisResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AnalysisError::Configuration(format!(
            "{} must be finite, got {}",
            name, value
        )))
    }
}

fn positive(name: &str, value: f64, allow_zero: bool) -> AnalysisResult<()> {
    finite(name, value)?;
    if value > 0.0 || (allow_zero && value == 0.0) {
        Ok(())
    } else {
        Err(AnalysisError::Configuration(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}
