//! Feature layout shared by the extractor and every model artifact.
//!
//! Adding, removing or reordering a feature requires bumping
//! [`FEATURE_VERSION`]; the layout hash changes with it.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

pub const FEATURE_VERSION: u8 = 1;

/// Feature names in vector order.
pub const FEATURE_LAYOUT: &[&str] = &[
    // speed (0-2)
    "speed_mean_mps",
    "speed_std_mps",
    "speed_max_delta_mps",
    // heading rate (3-5)
    "heading_rate_mean_dps",
    "heading_rate_std_dps",
    "heading_rate_max_dps",
    // signal strength (6-9)
    "cn0_mean_dbhz",
    "cn0_std_dbhz",
    "cn0_min_dbhz",
    "cn0_max_dbhz",
    // geometry (10-12)
    "hdop_slope_per_s",
    "pdop_slope_per_s",
    "num_sats_std",
    // timing (13-14)
    "dt_mean_s",
    "dt_max_s",
    // position-derived (15)
    "position_speed_max_mps",
    // missing-indicator ratios (16-21)
    "speed_missing_ratio",
    "heading_missing_ratio",
    "cn0_missing_ratio",
    "dop_missing_ratio",
    "num_sats_missing_ratio",
    "position_missing_ratio",
    // volume (22)
    "sample_count",
];

pub const FEATURE_COUNT: usize = 23;

/// CRC32 over the version byte and the NUL-separated feature names.
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}
