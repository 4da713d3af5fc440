use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detection::AnomalyKind;
use crate::nmea::{GnssSystem, SatelliteObservation};

/// One navigation epoch. Every numeric field is `None` when no sentence of
/// the epoch reported it; zero is a measurement, never a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
    pub num_sats: Option<u32>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
    pub pdop: Option<f64>,
    pub cn0_mean_dbhz: Option<f64>,
    pub cn0_min_dbhz: Option<f64>,
    pub cn0_max_dbhz: Option<f64>,
    pub anomaly_flags: Vec<AnomalyKind>,
}

impl Sample {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            lat: None,
            lon: None,
            alt_m: None,
            speed_mps: None,
            heading_deg: None,
            num_sats: None,
            hdop: None,
            vdop: None,
            pdop: None,
            cn0_mean_dbhz: None,
            cn0_min_dbhz: None,
            cn0_max_dbhz: None,
            anomaly_flags: Vec::new(),
        }
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }

    /// Seconds from `earlier` to this sample.
    pub fn seconds_since(&self, earlier: &Sample) -> f64 {
        (self.timestamp - earlier.timestamp).num_milliseconds() as f64 / 1000.0
    }
}

/// Satellites-in-view reported during one epoch.
///
/// `observations` is `None` when the epoch had no satellites-in-view group,
/// which differs from a reported but empty sky.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSatellites {
    pub timestamp: DateTime<Utc>,
    pub observations: Option<Vec<SatelliteObservation>>,
}

/// Time-ordered navigation samples reconstructed from one log.
///
/// Timestamps strictly increase. `satellites` is index-aligned with `samples`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    samples: Vec<Sample>,
    satellites: Vec<EpochSatellites>,
    systems: Vec<GnssSystem>,
}

impl Track {
    pub(crate) fn new(
        samples: Vec<Sample>,
        satellites: Vec<EpochSatellites>,
        systems: Vec<GnssSystem>,
    ) -> Self {
        debug_assert_eq!(samples.len(), satellites.len());
        debug_assert!(samples
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
        Self {
            samples,
            satellites,
            systems,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn satellites(&self) -> &[EpochSatellites] {
        &self.satellites
    }

    pub fn systems(&self) -> &[GnssSystem] {
        &self.systems
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_sec(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.seconds_since(first),
            _ => 0.0,
        }
    }
}
