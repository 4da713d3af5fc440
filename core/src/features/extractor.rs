use super::layout::{FEATURE_COUNT, FEATURE_VERSION};
use super::vector::{FeatureError, FeatureVector};
use crate::math::{GeoHelper, StatsHelper};
use crate::telemetry::log::LogManager;
use crate::track::{Sample, Track};

/// A nullable per-sample series after gap filling.
struct Series {
    values: Vec<f64>,
    missing_ratio: f64,
}

impl Series {
    /// Forward-fills gaps; leading gaps take the first valid value and a fully
    /// missing series becomes zeros.
    fn filled(raw: impl Iterator<Item = Option<f64>>) -> Self {
        let raw: Vec<Option<f64>> = raw.collect();
        let n = raw.len();
        let missing = raw.iter().filter(|v| v.is_none()).count();
        let first = raw.iter().flatten().next().copied().unwrap_or(0.0);
        let mut last = first;
        let values = raw
            .into_iter()
            .map(|v| {
                if let Some(v) = v {
                    last = v;
                }
                last
            })
            .collect();
        Self {
            values,
            missing_ratio: if n == 0 { 0.0 } else { missing as f64 / n as f64 },
        }
    }
}

/// Computes the fixed-layout feature vector of a track.
pub struct FeatureExtractor {
    logger: LogManager,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("features"),
        }
    }

    pub fn extract(&self, track: &Track) -> Result<FeatureVector, FeatureError> {
        let samples = track.samples();
        let elapsed: Vec<f64> = samples
            .first()
            .map(|first| samples.iter().map(|s| s.seconds_since(first)).collect())
            .unwrap_or_default();
        let dts: Vec<f64> = samples.windows(2).map(|w| w[1].seconds_since(&w[0])).collect();

        let speed = Series::filled(samples.iter().map(|s| s.speed_mps));
        let heading = Series::filled(samples.iter().map(|s| s.heading_deg));
        let cn0 = Series::filled(samples.iter().map(|s| s.cn0_mean_dbhz));
        let hdop = Series::filled(samples.iter().map(|s| s.hdop));
        let pdop = Series::filled(samples.iter().map(|s| s.pdop));
        let sats = Series::filled(samples.iter().map(|s| s.num_sats.map(f64::from)));
        let position_missing = if samples.is_empty() {
            0.0
        } else {
            samples.iter().filter(|s| s.position().is_none()).count() as f64 / samples.len() as f64
        };

        let heading_rates = heading_rates(&heading.values, &dts);
        let cn0_min = samples
            .iter()
            .filter_map(|s| s.cn0_min_dbhz)
            .reduce(f64::min)
            .unwrap_or_else(|| StatsHelper::min(&cn0.values));
        let cn0_max = samples
            .iter()
            .filter_map(|s| s.cn0_max_dbhz)
            .reduce(f64::max)
            .unwrap_or_else(|| StatsHelper::max(&cn0.values));

        let values = vec![
            StatsHelper::mean(&speed.values),
            StatsHelper::std_dev(&speed.values),
            StatsHelper::max_abs_delta(&speed.values),
            StatsHelper::mean(&heading_rates),
            StatsHelper::std_dev(&heading_rates),
            StatsHelper::max(&heading_rates),
            StatsHelper::mean(&cn0.values),
            StatsHelper::std_dev(&cn0.values),
            cn0_min,
            cn0_max,
            StatsHelper::slope(&elapsed, &hdop.values),
            StatsHelper::slope(&elapsed, &pdop.values),
            StatsHelper::std_dev(&sats.values),
            StatsHelper::mean(&dts),
            StatsHelper::max(&dts),
            max_position_speed(samples),
            speed.missing_ratio,
            heading.missing_ratio,
            cn0.missing_ratio,
            hdop.missing_ratio,
            sats.missing_ratio,
            position_missing,
            samples.len() as f64,
        ];
        debug_assert_eq!(values.len(), FEATURE_COUNT);

        self.logger
            .detail(&format!("extracted {} features from {} samples", values.len(), samples.len()));
        FeatureVector::new(FEATURE_VERSION, values)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute heading change per second, wrapped to the shorter turn.
fn heading_rates(headings: &[f64], dts: &[f64]) -> Vec<f64> {
    headings
        .windows(2)
        .zip(dts)
        .filter(|(_, dt)| **dt > 0.0)
        .map(|(w, dt)| GeoHelper::heading_delta_deg(w[0], w[1]).abs() / dt)
        .collect()
}

/// Fastest speed implied by consecutive reported fixes.
fn max_position_speed(samples: &[Sample]) -> f64 {
    samples
        .windows(2)
        .filter_map(|w| {
            let (lat1, lon1) = w[0].position()?;
            let (lat2, lon2) = w[1].position()?;
            let dt = w[1].seconds_since(&w[0]);
            (dt > 0.0).then(|| GeoHelper::haversine_m(lat1, lon1, lat2, lon2) / dt)
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::layout::feature_index;
    use crate::track::EpochSatellites;
    use chrono::{Duration, TimeZone, Utc};

    fn track(samples: Vec<Sample>) -> Track {
        let satellites = samples
            .iter()
            .map(|s| EpochSatellites {
                timestamp: s.timestamp,
                observations: None,
            })
            .collect();
        Track::new(samples, satellites, Vec::new())
    }

    fn sample(i: i64) -> Sample {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        Sample::empty(t0 + Duration::seconds(i))
    }

    fn value(vector: &FeatureVector, name: &str) -> f64 {
        vector.values()[feature_index(name).unwrap()]
    }

    #[test]
    fn fully_missing_track_yields_finite_zeros_and_full_missing_ratios() {
        let vector = FeatureExtractor::new()
            .extract(&track((0..5).map(sample).collect()))
            .unwrap();
        assert_eq!(vector.len(), FEATURE_COUNT);
        assert_eq!(vector.version(), FEATURE_VERSION);
        assert!(vector.values().iter().all(|v| v.is_finite()));
        assert_eq!(value(&vector, "speed_mean_mps"), 0.0);
        assert_eq!(value(&vector, "speed_missing_ratio"), 1.0);
        assert_eq!(value(&vector, "position_missing_ratio"), 1.0);
        assert_eq!(value(&vector, "dt_mean_s"), 1.0);
        assert_eq!(value(&vector, "sample_count"), 5.0);
    }

    #[test]
    fn leading_gap_is_back_filled() {
        let mut samples: Vec<Sample> = (0..4).map(sample).collect();
        samples[2].speed_mps = Some(4.0);
        samples[3].speed_mps = Some(6.0);
        let vector = FeatureExtractor::new().extract(&track(samples)).unwrap();
        assert_eq!(value(&vector, "speed_mean_mps"), 4.5);
        assert_eq!(value(&vector, "speed_max_delta_mps"), 2.0);
        assert_eq!(value(&vector, "speed_missing_ratio"), 0.5);
    }

    #[test]
    fn heading_rate_wraps_through_north() {
        let mut samples: Vec<Sample> = (0..2).map(sample).collect();
        samples[0].heading_deg = Some(350.0);
        samples[1].heading_deg = Some(10.0);
        let vector = FeatureExtractor::new().extract(&track(samples)).unwrap();
        assert!((value(&vector, "heading_rate_max_dps") - 20.0).abs() < 1e-9);
    }

    #[test]
    fn position_speed_reflects_large_jumps() {
        let mut samples: Vec<Sample> = (0..2).map(sample).collect();
        samples[0].lat = Some(35.0);
        samples[0].lon = Some(139.0);
        samples[1].lat = Some(35.09);
        samples[1].lon = Some(139.0);
        let vector = FeatureExtractor::new().extract(&track(samples)).unwrap();
        assert!(value(&vector, "position_speed_max_mps") > 9_000.0);
    }

    #[test]
    fn single_sample_track_is_finite() {
        let mut only = sample(0);
        only.hdop = Some(1.0);
        let vector = FeatureExtractor::new().extract(&track(vec![only])).unwrap();
        assert!(vector.values().iter().all(|v| v.is_finite()));
        assert_eq!(value(&vector, "hdop_slope_per_s"), 0.0);
    }
}
