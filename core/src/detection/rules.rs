//! Individual anomaly rules. Each is a pure function of the track and the
//! detector thresholds.

use super::event::{AnomalyEvent, AnomalyKind, Evidence};
use super::merge_runs;
use crate::config::DetectorConfig;
use crate::math::GeoHelper;
use crate::track::{Sample, Track};

/// Gap between consecutive epochs longer than the limit with no degraded
/// signal on either side to explain it. Missing metrics never explain a gap.
pub fn time_jump(track: &Track, config: &DetectorConfig) -> Vec<AnomalyEvent> {
    let degraded = |s: &Sample| {
        s.num_sats.map_or(false, |n| n < config.plausible_cause_min_sats)
            || s
                .cn0_mean_dbhz
                .map_or(false, |c| c < config.plausible_cause_min_cn0_dbhz)
    };

    track
        .samples()
        .windows(2)
        .filter_map(|w| {
            let gap = w[1].seconds_since(&w[0]);
            if gap <= config.max_time_gap_s || degraded(&w[0]) || degraded(&w[1]) {
                return None;
            }
            Some(AnomalyEvent::new(
                AnomalyKind::TimeJump,
                w[0].timestamp,
                w[1].timestamp,
                Evidence {
                    measured: gap,
                    bound: config.max_time_gap_s,
                    unit: "s",
                },
            ))
        })
        .collect()
}

/// Distance between consecutive fixes beyond what the platform can cover, or
/// beyond `static_jump_m` while both fixes report standing still.
pub fn position_jump(track: &Track, config: &DetectorConfig) -> Vec<AnomalyEvent> {
    let stationary = |s: &Sample| s.speed_mps.map_or(false, |v| v < config.static_max_speed_mps);
    let mut events = Vec::new();
    let mut last_fix: Option<(&Sample, (f64, f64))> = None;
    for sample in track.samples() {
        let Some((lat, lon)) = sample.position() else {
            continue;
        };
        if let Some((prev, (plat, plon))) = last_fix {
            let dt = sample.seconds_since(prev);
            let distance = GeoHelper::haversine_m(plat, plon, lat, lon);
            let mut allowed = config.max_plausible_speed_mps * dt * config.position_safety_factor;
            if stationary(prev) && stationary(sample) {
                allowed = allowed.min(config.static_jump_m);
            }
            if distance > allowed {
                events.push(AnomalyEvent::new(
                    AnomalyKind::PositionJump,
                    prev.timestamp,
                    sample.timestamp,
                    Evidence {
                        measured: distance,
                        bound: allowed,
                        unit: "m",
                    },
                ));
            }
        }
        last_fix = Some((sample, (lat, lon)));
    }
    events
}

/// Reported speed changing faster than the platform can accelerate.
pub fn velocity_inconsistent(track: &Track, config: &DetectorConfig) -> Vec<AnomalyEvent> {
    let mut events = Vec::new();
    let mut last: Option<(&Sample, f64)> = None;
    for sample in track.samples() {
        let Some(speed) = sample.speed_mps else {
            continue;
        };
        if let Some((prev, prev_speed)) = last {
            let dt = sample.seconds_since(prev);
            let accel = (speed - prev_speed).abs() / dt;
            if dt > 0.0 && accel > config.max_acceleration_mps2 {
                events.push(AnomalyEvent::new(
                    AnomalyKind::VelocityInconsistent,
                    prev.timestamp,
                    sample.timestamp,
                    Evidence {
                        measured: accel,
                        bound: config.max_acceleration_mps2,
                        unit: "m/s^2",
                    },
                ));
            }
        }
        last = Some((sample, speed));
    }
    events
}

/// Mean CN0 under the floor for more than the configured number of epochs.
pub fn cn0_dropout(track: &Track, config: &DetectorConfig) -> Vec<AnomalyEvent> {
    let flagged: Vec<Option<f64>> = track
        .samples()
        .iter()
        .map(|s| s.cn0_mean_dbhz.filter(|c| *c < config.cn0_floor_dbhz))
        .collect();
    merge_runs(
        track,
        AnomalyKind::Cn0Dropout,
        &flagged,
        config.cn0_dropout_epochs + 1,
        config.cn0_floor_dbhz,
        "dB-Hz",
        f64::min,
    )
}

/// Used-satellite count falling by more than a fraction of its recent peak.
pub fn satellite_count_drop(track: &Track, config: &DetectorConfig) -> Vec<AnomalyEvent> {
    let samples = track.samples();
    let flagged: Vec<Option<f64>> = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let count = f64::from(sample.num_sats?);
            let peak = samples[..i]
                .iter()
                .rev()
                .take_while(|prev| sample.seconds_since(prev) <= config.sat_drop_window_s)
                .filter_map(|prev| prev.num_sats)
                .max()?;
            if peak < config.sat_drop_min_reference {
                return None;
            }
            let drop = (f64::from(peak) - count) / f64::from(peak);
            (drop > config.sat_drop_fraction).then_some(drop)
        })
        .collect();
    merge_runs(
        track,
        AnomalyKind::SatelliteCountDrop,
        &flagged,
        1,
        config.sat_drop_fraction,
        "ratio",
        f64::max,
    )
}

/// HDOP above the ceiling.
pub fn hdop_spike(track: &Track, config: &DetectorConfig) -> Vec<AnomalyEvent> {
    let flagged: Vec<Option<f64>> = track
        .samples()
        .iter()
        .map(|s| s.hdop.filter(|h| *h > config.hdop_ceiling))
        .collect();
    merge_runs(
        track,
        AnomalyKind::HdopSpike,
        &flagged,
        1,
        config.hdop_ceiling,
        "",
        f64::max,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::AnomalyCategory;
    use crate::track::EpochSatellites;
    use chrono::{Duration, TimeZone, Utc};

    fn nominal(i: i64) -> Sample {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut sample = Sample::empty(t0 + Duration::seconds(i));
        sample.lat = Some(35.68 + i as f64 * 5.0 / 111_195.0);
        sample.lon = Some(139.77);
        sample.speed_mps = Some(5.0);
        sample.heading_deg = Some(0.0);
        sample.num_sats = Some(10);
        sample.hdop = Some(0.9);
        sample.cn0_mean_dbhz = Some(42.0);
        sample
    }

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

    fn nominal_track(n: i64) -> Vec<Sample> {
        (0..n).map(nominal).collect()
    }

    #[test]
    fn nominal_track_triggers_nothing() {
        let t = track(nominal_track(60));
        let config = DetectorConfig::default();
        for (kind, rule) in crate::detection::RULE_REGISTRY {
            assert!(rule(&t, &config).is_empty(), "{:?} fired", kind);
        }
    }

    #[test]
    fn unexplained_gap_is_a_time_jump() {
        let mut samples = nominal_track(3);
        samples.push(nominal(20));
        let events = time_jump(&track(samples), &DetectorConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].evidence().measured, 18.0);
        assert_eq!(events[0].category(), AnomalyCategory::SpoofingSuspected);
    }

    #[test]
    fn degraded_signal_explains_gap() {
        let mut samples = nominal_track(3);
        samples[2].num_sats = Some(3);
        samples.push(nominal(20));
        assert!(time_jump(&track(samples), &DetectorConfig::default()).is_empty());
    }

    #[test]
    fn missing_metrics_do_not_explain_gap() {
        let mut samples = nominal_track(3);
        samples[2].num_sats = None;
        samples[2].cn0_mean_dbhz = None;
        samples.push(nominal(20));
        assert_eq!(time_jump(&track(samples), &DetectorConfig::default()).len(), 1);
    }

    #[test]
    fn ten_km_jump_in_one_second_is_flagged() {
        let mut samples = nominal_track(5);
        samples[3].lat = Some(samples[3].lat.unwrap() + 0.09);
        samples[4].lat = Some(samples[4].lat.unwrap() + 0.09);
        let events = position_jump(&track(samples), &DetectorConfig::default());
        assert_eq!(events.len(), 1);
        assert!(events[0].evidence().measured > 9_900.0);
        assert_eq!(events[0].evidence().bound, 180.0);
    }

    fn parked(n: i64) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let mut sample = nominal(i);
                sample.lat = Some(35.68);
                sample.speed_mps = Some(0.0);
                sample
            })
            .collect()
    }

    #[test]
    fn fifty_metre_shift_while_parked_is_flagged() {
        let mut samples = parked(6);
        for sample in &mut samples[3..] {
            sample.lat = Some(35.68 + 50.0 / 111_195.0);
        }
        let events = position_jump(&track(samples), &DetectorConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category(), AnomalyCategory::SpoofingSuspected);
        assert!((events[0].evidence().measured - 50.0).abs() < 1.0);
        assert_eq!(events[0].evidence().bound, 20.0);
    }

    #[test]
    fn stationary_bound_needs_speed_on_both_fixes() {
        let mut samples = parked(4);
        samples[2].lat = Some(35.68 + 50.0 / 111_195.0);
        samples[3].lat = samples[2].lat;
        samples[2].speed_mps = None;
        assert!(position_jump(&track(samples), &DetectorConfig::default()).is_empty());

        let mut drifting = parked(4);
        drifting[2].lat = Some(35.68 + 10.0 / 111_195.0);
        drifting[3].lat = drifting[2].lat;
        assert!(position_jump(&track(drifting), &DetectorConfig::default()).is_empty());
    }

    #[test]
    fn position_jump_skips_epochs_without_fix() {
        let mut samples = nominal_track(4);
        samples[1].lat = None;
        samples[2].lat = None;
        assert!(position_jump(&track(samples), &DetectorConfig::default()).is_empty());
    }

    #[test]
    fn speed_step_is_velocity_inconsistent() {
        let mut samples = nominal_track(4);
        samples[2].speed_mps = Some(60.0);
        samples[3].speed_mps = Some(60.0);
        let events = velocity_inconsistent(&track(samples), &DetectorConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].evidence().measured, 55.0);
    }

    #[test]
    fn cn0_dropout_needs_more_than_the_configured_epochs() {
        let config = DetectorConfig::default();
        let mut short = nominal_track(20);
        for s in &mut short[5..10] {
            s.cn0_mean_dbhz = Some(10.0);
        }
        assert!(cn0_dropout(&track(short), &config).is_empty());

        let mut long = nominal_track(20);
        for s in &mut long[5..11] {
            s.cn0_mean_dbhz = Some(10.0);
        }
        let events = cn0_dropout(&track(long.clone()), &config);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start(), long[5].timestamp);
        assert_eq!(events[0].end(), long[10].timestamp);
        assert_eq!(events[0].category(), AnomalyCategory::JammingSuspected);
    }

    #[test]
    fn sharp_satellite_loss_is_one_merged_event() {
        let mut samples = nominal_track(10);
        samples[5].num_sats = Some(3);
        samples[6].num_sats = Some(2);
        samples[7].num_sats = Some(2);
        let events = satellite_count_drop(&track(samples), &DetectorConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].evidence().measured, 0.8);
    }

    #[test]
    fn low_reference_counts_are_ignored() {
        let mut samples = nominal_track(6);
        for s in &mut samples {
            s.num_sats = Some(4);
        }
        samples[5].num_sats = Some(1);
        assert!(satellite_count_drop(&track(samples), &DetectorConfig::default()).is_empty());
    }

    #[test]
    fn contiguous_hdop_spikes_merge() {
        let mut samples = nominal_track(10);
        samples[2].hdop = Some(5.0);
        samples[3].hdop = Some(7.5);
        samples[6].hdop = Some(4.5);
        let events = hdop_spike(&track(samples), &DetectorConfig::default());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].evidence().measured, 7.5);
        assert_eq!(events[1].category(), AnomalyCategory::QualityOnly);
    }
}
