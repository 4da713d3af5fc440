use serde::Serialize;

use super::event::{AnomalyEvent, AnomalyKind};
use super::merge_runs;
use crate::config::ConsistencyConfig;
use crate::telemetry::log::LogManager;
use crate::track::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsistencyStatus {
    Consistent,
    Inconsistent,
    InsufficientData,
}

/// The `ephemeris_consistency` report field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EphemerisConsistency {
    pub status: ConsistencyStatus,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyOutcome {
    pub consistency: EphemerisConsistency,
    pub events: Vec<AnomalyEvent>,
}

/// Cross-checks the receiver's used-satellite count against the satellites
/// it reports as strongly visible.
///
/// NMEA 0183 carries no ephemeris age, so the count comparison is the only
/// evidence available; the detail text says so.
pub struct ConsistencyChecker<'a> {
    config: &'a ConsistencyConfig,
    logger: LogManager,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(config: &'a ConsistencyConfig) -> Self {
        Self {
            config,
            logger: LogManager::new("consistency"),
        }
    }

    pub fn check(&self, track: &Track) -> ConsistencyOutcome {
        let margin = self.config.count_margin;
        let mut checked = 0usize;
        let mut excess = Vec::with_capacity(track.len());
        let mut shortfall = Vec::with_capacity(track.len());

        for (sample, epoch) in track.samples().iter().zip(track.satellites()) {
            let (Some(used), Some(observations)) = (sample.num_sats, &epoch.observations) else {
                excess.push(None);
                shortfall.push(None);
                continue;
            };
            checked += 1;
            let strong = observations
                .iter()
                .filter(|sat| {
                    sat.cn0_dbhz
                        .map_or(false, |c| c >= self.config.visibility_cn0_dbhz)
                })
                .count() as u32;
            excess.push((used > strong.saturating_add(margin)).then(|| f64::from(used - strong)));
            shortfall.push((strong > used.saturating_add(margin)).then(|| f64::from(strong - used)));
        }

        if checked < self.config.min_epochs.max(1) {
            self.logger.record("too few epochs with satellite data to cross-check");
            return ConsistencyOutcome {
                consistency: EphemerisConsistency {
                    status: ConsistencyStatus::InsufficientData,
                    detail: format!(
                        "ephemeris age not available in NMEA 0183; {} of {} epochs carry both a used-satellite count and a satellites-in-view list",
                        checked,
                        track.len()
                    ),
                },
                events: Vec::new(),
            };
        }

        let bound = f64::from(margin);
        let mut events = merge_runs(
            track,
            AnomalyKind::EphemerisInconsistent,
            &excess,
            1,
            bound,
            "satellites",
            f64::max,
        );
        events.extend(merge_runs(
            track,
            AnomalyKind::SatelliteCountDrop,
            &shortfall,
            1,
            bound,
            "satellites",
            f64::max,
        ));
        events.sort_by_key(|e| e.start());

        let disagreements = excess
            .iter()
            .chain(&shortfall)
            .filter(|v| v.is_some())
            .count();
        let status = if events.is_empty() {
            ConsistencyStatus::Consistent
        } else {
            ConsistencyStatus::Inconsistent
        };
        self.logger.record(&format!(
            "{} epochs checked, {} disagreements",
            checked, disagreements
        ));

        ConsistencyOutcome {
            consistency: EphemerisConsistency {
                status,
                detail: format!(
                    "ephemeris age not available in NMEA 0183; used vs visible satellite counts checked over {} epochs, {} disagree beyond a margin of {}",
                    checked, disagreements, margin
                ),
            },
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::AnomalyCategory;
    use crate::nmea::{GnssSystem, SatelliteObservation};
    use crate::track::{EpochSatellites, Sample};
    use chrono::{Duration, TimeZone, Utc};

    fn sky(strong: u32, weak: u32) -> Vec<SatelliteObservation> {
        (1..=strong + weak)
            .map(|prn| SatelliteObservation {
                system: Some(GnssSystem::Gps),
                prn,
                elevation_deg: Some(45.0),
                azimuth_deg: Some(90.0),
                cn0_dbhz: Some(if prn <= strong { 42.0 } else { 12.0 }),
                visible: true,
            })
            .collect()
    }

    fn track(epochs: &[(Option<u32>, Option<Vec<SatelliteObservation>>)]) -> Track {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut samples = Vec::new();
        let mut satellites = Vec::new();
        for (i, (used, observations)) in epochs.iter().enumerate() {
            let ts = t0 + Duration::seconds(i as i64);
            let mut sample = Sample::empty(ts);
            sample.num_sats = *used;
            samples.push(sample);
            satellites.push(EpochSatellites {
                timestamp: ts,
                observations: observations.clone(),
            });
        }
        Track::new(samples, satellites, vec![GnssSystem::Gps])
    }

    fn check(track: &Track) -> ConsistencyOutcome {
        let config = ConsistencyConfig::default();
        ConsistencyChecker::new(&config).check(track)
    }

    #[test]
    fn agreeing_counts_are_consistent() {
        let outcome = check(&track(&[(Some(10), Some(sky(10, 0))), (Some(9), Some(sky(10, 2)))]));
        assert_eq!(outcome.consistency.status, ConsistencyStatus::Consistent);
        assert!(outcome.events.is_empty());
        assert!(outcome.consistency.detail.contains("ephemeris age not available"));
    }

    #[test]
    fn no_satellite_lists_is_insufficient_data() {
        let outcome = check(&track(&[(Some(10), None), (Some(10), None)]));
        assert_eq!(outcome.consistency.status, ConsistencyStatus::InsufficientData);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn using_more_satellites_than_visible_is_ephemeris_inconsistent() {
        let outcome = check(&track(&[
            (Some(10), Some(sky(10, 0))),
            (Some(10), Some(sky(4, 6))),
            (Some(10), Some(sky(3, 7))),
            (Some(10), Some(sky(10, 0))),
        ]));
        assert_eq!(outcome.consistency.status, ConsistencyStatus::Inconsistent);
        assert_eq!(outcome.events.len(), 1);
        let event = &outcome.events[0];
        assert_eq!(event.kind(), AnomalyKind::EphemerisInconsistent);
        assert_eq!(event.category(), AnomalyCategory::SpoofingSuspected);
        assert_eq!(event.evidence().measured, 7.0);
    }

    #[test]
    fn strong_satellites_left_unused_is_a_count_drop() {
        let outcome = check(&track(&[(Some(2), Some(sky(9, 0)))]));
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].kind(), AnomalyKind::SatelliteCountDrop);
        assert_eq!(outcome.events[0].category(), AnomalyCategory::JammingSuspected);
    }
}
