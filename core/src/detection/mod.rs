//! Heuristic anomaly checks over a reconstructed track.

pub mod consistency;
pub mod event;
pub mod rules;

use crate::config::DetectorConfig;
use crate::prelude::{AnalysisResult, CancelFlag};
use crate::telemetry::log::LogManager;
use crate::track::Track;

pub use consistency::{ConsistencyChecker, ConsistencyOutcome, ConsistencyStatus, EphemerisConsistency};
pub use event::{AnomalyCategory, AnomalyEvent, AnomalyKind, Evidence};

pub type DetectorFn = fn(&Track, &DetectorConfig) -> Vec<AnomalyEvent>;

/// Rule checks in evaluation order. Report anomalies keep this order.
pub const RULE_REGISTRY: &[(AnomalyKind, DetectorFn)] = &[
    (AnomalyKind::TimeJump, rules::time_jump),
    (AnomalyKind::PositionJump, rules::position_jump),
    (AnomalyKind::VelocityInconsistent, rules::velocity_inconsistent),
    (AnomalyKind::Cn0Dropout, rules::cn0_dropout),
    (AnomalyKind::SatelliteCountDrop, rules::satellite_count_drop),
    (AnomalyKind::HdopSpike, rules::hdop_spike),
];

/// Runs every registered rule against a track.
pub struct AnomalyDetector<'a> {
    config: &'a DetectorConfig,
    logger: LogManager,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(config: &'a DetectorConfig) -> Self {
        Self {
            config,
            logger: LogManager::new("detectors"),
        }
    }

    pub fn run(&self, track: &Track, cancel: &CancelFlag) -> AnalysisResult<Vec<AnomalyEvent>> {
        let mut events = Vec::new();
        for (kind, rule) in RULE_REGISTRY {
            cancel.check()?;
            let found = rule(track, self.config);
            if !found.is_empty() {
                self.logger
                    .record(&format!("{} events of kind {:?}", found.len(), kind));
            }
            events.extend(found);
        }
        Ok(events)
    }
}

/// Turns per-epoch findings into events, one per run of adjacent flagged
/// epochs at least `min_len` long. `reduce` folds the run's measurements
/// into the reported evidence.
pub(crate) fn merge_runs(
    track: &Track,
    kind: AnomalyKind,
    flagged: &[Option<f64>],
    min_len: usize,
    bound: f64,
    unit: &'static str,
    reduce: fn(f64, f64) -> f64,
) -> Vec<AnomalyEvent> {
    let samples = track.samples();
    let mut events = Vec::new();
    let mut i = 0;
    while i < flagged.len() {
        let Some(first) = flagged[i] else {
            i += 1;
            continue;
        };
        let start = i;
        let mut measured = first;
        i += 1;
        while let Some(Some(value)) = flagged.get(i) {
            measured = reduce(measured, *value);
            i += 1;
        }
        if i - start >= min_len.max(1) {
            events.push(AnomalyEvent::new(
                kind,
                samples[start].timestamp,
                samples[i - 1].timestamp,
                Evidence {
                    measured,
                    bound,
                    unit,
                },
            ));
        }
    }
    events
}
