use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::{AnalysisReport, Meta, SatelliteStat, Summary, TrackSection};
use crate::detection::{AnomalyCategory, AnomalyEvent, ConsistencyOutcome};
use crate::nmea::GnssSystem;
use crate::track::Track;

/// Request-supplied report metadata.
#[derive(Debug, Clone, Copy)]
pub struct ReportMeta<'a> {
    pub file_name: &'a str,
    pub analyzed_at: DateTime<Utc>,
}

pub struct ReportAssembler;

impl ReportAssembler {
    /// Combines the stage outputs into the report. Rule events come first,
    /// then consistency events; inputs are left untouched.
    pub fn assemble(
        meta: ReportMeta<'_>,
        track: &Track,
        rule_events: &[AnomalyEvent],
        consistency: &ConsistencyOutcome,
        spoofing_score: Option<f64>,
    ) -> AnalysisReport {
        let anomalies: Vec<AnomalyEvent> = rule_events
            .iter()
            .chain(&consistency.events)
            .cloned()
            .collect();

        let samples = track
            .samples()
            .iter()
            .map(|sample| {
                let mut sample = sample.clone();
                let flags: BTreeSet<_> = anomalies
                    .iter()
                    .filter(|e| e.covers(sample.timestamp))
                    .map(|e| e.kind())
                    .collect();
                sample.anomaly_flags = flags.into_iter().collect();
                sample
            })
            .collect();

        AnalysisReport {
            meta: Meta {
                file_name: meta.file_name.to_string(),
                analyzed_at: meta.analyzed_at,
                duration_sec: track.duration_sec(),
                sample_count: track.len(),
                gnss_systems: track.systems().to_vec(),
            },
            summary: summarize(&anomalies),
            track: TrackSection { samples },
            satellite_stats: satellite_stats(track),
            anomalies,
            ephemeris_consistency: consistency.consistency.clone(),
            spoofing_score,
        }
    }
}

fn summarize(anomalies: &[AnomalyEvent]) -> Summary {
    let count = |category| anomalies.iter().filter(|e| e.category() == category).count();
    let spoofing = count(AnomalyCategory::SpoofingSuspected);
    let jamming = count(AnomalyCategory::JammingSuspected);
    Summary {
        total_anomalies: anomalies.len(),
        spoofing_suspected_count: spoofing,
        jamming_suspected_count: jamming,
        has_spoofing_suspected: spoofing > 0,
        has_jamming_suspected: jamming > 0,
    }
}

#[derive(Default)]
struct SatelliteTally {
    seen: usize,
    visible: usize,
    cn0: Vec<f64>,
}

fn satellite_stats(track: &Track) -> Vec<SatelliteStat> {
    let mut tallies: BTreeMap<(Option<GnssSystem>, u32), SatelliteTally> = BTreeMap::new();
    for observations in track.satellites().iter().filter_map(|e| e.observations.as_ref()) {
        for sat in observations {
            let tally = tallies.entry((sat.system, sat.prn)).or_default();
            tally.seen += 1;
            if sat.visible {
                tally.visible += 1;
                tally.cn0.extend(sat.cn0_dbhz);
            }
        }
    }

    tallies
        .into_iter()
        .map(|((system, prn), tally)| {
            let has_cn0 = !tally.cn0.is_empty();
            SatelliteStat {
                system,
                prn,
                epochs_seen: tally.seen,
                epochs_visible: tally.visible,
                cn0_mean_dbhz: has_cn0
                    .then(|| tally.cn0.iter().sum::<f64>() / tally.cn0.len() as f64),
                cn0_min_dbhz: tally.cn0.iter().copied().reduce(f64::min),
                cn0_max_dbhz: tally.cn0.iter().copied().reduce(f64::max),
            }
        })
        .collect()
}
