use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::sample::{EpochSatellites, Sample, Track};
use crate::config::TrackConfig;
use crate::nmea::{Gga, Gsa, ParsedLog, Rmc, SatelliteGroup, SatelliteObservation, Sentence, Vtg};
use crate::prelude::{AnalysisResult, CancelFlag, Diagnostics, WarningKind};
use crate::telemetry::log::LogManager;

/// Everything reported for one UTC epoch before it is flattened into a sample.
#[derive(Default)]
struct EpochFields {
    gga_position: Option<(f64, f64)>,
    rmc_position: Option<(f64, f64)>,
    alt_m: Option<f64>,
    rmc_speed: Option<f64>,
    rmc_heading: Option<f64>,
    vtg_speed: Option<f64>,
    vtg_heading: Option<f64>,
    gga_sats: Option<u32>,
    gsa_used: Option<u32>,
    gga_hdop: Option<f64>,
    gsa_hdop: Option<f64>,
    vdop: Option<f64>,
    pdop: Option<f64>,
    satellites: Option<Vec<SatelliteObservation>>,
}

impl EpochFields {
    fn apply_rmc(&mut self, rmc: &Rmc) {
        if !rmc.valid {
            return;
        }
        if let Some(pos) = &rmc.position {
            self.rmc_position = Some((pos.lat, pos.lon));
        }
        self.rmc_speed = rmc.speed_mps.or(self.rmc_speed);
        self.rmc_heading = rmc.course_deg.or(self.rmc_heading);
    }

    fn apply_gga(&mut self, gga: &Gga) {
        if let Some(pos) = &gga.position {
            self.gga_position = Some((pos.lat, pos.lon));
            self.alt_m = gga.altitude_m.or(self.alt_m);
        }
        self.gga_sats = gga.satellites_used.or(self.gga_sats);
        self.gga_hdop = gga.hdop.or(self.gga_hdop);
    }

    fn apply_vtg(&mut self, vtg: &Vtg) {
        self.vtg_speed = vtg.speed_mps.or(self.vtg_speed);
        self.vtg_heading = vtg.course_deg.or(self.vtg_heading);
    }

    /// Multi-constellation receivers emit one GSA per system; used counts add up.
    fn apply_gsa(&mut self, gsa: &Gsa) {
        if !gsa.used_prns.is_empty() {
            let used = gsa.used_prns.len() as u32;
            self.gsa_used = Some(self.gsa_used.unwrap_or(0).saturating_add(used));
        }
        self.gsa_hdop = gsa.hdop.or(self.gsa_hdop);
        self.vdop = gsa.vdop.or(self.vdop);
        self.pdop = gsa.pdop.or(self.pdop);
    }

    fn apply_gsv(&mut self, group: &SatelliteGroup) {
        self.satellites
            .get_or_insert_with(Vec::new)
            .extend(group.observations.iter().cloned());
    }

    fn into_sample(self, timestamp: DateTime<Utc>) -> (Sample, EpochSatellites) {
        let mut sample = Sample::empty(timestamp);
        if let Some((lat, lon)) = self.gga_position.or(self.rmc_position) {
            sample.lat = Some(lat);
            sample.lon = Some(lon);
        }
        sample.alt_m = self.alt_m;
        sample.speed_mps = self.rmc_speed.or(self.vtg_speed);
        sample.heading_deg = self.rmc_heading.or(self.vtg_heading);
        sample.num_sats = self.gga_sats.or(self.gsa_used);
        sample.hdop = self.gsa_hdop.or(self.gga_hdop);
        sample.vdop = self.vdop;
        sample.pdop = self.pdop;

        if let Some(observations) = &self.satellites {
            let cn0: Vec<f64> = observations
                .iter()
                .filter(|sat| sat.visible)
                .filter_map(|sat| sat.cn0_dbhz)
                .collect();
            if !cn0.is_empty() {
                sample.cn0_mean_dbhz = Some(cn0.iter().sum::<f64>() / cn0.len() as f64);
                sample.cn0_min_dbhz = cn0.iter().copied().reduce(f64::min);
                sample.cn0_max_dbhz = cn0.iter().copied().reduce(f64::max);
            }
        }

        let satellites = EpochSatellites {
            timestamp,
            observations: self.satellites,
        };
        (sample, satellites)
    }
}

/// Reconstructs the navigation track from decoded sentences.
pub struct TrackBuilder<'a> {
    config: &'a TrackConfig,
    logger: LogManager,
}

impl<'a> TrackBuilder<'a> {
    pub fn new(config: &'a TrackConfig) -> Self {
        Self {
            config,
            logger: LogManager::new("track"),
        }
    }

    /// Groups sentences into epochs and returns the ordered track together
    /// with the parser's diagnostics extended by any reorder warnings.
    pub fn build(
        &self,
        log: ParsedLog,
        cancel: &CancelFlag,
    ) -> AnalysisResult<(Track, Diagnostics)> {
        let ParsedLog {
            sentences,
            systems,
            mut diagnostics,
        } = log;

        let tolerance = Duration::milliseconds((self.config.reorder_tolerance_s * 1000.0) as i64);
        let mut epochs: BTreeMap<DateTime<Utc>, EpochFields> = BTreeMap::new();
        let mut discarded: BTreeSet<DateTime<Utc>> = BTreeSet::new();
        let mut current: Option<DateTime<Utc>> = None;
        let mut orphaned = 0usize;

        for parsed in &sentences {
            cancel.check()?;

            if let Some(ts) = parsed.timestamp {
                current = self.place_epoch(ts, tolerance, &mut epochs, &mut discarded, &mut diagnostics);
            }

            let epoch = match current.and_then(|ts| epochs.get_mut(&ts)) {
                Some(epoch) => epoch,
                None => {
                    orphaned += 1;
                    continue;
                }
            };

            match &parsed.sentence {
                Sentence::Rmc(rmc) => epoch.apply_rmc(rmc),
                Sentence::Gga(gga) => epoch.apply_gga(gga),
                Sentence::Vtg(vtg) => epoch.apply_vtg(vtg),
                Sentence::Gsa(gsa) => epoch.apply_gsa(gsa),
                Sentence::Gsv(group) => epoch.apply_gsv(group),
                Sentence::Txt(text) => self
                    .logger
                    .detail(&format!("line {}: receiver text {:?}", parsed.line, text)),
            }
        }

        if orphaned > 0 {
            self.logger.detail(&format!(
                "{} sentences had no epoch to attach to",
                orphaned
            ));
        }

        let (samples, satellites): (Vec<_>, Vec<_>) = epochs
            .into_iter()
            .map(|(ts, fields)| fields.into_sample(ts))
            .unzip();
        let track = Track::new(samples, satellites, systems.into_iter().collect());
        self.logger.record(&format!(
            "{} epochs over {:.1} s",
            track.len(),
            track.duration_sec()
        ));
        Ok((track, diagnostics))
    }

    /// Returns the epoch a clock-bearing sentence belongs to, or `None` when
    /// it arrived too late and was discarded.
    fn place_epoch(
        &self,
        ts: DateTime<Utc>,
        tolerance: Duration,
        epochs: &mut BTreeMap<DateTime<Utc>, EpochFields>,
        discarded: &mut BTreeSet<DateTime<Utc>>,
        diagnostics: &mut Diagnostics,
    ) -> Option<DateTime<Utc>> {
        if epochs.contains_key(&ts) {
            return Some(ts);
        }
        if discarded.contains(&ts) {
            return None;
        }
        let newest = epochs.keys().next_back().copied();
        match newest {
            Some(newest) if ts < newest && newest - ts > tolerance => {
                discarded.insert(ts);
                diagnostics.warn(
                    WarningKind::TimeReorder,
                    format!("epoch {} arrived {} ms late", ts, (newest - ts).num_milliseconds()),
                );
                self.logger.warn(&format!("discarding late epoch {}", ts));
                None
            }
            _ => {
                epochs.insert(ts, EpochFields::default());
                Some(ts)
            }
        }
    }
}
