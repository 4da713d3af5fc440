use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::sentence::{
    decode_gga, decode_gsa, decode_gsv, decode_rmc, decode_vtg, GnssSystem, GsvPart,
    RawSentence, SatelliteGroup, SatelliteObservation, Sentence,
};
use crate::config::ParserConfig;
use crate::prelude::{AnalysisResult, CancelFlag, Diagnostics, WarningKind};
use crate::telemetry::log::LogManager;

/// A decoded sentence with its resolved UTC epoch, if it carries a clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSentence {
    pub line: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub sentence: Sentence,
}

/// Output of the sentence parser, in log order.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub sentences: Vec<ParsedSentence>,
    pub systems: BTreeSet<GnssSystem>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy)]
enum DateStamp {
    Reported(NaiveDate),
    Carried(NaiveDate),
    Unknown,
}

struct Pending {
    line: usize,
    clock: Option<(NaiveTime, DateStamp)>,
    sentence: Sentence,
}

struct GroupBuffer {
    total: u32,
    next: u32,
    observations: Vec<SatelliteObservation>,
}

/// Line-oriented NMEA 0183 decoder.
///
/// Checksum failures and undecodable sentences are counted and skipped;
/// unsupported sentence types are ignored without counting.
pub struct SentenceParser<'a> {
    config: &'a ParserConfig,
    logger: LogManager,
}

impl<'a> SentenceParser<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self {
            config,
            logger: LogManager::new("parser"),
        }
    }

    /// `fallback_date` stamps time-only epochs when the log never reports a date.
    pub fn parse(
        &self,
        text: &str,
        fallback_date: NaiveDate,
        cancel: &CancelFlag,
    ) -> AnalysisResult<ParsedLog> {
        let mut diagnostics = Diagnostics::default();
        let mut systems = BTreeSet::new();
        let mut pending = Vec::new();
        let mut groups: BTreeMap<String, GroupBuffer> = BTreeMap::new();
        let mut current_date: Option<NaiveDate> = None;
        let mut last_time: Option<NaiveTime> = None;

        for (idx, line) in text.lines().enumerate() {
            cancel.check()?;
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let raw = match RawSentence::from_line(line, self.config.require_checksum) {
                Ok(raw) if raw.checksum_valid => raw,
                Ok(_) => {
                    diagnostics.record_parse_error();
                    self.logger
                        .detail(&format!("line {}: checksum mismatch", line_no));
                    continue;
                }
                Err(e) => {
                    diagnostics.record_parse_error();
                    self.logger.detail(&format!("line {}: {}", line_no, e));
                    continue;
                }
            };

            let decoded = match raw.kind.as_str() {
                "RMC" => decode_rmc(&raw).map(|rmc| {
                    let stamp = match rmc.date {
                        Some(date) => {
                            current_date = Some(date);
                            last_time = Some(rmc.time);
                            DateStamp::Reported(date)
                        }
                        None => carry(&mut current_date, &mut last_time, rmc.time),
                    };
                    (Some((rmc.time, stamp)), Some(Sentence::Rmc(rmc)))
                }),
                "GGA" => decode_gga(&raw).map(|gga| {
                    let stamp = carry(&mut current_date, &mut last_time, gga.time);
                    (Some((gga.time, stamp)), Some(Sentence::Gga(gga)))
                }),
                "VTG" => decode_vtg(&raw).map(|vtg| (None, Some(Sentence::Vtg(vtg)))),
                "GSA" => decode_gsa(&raw).map(|gsa| (None, Some(Sentence::Gsa(gsa)))),
                "GSV" => decode_gsv(&raw).map(|part| {
                    let group = accumulate(&mut groups, &raw, part, &mut diagnostics);
                    (None, group.map(Sentence::Gsv))
                }),
                "TXT" => Ok((None, Some(Sentence::Txt(raw.field(3).to_string())))),
                _ => continue,
            };

            match decoded {
                Ok((clock, sentence)) => {
                    if let Some(system) = raw.system() {
                        systems.insert(system);
                    }
                    if let Some(sentence) = sentence {
                        pending.push(Pending {
                            line: line_no,
                            clock,
                            sentence,
                        });
                    }
                }
                Err(e) => {
                    diagnostics.record_parse_error();
                    self.logger.detail(&format!("line {}: {}", line_no, e));
                }
            }
        }

        for (talker, stale) in &groups {
            diagnostics.warn(
                WarningKind::IncompleteSatelliteGroup,
                format!(
                    "{}GSV group ended at part {} of {}",
                    talker,
                    stale.next - 1,
                    stale.total
                ),
            );
        }

        let sentences = resolve_dates(pending, fallback_date, &mut diagnostics);
        self.logger.record(&format!(
            "{} sentences decoded, {} parse errors",
            sentences.len(),
            diagnostics.parse_errors
        ));

        Ok(ParsedLog {
            sentences,
            systems,
            diagnostics,
        })
    }
}

/// Date for a time-only sentence. A clock that steps back by more than half a
/// day has crossed midnight, so the carried date advances.
fn carry(
    current: &mut Option<NaiveDate>,
    last_time: &mut Option<NaiveTime>,
    time: NaiveTime,
) -> DateStamp {
    if let (Some(date), Some(previous)) = (current.as_mut(), *last_time) {
        if previous - time > Duration::hours(12) {
            if let Some(next) = date.succ_opt() {
                *date = next;
            }
        }
    }
    *last_time = Some(time);
    current.map_or(DateStamp::Unknown, DateStamp::Carried)
}

/// Feeds one GSV part into its talker's buffer; returns the group once complete.
fn accumulate(
    groups: &mut BTreeMap<String, GroupBuffer>,
    raw: &RawSentence,
    part: GsvPart,
    diagnostics: &mut Diagnostics,
) -> Option<SatelliteGroup> {
    let talker = raw.talker.as_str();
    let complete = |observations| SatelliteGroup {
        system: raw.system(),
        observations,
    };

    if part.index == 1 {
        if let Some(stale) = groups.remove(talker) {
            diagnostics.warn(
                WarningKind::IncompleteSatelliteGroup,
                format!(
                    "{}GSV group restarted after part {} of {}",
                    talker,
                    stale.next - 1,
                    stale.total
                ),
            );
        }
        if part.total == 1 {
            return Some(complete(part.observations));
        }
        groups.insert(
            talker.to_string(),
            GroupBuffer {
                total: part.total,
                next: 2,
                observations: part.observations,
            },
        );
        return None;
    }

    match groups.remove(talker) {
        Some(mut buffer) if buffer.next == part.index && buffer.total == part.total => {
            buffer.observations.extend(part.observations);
            if part.index == part.total {
                Some(complete(buffer.observations))
            } else {
                buffer.next += 1;
                groups.insert(talker.to_string(), buffer);
                None
            }
        }
        _ => {
            diagnostics.warn(
                WarningKind::IncompleteSatelliteGroup,
                format!(
                    "{}GSV part {} of {} arrived out of sequence",
                    talker, part.index, part.total
                ),
            );
            None
        }
    }
}

/// Stamps every clock-bearing sentence with a full UTC timestamp.
///
/// Time-only sentences carry the last reported date; those before the first
/// date take the first date in the log, or `fallback` when there is none.
/// Epochs that never saw a date-bearing sentence are counted once as
/// `no-date-source`.
fn resolve_dates(
    pending: Vec<Pending>,
    fallback: NaiveDate,
    diagnostics: &mut Diagnostics,
) -> Vec<ParsedSentence> {
    let first_reported = pending.iter().find_map(|p| match p.clock {
        Some((time, DateStamp::Reported(date))) => Some((date, time)),
        _ => None,
    });
    // Epochs before the first dated sentence take its date, or the day before
    // when their clock reads more than half a day later.
    let assumed = |time: NaiveTime| match first_reported {
        Some((date, first_time)) if time - first_time > Duration::hours(12) => {
            date.pred_opt().unwrap_or(date)
        }
        Some((date, _)) => date,
        None => fallback,
    };

    let mut dated = BTreeSet::new();
    let mut undated = BTreeSet::new();
    let sentences: Vec<ParsedSentence> = pending
        .into_iter()
        .map(|p| {
            let timestamp = p.clock.map(|(time, stamp)| {
                let (date, reported) = match stamp {
                    DateStamp::Reported(date) => (date, true),
                    DateStamp::Carried(date) => (date, false),
                    DateStamp::Unknown => (assumed(time), false),
                };
                let ts = Utc.from_utc_datetime(&date.and_time(time));
                if reported {
                    dated.insert(ts);
                } else {
                    undated.insert(ts);
                }
                ts
            });
            ParsedSentence {
                line: p.line,
                timestamp,
                sentence: p.sentence,
            }
        })
        .collect();

    let missing = undated.difference(&dated).count();
    let detail = match first_reported {
        Some(_) => "time-only epochs stamped with the last reported date".to_string(),
        None => format!("log reports no date; assumed {}", fallback),
    };
    diagnostics.warn_n(WarningKind::NoDateSource, missing, detail);
    sentences
}
