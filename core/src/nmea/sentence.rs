use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::{checksum, fields};

/// Constellation inferred from a sentence's talker identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GnssSystem {
    #[serde(rename = "GPS")]
    Gps,
    #[serde(rename = "GLONASS")]
    Glonass,
    #[serde(rename = "Galileo")]
    Galileo,
    #[serde(rename = "BeiDou")]
    Beidou,
    #[serde(rename = "QZSS")]
    Qzss,
    #[serde(rename = "NavIC")]
    Navic,
}

impl GnssSystem {
    /// `GN` (combined solution) and proprietary talkers name no single system.
    pub fn from_talker(talker: &str) -> Option<Self> {
        match talker {
            "GP" => Some(GnssSystem::Gps),
            "GL" => Some(GnssSystem::Glonass),
            "GA" => Some(GnssSystem::Galileo),
            "GB" | "BD" => Some(GnssSystem::Beidou),
            "GQ" => Some(GnssSystem::Qzss),
            "GI" => Some(GnssSystem::Navic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("no '$' start delimiter")]
    MissingStart,
    #[error("no '*hh' checksum")]
    MissingChecksum,
    #[error("checksum digits are not two hex characters")]
    BadChecksumDigits,
    #[error("empty sentence header")]
    EmptyHeader,
}

/// One framed protocol line, split into header and fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSentence {
    pub talker: String,
    pub kind: String,
    pub fields: Vec<String>,
    pub checksum_valid: bool,
}

impl RawSentence {
    /// Frames a line. A line whose checksum does not match still frames, with
    /// `checksum_valid == false`; only a line that cannot be framed at all errors.
    pub fn from_line(line: &str, require_checksum: bool) -> Result<Self, FrameError> {
        let start = line.find('$').ok_or(FrameError::MissingStart)?;
        let framed = line[start + 1..].trim_end();

        let (payload, checksum_valid) = match framed.rfind('*') {
            Some(star) => {
                let digits = framed[star + 1..].trim();
                let expected = checksum::parse_hex(digits).ok_or(FrameError::BadChecksumDigits)?;
                let payload = &framed[..star];
                (payload, checksum::compute(payload) == expected)
            }
            None if require_checksum => return Err(FrameError::MissingChecksum),
            None => (framed, true),
        };

        let mut parts = payload.split(',');
        let header = parts.next().unwrap_or_default();
        if header.is_empty() || !header.is_ascii() {
            return Err(FrameError::EmptyHeader);
        }
        let (talker, kind) = if header.starts_with('P') {
            ("P", &header[1..])
        } else if header.len() >= 5 {
            header.split_at(2)
        } else {
            ("", header)
        };

        Ok(RawSentence {
            talker: talker.to_string(),
            kind: kind.to_string(),
            fields: parts.map(String::from).collect(),
            checksum_valid,
        })
    }

    /// Field `index`, counting the first field after the header as 0.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn system(&self) -> Option<GnssSystem> {
        GnssSystem::from_talker(&self.talker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

/// Recommended minimum data: clock, date, position, speed, course.
#[derive(Debug, Clone, PartialEq)]
pub struct Rmc {
    pub time: NaiveTime,
    pub date: Option<NaiveDate>,
    pub valid: bool,
    pub position: Option<Position>,
    pub speed_mps: Option<f64>,
    pub course_deg: Option<f64>,
}

/// Position fix: clock, position, fix quality, satellites used, HDOP, altitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Gga {
    pub time: NaiveTime,
    pub position: Option<Position>,
    pub fix_quality: Option<u32>,
    pub satellites_used: Option<u32>,
    pub hdop: Option<f64>,
    pub altitude_m: Option<f64>,
}

/// Course and speed over ground.
#[derive(Debug, Clone, PartialEq)]
pub struct Vtg {
    pub course_deg: Option<f64>,
    pub speed_mps: Option<f64>,
}

/// Active satellites and dilution of precision.
#[derive(Debug, Clone, PartialEq)]
pub struct Gsa {
    pub used_prns: Vec<u32>,
    pub pdop: Option<f64>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
}

/// One satellite reported in a satellites-in-view group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteObservation {
    pub system: Option<GnssSystem>,
    pub prn: u32,
    pub elevation_deg: Option<f64>,
    pub azimuth_deg: Option<f64>,
    pub cn0_dbhz: Option<f64>,
    pub visible: bool,
}

/// A complete satellites-in-view group from one talker.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteGroup {
    pub system: Option<GnssSystem>,
    pub observations: Vec<SatelliteObservation>,
}

/// One GSV sentence of a group; the parser merges these into a [`SatelliteGroup`].
#[derive(Debug, Clone, PartialEq)]
pub struct GsvPart {
    pub total: u32,
    pub index: u32,
    pub observations: Vec<SatelliteObservation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Rmc(Rmc),
    Gga(Gga),
    Vtg(Vtg),
    Gsa(Gsa),
    Gsv(SatelliteGroup),
    Txt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("{kind} is missing a valid UTC time")]
    MissingTime { kind: &'static str },
    #[error("GSV group header is malformed")]
    BadGroupHeader,
    #[error("{kind} has {found} fields, expected at least {required}")]
    TooShort {
        kind: &'static str,
        found: usize,
        required: usize,
    },
}

// Physical plausibility limits. A field outside them is treated as not reported.
const MAX_SPEED_KNOTS: f64 = 4_000.0;
const MAX_DOP: f64 = 100.0;
const MAX_CN0_DBHZ: f64 = 99.0;
const MAX_SATELLITES: u32 = 255;
const ALTITUDE_RANGE_M: (f64, f64) = (-20_000.0, 100_000.0);

fn course(field: &str) -> Option<f64> {
    fields::within(field, 0.0, 360.0)
}

fn dop(field: &str) -> Option<f64> {
    fields::within(field, 0.0, MAX_DOP)
}

fn require(raw: &RawSentence, kind: &'static str, required: usize) -> Result<(), DecodeError> {
    if raw.fields.len() < required {
        Err(DecodeError::TooShort {
            kind,
            found: raw.fields.len(),
            required,
        })
    } else {
        Ok(())
    }
}

fn position(lat: &str, lat_h: &str, lon: &str, lon_h: &str) -> Option<Position> {
    Some(Position {
        lat: fields::latitude(lat, lat_h)?,
        lon: fields::longitude(lon, lon_h)?,
    })
}

pub fn decode_rmc(raw: &RawSentence) -> Result<Rmc, DecodeError> {
    require(raw, "RMC", 9)?;
    let time = fields::time(raw.field(0)).ok_or(DecodeError::MissingTime { kind: "RMC" })?;
    let valid = raw.field(1).trim() == "A";
    let (position, speed_mps, course_deg) = if valid {
        (
            position(raw.field(2), raw.field(3), raw.field(4), raw.field(5)),
            fields::within(raw.field(6), 0.0, MAX_SPEED_KNOTS)
                .map(|knots| knots * fields::KNOTS_TO_MPS),
            course(raw.field(7)),
        )
    } else {
        (None, None, None)
    };
    Ok(Rmc {
        time,
        date: fields::date(raw.field(8)),
        valid,
        position,
        speed_mps,
        course_deg,
    })
}

pub fn decode_gga(raw: &RawSentence) -> Result<Gga, DecodeError> {
    require(raw, "GGA", 9)?;
    let time = fields::time(raw.field(0)).ok_or(DecodeError::MissingTime { kind: "GGA" })?;
    let fix_quality = fields::uint(raw.field(5));
    let position = match fix_quality {
        Some(0) => None,
        _ => position(raw.field(1), raw.field(2), raw.field(3), raw.field(4)),
    };
    Ok(Gga {
        time,
        position,
        fix_quality,
        satellites_used: fields::uint(raw.field(6)).filter(|n| *n <= MAX_SATELLITES),
        hdop: dop(raw.field(7)),
        altitude_m: fields::within(raw.field(8), ALTITUDE_RANGE_M.0, ALTITUDE_RANGE_M.1),
    })
}

pub fn decode_vtg(raw: &RawSentence) -> Result<Vtg, DecodeError> {
    require(raw, "VTG", 7)?;
    let max_kmh = MAX_SPEED_KNOTS * fields::KNOTS_TO_MPS / fields::KMH_TO_MPS;
    let speed_mps = fields::within(raw.field(6), 0.0, max_kmh)
        .map(|kmh| kmh * fields::KMH_TO_MPS)
        .or_else(|| {
            fields::within(raw.field(4), 0.0, MAX_SPEED_KNOTS)
                .map(|knots| knots * fields::KNOTS_TO_MPS)
        });
    Ok(Vtg {
        course_deg: course(raw.field(0)),
        speed_mps,
    })
}

pub fn decode_gsa(raw: &RawSentence) -> Result<Gsa, DecodeError> {
    require(raw, "GSA", 17)?;
    let used_prns = (2..14).filter_map(|i| fields::uint(raw.field(i))).collect();
    Ok(Gsa {
        used_prns,
        pdop: dop(raw.field(14)),
        hdop: dop(raw.field(15)),
        vdop: dop(raw.field(16)),
    })
}

pub fn decode_gsv(raw: &RawSentence) -> Result<GsvPart, DecodeError> {
    require(raw, "GSV", 3)?;
    let total = fields::uint(raw.field(0)).ok_or(DecodeError::BadGroupHeader)?;
    let index = fields::uint(raw.field(1)).ok_or(DecodeError::BadGroupHeader)?;
    if total == 0 || index == 0 || index > total {
        return Err(DecodeError::BadGroupHeader);
    }

    let system = raw.system();
    let observations = raw.fields[3..]
        .chunks(4)
        // NMEA 4.1 appends a lone signal id after the last satellite block.
        .filter(|block| block.len() > 1)
        .filter_map(|block| {
            let prn = fields::uint(&block[0])?;
            let cn0_dbhz = block.get(3).and_then(|f| fields::within(f, 0.0, MAX_CN0_DBHZ));
            Some(SatelliteObservation {
                system,
                prn,
                elevation_deg: block.get(1).and_then(|f| fields::within(f, -90.0, 90.0)),
                azimuth_deg: block.get(2).and_then(|f| fields::within(f, 0.0, 360.0)),
                cn0_dbhz,
                visible: cn0_dbhz.map_or(false, |c| c > 0.0),
            })
        })
        .collect();

    Ok(GsvPart {
        total,
        index,
        observations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(body: &str) -> RawSentence {
        RawSentence::from_line(&checksum::encode(body), true).unwrap()
    }

    #[test]
    fn framing_splits_talker_and_kind() {
        let raw = framed("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert_eq!(raw.talker, "GP");
        assert_eq!(raw.kind, "GGA");
        assert!(raw.checksum_valid);
        assert_eq!(raw.field(0), "123519");
        assert_eq!(raw.system(), Some(GnssSystem::Gps));
    }

    #[test]
    fn framing_tolerates_logger_prefix() {
        let line = format!("2024-03-15 12:00:00 {}", checksum::encode("GPVTG,0.0,T,,M,9.7,N,18.0,K,A"));
        let raw = RawSentence::from_line(&line, true).unwrap();
        assert_eq!(raw.kind, "VTG");
    }

    #[test]
    fn checksum_mismatch_is_flagged_not_rejected() {
        let raw = RawSentence::from_line("$GPGGA,123519,,,,,0,00,,,M,,M,,*00", true).unwrap();
        assert!(!raw.checksum_valid);
    }

    #[test]
    fn missing_checksum_depends_on_policy() {
        let line = "$GPGGA,123519,,,,,0,00,,,M,,M,,";
        assert_eq!(
            RawSentence::from_line(line, true),
            Err(FrameError::MissingChecksum)
        );
        assert!(RawSentence::from_line(line, false).unwrap().checksum_valid);
    }

    #[test]
    fn gga_without_fix_has_no_position() {
        let raw = framed("GPGGA,123519,4807.038,N,01131.000,E,0,00,,,M,,M,,");
        let gga = decode_gga(&raw).unwrap();
        assert_eq!(gga.position, None);
        assert_eq!(gga.satellites_used, Some(0));
        assert_eq!(gga.hdop, None);
    }

    #[test]
    fn void_rmc_keeps_date_but_drops_motion() {
        let raw = framed("GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W");
        let rmc = decode_rmc(&raw).unwrap();
        assert!(!rmc.valid);
        assert_eq!(rmc.position, None);
        assert_eq!(rmc.speed_mps, None);
        assert_eq!(rmc.date, NaiveDate::from_ymd_opt(1994, 3, 23));
    }

    #[test]
    fn rmc_speed_is_converted_from_knots() {
        let raw = framed("GPRMC,123519,A,4807.038,N,01131.000,E,010.0,084.4,230394,003.1,W");
        let rmc = decode_rmc(&raw).unwrap();
        assert!((rmc.speed_mps.unwrap() - 5.14444).abs() < 1e-9);
        assert_eq!(rmc.course_deg, Some(84.4));
    }

    #[test]
    fn gsv_blocks_skip_trailing_signal_id() {
        let raw = framed("GPGSV,1,1,02,05,45,120,42,12,30,220,,1");
        let part = decode_gsv(&raw).unwrap();
        assert_eq!(part.observations.len(), 2);
        assert!(part.observations[0].visible);
        assert_eq!(part.observations[1].cn0_dbhz, None);
        assert!(!part.observations[1].visible);
    }

    #[test]
    fn implausible_magnitudes_decode_as_missing() {
        let rmc = decode_rmc(&framed(
            "GPRMC,123519,A,4807.038,N,01131.000,E,1e200,084.4,230394,003.1,W",
        ))
        .unwrap();
        assert_eq!(rmc.speed_mps, None);
        assert!(rmc.position.is_some());

        let part = decode_gsv(&framed("GPGSV,1,1,01,05,45,120,1e308")).unwrap();
        assert_eq!(part.observations[0].cn0_dbhz, None);
        assert!(!part.observations[0].visible);

        let gga = decode_gga(&framed(
            "GPGGA,123519,4807.038,N,01131.000,E,1,4294967295,1e300,1e300,M,46.9,M,,",
        ))
        .unwrap();
        assert_eq!(gga.satellites_used, None);
        assert_eq!(gga.hdop, None);
        assert_eq!(gga.altitude_m, None);
    }

    #[test]
    fn gsa_reads_dops_and_used_prns() {
        let raw = framed("GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1");
        let gsa = decode_gsa(&raw).unwrap();
        assert_eq!(gsa.used_prns, vec![4, 5, 9, 12, 24]);
        assert_eq!(gsa.pdop, Some(2.5));
        assert_eq!(gsa.hdop, Some(1.3));
        assert_eq!(gsa.vdop, Some(2.1));
    }
}
