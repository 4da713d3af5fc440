//! NMEA 0183 sentence templates for synthetic receiver logs.

use chrono::{DateTime, Utc};
use gnsscore::nmea::checksum::encode;

/// Navigation solution of one synthetic epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
    pub speed_mps: f64,
    pub course_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkySatellite {
    pub prn: u32,
    pub elevation_deg: u32,
    pub azimuth_deg: u32,
    pub cn0_dbhz: Option<u32>,
}

const MPS_TO_KNOTS: f64 = 1.0 / 0.514444;

fn angle(value: f64, degree_digits: usize, positive: char, negative: char) -> (String, char) {
    let hemisphere = if value < 0.0 { negative } else { positive };
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = (value - degrees) * 60.0;
    (
        format!("{:0width$}{:07.4}", degrees as u32, minutes, width = degree_digits),
        hemisphere,
    )
}

fn clock(ts: DateTime<Utc>) -> String {
    ts.format("%H%M%S%.3f").to_string()
}

pub fn rmc(ts: DateTime<Utc>, fix: Option<&Fix>) -> String {
    let body = match fix {
        Some(fix) => {
            let (lat, ns) = angle(fix.lat, 2, 'N', 'S');
            let (lon, ew) = angle(fix.lon, 3, 'E', 'W');
            format!(
                "GPRMC,{},A,{},{},{},{},{:.2},{:.1},{},,,A",
                clock(ts),
                lat,
                ns,
                lon,
                ew,
                fix.speed_mps * MPS_TO_KNOTS,
                fix.course_deg,
                ts.format("%d%m%y")
            )
        }
        None => format!("GPRMC,{},V,,,,,,,{},,,N", clock(ts), ts.format("%d%m%y")),
    };
    encode(&body)
}

pub fn gga(ts: DateTime<Utc>, fix: Option<&Fix>, used: u32, hdop: f64) -> String {
    let body = match fix {
        Some(fix) => {
            let (lat, ns) = angle(fix.lat, 2, 'N', 'S');
            let (lon, ew) = angle(fix.lon, 3, 'E', 'W');
            format!(
                "GPGGA,{},{},{},{},{},1,{:02},{:.1},{:.1},M,39.5,M,,",
                clock(ts),
                lat,
                ns,
                lon,
                ew,
                used,
                hdop,
                fix.alt_m
            )
        }
        None => format!("GPGGA,{},,,,,0,{:02},,,M,,M,,", clock(ts), used),
    };
    encode(&body)
}

pub fn gsa(used_prns: &[u32], pdop: f64, hdop: f64, vdop: f64) -> String {
    let mode = if used_prns.len() >= 4 { '3' } else { '1' };
    let slots: Vec<String> = (0..12)
        .map(|i| used_prns.get(i).map(|prn| format!("{:02}", prn)).unwrap_or_default())
        .collect();
    encode(&format!(
        "GPGSA,A,{},{},{:.1},{:.1},{:.1}",
        mode,
        slots.join(","),
        pdop,
        hdop,
        vdop
    ))
}

/// Satellites-in-view group, four satellites per sentence.
pub fn gsv(sky: &[SkySatellite]) -> Vec<String> {
    let total = ((sky.len() + 3) / 4).max(1);
    (0..total)
        .map(|part| {
            let blocks: Vec<String> = sky
                .iter()
                .skip(part * 4)
                .take(4)
                .map(|sat| {
                    format!(
                        "{:02},{:02},{:03},{}",
                        sat.prn,
                        sat.elevation_deg,
                        sat.azimuth_deg,
                        sat.cn0_dbhz.map(|c| format!("{:02}", c)).unwrap_or_default()
                    )
                })
                .collect();
            encode(&format!(
                "GPGSV,{},{},{:02},{}",
                total,
                part + 1,
                sky.len(),
                blocks.join(",")
            ))
        })
        .collect()
}
