//! NMEA log builders shared by the pipeline tests.

use crate::nmea::checksum::encode;

pub const BASELINE_MODEL: &str = include_str!("../../models/baseline-logreg.json");

#[derive(Debug, Clone)]
pub struct Epoch {
    pub offset_s: u32,
    pub lat: f64,
    pub lon: f64,
    pub speed_mps: f64,
    pub course_deg: f64,
    pub sats_used: u32,
    pub hdop: f64,
    /// `None` omits the satellites-in-view group.
    pub cn0_dbhz: Option<f64>,
    pub sats_in_view: u32,
}

impl Epoch {
    /// 1 Hz, 5 m/s due north from Tokyo station, ten satellites at 42 dB-Hz.
    pub fn nominal(i: u32) -> Self {
        Self {
            offset_s: i,
            lat: 35.68 + f64::from(i) * 5.0 / 111_195.0,
            lon: 139.77,
            speed_mps: 5.0,
            course_deg: 0.0,
            sats_used: 10,
            hdop: 0.9,
            cn0_dbhz: Some(42.0),
            sats_in_view: 10,
        }
    }
}

pub fn nominal(count: u32) -> Vec<Epoch> {
    (0..count).map(Epoch::nominal).collect()
}

fn coordinate(value: f64, width: usize) -> String {
    let value = value.abs();
    let degrees = value.trunc();
    let minutes = (value - degrees) * 60.0;
    format!("{:0width$}{:07.4}", degrees as u32, minutes, width = width)
}

fn clock(offset_s: u32) -> String {
    let secs = 12 * 3600 + offset_s;
    format!("{:02}{:02}{:02}", secs / 3600 % 24, secs / 60 % 60, secs % 60)
}

pub fn epoch_lines(epoch: &Epoch) -> Vec<String> {
    let time = clock(epoch.offset_s);
    let lat = coordinate(epoch.lat, 2);
    let lon = coordinate(epoch.lon, 3);
    let mut lines = vec![
        encode(&format!(
            "GPRMC,{},A,{},N,{},E,{:.2},{:.1},150324,,",
            time,
            lat,
            lon,
            epoch.speed_mps / 0.514444,
            epoch.course_deg
        )),
        encode(&format!(
            "GPGGA,{},{},N,{},E,1,{:02},{:.1},40.0,M,,M,,",
            time, lat, lon, epoch.sats_used, epoch.hdop
        )),
    ];
    let used: Vec<String> = (1..=12)
        .map(|prn| {
            if prn <= epoch.sats_used {
                format!("{:02}", prn)
            } else {
                String::new()
            }
        })
        .collect();
    lines.push(encode(&format!(
        "GPGSA,A,3,{},1.6,{:.1},1.3",
        used.join(","),
        epoch.hdop
    )));

    if let Some(cn0) = epoch.cn0_dbhz {
        let total = (epoch.sats_in_view.max(1) + 3) / 4;
        for part in 0..total {
            let blocks: Vec<String> = (part * 4 + 1..=(part * 4 + 4).min(epoch.sats_in_view))
                .map(|prn| format!("{:02},45,{:03},{:02.0}", prn, prn * 30 % 360, cn0))
                .collect();
            lines.push(encode(&format!(
                "GPGSV,{},{},{:02},{}",
                total,
                part + 1,
                epoch.sats_in_view,
                blocks.join(",")
            )));
        }
    }
    lines
}

pub fn render(epochs: &[Epoch]) -> String {
    let mut text = epochs
        .iter()
        .flat_map(epoch_lines)
        .collect::<Vec<_>>()
        .join("\r\n");
    text.push_str("\r\n");
    text
}
