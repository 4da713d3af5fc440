use crate::generator::template::{self, Fix, SkySatellite};
use anyhow::ensure;
use chrono::{DateTime, Duration, TimeZone, Utc};
use gnsscore::math::geo::EARTH_RADIUS_M;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Steady drive with a healthy sky.
    Nominal,
    /// Broadband interference over the middle third: CN0 collapses and the fix is lost.
    Jamming,
    /// Position captured 10 km north halfway through the log.
    PositionJump,
    /// Nominal drive without satellites-in-view sentences.
    NoGsv,
}

/// Configuration for generating a synthetic receiver log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub scenario: Scenario,
    pub epochs: u32,
    pub seed: u64,
    pub start: DateTime<Utc>,
    pub start_lat: f64,
    pub start_lon: f64,
    pub speed_mps: f64,
    pub course_deg: f64,
    pub satellites: u32,
    pub cn0_dbhz: f64,
    pub cn0_noise_dbhz: f64,
    pub position_noise_m: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Nominal,
            epochs: 120,
            seed: 7,
            start: Utc
                .with_ymd_and_hms(2024, 3, 15, 12, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            start_lat: 35.68,
            start_lon: 139.77,
            speed_mps: 5.0,
            course_deg: 0.0,
            satellites: 10,
            cn0_dbhz: 42.0,
            cn0_noise_dbhz: 2.0,
            position_noise_m: 0.3,
        }
    }
}

const JAMMED_CN0_DBHZ: f64 = 10.0;
const JUMP_NORTH_M: f64 = 10_000.0;

impl GeneratorConfig {
    fn jammed(&self, epoch: u32) -> bool {
        self.scenario == Scenario::Jamming
            && (self.epochs / 3..2 * self.epochs / 3).contains(&epoch)
    }

    fn captured(&self, epoch: u32) -> bool {
        self.scenario == Scenario::PositionJump && epoch >= self.epochs / 2
    }
}

fn metres_to_lat(m: f64) -> f64 {
    (m / EARTH_RADIUS_M).to_degrees()
}

fn metres_to_lon(m: f64, lat: f64) -> f64 {
    (m / (EARTH_RADIUS_M * lat.to_radians().cos())).to_degrees()
}

/// Renders the configured scenario as NMEA text. Identical configs produce
/// identical logs.
pub fn build_log(config: &GeneratorConfig) -> anyhow::Result<String> {
    ensure!(config.epochs > 0, "generator needs at least one epoch");
    ensure!(
        (4..=12).contains(&config.satellites),
        "generator supports 4 to 12 satellites, got {}",
        config.satellites
    );
    ensure!(
        config.cn0_noise_dbhz >= 0.0 && config.position_noise_m >= 0.0,
        "generator noise must not be negative"
    );
    ensure!(
        config.start_lat.abs() < 85.0,
        "start latitude {} too close to the pole",
        config.start_lat
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut lines = Vec::with_capacity(config.epochs as usize * 6);
    let course = config.course_deg.to_radians();

    for epoch in 0..config.epochs {
        let ts = config.start + Duration::seconds(i64::from(epoch));
        let travelled = config.speed_mps * f64::from(epoch);
        let mut north = travelled * course.cos()
            + rng.gen_range(-config.position_noise_m..=config.position_noise_m);
        let east = travelled * course.sin()
            + rng.gen_range(-config.position_noise_m..=config.position_noise_m);
        if config.captured(epoch) {
            north += JUMP_NORTH_M;
        }
        let lat = config.start_lat + metres_to_lat(north);
        let fix = Fix {
            lat,
            lon: config.start_lon + metres_to_lon(east, lat),
            alt_m: 40.0 + rng.gen_range(-0.5..=0.5),
            speed_mps: (config.speed_mps + rng.gen_range(-0.05..=0.05)).max(0.0),
            course_deg: config.course_deg,
        };

        let jammed = config.jammed(epoch);
        let sky: Vec<SkySatellite> = (1..=config.satellites)
            .map(|prn| {
                let mean = if jammed { JAMMED_CN0_DBHZ } else { config.cn0_dbhz };
                let cn0 = mean + rng.gen_range(-config.cn0_noise_dbhz..=config.cn0_noise_dbhz);
                SkySatellite {
                    prn,
                    elevation_deg: 15 + prn * 5 % 70,
                    azimuth_deg: prn * 37 % 360,
                    cn0_dbhz: Some(cn0.round().max(1.0) as u32),
                }
            })
            .collect();

        if jammed {
            let used = epoch % 3;
            let prns: Vec<u32> = (1..=used).collect();
            lines.push(template::rmc(ts, None));
            lines.push(template::gga(ts, None, used, 0.0));
            lines.push(template::gsa(&prns, 99.9, 99.9, 99.9));
        } else {
            let prns: Vec<u32> = (1..=config.satellites).collect();
            lines.push(template::rmc(ts, Some(&fix)));
            lines.push(template::gga(ts, Some(&fix), config.satellites, 0.9));
            lines.push(template::gsa(&prns, 1.6, 0.9, 1.3));
        }
        if config.scenario != Scenario::NoGsv {
            lines.extend(template::gsv(&sky));
        }
    }

    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    Ok(text)
}
