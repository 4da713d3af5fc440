//! Epoch reconstruction: decoded sentences in, ordered navigation samples out.

pub mod builder;
pub mod sample;

pub use builder::TrackBuilder;
pub use sample::{EpochSatellites, Sample, Track};
