//! NMEA 0183 framing, field decoding and sentence parsing.

pub mod checksum;
pub mod fields;
pub mod parser;
pub mod sentence;

pub use parser::{ParsedLog, ParsedSentence, SentenceParser};
pub use sentence::{
    FrameError, GnssSystem, Gga, Gsa, Position, RawSentence, Rmc, SatelliteGroup,
    SatelliteObservation, Sentence, Vtg,
};
