use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    TimeJump,
    PositionJump,
    VelocityInconsistent,
    Cn0Dropout,
    SatelliteCountDrop,
    HdopSpike,
    EphemerisInconsistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyCategory {
    SpoofingSuspected,
    JammingSuspected,
    QualityOnly,
}

impl AnomalyKind {
    /// Category is a fixed property of the check that produced the event.
    pub fn category(&self) -> AnomalyCategory {
        match self {
            AnomalyKind::TimeJump
            | AnomalyKind::PositionJump
            | AnomalyKind::VelocityInconsistent
            | AnomalyKind::EphemerisInconsistent => AnomalyCategory::SpoofingSuspected,
            AnomalyKind::Cn0Dropout | AnomalyKind::SatelliteCountDrop => {
                AnomalyCategory::JammingSuspected
            }
            AnomalyKind::HdopSpike => AnomalyCategory::QualityOnly,
        }
    }
}

/// Measured value against the configured bound it violated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evidence {
    pub measured: f64,
    pub bound: f64,
    pub unit: &'static str,
}

/// A detector finding over a closed time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyEvent {
    kind: AnomalyKind,
    category: AnomalyCategory,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    evidence: Evidence,
}

impl AnomalyEvent {
    pub(crate) fn new(
        kind: AnomalyKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        evidence: Evidence,
    ) -> Self {
        Self {
            kind,
            category: kind.category(),
            start,
            end,
            evidence,
        }
    }

    pub fn kind(&self) -> AnomalyKind {
        self.kind
    }

    pub fn category(&self) -> AnomalyCategory {
        self.category
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn evidence(&self) -> Evidence {
        self.evidence
    }

    pub fn covers(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}
