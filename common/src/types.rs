use serde::{Deserialize, Serialize};

use crate::{command::IndicatorMode, state::ThermState};

/// Which auxiliary reading, if any, drives the unit's temperature correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoAdjMode {
    #[default]
    Off,
    Temperature,
    HeatIndex,
}

impl AutoAdjMode {
    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Temperature => 1,
            Self::HeatIndex => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::Temperature),
            2 => Some(Self::HeatIndex),
            _ => None,
        }
    }
}

/// Snapshot served by the host's status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeStatus {
    pub state: ThermState,
    #[serde(rename = "autoAdjMode")]
    pub auto_adj_mode: AutoAdjMode,
    pub indicator: Option<IndicatorMode>,
    #[serde(rename = "statusAgeMs")]
    pub status_age_ms: Option<u64>,
    #[serde(rename = "lastActivityAgeMs")]
    pub last_activity_age_ms: Option<u64>,
    #[serde(rename = "framesAccepted")]
    pub frames_accepted: u64,
    #[serde(rename = "framesRejected")]
    pub frames_rejected: u64,
}
