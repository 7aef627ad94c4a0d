pub mod bridge;
pub mod command;
pub mod config;
pub mod crc;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod publisher;
pub mod schedule;
pub mod sensor;
pub mod state;
pub mod status;
pub mod topics;
pub mod types;

pub use bridge::{Bridge, Bus, Link, TickContext};
pub use command::IndicatorMode;
pub use config::{BridgeConfig, NetworkConfig, PersistedSettings, RuntimeConfig, SerialConfig};
pub use crc::CrcCheck;
pub use dispatcher::CommandOutcome;
pub use error::{CommandError, FrameError};
pub use schedule::{LocalClock, ScheduleSlot};
pub use sensor::{AuxInputs, AuxReporter, AuxSample};
pub use state::ThermState;
pub use topics::*;
pub use types::{AutoAdjMode, BridgeStatus};
