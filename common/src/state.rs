use serde::Serialize;

use crate::schedule::{ScheduleSlot, PRIMARY_SLOTS, SECONDARY_SLOTS};

pub const SENSOR_INTERNAL: u8 = 0;
pub const SENSOR_EXTERNAL: u8 = 1;
pub const SENSOR_BOTH: u8 = 2;

/// Canonical snapshot of the thermostat unit.
///
/// Overwritten by every valid status frame, and optimistically by accepted
/// bus commands until the next poll reports the real value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermState {
    pub locked: bool,
    pub power: bool,
    pub heating: bool,
    pub target_set_manually: bool,

    pub room_temp: f32,
    pub target_temp: f32,
    pub target_temp_max: f32,
    pub target_temp_min: f32,

    pub floor_temp: f32,
    pub floor_temp_max: i32,

    pub auto_mode: bool,
    pub loop_mode: u8,
    pub sensor: u8,
    pub hysteresis: f32,
    pub adj_temp: f32,

    pub anti_froze: bool,
    pub power_on_memory: bool,

    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub weekday: u8,

    pub schedule: [ScheduleSlot; PRIMARY_SLOTS],
    pub schedule2: [ScheduleSlot; SECONDARY_SLOTS],
}

impl Default for ThermState {
    fn default() -> Self {
        // Slots start out of range so the schedule reads as "not yet known".
        let unknown = ScheduleSlot::new(0xFF, 0xFF, 0.0);
        Self {
            locked: false,
            power: false,
            heating: false,
            target_set_manually: false,
            room_temp: 0.0,
            target_temp: 0.0,
            target_temp_max: 0.0,
            target_temp_min: 0.0,
            floor_temp: 0.0,
            floor_temp_max: 0,
            auto_mode: false,
            loop_mode: 0,
            sensor: SENSOR_INTERNAL,
            hysteresis: 0.0,
            adj_temp: 0.0,
            anti_froze: false,
            power_on_memory: false,
            hours: 0,
            minutes: 0,
            seconds: 0,
            weekday: 1,
            schedule: [unknown; PRIMARY_SLOTS],
            schedule2: [unknown; SECONDARY_SLOTS],
        }
    }
}

impl ThermState {
    /// `HH:MM` as published on the `Time` topic.
    pub fn time_string(&self) -> String {
        format!("{:02}:{:02}", self.hours, self.minutes)
    }

    pub fn target_in_range(&self, temp: f32) -> bool {
        temp.is_finite() && temp >= self.target_temp_min && temp <= self.target_temp_max
    }
}
