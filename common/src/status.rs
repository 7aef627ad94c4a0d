//! Decoder for the unit's status reply.
//!
//! Offsets are from the frame start. The frame ends with a two-byte
//! CRC-16/MODBUS that is not counted in the payload lengths below.

use crate::{
    crc::{self, CrcCheck},
    error::FrameError,
    schedule::{ScheduleSlot, PRIMARY_SLOTS, SECONDARY_SLOTS},
    state::ThermState,
};

/// Function code pair that opens every status reply.
pub const STATUS_SIGNATURE: [u8; 2] = [0x01, 0x03];

const OFF_LOCKED: usize = 3;
const OFF_POWER: usize = 4;
const OFF_ROOM_TEMP: usize = 5;
const OFF_TARGET_TEMP: usize = 6;
const OFF_MODE: usize = 7;
const OFF_SENSOR: usize = 8;
const OFF_FLOOR_MAX: usize = 9;
const OFF_HYSTERESIS: usize = 10;
const OFF_TEMP_MAX: usize = 11;
const OFF_TEMP_MIN: usize = 12;
const OFF_ADJ_TEMP: usize = 13;
const OFF_ANTI_FROZE: usize = 15;
const OFF_POWER_ON_MEMORY: usize = 16;
const OFF_FLOOR_TEMP: usize = 19;
const OFF_HOURS: usize = 20;
const OFF_MINUTES: usize = 21;
const OFF_SECONDS: usize = 22;
const OFF_WEEKDAY: usize = 23;
const OFF_SCHEDULE_TIMES: usize = 24;
const OFF_SCHEDULE_TEMPS: usize = 40;

const MIN_STATUS_PAYLOAD: usize = OFF_POWER_ON_MEMORY + 1;
const CLOCK_PAYLOAD: usize = OFF_WEEKDAY + 1;
const SCHEDULE_PAYLOAD: usize = OFF_SCHEDULE_TEMPS + PRIMARY_SLOTS + SECONDARY_SLOTS;

/// What an accepted status frame carried beyond the mandatory block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub has_clock: bool,
    pub has_schedule: bool,
}

/// Validates `frame` and, only if it is an acceptable status reply,
/// overwrites `state` with its contents.
pub fn decode_status(
    frame: &[u8],
    state: &mut ThermState,
    check: CrcCheck,
) -> Result<StatusReport, FrameError> {
    if frame.len() < 3 {
        return Err(FrameError::FrameTooShort { len: frame.len() });
    }
    crc::verify(frame, check)?;

    if frame[..2] != STATUS_SIGNATURE {
        return Err(FrameError::SignatureMismatch {
            found: [frame[0], frame[1]],
        });
    }

    let payload = &frame[..frame.len() - 2];
    if payload.len() < MIN_STATUS_PAYLOAD {
        return Err(FrameError::RangeViolation("status payload truncated"));
    }
    if payload[OFF_TEMP_MAX] <= payload[OFF_TEMP_MIN] {
        return Err(FrameError::RangeViolation("target max not above target min"));
    }

    state.locked = payload[OFF_LOCKED] & 0x01 != 0;
    state.power = payload[OFF_POWER] & 0x01 != 0;
    state.heating = payload[OFF_POWER] & 0x10 != 0;
    state.target_set_manually = payload[OFF_POWER] & 0x40 != 0;

    state.room_temp = half_degrees(payload[OFF_ROOM_TEMP]);
    state.target_temp = half_degrees(payload[OFF_TARGET_TEMP]);

    state.auto_mode = payload[OFF_MODE] & 0x01 != 0;
    state.loop_mode = payload[OFF_MODE] >> 4;
    state.sensor = payload[OFF_SENSOR] & 0x0F;
    state.floor_temp_max = i32::from(payload[OFF_FLOOR_MAX]);
    state.hysteresis = half_degrees(payload[OFF_HYSTERESIS]);
    state.target_temp_max = f32::from(payload[OFF_TEMP_MAX]);
    state.target_temp_min = f32::from(payload[OFF_TEMP_MIN]);
    state.adj_temp =
        f32::from(i16::from_be_bytes([payload[OFF_ADJ_TEMP], payload[OFF_ADJ_TEMP + 1]])) / 2.0;

    state.anti_froze = payload[OFF_ANTI_FROZE] & 0x01 != 0;
    state.power_on_memory = payload[OFF_POWER_ON_MEMORY] & 0x01 != 0;

    let mut report = StatusReport::default();

    if payload.len() > OFF_FLOOR_TEMP {
        state.floor_temp = half_degrees(payload[OFF_FLOOR_TEMP]);
    }

    // Clock bytes are taken as reported; the unit sometimes sends
    // out-of-range values right after power-up.
    if payload.len() >= CLOCK_PAYLOAD {
        state.hours = payload[OFF_HOURS];
        state.minutes = payload[OFF_MINUTES];
        state.seconds = payload[OFF_SECONDS];
        state.weekday = payload[OFF_WEEKDAY];
        report.has_clock = true;
    }

    if payload.len() >= SCHEDULE_PAYLOAD {
        let slots: Vec<ScheduleSlot> = (0..PRIMARY_SLOTS + SECONDARY_SLOTS)
            .map(|i| ScheduleSlot {
                hour: payload[OFF_SCHEDULE_TIMES + i * 2],
                minute: payload[OFF_SCHEDULE_TIMES + i * 2 + 1],
                temp: half_degrees(payload[OFF_SCHEDULE_TEMPS + i]),
            })
            .collect();
        state.schedule.copy_from_slice(&slots[..PRIMARY_SLOTS]);
        state.schedule2.copy_from_slice(&slots[PRIMARY_SLOTS..]);
        report.has_schedule = true;
    }

    Ok(report)
}

fn half_degrees(raw: u8) -> f32 {
    f32::from(raw) / 2.0
}
