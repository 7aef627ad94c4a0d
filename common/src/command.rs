//! Outbound frames for the unit.
//!
//! Writes follow Modbus conventions: function 0x06 for a single register,
//! 0x10 for a register block, CRC-16/MODBUS appended low byte first.

use serde::{Deserialize, Serialize};

use crate::{
    crc::append_crc,
    error::CommandError,
    schedule::ScheduleSlot,
    state::ThermState,
};

const DEVICE_ADDRESS: u8 = 0x01;
const FN_WRITE_SINGLE: u8 = 0x06;
const FN_WRITE_MULTIPLE: u8 = 0x10;

const REG_POWER_LOCK: u16 = 0x0000;
const REG_TARGET_TEMP: u16 = 0x0001;
const REG_MODE: u16 = 0x0002;
const REG_CLOCK: u16 = 0x0008;
const REG_SCHEDULE: u16 = 0x000A;

/// Reads 0x16 registers from address 0.
const QUERY_STATUS: [u8; 6] = [0x01, 0x03, 0x00, 0x00, 0x00, 0x16];

/// Preamble of the checksum-less connectivity indicator frame.
const INDICATOR_PREAMBLE: [u8; 12] = [
    0x55, 0xAA, 0x00, 0x2B, 0x00, 0x01, 0x55, 0xAA, 0x00, 0x2B, 0x00, 0x01,
];

/// Connectivity indicator shown on the unit's display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorMode {
    Off,
    FastBlink,
    SlowBlink,
    Steady,
}

impl IndicatorMode {
    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0x00,
            Self::FastBlink => 0x01,
            Self::SlowBlink => 0x02,
            Self::Steady => 0x03,
        }
    }

    /// Network disabled, network down, bus down, all up.
    pub fn for_connectivity(
        network_enabled: bool,
        network_connected: bool,
        bus_connected: bool,
    ) -> Self {
        if !network_enabled {
            Self::Off
        } else if !network_connected {
            Self::FastBlink
        } else if !bus_connected {
            Self::SlowBlink
        } else {
            Self::Steady
        }
    }
}

/// Converts hex pairs such as `"01 03 00 00"` into bytes. Whitespace is ignored.
pub fn frame_from_hex(text: &str) -> Result<Vec<u8>, CommandError> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(CommandError::EmptyPayload);
    }
    hex::decode(&cleaned).map_err(|err| CommandError::ParseFailure(format!("hex: {err}")))
}

/// Hex dump used for link diagnostics, CRC separated by a colon.
pub fn describe_frame(frame: &[u8]) -> String {
    if frame.len() < 3 {
        return hex::encode(frame);
    }
    let (body, crc) = frame.split_at(frame.len() - 2);
    format!("{}:{}", hex::encode(body), hex::encode(crc))
}

/// Raw hex command with CRC appended.
pub fn raw(text: &str) -> Result<Vec<u8>, CommandError> {
    let mut frame = frame_from_hex(text)?;
    append_crc(&mut frame);
    Ok(frame)
}

pub fn query_status() -> Vec<u8> {
    let mut frame = QUERY_STATUS.to_vec();
    append_crc(&mut frame);
    frame
}

pub fn set_power_lock(power: bool, locked: bool) -> Vec<u8> {
    write_single(REG_POWER_LOCK, [u8::from(locked), u8::from(power)])
}

pub fn set_target_temp(temp: f32) -> Vec<u8> {
    write_single(REG_TARGET_TEMP, [0x00, to_half_degrees(temp)])
}

pub fn set_mode(auto_mode: bool, loop_mode: u8, sensor: u8) -> Vec<u8> {
    write_single(REG_MODE, [mode_byte(auto_mode, loop_mode), sensor & 0x0F])
}

/// Writes the ten-byte parameter block starting at the mode register.
pub fn set_advanced(state: &ThermState) -> Vec<u8> {
    let adj = (state.adj_temp * 2.0).round() as i16;
    let [adj_hi, adj_lo] = adj.to_be_bytes();
    let block = [
        mode_byte(state.auto_mode, state.loop_mode),
        state.sensor & 0x0F,
        state.floor_temp_max.clamp(0, 255) as u8,
        to_half_degrees(state.hysteresis),
        state.target_temp_max.clamp(0.0, 255.0) as u8,
        state.target_temp_min.clamp(0.0, 255.0) as u8,
        adj_hi,
        adj_lo,
        u8::from(state.anti_froze),
        u8::from(state.power_on_memory),
    ];
    write_multiple(REG_MODE, &block)
}

pub fn set_clock(hours: u8, minutes: u8, seconds: u8, weekday: u8) -> Vec<u8> {
    write_multiple(REG_CLOCK, &[hours, minutes, seconds, weekday])
}

/// Writes all slots: hour/minute pairs first, then half-degree temperatures.
pub fn set_schedule(primary: &[ScheduleSlot], secondary: &[ScheduleSlot]) -> Vec<u8> {
    let slots = || primary.iter().chain(secondary);
    let mut values: Vec<u8> = slots().flat_map(|slot| [slot.hour, slot.minute]).collect();
    values.extend(slots().map(|slot| to_half_degrees(slot.temp)));
    write_multiple(REG_SCHEDULE, &values)
}

pub fn indicator(mode: IndicatorMode) -> Vec<u8> {
    let mut frame = INDICATOR_PREAMBLE.to_vec();
    frame.push(mode.code());
    frame.extend_from_slice(&[0x00; 3]);
    frame
}

fn mode_byte(auto_mode: bool, loop_mode: u8) -> u8 {
    u8::from(auto_mode) | ((loop_mode & 0x0F) << 4)
}

fn to_half_degrees(temp: f32) -> u8 {
    (temp * 2.0).round().clamp(0.0, 255.0) as u8
}

fn write_single(register: u16, value: [u8; 2]) -> Vec<u8> {
    let [reg_hi, reg_lo] = register.to_be_bytes();
    let mut frame = vec![DEVICE_ADDRESS, FN_WRITE_SINGLE, reg_hi, reg_lo, value[0], value[1]];
    append_crc(&mut frame);
    frame
}

fn write_multiple(register: u16, values: &[u8]) -> Vec<u8> {
    let [reg_hi, reg_lo] = register.to_be_bytes();
    let registers = (values.len() as u16).div_ceil(2);
    let [count_hi, count_lo] = registers.to_be_bytes();

    let mut frame = vec![
        DEVICE_ADDRESS,
        FN_WRITE_MULTIPLE,
        reg_hi,
        reg_lo,
        count_hi,
        count_lo,
        values.len() as u8,
    ];
    frame.extend_from_slice(values);
    append_crc(&mut frame);
    frame
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::crc::{verify, CrcCheck};

    fn body(frame: &[u8]) -> &[u8] {
        &frame[..frame.len() - 2]
    }

    #[test]
    fn query_reads_the_full_register_block() {
        let frame = query_status();
        assert_eq!(frame.len(), 8);
        assert_eq!(body(&frame), &[0x01, 0x03, 0x00, 0x00, 0x00, 0x16]);
        assert_eq!(verify(&frame, CrcCheck::Strict), Ok(()));
    }

    #[test]
    fn target_temperature_is_half_degree_encoded() {
        let frame = set_target_temp(21.5);
        assert_eq!(body(&frame), &[0x01, 0x06, 0x00, 0x01, 0x00, 0x2B]);
        assert_eq!(verify(&frame, CrcCheck::Strict), Ok(()));
    }

    #[test]
    fn power_and_lock_share_one_register() {
        assert_eq!(body(&set_power_lock(true, false)), &[0x01, 0x06, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(body(&set_power_lock(false, true)), &[0x01, 0x06, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn mode_packs_auto_and_loop() {
        assert_eq!(body(&set_mode(true, 2, 1)), &[0x01, 0x06, 0x00, 0x02, 0x21, 0x01]);
    }

    #[test]
    fn advanced_block_layout() {
        let state = ThermState {
            auto_mode: false,
            loop_mode: 1,
            sensor: 2,
            floor_temp_max: 45,
            hysteresis: 1.5,
            target_temp_max: 35.0,
            target_temp_min: 5.0,
            adj_temp: -2.5,
            anti_froze: true,
            power_on_memory: false,
            ..ThermState::default()
        };
        let frame = set_advanced(&state);
        assert_eq!(
            body(&frame),
            &[
                0x01, 0x10, 0x00, 0x02, 0x00, 0x05, 0x0A, //
                0x10, 0x02, 45, 3, 35, 5, 0xFF, 0xFB, 0x01, 0x00,
            ]
        );
        assert_eq!(verify(&frame, CrcCheck::Strict), Ok(()));
    }

    #[test]
    fn clock_is_four_bytes() {
        assert_eq!(
            body(&set_clock(19, 30, 5, 7)),
            &[0x01, 0x10, 0x00, 0x08, 0x00, 0x02, 0x04, 19, 30, 5, 7]
        );
    }

    #[test]
    fn schedule_writes_times_then_temperatures() {
        let primary = [ScheduleSlot::new(6, 0, 21.0); 6];
        let secondary = [ScheduleSlot::new(8, 30, 18.5); 2];
        let frame = set_schedule(&primary, &secondary);
        let body = body(&frame);

        assert_eq!(&body[..7], &[0x01, 0x10, 0x00, 0x0A, 0x00, 0x0C, 0x18]);
        assert_eq!(&body[7..9], &[6, 0]);
        assert_eq!(&body[17..21], &[6, 0, 8, 30]);
        assert_eq!(&body[23..], &[42, 42, 42, 42, 42, 42, 37, 37]);
    }

    #[test]
    fn indicator_has_no_checksum() {
        let frame = indicator(IndicatorMode::SlowBlink);
        assert_eq!(frame.len(), 16);
        assert_eq!(&frame[..12], &INDICATOR_PREAMBLE);
        assert_eq!(&frame[12..], &[0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn indicator_follows_connectivity() {
        assert_eq!(IndicatorMode::for_connectivity(false, true, true), IndicatorMode::Off);
        assert_eq!(IndicatorMode::for_connectivity(true, false, true), IndicatorMode::FastBlink);
        assert_eq!(IndicatorMode::for_connectivity(true, true, false), IndicatorMode::SlowBlink);
        assert_eq!(IndicatorMode::for_connectivity(true, true, true), IndicatorMode::Steady);
    }

    #[test]
    fn raw_hex_accepts_spacing_and_appends_crc() {
        let frame = raw("01 06 00 01 00 2b").unwrap();
        assert_eq!(frame, set_target_temp(21.5));
        assert!(raw("01 0").is_err());
        assert_eq!(raw("  "), Err(CommandError::EmptyPayload));
    }

    #[test]
    fn describe_separates_crc() {
        assert_eq!(describe_frame(&[0x01, 0x03, 0xAB, 0xCD]), "0103:abcd");
    }
}
