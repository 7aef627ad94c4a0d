use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::CommandError;

pub const PRIMARY_SLOTS: usize = 6;
pub const SECONDARY_SLOTS: usize = 2;

/// One switch point of the unit's weekly program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub hour: u8,
    pub minute: u8,
    pub temp: f32,
}

impl ScheduleSlot {
    pub fn new(hour: u8, minute: u8, temp: f32) -> Self {
        Self { hour, minute, temp }
    }

    /// Minute 60 passes, as existing bus clients send it.
    fn has_valid_time(&self) -> bool {
        self.hour <= 23 && self.minute <= 60
    }
}

/// True once every slot holds a real time. The unit's placeholder for a
/// program it has not reported yet fails this.
pub fn is_known(slots: &[ScheduleSlot]) -> bool {
    !slots.is_empty() && slots.iter().all(ScheduleSlot::has_valid_time)
}

/// Formats slots as `HH:MM T.T;HH:MM T.T;...`.
///
/// Returns an empty string unless the whole program is [known](is_known).
pub fn encode(slots: &[ScheduleSlot]) -> String {
    if !is_known(slots) {
        return String::new();
    }

    slots
        .iter()
        .map(|slot| format!("{:02}:{:02} {:.1}", slot.hour, slot.minute, slot.temp))
        .collect::<Vec<_>>()
        .join(";")
}

/// Parses a schedule string against `current`, all or nothing.
///
/// Records replace slots from the start; slots past the last record keep
/// their current value, so a partial update needs a known `current`.
/// Temperatures must lie within `[min_temp, max_temp]`.
pub fn decode(
    text: &str,
    current: &[ScheduleSlot],
    min_temp: f32,
    max_temp: f32,
) -> Result<Vec<ScheduleSlot>, CommandError> {
    let mut slots = current.to_vec();
    let records: Vec<&str> = text
        .split(';')
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .collect();

    if records.is_empty() {
        return Err(CommandError::ParseFailure("empty schedule".into()));
    }
    if records.len() > current.len() {
        return Err(CommandError::ParseFailure(format!(
            "{} records for {} slots",
            records.len(),
            current.len()
        )));
    }
    if records.len() < current.len() && !is_known(current) {
        return Err(CommandError::CommandOutOfRange(format!(
            "schedule not yet known, all {} records required",
            current.len()
        )));
    }

    for (slot, record) in slots.iter_mut().zip(records) {
        *slot = parse_record(record, min_temp, max_temp)?;
    }

    Ok(slots)
}

fn parse_record(record: &str, min_temp: f32, max_temp: f32) -> Result<ScheduleSlot, CommandError> {
    let bad = || CommandError::ParseFailure(format!("bad schedule record '{record}'"));

    let mut parts = record.split_whitespace();
    let time = parts.next().ok_or_else(bad)?;
    let temp = parts.next().ok_or_else(bad)?;
    if parts.next().is_some() {
        return Err(bad());
    }

    let (hour, minute) = time.split_once(':').ok_or_else(bad)?;
    let hour: u8 = hour.trim().parse().map_err(|_| bad())?;
    let minute: u8 = minute.trim().parse().map_err(|_| bad())?;
    let temp: f32 = temp.parse().map_err(|_| bad())?;

    // Minute 60 is accepted for compatibility with existing bus clients.
    if hour > 23 || minute > 60 {
        return Err(CommandError::CommandOutOfRange(format!(
            "schedule time {hour}:{minute}"
        )));
    }
    if !temp.is_finite() || temp < min_temp || temp > max_temp {
        return Err(CommandError::CommandOutOfRange(format!(
            "schedule temperature {temp} outside {min_temp}..{max_temp}"
        )));
    }

    Ok(ScheduleSlot {
        hour,
        minute,
        temp: round_half(temp),
    })
}

/// Rounds to the nearest half degree, the unit's temperature resolution.
pub fn round_half(value: f32) -> f32 {
    (value * 2.0).round() / 2.0
}

/// Wall-clock time in the unit's convention (weekday 1 = Monday .. 7 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    pub weekday: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl LocalClock {
    pub fn from_datetime<T: Datelike + Timelike>(now: &T) -> Self {
        Self {
            weekday: now.weekday().number_from_monday() as u8,
            hours: now.hour() as u8,
            minutes: now.minute() as u8,
            seconds: now.second() as u8,
        }
    }

    pub fn seconds_of_week(&self) -> i64 {
        let day = i64::from(self.weekday.clamp(1, 7)) - 1;
        day * 86_400
            + i64::from(self.hours) * 3_600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds)
    }

    /// Absolute distance between two clocks, wrapping around the week.
    pub fn drift_seconds(&self, other: &LocalClock) -> i64 {
        const WEEK: i64 = 7 * 86_400;
        let diff = (self.seconds_of_week() - other.seconds_of_week()).rem_euclid(WEEK);
        diff.min(WEEK - diff)
    }

    pub fn advanced_by(&self, seconds: u64) -> Self {
        const WEEK: i64 = 7 * 86_400;
        let total = (self.seconds_of_week() + (seconds % WEEK as u64) as i64).rem_euclid(WEEK);
        Self {
            weekday: (total / 86_400) as u8 + 1,
            hours: ((total % 86_400) / 3_600) as u8,
            minutes: ((total % 3_600) / 60) as u8,
            seconds: (total % 60) as u8,
        }
    }
}
