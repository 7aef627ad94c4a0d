use tracing::{debug, info};

use crate::{
    bridge::{Bridge, Bus, Link, ADJ_TEMP_LIMIT},
    command,
    error::CommandError,
    schedule::{self, round_half, ScheduleSlot},
    state::SENSOR_BOTH,
    topics::*,
    types::AutoAdjMode,
};

/// Larger command payloads are rejected unparsed.
pub const MAX_COMMAND_PAYLOAD: usize = 512;

const HYSTERESIS_RANGE: std::ops::RangeInclusive<f32> = 0.5..=5.0;
const FLOOR_TEMP_MAX_RANGE: std::ops::RangeInclusive<i32> = 5..=70;
const TARGET_TEMP_CEILING: i32 = 45;
const TARGET_TEMP_FLOOR: i32 = 5;

/// Result of one bus command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    /// A frame was written to the unit.
    pub written: bool,
    /// Persisted settings changed and should be saved.
    pub settings_changed: bool,
    pub error: Option<CommandError>,
}

impl CommandOutcome {
    fn rejected(error: CommandError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

enum Applied {
    Unchanged,
    Written,
    Settings,
}

impl Bridge {
    /// Applies a command received on a prefix-relative topic, then clears the
    /// retained command with an empty ack.
    ///
    /// An empty payload is our own ack coming back and is not acked again.
    pub fn handle_command<L, B>(
        &mut self,
        topic: &str,
        payload: &str,
        now_ms: u64,
        link: &mut L,
        bus: &mut B,
    ) -> CommandOutcome
    where
        L: Link + ?Sized,
        B: Bus + ?Sized,
    {
        if !COMMAND_TOPICS.contains(&topic) {
            return CommandOutcome::rejected(CommandError::UnknownTopic(topic.to_string()));
        }
        if payload.trim().is_empty() {
            return CommandOutcome::rejected(CommandError::EmptyPayload);
        }

        let outcome = match self.apply_command(topic, payload, now_ms, link) {
            Ok(Applied::Unchanged) => CommandOutcome::default(),
            Ok(Applied::Written) => CommandOutcome {
                written: true,
                ..CommandOutcome::default()
            },
            Ok(Applied::Settings) => CommandOutcome {
                settings_changed: true,
                ..CommandOutcome::default()
            },
            Err(err) => CommandOutcome::rejected(err),
        };

        if outcome.written {
            info!(topic, payload = payload.trim(), "command applied");
        }
        if !bus.publish(topic, "", true) {
            debug!(topic, "command ack not sent");
        }
        outcome
    }

    fn apply_command<L: Link + ?Sized>(
        &mut self,
        topic: &str,
        payload: &str,
        now_ms: u64,
        link: &mut L,
    ) -> Result<Applied, CommandError> {
        if payload.len() > MAX_COMMAND_PAYLOAD {
            return Err(CommandError::PayloadTooLarge { len: payload.len() });
        }
        let payload = payload.trim();

        match topic {
            TOPIC_CMD_TARGET_TEMP => {
                let temp = parse_float(payload)?;
                if !self.state.target_in_range(temp) {
                    return Err(out_of_range(
                        "target temperature",
                        temp,
                        self.state.target_temp_min..=self.state.target_temp_max,
                    ));
                }
                let temp = round_half(temp);
                if temp == self.state.target_temp {
                    return Ok(Applied::Unchanged);
                }
                self.state.target_temp = temp;
                Ok(self.write(command::set_target_temp(temp), now_ms, link))
            }
            TOPIC_CMD_POWER => {
                let power = parse_bool(payload)?;
                if power == self.state.power {
                    return Ok(Applied::Unchanged);
                }
                self.state.power = power;
                Ok(self.write_power_lock(now_ms, link))
            }
            TOPIC_CMD_LOCKED => {
                let locked = parse_bool(payload)?;
                if locked == self.state.locked {
                    return Ok(Applied::Unchanged);
                }
                self.state.locked = locked;
                Ok(self.write_power_lock(now_ms, link))
            }
            TOPIC_CMD_AUTO_MODE => {
                let auto_mode = parse_bool(payload)?;
                if auto_mode == self.state.auto_mode {
                    return Ok(Applied::Unchanged);
                }
                self.state.auto_mode = auto_mode;
                Ok(self.write_mode(now_ms, link))
            }
            TOPIC_CMD_LOOP_MODE => {
                let loop_mode = parse_int(payload, 0..=15)? as u8;
                if loop_mode == self.state.loop_mode {
                    return Ok(Applied::Unchanged);
                }
                self.state.loop_mode = loop_mode;
                Ok(self.write_mode(now_ms, link))
            }
            TOPIC_CMD_SENSOR => {
                let sensor = parse_int(payload, 0..=i32::from(SENSOR_BOTH))? as u8;
                if sensor == self.state.sensor {
                    return Ok(Applied::Unchanged);
                }
                self.state.sensor = sensor;
                Ok(self.write_mode(now_ms, link))
            }
            TOPIC_CMD_ADJ_TEMP => {
                let adj = parse_float(payload)?;
                if !(-ADJ_TEMP_LIMIT..=ADJ_TEMP_LIMIT).contains(&adj) {
                    return Err(out_of_range("adjustment", adj, -ADJ_TEMP_LIMIT..=ADJ_TEMP_LIMIT));
                }
                let adj = round_half(adj);
                if adj == self.state.adj_temp {
                    return Ok(Applied::Unchanged);
                }
                self.state.adj_temp = adj;
                Ok(self.write_advanced(now_ms, link))
            }
            TOPIC_CMD_FLOOR_TEMP_MAX => {
                let max = parse_int(payload, FLOOR_TEMP_MAX_RANGE)?;
                if max == self.state.floor_temp_max {
                    return Ok(Applied::Unchanged);
                }
                self.state.floor_temp_max = max;
                Ok(self.write_advanced(now_ms, link))
            }
            TOPIC_CMD_ANTI_FROZE => {
                let anti_froze = parse_bool(payload)?;
                if anti_froze == self.state.anti_froze {
                    return Ok(Applied::Unchanged);
                }
                self.state.anti_froze = anti_froze;
                Ok(self.write_advanced(now_ms, link))
            }
            TOPIC_CMD_POWER_ON_MEMORY => {
                let memory = parse_bool(payload)?;
                if memory == self.state.power_on_memory {
                    return Ok(Applied::Unchanged);
                }
                self.state.power_on_memory = memory;
                Ok(self.write_advanced(now_ms, link))
            }
            TOPIC_CMD_HYSTERESIS => {
                let hysteresis = parse_float(payload)?;
                if !HYSTERESIS_RANGE.contains(&hysteresis) {
                    return Err(out_of_range("hysteresis", hysteresis, HYSTERESIS_RANGE));
                }
                let hysteresis = round_half(hysteresis);
                if hysteresis == self.state.hysteresis {
                    return Ok(Applied::Unchanged);
                }
                self.state.hysteresis = hysteresis;
                Ok(self.write_advanced(now_ms, link))
            }
            TOPIC_CMD_TARGET_TEMP_MAX => {
                let min = self.state.target_temp_min as i32;
                let max = parse_int(payload, (min + 1)..=TARGET_TEMP_CEILING)?;
                if max as f32 == self.state.target_temp_max {
                    return Ok(Applied::Unchanged);
                }
                self.state.target_temp_max = max as f32;
                Ok(self.write_advanced(now_ms, link))
            }
            TOPIC_CMD_TARGET_TEMP_MIN => {
                let max = self.state.target_temp_max as i32;
                let min = parse_int(payload, TARGET_TEMP_FLOOR..=(max - 1))?;
                if min as f32 == self.state.target_temp_min {
                    return Ok(Applied::Unchanged);
                }
                self.state.target_temp_min = min as f32;
                Ok(self.write_advanced(now_ms, link))
            }
            TOPIC_CMD_WEEKDAY => {
                let weekday = parse_int(payload, 1..=7)? as u8;
                if weekday == self.state.weekday {
                    return Ok(Applied::Unchanged);
                }
                self.state.weekday = weekday;
                Ok(self.write_clock(now_ms, link))
            }
            TOPIC_CMD_TIME => {
                let (hours, minutes, seconds) = parse_time(payload)?;
                let current = (self.state.hours, self.state.minutes, self.state.seconds);
                if (hours, minutes, seconds) == current {
                    return Ok(Applied::Unchanged);
                }
                self.state.hours = hours;
                self.state.minutes = minutes;
                self.state.seconds = seconds;
                Ok(self.write_clock(now_ms, link))
            }
            TOPIC_CMD_SCHEDULE => {
                let slots = self.decode_schedule(payload, &self.state.schedule)?;
                if slots == self.state.schedule {
                    return Ok(Applied::Unchanged);
                }
                require_known(&self.state.schedule2, "secondary schedule")?;
                self.state.schedule.copy_from_slice(&slots);
                Ok(self.write_schedule(now_ms, link))
            }
            TOPIC_CMD_SCHEDULE2 => {
                let slots = self.decode_schedule(payload, &self.state.schedule2)?;
                if slots == self.state.schedule2 {
                    return Ok(Applied::Unchanged);
                }
                require_known(&self.state.schedule, "primary schedule")?;
                self.state.schedule2.copy_from_slice(&slots);
                Ok(self.write_schedule(now_ms, link))
            }
            TOPIC_CMD_AUTO_ADJ_MODE => {
                let code = parse_int(payload, 0..=2)? as u8;
                let mode = AutoAdjMode::from_code(code).ok_or_else(|| {
                    CommandError::CommandOutOfRange(format!("auto adjust mode {code}"))
                })?;
                if mode == self.settings.auto_adj_mode {
                    return Ok(Applied::Unchanged);
                }
                info!(?mode, "auto adjust mode changed");
                self.settings.auto_adj_mode = mode;
                Ok(Applied::Settings)
            }
            TOPIC_CMD_SEND_COMMAND if self.config.debug_topics => {
                let frame = command::raw(payload)?;
                Ok(self.write(frame, now_ms, link))
            }
            _ => Err(CommandError::UnknownTopic(topic.to_string())),
        }
    }

    fn decode_schedule(
        &self,
        payload: &str,
        current: &[ScheduleSlot],
    ) -> Result<Vec<ScheduleSlot>, CommandError> {
        schedule::decode(
            payload,
            current,
            self.state.target_temp_min,
            self.state.target_temp_max,
        )
    }

    fn write<L: Link + ?Sized>(&mut self, frame: Vec<u8>, now_ms: u64, link: &mut L) -> Applied {
        self.last_command_ms = Some(now_ms);
        self.send(&frame, now_ms, link);
        Applied::Written
    }

    fn write_power_lock<L: Link + ?Sized>(&mut self, now_ms: u64, link: &mut L) -> Applied {
        let frame = command::set_power_lock(self.state.power, self.state.locked);
        self.write(frame, now_ms, link)
    }

    fn write_mode<L: Link + ?Sized>(&mut self, now_ms: u64, link: &mut L) -> Applied {
        let state = &self.state;
        let frame = command::set_mode(state.auto_mode, state.loop_mode, state.sensor);
        self.write(frame, now_ms, link)
    }

    fn write_advanced<L: Link + ?Sized>(&mut self, now_ms: u64, link: &mut L) -> Applied {
        let frame = command::set_advanced(&self.state);
        self.write(frame, now_ms, link)
    }

    fn write_clock<L: Link + ?Sized>(&mut self, now_ms: u64, link: &mut L) -> Applied {
        self.clock_at_ms = Some(now_ms);
        let frame = command::set_clock(
            self.state.hours,
            self.state.minutes,
            self.state.seconds,
            self.state.weekday,
        );
        self.write(frame, now_ms, link)
    }

    fn write_schedule<L: Link + ?Sized>(&mut self, now_ms: u64, link: &mut L) -> Applied {
        let frame = command::set_schedule(&self.state.schedule, &self.state.schedule2);
        self.write(frame, now_ms, link)
    }
}

fn parse_bool(text: &str) -> Result<bool, CommandError> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "on" | "true" => Ok(true),
        "0" | "off" | "false" => Ok(false),
        _ => Err(CommandError::ParseFailure(format!("expected boolean, got {text:?}"))),
    }
}

fn parse_float(text: &str) -> Result<f32, CommandError> {
    text.parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::ParseFailure(format!("expected number, got {text:?}")))
}

fn parse_int(text: &str, range: std::ops::RangeInclusive<i32>) -> Result<i32, CommandError> {
    let value = text
        .parse::<i32>()
        .map_err(|_| CommandError::ParseFailure(format!("expected integer, got {text:?}")))?;
    if !range.contains(&value) {
        return Err(CommandError::CommandOutOfRange(format!(
            "{value} not in {}..={}",
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

/// `H:M` or `H:M:S`. Seconds default to zero.
fn parse_time(text: &str) -> Result<(u8, u8, u8), CommandError> {
    let parse_failure = || CommandError::ParseFailure(format!("expected H:M[:S], got {text:?}"));

    let parts: Vec<u8> = text
        .split(':')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| parse_failure())?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m] => (*h, *m, 0),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(parse_failure()),
    };

    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(CommandError::CommandOutOfRange(format!(
            "time {hours:02}:{minutes:02}:{seconds:02}"
        )));
    }
    Ok((hours, minutes, seconds))
}

/// Schedule writes carry both blocks, so neither may still be a placeholder.
fn require_known(slots: &[ScheduleSlot], what: &str) -> Result<(), CommandError> {
    if schedule::is_known(slots) {
        Ok(())
    } else {
        Err(CommandError::CommandOutOfRange(format!("{what} not yet known")))
    }
}

fn out_of_range<T: std::fmt::Display>(
    what: &str,
    value: T,
    range: std::ops::RangeInclusive<T>,
) -> CommandError {
    CommandError::CommandOutOfRange(format!(
        "{what} {value} not in {}..={}",
        range.start(),
        range.end()
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        bridge::tests::{MockLink, RecordingBus},
        config::{BridgeConfig, PersistedSettings},
        schedule::{PRIMARY_SLOTS, SECONDARY_SLOTS},
        state::ThermState,
    };

    fn bridge_with_state() -> Bridge {
        let mut bridge = Bridge::new(BridgeConfig::default(), PersistedSettings::default());
        bridge.state = ThermState {
            power: true,
            target_temp: 22.0,
            target_temp_min: 10.0,
            target_temp_max: 30.0,
            hysteresis: 1.0,
            floor_temp_max: 40,
            weekday: 5,
            hours: 19,
            minutes: 30,
            schedule: [ScheduleSlot::new(6, 0, 20.0); PRIMARY_SLOTS],
            schedule2: [ScheduleSlot::new(8, 0, 20.0); SECONDARY_SLOTS],
            ..ThermState::default()
        };
        bridge
    }

    fn run(
        bridge: &mut Bridge,
        topic: &str,
        payload: &str,
    ) -> (CommandOutcome, MockLink, RecordingBus) {
        let mut link = MockLink::default();
        let mut bus = RecordingBus::default();
        let outcome = bridge.handle_command(topic, payload, 10_000, &mut link, &mut bus);
        (outcome, link, bus)
    }

    fn acked(bus: &RecordingBus, topic: &str) -> bool {
        bus.sent == vec![(topic.to_string(), String::new(), true)]
    }

    #[test]
    fn target_temp_in_range_writes_one_frame() {
        let mut bridge = bridge_with_state();
        let (outcome, link, bus) = run(&mut bridge, TOPIC_CMD_TARGET_TEMP, "21.5");

        assert_eq!(outcome.error, None);
        assert!(outcome.written);
        assert_eq!(link.written.len(), 1);
        assert_eq!(link.written[0][5], 0x2B);
        assert_eq!(bridge.state.target_temp, 21.5);
        assert_eq!(bridge.last_command_ms, Some(10_000));
        assert!(acked(&bus, TOPIC_CMD_TARGET_TEMP));
    }

    #[test]
    fn target_temp_above_max_is_rejected_but_acked() {
        let mut bridge = bridge_with_state();
        let (outcome, link, bus) = run(&mut bridge, TOPIC_CMD_TARGET_TEMP, "35");

        assert!(matches!(outcome.error, Some(CommandError::CommandOutOfRange(_))));
        assert!(link.written.is_empty());
        assert_eq!(bridge.state.target_temp, 22.0);
        assert_eq!(bridge.last_command_ms, None);
        assert!(acked(&bus, TOPIC_CMD_TARGET_TEMP));
    }

    #[test]
    fn unchanged_value_is_not_written() {
        let mut bridge = bridge_with_state();
        let (outcome, link, bus) = run(&mut bridge, TOPIC_CMD_POWER, "on");

        assert_eq!(outcome, CommandOutcome::default());
        assert!(link.written.is_empty());
        assert!(acked(&bus, TOPIC_CMD_POWER));
    }

    #[test]
    fn empty_payload_is_not_acked() {
        let mut bridge = bridge_with_state();
        let (outcome, link, bus) = run(&mut bridge, TOPIC_CMD_POWER, " ");

        assert_eq!(outcome.error, Some(CommandError::EmptyPayload));
        assert!(link.written.is_empty());
        assert!(bus.sent.is_empty());
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut bridge = bridge_with_state();
        let payload = "1".repeat(MAX_COMMAND_PAYLOAD + 1);
        let (outcome, link, bus) = run(&mut bridge, TOPIC_CMD_POWER, &payload);

        assert_eq!(
            outcome.error,
            Some(CommandError::PayloadTooLarge {
                len: MAX_COMMAND_PAYLOAD + 1
            })
        );
        assert!(link.written.is_empty());
        assert!(acked(&bus, TOPIC_CMD_POWER));
    }

    #[test]
    fn booleans_accept_words() {
        let mut bridge = bridge_with_state();

        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_LOCKED, "TRUE");
        assert!(outcome.written);
        assert_eq!(link.written[0], command::set_power_lock(true, true));

        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_POWER, "maybe");
        assert!(matches!(outcome.error, Some(CommandError::ParseFailure(_))));
        assert!(bridge.state.power);
    }

    #[test]
    fn mode_commands_share_one_register() {
        let mut bridge = bridge_with_state();

        let (_, link, _) = run(&mut bridge, TOPIC_CMD_SENSOR, "1");
        assert_eq!(link.written[0], command::set_mode(false, 0, 1));

        let (_, link, _) = run(&mut bridge, TOPIC_CMD_LOOP_MODE, "2");
        assert_eq!(link.written[0], command::set_mode(false, 2, 1));

        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_SENSOR, "3");
        assert!(matches!(outcome.error, Some(CommandError::CommandOutOfRange(_))));
        assert!(link.written.is_empty());
    }

    #[test]
    fn advanced_parameters_are_validated() {
        let mut bridge = bridge_with_state();

        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_ADJ_TEMP, "-2.3");
        assert!(outcome.written);
        assert_eq!(bridge.state.adj_temp, -2.5);

        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_ADJ_TEMP, "9.5");
        assert!(outcome.error.is_some());

        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_HYSTERESIS, "0.2");
        assert!(outcome.error.is_some());
        assert_eq!(bridge.state.hysteresis, 1.0);

        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_FLOOR_TEMP_MAX, "45");
        assert!(outcome.written);
        assert_eq!(link.written[0], command::set_advanced(&bridge.state));
    }

    #[test]
    fn target_bounds_keep_their_order() {
        let mut bridge = bridge_with_state();

        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_TARGET_TEMP_MAX, "10");
        assert!(outcome.error.is_some());
        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_TARGET_TEMP_MAX, "46");
        assert!(outcome.error.is_some());
        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_TARGET_TEMP_MIN, "30");
        assert!(outcome.error.is_some());

        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_TARGET_TEMP_MAX, "35");
        assert!(outcome.written);
        assert_eq!(bridge.state.target_temp_max, 35.0);
    }

    #[test]
    fn time_and_weekday_write_the_clock() {
        let mut bridge = bridge_with_state();

        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_TIME, "7:05");
        assert!(outcome.written);
        assert_eq!(link.written[0], command::set_clock(7, 5, 0, 5));

        let (_, link, _) = run(&mut bridge, TOPIC_CMD_WEEKDAY, "1");
        assert_eq!(link.written[0], command::set_clock(7, 5, 0, 1));

        for bad in ["24:00", "7", "7:05:60", "a:b"] {
            let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_TIME, bad);
            assert!(outcome.error.is_some(), "{bad}");
            assert!(link.written.is_empty());
        }
    }

    #[test]
    fn schedule_is_all_or_nothing() {
        let mut bridge = bridge_with_state();

        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_SCHEDULE, "06:00 21;08:30 18.5");
        assert!(outcome.written);
        assert_eq!(bridge.state.schedule[0], ScheduleSlot::new(6, 0, 21.0));
        assert_eq!(bridge.state.schedule[1], ScheduleSlot::new(8, 30, 18.5));
        assert_eq!(
            link.written[0],
            command::set_schedule(&bridge.state.schedule, &bridge.state.schedule2)
        );

        let before = bridge.state.schedule;
        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_SCHEDULE, "07:00 21;09:00 40");
        assert!(outcome.error.is_some());
        assert!(link.written.is_empty());
        assert_eq!(bridge.state.schedule, before);

        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_SCHEDULE2, "22:00 17");
        assert!(outcome.written);
        assert_eq!(bridge.state.schedule2[0], ScheduleSlot::new(22, 0, 17.0));
        assert_eq!(link.written.len(), 1);
    }

    #[test]
    fn partial_schedule_needs_a_reported_schedule() {
        let mut bridge = bridge_with_state();
        bridge.state.schedule = ThermState::default().schedule;
        bridge.state.schedule2 = ThermState::default().schedule2;

        let (outcome, link, bus) = run(&mut bridge, TOPIC_CMD_SCHEDULE, "06:00 21");
        assert!(matches!(outcome.error, Some(CommandError::CommandOutOfRange(_))));
        assert!(link.written.is_empty());
        assert!(acked(&bus, TOPIC_CMD_SCHEDULE));
        assert_eq!(schedule::encode(&bridge.state.schedule), "");

        // A complete primary block is still held back by the unknown secondary.
        let full = "06:00 21;08:00 18;12:00 20;14:00 20;17:00 21;22:00 17";
        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_SCHEDULE, full);
        assert!(outcome.error.is_some());
        assert!(link.written.is_empty());

        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_SCHEDULE2, "08:00 20;23:00 16");
        assert!(outcome.error.is_some());

        // Once both blocks are known, every slot written is a real one.
        bridge.state.schedule2 = [ScheduleSlot::new(8, 0, 20.0); SECONDARY_SLOTS];
        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_SCHEDULE, full);
        assert!(outcome.written);
        let frame = &link.written[0];
        let values = &frame[7..frame.len() - 2];
        assert!(!values.contains(&0xFF));
        assert_eq!(
            schedule::encode(&bridge.state.schedule),
            "06:00 21.0;08:00 18.0;12:00 20.0;14:00 20.0;17:00 21.0;22:00 17.0"
        );
    }

    #[test]
    fn auto_adj_mode_changes_settings_only() {
        let mut bridge = bridge_with_state();
        let (outcome, link, bus) = run(&mut bridge, TOPIC_CMD_AUTO_ADJ_MODE, "2");

        assert!(outcome.settings_changed);
        assert!(!outcome.written);
        assert!(link.written.is_empty());
        assert_eq!(bridge.settings().auto_adj_mode, AutoAdjMode::HeatIndex);
        assert!(acked(&bus, TOPIC_CMD_AUTO_ADJ_MODE));

        let (outcome, _, _) = run(&mut bridge, TOPIC_CMD_AUTO_ADJ_MODE, "3");
        assert!(outcome.error.is_some());
    }

    #[test]
    fn raw_commands_need_debug_topics() {
        let mut bridge = bridge_with_state();
        let (outcome, link, bus) = run(&mut bridge, TOPIC_CMD_SEND_COMMAND, "01 03 00 00 00 01");
        assert!(matches!(outcome.error, Some(CommandError::UnknownTopic(_))));
        assert!(link.written.is_empty());
        assert!(acked(&bus, TOPIC_CMD_SEND_COMMAND));

        bridge.config.debug_topics = true;
        let (outcome, link, _) = run(&mut bridge, TOPIC_CMD_SEND_COMMAND, "01 03 00 00 00 01");
        assert!(outcome.written);
        assert_eq!(link.written[0], vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]);
    }

    #[test]
    fn unknown_topic_is_ignored() {
        let mut bridge = bridge_with_state();
        let (outcome, _, bus) = run(&mut bridge, "SetColour", "red");
        assert_eq!(outcome.error, Some(CommandError::UnknownTopic("SetColour".to_string())));
        assert!(bus.sent.is_empty());
    }
}
