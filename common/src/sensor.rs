use crate::{
    bridge::Bus,
    error::CommandError,
    topics::{
        TOPIC_SENSOR_ABS_HUMIDITY, TOPIC_SENSOR_HEAT_INDEX, TOPIC_SENSOR_HUMIDITY,
        TOPIC_SENSOR_TEMP, TOPIC_SENSOR_VALID,
    },
};

/// Readings older than this are ignored.
pub const AUX_VALIDITY_MS: u64 = 30_000;

/// Readings are republished at least this often, well inside the validity
/// window, even when they hold steady.
pub const REPORT_HEARTBEAT_MS: u64 = 10_000;

const TEMP_REPORT_DELTA: f32 = 0.55;
const HUMIDITY_REPORT_DELTA: f32 = 1.4;

/// Latest reading of the auxiliary temperature/humidity sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxSample {
    pub temperature: f32,
    pub humidity: f32,
    pub updated_ms: u64,
}

impl AuxSample {
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.updated_ms) < AUX_VALIDITY_MS
    }

    pub fn heat_index(&self) -> f32 {
        heat_index(self.temperature, self.humidity)
    }

    pub fn absolute_humidity(&self) -> f32 {
        absolute_humidity(self.temperature, self.humidity)
    }
}

/// NWS heat index (Steadman simple form, Rothfusz regression above 79°F), in °C.
pub fn heat_index(temp_c: f32, humidity: f32) -> f32 {
    let t = 1.8 * temp_c + 32.0;
    let rh = humidity;
    let mut hi = 0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094);

    if hi > 79.0 {
        hi = -42.379 + 2.049_015_2 * t + 10.143_331 * rh
            - 0.224_755_4 * t * rh
            - 0.006_837_83 * t * t
            - 0.054_817_17 * rh * rh
            + 0.001_228_74 * t * t * rh
            + 0.000_852_82 * t * rh * rh
            - 0.000_001_99 * t * t * rh * rh;

        if rh < 13.0 && (80.0..=112.0).contains(&t) {
            hi -= ((13.0 - rh) * 0.25) * ((17.0 - (t - 95.0).abs()) * 0.058_82).sqrt();
        } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
            hi += ((rh - 85.0) * 0.1) * ((87.0 - t) * 0.2);
        }
    }

    (hi - 32.0) / 1.8
}

/// Absolute humidity in g/m³.
pub fn absolute_humidity(temp_c: f32, humidity: f32) -> f32 {
    6.112 * ((17.67 * temp_c) / (temp_c + 243.5)).exp() * humidity * 2.1674 / (275.15 + temp_c)
}

/// Truncates to half a degree, matching how readings are shown on the bus.
fn truncate_half(value: f32) -> f32 {
    (value * 2.0).trunc() / 2.0
}

/// Publishes auxiliary sensor readings, skipping small fluctuations between
/// heartbeats.
#[derive(Debug, Clone, Default)]
pub struct AuxReporter {
    last_valid: Option<bool>,
    last_temperature: Option<f32>,
    last_humidity: Option<f32>,
    last_heartbeat_ms: Option<u64>,
}

impl AuxReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report<B>(&mut self, sample: Option<&AuxSample>, now_ms: u64, bus: &mut B)
    where
        B: Bus + ?Sized,
    {
        let fresh = sample.filter(|sample| sample.is_fresh(now_ms));
        let valid = fresh.is_some();
        let heartbeat = self
            .last_heartbeat_ms
            .map_or(true, |at| now_ms.saturating_sub(at) >= REPORT_HEARTBEAT_MS);
        if heartbeat {
            self.last_heartbeat_ms = Some(now_ms);
        }

        if (heartbeat || self.last_valid != Some(valid))
            && bus.publish(TOPIC_SENSOR_VALID, if valid { "1" } else { "0" }, true)
        {
            self.last_valid = Some(valid);
        }

        let Some(sample) = fresh else {
            return;
        };

        let mut derived = false;

        if heartbeat || exceeds(self.last_temperature, sample.temperature, TEMP_REPORT_DELTA) {
            derived = true;
            let payload = format!("{:.1}", truncate_half(sample.temperature));
            if bus.publish(TOPIC_SENSOR_TEMP, &payload, true) {
                self.last_temperature = Some(sample.temperature);
            }
        }

        if heartbeat || exceeds(self.last_humidity, sample.humidity, HUMIDITY_REPORT_DELTA) {
            derived = true;
            let payload = format!("{}", sample.humidity as i32);
            if bus.publish(TOPIC_SENSOR_HUMIDITY, &payload, true) {
                self.last_humidity = Some(sample.humidity);
            }
        }

        if derived {
            let heat_index = format!("{:.1}", truncate_half(sample.heat_index()));
            bus.publish(TOPIC_SENSOR_HEAT_INDEX, &heat_index, true);
            let absolute = format!("{:.1}", truncate_half(sample.absolute_humidity()));
            bus.publish(TOPIC_SENSOR_ABS_HUMIDITY, &absolute, true);
        }
    }
}

fn exceeds(previous: Option<f32>, current: f32, delta: f32) -> bool {
    previous.map_or(true, |previous| (current - previous).abs() > delta)
}

/// Auxiliary readings as received from the sensor topics.
///
/// Every reading, and every `TAHValid = 1`, counts as a sign of life.
#[derive(Debug, Clone, Default)]
pub struct AuxInputs {
    temperature: Option<f32>,
    humidity: Option<f32>,
    valid: bool,
    updated_ms: Option<u64>,
}

impl AuxInputs {
    /// Applies one message. Returns `Ok(false)` for topics that carry no input.
    pub fn apply(&mut self, topic: &str, payload: &str, now_ms: u64) -> Result<bool, CommandError> {
        let payload = payload.trim();
        let reading = || {
            payload
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    CommandError::ParseFailure(format!("bad {topic} reading {payload:?}"))
                })
        };

        match topic {
            TOPIC_SENSOR_TEMP => self.temperature = Some(reading()?),
            TOPIC_SENSOR_HUMIDITY => self.humidity = Some(reading()?),
            TOPIC_SENSOR_VALID => {
                self.valid = payload == "1";
                if !self.valid {
                    return Ok(true);
                }
            }
            _ => return Ok(false),
        }
        self.updated_ms = Some(now_ms);
        Ok(true)
    }

    pub fn sample(&self) -> Option<AuxSample> {
        if !self.valid {
            return None;
        }
        Some(AuxSample {
            temperature: self.temperature?,
            humidity: self.humidity?,
            updated_ms: self.updated_ms?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::tests::RecordingBus;

    #[test]
    fn heat_index_matches_air_temperature_in_mild_conditions() {
        // Below ~27°C the simple formula stays close to the dry-bulb value.
        let hi = heat_index(21.0, 50.0);
        assert!((hi - 20.6).abs() < 0.5, "heat index {hi}");
    }

    #[test]
    fn heat_index_rises_in_hot_humid_air() {
        let hi = heat_index(32.0, 70.0);
        assert!(hi > 38.0 && hi < 42.0, "heat index {hi}");
    }

    #[test]
    fn absolute_humidity_at_room_conditions() {
        let ah = absolute_humidity(20.0, 50.0);
        assert!((ah - 8.6).abs() < 0.2, "absolute humidity {ah}");
    }

    #[test]
    fn stale_samples_are_not_fresh() {
        let sample = AuxSample {
            temperature: 21.0,
            humidity: 40.0,
            updated_ms: 1_000,
        };
        assert!(sample.is_fresh(30_999));
        assert!(!sample.is_fresh(31_000));
    }

    #[test]
    fn reporter_skips_small_changes() {
        let mut reporter = AuxReporter::new();
        let mut bus = RecordingBus::default();
        let mut sample = AuxSample {
            temperature: 21.3,
            humidity: 40.0,
            updated_ms: 0,
        };

        reporter.report(Some(&sample), 10, &mut bus);
        assert_eq!(bus.payload_of(TOPIC_SENSOR_VALID), Some("1"));
        assert_eq!(bus.payload_of(TOPIC_SENSOR_TEMP), Some("21.0"));
        assert_eq!(bus.payload_of(TOPIC_SENSOR_HUMIDITY), Some("40"));
        assert!(bus.payload_of(TOPIC_SENSOR_HEAT_INDEX).is_some());
        let sent = bus.sent.len();

        sample.temperature = 21.6;
        sample.humidity = 41.0;
        reporter.report(Some(&sample), 20, &mut bus);
        assert_eq!(bus.sent.len(), sent);

        sample.temperature = 22.0;
        reporter.report(Some(&sample), 30, &mut bus);
        assert_eq!(bus.payload_of(TOPIC_SENSOR_TEMP), Some("22.0"));
    }

    #[test]
    fn reporter_flags_stale_sensor() {
        let mut reporter = AuxReporter::new();
        let mut bus = RecordingBus::default();
        let sample = AuxSample {
            temperature: 21.0,
            humidity: 40.0,
            updated_ms: 0,
        };

        reporter.report(Some(&sample), 40_000, &mut bus);
        assert_eq!(bus.sent.len(), 1);
        assert_eq!(bus.payload_of(TOPIC_SENSOR_VALID), Some("0"));
    }
    #[test]
    fn reporter_repeats_steady_readings() {
        let mut reporter = AuxReporter::new();
        let mut bus = RecordingBus::default();

        for at in (0..=40_000).step_by(5_000) {
            let sample = AuxSample {
                temperature: 23.0,
                humidity: 40.0,
                updated_ms: at,
            };
            reporter.report(Some(&sample), at, &mut bus);
        }

        let temps: Vec<_> = bus.sent.iter().filter(|(t, _, _)| t == TOPIC_SENSOR_TEMP).collect();
        assert_eq!(temps.len(), 5);
        assert!(temps.iter().all(|(_, payload, _)| payload == "23.0"));
        let valid = bus.sent.iter().filter(|(t, _, _)| t == TOPIC_SENSOR_VALID).count();
        assert_eq!(valid, 5);
    }

    #[test]
    fn inputs_collect_a_sample() {
        let mut inputs = AuxInputs::default();
        assert_eq!(inputs.apply(TOPIC_SENSOR_TEMP, "22.5", 100), Ok(true));
        assert_eq!(inputs.apply(TOPIC_SENSOR_HUMIDITY, " 41 ", 200), Ok(true));
        assert_eq!(inputs.sample(), None);

        assert_eq!(inputs.apply(TOPIC_SENSOR_VALID, "1", 300), Ok(true));
        assert_eq!(
            inputs.sample(),
            Some(AuxSample {
                temperature: 22.5,
                humidity: 41.0,
                updated_ms: 300,
            })
        );

        assert_eq!(inputs.apply(TOPIC_SENSOR_HEAT_INDEX, "22.0", 400), Ok(false));
        assert!(inputs.apply(TOPIC_SENSOR_TEMP, "warm", 500).is_err());
        assert_eq!(inputs.sample().map(|s| s.temperature), Some(22.5));

        assert_eq!(inputs.apply(TOPIC_SENSOR_VALID, "0", 600), Ok(true));
        assert_eq!(inputs.sample(), None);
    }
}
