use crate::{
    bridge::Bus,
    config::PersistedSettings,
    schedule,
    state::ThermState,
    topics::*,
};

/// A published value, compared against the shadow copy for change detection.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Text(String),
}

impl FieldValue {
    pub fn format(&self) -> String {
        match self {
            Self::Bool(value) => if *value { "1" } else { "0" }.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => format!("{value:.1}"),
            Self::Text(value) => value.clone(),
        }
    }
}

/// One row of the publish table.
pub struct FieldDescriptor {
    pub topic: &'static str,
    pub read: fn(&ThermState, &PersistedSettings) -> FieldValue,
    /// Changes of this field count as user interaction at the unit.
    pub activity: bool,
}

macro_rules! field {
    ($topic:expr, $variant:ident, |$s:ident| $value:expr) => {
        field!($topic, $variant, |$s| $value, false)
    };
    ($topic:expr, $variant:ident, |$s:ident| $value:expr, $activity:expr) => {
        FieldDescriptor {
            topic: $topic,
            read: |$s, _| FieldValue::$variant($value),
            activity: $activity,
        }
    };
}

pub static FIELDS: &[FieldDescriptor] = &[
    field!(TOPIC_LOCKED, Bool, |s| s.locked, true),
    field!(TOPIC_POWER, Bool, |s| s.power, true),
    field!(TOPIC_HEATING, Bool, |s| s.heating),
    field!(TOPIC_TARGET_SET_MANUALLY, Bool, |s| s.target_set_manually),
    field!(TOPIC_ROOM_TEMP, Float, |s| s.room_temp),
    field!(TOPIC_TARGET_TEMP, Float, |s| s.target_temp, true),
    field!(TOPIC_TARGET_TEMP_MAX, Float, |s| s.target_temp_max),
    field!(TOPIC_TARGET_TEMP_MIN, Float, |s| s.target_temp_min),
    field!(TOPIC_FLOOR_TEMP, Float, |s| s.floor_temp),
    field!(TOPIC_FLOOR_TEMP_MAX, Int, |s| i64::from(s.floor_temp_max)),
    field!(TOPIC_AUTO_MODE, Bool, |s| s.auto_mode, true),
    field!(TOPIC_LOOP_MODE, Int, |s| i64::from(s.loop_mode)),
    field!(TOPIC_SENSOR, Int, |s| i64::from(s.sensor)),
    field!(TOPIC_HYSTERESIS, Float, |s| s.hysteresis),
    field!(TOPIC_ADJ_TEMP, Float, |s| s.adj_temp),
    field!(TOPIC_ANTI_FROZE, Bool, |s| s.anti_froze),
    field!(TOPIC_POWER_ON_MEMORY, Bool, |s| s.power_on_memory),
    field!(TOPIC_WEEKDAY, Int, |s| i64::from(s.weekday)),
    field!(TOPIC_TIME, Text, |s| s.time_string()),
    field!(TOPIC_SCHEDULE, Text, |s| schedule::encode(&s.schedule)),
    field!(TOPIC_SCHEDULE2, Text, |s| schedule::encode(&s.schedule2)),
    FieldDescriptor {
        topic: TOPIC_AUTO_ADJ_MODE,
        read: |_, settings| FieldValue::Int(i64::from(settings.auto_adj_mode.code())),
        activity: false,
    },
];

/// Last value confirmed published for each row of [`FIELDS`]. `None` is unknown.
#[derive(Debug, Clone)]
pub struct ShadowState {
    values: Vec<Option<FieldValue>>,
}

impl Default for ShadowState {
    fn default() -> Self {
        Self {
            values: vec![None; FIELDS.len()],
        }
    }
}

impl ShadowState {
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|value| *value = None);
    }

    pub fn get(&self, topic: &str) -> Option<&FieldValue> {
        FIELDS
            .iter()
            .position(|field| field.topic == topic)
            .and_then(|index| self.values[index].as_ref())
    }
}

/// Inputs the publisher reads besides the state itself.
#[derive(Debug, Clone, Copy)]
pub struct PublishContext<'a> {
    pub settings: &'a PersistedSettings,
    pub last_status_ms: Option<u64>,
    pub last_command_ms: Option<u64>,
}

/// Sends changed fields, rate limited, and tracks user activity.
#[derive(Debug, Clone)]
pub struct StatePublisher {
    shadow: ShadowState,
    interval_ms: u64,
    activity_lock_ms: u64,
    last_publish_ms: Option<u64>,
    last_activity_ms: Option<u64>,
}

impl StatePublisher {
    pub fn new(interval_ms: u64, activity_lock_ms: u64) -> Self {
        Self {
            shadow: ShadowState::default(),
            interval_ms,
            activity_lock_ms,
            last_publish_ms: None,
            last_activity_ms: None,
        }
    }

    pub fn shadow(&self) -> &ShadowState {
        &self.shadow
    }

    /// Time of the last change made at the unit itself rather than by us.
    pub fn last_activity_ms(&self) -> Option<u64> {
        self.last_activity_ms
    }

    /// Forgets everything published, so the next pass republishes every field.
    pub fn reset(&mut self) {
        self.shadow.reset();
        self.last_publish_ms = None;
    }

    /// Publishes every field that differs from the shadow copy. Returns the
    /// number of messages sent.
    pub fn publish<B: Bus + ?Sized>(
        &mut self,
        now_ms: u64,
        state: &ThermState,
        ctx: PublishContext<'_>,
        bus: &mut B,
    ) -> usize {
        if ctx.last_status_ms.is_some() && self.rate_limited(now_ms) {
            return 0;
        }

        let own_echo = ctx
            .last_command_ms
            .is_some_and(|at| now_ms.saturating_sub(at) < self.activity_lock_ms);

        let mut sent = 0;
        for (field, shadow) in FIELDS.iter().zip(self.shadow.values.iter_mut()) {
            let value = (field.read)(state, ctx.settings);
            if shadow.as_ref() == Some(&value) {
                continue;
            }

            if !bus.publish(field.topic, &value.format(), true) {
                continue;
            }

            if field.activity && shadow.is_some() && !own_echo {
                self.last_activity_ms = Some(now_ms);
            }
            *shadow = Some(value);
            sent += 1;
        }

        if sent > 0 {
            self.last_publish_ms = Some(now_ms);
        }
        sent
    }

    fn rate_limited(&self, now_ms: u64) -> bool {
        self.last_publish_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.interval_ms)
    }
}
