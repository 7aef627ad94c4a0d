//! Topic names relative to the configured prefix.

pub const TOPIC_LOCKED: &str = "Locked";
pub const TOPIC_POWER: &str = "Power";
pub const TOPIC_HEATING: &str = "Heating";
pub const TOPIC_TARGET_SET_MANUALLY: &str = "TargetSetManually";
pub const TOPIC_ROOM_TEMP: &str = "RoomTemp";
pub const TOPIC_TARGET_TEMP: &str = "TargetTemp";
pub const TOPIC_TARGET_TEMP_MAX: &str = "TargetTempMax";
pub const TOPIC_TARGET_TEMP_MIN: &str = "TargetTempMin";
pub const TOPIC_FLOOR_TEMP: &str = "FloorTemp";
pub const TOPIC_FLOOR_TEMP_MAX: &str = "FloorTempMax";
pub const TOPIC_AUTO_MODE: &str = "AutoMode";
pub const TOPIC_LOOP_MODE: &str = "LoopMode";
pub const TOPIC_SENSOR: &str = "Sensor";
pub const TOPIC_HYSTERESIS: &str = "Hysteresis";
pub const TOPIC_ADJ_TEMP: &str = "AdjTemp";
pub const TOPIC_ANTI_FROZE: &str = "AntiFroze";
pub const TOPIC_POWER_ON_MEMORY: &str = "PowerOnMemory";
pub const TOPIC_WEEKDAY: &str = "Weekday";
pub const TOPIC_TIME: &str = "Time";
pub const TOPIC_SCHEDULE: &str = "Schedule";
pub const TOPIC_SCHEDULE2: &str = "Schedule2";
pub const TOPIC_AUTO_ADJ_MODE: &str = "AutoAdjMode";
pub const TOPIC_LOG: &str = "Log";

pub const TOPIC_CMD_TARGET_TEMP: &str = "SetTargetTemp";
pub const TOPIC_CMD_POWER: &str = "SetPower";
pub const TOPIC_CMD_LOCKED: &str = "SetLocked";
pub const TOPIC_CMD_AUTO_MODE: &str = "SetAutoMode";
pub const TOPIC_CMD_LOOP_MODE: &str = "SetLoopMode";
pub const TOPIC_CMD_SENSOR: &str = "SetSensor";
pub const TOPIC_CMD_ADJ_TEMP: &str = "SetAdjTemp";
pub const TOPIC_CMD_FLOOR_TEMP_MAX: &str = "SetFloorTempMax";
pub const TOPIC_CMD_ANTI_FROZE: &str = "SetAntiFroze";
pub const TOPIC_CMD_WEEKDAY: &str = "SetWeekday";
pub const TOPIC_CMD_TIME: &str = "SetTime";
pub const TOPIC_CMD_SCHEDULE: &str = "SetSchedule";
pub const TOPIC_CMD_SCHEDULE2: &str = "SetSchedule2";
pub const TOPIC_CMD_AUTO_ADJ_MODE: &str = "SetAutoAdjMode";
pub const TOPIC_CMD_HYSTERESIS: &str = "SetHysteresis";
pub const TOPIC_CMD_TARGET_TEMP_MAX: &str = "SetTargetTempMax";
pub const TOPIC_CMD_TARGET_TEMP_MIN: &str = "SetTargetTempMin";
pub const TOPIC_CMD_POWER_ON_MEMORY: &str = "SetPowerOnMemory";
pub const TOPIC_CMD_SEND_COMMAND: &str = "SendCommand";

pub const TOPIC_SENSOR_TEMP: &str = "Sensors/Temperature";
pub const TOPIC_SENSOR_HUMIDITY: &str = "Sensors/Humidity";
pub const TOPIC_SENSOR_HEAT_INDEX: &str = "Sensors/HeatIndex";
pub const TOPIC_SENSOR_ABS_HUMIDITY: &str = "Sensors/AbsHumidity";
pub const TOPIC_SENSOR_VALID: &str = "Sensors/TAHValid";

/// Command topics the bridge subscribes to.
pub const COMMAND_TOPICS: [&str; 19] = [
    TOPIC_CMD_TARGET_TEMP,
    TOPIC_CMD_POWER,
    TOPIC_CMD_LOCKED,
    TOPIC_CMD_AUTO_MODE,
    TOPIC_CMD_LOOP_MODE,
    TOPIC_CMD_SENSOR,
    TOPIC_CMD_ADJ_TEMP,
    TOPIC_CMD_FLOOR_TEMP_MAX,
    TOPIC_CMD_ANTI_FROZE,
    TOPIC_CMD_WEEKDAY,
    TOPIC_CMD_TIME,
    TOPIC_CMD_SCHEDULE,
    TOPIC_CMD_SCHEDULE2,
    TOPIC_CMD_AUTO_ADJ_MODE,
    TOPIC_CMD_HYSTERESIS,
    TOPIC_CMD_TARGET_TEMP_MAX,
    TOPIC_CMD_TARGET_TEMP_MIN,
    TOPIC_CMD_POWER_ON_MEMORY,
    TOPIC_CMD_SEND_COMMAND,
];
