use serde::{Deserialize, Serialize};

use crate::{crc::CrcCheck, types::AutoAdjMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub frame_silence_ms: u64,
    pub quiet_ms: u64,
    pub poll_interval_ms: u64,
    pub publish_interval_ms: u64,
    pub activity_lock_ms: u64,
    pub clock_drift_tolerance_s: i64,
    pub crc_check: CrcCheck,
    pub debug_topics: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            frame_silence_ms: 100,
            quiet_ms: 500,
            poll_interval_ms: 4_000,
            publish_interval_ms: 500,
            activity_lock_ms: 5_000,
            clock_drift_tolerance_s: 20,
            crc_check: CrcCheck::Strict,
            debug_topics: false,
        }
    }
}

impl BridgeConfig {
    pub fn sanitize(&mut self) {
        self.frame_silence_ms = self.frame_silence_ms.clamp(10, 2_000);
        self.quiet_ms = self.quiet_ms.clamp(self.frame_silence_ms, 10_000);
        self.poll_interval_ms = self.poll_interval_ms.clamp(1_000, 60_000);
        self.publish_interval_ms = self.publish_interval_ms.min(10_000);
        self.clock_drift_tolerance_s = self.clock_drift_tolerance_s.clamp(1, 3_600);
    }
}

/// The one record the bridge persists across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    #[serde(default)]
    pub auto_adj_mode: AutoAdjMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9_600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub client_id: String,
    pub topic_prefix: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "192.168.1.100".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            client_id: "thermobridge".to_string(),
            topic_prefix: "thermostat".to_string(),
        }
    }
}

impl NetworkConfig {
    /// Full topic name for a prefix-relative one.
    pub fn topic(&self, name: &str) -> String {
        let prefix = self.topic_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    }

    /// Prefix-relative name of a full topic, if it lives under the prefix.
    pub fn strip_prefix<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let prefix = self.topic_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return Some(topic);
        }
        topic.strip_prefix(prefix)?.strip_prefix('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub settings: PersistedSettings,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            settings: PersistedSettings::default(),
            serial: SerialConfig::default(),
            network: NetworkConfig::default(),
            timezone: default_timezone(),
        }
    }
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let runtime: RuntimeConfig =
            serde_json::from_str(r#"{"bridge":{"crc_check":"lenient"},"timezone":"UTC"}"#).unwrap();

        assert_eq!(runtime.bridge.crc_check, CrcCheck::Lenient);
        assert_eq!(runtime.bridge.poll_interval_ms, 4_000);
        assert_eq!(runtime.settings.auto_adj_mode, AutoAdjMode::Off);
        assert_eq!(runtime.serial.baud_rate, 9_600);
        assert_eq!(runtime.timezone, "UTC");
    }

    #[test]
    fn empty_store_uses_default_timezone() {
        assert_eq!(RuntimeConfig::default().timezone, "Europe/Moscow");
        let runtime: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(runtime.timezone, "Europe/Moscow");
        assert_eq!(runtime.network.topic_prefix, "thermostat");
    }

    #[test]
    fn sanitize_clamps_timing() {
        let mut config = BridgeConfig {
            frame_silence_ms: 0,
            quiet_ms: 1,
            poll_interval_ms: 10,
            ..BridgeConfig::default()
        };
        config.sanitize();

        assert_eq!(config.frame_silence_ms, 10);
        assert_eq!(config.quiet_ms, 10);
        assert_eq!(config.poll_interval_ms, 1_000);
    }

    #[test]
    fn topics_are_joined_and_stripped() {
        let network = NetworkConfig::default();
        assert_eq!(network.topic("SetPower"), "thermostat/SetPower");
        assert_eq!(network.strip_prefix("thermostat/SetPower"), Some("SetPower"));
        assert_eq!(network.strip_prefix("other/SetPower"), None);
        assert_eq!(network.strip_prefix("thermostatSetPower"), None);
    }
}
