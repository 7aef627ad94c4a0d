use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, Instant},
};

use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tracing::{info, warn};

use thermobridge_common::{AuxReporter, AuxSample, Bus, NetworkConfig};

const READ_INTERVAL: Duration = Duration::from_secs(5);

struct MqttBus<'a> {
    client: &'a AsyncClient,
    network: &'a NetworkConfig,
}

impl Bus for MqttBus<'_> {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool {
        match self.client.try_publish(
            self.network.topic(topic),
            QoS::AtLeastOnce,
            retain,
            payload.as_bytes().to_vec(),
        ) {
            Ok(()) => true,
            Err(err) => {
                warn!("sensor publish to {topic} failed: {err}");
                false
            }
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut network = NetworkConfig {
        client_id: "thermobridge-sensor".to_string(),
        ..NetworkConfig::default()
    };
    if let Ok(host) = std::env::var("MQTT_HOST") {
        network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT").ok().and_then(|v| v.parse().ok()) {
        network.mqtt_port = port;
    }
    if let Ok(prefix) = std::env::var("THERMOBRIDGE_TOPIC_PREFIX") {
        network.topic_prefix = prefix;
    }

    let mut mqtt_options =
        MqttOptions::new(network.client_id.clone(), network.mqtt_host.clone(), network.mqtt_port);

    if let Ok(user) = std::env::var("MQTT_USER") {
        let pass = std::env::var("MQTT_PASS").unwrap_or_default();
        mqtt_options.set_credentials(user, pass);
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);

    let connected = Arc::new(AtomicBool::new(false));
    let new_session = Arc::new(AtomicBool::new(false));
    {
        let connected = connected.clone();
        let new_session = new_session.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("sensor mqtt connected");
                        connected.store(true, Ordering::Relaxed);
                        new_session.store(true, Ordering::Relaxed);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        connected.store(false, Ordering::Relaxed);
                        warn!("sensor mqtt poll error: {err}");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    info!("sensor publisher started");

    let mut reporter = AuxReporter::new();
    let mut tick: u64 = 0;
    let mut interval = tokio::time::interval(READ_INTERVAL);

    loop {
        interval.tick().await;
        tick = tick.saturating_add(1);

        if !connected.load(Ordering::Relaxed) {
            continue;
        }
        if new_session.swap(false, Ordering::Relaxed) {
            reporter.reset();
        }

        // Simulated readings; a real sensor driver plugs in here.
        let sample = AuxSample {
            temperature: 21.0 + ((tick % 8) as f32 * 0.3),
            humidity: 42.0 + ((tick % 6) as f32 * 0.8),
            updated_ms: monotonic_ms(),
        };

        let mut bus = MqttBus {
            client: &mqtt,
            network: &network,
        };
        reporter.report(Some(&sample), monotonic_ms(), &mut bus);
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
