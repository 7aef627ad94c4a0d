use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{Offset, Utc};
use chrono_tz::Tz;
use rumqttc::{AsyncClient, ConnectionError, Event, Incoming, MqttOptions, QoS};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::{mpsc, Mutex},
};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use thermobridge_common::{
    AuxInputs, Bridge, Bus, CommandError, Link, LocalClock, NetworkConfig, RuntimeConfig,
    SerialConfig, TickContext, COMMAND_TOPICS, TOPIC_SENSOR_HUMIDITY, TOPIC_SENSOR_TEMP,
    TOPIC_SENSOR_VALID,
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const TICK_INTERVAL: Duration = Duration::from_millis(10);
const SERIAL_READ_CHUNK: usize = 256;

#[derive(Clone)]
struct AppState {
    core: Arc<Mutex<Core>>,
    network: Arc<NetworkConfig>,
    timezone: Arc<String>,
    network_up: Arc<AtomicBool>,
    mqtt_connected: Arc<AtomicBool>,
    mqtt: AsyncClient,
    store: AppStore,
}

/// Everything the control loop and the command path mutate together.
struct Core {
    bridge: Bridge,
    link: SerialLink,
    aux: AuxInputs,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

/// Serial port seen through the reader and writer tasks.
struct SerialLink {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Link for SerialLink {
    fn read_available(&mut self, buf: &mut Vec<u8>) {
        while let Ok(chunk) = self.rx.try_recv() {
            buf.extend_from_slice(&chunk);
        }
    }

    fn write(&mut self, frame: &[u8]) -> bool {
        self.tx.send(frame.to_vec()).is_ok()
    }
}

struct MqttBus<'a> {
    client: &'a AsyncClient,
    network: &'a NetworkConfig,
    connected: bool,
}

impl Bus for MqttBus<'_> {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool {
        if !self.connected {
            return false;
        }
        match self.client.try_publish(
            self.network.topic(topic),
            QoS::AtLeastOnce,
            retain,
            payload.as_bytes().to_vec(),
        ) {
            Ok(()) => true,
            Err(err) => {
                warn!("mqtt publish to {topic} failed: {err}");
                false
            }
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    apply_env_overrides(&mut runtime);

    if runtime.timezone.parse::<Tz>().is_err() {
        warn!("unknown timezone {:?}, clock sync disabled", runtime.timezone);
    }

    let link = open_serial(&runtime.serial)?;
    let bridge = Bridge::new(runtime.bridge.clone(), runtime.settings.clone());

    let network = runtime.network.clone();
    let mut mqtt_options =
        MqttOptions::new(network.client_id.clone(), network.mqtt_host.clone(), network.mqtt_port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    if !network.mqtt_user.is_empty() {
        mqtt_options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let app_state = AppState {
        core: Arc::new(Mutex::new(Core {
            bridge,
            link,
            aux: AuxInputs::default(),
        })),
        network: Arc::new(network),
        timezone: Arc::new(runtime.timezone),
        network_up: Arc::new(AtomicBool::new(false)),
        mqtt_connected: Arc::new(AtomicBool::new(false)),
        mqtt,
        store,
    };

    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_control_loop(app_state.clone());

    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .with_state(app_state);

    let port = std::env::var("THERMOBRIDGE_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status server at {addr}"))?;

    info!("status server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn apply_env_overrides(runtime: &mut RuntimeConfig) {
    let network = &mut runtime.network;
    if let Ok(host) = std::env::var("MQTT_HOST") {
        network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT").ok().and_then(|v| v.parse().ok()) {
        network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        network.mqtt_user = user;
    }
    if let Ok(pass) = std::env::var("MQTT_PASS") {
        network.mqtt_pass = pass;
    }
    if let Ok(prefix) = std::env::var("THERMOBRIDGE_TOPIC_PREFIX") {
        network.topic_prefix = prefix;
    }
    if let Ok(port) = std::env::var("THERMOBRIDGE_SERIAL") {
        runtime.serial.port = port;
    }
    if let Some(baud) = std::env::var("THERMOBRIDGE_BAUD").ok().and_then(|v| v.parse().ok()) {
        runtime.serial.baud_rate = baud;
    }
    if let Ok(tz) = std::env::var("THERMOBRIDGE_TZ") {
        runtime.timezone = tz;
    }
    if std::env::var("THERMOBRIDGE_DEBUG").is_ok_and(|v| v == "1" || v == "true") {
        runtime.bridge.debug_topics = true;
    }
}

/// Opens the port and moves its I/O onto a reader and a writer task.
fn open_serial(config: &SerialConfig) -> anyhow::Result<SerialLink> {
    let stream = tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .with_context(|| format!("failed to open serial port {}", config.port))?;
    info!(port = %config.port, baud = config.baud_rate, "serial port opened");

    let (mut reader, mut writer) = tokio::io::split(stream);
    let (rx_tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (tx, mut tx_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        let mut buf = [0u8; SERIAL_READ_CHUNK];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    warn!("serial port closed");
                    break;
                }
                Ok(n) => {
                    if rx_tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!("serial read error: {err}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(frame) = tx_rx.recv().await {
            if let Err(err) = writer.write_all(&frame).await {
                warn!("serial write error: {err}");
                continue;
            }
            if let Err(err) = writer.flush().await {
                warn!("serial flush error: {err}");
            }
        }
    });

    Ok(SerialLink { rx, tx })
}

fn subscribe_topics(mqtt: &AsyncClient, network: &NetworkConfig) -> anyhow::Result<()> {
    let topics = COMMAND_TOPICS
        .iter()
        .chain(&[TOPIC_SENSOR_TEMP, TOPIC_SENSOR_HUMIDITY, TOPIC_SENSOR_VALID]);

    for topic in topics {
        mqtt.try_subscribe(network.topic(topic), QoS::AtMostOnce)?;
    }
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, message.topic, message.payload.to_vec())
                            .await
                    {
                        warn!("mqtt message handling error: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                    app_state.network_up.store(true, Ordering::Relaxed);
                    app_state.mqtt_connected.store(true, Ordering::Relaxed);
                    if let Err(err) = subscribe_topics(&app_state.mqtt, &app_state.network) {
                        warn!("mqtt subscribe failed: {err:#}");
                    }
                    app_state.core.lock().await.bridge.on_bus_connected();
                }
                Ok(_) => {}
                Err(err) => {
                    app_state.mqtt_connected.store(false, Ordering::Relaxed);
                    if matches!(err, ConnectionError::Io(_)) {
                        app_state.network_up.store(false, Ordering::Relaxed);
                    }
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

fn spawn_control_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let now_ms = monotonic_ms();

            let local_clock =
                now_in_timezone(&app_state.timezone).map(|now| LocalClock::from_datetime(&now));
            let bus_connected = app_state.mqtt_connected.load(Ordering::Relaxed);

            let mut core = app_state.core.lock().await;
            let ctx = TickContext {
                network_enabled: !app_state.network.mqtt_host.is_empty(),
                network_connected: app_state.network_up.load(Ordering::Relaxed),
                bus_connected,
                local_clock,
                aux: core.aux.sample(),
            };
            let mut bus = MqttBus {
                client: &app_state.mqtt,
                network: &app_state.network,
                connected: bus_connected,
            };

            let Core { bridge, link, .. } = &mut *core;
            bridge.tick(now_ms, &ctx, link, &mut bus);
        }
    });
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: String,
    payload: Vec<u8>,
) -> anyhow::Result<()> {
    let Some(name) = app_state.network.strip_prefix(&topic) else {
        return Ok(());
    };

    if COMMAND_TOPICS.contains(&name) {
        return handle_command(app_state, name, &payload).await;
    }

    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    let text = String::from_utf8_lossy(&payload);
    let now_ms = monotonic_ms();
    let mut core = app_state.core.lock().await;
    core.aux
        .apply(name, &text, now_ms)
        .with_context(|| format!("invalid sensor input on {topic}"))?;
    Ok(())
}

async fn handle_command(app_state: &AppState, name: &str, payload: &[u8]) -> anyhow::Result<()> {
    let text = String::from_utf8_lossy(payload);
    let now_ms = monotonic_ms();

    let (outcome, settings) = {
        let mut core = app_state.core.lock().await;
        let mut bus = MqttBus {
            client: &app_state.mqtt,
            network: &app_state.network,
            connected: app_state.mqtt_connected.load(Ordering::Relaxed),
        };
        let Core { bridge, link, .. } = &mut *core;
        let outcome = bridge.handle_command(name, &text, now_ms, link, &mut bus);
        (outcome, bridge.settings().clone())
    };

    match &outcome.error {
        None => {}
        Some(CommandError::EmptyPayload) => debug!(topic = name, "command cleared"),
        Some(err) => warn!(topic = name, "command rejected: {err}"),
    }

    if outcome.settings_changed {
        let mut runtime = app_state.store.load_runtime_config().await?;
        runtime.settings = settings;
        app_state
            .store
            .save_runtime_config(&runtime)
            .await
            .context("failed to persist settings")?;
        info!("settings persisted");
    }
    Ok(())
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let now_ms = monotonic_ms();
    let status = state.core.lock().await.bridge.status(now_ms);
    Json(status)
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("THERMOBRIDGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.thermobridge"));

        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_runtime_config(&self, runtime: &RuntimeConfig) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.runtime_path.as_ref().clone();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(runtime)?;
        tokio::fs::write(path, payload).await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

fn now_in_timezone(timezone: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    let tz: Tz = timezone.parse().ok()?;
    let local = Utc::now().with_timezone(&tz);
    Some(local.with_timezone(&local.offset().fix()))
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
