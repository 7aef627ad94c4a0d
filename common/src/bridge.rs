use tracing::{debug, info, trace, warn};

use crate::{
    command::{self, describe_frame, IndicatorMode},
    config::{BridgeConfig, PersistedSettings},
    error::FrameError,
    frame::{FrameAssembler, MIN_FRAME_LEN},
    publisher::{PublishContext, StatePublisher},
    schedule::{round_half, LocalClock},
    sensor::AuxSample,
    state::{ThermState, SENSOR_EXTERNAL},
    status::decode_status,
    topics::TOPIC_LOG,
    types::{AutoAdjMode, BridgeStatus},
};

/// Auto-adjust ignores differences up to this many degrees.
pub const AUTO_ADJ_THRESHOLD: f32 = 0.75;
/// Largest correction the unit accepts, in degrees either way.
pub const ADJ_TEMP_LIMIT: f32 = 9.0;

/// Serial side of the bridge. Both calls must return without blocking.
pub trait Link {
    /// Appends every byte received since the last call to `buf`.
    fn read_available(&mut self, buf: &mut Vec<u8>);
    fn write(&mut self, frame: &[u8]) -> bool;
}

/// Message bus side of the bridge. Topics are relative to the host's prefix.
pub trait Bus {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool;
}

/// Host facts sampled once per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickContext {
    pub network_enabled: bool,
    pub network_connected: bool,
    pub bus_connected: bool,
    pub local_clock: Option<LocalClock>,
    pub aux: Option<AuxSample>,
}

/// Protocol bridge between one thermostat unit and the message bus.
///
/// Driven by [`Bridge::tick`] with an injected monotonic clock; it never
/// blocks and never reads time on its own.
#[derive(Debug, Clone)]
pub struct Bridge {
    pub(crate) config: BridgeConfig,
    pub(crate) settings: PersistedSettings,
    pub(crate) state: ThermState,

    assembler: FrameAssembler,
    publisher: StatePublisher,
    rx: Vec<u8>,

    pub(crate) last_status_ms: Option<u64>,
    pub(crate) last_command_ms: Option<u64>,
    last_link_activity_ms: Option<u64>,
    last_maintenance_ms: Option<u64>,
    last_poll_ms: Option<u64>,
    /// When `state`'s clock fields were last known to match the unit.
    pub(crate) clock_at_ms: Option<u64>,

    indicator: Option<IndicatorMode>,
    frames_accepted: u64,
    frames_rejected: u64,
}

impl Bridge {
    pub fn new(mut config: BridgeConfig, settings: PersistedSettings) -> Self {
        config.sanitize();
        Self {
            assembler: FrameAssembler::new(config.frame_silence_ms),
            publisher: StatePublisher::new(config.publish_interval_ms, config.activity_lock_ms),
            config,
            settings,
            state: ThermState::default(),
            rx: Vec::new(),
            last_status_ms: None,
            last_command_ms: None,
            last_link_activity_ms: None,
            last_maintenance_ms: None,
            last_poll_ms: None,
            clock_at_ms: None,
            indicator: None,
            frames_accepted: 0,
            frames_rejected: 0,
        }
    }

    pub fn settings(&self) -> &PersistedSettings {
        &self.settings
    }

    pub fn state(&self) -> &ThermState {
        &self.state
    }

    pub fn has_status(&self) -> bool {
        self.last_status_ms.is_some()
    }

    /// One cooperative pass: flush a silent frame, drain the link, then
    /// either run maintenance or publish state changes.
    pub fn tick<L, B>(&mut self, now_ms: u64, ctx: &TickContext, link: &mut L, bus: &mut B)
    where
        L: Link + ?Sized,
        B: Bus + ?Sized,
    {
        if let Some(frame) = self.assembler.poll(now_ms) {
            self.on_frame(&frame, now_ms, ctx, link, bus);
        }

        let mut rx = std::mem::take(&mut self.rx);
        rx.clear();
        link.read_available(&mut rx);
        if !rx.is_empty() {
            self.last_link_activity_ms = Some(now_ms);
        }
        for &byte in &rx {
            if let Some(frame) = self.assembler.push(byte, now_ms) {
                self.on_frame(&frame, now_ms, ctx, link, bus);
            }
        }
        self.rx = rx;

        if self.link_quiet(now_ms) && self.maintenance_due(now_ms) {
            self.maintain(now_ms, ctx, link);
        } else {
            let publish_ctx = PublishContext {
                settings: &self.settings,
                last_status_ms: self.last_status_ms,
                last_command_ms: self.last_command_ms,
            };
            let sent = self.publisher.publish(now_ms, &self.state, publish_ctx, bus);
            if sent > 0 {
                trace!(sent, "published state changes");
            }
        }
    }

    /// Bus (re)connected: everything must be republished.
    pub fn on_bus_connected(&mut self) {
        info!("bus connected, republishing state");
        self.publisher.reset();
    }

    pub fn status(&self, now_ms: u64) -> BridgeStatus {
        let age = |at: Option<u64>| at.map(|at| now_ms.saturating_sub(at));
        BridgeStatus {
            state: self.state.clone(),
            auto_adj_mode: self.settings.auto_adj_mode,
            indicator: self.indicator,
            status_age_ms: age(self.last_status_ms),
            last_activity_age_ms: age(self.publisher.last_activity_ms()),
            frames_accepted: self.frames_accepted,
            frames_rejected: self.frames_rejected,
        }
    }

    /// Writes a frame and holds off maintenance until the reply window passes.
    pub(crate) fn send<L>(&mut self, frame: &[u8], now_ms: u64, link: &mut L) -> bool
    where
        L: Link + ?Sized,
    {
        let ok = link.write(frame);
        self.last_link_activity_ms = Some(now_ms);
        if ok {
            debug!(frame = %describe_frame(frame), "> link");
        } else {
            warn!(len = frame.len(), "link write failed");
        }
        ok
    }

    fn link_quiet(&self, now_ms: u64) -> bool {
        self.assembler.pending_since().is_none()
            && self
                .last_link_activity_ms
                .map_or(true, |at| now_ms.saturating_sub(at) >= self.config.quiet_ms)
    }

    fn maintenance_due(&self, now_ms: u64) -> bool {
        self.last_maintenance_ms
            .map_or(true, |at| now_ms.saturating_sub(at) >= self.config.quiet_ms)
    }

    /// At most one protocol write per pass, clock sync first. The indicator
    /// is refreshed regardless.
    fn maintain<L: Link + ?Sized>(&mut self, now_ms: u64, ctx: &TickContext, link: &mut L) {
        self.last_maintenance_ms = Some(now_ms);

        if !self.sync_clock(now_ms, ctx, link) {
            self.poll_status(now_ms, link);
        }
        self.refresh_indicator(now_ms, ctx, link);
    }

    fn sync_clock<L>(&mut self, now_ms: u64, ctx: &TickContext, link: &mut L) -> bool
    where
        L: Link + ?Sized,
    {
        let (Some(local), Some(clock_at)) = (ctx.local_clock, self.clock_at_ms) else {
            return false;
        };
        if !ctx.bus_connected {
            return false;
        }

        let device = LocalClock {
            weekday: self.state.weekday,
            hours: self.state.hours,
            minutes: self.state.minutes,
            seconds: self.state.seconds,
        }
        .advanced_by(now_ms.saturating_sub(clock_at) / 1_000);

        let drift = device.drift_seconds(&local);
        if drift <= self.config.clock_drift_tolerance_s {
            return false;
        }

        info!(
            drift,
            weekday = local.weekday,
            hours = local.hours,
            minutes = local.minutes,
            "syncing unit clock"
        );
        let frame = command::set_clock(local.hours, local.minutes, local.seconds, local.weekday);
        self.send(&frame, now_ms, link);

        self.state.weekday = local.weekday;
        self.state.hours = local.hours;
        self.state.minutes = local.minutes;
        self.state.seconds = local.seconds;
        self.clock_at_ms = Some(now_ms);
        true
    }

    fn poll_status<L: Link + ?Sized>(&mut self, now_ms: u64, link: &mut L) {
        let due = self
            .last_poll_ms
            .map_or(true, |at| now_ms.saturating_sub(at) >= self.config.poll_interval_ms);
        if due {
            self.last_poll_ms = Some(now_ms);
            self.send(&command::query_status(), now_ms, link);
        }
    }

    fn refresh_indicator<L>(&mut self, now_ms: u64, ctx: &TickContext, link: &mut L)
    where
        L: Link + ?Sized,
    {
        let mode = IndicatorMode::for_connectivity(
            ctx.network_enabled,
            ctx.network_connected,
            ctx.bus_connected,
        );
        if self.indicator == Some(mode) {
            return;
        }

        debug!(?mode, "updating indicator");
        if self.send(&command::indicator(mode), now_ms, link) {
            self.indicator = Some(mode);
        }
    }

    fn on_frame<L, B>(
        &mut self,
        frame: &[u8],
        now_ms: u64,
        ctx: &TickContext,
        link: &mut L,
        bus: &mut B,
    ) where
        L: Link + ?Sized,
        B: Bus + ?Sized,
    {
        let result = if frame.len() < MIN_FRAME_LEN {
            Err(FrameError::FrameTooShort { len: frame.len() })
        } else {
            decode_status(frame, &mut self.state, self.config.crc_check)
        };

        if self.config.debug_topics {
            let line = match &result {
                Ok(_) => format!("< {}", describe_frame(frame)),
                Err(err) => format!("< {} {err}", describe_frame(frame)),
            };
            bus.publish(TOPIC_LOG, &line, false);
        }

        match result {
            Ok(report) => {
                self.frames_accepted += 1;
                self.last_status_ms = Some(now_ms);
                if report.has_clock {
                    self.clock_at_ms = Some(now_ms);
                }
                trace!(
                    room = self.state.room_temp,
                    target = self.state.target_temp,
                    heating = self.state.heating,
                    "status accepted"
                );
                self.auto_adjust(now_ms, ctx, link);
            }
            Err(err) => {
                self.frames_rejected += 1;
                match err {
                    FrameError::ChecksumMismatch { .. } => {
                        warn!(frame = %describe_frame(frame), "dropping frame: {err}");
                    }
                    // Write acknowledgements and other traffic on the line.
                    FrameError::SignatureMismatch { .. } | FrameError::RangeViolation(_) => {
                        debug!(frame = %describe_frame(frame), "ignoring frame: {err}");
                    }
                    FrameError::FrameTooShort { len } => trace!(len, "dropping runt frame"),
                }
            }
        }
    }

    /// Nudges the unit's correction so its room reading follows the
    /// auxiliary sensor.
    fn auto_adjust<L: Link + ?Sized>(&mut self, now_ms: u64, ctx: &TickContext, link: &mut L) {
        if self.state.sensor != SENSOR_EXTERNAL {
            return;
        }
        let Some(sample) = ctx.aux.filter(|sample| sample.is_fresh(now_ms)) else {
            return;
        };
        let reference = match self.settings.auto_adj_mode {
            AutoAdjMode::Off => return,
            AutoAdjMode::Temperature => sample.temperature,
            AutoAdjMode::HeatIndex => sample.heat_index(),
        };

        let delta = reference - self.state.room_temp;
        if delta.abs() <= AUTO_ADJ_THRESHOLD {
            return;
        }

        let adj = round_half(self.state.adj_temp + delta).clamp(-ADJ_TEMP_LIMIT, ADJ_TEMP_LIMIT);
        if adj == self.state.adj_temp {
            return;
        }

        info!(
            from = self.state.adj_temp,
            to = adj,
            reference,
            room = self.state.room_temp,
            "auto-adjusting correction"
        );
        self.state.adj_temp = adj;
        self.send(&command::set_advanced(&self.state), now_ms, link);
    }
}
