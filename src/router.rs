//! Main dispatch loop (spec §2 item 7, §4.8): the router's single OS
//! thread, ticking at >=1 kHz, driving every other component in strict
//! priority order each iteration.
//!
//! Video/audio capture and the FEC-aware video-tx processor are out of
//! scope (spec §1 Non-goals); `VideoSource`/`VideoTxProcessor`/
//! `AudioSource` are trait seams with no-op defaults so the loop's
//! *scheduling* — the actually-specified behavior — is fully exercised
//! without a camera attached, the same way the teacher keeps transport
//! behind `NetworkProvider` so `node.rs` logic is testable without real
//! hardware.

use crate::alarms::{AlarmKind, AlarmLimiter};
use crate::consts::*;
use crate::ipc::{self, IpcChannel};
use crate::model::{RelayMode, VehicleModel};
use crate::packet::payload::{InterfaceBackAnnotation, TelemetryExtendedV3};
use crate::packet::{Packet, PacketComponent, PacketHeader, PacketType};
use crate::persistence::AlarmFlags;
use crate::queue::PacketQueue;
use crate::radio::hal::RadioHal;
use crate::radio::stats::RouterStats;
use crate::reinit::{CommandExecutor, Heartbeat, RadioReinitializer, ReinitOutcome};
use crate::rx::RxThreadHandle;
use crate::sik::{SikState, TickOutcome as SikTickOutcome};
use std::io::Read;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait VideoSource: Send {
    fn read_chunk(&mut self) -> Option<Vec<u8>> {
        None
    }
    fn periodic(&mut self) {}
}

pub trait VideoTxProcessor: Send {
    fn ingest(&mut self, _chunk: Vec<u8>) {}
    fn take_ready_frames(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }
    fn current_bitrate_bps(&self) -> u32 {
        0
    }
    fn periodic(&mut self) {}
}

pub trait AudioSource: Send {
    fn read_chunk(&mut self) -> Option<Vec<u8>> {
        None
    }
    fn current_bitrate_bps(&self) -> u32 {
        0
    }
}

#[derive(Default)]
pub struct NoopVideoSource;
impl VideoSource for NoopVideoSource {}

#[derive(Default)]
pub struct NoopVideoTxProcessor;
impl VideoTxProcessor for NoopVideoTxProcessor {}

#[derive(Default)]
pub struct NoopAudioSource;
impl AudioSource for NoopAudioSource {}

fn alarm_kind_as_u8(kind: AlarmKind) -> u8 {
    match kind {
        AlarmKind::ReceivedInvalidRadioPacket => 0,
        AlarmKind::VehicleRxTimeout => 1,
        AlarmKind::CpuLoopOverload => 2,
        AlarmKind::LinkToControllerLost => 3,
        AlarmKind::SikReconfigureFailed => 4,
        AlarmKind::RadioReinitStarted => 5,
        AlarmKind::RadioReinitFailed => 6,
    }
}

fn alarm_packet(vehicle_id: u32, kind: AlarmKind, magnitude: u32) -> Packet {
    let mut header = PacketHeader::new(PacketComponent::LocalControl, PacketType::Alarm, 0);
    header.vehicle_id_src = vehicle_id;
    let mut payload = Vec::with_capacity(5);
    payload.push(alarm_kind_as_u8(kind));
    payload.extend_from_slice(&magnitude.to_le_bytes());
    Packet::new(header, payload)
}

/// Everything the dispatch loop needs that outlives a single `tick`
/// call: model, stats, queues, and the two lifecycle controllers.
pub struct Router<H: RadioHal> {
    pub hal: H,
    pub model: VehicleModel,
    pub stats: Arc<RouterStats>,
    pub rx: RxThreadHandle,
    pub radio_out: PacketQueue,
    pub control: PacketQueue,
    pub sik: SikState,
    pub sik_interfaces: Vec<usize>,
    /// Interface id each `rx.health` slot corresponds to (same order
    /// the Rx thread was spawned with).
    rx_interface_ids: Vec<usize>,
    alarms: AlarmLimiter,
    alarm_flags: AlarmFlags,
    video_source: Box<dyn VideoSource>,
    video_tx: Box<dyn VideoTxProcessor>,
    audio_source: Box<dyn AudioSource>,
    iteration: u64,
    last_controller_rx: Instant,
    link_lost_alarmed: bool,
    last_ipc_drain: Instant,
    last_housekeeping: Instant,
    last_radio_flags_change: Instant,
    consecutive_overflows: u32,
}

impl<H: RadioHal> Router<H> {
    pub fn new(hal: H, model: VehicleModel, rx: RxThreadHandle, rx_interface_ids: Vec<usize>) -> Self {
        let now = Instant::now();
        let sik_interfaces = (0..hal.count())
            .filter_map(|id| hal.info(id))
            .filter(|info| info.is_sik())
            .map(|info| info.id)
            .collect();
        let stats = Arc::new(RouterStats::new(model.vehicle_id));
        Self {
            hal,
            model,
            stats,
            rx,
            radio_out: PacketQueue::new(PACKET_QUEUE_CAPACITY),
            control: PacketQueue::new(PACKET_QUEUE_CAPACITY),
            sik: SikState::new(),
            sik_interfaces,
            rx_interface_ids,
            alarms: AlarmLimiter::new(),
            alarm_flags: AlarmFlags::new(crate::persistence::default_flags_dir()),
            video_source: Box::new(NoopVideoSource),
            video_tx: Box::new(NoopVideoTxProcessor),
            audio_source: Box::new(NoopAudioSource),
            iteration: 0,
            last_controller_rx: now,
            link_lost_alarmed: false,
            last_ipc_drain: now,
            last_housekeeping: now,
            last_radio_flags_change: now - Duration::from_millis(RADIO_FLAGS_CHANGE_GRACE_MS + 1),
            consecutive_overflows: 0,
        }
    }

    /// Publishes the cold-start announcements exercised by spec §8
    /// Scenario 1: a `RadioConfigUpdated` reflecting the model the
    /// router came up with, followed by a `RouterReady` broadcast to
    /// telemetry peers. Call once, after the radio interfaces implied
    /// by the model have been opened.
    pub fn announce_startup(&mut self) {
        let ack = crate::packet::payload::RadioConfigUpdated::from_model(&self.model);
        let header = PacketHeader::new(PacketComponent::LocalControl, PacketType::RadioConfigUpdated, 0);
        self.radio_out.push(Packet::new(header, ack.to_bytes()));

        let header = PacketHeader::new(PacketComponent::Telemetry, PacketType::RouterReady, 0);
        self.radio_out.push(Packet::new(header, Vec::new()));
    }

    pub fn with_video(mut self, source: Box<dyn VideoSource>, tx: Box<dyn VideoTxProcessor>) -> Self {
        self.video_source = source;
        self.video_tx = tx;
        self
    }

    pub fn with_audio(mut self, source: Box<dyn AudioSource>) -> Self {
        self.audio_source = source;
        self
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Run every phase of spec §4.8 once, in strict priority order.
    pub fn tick<R, X>(&mut self, ipc_channels: &mut [IpcChannel<R>], executor: &mut X, heartbeat: &Heartbeat)
    where
        R: Read,
        X: CommandExecutor,
    {
        let iteration_start = Instant::now();
        self.iteration += 1;

        // Phase 1: ingest high-priority Rx, phase 3 handles the rest.
        let batch = self.rx.ring.drain(RX_DRAIN_PER_TICK);
        let mut pending_low_priority = Vec::with_capacity(batch.len());
        for tp in batch {
            self.last_controller_rx = Instant::now();
            self.link_lost_alarmed = false;
            if tp.packet.is_high_priority() {
                self.handle_inbound(tp.packet);
            } else {
                pending_low_priority.push(tp.packet);
            }
        }

        // Phase 2: video capture pull and transmit.
        if let Some(chunk) = self.video_source.read_chunk() {
            self.video_tx.ingest(chunk);
        }
        for frame in self.video_tx.take_ready_frames() {
            let header = PacketHeader::new(PacketComponent::Video, PacketType::VideoData, 0);
            self.radio_out.push(Packet::new(header, frame));
        }

        // Phase 3: process remaining Rx.
        for packet in pending_low_priority {
            self.handle_inbound(packet);
        }

        // Phase 4: Rx liveness check.
        if self.last_controller_rx.elapsed() >= Duration::from_millis(TIMEOUT_LINK_TO_CONTROLLER_LOST_MS)
            && !self.link_lost_alarmed
        {
            if let Some(alarm) = self.alarms.try_emit(AlarmKind::LinkToControllerLost, 0) {
                self.radio_out.inject_first(alarm_packet(self.model.vehicle_id, alarm.kind, alarm.magnitude));
                self.alarm_flags.set_alarm_on(true);
            }
            self.link_lost_alarmed = true;
            if self.model.relay.is_enabled() {
                self.model.relay.current_mode = RelayMode::MAIN | RelayMode::IS_RELAY_NODE;
            }
        }

        // Phase 5: IPC drain.
        let since_drain = self.last_ipc_drain.elapsed();
        if self.iteration % IPC_DRAIN_EVERY_N_ITERATIONS == 0
            && since_drain >= Duration::from_millis(IPC_DRAIN_MIN_SPACING_MS)
        {
            ipc::drain_all(ipc_channels, &mut self.control, &mut self.radio_out);
            self.last_ipc_drain = Instant::now();
            self.drain_control_queue();
        }

        // Phase 6: periodic housekeeping.
        let since_housekeeping = self.last_housekeeping.elapsed();
        if self.iteration % HOUSEKEEPING_EVERY_N_ITERATIONS == 0
            && since_housekeeping >= Duration::from_millis(HOUSEKEEPING_MIN_SPACING_MS)
        {
            self.video_tx.periodic();
            self.video_source.periodic();
            self.run_health_check(executor, heartbeat);
            let now = Instant::now();
            let outcome = self.sik.tick(&mut self.hal, &self.model, now);
            self.handle_sik_outcome(outcome, executor, heartbeat);
            self.sync_stats_mirror();
            self.last_housekeeping = now;
        }

        // Phase 7: radio-out drain.
        self.drain_radio_out();

        // Phase 8: loop-duration accounting.
        let elapsed = iteration_start.elapsed();
        self.stats.loop_counters.record_iteration(elapsed.as_micros() as u64);
        if elapsed >= Duration::from_millis(LOOP_STALL_ALARM_MS) {
            self.raise_overload_alarm();
            self.consecutive_overflows = 0;
        } else if elapsed >= Duration::from_millis(MAX_LOOP_TIME_MS) {
            self.stats.loop_counters.overflow_count.fetch_add(1, Ordering::Relaxed);
            self.consecutive_overflows += 1;
            if self.consecutive_overflows >= LOOP_OVERFLOW_ALARM_THRESHOLD
                && self.last_radio_flags_change.elapsed() >= Duration::from_millis(RADIO_FLAGS_CHANGE_GRACE_MS)
            {
                self.raise_overload_alarm();
                self.consecutive_overflows = 0;
            }
        } else {
            self.consecutive_overflows = 0;
        }
    }

    /// Back-annotates telemetry, sends one packet via the Tx gateway,
    /// and injects any dev-stats/dev-graphs follow-up (spec §4.8 phase
    /// 7, SPEC_FULL.md concatenation Open Question resolution (a)). The
    /// non-concatenated path is primary: each packet becomes one air
    /// frame.
    #[cfg(not(feature = "concat"))]
    fn drain_radio_out(&mut self) {
        while let Some(mut packet) = self.radio_out.pop() {
            if packet.header.packet_type() == PacketType::TelemetryExtendedV3 {
                self.back_annotate(&mut packet);
            }
            self.send_bytes(&packet.header, &packet.to_bytes());
            self.maybe_inject_dev_packets(&packet);
        }
    }

    /// Concatenating variant (SPEC_FULL.md Open Question (a)): small
    /// outbound packets sharing the same capacity-class flags are
    /// folded into a single air frame up to `MAX_PACKET_PAYLOAD`.
    /// Packet types that forbid concatenation (ping-reply,
    /// model-settings, command-response) always flush the current
    /// batch and go out alone. Which variant compiles in is decided at
    /// build time by the `concat` feature, never by a runtime branch.
    #[cfg(feature = "concat")]
    fn drain_radio_out(&mut self) {
        let mut batch: Vec<Packet> = Vec::new();
        let mut batch_flags: Option<crate::packet::CapacityFlags> = None;

        while let Some(mut packet) = self.radio_out.pop() {
            if packet.header.packet_type() == PacketType::TelemetryExtendedV3 {
                self.back_annotate(&mut packet);
            }

            if packet.forbids_concatenation() {
                self.flush_concat_batch(&mut batch, batch_flags.take());
                self.send_bytes(&packet.header, &packet.to_bytes());
                self.maybe_inject_dev_packets(&packet);
                continue;
            }

            let flags = packet.header.capacity_flags();
            let projected_len: usize =
                batch.iter().map(|p| p.wire_len()).sum::<usize>() + packet.wire_len();
            if !batch.is_empty() && (batch_flags != Some(flags) || projected_len > MAX_PACKET_PAYLOAD) {
                self.flush_concat_batch(&mut batch, batch_flags.take());
            }
            batch_flags = Some(flags);
            self.maybe_inject_dev_packets(&packet);
            batch.push(packet);
        }

        self.flush_concat_batch(&mut batch, batch_flags.take());
    }

    /// Sends every packet in `batch` as a single concatenated air frame
    /// (or, for a single-element batch, exactly the same bytes the
    /// non-concatenated path would have sent). No-op on an empty batch.
    #[cfg(feature = "concat")]
    fn flush_concat_batch(&mut self, batch: &mut Vec<Packet>, flags: Option<crate::packet::CapacityFlags>) {
        if batch.is_empty() {
            return;
        }
        let mut header = batch[0].header;
        if let Some(flags) = flags {
            header.set_capacity_flags(flags);
        }
        let mut frame = Vec::with_capacity(batch.iter().map(|p| p.wire_len()).sum());
        for packet in batch.iter() {
            frame.extend_from_slice(&packet.to_bytes());
        }
        self.send_bytes(&header, &frame);
        batch.clear();
    }

    fn send_bytes(&mut self, header: &PacketHeader, bytes: &[u8]) {
        let link_restriction = None;
        match crate::tx::send_to_radio_interfaces(&mut self.hal, &self.stats, header, bytes, link_restriction) {
            Ok(_) => {}
            Err(err) => log::warn!("radio-out drain: send failed: {err}"),
        }
    }

    /// Injects `video-link-dev-stats`/`video-link-dev-graphs` packets at
    /// the head of the queue immediately after a telemetry send that
    /// triggered them, gated on the model's developer flags (spec §4.8
    /// phase 7, SPEC_FULL.md Dev-stats/dev-graphs supplement).
    fn maybe_inject_dev_packets(&mut self, sent: &Packet) {
        if sent.header.packet_type() != PacketType::TelemetryExtendedV3 {
            return;
        }
        if self.model.developer.dev_graphs_enabled {
            let header = PacketHeader::new(PacketComponent::Telemetry, PacketType::VideoLinkDevGraphs, 0);
            self.radio_out.inject_first(Packet::new(header, Vec::new()));
        }
        if self.model.developer.dev_stats_enabled {
            let header = PacketHeader::new(PacketComponent::Telemetry, PacketType::VideoLinkDevStats, 0);
            self.radio_out.inject_first(Packet::new(header, Vec::new()));
        }
    }

    fn raise_overload_alarm(&mut self) {
        if let Some(alarm) = self.alarms.try_emit(AlarmKind::CpuLoopOverload, self.consecutive_overflows) {
            self.radio_out.push(alarm_packet(self.model.vehicle_id, alarm.kind, alarm.magnitude));
            self.alarm_flags.set_alarm_on(true);
        }
    }

    fn handle_inbound(&mut self, packet: Packet) {
        match packet.header.packet_type() {
            PacketType::Ping => {
                let header = PacketHeader::new(PacketComponent::LocalControl, PacketType::PingReply, packet.header.stream_id);
                self.radio_out.inject_first(Packet::new(header, Vec::new()));
            }
            PacketType::RetransmissionRequest => {
                log::debug!("retransmission request received (stream {})", packet.header.stream_id);
            }
            PacketType::RadioConfigUpdate => {
                self.apply_radio_config_update(&packet);
            }
            PacketType::LocalControlSikReconfig => {
                self.apply_sik_reconfig_request(&packet);
            }
            _ => {
                log::trace!("unhandled inbound packet type {:?} on stream {}", packet.header.packet_type(), packet.header.stream_id);
            }
        }
    }

    fn apply_radio_config_update(&mut self, packet: &Packet) {
        use crate::packet::payload::RadioConfigUpdated;
        let Some(update) = RadioConfigUpdated::from_bytes(&packet.payload) else {
            log::warn!("radio config update: payload decode failed");
            return;
        };
        self.model.relay = update.relay;
        self.model.radio_interfaces = update.interfaces;
        self.model.radio_links = update.links;
        self.last_radio_flags_change = Instant::now();

        let assignments: Vec<(usize, usize, u32)> = self
            .model
            .radio_interfaces
            .iter()
            .enumerate()
            .filter_map(|(id, iface)| {
                let link_id = iface.link_id?;
                let freq = self.model.radio_link(link_id)?.frequency_khz;
                Some((id, link_id, freq))
            })
            .collect();

        for (id, link_id, freq_khz) in assignments {
            if self.hal.info(id).map(|i| i.is_sik()).unwrap_or(false) {
                self.sik.flag_update_sik(&mut self.hal, id, Instant::now());
            } else {
                let _ = self.hal.set_frequency(id, link_id, freq_khz);
            }
        }

        let ack = RadioConfigUpdated::from_model(&self.model);
        let header = PacketHeader::new(PacketComponent::LocalControl, PacketType::RadioConfigUpdated, 0);
        self.radio_out.inject_first(Packet::new(header, ack.to_bytes()));
        let _ = self.hal.save_current_config();
    }

    /// Handles an operator-issued single-interface SiK reconfigure
    /// request (spec §8 Scenario 2): folds into the same
    /// reconfigure-one path a `RadioConfigUpdate` targeting a SiK
    /// interface would trigger.
    fn apply_sik_reconfig_request(&mut self, packet: &Packet) {
        use crate::packet::payload::SikReconfigRequest;
        let Some(request) = SikReconfigRequest::from_bytes(&packet.payload) else {
            log::warn!("sik reconfig request: payload decode failed");
            return;
        };
        let id = request.interface_id as usize;
        if !self.hal.info(id).map(|i| i.is_sik()).unwrap_or(false) {
            log::warn!("sik reconfig request: interface {id} is not a sik radio");
            return;
        }
        self.sik.flag_update_sik(&mut self.hal, id, Instant::now());
    }

    fn drain_control_queue(&mut self) {
        while let Some(packet) = self.control.pop() {
            self.handle_inbound(packet);
        }
    }

    fn run_health_check<X: CommandExecutor>(&mut self, executor: &mut X, heartbeat: &Heartbeat) {
        let mut broken_ids = Vec::new();
        for (slot, health) in self.rx.health.iter().enumerate() {
            if health.broken.swap(false, Ordering::SeqCst) {
                if let Some(&id) = self.rx_interface_ids.get(slot) {
                    broken_ids.push(id);
                }
            }
        }

        for id in broken_ids {
            let is_sik = self.hal.info(id).map(|i| i.is_sik()).unwrap_or(false);
            if is_sik {
                if let Some(alarm) = self.alarms.try_emit(AlarmKind::SikReconfigureFailed, id as u32) {
                    self.radio_out.push(alarm_packet(self.model.vehicle_id, alarm.kind, alarm.magnitude));
                    self.alarm_flags.set_alarm_on(true);
                }
                self.sik.flag_reinit_sik(&mut self.hal, &self.sik_interfaces, id, Instant::now());
            } else {
                self.run_full_reinit(executor, heartbeat);
            }
        }
    }

    fn handle_sik_outcome<X: CommandExecutor>(
        &mut self,
        outcome: SikTickOutcome,
        executor: &mut X,
        heartbeat: &Heartbeat,
    ) {
        if outcome == SikTickOutcome::EscalateFullReinit {
            self.run_full_reinit(executor, heartbeat);
        }
    }

    fn run_full_reinit<X: CommandExecutor>(&mut self, executor: &mut X, heartbeat: &Heartbeat) {
        if let Some(alarm) = self.alarms.try_emit(AlarmKind::RadioReinitStarted, 0) {
            self.radio_out.push(alarm_packet(self.model.vehicle_id, alarm.kind, alarm.magnitude));
            self.alarm_flags.set_alarm_on(true);
        }
        let quit = std::sync::atomic::AtomicBool::new(false);
        let mut reinit = RadioReinitializer::new(executor, heartbeat).with_alarm_flags(&self.alarm_flags);
        let outcome = reinit.run(&mut self.hal, &self.model, &self.stats, &quit);
        match outcome {
            ReinitOutcome::Recovered => {
                let header = PacketHeader::new(PacketComponent::LocalControl, PacketType::RadioReinitialized, 0);
                self.radio_out.inject_first(Packet::new(header, Vec::new()));
            }
            ReinitOutcome::RecoveryBudgetExpired => {
                if let Some(alarm) = self.alarms.try_emit(AlarmKind::RadioReinitFailed, 0) {
                    self.radio_out.push(alarm_packet(self.model.vehicle_id, alarm.kind, alarm.magnitude));
                    self.alarm_flags.set_alarm_on(true);
                }
            }
        }
    }

    fn back_annotate(&self, packet: &mut Packet) {
        let interfaces: Vec<InterfaceBackAnnotation> = (0..self.hal.count())
            .filter_map(|id| self.hal.info(id))
            .map(|info| InterfaceBackAnnotation {
                last_tx_datarate_bps: info.current_datarate_bps,
                last_rx_datarate_bps: info.current_datarate_bps,
                last_rx_rssi_dbm: if info.is_sik() {
                    self.stats.sik.last_rssi_dbm.load(Ordering::Relaxed) as i8
                } else {
                    self.stats.wifi.last_rssi_dbm.load(Ordering::Relaxed) as i8
                },
                last_rx_quality_percent: if info.is_sik() {
                    self.stats.sik.last_rx_quality_percent.load(Ordering::Relaxed) as u8
                } else {
                    self.stats.wifi.last_rx_quality_percent.load(Ordering::Relaxed) as u8
                },
            })
            .collect();
        let telemetry = TelemetryExtendedV3 {
            video_bitrate_bps: self.video_tx.current_bitrate_bps(),
            audio_bitrate_bps: self.audio_source.current_bitrate_bps(),
            interfaces,
        };
        *packet = Packet::new(packet.header, telemetry.to_bytes());
    }

    fn sync_stats_mirror(&self) {
        self.stats.radio_out_queue.depth.store(self.radio_out.len(), Ordering::Relaxed);
        self.stats.radio_out_queue.dropped.store(self.radio_out.dropped_count(), Ordering::Relaxed);
        self.stats.control_queue.depth.store(self.control.len(), Ordering::Relaxed);
        self.stats.control_queue.dropped.store(self.control.dropped_count(), Ordering::Relaxed);
        self.stats.duplicate_drops.store(self.rx.duplicate_drops.load(Ordering::Relaxed), Ordering::Relaxed);
    }
}


#[cfg(all(test, feature = "concat"))]
mod concat_tests {
    use super::*;
    use crate::model::VehicleModel;
    use crate::radio::hal::{MockRadioHal, RadioInterfaceInfo, RadioKind};
    use crate::reinit::RecordingCommandExecutor;
    use crate::rx::RxThreadConfig;
    use std::io::Cursor;

    fn wifi_iface(id: usize) -> RadioInterfaceInfo {
        RadioInterfaceInfo {
            id,
            kind: RadioKind::WifiMonitor,
            driver_name: "wlan0".into(),
            is_configurable: true,
            opened_for_read: true,
            opened_for_write: true,
            current_frequency_khz: 5_800_000,
            current_datarate_bps: 6_000_000,
            assigned_link_id: Some(0),
        }
    }

    fn make_router() -> Router<MockRadioHal> {
        let hal = MockRadioHal::new(vec![wifi_iface(0)]);
        let mut model = VehicleModel::empty(7);
        model.radio_links.push(crate::model::RadioLinkParams::new(5_800_000));
        let rx_hal = MockRadioHal::new(vec![wifi_iface(0)]);
        let rx = crate::rx::spawn(rx_hal, vec![0], RxThreadConfig::new(Duration::from_millis(5)));
        Router::new(hal, model, rx, vec![0])
    }

    #[test]
    fn same_capacity_class_packets_are_concatenated_into_one_send() {
        let mut router = make_router();
        for _ in 0..3 {
            let header = PacketHeader::new(PacketComponent::Telemetry, PacketType::TelemetryAll, 0);
            router.radio_out.push(Packet::new(header, vec![1, 2, 3]));
        }
        router.drain_radio_out();
        assert_eq!(router.hal.sent.len(), 1);
        router.rx.quit.store(true, Ordering::SeqCst);
    }

    #[test]
    fn ping_reply_always_flushes_and_sends_alone() {
        let mut router = make_router();
        let telemetry_header = PacketHeader::new(PacketComponent::Telemetry, PacketType::TelemetryAll, 0);
        router.radio_out.push(Packet::new(telemetry_header, vec![9]));
        let reply_header = PacketHeader::new(PacketComponent::LocalControl, PacketType::PingReply, 0);
        router.radio_out.push(Packet::new(reply_header, Vec::new()));

        router.drain_radio_out();
        assert_eq!(router.hal.sent.len(), 2);
        router.rx.quit.store(true, Ordering::SeqCst);
    }
}
