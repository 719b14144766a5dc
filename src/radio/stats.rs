//! Shared-memory-mirror statistics: radio link counters, queue depth,
//! and main-loop timing, all served read-only over HTTP (see
//! `stats_server.rs`). Mirrors the teacher's `NodeStats`/`InterfaceStats`
//! shape (atomics updated lock-free from the hot path, hand-rolled
//! `to_json()` rather than `serde_json`, since this is a narrow,
//! stable, high-frequency surface).

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// Per-radio-interface packet/byte counters and last-seen link quality.
#[derive(Debug, Default)]
pub struct InterfaceStats {
    pub tx_packets: AtomicU64,
    pub rx_packets: AtomicU64,
    pub tx_bytes: AtomicU64,
    pub rx_bytes: AtomicU64,
    pub last_rssi_dbm: AtomicI64,
    pub last_rx_quality_percent: AtomicU64,
}

impl InterfaceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tx(&self, bytes: usize) {
        self.tx_packets.fetch_add(1, Ordering::Relaxed);
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_rx(&self, bytes: usize, rssi_dbm: i64, quality_percent: u64) {
        self.rx_packets.fetch_add(1, Ordering::Relaxed);
        self.rx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.last_rssi_dbm.store(rssi_dbm, Ordering::Relaxed);
        self.last_rx_quality_percent.store(quality_percent, Ordering::Relaxed);
    }

    fn to_json(&self) -> String {
        format!(
            r#"{{"tx_packets":{},"rx_packets":{},"tx_bytes":{},"rx_bytes":{},"last_rssi_dbm":{},"last_rx_quality_percent":{}}}"#,
            self.tx_packets.load(Ordering::Relaxed),
            self.rx_packets.load(Ordering::Relaxed),
            self.tx_bytes.load(Ordering::Relaxed),
            self.rx_bytes.load(Ordering::Relaxed),
            self.last_rssi_dbm.load(Ordering::Relaxed),
            self.last_rx_quality_percent.load(Ordering::Relaxed),
        )
    }
}

/// Main-loop timing counters used for the CPU-loop-overload alarm and
/// exposed as the local loop-rate window (spec §3 `LoopCounters`).
#[derive(Debug, Default)]
pub struct LoopCounters {
    pub iterations: AtomicU64,
    pub overflow_count: AtomicU64,
    pub consecutive_overflows: AtomicU64,
    pub last_iteration_us: AtomicU64,
    pub max_iteration_us: AtomicU64,
}

impl LoopCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_iteration(&self, duration_us: u64) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        self.last_iteration_us.store(duration_us, Ordering::Relaxed);
        self.max_iteration_us.fetch_max(duration_us, Ordering::Relaxed);
    }

    fn to_json(&self) -> String {
        format!(
            r#"{{"iterations":{},"overflow_count":{},"consecutive_overflows":{},"last_iteration_us":{},"max_iteration_us":{}}}"#,
            self.iterations.load(Ordering::Relaxed),
            self.overflow_count.load(Ordering::Relaxed),
            self.consecutive_overflows.load(Ordering::Relaxed),
            self.last_iteration_us.load(Ordering::Relaxed),
            self.max_iteration_us.load(Ordering::Relaxed),
        )
    }
}

/// Radio-out/control queue depth and drop counters.
#[derive(Debug, Default)]
pub struct QueueStats {
    pub depth: AtomicUsize,
    pub dropped: AtomicU64,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn to_json(&self) -> String {
        format!(
            r#"{{"depth":{},"dropped":{}}}"#,
            self.depth.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
        )
    }
}

/// Full router statistics snapshot, mirrored read-only over HTTP.
#[derive(Debug)]
pub struct RouterStats {
    start_time: Instant,
    pub vehicle_id: u32,
    pub wifi: InterfaceStats,
    pub sik: InterfaceStats,
    pub loop_counters: LoopCounters,
    pub radio_out_queue: QueueStats,
    pub control_queue: QueueStats,
    pub duplicate_drops: AtomicU64,
    /// Visible to an external watchdog during the full radio
    /// reinitializer's recovery loop (spec §4.6 step 1).
    pub radio_reinit_in_progress: AtomicBool,
}

impl RouterStats {
    pub fn new(vehicle_id: u32) -> Self {
        Self {
            start_time: Instant::now(),
            vehicle_id,
            wifi: InterfaceStats::new(),
            sik: InterfaceStats::new(),
            loop_counters: LoopCounters::new(),
            radio_out_queue: QueueStats::new(),
            control_queue: QueueStats::new(),
            duplicate_drops: AtomicU64::new(0),
            radio_reinit_in_progress: AtomicBool::new(false),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn to_json(&self) -> String {
        format!(
            r#"{{"uptime_secs":{},"vehicle_id":{},"interfaces":{{"wifi":{},"sik":{}}},"loop":{},"radio_out_queue":{},"control_queue":{},"duplicate_drops":{},"radio_reinit_in_progress":{}}}"#,
            self.uptime_secs(),
            self.vehicle_id,
            self.wifi.to_json(),
            self.sik.to_json(),
            self.loop_counters.to_json(),
            self.radio_out_queue.to_json(),
            self.control_queue.to_json(),
            self.duplicate_drops.load(Ordering::Relaxed),
            self.radio_reinit_in_progress.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_stats_json_reflects_counters() {
        let stats = InterfaceStats::new();
        stats.record_tx(100);
        stats.record_rx(50, -61, 88);
        let json = stats.to_json();
        assert!(json.contains("\"tx_packets\":1"));
        assert!(json.contains("\"rx_bytes\":50"));
        assert!(json.contains("\"last_rssi_dbm\":-61"));
    }

    #[test]
    fn router_stats_json_has_expected_shape() {
        let stats = RouterStats::new(7);
        stats.loop_counters.record_iteration(450);
        let json = stats.to_json();
        assert!(json.contains("\"vehicle_id\":7"));
        assert!(json.contains("\"loop\":"));
        assert!(json.contains("\"last_iteration_us\":450"));
    }
}
