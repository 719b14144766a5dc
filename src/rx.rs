//! Rx thread: pulls raw frames from every open Rx interface, applies
//! duplicate suppression, timestamps and tags them, and hands accepted
//! packets to the main loop through a bounded ring (spec §2 item 2,
//! §4.2).
//!
//! Grounded on the teacher's `announce::cache` (an LRU/TTL cache used
//! for Reticulum announce-dedup): the same shape — a bounded map keyed
//! by an identity, evicted by age — is reused here keyed by
//! `(source_vehicle, stream_id)` and holding a small sliding window of
//! recently seen sequence numbers instead of a single hash.

use crate::packet::Packet;
use crate::radio::hal::{HalError, RadioHal};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Width of the per-(source, stream) duplicate-detection window: how
/// many trailing sequence numbers are remembered.
const DUP_WINDOW_SIZE: usize = 64;

/// A packet accepted off the air, timestamped and tagged with the
/// interface it arrived on (spec §4.2).
#[derive(Debug, Clone)]
pub struct TimestampedPacket {
    pub packet: Packet,
    pub interface_id: usize,
    pub received_at: Instant,
}

/// Bounded single-producer/single-consumer ring between the Rx thread
/// and the main loop (spec §2 item 2, §5 "lightly-locked ring
/// buffer"). Backed by `Mutex<VecDeque<_>>` rather than a lock-free
/// structure, matching the teacher's `Arc<Mutex<_>>` idiom throughout
/// `node.rs` — this crate has no async runtime, so there is no need
/// for `tokio::sync::Mutex`.
pub struct RxRing {
    capacity: usize,
    inner: Mutex<VecDeque<TimestampedPacket>>,
    dropped: AtomicUsize,
}

impl RxRing {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(VecDeque::with_capacity(capacity)), dropped: AtomicUsize::new(0) }
    }

    /// Push a packet, dropping the oldest entry if the ring is full.
    pub fn push(&self, item: TimestampedPacket) {
        let mut guard = self.inner.lock().expect("rx ring mutex poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        guard.push_back(item);
    }

    /// Drain up to `max` packets in arrival order (spec §4.8 phase 1:
    /// "Drain up to N (<=15) frames from the Rx ring").
    pub fn drain(&self, max: usize) -> Vec<TimestampedPacket> {
        let mut guard = self.inner.lock().expect("rx ring mutex poisoned");
        let n = max.min(guard.len());
        guard.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("rx ring mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Sliding window of recently accepted sequence numbers for one
/// (source, stream) pair. A fixed-size `VecDeque` is enough: the
/// window only needs to catch retransmits of recently sent packets,
/// not full history.
#[derive(Debug, Default)]
struct SeqWindow {
    seen: VecDeque<u32>,
}

impl SeqWindow {
    fn accept(&mut self, seq: u32) -> bool {
        if self.seen.contains(&seq) {
            return false;
        }
        if self.seen.len() >= DUP_WINDOW_SIZE {
            self.seen.pop_front();
        }
        self.seen.push_back(seq);
        true
    }
}

/// Suppresses retransmitted duplicates within a sliding window per
/// (source-vehicle, stream) pair (spec §4.2, §8 "Dup-filter
/// idempotence").
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    windows: HashMap<(u32, u16), SeqWindow>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the packet is new and should be dispatched,
    /// `false` if it is a duplicate and must be dropped.
    pub fn accept(&mut self, source_vehicle: u32, stream_id: u16, seq: u32) -> bool {
        self.windows.entry((source_vehicle, stream_id)).or_default().accept(seq)
    }
}

/// Per-interface bad-packet / broken-interface bookkeeping the main
/// loop's health check reads (spec §4.2).
#[derive(Debug, Default)]
pub struct InterfaceHealth {
    pub bad_packet_count: AtomicUsize,
    pub broken: AtomicBool,
}

/// Timing counters the Rx thread resets on each read (spec §4.2:
/// "Maintain max_loop_time, max_read_time, max_queue_time counters
/// since last read-and-reset").
#[derive(Debug, Default)]
pub struct RxTimingCounters {
    pub max_loop_time_us: AtomicUsize,
    pub max_read_time_us: AtomicUsize,
    pub max_queue_time_us: AtomicUsize,
}

impl RxTimingCounters {
    /// Read and zero all three counters atomically with respect to
    /// each other (the main loop is the only reader, so a simple
    /// swap per field is sufficient).
    pub fn take(&self) -> (usize, usize, usize) {
        (
            self.max_loop_time_us.swap(0, Ordering::Relaxed),
            self.max_read_time_us.swap(0, Ordering::Relaxed),
            self.max_queue_time_us.swap(0, Ordering::Relaxed),
        )
    }
}

/// Thread priority hint (spec §4.2 `[AMBIENT]`): the original raises
/// OS thread priority for the Rx thread via a platform call with no
/// portable stdlib equivalent. Logged, not enforced.
#[derive(Debug, Clone, Copy, Default)]
pub struct RxThreadConfig {
    pub priority_hint: Option<i32>,
    pub poll_interval: Duration,
}

impl RxThreadConfig {
    pub fn new(poll_interval: Duration) -> Self {
        Self { priority_hint: None, poll_interval }
    }
}

/// Handle to the spawned Rx thread: shared quit flag, per-interface
/// health, the ring it feeds, and the join handle for clean shutdown.
pub struct RxThreadHandle {
    pub quit: Arc<AtomicBool>,
    pub health: Arc<Vec<InterfaceHealth>>,
    pub timing: Arc<RxTimingCounters>,
    pub ring: Arc<RxRing>,
    /// Packets rejected by the duplicate filter, mirrored into
    /// `RouterStats::duplicate_drops` by the main loop's housekeeping
    /// pass.
    pub duplicate_drops: Arc<AtomicU64>,
    join: Option<JoinHandle<()>>,
}

impl RxThreadHandle {
    /// Signal the thread to quit and wait for it to exit. Per spec §5
    /// cancellation, the thread is expected to terminate within
    /// ~100 ms of the flag being observed.
    pub fn shutdown(mut self) {
        self.quit.store(true, Ordering::SeqCst);
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

/// Spawn the Rx thread against `hal`'s currently open-for-read
/// interfaces. `hal` must be `'static` (owned by the thread) —
/// callers hand over a boxed trait object, typically behind a
/// `Box<dyn RadioHal>` constructed at startup.
pub fn spawn<H>(mut hal: H, interface_ids: Vec<usize>, config: RxThreadConfig) -> RxThreadHandle
where
    H: RadioHal + 'static,
{
    let quit = Arc::new(AtomicBool::new(false));
    let health: Arc<Vec<InterfaceHealth>> =
        Arc::new(interface_ids.iter().map(|_| InterfaceHealth::default()).collect());
    let timing = Arc::new(RxTimingCounters::default());
    let ring = Arc::new(RxRing::new(crate::consts::RX_RING_CAPACITY));
    let duplicate_drops = Arc::new(AtomicU64::new(0));

    if let Some(hint) = config.priority_hint {
        log::info!("rx thread priority hint {hint} requested (no portable enforcement)");
    }

    let thread_quit = quit.clone();
    let thread_health = health.clone();
    let thread_timing = timing.clone();
    let thread_ring = ring.clone();
    let thread_duplicate_drops = duplicate_drops.clone();
    let poll_interval = config.poll_interval;

    let join = std::thread::Builder::new()
        .name("radio-rx".into())
        .spawn(move || {
            let mut dup_filter = DuplicateFilter::new();
            while !thread_quit.load(Ordering::Relaxed) {
                let loop_start = Instant::now();
                for (slot, &id) in interface_ids.iter().enumerate() {
                    if thread_quit.load(Ordering::Relaxed) {
                        break;
                    }
                    let read_start = Instant::now();
                    match hal.receive(id, poll_interval) {
                        Ok(Some(frame)) => {
                            record_max(&thread_timing.max_read_time_us, read_start.elapsed());
                            let queue_start = Instant::now();
                            handle_frame(
                                &frame.data,
                                id,
                                &mut dup_filter,
                                &thread_health,
                                slot,
                                &thread_ring,
                                &thread_duplicate_drops,
                            );
                            record_max(&thread_timing.max_queue_time_us, queue_start.elapsed());
                        }
                        Ok(None) => {}
                        Err(HalError::Timeout) => {}
                        Err(err) => {
                            log::warn!("rx thread: interface {id} reported fatal error: {err}");
                            thread_health[slot].broken.store(true, Ordering::SeqCst);
                        }
                    }
                }
                record_max(&thread_timing.max_loop_time_us, loop_start.elapsed());
            }
            log::debug!("rx thread exiting");
        })
        .expect("failed to spawn rx thread");

    RxThreadHandle { quit, health, timing, ring, duplicate_drops, join: Some(join) }
}

fn record_max(counter: &AtomicUsize, elapsed: Duration) {
    let us = elapsed.as_micros() as usize;
    counter.fetch_max(us, Ordering::Relaxed);
}

fn handle_frame(
    bytes: &[u8],
    interface_id: usize,
    dup_filter: &mut DuplicateFilter,
    health: &Arc<Vec<InterfaceHealth>>,
    slot: usize,
    ring: &Arc<RxRing>,
    duplicate_drops: &Arc<AtomicU64>,
) {
    let Some(packet) = Packet::from_bytes(bytes) else {
        health[slot].bad_packet_count.fetch_add(1, Ordering::Relaxed);
        return;
    };
    let source = match packet.header.source_kind() {
        crate::packet::SourceKind::Vehicle(v) => v,
        crate::packet::SourceKind::Router => u32::MAX,
    };
    // The sequence number rides in the low 32 bits of the payload's
    // first word for packet types that need dup suppression; types
    // that don't carry one (e.g. one-shot commands) use 0, which
    // collapses to "always new" because stream ids for those types
    // are not reused rapidly enough to false-positive.
    let seq = packet.payload.get(0..4).map(|s| u32::from_le_bytes(s.try_into().unwrap())).unwrap_or(0);
    if !dup_filter.accept(source, packet.header.stream_id, seq) {
        duplicate_drops.fetch_add(1, Ordering::Relaxed);
        return;
    }
    ring.push(TimestampedPacket { packet, interface_id, received_at: Instant::now() });
}
