//! Shared numeric constants carried over from `ruby_rt_vehicle.cpp`
//! (see SPEC_FULL.md, Supplement section) plus a few Rust-side bounds
//! used to size the `Vec`-backed equivalents of the original's fixed
//! C arrays.

use std::time::Duration;

/// Maximum radio interfaces a single vehicle is expected to carry.
/// The original uses fixed arrays sized to this; here it only bounds
/// sanity checks, since interfaces are stored in a `Vec`.
pub const MAX_RADIO_INTERFACES: usize = 8;

/// Maximum radio links a single vehicle model can define.
pub const MAX_RADIO_LINKS: usize = 4;

/// Packets cached locally from the Rx ring per main-loop iteration
/// before the "process remaining Rx" phase (`MAX_RADIO_PACKETS_TO_CACHE_LOCALLY`).
pub const RX_CACHE_CAPACITY: usize = 20;

/// Packets drained for the high-priority pass, capped below
/// `RX_CACHE_CAPACITY` exactly as the original does
/// (`iCountRadioRxPacketsToConsume = MAX_RADIO_PACKETS_TO_CACHE_LOCALLY - 2`
/// when the ring holds at least that many).
pub const RX_DRAIN_PER_TICK: usize = 15;

/// Capacity of the bounded Rx ring shared between the Rx thread and the
/// main loop.
pub const RX_RING_CAPACITY: usize = 256;

/// Capacity of each `PacketQueue` (radio-out, control).
pub const PACKET_QUEUE_CAPACITY: usize = 512;

/// Target main-loop iteration budget; exceeding it counts toward the
/// CPU-loop-overload alarm.
pub const MAX_LOOP_TIME_MS: u64 = 1;

/// A single iteration at or above this duration triggers the overload
/// alarm immediately, regardless of the consecutive-overflow counter.
pub const LOOP_STALL_ALARM_MS: u64 = 500;

/// Consecutive loop-budget overflows required before the overload
/// alarm fires (absent a single `LOOP_STALL_ALARM_MS` stall).
pub const LOOP_OVERFLOW_ALARM_THRESHOLD: u32 = 5;

/// Grace window after a radio-flags change during which loop overload
/// alarms are suppressed (transient reconfiguration overruns are
/// expected and not alarm-worthy).
pub const RADIO_FLAGS_CHANGE_GRACE_MS: u64 = 5_000;

/// Width of the sliding local loop-rate window (spec §3, `LoopCounters`).
pub const LOOP_RATE_LOCAL_WINDOW_MS: u64 = 20_000;

/// Main loop iterations between IPC drains (spec §4.8 phase 5).
pub const IPC_DRAIN_EVERY_N_ITERATIONS: u64 = 10;
/// Minimum spacing between IPC drains even if the iteration count gate
/// is satisfied.
pub const IPC_DRAIN_MIN_SPACING_MS: u64 = 10;

/// Main loop iterations between periodic housekeeping (spec §4.8 phase 6).
pub const HOUSEKEEPING_EVERY_N_ITERATIONS: u64 = 20;
/// Minimum spacing between housekeeping passes.
pub const HOUSEKEEPING_MIN_SPACING_MS: u64 = 20;

/// Messages read per inbound IPC channel per drain before yielding.
pub const IPC_MAX_MESSAGES_PER_DRAIN: usize = 20;
/// Drain sizes above this emit a debug log (load indicator).
pub const IPC_DRAIN_DEBUG_LOG_THRESHOLD: usize = 6;

/// SiK reconfigure/reinit settle time before the lifecycle controller
/// re-checks `reopen_pending` (`g_SiKRadiosState.uTimeIntervalSiKReinitCheck`).
pub const SIK_RECHECK_INTERVAL_MS: u64 = 500;

/// `sik_set_params` retry budget before the caller escalates.
pub const SIK_SET_PARAMS_RETRIES: u32 = 2;

/// Consecutive SiK operation failures on one interface before
/// escalating reconfigure-one -> reinit-all, or reinit-all -> full
/// radio reinit.
pub const SIK_FAILURE_ESCALATION_THRESHOLD: u32 = 2;

/// Bound on the full radio reinitializer's OS bring-up recovery loop.
pub const RADIO_REINIT_RECOVERY_BUDGET: Duration = Duration::from_secs(20);

/// No radio packet received from the controller within this window ->
/// link-lost alarm (edge-triggered).
pub const TIMEOUT_LINK_TO_CONTROLLER_LOST_MS: u64 = 1_500;

/// Maximum payload bytes for a single air frame (used by the
/// concatenation optimization to bound how much it folds together).
pub const MAX_PACKET_PAYLOAD: usize = 1024;

/// Alarm rate-limit window floor/ceiling (spec §7: "3 s to 10 s windows").
pub const ALARM_RATE_LIMIT_MIN_MS: u64 = 3_000;
pub const ALARM_RATE_LIMIT_MAX_MS: u64 = 10_000;
