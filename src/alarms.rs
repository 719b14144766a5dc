//! Alarm taxonomy and rate limiting (spec §7).
//!
//! Alarms are not a side channel: they are ordinary radio-out packets
//! (`PacketType::Alarm`) carrying an `AlarmKind` discriminant plus a
//! magnitude, so they coexist with telemetry/video traffic on the same
//! queue and links. `AlarmLimiter` suppresses repeats of the same kind
//! within a configurable window (spec: "3 s to 10 s windows").

use crate::consts::{ALARM_RATE_LIMIT_MAX_MS, ALARM_RATE_LIMIT_MIN_MS};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmKind {
    ReceivedInvalidRadioPacket,
    VehicleRxTimeout,
    CpuLoopOverload,
    LinkToControllerLost,
    SikReconfigureFailed,
    RadioReinitStarted,
    RadioReinitFailed,
}

impl AlarmKind {
    /// Per-kind rate-limit window, clamped into the spec's 3-10 s band.
    /// Loop overload and link-lost are edge-triggered enough to use the
    /// wider window; transient I/O alarms use the narrower one so
    /// bursts of bad packets still get periodic visibility.
    pub fn window(self) -> Duration {
        let ms = match self {
            Self::ReceivedInvalidRadioPacket => ALARM_RATE_LIMIT_MIN_MS,
            Self::VehicleRxTimeout => ALARM_RATE_LIMIT_MAX_MS,
            Self::CpuLoopOverload => ALARM_RATE_LIMIT_MAX_MS,
            Self::LinkToControllerLost => ALARM_RATE_LIMIT_MAX_MS,
            Self::SikReconfigureFailed => ALARM_RATE_LIMIT_MIN_MS,
            Self::RadioReinitStarted => ALARM_RATE_LIMIT_MIN_MS,
            Self::RadioReinitFailed => ALARM_RATE_LIMIT_MIN_MS,
        };
        Duration::from_millis(ms)
    }
}

/// An alarm ready to be serialized onto the radio-out queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alarm {
    pub kind: AlarmKind,
    pub magnitude: u32,
}

/// Tracks last-emit time per `AlarmKind` and suppresses repeats inside
/// the kind's window. `LINK_TO_CONTROLLER_LOST` additionally is
/// edge-triggered by the caller (only raised on the transition, not
/// every tick the link stays down) — that edge detection lives in the
/// dispatch loop, not here; this type only rate-limits.
#[derive(Debug, Default)]
pub struct AlarmLimiter {
    last_emitted: HashMap<AlarmKind, Instant>,
}

impl AlarmLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Some(alarm)` if this kind is not currently suppressed
    /// (and records the emission), or `None` if it was rate-limited.
    pub fn try_emit(&mut self, kind: AlarmKind, magnitude: u32) -> Option<Alarm> {
        let now = Instant::now();
        if let Some(last) = self.last_emitted.get(&kind) {
            if now.duration_since(*last) < kind.window() {
                return None;
            }
        }
        self.last_emitted.insert(kind, now);
        Some(Alarm { kind, magnitude })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_emit_always_succeeds() {
        let mut lim = AlarmLimiter::new();
        assert!(lim.try_emit(AlarmKind::CpuLoopOverload, 1).is_some());
    }

    #[test]
    fn repeat_within_window_is_suppressed() {
        let mut lim = AlarmLimiter::new();
        assert!(lim.try_emit(AlarmKind::ReceivedInvalidRadioPacket, 1).is_some());
        assert!(lim.try_emit(AlarmKind::ReceivedInvalidRadioPacket, 2).is_none());
    }

    #[test]
    fn different_kinds_do_not_interfere() {
        let mut lim = AlarmLimiter::new();
        assert!(lim.try_emit(AlarmKind::CpuLoopOverload, 1).is_some());
        assert!(lim.try_emit(AlarmKind::LinkToControllerLost, 1).is_some());
    }
}
