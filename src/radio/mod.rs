//! Radio hardware abstraction and the stats mirrored from it.
//!
//! `hal` is the seam between the dispatch loop and physical radio
//! interfaces (spec §4.1); `stats` is the shared-memory-mirror data
//! those interfaces feed (spec §3 `RadioStats`, §6 shared-memory
//! surfaces), served read-only by `stats_server`.

pub mod hal;
pub mod stats;

pub use hal::{
    HalError, MockRadioHal, RadioHal, RadioInterfaceInfo, RadioKind, ReceivedFrame,
    SikParams,
};
pub use stats::RouterStats;
