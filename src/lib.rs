//! Vehicle-side radio router library.
//!
//! Platform-independent components for the router daemon: the packet
//! format, the vehicle configuration model, the radio I/O plane (HAL,
//! Rx thread, Tx gateway, stats), the SiK and full-reinit lifecycle
//! controllers, the IPC multiplexer, and the main dispatch loop. All
//! of it is testable on the host without real radio hardware attached,
//! the same split the teacher draws between its Reticulum core and
//! its ESP32-only peripherals.

pub mod alarms;
pub mod consts;
pub mod crypto;
pub mod ipc;
pub mod model;
pub mod packet;
pub mod persistence;
pub mod queue;
pub mod radio;
pub mod reinit;
pub mod router;
pub mod rx;
pub mod sik;
pub mod stats_server;
pub mod tx;

pub use model::VehicleModel;
pub use packet::{Packet, PacketHeader, PacketType};
pub use radio::stats::RouterStats;
pub use router::Router;
