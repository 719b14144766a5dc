//! Vehicle model: the persisted configuration describing this
//! vehicle's radio links, radio interfaces, relay posture, camera and
//! OSD/developer flags. Loaded once at startup and mutated in place as
//! `RadioConfigUpdate` packets and local commands arrive.
//!
//! The original keeps these as parallel fixed C arrays indexed by
//! link/interface id (`MAX_RADIO_INTERFACES`, `MAX_RADIO_LINKS` in
//! `consts`). Here each is a `Vec` ordered by id instead, which drops
//! the fixed-capacity bookkeeping without changing any observable
//! behavior the router depends on.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// SiK link radio flags (`link_radio_flags` bit field).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SikLinkFlags: u32 {
        const ECC = 1 << 0;
        const LBT = 1 << 1;
        const MCSTR = 1 << 2;
    }
}

bitflags! {
    /// Relay posture bits (`current_relay_mode`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RelayMode: u8 {
        const MAIN = 1 << 0;
        const IS_RELAY_NODE = 1 << 1;
        const REMOTE = 1 << 2;
        const PIP_MAIN = 1 << 3;
        const PIP_REMOTE = 1 << 4;
    }
}

/// Per-link radio parameters (frequency, data rates, SiK flags).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioLinkParams {
    pub frequency_khz: u32,
    pub video_datarate_bps: u32,
    pub data_datarate_bps: u32,
    pub flags: SikLinkFlags,
}

impl RadioLinkParams {
    pub fn new(frequency_khz: u32) -> Self {
        Self {
            frequency_khz,
            video_datarate_bps: 0,
            data_datarate_bps: 0,
            flags: SikLinkFlags::empty(),
        }
    }
}

/// Per-interface radio parameters: which link it serves and its SiK
/// transmit power, when applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioInterfaceParams {
    /// Index into `VehicleModel::radio_links`, or `None` if this
    /// interface is not currently assigned to a link.
    pub link_id: Option<usize>,
    pub tx_power_sik: u32,
}

impl Default for RadioInterfaceParams {
    fn default() -> Self {
        Self { link_id: None, tx_power_sik: 0 }
    }
}

/// Relay configuration: whether this vehicle is relaying another
/// vehicle's feed, and on which link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayParams {
    pub relay_link_id: Option<usize>,
    pub relayed_vehicle_id: u32,
    pub relay_frequency_khz: u32,
    pub current_mode: RelayMode,
}

impl Default for RelayParams {
    fn default() -> Self {
        Self {
            relay_link_id: None,
            relayed_vehicle_id: 0,
            relay_frequency_khz: 0,
            current_mode: RelayMode::empty(),
        }
    }
}

impl RelayParams {
    pub fn is_enabled(&self) -> bool {
        self.relay_link_id.is_some()
    }
}

/// Camera kind. Capture itself is out of scope; this only tells the
/// router whether a video source is expected to produce frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraKind {
    None,
    Csi,
    Veye,
    OpenIpc,
}

impl Default for CameraKind {
    fn default() -> Self {
        CameraKind::None
    }
}

/// Developer-facing debug stream toggles (`RADIO_PACKET_TYPE_VIDEO_LINK_DEV_STATS` /
/// `..._DEV_GRAPHS` injection).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperFlags {
    pub dev_stats_enabled: bool,
    pub dev_graphs_enabled: bool,
}

/// OSD-relevant flags the router needs to know about even though OSD
/// rendering itself is controller-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsdFlags {
    pub show_controller_link_lost_alarm: bool,
}

/// The full persisted vehicle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleModel {
    pub vehicle_id: u32,
    pub radio_links: Vec<RadioLinkParams>,
    pub radio_interfaces: Vec<RadioInterfaceParams>,
    pub relay: RelayParams,
    pub camera: CameraKind,
    pub developer: DeveloperFlags,
    pub osd: OsdFlags,
}

impl VehicleModel {
    /// A minimal model good enough to bring the router up with no
    /// radio links configured yet (first-boot / factory state).
    pub fn empty(vehicle_id: u32) -> Self {
        Self {
            vehicle_id,
            radio_links: Vec::new(),
            radio_interfaces: Vec::new(),
            relay: RelayParams::default(),
            camera: CameraKind::default(),
            developer: DeveloperFlags::default(),
            osd: OsdFlags::default(),
        }
    }

    pub fn radio_link(&self, id: usize) -> Option<&RadioLinkParams> {
        self.radio_links.get(id)
    }

    pub fn radio_link_mut(&mut self, id: usize) -> Option<&mut RadioLinkParams> {
        self.radio_links.get_mut(id)
    }

    pub fn interface_for_link(&self, link_id: usize) -> Vec<usize> {
        self.radio_interfaces
            .iter()
            .enumerate()
            .filter(|(_, p)| p.link_id == Some(link_id))
            .map(|(idx, _)| idx)
            .collect()
    }
}
