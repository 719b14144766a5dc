//! Radio packet header: fixed-layout, little-endian, wire-compatible.
//!
//! Layout (22 bytes):
//!
//! ```text
//! offset  size  field
//! 0       4     packet_flags            (component in low byte, CRC/encryption bits above)
//! 4       4     packet_flags_extended    (capacity-class hints)
//! 8       2     packet_type
//! 10      2     stream_id
//! 12      2     total_length
//! 14      4     vehicle_id_src
//! 18      4     vehicle_id_dst
//! ```

use bitflags::bitflags;
use std::fmt;

/// Size in bytes of the fixed packet header.
pub const HEADER_SIZE: usize = 22;

/// Sentinel placed in `vehicle_id_src` by local-control packets that
/// originate from the router itself rather than from an actual vehicle.
/// Overloads the vehicle-id-src field with a component tag (spec §9,
/// Open Question b). `SourceKind::decode` is the forward-looking
/// accessor; the raw field is preserved unchanged on the wire.
pub const PACKET_COMPONENT_RUBY_AS_VEHICLE_ID: u32 = 0xFFFF_FFFE;

/// Low-byte component tag packed into `packet_flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketComponent {
    LocalControl = 0,
    Ruby = 1,
    Commands = 2,
    Telemetry = 3,
    Rc = 4,
    Video = 5,
    Audio = 6,
}

impl PacketComponent {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::LocalControl,
            1 => Self::Ruby,
            2 => Self::Commands,
            3 => Self::Telemetry,
            4 => Self::Rc,
            5 => Self::Video,
            6 => Self::Audio,
            _ => return None,
        })
    }
}

impl fmt::Display for PacketComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LocalControl => "local-control",
            Self::Ruby => "ruby",
            Self::Commands => "commands",
            Self::Telemetry => "telemetry",
            Self::Rc => "rc",
            Self::Video => "video",
            Self::Audio => "audio",
        };
        write!(f, "{name}")
    }
}

bitflags! {
    /// High bits of `packet_flags`: per-packet CRC/encryption state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u32 {
        const CRC_OK    = 1 << 16;
        const ENCRYPTED = 1 << 17;
    }
}

bitflags! {
    /// `packet_flags_extended`: capacity-class delivery hints plus the
    /// optional no-concatenation marker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapacityFlags: u32 {
        /// Restrict delivery to SiK-class (low-capacity) links only.
        const SEND_ON_LOW_CAPACITY_LINK_ONLY = 1 << 0;
        /// Restrict delivery to WiFi-class (high-capacity) links only.
        const SEND_ON_HIGH_CAPACITY_LINK_ONLY = 1 << 1;
    }
}

/// Packet type discriminant. Only the wire-relevant values named by the
/// spec get fixed payload layouts (see `payload.rs`); everything else
/// passes through as an opaque byte blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Ping,
    PingReply,
    RetransmissionRequest,
    RadioConfigUpdate,
    RadioConfigUpdated,
    RadioReinitialized,
    TelemetryExtendedV3,
    TelemetryAll,
    CommandResponse,
    RubyModelSettings,
    DebugInfo,
    VideoLinkDevStats,
    VideoLinkDevGraphs,
    RouterReady,
    Alarm,
    VideoData,
    LocalControlSikReconfig,
    /// Any wire value not named above, preserved verbatim.
    Other(u16),
}

impl PacketType {
    pub fn from_u16(v: u16) -> Self {
        match v {
            1 => Self::Ping,
            2 => Self::PingReply,
            3 => Self::RetransmissionRequest,
            4 => Self::RadioConfigUpdate,
            5 => Self::RadioConfigUpdated,
            6 => Self::RadioReinitialized,
            7 => Self::TelemetryExtendedV3,
            8 => Self::TelemetryAll,
            9 => Self::CommandResponse,
            10 => Self::RubyModelSettings,
            11 => Self::DebugInfo,
            12 => Self::VideoLinkDevStats,
            13 => Self::VideoLinkDevGraphs,
            14 => Self::RouterReady,
            15 => Self::Alarm,
            16 => Self::VideoData,
            17 => Self::LocalControlSikReconfig,
            other => Self::Other(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::Ping => 1,
            Self::PingReply => 2,
            Self::RetransmissionRequest => 3,
            Self::RadioConfigUpdate => 4,
            Self::RadioConfigUpdated => 5,
            Self::RadioReinitialized => 6,
            Self::TelemetryExtendedV3 => 7,
            Self::TelemetryAll => 8,
            Self::CommandResponse => 9,
            Self::RubyModelSettings => 10,
            Self::DebugInfo => 11,
            Self::VideoLinkDevStats => 12,
            Self::VideoLinkDevGraphs => 13,
            Self::RouterReady => 14,
            Self::Alarm => 15,
            Self::VideoData => 16,
            Self::LocalControlSikReconfig => 17,
            Self::Other(v) => v,
        }
    }

    /// High-priority packet types (spec §4.8 phase 1 / Glossary): ping,
    /// retransmission request, radio-config update.
    pub fn is_high_priority(self) -> bool {
        matches!(
            self,
            Self::Ping | Self::PingReply | Self::RetransmissionRequest | Self::RadioConfigUpdate
        )
    }

    /// Packet types that must never be folded into a concatenated air
    /// frame (spec §4.8, concatenation optimization).
    pub fn forbids_concatenation(self) -> bool {
        matches!(
            self,
            Self::PingReply | Self::RubyModelSettings | Self::CommandResponse
        )
    }
}

/// Where a packet's `vehicle_id_src` actually points: either a real
/// vehicle id, or the router itself (the `PACKET_COMPONENT_RUBY`
/// overload, spec §9 Open Question b).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Router,
    Vehicle(u32),
}

impl SourceKind {
    pub fn decode(vehicle_id_src: u32) -> Self {
        if vehicle_id_src == PACKET_COMPONENT_RUBY_AS_VEHICLE_ID {
            Self::Router
        } else {
            Self::Vehicle(vehicle_id_src)
        }
    }
}

/// Fixed-layout packet header, preserved bit-for-bit on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_flags: u32,
    pub packet_flags_extended: u32,
    pub packet_type: u16,
    pub stream_id: u16,
    pub total_length: u16,
    pub vehicle_id_src: u32,
    pub vehicle_id_dst: u32,
}

impl PacketHeader {
    pub fn new(component: PacketComponent, packet_type: PacketType, stream_id: u16) -> Self {
        Self {
            packet_flags: component as u8 as u32,
            packet_flags_extended: 0,
            packet_type: packet_type.as_u16(),
            stream_id,
            total_length: HEADER_SIZE as u16,
            vehicle_id_src: 0,
            vehicle_id_dst: 0,
        }
    }

    pub fn component(&self) -> Option<PacketComponent> {
        PacketComponent::from_u8((self.packet_flags & 0xFF) as u8)
    }

    pub fn set_component(&mut self, component: PacketComponent) {
        self.packet_flags = (self.packet_flags & !0xFF) | (component as u8 as u32);
    }

    pub fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_truncate(self.packet_flags & !0xFF)
    }

    pub fn set_flags(&mut self, flags: HeaderFlags) {
        self.packet_flags = (self.packet_flags & 0xFF) | flags.bits();
    }

    pub fn capacity_flags(&self) -> CapacityFlags {
        CapacityFlags::from_bits_truncate(self.packet_flags_extended)
    }

    pub fn set_capacity_flags(&mut self, flags: CapacityFlags) {
        self.packet_flags_extended = flags.bits();
    }

    pub fn packet_type(&self) -> PacketType {
        PacketType::from_u16(self.packet_type)
    }

    pub fn source_kind(&self) -> SourceKind {
        SourceKind::decode(self.vehicle_id_src)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.packet_flags.to_le_bytes());
        out[4..8].copy_from_slice(&self.packet_flags_extended.to_le_bytes());
        out[8..10].copy_from_slice(&self.packet_type.to_le_bytes());
        out[10..12].copy_from_slice(&self.stream_id.to_le_bytes());
        out[12..14].copy_from_slice(&self.total_length.to_le_bytes());
        out[14..18].copy_from_slice(&self.vehicle_id_src.to_le_bytes());
        out[18..22].copy_from_slice(&self.vehicle_id_dst.to_le_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            packet_flags: u32::from_le_bytes(buf[0..4].try_into().ok()?),
            packet_flags_extended: u32::from_le_bytes(buf[4..8].try_into().ok()?),
            packet_type: u16::from_le_bytes(buf[8..10].try_into().ok()?),
            stream_id: u16::from_le_bytes(buf[10..12].try_into().ok()?),
            total_length: u16::from_le_bytes(buf[12..14].try_into().ok()?),
            vehicle_id_src: u32::from_le_bytes(buf[14..18].try_into().ok()?),
            vehicle_id_dst: u32::from_le_bytes(buf[18..22].try_into().ok()?),
        })
    }
}
