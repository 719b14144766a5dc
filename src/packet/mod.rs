pub mod header;
pub mod payload;

pub use header::{
    CapacityFlags, HeaderFlags, PacketComponent, PacketHeader, PacketType, SourceKind, HEADER_SIZE,
    PACKET_COMPONENT_RUBY_AS_VEHICLE_ID,
};

/// A header plus its raw payload bytes, as moved through the queues and
/// the radio I/O plane. Payload interpretation (`payload::*`) happens
/// only at the edges that actually need typed access; everywhere else
/// a `Packet` is opaque bytes plus routing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(header: PacketHeader, payload: Vec<u8>) -> Self {
        let mut header = header;
        header.total_length = (HEADER_SIZE + payload.len()) as u16;
        Self { header, payload }
    }

    /// Total wire size: header plus payload.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let header = PacketHeader::from_bytes(buf)?;
        let payload = buf.get(HEADER_SIZE..)?.to_vec();
        Some(Self { header, payload })
    }

    pub fn is_high_priority(&self) -> bool {
        self.header.packet_type().is_high_priority()
    }

    pub fn forbids_concatenation(&self) -> bool {
        self.header.packet_type().forbids_concatenation()
    }
}
