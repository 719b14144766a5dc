//! Fixed-layout payloads that follow the 22-byte header for the packet
//! types the router itself produces or consumes directly. Everything
//! else rides as an opaque byte blob (see `Packet` in `mod.rs`).
//!
//! Each struct here mirrors a handful of back-annotation or
//! configuration fields lifted from `ruby_rt_vehicle.cpp`'s telemetry
//! and radio-config structures; encoding is manual little-endian, same
//! as the header, since these bytes go straight to the air or to a
//! local IPC socket and must stay bit-compatible across builds.

use crate::consts::MAX_RADIO_INTERFACES;
use crate::model::{RadioInterfaceParams, RadioLinkParams, RelayParams, SikLinkFlags, VehicleModel};

/// Per-interface back-annotation slot inside `TelemetryExtendedV3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceBackAnnotation {
    pub last_tx_datarate_bps: u32,
    pub last_rx_datarate_bps: u32,
    pub last_rx_rssi_dbm: i8,
    pub last_rx_quality_percent: u8,
}

impl InterfaceBackAnnotation {
    const SIZE: usize = 10;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.last_tx_datarate_bps.to_le_bytes());
        out.extend_from_slice(&self.last_rx_datarate_bps.to_le_bytes());
        out.push(self.last_rx_rssi_dbm as u8);
        out.push(self.last_rx_quality_percent);
    }

    fn read(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            last_tx_datarate_bps: u32::from_le_bytes(buf[0..4].try_into().ok()?),
            last_rx_datarate_bps: u32::from_le_bytes(buf[4..8].try_into().ok()?),
            last_rx_rssi_dbm: buf[8] as i8,
            last_rx_quality_percent: buf[9],
        })
    }
}

/// `RADIO_PACKET_TYPE_TELEMETRY_EXTENDED_V3` payload: vehicle-side
/// back-annotation of video/audio bitrate and per-interface link
/// quality, consumed by the controller's OSD.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryExtendedV3 {
    pub video_bitrate_bps: u32,
    pub audio_bitrate_bps: u32,
    pub interfaces: Vec<InterfaceBackAnnotation>,
}

impl TelemetryExtendedV3 {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 1 + self.interfaces.len() * InterfaceBackAnnotation::SIZE);
        out.extend_from_slice(&self.video_bitrate_bps.to_le_bytes());
        out.extend_from_slice(&self.audio_bitrate_bps.to_le_bytes());
        let count = self.interfaces.len().min(MAX_RADIO_INTERFACES) as u8;
        out.push(count);
        for iface in self.interfaces.iter().take(count as usize) {
            iface.write(&mut out);
        }
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < 9 {
            return None;
        }
        let video_bitrate_bps = u32::from_le_bytes(buf[0..4].try_into().ok()?);
        let audio_bitrate_bps = u32::from_le_bytes(buf[4..8].try_into().ok()?);
        let count = buf[8] as usize;
        let mut interfaces = Vec::with_capacity(count);
        let mut off = 9;
        for _ in 0..count {
            let slot = buf.get(off..off + InterfaceBackAnnotation::SIZE)?;
            interfaces.push(InterfaceBackAnnotation::read(slot)?);
            off += InterfaceBackAnnotation::SIZE;
        }
        Some(Self { video_bitrate_bps, audio_bitrate_bps, interfaces })
    }
}

fn write_radio_link_params(out: &mut Vec<u8>, link: &RadioLinkParams) {
    out.extend_from_slice(&link.frequency_khz.to_le_bytes());
    out.extend_from_slice(&link.video_datarate_bps.to_le_bytes());
    out.extend_from_slice(&link.data_datarate_bps.to_le_bytes());
    out.extend_from_slice(&link.flags.bits().to_le_bytes());
}

fn read_radio_link_params(buf: &[u8]) -> Option<RadioLinkParams> {
    if buf.len() < 16 {
        return None;
    }
    Some(RadioLinkParams {
        frequency_khz: u32::from_le_bytes(buf[0..4].try_into().ok()?),
        video_datarate_bps: u32::from_le_bytes(buf[4..8].try_into().ok()?),
        data_datarate_bps: u32::from_le_bytes(buf[8..12].try_into().ok()?),
        flags: SikLinkFlags::from_bits_truncate(u32::from_le_bytes(buf[12..16].try_into().ok()?)),
    })
}

fn write_radio_interface_params(out: &mut Vec<u8>, iface: &RadioInterfaceParams) {
    let link_id: i32 = iface.link_id.map(|v| v as i32).unwrap_or(-1);
    out.extend_from_slice(&link_id.to_le_bytes());
    out.extend_from_slice(&iface.tx_power_sik.to_le_bytes());
}

fn read_radio_interface_params(buf: &[u8]) -> Option<RadioInterfaceParams> {
    if buf.len() < 8 {
        return None;
    }
    let link_id = i32::from_le_bytes(buf[0..4].try_into().ok()?);
    Some(RadioInterfaceParams {
        link_id: if link_id < 0 { None } else { Some(link_id as usize) },
        tx_power_sik: u32::from_le_bytes(buf[4..8].try_into().ok()?),
    })
}

fn write_relay_params(out: &mut Vec<u8>, relay: &RelayParams) {
    let link_id: i32 = relay.relay_link_id.map(|v| v as i32).unwrap_or(-1);
    out.extend_from_slice(&link_id.to_le_bytes());
    out.extend_from_slice(&relay.relayed_vehicle_id.to_le_bytes());
    out.extend_from_slice(&relay.relay_frequency_khz.to_le_bytes());
    out.push(relay.current_mode.bits());
}

fn read_relay_params(buf: &[u8]) -> Option<RelayParams> {
    if buf.len() < 13 {
        return None;
    }
    let link_id = i32::from_le_bytes(buf[0..4].try_into().ok()?);
    Some(RelayParams {
        relay_link_id: if link_id < 0 { None } else { Some(link_id as usize) },
        relayed_vehicle_id: u32::from_le_bytes(buf[4..8].try_into().ok()?),
        relay_frequency_khz: u32::from_le_bytes(buf[8..12].try_into().ok()?),
        current_mode: crate::model::RelayMode::from_bits_truncate(buf[12]),
    })
}

/// `RADIO_PACKET_TYPE_RADIO_CONFIG_UPDATED` payload: the router's
/// acknowledgement that a `RadioConfigUpdate` has been applied,
/// carrying the resulting relay/interface/link parameters back to the
/// controller so it can confirm convergence (spec §6, SPEC_FULL.md
/// supplement on payload layout).
#[derive(Debug, Clone, PartialEq)]
pub struct RadioConfigUpdated {
    pub relay: RelayParams,
    pub interfaces: Vec<RadioInterfaceParams>,
    pub links: Vec<RadioLinkParams>,
}

impl RadioConfigUpdated {
    pub fn from_model(model: &VehicleModel) -> Self {
        Self {
            relay: model.relay.clone(),
            interfaces: model.radio_interfaces.clone(),
            links: model.radio_links.clone(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_relay_params(&mut out, &self.relay);
        out.push(self.interfaces.len().min(255) as u8);
        for iface in self.interfaces.iter().take(255) {
            write_radio_interface_params(&mut out, iface);
        }
        out.push(self.links.len().min(255) as u8);
        for link in self.links.iter().take(255) {
            write_radio_link_params(&mut out, link);
        }
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let relay = read_relay_params(buf.get(0..13)?)?;
        let mut off = 13;
        let iface_count = *buf.get(off)? as usize;
        off += 1;
        let mut interfaces = Vec::with_capacity(iface_count);
        for _ in 0..iface_count {
            let slot = buf.get(off..off + 8)?;
            interfaces.push(read_radio_interface_params(slot)?);
            off += 8;
        }
        let link_count = *buf.get(off)? as usize;
        off += 1;
        let mut links = Vec::with_capacity(link_count);
        for _ in 0..link_count {
            let slot = buf.get(off..off + 16)?;
            links.push(read_radio_link_params(slot)?);
            off += 16;
        }
        Some(Self { relay, interfaces, links })
    }
}

/// `RADIO_PACKET_TYPE_RADIO_REINITIALIZED`: header-only notification
/// that a full radio reinit completed. No payload bytes beyond the
/// header (SPEC_FULL.md supplement).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioReinitialized;

impl RadioReinitialized {
    pub fn to_bytes(&self) -> Vec<u8> {
        Vec::new()
    }

    pub fn from_bytes(_buf: &[u8]) -> Option<Self> {
        Some(Self)
    }
}

/// `LOCAL_CONTROL_SIK_RECONFIG` payload: requests that the SiK
/// lifecycle controller close, reconfigure, and reopen one interface
/// (spec §8 Scenario 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SikReconfigRequest {
    pub interface_id: u32,
}

impl SikReconfigRequest {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.interface_id.to_le_bytes().to_vec()
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        Some(Self { interface_id: u32::from_le_bytes(buf.get(0..4)?.try_into().ok()?) })
    }
}

/// `RADIO_PACKET_TYPE_COMMAND_RESPONSE` payload: echoes the original
/// command's stream id and a success flag plus an opaque response
/// blob the command handler produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse {
    pub origin_stream_id: u16,
    pub succeeded: bool,
    pub response: Vec<u8>,
}

impl CommandResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + self.response.len());
        out.extend_from_slice(&self.origin_stream_id.to_le_bytes());
        out.push(self.succeeded as u8);
        out.extend_from_slice(&self.response);
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < 3 {
            return None;
        }
        Some(Self {
            origin_stream_id: u16::from_le_bytes(buf[0..2].try_into().ok()?),
            succeeded: buf[2] != 0,
            response: buf[3..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelayMode;

    #[test]
    fn telemetry_extended_v3_roundtrip() {
        let t = TelemetryExtendedV3 {
            video_bitrate_bps: 4_500_000,
            audio_bitrate_bps: 128_000,
            interfaces: vec![
                InterfaceBackAnnotation {
                    last_tx_datarate_bps: 6_000_000,
                    last_rx_datarate_bps: 6_000_000,
                    last_rx_rssi_dbm: -62,
                    last_rx_quality_percent: 91,
                },
                InterfaceBackAnnotation::default(),
            ],
        };
        let bytes = t.to_bytes();
        let back = TelemetryExtendedV3::from_bytes(&bytes).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn radio_config_updated_roundtrip() {
        let mut model = VehicleModel::empty(3);
        model.radio_links.push(RadioLinkParams::new(2_400_000));
        model.radio_interfaces.push(RadioInterfaceParams { link_id: Some(0), tx_power_sik: 20 });
        model.relay.relay_link_id = Some(0);
        model.relay.current_mode = RelayMode::IS_RELAY_NODE;

        let updated = RadioConfigUpdated::from_model(&model);
        let bytes = updated.to_bytes();
        let back = RadioConfigUpdated::from_bytes(&bytes).unwrap();
        assert_eq!(updated, back);
    }

    #[test]
    fn radio_reinitialized_has_no_payload() {
        assert!(RadioReinitialized.to_bytes().is_empty());
        assert_eq!(RadioReinitialized::from_bytes(&[]), Some(RadioReinitialized));
    }

    #[test]
    fn command_response_roundtrip_with_blob() {
        let r = CommandResponse { origin_stream_id: 55, succeeded: true, response: vec![1, 2, 3] };
        let back = CommandResponse::from_bytes(&r.to_bytes()).unwrap();
        assert_eq!(r, back);
    }

    #[test]
    fn command_response_rejects_truncated_header() {
        assert!(CommandResponse::from_bytes(&[0u8; 2]).is_none());
    }

    #[test]
    fn sik_reconfig_request_roundtrip() {
        let r = SikReconfigRequest { interface_id: 1 };
        let back = SikReconfigRequest::from_bytes(&r.to_bytes()).unwrap();
        assert_eq!(r, back);
    }
}
