//! Tx gateway: fans an outbound buffer out to the radio interfaces
//! carrying the target stream class (spec §2 item 3, §4.3).

use crate::packet::{CapacityFlags, PacketHeader};
use crate::radio::hal::{HalError, RadioHal};
use crate::radio::stats::RouterStats;
use crate::radio::RadioKind;

/// Errors the Tx gateway can report. `ConflictingCapacityFlags` is the
/// specific drop condition spec §4.3 calls out: both capacity-class
/// restriction flags set on one packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    ConflictingCapacityFlags,
    NoMatchingInterfaces,
}

impl std::fmt::Display for TxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConflictingCapacityFlags => {
                write!(f, "packet sets both low- and high-capacity-only flags")
            }
            Self::NoMatchingInterfaces => write!(f, "no open-for-write interface matches restriction"),
        }
    }
}

impl std::error::Error for TxError {}

/// Which radio kind a capacity-class flag combination restricts
/// delivery to, if any.
fn required_kind(flags: CapacityFlags) -> Result<Option<RadioKind>, TxError> {
    let low = flags.contains(CapacityFlags::SEND_ON_LOW_CAPACITY_LINK_ONLY);
    let high = flags.contains(CapacityFlags::SEND_ON_HIGH_CAPACITY_LINK_ONLY);
    match (low, high) {
        (true, true) => Err(TxError::ConflictingCapacityFlags),
        (true, false) => Ok(Some(RadioKind::SikSerial)),
        (false, true) => Ok(Some(RadioKind::WifiMonitor)),
        (false, false) => Ok(None),
    }
}

/// Send `buffer` to every open-for-write interface matching
/// `link_restriction` (or all, if `None`) and the header's
/// capacity-class flags. Returns the number of interfaces the buffer
/// was actually written to.
///
/// `header` is inspected only for its capacity-class flags; the wire
/// bytes transmitted are exactly `buffer` (already-serialized packet
/// or concatenated frame), matching the spec's "prepends any required
/// framing, writes" being the HAL's job, not the gateway's.
pub fn send_to_radio_interfaces<H: RadioHal>(
    hal: &mut H,
    stats: &RouterStats,
    header: &PacketHeader,
    buffer: &[u8],
    link_restriction: Option<usize>,
) -> Result<usize, TxError> {
    let kind_restriction = required_kind(header.capacity_flags())?;

    let targets: Vec<usize> = (0..hal.count())
        .filter_map(|idx| hal.info(idx))
        .filter(|info| info.opened_for_write)
        .filter(|info| link_restriction.map_or(true, |link| info.assigned_link_id == Some(link)))
        .filter(|info| kind_restriction.map_or(true, |kind| info.kind == kind))
        .map(|info| info.id)
        .collect();

    if targets.is_empty() {
        return Err(TxError::NoMatchingInterfaces);
    }

    let mut sent = 0;
    for id in targets {
        match hal.transmit(id, buffer) {
            Ok(()) => {
                let iface_stats = if hal.info(id).map(|i| i.kind) == Some(RadioKind::SikSerial) {
                    &stats.sik
                } else {
                    &stats.wifi
                };
                iface_stats.record_tx(buffer.len());
                sent += 1;
            }
            Err(HalError::InterfaceNotFound(_)) => continue,
            Err(err) => log::warn!("tx gateway: write to interface {id} failed: {err}"),
        }
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{HeaderFlags, PacketComponent, PacketType};
    use crate::radio::hal::{MockRadioHal, RadioInterfaceInfo, RadioKind as HalKind};

    fn iface(id: usize, kind: HalKind, link_id: Option<usize>) -> RadioInterfaceInfo {
        RadioInterfaceInfo {
            id,
            kind,
            driver_name: format!("if{id}"),
            is_configurable: true,
            opened_for_read: true,
            opened_for_write: true,
            current_frequency_khz: 0,
            current_datarate_bps: 0,
            assigned_link_id: link_id,
        }
    }

    fn plain_header() -> PacketHeader {
        PacketHeader::new(PacketComponent::Telemetry, PacketType::TelemetryAll, 0)
    }

    #[test]
    fn conflicting_capacity_flags_are_rejected() {
        let mut hal = MockRadioHal::new(vec![iface(0, HalKind::WifiMonitor, Some(0))]);
        let stats = RouterStats::new(1);
        let mut header = plain_header();
        header.set_capacity_flags(
            CapacityFlags::SEND_ON_LOW_CAPACITY_LINK_ONLY | CapacityFlags::SEND_ON_HIGH_CAPACITY_LINK_ONLY,
        );
        assert_eq!(
            send_to_radio_interfaces(&mut hal, &stats, &header, &[1, 2, 3], None),
            Err(TxError::ConflictingCapacityFlags)
        );
    }

    #[test]
    fn fans_out_to_all_open_interfaces_with_no_restriction() {
        let mut hal = MockRadioHal::new(vec![
            iface(0, HalKind::WifiMonitor, Some(0)),
            iface(1, HalKind::SikSerial, Some(1)),
        ]);
        let stats = RouterStats::new(1);
        let header = plain_header();
        let sent = send_to_radio_interfaces(&mut hal, &stats, &header, &[9, 9], None).unwrap();
        assert_eq!(sent, 2);
        assert_eq!(hal.sent.len(), 2);
    }

    #[test]
    fn low_capacity_flag_restricts_to_sik_interfaces() {
        let mut hal = MockRadioHal::new(vec![
            iface(0, HalKind::WifiMonitor, Some(0)),
            iface(1, HalKind::SikSerial, Some(1)),
        ]);
        let stats = RouterStats::new(1);
        let mut header = plain_header();
        header.set_capacity_flags(CapacityFlags::SEND_ON_LOW_CAPACITY_LINK_ONLY);
        let sent = send_to_radio_interfaces(&mut hal, &stats, &header, &[9], None).unwrap();
        assert_eq!(sent, 1);
        assert_eq!(hal.sent[0].0, 1);
    }

    #[test]
    fn link_restriction_filters_to_matching_link_id() {
        let mut hal = MockRadioHal::new(vec![
            iface(0, HalKind::WifiMonitor, Some(0)),
            iface(1, HalKind::WifiMonitor, Some(1)),
        ]);
        let stats = RouterStats::new(1);
        let header = plain_header();
        let sent = send_to_radio_interfaces(&mut hal, &stats, &header, &[9], Some(1)).unwrap();
        assert_eq!(sent, 1);
        assert_eq!(hal.sent[0].0, 1);
    }

    #[test]
    fn no_matching_interfaces_is_an_error() {
        let mut hal = MockRadioHal::new(vec![iface(0, HalKind::WifiMonitor, Some(0))]);
        let stats = RouterStats::new(1);
        let header = plain_header();
        assert_eq!(
            send_to_radio_interfaces(&mut hal, &stats, &header, &[9], Some(5)),
            Err(TxError::NoMatchingInterfaces)
        );
    }

    #[test]
    fn closed_interface_is_skipped() {
        let mut hal = MockRadioHal::new(vec![iface(0, HalKind::WifiMonitor, Some(0))]);
        hal.close(0).unwrap();
        let stats = RouterStats::new(1);
        let header = plain_header();
        assert_eq!(
            send_to_radio_interfaces(&mut hal, &stats, &header, &[9], None),
            Err(TxError::NoMatchingInterfaces)
        );
    }

    #[test]
    fn header_flags_accessor_unaffected_by_capacity_flags() {
        let mut header = plain_header();
        header.set_flags(HeaderFlags::CRC_OK);
        header.set_capacity_flags(CapacityFlags::SEND_ON_HIGH_CAPACITY_LINK_ONLY);
        assert!(header.flags().contains(HeaderFlags::CRC_OK));
    }
}
