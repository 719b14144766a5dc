//! SiK reconfigure: a `LOCAL_CONTROL_SIK_RECONFIG` delivered over IPC
//! for one interface closes, reconfigures, and reopens it without
//! touching any other interface.

use radio_router::ipc::IpcChannel;
use radio_router::model::{RadioInterfaceParams, RadioLinkParams, VehicleModel};
use radio_router::packet::payload::SikReconfigRequest;
use radio_router::packet::{Packet, PacketComponent, PacketHeader, PacketType};
use radio_router::radio::hal::{MockRadioHal, RadioInterfaceInfo, RadioKind};
use radio_router::reinit::{Heartbeat, RecordingCommandExecutor};
use radio_router::router::Router;
use radio_router::rx::RxThreadConfig;
use std::io::Cursor;
use std::time::Duration;

fn sik_iface(id: usize) -> RadioInterfaceInfo {
    RadioInterfaceInfo {
        id,
        kind: RadioKind::SikSerial,
        driver_name: format!("tty{id}"),
        is_configurable: true,
        opened_for_read: true,
        opened_for_write: true,
        current_frequency_khz: 433_000,
        current_datarate_bps: 57_600,
        assigned_link_id: Some(0),
    }
}

#[test]
fn sik_reconfig_request_settles_within_recheck_window() {
    let mut model = VehicleModel::empty(9);
    model.radio_links.push(RadioLinkParams::new(868_000));
    model.radio_interfaces.push(RadioInterfaceParams::default());
    model.radio_interfaces.push(RadioInterfaceParams { link_id: Some(0), tx_power_sik: 15 });

    let hal = MockRadioHal::new(vec![sik_iface(0), sik_iface(1)]);
    let rx_hal = MockRadioHal::new(vec![sik_iface(0), sik_iface(1)]);
    let rx = radio_router::rx::spawn(rx_hal, vec![0, 1], RxThreadConfig::new(Duration::from_millis(5)));
    let mut router = Router::new(hal, model, rx, vec![0, 1]);

    let payload = SikReconfigRequest { interface_id: 1 }.to_bytes();
    let header = PacketHeader::new(PacketComponent::LocalControl, PacketType::LocalControlSikReconfig, 0);
    let framed = Packet::new(header, payload).to_bytes();

    let mut channels = vec![IpcChannel::new(Cursor::new(framed), "operator")];
    let mut executor = RecordingCommandExecutor::default();
    let heartbeat = Heartbeat::new();

    // Drive enough ticks to cross the IPC-drain gate, then enough more
    // (spaced out) to cross the SiK settle deadline during housekeeping.
    let deadline = std::time::Instant::now() + Duration::from_millis(1_500);
    let mut settled = false;
    while std::time::Instant::now() < deadline {
        router.tick(&mut channels, &mut executor, &heartbeat);
        if router.sik.is_idle() && router.hal.info(1).unwrap().current_frequency_khz == 868_000 {
            settled = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    assert!(settled, "sik reconfigure did not settle within the recheck window");
    assert!(router.hal.info(1).unwrap().opened_for_read);
    assert!(router.hal.info(1).unwrap().opened_for_write);
    // Interface 0 was never targeted and keeps its original frequency.
    assert_eq!(router.hal.info(0).unwrap().current_frequency_khz, 433_000);

    router.rx.quit.store(true, std::sync::atomic::Ordering::SeqCst);
}
