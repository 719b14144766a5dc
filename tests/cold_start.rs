//! Cold start: the router opens its interfaces, announces the current
//! radio config, then broadcasts readiness to telemetry peers.

use radio_router::ipc::IpcChannel;
use radio_router::model::{RadioInterfaceParams, RadioLinkParams, VehicleModel};
use radio_router::radio::hal::{MockRadioHal, RadioHal, RadioInterfaceInfo, RadioKind};
use radio_router::reinit::{Heartbeat, RecordingCommandExecutor};
use radio_router::router::Router;
use radio_router::rx::RxThreadConfig;
use radio_router::{PacketHeader, PacketType};
use std::io::Cursor;
use std::time::Duration;

fn wifi_iface(id: usize) -> RadioInterfaceInfo {
    RadioInterfaceInfo {
        id,
        kind: RadioKind::WifiMonitor,
        driver_name: "wlan0".into(),
        is_configurable: true,
        opened_for_read: false,
        opened_for_write: false,
        current_frequency_khz: 0,
        current_datarate_bps: 0,
        assigned_link_id: Some(0),
    }
}

fn sik_iface(id: usize) -> RadioInterfaceInfo {
    RadioInterfaceInfo {
        id,
        kind: RadioKind::SikSerial,
        driver_name: "ttyUSB0".into(),
        is_configurable: true,
        opened_for_read: false,
        opened_for_write: false,
        current_frequency_khz: 0,
        current_datarate_bps: 0,
        assigned_link_id: None,
    }
}

#[test]
fn cold_start_opens_interfaces_then_announces_config_and_readiness() {
    let mut model = VehicleModel::empty(1);
    model.radio_links.push(RadioLinkParams::new(2_412_000));
    model.radio_interfaces.push(RadioInterfaceParams { link_id: Some(0), tx_power_sik: 0 });

    let mut main_hal = MockRadioHal::new(vec![wifi_iface(0), sik_iface(1)]);
    let mut rx_hal = MockRadioHal::new(vec![wifi_iface(0), sik_iface(1)]);
    main_hal.enumerate();
    rx_hal.enumerate();

    main_hal.open_tx(0).unwrap();
    rx_hal.open_rx(0).unwrap();

    assert!(main_hal.info(0).unwrap().opened_for_write);
    assert!(rx_hal.info(0).unwrap().opened_for_read);

    let rx = radio_router::rx::spawn(rx_hal, vec![0, 1], RxThreadConfig::new(Duration::from_millis(5)));
    let mut router = Router::new(main_hal, model, rx, vec![0, 1]);
    router.announce_startup();

    let first = router.radio_out.pop().expect("config ack queued");
    assert_eq!(first.header.packet_type(), PacketType::RadioConfigUpdated);

    let second = router.radio_out.pop().expect("router ready queued");
    assert_eq!(second.header.packet_type(), PacketType::RouterReady);

    // Drive the loop once; both queued announcements should go out over
    // the (now open-for-write) wifi interface within the first tick.
    router.radio_out.push(first);
    router.radio_out.push(second);
    let mut channels: Vec<IpcChannel<Cursor<Vec<u8>>>> = Vec::new();
    let mut executor = RecordingCommandExecutor::default();
    let heartbeat = Heartbeat::new();
    router.tick(&mut channels, &mut executor, &heartbeat);

    assert_eq!(router.hal.sent.len(), 2);
    let first_sent = PacketHeader::from_bytes(&router.hal.sent[0].1).unwrap();
    assert_eq!(first_sent.packet_type(), PacketType::RadioConfigUpdated);
    let second_sent = PacketHeader::from_bytes(&router.hal.sent[1].1).unwrap();
    assert_eq!(second_sent.packet_type(), PacketType::RouterReady);

    router.rx.quit.store(true, std::sync::atomic::Ordering::SeqCst);
}
