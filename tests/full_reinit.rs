//! Full radio reinit: a broken non-SiK (WiFi) interface surfaces
//! through the Rx thread's health flag and drives the full recovery
//! sequence, ending in a `RADIO_REINITIALIZED` broadcast.

use radio_router::ipc::IpcChannel;
use radio_router::model::{RadioInterfaceParams, RadioLinkParams, VehicleModel};
use radio_router::packet::PacketType;
use radio_router::radio::hal::{MockRadioHal, RadioInterfaceInfo, RadioKind};
use radio_router::reinit::{Heartbeat, RecordingCommandExecutor};
use radio_router::router::Router;
use radio_router::rx::RxThreadConfig;
use std::io::Cursor;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn wifi_iface(id: usize) -> RadioInterfaceInfo {
    RadioInterfaceInfo {
        id,
        kind: RadioKind::WifiMonitor,
        driver_name: "wlan0".into(),
        is_configurable: true,
        opened_for_read: true,
        opened_for_write: true,
        current_frequency_khz: 5_800_000,
        current_datarate_bps: 6_000_000,
        assigned_link_id: Some(0),
    }
}

#[test]
fn broken_interface_zero_drives_full_reinit_and_reopens() {
    let mut model = VehicleModel::empty(3);
    model.radio_links.push(RadioLinkParams::new(5_825_000));
    model.radio_interfaces.push(RadioInterfaceParams { link_id: Some(0), tx_power_sik: 0 });

    let hal = MockRadioHal::new(vec![wifi_iface(0)]);
    let rx_hal = MockRadioHal::new(vec![wifi_iface(0)]);
    let rx = radio_router::rx::spawn(rx_hal, vec![0], RxThreadConfig::new(Duration::from_millis(5)));
    let mut router = Router::new(hal, model, rx, vec![0]);

    // Simulate the Rx thread observing a fatal receive error on interface 0.
    router.rx.health[0].broken.store(true, Ordering::SeqCst);

    let mut channels: Vec<IpcChannel<Cursor<Vec<u8>>>> = Vec::new();
    let mut executor = RecordingCommandExecutor::default();
    let heartbeat = Heartbeat::new();

    // Housekeeping runs every 20 iterations, at least 20ms apart.
    for _ in 0..20 {
        router.tick(&mut channels, &mut executor, &heartbeat);
        std::thread::sleep(Duration::from_millis(2));
    }

    assert!(!router.stats.radio_reinit_in_progress.load(Ordering::Relaxed));
    assert_eq!(router.hal.info(0).unwrap().current_frequency_khz, 5_825_000);
    assert!(router.hal.info(0).unwrap().opened_for_read);
    assert!(router.hal.info(0).unwrap().opened_for_write);
    assert!(executor.invocations.iter().any(|(program, _)| program == "systemctl"));

    let reinitialized = router
        .radio_out
        .pop_batch(8)
        .iter()
        .any(|p| p.header.packet_type() == PacketType::RadioReinitialized);
    assert!(reinitialized);

    router.rx.quit.store(true, Ordering::SeqCst);
}
