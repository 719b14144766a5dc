//! Vehicle radio router daemon.
//!
//! Brings up the radio HAL, the Rx thread, the stats HTTP endpoint, and
//! then drives the main dispatch loop until a POSIX signal requests
//! shutdown. Same shape as the teacher's `host-node.rs` (env_logger
//! init, stats server on a background thread, a driven loop) with
//! signal-based shutdown added since this binary runs as a long-lived
//! host daemon rather than a dev-loop REPL.
//!
//! # Usage
//!
//! ```bash
//! router
//! router -ver
//! ```

use anyhow::{Context, Result};
use log::{error, info, warn};
use radio_router::radio::hal::{MockRadioHal, RadioHal, RadioInterfaceInfo, RadioKind};
use radio_router::reinit::{Heartbeat, SystemCommandExecutor};
use radio_router::router::Router;
use radio_router::rx::{self, RxThreadConfig};
use radio_router::stats_server::{StatsServer, DEFAULT_STATS_PORT};
use radio_router::{ipc::IpcChannel, persistence};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Placeholder interface topology until a real hardware enumeration
/// backend exists (spec §4.1 Non-goals: wire-level radio driving is
/// out of scope). One WiFi-monitor interface and one SiK serial
/// interface, matching the two `RadioKind` variants the lifecycle
/// controllers distinguish between.
fn default_interfaces() -> Vec<RadioInterfaceInfo> {
    vec![
        RadioInterfaceInfo {
            id: 0,
            kind: RadioKind::WifiMonitor,
            driver_name: "wlan0".into(),
            is_configurable: true,
            opened_for_read: false,
            opened_for_write: false,
            current_frequency_khz: 0,
            current_datarate_bps: 0,
            assigned_link_id: None,
        },
        RadioInterfaceInfo {
            id: 1,
            kind: RadioKind::SikSerial,
            driver_name: "ttyUSB0".into(),
            is_configurable: true,
            opened_for_read: false,
            opened_for_write: false,
            current_frequency_khz: 0,
            current_datarate_bps: 0,
            assigned_link_id: None,
        },
    ]
}

fn install_quit_handler() -> Result<Arc<AtomicBool>> {
    let quit = Arc::new(AtomicBool::new(false));
    for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM, signal_hook::consts::SIGQUIT] {
        signal_hook::flag::register(sig, quit.clone()).context("registering signal handler")?;
    }
    Ok(quit)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if std::env::args().any(|a| a == "-ver" || a == "--version") {
        println!("vehicle-radio-router {VERSION}");
        return Ok(());
    }

    info!("=== vehicle radio router starting ===");

    let model = persistence::load_or_create_model(1).context("loading vehicle model")?;
    info!("vehicle model loaded: vehicle_id={}", model.vehicle_id);

    // The Rx thread and the main-thread gateway each need their own
    // HAL handle (the Rx thread owns its handle for the lifetime of
    // the thread); a real backend would share underlying file
    // descriptors internally the way a socket handle clones cheaply.
    let mut rx_hal = MockRadioHal::new(default_interfaces());
    let mut main_hal = MockRadioHal::new(default_interfaces());
    let interface_ids: Vec<usize> = (0..main_hal.count()).collect();
    main_hal.enumerate();
    rx_hal.enumerate();

    // Open one Rx and one Tx interface per spec §8 Scenario 1. Each HAL
    // handle opens independently since the Rx thread and the main-thread
    // gateway hold separate handles onto the same (mocked) interfaces.
    for &id in &interface_ids {
        if let Err(e) = rx_hal.open_rx(id) {
            warn!("failed to open interface {id} for rx: {e}");
        }
        if let Err(e) = main_hal.open_tx(id) {
            warn!("failed to open interface {id} for tx: {e}");
        }
    }

    let rx_handle = rx::spawn(rx_hal, interface_ids.clone(), RxThreadConfig::new(Duration::from_millis(2)));

    let mut router = Router::new(main_hal, model, rx_handle, interface_ids);
    router.announce_startup();

    // The stats server mirrors the same `RouterStats` the router updates
    // from its hot path, not a standalone copy, so `/stats` reflects the
    // live loop rather than a stale snapshot taken at startup.
    let _stats_server = match StatsServer::start(None, DEFAULT_STATS_PORT, router.stats.clone()) {
        Ok(server) => {
            info!("stats server running at http://localhost:{DEFAULT_STATS_PORT}/stats");
            Some(server)
        }
        Err(e) => {
            warn!("failed to start stats server: {e}");
            warn!("continuing without stats server");
            None
        }
    };

    let quit = install_quit_handler()?;

    let mut executor = SystemCommandExecutor;
    let heartbeat = Heartbeat::new();

    // No real IPC peers wired in yet (spec §4.7 channels are POSIX
    // FIFOs in production); an empty in-memory channel keeps the
    // drain phase exercised without requiring named pipes to exist.
    let mut ipc_channels: Vec<IpcChannel<Cursor<Vec<u8>>>> =
        vec![IpcChannel::new(Cursor::new(Vec::new()), "video-peer")];

    info!("entering main dispatch loop");
    while !quit.load(Ordering::Relaxed) {
        router.tick(&mut ipc_channels, &mut executor, &heartbeat);
        std::thread::sleep(Duration::from_micros(200));
    }

    info!("shutdown signal received, stopping");
    Ok(())
}
