//! Radio hardware abstraction.
//!
//! `RadioHal` is the seam between the router's scheduling/dispatch
//! logic and the actual 802.11-monitor-mode/SiK-serial hardware. The
//! wire-level details of injecting 802.11 frames or talking the SiK
//! AT-command protocol are out of scope (spec Non-goals); this trait
//! is the contract a real backend would implement, mirrored on the
//! teacher's `LoRaRadio`/`LoRaInterface` split (a blocking
//! transmit/receive pair wrapping hardware that cannot be polled
//! asynchronously from this process).
//!
//! All calls are synchronous and block the calling thread (spec §4.1):
//! the Rx thread calls `receive`/`open_rx`, the main thread calls
//! everything else through the Tx gateway, the SiK lifecycle
//! controller, and the full radio reinitializer.

use crate::consts::SIK_SET_PARAMS_RETRIES;
use std::fmt;
use std::time::Duration;

/// Which physical layer a radio interface uses. Determines capacity
/// class (`CapacityFlags`) and which lifecycle controller owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioKind {
    WifiMonitor,
    SikSerial,
    /// Present in `enumerate()` output but not driven by either
    /// lifecycle controller (spec §3 `RadioInterface.kind`).
    Other,
}

impl fmt::Display for RadioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiMonitor => write!(f, "wifi-monitor"),
            Self::SikSerial => write!(f, "sik-serial"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Static identity of one radio interface as seen by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioInterfaceInfo {
    pub id: usize,
    pub kind: RadioKind,
    pub driver_name: String,
    /// Whether the HAL can reprogram this interface's frequency/rate.
    /// Non-configurable interfaces are left at whatever the HAL
    /// reports and that value is mirrored into stats verbatim (spec
    /// §4.1).
    pub is_configurable: bool,
    pub opened_for_read: bool,
    pub opened_for_write: bool,
    pub current_frequency_khz: u32,
    pub current_datarate_bps: u32,
    pub assigned_link_id: Option<usize>,
}

impl RadioInterfaceInfo {
    pub fn is_sik(&self) -> bool {
        self.kind == RadioKind::SikSerial
    }
}

/// A frame received on a radio interface, with link-quality metadata
/// (mirrors the teacher's `ReceivedPacket { data, rssi, snr }`).
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub interface_id: usize,
    pub data: Vec<u8>,
    pub rssi_dbm: i32,
    pub quality_percent: u8,
}

/// SiK AT-style configuration parameters (spec §4.1 `sik_set_params`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SikParams {
    pub frequency_khz: u32,
    pub spread_factor: u8,
    pub channels: u8,
    pub netid: u16,
    pub datarate_bps: u32,
    pub tx_power: u32,
    pub ecc: bool,
    pub lbt: bool,
    pub mcstr: bool,
}

/// Errors a `RadioHal` implementation can report. Real backends will
/// add OS/driver-specific variants; the router only branches on these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalError {
    InterfaceNotFound(usize),
    NotConfigurable(usize),
    NotSik(usize),
    Timeout,
    /// Failure that may succeed on retry (spec §4.1: `sik_set_params`
    /// retries up to twice on this before reporting failure).
    Transient(String),
    Io(String),
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterfaceNotFound(id) => write!(f, "radio interface {id} not found"),
            Self::NotConfigurable(id) => write!(f, "radio interface {id} is not configurable"),
            Self::NotSik(id) => write!(f, "radio interface {id} is not a SiK radio"),
            Self::Timeout => write!(f, "radio operation timed out"),
            Self::Transient(msg) => write!(f, "transient radio error: {msg}"),
            Self::Io(msg) => write!(f, "radio I/O error: {msg}"),
        }
    }
}

impl std::error::Error for HalError {}

/// Hardware abstraction over N physical radio interfaces (spec §4.1,
/// §2 item 1). Implementations must not block indefinitely inside
/// `receive`: it always respects its timeout so the Rx thread can
/// check its quit flag between polls.
pub trait RadioHal: Send {
    /// Re-scan attached hardware, replacing the interface list. Called
    /// at startup and by the full radio reinitializer after OS-level
    /// bring-up (spec §4.6 step 4).
    fn enumerate(&mut self) -> Vec<RadioInterfaceInfo>;

    fn count(&self) -> usize;

    fn info(&self, id: usize) -> Option<RadioInterfaceInfo>;

    fn supports_frequency(&self, id: usize, khz: u32) -> bool;

    fn is_sik(&self, id: usize) -> bool {
        self.info(id).map(|i| i.is_sik()).unwrap_or(false)
    }

    fn open_rx(&mut self, id: usize) -> Result<(), HalError>;

    fn open_tx(&mut self, id: usize) -> Result<(), HalError>;

    fn close(&mut self, id: usize) -> Result<(), HalError>;

    /// Set frequency for a WiFi-class interface assigned to `link_id`.
    /// Mirrors the accepted value into the interface's
    /// `current_frequency_khz` on success (spec §3 invariant).
    fn set_frequency(&mut self, id: usize, link_id: usize, khz: u32) -> Result<(), HalError>;

    /// Attempt one SiK AT-command parameter push. `sik_set_params`
    /// wraps this with the retry policy; implementors only need to
    /// model a single attempt (which may fail transiently).
    fn sik_set_params_once(&mut self, id: usize, params: SikParams) -> Result<(), HalError>;

    /// Push SiK parameters, retrying up to `SIK_SET_PARAMS_RETRIES`
    /// times on `HalError::Transient` before reporting failure (spec
    /// §4.1). Non-transient errors (`NotFound`, `NotSik`) are returned
    /// immediately without retry.
    fn sik_set_params(&mut self, id: usize, params: SikParams) -> Result<(), HalError> {
        let mut last_err = None;
        for attempt in 0..=SIK_SET_PARAMS_RETRIES {
            match self.sik_set_params_once(id, params) {
                Ok(()) => return Ok(()),
                Err(HalError::Transient(msg)) => {
                    log::warn!(
                        "sik_set_params transient failure on interface {id} (attempt {attempt}): {msg}"
                    );
                    last_err = Some(HalError::Transient(msg));
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_err.unwrap_or(HalError::Timeout))
    }

    fn sik_close(&mut self, id: usize) -> Result<(), HalError>;

    fn sik_open_rw(&mut self, id: usize) -> Result<(), HalError>;

    /// Persist the current hardware config to the on-disk radio
    /// hardware config file (spec §6).
    fn save_current_config(&mut self) -> Result<(), HalError>;

    /// Clear the "already enumerated" bookkeeping flag so the next
    /// `enumerate()` performs a full hardware re-scan rather than
    /// returning cached interface identities (spec §4.1; used by the
    /// full radio reinitializer after OS-level bring-up).
    fn reset_enumerated_flag(&mut self);

    fn transmit(&mut self, id: usize, frame: &[u8]) -> Result<(), HalError>;

    /// Block up to `timeout` waiting for the next received frame on
    /// interface `id` specifically (spec §4.2: "poll every Rx-open
    /// interface"). A fatal `Err` here is what the Rx thread
    /// interprets as "interface `id` broken" (spec §4.2 failure
    /// semantics).
    fn receive(&mut self, id: usize, timeout: Duration) -> Result<Option<ReceivedFrame>, HalError>;
}

/// In-memory `RadioHal` used by tests and by the router when no real
/// radio backend is wired in (mirrors how the teacher's `HostNetwork`
/// stands in for `WifiNetwork` on a machine with no ESP32 radio
/// attached).
pub struct MockRadioHal {
    interfaces: Vec<RadioInterfaceInfo>,
    inbox: std::collections::HashMap<usize, std::collections::VecDeque<ReceivedFrame>>,
    pub sent: Vec<(usize, Vec<u8>)>,
    pub fail_transmit: bool,
    /// Interfaces that should report a transient failure the next
    /// time `sik_set_params_once` is called on them (then clear).
    pub fail_sik_once: std::collections::HashSet<usize>,
    pub fail_sik_always: std::collections::HashSet<usize>,
    /// Interfaces whose `receive` call should report a fatal error
    /// (simulates a broken radio, spec §4.2 failure semantics).
    pub fail_receive: std::collections::HashSet<usize>,
    enumerated: bool,
}

impl MockRadioHal {
    pub fn new(interfaces: Vec<RadioInterfaceInfo>) -> Self {
        Self {
            interfaces,
            inbox: std::collections::HashMap::new(),
            sent: Vec::new(),
            fail_transmit: false,
            fail_sik_once: std::collections::HashSet::new(),
            fail_sik_always: std::collections::HashSet::new(),
            fail_receive: std::collections::HashSet::new(),
            enumerated: true,
        }
    }

    pub fn push_received(&mut self, frame: ReceivedFrame) {
        self.inbox.entry(frame.interface_id).or_default().push_back(frame);
    }

    fn find_mut(&mut self, id: usize) -> Result<&mut RadioInterfaceInfo, HalError> {
        self.interfaces
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(HalError::InterfaceNotFound(id))
    }
}

impl RadioHal for MockRadioHal {
    fn enumerate(&mut self) -> Vec<RadioInterfaceInfo> {
        self.enumerated = true;
        self.interfaces.clone()
    }

    fn count(&self) -> usize {
        self.interfaces.len()
    }

    fn info(&self, id: usize) -> Option<RadioInterfaceInfo> {
        self.interfaces.iter().find(|i| i.id == id).cloned()
    }

    fn supports_frequency(&self, id: usize, _khz: u32) -> bool {
        self.interfaces.iter().any(|i| i.id == id)
    }

    fn open_rx(&mut self, id: usize) -> Result<(), HalError> {
        self.find_mut(id)?.opened_for_read = true;
        Ok(())
    }

    fn open_tx(&mut self, id: usize) -> Result<(), HalError> {
        self.find_mut(id)?.opened_for_write = true;
        Ok(())
    }

    fn close(&mut self, id: usize) -> Result<(), HalError> {
        let iface = self.find_mut(id)?;
        iface.opened_for_read = false;
        iface.opened_for_write = false;
        Ok(())
    }

    fn set_frequency(&mut self, id: usize, link_id: usize, khz: u32) -> Result<(), HalError> {
        let iface = self.find_mut(id)?;
        if !iface.is_configurable {
            return Err(HalError::NotConfigurable(id));
        }
        iface.current_frequency_khz = khz;
        iface.assigned_link_id = Some(link_id);
        Ok(())
    }

    fn sik_set_params_once(&mut self, id: usize, params: SikParams) -> Result<(), HalError> {
        if self.fail_sik_always.contains(&id) {
            return Err(HalError::Transient("mock permanent sik failure".into()));
        }
        if self.fail_sik_once.remove(&id) {
            return Err(HalError::Transient("mock transient sik failure".into()));
        }
        let iface = self.find_mut(id)?;
        if !iface.is_sik() {
            return Err(HalError::NotSik(id));
        }
        iface.current_frequency_khz = params.frequency_khz;
        iface.current_datarate_bps = params.datarate_bps;
        Ok(())
    }

    fn sik_close(&mut self, id: usize) -> Result<(), HalError> {
        let iface = self.find_mut(id)?;
        if !iface.is_sik() {
            return Err(HalError::NotSik(id));
        }
        iface.opened_for_read = false;
        iface.opened_for_write = false;
        Ok(())
    }

    fn sik_open_rw(&mut self, id: usize) -> Result<(), HalError> {
        let iface = self.find_mut(id)?;
        if !iface.is_sik() {
            return Err(HalError::NotSik(id));
        }
        iface.opened_for_read = true;
        iface.opened_for_write = true;
        Ok(())
    }

    fn save_current_config(&mut self) -> Result<(), HalError> {
        Ok(())
    }

    fn reset_enumerated_flag(&mut self) {
        self.enumerated = false;
    }

    fn transmit(&mut self, id: usize, frame: &[u8]) -> Result<(), HalError> {
        if self.fail_transmit {
            return Err(HalError::Io("mock transmit failure".into()));
        }
        if !self.interfaces.iter().any(|i| i.id == id) {
            return Err(HalError::InterfaceNotFound(id));
        }
        self.sent.push((id, frame.to_vec()));
        Ok(())
    }

    fn receive(&mut self, id: usize, _timeout: Duration) -> Result<Option<ReceivedFrame>, HalError> {
        if self.fail_receive.contains(&id) {
            return Err(HalError::Io(format!("mock receive failure on interface {id}")));
        }
        Ok(self.inbox.get_mut(&id).and_then(|q| q.pop_front()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_interfaces() -> Vec<RadioInterfaceInfo> {
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

    #[test]
    fn transmit_records_frame_on_known_interface() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        hal.transmit(0, &[1, 2, 3]).unwrap();
        assert_eq!(hal.sent, vec![(0, vec![1, 2, 3])]);
    }

    #[test]
    fn transmit_rejects_unknown_interface() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        assert_eq!(hal.transmit(9, &[1]), Err(HalError::InterfaceNotFound(9)));
    }

    #[test]
    fn receive_drains_inbox_in_order() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        hal.push_received(ReceivedFrame { interface_id: 1, data: vec![1], rssi_dbm: -70, quality_percent: 50 });
        hal.push_received(ReceivedFrame { interface_id: 1, data: vec![2], rssi_dbm: -71, quality_percent: 49 });

        let first = hal.receive(1, Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(first.data, vec![1]);
        let second = hal.receive(1, Duration::from_millis(10)).unwrap().unwrap();
        assert_eq!(second.data, vec![2]);
        assert!(hal.receive(1, Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn receive_reports_fatal_error_on_marked_interface() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        hal.fail_receive.insert(0);
        assert!(hal.receive(0, Duration::from_millis(10)).is_err());
    }

    #[test]
    fn set_frequency_updates_info_and_assigns_link() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        hal.set_frequency(0, 2, 2_412_000).unwrap();
        let info = hal.info(0).unwrap();
        assert_eq!(info.current_frequency_khz, 2_412_000);
        assert_eq!(info.assigned_link_id, Some(2));
    }

    #[test]
    fn sik_set_params_retries_transient_failure_then_succeeds() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        hal.fail_sik_once.insert(1);
        let params = SikParams {
            frequency_khz: 868_000,
            spread_factor: 8,
            channels: 1,
            netid: 25,
            datarate_bps: 57_600,
            tx_power: 20,
            ecc: true,
            lbt: false,
            mcstr: false,
        };
        hal.sik_set_params(1, params).expect("should succeed after one retry");
        assert_eq!(hal.info(1).unwrap().current_frequency_khz, 868_000);
    }

    #[test]
    fn sik_set_params_reports_failure_after_exhausting_retries() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        hal.fail_sik_always.insert(1);
        let params = SikParams {
            frequency_khz: 868_000,
            spread_factor: 8,
            channels: 1,
            netid: 25,
            datarate_bps: 57_600,
            tx_power: 20,
            ecc: false,
            lbt: false,
            mcstr: false,
        };
        assert!(hal.sik_set_params(1, params).is_err());
    }

    #[test]
    fn sik_set_params_on_non_sik_interface_is_not_retried() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        let params = SikParams {
            frequency_khz: 868_000,
            spread_factor: 8,
            channels: 1,
            netid: 25,
            datarate_bps: 57_600,
            tx_power: 20,
            ecc: false,
            lbt: false,
            mcstr: false,
        };
        assert_eq!(hal.sik_set_params(0, params), Err(HalError::NotSik(0)));
    }

    #[test]
    fn reset_enumerated_flag_forces_rescan_bookkeeping() {
        let mut hal = MockRadioHal::new(sample_interfaces());
        assert!(hal.enumerated);
        hal.reset_enumerated_flag();
        assert!(!hal.enumerated);
        hal.enumerate();
        assert!(hal.enumerated);
    }
}
