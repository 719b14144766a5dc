//! Encryption hook (spec §1 Non-goals: "it does not authenticate —
//! encryption hooks exist but key management lives elsewhere"). The
//! core never generates, stores, or rotates keys; it only defines the
//! seam a key-management component plugs into.
//!
//! Modeled as a `RadioHal` decorator rather than something threaded
//! through the dispatch loop: the router's packet handling stays
//! cipher-agnostic, and encryption becomes purely a property of which
//! HAL it was handed at startup (spec §4.1 is unaffected). Key
//! material is zeroized on drop, the same hygiene the teacher applies
//! to BLE provisioning credentials in `config/ble_service.rs`.

use crate::radio::hal::{HalError, RadioHal, RadioInterfaceInfo, ReceivedFrame, SikParams};
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Opaque symmetric key material sourced from outside this crate.
/// Zeroized as soon as it is dropped (replaced, or the owning
/// `EncryptingRadioHal` goes away) so a stale copy never lingers.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey(Vec<u8>);

impl EncryptionKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Per-frame cipher applied at the HAL boundary. A real implementation
/// would be an AEAD keyed by `EncryptionKey`; this crate only defines
/// the contract (spec §1 Non-goals).
pub trait PacketCipher: Send {
    fn encrypt(&self, frame: &mut Vec<u8>);
    /// Returns `false` if the frame fails to authenticate/decrypt and
    /// should be dropped rather than handed to the caller.
    fn decrypt(&self, frame: &mut Vec<u8>) -> bool;
}

/// Default cipher: no-op. Frames pass through unchanged, matching a
/// deployment with no key material configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCipher;

impl PacketCipher for NoopCipher {
    fn encrypt(&self, _frame: &mut Vec<u8>) {}
    fn decrypt(&self, _frame: &mut Vec<u8>) -> bool {
        true
    }
}

/// Reversible XOR stream cipher keyed by `EncryptionKey`. Strong
/// enough to exercise the hook end-to-end on the host; not a
/// cryptographic primitive, since key management (and therefore any
/// real cipher choice) lives outside this crate.
pub struct XorCipher {
    key: EncryptionKey,
}

impl XorCipher {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    fn apply(&self, frame: &mut [u8]) {
        if self.key.0.is_empty() {
            return;
        }
        for (i, byte) in frame.iter_mut().enumerate() {
            *byte ^= self.key.0[i % self.key.0.len()];
        }
    }
}

impl PacketCipher for XorCipher {
    fn encrypt(&self, frame: &mut Vec<u8>) {
        self.apply(frame);
    }

    fn decrypt(&self, frame: &mut Vec<u8>) -> bool {
        self.apply(frame);
        true
    }
}

/// Wraps a `RadioHal` so every transmitted/received frame passes
/// through `C` first. Every other call delegates straight through:
/// the cipher only ever touches frame bytes, never interface
/// lifecycle or configuration.
pub struct EncryptingRadioHal<H: RadioHal, C: PacketCipher> {
    inner: H,
    cipher: C,
}

impl<H: RadioHal, C: PacketCipher> EncryptingRadioHal<H, C> {
    pub fn new(inner: H, cipher: C) -> Self {
        Self { inner, cipher }
    }
}

impl<H: RadioHal, C: PacketCipher> RadioHal for EncryptingRadioHal<H, C> {
    fn enumerate(&mut self) -> Vec<RadioInterfaceInfo> {
        self.inner.enumerate()
    }

    fn count(&self) -> usize {
        self.inner.count()
    }

    fn info(&self, id: usize) -> Option<RadioInterfaceInfo> {
        self.inner.info(id)
    }

    fn supports_frequency(&self, id: usize, khz: u32) -> bool {
        self.inner.supports_frequency(id, khz)
    }

    fn open_rx(&mut self, id: usize) -> Result<(), HalError> {
        self.inner.open_rx(id)
    }

    fn open_tx(&mut self, id: usize) -> Result<(), HalError> {
        self.inner.open_tx(id)
    }

    fn close(&mut self, id: usize) -> Result<(), HalError> {
        self.inner.close(id)
    }

    fn set_frequency(&mut self, id: usize, link_id: usize, khz: u32) -> Result<(), HalError> {
        self.inner.set_frequency(id, link_id, khz)
    }

    fn sik_set_params_once(&mut self, id: usize, params: SikParams) -> Result<(), HalError> {
        self.inner.sik_set_params_once(id, params)
    }

    fn sik_close(&mut self, id: usize) -> Result<(), HalError> {
        self.inner.sik_close(id)
    }

    fn sik_open_rw(&mut self, id: usize) -> Result<(), HalError> {
        self.inner.sik_open_rw(id)
    }

    fn save_current_config(&mut self) -> Result<(), HalError> {
        self.inner.save_current_config()
    }

    fn reset_enumerated_flag(&mut self) {
        self.inner.reset_enumerated_flag()
    }

    fn transmit(&mut self, id: usize, frame: &[u8]) -> Result<(), HalError> {
        let mut sealed = frame.to_vec();
        self.cipher.encrypt(&mut sealed);
        self.inner.transmit(id, &sealed)
    }

    fn receive(&mut self, id: usize, timeout: Duration) -> Result<Option<ReceivedFrame>, HalError> {
        let mut received = self.inner.receive(id, timeout)?;
        if let Some(frame) = received.as_mut() {
            if !self.cipher.decrypt(&mut frame.data) {
                return Ok(None);
            }
        }
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::hal::{MockRadioHal, RadioKind};

    fn iface(id: usize) -> RadioInterfaceInfo {
        RadioInterfaceInfo {
            id,
            kind: RadioKind::WifiMonitor,
            driver_name: "wlan0".into(),
            is_configurable: true,
            opened_for_read: true,
            opened_for_write: true,
            current_frequency_khz: 0,
            current_datarate_bps: 0,
            assigned_link_id: None,
        }
    }

    #[test]
    fn noop_cipher_passes_frames_through_unchanged() {
        let mock = MockRadioHal::new(vec![iface(0)]);
        let mut hal = EncryptingRadioHal::new(mock, NoopCipher);
        hal.transmit(0, &[1, 2, 3]).unwrap();
        assert_eq!(hal.inner.sent[0].1, vec![1, 2, 3]);
    }

    #[test]
    fn xor_cipher_round_trips_through_transmit_and_receive() {
        let mock = MockRadioHal::new(vec![iface(0)]);
        let key = EncryptionKey::new(vec![0xAA, 0x55]);
        let mut hal = EncryptingRadioHal::new(mock, XorCipher::new(key));

        hal.transmit(0, &[1, 2, 3, 4]).unwrap();
        let sealed = hal.inner.sent[0].1.clone();
        assert_ne!(sealed, vec![1, 2, 3, 4]);

        hal.inner.push_received(ReceivedFrame {
            interface_id: 0,
            data: sealed,
            rssi_dbm: -50,
            quality_percent: 90,
        });
        let opened = hal.receive(0, Duration::from_millis(1)).unwrap().unwrap();
        assert_eq!(opened.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn cipher_rejecting_a_frame_suppresses_it() {
        struct AlwaysReject;
        impl PacketCipher for AlwaysReject {
            fn encrypt(&self, _frame: &mut Vec<u8>) {}
            fn decrypt(&self, _frame: &mut Vec<u8>) -> bool {
                false
            }
        }

        let mock = MockRadioHal::new(vec![iface(0)]);
        let mut hal = EncryptingRadioHal::new(mock, AlwaysReject);
        hal.inner
            .push_received(ReceivedFrame { interface_id: 0, data: vec![9], rssi_dbm: -50, quality_percent: 90 });
        assert!(hal.receive(0, Duration::from_millis(1)).unwrap().is_none());
    }
}
