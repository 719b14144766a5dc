//! SiK lifecycle controller (spec §2 item 6, §4.5): serializes
//! "close -> reconfigure-or-probe -> reopen" for SiK radios without
//! disturbing WiFi interfaces.

use crate::consts::{SIK_FAILURE_ESCALATION_THRESHOLD, SIK_RECHECK_INTERVAL_MS};
use crate::model::VehicleModel;
use crate::radio::hal::{RadioHal, SikParams};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Result of driving the state machine one tick. The main loop acts on
/// `EscalateFullReinit` by invoking the full radio reinitializer
/// (spec §4.6); every other variant requires no further action this
/// tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No reconfiguration in flight.
    Idle,
    /// Reconfiguration in flight, not yet due for its next check.
    Waiting,
    /// Every pending interface reopened and reconfigured; transitioned
    /// back to idle this tick.
    SettledToIdle,
    /// Two consecutive failures on an interface escalated
    /// reconfigure-one to reinit-all.
    EscalatedToReinitAll,
    /// Two consecutive failures during reinit-all escalate to the full
    /// radio reinitializer.
    EscalateFullReinit,
}

/// State machine driving SiK interface reconfiguration (spec §3
/// `SiKState`, §4.5).
#[derive(Debug)]
pub struct SikState {
    must_reinit_all: bool,
    /// `None` means no single-interface reconfigure pending. Setting
    /// `must_reinit_all` always clears this in the same call, so the
    /// two are never simultaneously "active" at any observation point
    /// (spec §8 "SiK state exclusivity").
    reconfigure_index: Option<usize>,
    reopen_pending: HashSet<usize>,
    broken_interface_index: Option<usize>,
    retry_counts: HashMap<usize, u32>,
    next_check_at: Option<Instant>,
}

impl Default for SikState {
    fn default() -> Self {
        Self::new()
    }
}

impl SikState {
    pub fn new() -> Self {
        Self {
            must_reinit_all: false,
            reconfigure_index: None,
            reopen_pending: HashSet::new(),
            broken_interface_index: None,
            retry_counts: HashMap::new(),
            next_check_at: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.reopen_pending.is_empty() && !self.must_reinit_all && self.reconfigure_index.is_none()
    }

    pub fn must_reinit_all(&self) -> bool {
        self.must_reinit_all
    }

    pub fn reconfigure_index(&self) -> Option<usize> {
        self.reconfigure_index
    }

    pub fn reopen_pending(&self) -> &HashSet<usize> {
        &self.reopen_pending
    }

    /// idle -> reconfigure_one(i): close interface `i`, mark it
    /// pending reopen (spec §4.5).
    pub fn flag_update_sik<H: RadioHal>(&mut self, hal: &mut H, id: usize, now: Instant) {
        if self.must_reinit_all {
            // reinit-all supersedes any single-interface reconfigure request.
            return;
        }
        if let Err(err) = hal.sik_close(id) {
            log::warn!("sik reconfigure: close of interface {id} failed: {err}");
        }
        self.reconfigure_index = Some(id);
        self.reopen_pending.insert(id);
        self.next_check_at = Some(now + Duration::from_millis(SIK_RECHECK_INTERVAL_MS));
    }

    /// idle -> reinit_all on a broken SiK interface: close every SiK
    /// interface and mark all pending reopen. `must_reinit_all`
    /// supersedes any in-flight single-interface reconfigure (spec §3
    /// invariant).
    pub fn flag_reinit_sik<H: RadioHal>(&mut self, hal: &mut H, sik_interfaces: &[usize], broken: usize, now: Instant) {
        self.reconfigure_index = None;
        self.must_reinit_all = true;
        self.broken_interface_index = Some(broken);
        self.reopen_pending.clear();
        for &id in sik_interfaces {
            if let Err(err) = hal.sik_close(id) {
                log::warn!("sik reinit-all: close of interface {id} failed: {err}");
            }
            self.reopen_pending.insert(id);
        }
        self.next_check_at = Some(now + Duration::from_millis(SIK_RECHECK_INTERVAL_MS));
    }

    /// Drive the state machine one tick. No-op (returns `Idle`) unless
    /// a reconfigure/reinit is pending and due.
    pub fn tick<H: RadioHal>(&mut self, hal: &mut H, model: &VehicleModel, now: Instant) -> TickOutcome {
        if self.reopen_pending.is_empty() {
            return TickOutcome::Idle;
        }
        match self.next_check_at {
            Some(deadline) if now < deadline => return TickOutcome::Waiting,
            _ => {}
        }

        let pending: Vec<usize> = self.reopen_pending.iter().copied().collect();
        let mut escalate_to_reinit_all = false;
        let mut escalate_to_full_reinit = false;

        for id in pending {
            match self.reopen_and_reconfigure(hal, model, id) {
                Ok(()) => {
                    self.reopen_pending.remove(&id);
                    self.retry_counts.remove(&id);
                }
                Err(err) => {
                    log::warn!("sik lifecycle: reopen/reconfigure of interface {id} failed: {err}");
                    let count = self.retry_counts.entry(id).or_insert(0);
                    *count += 1;
                    if *count >= SIK_FAILURE_ESCALATION_THRESHOLD {
                        if self.must_reinit_all {
                            escalate_to_full_reinit = true;
                        } else {
                            escalate_to_reinit_all = true;
                        }
                    }
                }
            }
        }

        if escalate_to_full_reinit {
            return TickOutcome::EscalateFullReinit;
        }
        if escalate_to_reinit_all {
            let sik_interfaces: Vec<usize> = self.reopen_pending.iter().copied().collect();
            let broken = self.reconfigure_index.unwrap_or(0);
            self.flag_reinit_sik(hal, &sik_interfaces, broken, now);
            return TickOutcome::EscalatedToReinitAll;
        }

        if self.reopen_pending.is_empty() {
            self.must_reinit_all = false;
            self.reconfigure_index = None;
            self.broken_interface_index = None;
            self.next_check_at = None;
            return TickOutcome::SettledToIdle;
        }

        self.next_check_at = Some(now + Duration::from_millis(SIK_RECHECK_INTERVAL_MS));
        TickOutcome::Waiting
    }

    fn reopen_and_reconfigure<H: RadioHal>(
        &self,
        hal: &mut H,
        model: &VehicleModel,
        id: usize,
    ) -> Result<(), crate::radio::hal::HalError> {
        hal.sik_open_rw(id)?;
        let info = hal.info(id).ok_or(crate::radio::hal::HalError::InterfaceNotFound(id))?;
        let params = model
            .radio_interfaces
            .get(id)
            .and_then(|iface| iface.link_id)
            .and_then(|link_id| model.radio_link(link_id))
            .map(|link| SikParams {
                frequency_khz: link.frequency_khz,
                spread_factor: 8,
                channels: 1,
                netid: model.vehicle_id as u16,
                datarate_bps: link.data_datarate_bps,
                tx_power: model
                    .radio_interfaces
                    .get(id)
                    .map(|i| i.tx_power_sik)
                    .unwrap_or(0),
                ecc: link.flags.contains(crate::model::SikLinkFlags::ECC),
                lbt: link.flags.contains(crate::model::SikLinkFlags::LBT),
                mcstr: link.flags.contains(crate::model::SikLinkFlags::MCSTR),
            })
            .unwrap_or(SikParams {
                frequency_khz: info.current_frequency_khz,
                spread_factor: 8,
                channels: 1,
                netid: model.vehicle_id as u16,
                datarate_bps: info.current_datarate_bps,
                tx_power: 0,
                ecc: false,
                lbt: false,
                mcstr: false,
            });
        hal.sik_set_params(id, params)
    }
}
