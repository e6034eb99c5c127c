//! A device profile brought to life: one engine, its functions, and the
//! dry-run collaborator they all program through.

use std::sync::Arc;

use qede_qm::{EngineContext, QmError, QmFunction, QmResult};
use tracing::{info, warn};

use crate::dry_run::DryRunCallbacks;
use crate::profile::{DeviceProfile, VportRate};

/// Functions of one engine, sharing its QM lock.
#[derive(Debug)]
pub struct Device {
    profile: DeviceProfile,
    engine: Arc<EngineContext>,
    callbacks: Arc<DryRunCallbacks>,
    functions: Vec<QmFunction>,
}

impl Device {
    /// Creates the functions of a profile. Nothing is planned yet.
    pub fn from_profile(profile: DeviceProfile) -> Self {
        let engine = EngineContext::new(profile.engine_id);
        let callbacks = Arc::new(DryRunCallbacks::new());

        let functions = profile
            .functions
            .iter()
            .map(|entry| {
                let mut func = QmFunction::new(
                    engine.clone(),
                    entry.profile.clone(),
                    profile.topology,
                    entry.budget,
                );
                func.set_callbacks(callbacks.clone());
                func
            })
            .collect();

        Self {
            profile,
            engine,
            callbacks,
            functions,
        }
    }

    /// Plans every function, applies the PF bandwidth limits and the vport
    /// minimum rates, then raises the link.
    pub fn bring_up(&mut self) -> QmResult<()> {
        let link = self.profile.link;
        let rates: Vec<Vec<VportRate>> = self
            .profile
            .functions
            .iter()
            .map(|entry| entry.vport_min_rates.clone())
            .collect();

        for (func, rates) in self.functions.iter_mut().zip(rates) {
            func.probe()?;
            func.configure_pf_max_bandwidth(link.bandwidth_max)?;
            if link.bandwidth_min != 0 {
                func.configure_pf_min_bandwidth(link.bandwidth_min)?;
            }
            for rate in rates {
                func.configure_vport_wfq(rate.vport, rate.rate)?;
            }

            if link.is_up() {
                func.update_link(link.line_speed)?;
            } else {
                warn!("pf {} link is down, vport rates are not validated", func.profile().pf_id);
            }

            if let Some(qm) = func.qm_info() {
                if qm.has_overflow() {
                    warn!("pf {} layout overflowed: {:?}", qm.pf_id, qm.overflows);
                }
            }
        }

        info!(
            "engine {} up with {} functions",
            self.engine.engine_id(),
            self.functions.len()
        );
        Ok(())
    }

    /// Returns the profile the device was built from.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Returns the dry-run collaborator.
    pub fn callbacks(&self) -> &Arc<DryRunCallbacks> {
        &self.callbacks
    }

    /// Returns all functions in profile order.
    pub fn functions(&self) -> &[QmFunction] {
        &self.functions
    }

    /// Returns a function by PF id.
    pub fn function(&self, pf_id: u8) -> QmResult<&QmFunction> {
        self.functions
            .iter()
            .find(|f| f.profile().pf_id == pf_id)
            .ok_or_else(|| unknown_pf(pf_id))
    }

    /// Returns a function by PF id, mutably.
    pub fn function_mut(&mut self, pf_id: u8) -> QmResult<&mut QmFunction> {
        self.functions
            .iter_mut()
            .find(|f| f.profile().pf_id == pf_id)
            .ok_or_else(|| unknown_pf(pf_id))
    }
}

fn unknown_pf(pf_id: u8) -> QmError {
    QmError::invalid_config(format!("pf {} is not in the profile", pf_id))
}
