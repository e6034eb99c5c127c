//! Queue-manager state of one hardware function.

use std::sync::Arc;

use qede_types::{ChipTopology, FunctionProfile, LinkState, ResourceBudget};
use tracing::{error, info};

use crate::callbacks::QmCallbacks;
use crate::engine::EngineContext;
use crate::error::{QmError, QmResult};
use crate::planner::PlanInputs;
use crate::reconf::ReconfState;
use crate::types::{QmInfo, WfqData};

/// Queue-manager statistics of a function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmFunctionStats {
    /// Successful planning passes.
    pub plans_built: u64,
    /// Planning passes rejected by validation.
    pub plans_rejected: u64,
    /// Completed reconfigurations.
    pub reconfigurations: u64,
    /// Failed reconfigurations.
    pub reconfiguration_failures: u64,
    /// Accepted vport minimum-rate requests.
    pub wfq_requests_accepted: u64,
    /// Rejected vport minimum-rate requests.
    pub wfq_requests_rejected: u64,
}

/// One hardware function and its queue-manager layout.
pub struct QmFunction {
    pub(crate) profile: FunctionProfile,
    pub(crate) topology: ChipTopology,
    pub(crate) budget: ResourceBudget,
    pub(crate) link: LinkState,
    pub(crate) engine: Arc<EngineContext>,
    pub(crate) qm_info: Option<QmInfo>,
    /// WFQ bookkeeping of a dropped layout, restored by the next probe.
    pub(crate) saved_wfq: Vec<WfqData>,
    pub(crate) callbacks: Option<Arc<dyn QmCallbacks>>,
    pub(crate) state: ReconfState,
    pub(crate) queues_stopped: bool,
    pub(crate) stats: QmFunctionStats,
}

impl std::fmt::Debug for QmFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QmFunction")
            .field("pf_id", &self.profile.pf_id)
            .field("engine_id", &self.engine.engine_id())
            .field("personality", &self.profile.personality)
            .field("has_layout", &self.qm_info.is_some())
            .field("state", &self.state)
            .field("queues_stopped", &self.queues_stopped)
            .field("stats", &self.stats)
            .finish()
    }
}

impl QmFunction {
    /// Creates a function on an engine. No layout exists until [`probe`].
    ///
    /// [`probe`]: QmFunction::probe
    pub fn new(
        engine: Arc<EngineContext>,
        profile: FunctionProfile,
        topology: ChipTopology,
        budget: ResourceBudget,
    ) -> Self {
        Self {
            profile,
            topology,
            budget,
            link: LinkState::default(),
            engine,
            qm_info: None,
            saved_wfq: Vec::new(),
            callbacks: None,
            state: ReconfState::Idle,
            queues_stopped: false,
            stats: QmFunctionStats::default(),
        }
    }

    /// Sets the callbacks for this function.
    pub fn set_callbacks(&mut self, callbacks: Arc<dyn QmCallbacks>) {
        self.callbacks = Some(callbacks);
    }

    pub(crate) fn callbacks(&self) -> QmResult<Arc<dyn QmCallbacks>> {
        self.callbacks
            .clone()
            .ok_or_else(|| QmError::invalid_config("No callbacks set"))
    }

    /// Allocates the tables and runs the first planning pass.
    pub fn probe(&mut self) -> QmResult<()> {
        let inputs = PlanInputs::new(&self.profile, &self.topology, &self.budget);
        let mut qm = QmInfo::new(&inputs)?;

        if let Err(err) = qm.init_qm_info(&inputs) {
            error!("pf {} qm planning failed: {}", self.profile.pf_id, err);
            self.stats.plans_rejected += 1;
            self.drop_layout();
            return Err(err);
        }

        let saved = std::mem::take(&mut self.saved_wfq);
        for (slot, data) in qm.wfq_data.iter_mut().zip(saved) {
            *slot = data;
        }

        info!(
            "pf {} qm layout ready [pqs {} vports {} flags {}]",
            self.profile.pf_id, qm.num_pqs, qm.num_vports, qm.pq_flags
        );
        self.stats.plans_built += 1;
        self.qm_info = Some(qm);
        Ok(())
    }

    /// Reruns the planning pass in place.
    ///
    /// Sanity failures drop the layout. Vport minimum rates survive and are
    /// restored by the next pass that succeeds.
    pub fn init_qm_info(&mut self) -> QmResult<()> {
        let Some(qm) = self.qm_info.as_mut() else {
            return self.probe();
        };

        let inputs = PlanInputs::new(&self.profile, &self.topology, &self.budget);
        match qm.init_qm_info(&inputs) {
            Ok(()) => {
                self.stats.plans_built += 1;
                Ok(())
            }
            Err(err) => {
                error!("pf {} qm planning failed: {}", self.profile.pf_id, err);
                self.stats.plans_rejected += 1;
                self.drop_layout();
                Err(err)
            }
        }
    }

    fn drop_layout(&mut self) {
        if let Some(qm) = self.qm_info.take() {
            self.saved_wfq = qm.wfq_data;
        }
    }

    /// Returns the current layout, if one was built.
    pub fn qm_info(&self) -> Option<&QmInfo> {
        self.qm_info.as_ref()
    }

    pub(crate) fn qm_info_mut(&mut self) -> QmResult<&mut QmInfo> {
        self.qm_info
            .as_mut()
            .ok_or_else(|| QmError::invalid_config("qm layout not initialized"))
    }

    /// Returns the function profile.
    pub fn profile(&self) -> &FunctionProfile {
        &self.profile
    }

    /// Replaces the profile; takes effect on the next planning pass.
    pub fn set_profile(&mut self, profile: FunctionProfile) {
        self.profile = profile;
    }

    /// Returns the engine topology.
    pub fn topology(&self) -> &ChipTopology {
        &self.topology
    }

    /// Changes the negotiated traffic class count (DCB renegotiation).
    /// Takes effect on the next planning pass.
    pub fn set_num_traffic_classes(&mut self, num_tcs: u8) {
        self.topology.num_traffic_classes = num_tcs;
    }

    /// Returns the resource budget.
    pub fn budget(&self) -> &ResourceBudget {
        &self.budget
    }

    /// Returns the link state.
    pub fn link(&self) -> &LinkState {
        &self.link
    }

    /// Returns the engine this function runs on.
    pub fn engine(&self) -> &Arc<EngineContext> {
        &self.engine
    }

    /// Returns the reconfiguration state.
    pub fn state(&self) -> ReconfState {
        self.state
    }

    /// Returns true while the function's PQs are stopped.
    ///
    /// Stays true after a failed reconfiguration until a later one
    /// succeeds.
    pub fn queues_stopped(&self) -> bool {
        self.queues_stopped
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &QmFunctionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qede_types::{Personality, ResourceGrant};

    fn budget() -> ResourceBudget {
        ResourceBudget {
            pqs: ResourceGrant::new(16, 0),
            vports: ResourceGrant::new(4, 0),
            rate_limiters: ResourceGrant::new(4, 0),
        }
    }

    #[test]
    fn test_probe_builds_layout() {
        let mut func = QmFunction::new(
            EngineContext::new(0),
            FunctionProfile::default(),
            ChipTopology::default(),
            budget(),
        );
        assert!(func.qm_info().is_none());

        func.probe().unwrap();
        let qm = func.qm_info().unwrap();
        assert_eq!(qm.num_vports, 4);
        assert_eq!(func.stats().plans_built, 1);
    }

    #[test]
    fn test_probe_rejects_unknown_personality() {
        let profile = FunctionProfile {
            personality: Personality::Unknown("nvmetcp".to_string()),
            ..Default::default()
        };
        let mut func =
            QmFunction::new(EngineContext::new(0), profile, ChipTopology::default(), budget());

        assert!(matches!(func.probe(), Err(QmError::InvalidConfig { .. })));
        assert!(func.qm_info().is_none());
    }

    #[test]
    fn test_failed_replan_drops_layout() {
        let mut func = QmFunction::new(
            EngineContext::new(0),
            FunctionProfile::default(),
            ChipTopology::default(),
            budget(),
        );
        func.probe().unwrap();

        // More classes than a port has.
        func.set_num_traffic_classes(16);
        assert!(func.init_qm_info().is_err());
        assert!(func.qm_info().is_none());
        assert_eq!(func.stats().plans_rejected, 1);
    }

    #[test]
    fn test_replan_after_failure_restores_wfq_data() {
        let mut func = QmFunction::new(
            EngineContext::new(0),
            FunctionProfile::default(),
            ChipTopology::default(),
            budget(),
        );
        func.probe().unwrap();
        let requested = WfqData {
            min_speed: 5000,
            configured: true,
        };
        func.qm_info_mut().unwrap().wfq_data[1] = requested;

        func.set_num_traffic_classes(12);
        assert!(func.init_qm_info().is_err());
        assert!(func.qm_info().is_none());

        func.set_num_traffic_classes(1);
        func.init_qm_info().unwrap();
        let qm = func.qm_info().unwrap();
        assert_eq!(qm.wfq_data[1], requested);
        assert!(!qm.wfq_data[0].configured);
        assert!(func.saved_wfq.is_empty());
    }

    #[test]
    fn test_missing_callbacks() {
        let func = QmFunction::new(
            EngineContext::new(0),
            FunctionProfile::default(),
            ChipTopology::default(),
            budget(),
        );
        let err = func.callbacks().err().unwrap();
        assert_eq!(err.to_string(), "Invalid configuration: No callbacks set");
    }
}
