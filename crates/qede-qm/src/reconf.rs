//! Online reconfiguration: stop, rebuild, start.
//!
//! Only the stop and release commands run under the engine lock. The
//! rebuild and the programming phase run unlocked, so a sibling function can
//! stop or start its own queues in between.

use std::fmt;

use tracing::{error, info};

use crate::callbacks::{QmCallbacks, QmCommand, QmPfRuntime};
use crate::error::{QmError, QmResult};
use crate::function::QmFunction;
use crate::types::QmInfo;

/// Reconfiguration progress of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReconfState {
    /// No reconfiguration in progress.
    #[default]
    Idle,
    /// Stopping the current PQ range.
    Stopping,
    /// Rebuilding and programming the layout.
    Rebuilding,
    /// Releasing the new PQ range.
    Starting,
}

impl fmt::Display for ReconfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReconfState::Idle => "idle",
            ReconfState::Stopping => "stopping",
            ReconfState::Rebuilding => "rebuilding",
            ReconfState::Starting => "starting",
        };
        write!(f, "{}", s)
    }
}

impl QmFunction {
    /// Rebuilds the layout and reprograms the queue manager without
    /// disturbing sibling functions.
    ///
    /// The function always ends up [`ReconfState::Idle`]. After a failure
    /// past the stop command its queues stay stopped, see
    /// [`QmFunction::queues_stopped`].
    pub fn reconfigure(&mut self) -> QmResult<()> {
        let callbacks = self.callbacks()?;

        let result = self.run_reconfigure(callbacks.as_ref());
        let failed_in = self.state;
        self.state = ReconfState::Idle;

        match &result {
            Ok(()) => {
                self.stats.reconfigurations += 1;
                info!("pf {} qm reconfigured", self.profile.pf_id);
            }
            Err(err) => {
                self.stats.reconfiguration_failures += 1;
                error!(
                    "pf {} qm reconfiguration failed while {}: {}",
                    self.profile.pf_id, failed_in, err
                );
            }
        }
        result
    }

    fn run_reconfigure(&mut self, callbacks: &dyn QmCallbacks) -> QmResult<()> {
        self.state = ReconfState::Stopping;
        if let Some((start_pq, num_pqs)) = self.qm_info.as_ref().map(QmInfo::pq_range) {
            self.send_locked(callbacks, QmCommand::Stop, start_pq, num_pqs)?;
        }
        self.queues_stopped = true;

        self.state = ReconfState::Rebuilding;
        self.init_qm_info()?;
        let runtime = self
            .qm_info
            .as_ref()
            .map(QmPfRuntime::from)
            .ok_or_else(|| QmError::internal("layout missing after a successful rebuild"))?;
        callbacks.clear_runtime_data()?;
        callbacks.program_qm_pf(&runtime)?;

        self.state = ReconfState::Starting;
        self.send_locked(callbacks, QmCommand::Release, runtime.start_pq, runtime.num_pqs)?;
        self.queues_stopped = false;

        Ok(())
    }

    fn send_locked(
        &self,
        callbacks: &dyn QmCallbacks,
        command: QmCommand,
        start_pq: u16,
        num_pqs: u16,
    ) -> QmResult<()> {
        info!(
            "pf {} sending qm {} [start_pq {} num_pqs {}]",
            self.profile.pf_id, command, start_pq, num_pqs
        );
        self.engine
            .with_qm_lock(|| callbacks.send_qm_cmd(command, start_pq, num_pqs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineContext;
    use pretty_assertions::assert_eq;
    use qede_types::{hw, ChipTopology, FunctionProfile, ResourceBudget, ResourceGrant};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Cmd(QmCommand, u16, u16),
        Clear,
        Program(u16, u16),
    }

    #[derive(Default)]
    struct TestCallbacks {
        calls: Mutex<Vec<Call>>,
        fail_on: Mutex<Option<QmCommand>>,
        fail_program: bool,
    }

    impl QmCallbacks for TestCallbacks {
        fn init_vport_wfq(&self, _first_tx_pq_id: &[u16; hw::NUM_OF_TCS], _weight: u16) -> QmResult<()> {
            Ok(())
        }

        fn init_pf_rl(&self, _pf_id: u8, _rate_mbps: u32) -> QmResult<()> {
            Ok(())
        }

        fn init_pf_wfq(&self, _pf_id: u8, _weight: u8) -> QmResult<()> {
            Ok(())
        }

        fn send_qm_cmd(&self, command: QmCommand, start_pq: u16, num_pqs: u16) -> QmResult<()> {
            if *self.fail_on.lock().unwrap() == Some(command) {
                return Err(QmError::timeout(format!("qm {}", command)));
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Cmd(command, start_pq, num_pqs));
            Ok(())
        }

        fn clear_runtime_data(&self) -> QmResult<()> {
            self.calls.lock().unwrap().push(Call::Clear);
            Ok(())
        }

        fn program_qm_pf(&self, runtime: &QmPfRuntime) -> QmResult<()> {
            if self.fail_program {
                return Err(QmError::busy("qm pf phase"));
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Program(runtime.start_pq, runtime.num_pqs));
            Ok(())
        }
    }

    fn function(callbacks: Arc<TestCallbacks>) -> QmFunction {
        let budget = ResourceBudget {
            pqs: ResourceGrant::new(16, 32),
            vports: ResourceGrant::new(1, 8),
            rate_limiters: ResourceGrant::new(1, 0),
        };
        let topology = ChipTopology {
            num_traffic_classes: 2,
            ..Default::default()
        };
        let mut func =
            QmFunction::new(EngineContext::new(0), FunctionProfile::default(), topology, budget);
        func.set_callbacks(callbacks);
        func.probe().unwrap();
        func
    }

    #[test]
    fn test_reconfigure_sequence() {
        let callbacks = Arc::new(TestCallbacks::default());
        let mut func = function(callbacks.clone());

        func.set_num_traffic_classes(4);
        func.reconfigure().unwrap();

        assert_eq!(
            callbacks.calls.lock().unwrap().clone(),
            vec![
                Call::Cmd(QmCommand::Stop, 32, 3),
                Call::Clear,
                Call::Program(32, 5),
                Call::Cmd(QmCommand::Release, 32, 5),
            ]
        );
        assert_eq!(func.state(), ReconfState::Idle);
        assert!(!func.queues_stopped());
        assert_eq!(func.stats().reconfigurations, 1);
    }

    #[test]
    fn test_stop_failure_is_surfaced() {
        let callbacks = Arc::new(TestCallbacks::default());
        *callbacks.fail_on.lock().unwrap() = Some(QmCommand::Stop);
        let mut func = function(callbacks.clone());

        let err = func.reconfigure().unwrap_err();
        assert!(err.is_retryable());
        assert!(!func.queues_stopped());
        assert!(callbacks.calls.lock().unwrap().is_empty());
        assert_eq!(func.state(), ReconfState::Idle);
    }

    #[test]
    fn test_program_failure_leaves_queues_stopped() {
        let callbacks = Arc::new(TestCallbacks {
            fail_program: true,
            ..Default::default()
        });
        let mut func = function(callbacks.clone());

        assert!(matches!(func.reconfigure(), Err(QmError::Busy { .. })));
        assert!(func.queues_stopped());
        assert_eq!(func.stats().reconfiguration_failures, 1);
        assert!(!callbacks
            .calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, Call::Cmd(QmCommand::Release, _, _))));
    }

    #[test]
    fn test_sanity_failure_drops_layout() {
        let callbacks = Arc::new(TestCallbacks::default());
        let mut func = function(callbacks.clone());

        // More classes than a port has.
        func.set_num_traffic_classes(12);
        assert!(matches!(
            func.reconfigure(),
            Err(QmError::InvalidConfig { .. })
        ));
        assert!(func.qm_info().is_none());
        assert!(func.queues_stopped());

        // A later successful pass starts the queues again; nothing to stop.
        func.set_num_traffic_classes(1);
        callbacks.calls.lock().unwrap().clear();
        func.reconfigure().unwrap();
        assert!(!func.queues_stopped());
        assert_eq!(
            callbacks.calls.lock().unwrap().first(),
            Some(&Call::Clear)
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ReconfState::Rebuilding.to_string(), "rebuilding");
    }
}
