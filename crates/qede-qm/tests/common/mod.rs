//! Shared fixtures for the qede-qm integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use qede_qm::{EngineContext, QmCallbacks, QmCommand, QmFunction, QmPfRuntime, QmResult};
use qede_types::{hw, ChipTopology, FunctionProfile, ResourceBudget, ResourceGrant};

/// Something the mock hardware was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    VportWfq { head_pq: u16, weight: u16 },
    PfRl { pf_id: u8, rate: u32 },
    PfWfq { pf_id: u8, weight: u8 },
    Cmd { command: QmCommand, start_pq: u16, num_pqs: u16 },
    ClearRuntime,
    Program { pf_id: u8, num_pqs: u16 },
}

/// Mock hardware recording every call.
///
/// Commands may be slowed down to widen race windows; the number of
/// commands in flight at once is tracked so tests can check that the engine
/// lock serializes them.
#[derive(Default)]
pub struct MockQm {
    pub events: Mutex<Vec<Event>>,
    pub cmd_delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockQm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_cmd_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            cmd_delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn vport_weights(&self) -> Vec<u16> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::VportWfq { weight, .. } => Some(*weight),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl QmCallbacks for MockQm {
    fn init_vport_wfq(&self, first_tx_pq_id: &[u16; hw::NUM_OF_TCS], weight: u16) -> QmResult<()> {
        self.record(Event::VportWfq {
            head_pq: first_tx_pq_id[0],
            weight,
        });
        Ok(())
    }

    fn init_pf_rl(&self, pf_id: u8, rate_mbps: u32) -> QmResult<()> {
        self.record(Event::PfRl {
            pf_id,
            rate: rate_mbps,
        });
        Ok(())
    }

    fn init_pf_wfq(&self, pf_id: u8, weight: u8) -> QmResult<()> {
        self.record(Event::PfWfq { pf_id, weight });
        Ok(())
    }

    fn send_qm_cmd(&self, command: QmCommand, start_pq: u16, num_pqs: u16) -> QmResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.cmd_delay {
            thread::sleep(delay);
        }
        self.record(Event::Cmd {
            command,
            start_pq,
            num_pqs,
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear_runtime_data(&self) -> QmResult<()> {
        self.record(Event::ClearRuntime);
        Ok(())
    }

    fn program_qm_pf(&self, runtime: &QmPfRuntime) -> QmResult<()> {
        self.record(Event::Program {
            pf_id: runtime.pf_id,
            num_pqs: runtime.num_pqs,
        });
        Ok(())
    }
}

pub fn budget(pqs: u16, vports: u16, rate_limiters: u16) -> ResourceBudget {
    ResourceBudget {
        pqs: ResourceGrant::new(pqs, 0),
        vports: ResourceGrant::new(vports, 0),
        rate_limiters: ResourceGrant::new(rate_limiters, 0),
    }
}

/// A probed function with callbacks attached.
pub fn probed_function(
    engine: Arc<EngineContext>,
    profile: FunctionProfile,
    topology: ChipTopology,
    budget: ResourceBudget,
    callbacks: Arc<MockQm>,
) -> QmFunction {
    let mut func = QmFunction::new(engine, profile, topology, budget);
    func.set_callbacks(callbacks);
    func.probe().expect("probe");
    func
}
