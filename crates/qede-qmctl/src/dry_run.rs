//! Dry-run collaborator: logs every hardware operation instead of
//! performing it and keeps a journal the CLI can print.

use std::sync::Mutex;

use qede_qm::{QmCallbacks, QmCommand, QmPfRuntime, QmResult};
use qede_types::hw;
use serde::Serialize;
use tracing::{debug, info};

/// One operation the planner asked the hardware to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DryRunOp {
    /// Vport WFQ weight written for the PQs headed by `first_tx_pq_id`.
    VportWfq {
        first_tx_pq_id: Vec<u16>,
        weight: u16,
    },
    /// PF rate limit.
    PfRl {
        pf_id: u8,
        rate_mbps: u32,
    },
    /// PF WFQ weight.
    PfWfq {
        pf_id: u8,
        weight: u8,
    },
    /// Stop or release command over a PQ range.
    QmCmd {
        command: String,
        start_pq: u16,
        num_pqs: u16,
    },
    /// Runtime staging area cleared.
    ClearRuntime,
    /// A function's layout programmed.
    ProgramPf {
        pf_id: u8,
        start_pq: u16,
        num_pqs: u16,
        num_vports: u16,
    },
}

/// Collaborator that records instead of programming.
#[derive(Debug, Default)]
pub struct DryRunCallbacks {
    journal: Mutex<Vec<DryRunOp>>,
}

impl DryRunCallbacks {
    /// Creates a collaborator with an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the operations recorded so far.
    pub fn journal(&self) -> Vec<DryRunOp> {
        self.lock().clone()
    }

    /// Drains the journal.
    pub fn take_journal(&self) -> Vec<DryRunOp> {
        std::mem::take(&mut *self.lock())
    }

    fn record(&self, op: DryRunOp) {
        self.lock().push(op);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DryRunOp>> {
        self.journal
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl QmCallbacks for DryRunCallbacks {
    fn init_vport_wfq(&self, first_tx_pq_id: &[u16; hw::NUM_OF_TCS], weight: u16) -> QmResult<()> {
        debug!("init vport wfq: heads {:?} weight {}", first_tx_pq_id, weight);
        self.record(DryRunOp::VportWfq {
            first_tx_pq_id: first_tx_pq_id.to_vec(),
            weight,
        });
        Ok(())
    }

    fn init_pf_rl(&self, pf_id: u8, rate_mbps: u32) -> QmResult<()> {
        debug!("init pf {} rl: {} Mb/sec", pf_id, rate_mbps);
        self.record(DryRunOp::PfRl { pf_id, rate_mbps });
        Ok(())
    }

    fn init_pf_wfq(&self, pf_id: u8, weight: u8) -> QmResult<()> {
        debug!("init pf {} wfq: weight {}", pf_id, weight);
        self.record(DryRunOp::PfWfq { pf_id, weight });
        Ok(())
    }

    fn send_qm_cmd(&self, command: QmCommand, start_pq: u16, num_pqs: u16) -> QmResult<()> {
        info!("qm {} [start_pq {} num_pqs {}]", command, start_pq, num_pqs);
        self.record(DryRunOp::QmCmd {
            command: command.as_str().to_string(),
            start_pq,
            num_pqs,
        });
        Ok(())
    }

    fn clear_runtime_data(&self) -> QmResult<()> {
        debug!("clear runtime data");
        self.record(DryRunOp::ClearRuntime);
        Ok(())
    }

    fn program_qm_pf(&self, runtime: &QmPfRuntime) -> QmResult<()> {
        info!(
            "program pf {} [start_pq {} num_pqs {} num_vports {}]",
            runtime.pf_id, runtime.start_pq, runtime.num_pqs, runtime.num_vports
        );
        self.record(DryRunOp::ProgramPf {
            pf_id: runtime.pf_id,
            start_pq: runtime.start_pq,
            num_pqs: runtime.num_pqs,
            num_vports: runtime.num_vports,
        });
        Ok(())
    }
}
