//! Collaborator interface towards hardware and firmware.

use qede_types::hw;

use crate::error::QmResult;
use crate::types::{PortParams, PqParams, QmInfo, VportParams};

/// Queue-manager command sent to firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QmCommand {
    /// Stop transmission on a PQ range.
    Stop,
    /// Release (start) a PQ range.
    Release,
}

impl QmCommand {
    /// Returns the command name used in diagnostics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            QmCommand::Stop => "stop",
            QmCommand::Release => "release",
        }
    }
}

impl std::fmt::Display for QmCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Staging copy of a layout, handed to the per-function programming phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QmPfRuntime {
    /// PF being programmed.
    pub pf_id: u8,
    /// First absolute PQ of the function.
    pub start_pq: u16,
    /// PQs in the layout, VF PQs included.
    pub num_pqs: u16,
    /// PQs that belong to VFs.
    pub num_vf_pqs: u16,
    /// First absolute vport of the function.
    pub start_vport: u16,
    /// Vports in the layout.
    pub num_vports: u16,
    /// PF WFQ weight, percent.
    pub pf_wfq: u8,
    /// PF rate limit, Mbps.
    pub pf_rl: u32,
    /// Enables the PF rate limiter.
    pub pf_rl_en: bool,
    /// Enables PF WFQ.
    pub pf_wfq_en: bool,
    /// Enables vport rate limiters.
    pub vport_rl_en: bool,
    /// Enables vport WFQ.
    pub vport_wfq_en: bool,
    /// Physical traffic classes per port.
    pub max_phys_tcs_per_port: u8,
    /// Per-PQ parameters, indexed relative to `start_pq`.
    pub pq_params: Vec<PqParams>,
    /// Per-vport parameters, indexed relative to `start_vport`.
    pub vport_params: Vec<VportParams>,
    /// Per-port buffer split of the engine.
    pub port_params: Vec<PortParams>,
}

impl From<&QmInfo> for QmPfRuntime {
    fn from(qm: &QmInfo) -> Self {
        Self {
            pf_id: qm.pf_id,
            start_pq: qm.start_pq,
            num_pqs: qm.num_pqs,
            num_vf_pqs: qm.num_vf_pqs,
            start_vport: qm.start_vport,
            num_vports: qm.num_vports,
            pf_wfq: qm.pf_wfq,
            pf_rl: qm.pf_rl,
            pf_rl_en: qm.pf_rl_en,
            pf_wfq_en: qm.pf_wfq_en,
            vport_rl_en: qm.vport_rl_en,
            vport_wfq_en: qm.vport_wfq_en,
            max_phys_tcs_per_port: qm.max_phys_tcs_per_port,
            pq_params: qm.qm_pq_params.clone(),
            vport_params: qm
                .qm_vport_params
                .iter()
                .take(qm.num_vports as usize)
                .copied()
                .collect(),
            port_params: qm.qm_port_params.clone(),
        }
    }
}

/// Callbacks for queue-manager operations.
///
/// Implementations own register access and the firmware mailbox. Errors
/// they return are surfaced to the caller unchanged; the core never
/// retries.
pub trait QmCallbacks: Send + Sync {
    /// Writes a vport WFQ weight to every traffic class head PQ.
    fn init_vport_wfq(&self, first_tx_pq_id: &[u16; hw::NUM_OF_TCS], weight: u16) -> QmResult<()>;

    /// Writes the PF rate limit in Mbps.
    fn init_pf_rl(&self, pf_id: u8, rate_mbps: u32) -> QmResult<()>;

    /// Writes the PF WFQ weight (percent).
    fn init_pf_wfq(&self, pf_id: u8, weight: u8) -> QmResult<()>;

    /// Sends a stop or release command for a PQ range.
    fn send_qm_cmd(&self, command: QmCommand, start_pq: u16, num_pqs: u16) -> QmResult<()>;

    /// Clears leftovers of the previous per-function programming phase.
    fn clear_runtime_data(&self) -> QmResult<()>;

    /// Runs the per-function programming phase on a staged layout.
    fn program_qm_pf(&self, runtime: &QmPfRuntime) -> QmResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(QmCommand::Stop.to_string(), "stop");
        assert_eq!(QmCommand::Release.to_string(), "release");
    }
}
