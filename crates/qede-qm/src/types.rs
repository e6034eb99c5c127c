//! Queue-manager planning tables.

use qede_types::{hw, PqFlags, ResourceKind};
use serde::Serialize;

use crate::planner::PlanLimits;

/// One physical queue of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PqParams {
    /// Absolute vport the PQ belongs to.
    pub vport_id: u16,
    /// Traffic class.
    pub tc_id: u8,
    /// Weighted round-robin group.
    pub wrr_group: u8,
    /// Whether the PQ is attached to a rate limiter.
    pub rl_valid: bool,
}

/// One virtual port of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VportParams {
    /// Vport rate limit in Mbps (0 leaves it unlimited).
    pub vport_rl: u32,
    /// WFQ weight.
    pub vport_wfq: u16,
    /// Absolute id of the first PQ of each traffic class on this vport.
    pub first_tx_pq_id: [u16; hw::NUM_OF_TCS],
}

impl Default for VportParams {
    fn default() -> Self {
        Self {
            vport_rl: 0,
            vport_wfq: 1,
            first_tx_pq_id: [hw::QM_INVALID_PQ_ID; hw::NUM_OF_TCS],
        }
    }
}

impl VportParams {
    /// Returns true if at least one traffic class has a PQ on this vport.
    pub fn has_pqs(&self) -> bool {
        self.first_tx_pq_id
            .iter()
            .any(|&id| id != hw::QM_INVALID_PQ_ID)
    }
}

/// Per-port scheduling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PortParams {
    /// Whether the port is active.
    pub active: bool,
    /// Bitmap of active physical traffic classes.
    pub active_phys_tcs: u8,
    /// Packet buffer command lines owned by the port.
    pub num_pbf_cmd_lines: u32,
    /// Buffer blocks owned by the port.
    pub num_btb_blocks: u32,
}

/// WFQ bookkeeping of one vport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WfqData {
    /// Minimum rate in Mbps, requested or distributed.
    pub min_speed: u32,
    /// Whether `min_speed` was requested explicitly.
    pub configured: bool,
}

/// Running total that went past its computed maximum while building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overflow {
    /// The resource that overflowed.
    pub resource: ResourceKind,
    /// Running total when the overflow was detected.
    pub count: u32,
    /// Computed maximum.
    pub max: u32,
}

/// Queue-manager layout of one hardware function.
///
/// The tables are sized when the function is probed and rebuilt in place on
/// every planning pass. `wfq_data` is not touched by the planner and keeps
/// its contents across passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QmInfo {
    /// Relative PF id.
    pub pf_id: u8,
    /// First absolute PQ of the function.
    pub start_pq: u16,
    /// First absolute vport of the function.
    pub start_vport: u16,

    /// PQs built in the current pass.
    pub num_pqs: u16,
    /// Vports consumed in the current pass.
    pub num_vports: u16,
    /// PF rate limiters consumed in the current pass.
    pub num_pf_rls: u16,
    /// VF PQs built in the current pass.
    pub num_vf_pqs: u16,

    /// Absolute index of the loopback PQ.
    pub pure_lb_pq: u16,
    /// Absolute index of the out-of-order PQ.
    pub ooo_pq: u16,
    /// Absolute index of the pure-ack PQ.
    pub pure_ack_pq: u16,
    /// Absolute index of the offload PQ.
    pub offload_pq: u16,
    /// Absolute index of the first multi-cos PQ.
    pub first_mcos_pq: u16,
    /// Absolute index of the first rate-limited PQ.
    pub first_rl_pq: u16,
    /// Absolute index of the first VF PQ.
    pub first_vf_pq: u16,

    /// PF rate limiting enabled.
    pub pf_rl_en: bool,
    /// PF WFQ enabled.
    pub pf_wfq_en: bool,
    /// Vport rate limiting enabled.
    pub vport_rl_en: bool,
    /// Vport WFQ enabled.
    pub vport_wfq_en: bool,
    /// PF WFQ weight, percent.
    pub pf_wfq: u8,
    /// PF rate limit, Mbps.
    pub pf_rl: u32,

    /// Physical traffic classes per port.
    pub max_phys_tcs_per_port: u8,
    /// Out-of-order traffic class.
    pub ooo_tc: u8,

    /// PQ groups the layout was built with.
    pub pq_flags: PqFlags,
    /// Multi-cos traffic classes.
    pub num_tcs: u8,

    /// PQ table.
    pub qm_pq_params: Vec<PqParams>,
    /// Vport table.
    pub qm_vport_params: Vec<VportParams>,
    /// Port table.
    pub qm_port_params: Vec<PortParams>,
    /// WFQ bookkeeping, one entry per vport.
    pub wfq_data: Vec<WfqData>,

    /// Overflows detected during the last pass.
    pub overflows: Vec<Overflow>,

    #[serde(skip)]
    pub(crate) limits: PlanLimits,
}

impl QmInfo {
    /// Absolute PQ range owned by the function in the current layout.
    pub fn pq_range(&self) -> (u16, u16) {
        (self.start_pq, self.num_pqs)
    }

    /// Returns true if the last pass hit an overflow.
    pub fn has_overflow(&self) -> bool {
        !self.overflows.is_empty()
    }
}
