//! Allocation planner.
//!
//! Builds the PQ, vport and port tables of one function in the order the
//! firmware expects:
//!
//! 1. rate-limited PQs, each on its own vport
//! 2. multi-cos PQs, one per traffic class
//! 3. loopback, out-of-order, pure-ack and offload PQs
//! 4. VF PQs, each on its own vport
//!
//! Everything from step 2 through step 3 shares a single vport. Rate-limited
//! PQs must stay first; the firmware locates them by position.

use qede_types::{
    hw, ChipTopology, FunctionProfile, OverflowPolicy, PqFlags, ResourceBudget, ResourceKind,
};
use tracing::{debug, error};

use crate::counter::ResourceCounter;
use crate::error::{QmError, QmResult};
use crate::types::{Overflow, PortParams, PqParams, QmInfo, VportParams, WfqData};
use crate::validator::check_sanity;

/// Everything a planning pass reads.
#[derive(Debug, Clone, Copy)]
pub struct PlanInputs<'a> {
    /// The function being planned.
    pub profile: &'a FunctionProfile,
    /// Engine topology.
    pub topology: &'a ChipTopology,
    /// Firmware-granted resources.
    pub budget: &'a ResourceBudget,
}

impl<'a> PlanInputs<'a> {
    /// Creates planning inputs.
    pub fn new(
        profile: &'a FunctionProfile,
        topology: &'a ChipTopology,
        budget: &'a ResourceBudget,
    ) -> Self {
        Self {
            profile,
            topology,
            budget,
        }
    }

    /// Resource requirements under the current inputs.
    pub fn counter(&self) -> QmResult<ResourceCounter> {
        ResourceCounter::new(self.profile, self.topology, self.budget)
    }
}

/// Rate limiter attached to a PQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PqRateLimit {
    /// No rate limiter.
    None,
    /// One of the PF rate limiters.
    Pf,
    /// The VF's own rate limiter.
    Vf,
}

impl PqRateLimit {
    fn is_valid(self) -> bool {
        !matches!(self, PqRateLimit::None)
    }
}

/// Upper bounds of a pass, taken from the resource counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct PlanLimits {
    pub(crate) pqs: u32,
    pub(crate) vports: u32,
    pub(crate) pf_rls: u32,
}

impl From<&ResourceCounter> for PlanLimits {
    fn from(counter: &ResourceCounter) -> Self {
        Self {
            pqs: counter.count_pqs(),
            vports: counter.count_vports(),
            pf_rls: u32::from(counter.count_rate_limited_pqs()),
        }
    }
}

impl QmInfo {
    /// Allocates the tables of a function, sized to the maximum its current
    /// feature set can use. The tables are empty until [`init_qm_info`]
    /// runs.
    ///
    /// [`init_qm_info`]: QmInfo::init_qm_info
    pub fn new(inputs: &PlanInputs<'_>) -> QmResult<Self> {
        let counter = inputs.counter()?;
        let num_vports = counter.count_vports() as usize;

        Ok(Self {
            pf_id: inputs.profile.pf_id,
            start_pq: 0,
            start_vport: 0,
            num_pqs: 0,
            num_vports: 0,
            num_pf_rls: 0,
            num_vf_pqs: 0,
            pure_lb_pq: 0,
            ooo_pq: 0,
            pure_ack_pq: 0,
            offload_pq: 0,
            first_mcos_pq: 0,
            first_rl_pq: 0,
            first_vf_pq: 0,
            pf_rl_en: false,
            pf_wfq_en: false,
            vport_rl_en: false,
            vport_wfq_en: false,
            pf_wfq: 0,
            pf_rl: 0,
            max_phys_tcs_per_port: 0,
            ooo_tc: 0,
            pq_flags: counter.flags(),
            num_tcs: counter.num_tcs(),
            qm_pq_params: Vec::with_capacity(counter.count_pqs() as usize),
            qm_vport_params: vec![VportParams::default(); num_vports],
            qm_port_params: vec![PortParams::default(); inputs.topology.num_ports as usize],
            wfq_data: vec![WfqData::default(); num_vports],
            overflows: Vec::new(),
            limits: PlanLimits::from(&counter),
        })
    }

    /// Runs a complete planning pass.
    ///
    /// The layout is checked against the budget before any table is
    /// touched; a failed check leaves the previous layout in place and the
    /// caller is expected to drop it.
    pub fn init_qm_info(&mut self, inputs: &PlanInputs<'_>) -> QmResult<()> {
        let counter = inputs.counter()?;
        check_sanity(&counter, inputs.budget, inputs.topology)?;

        self.fit_tables(&counter, inputs.topology);
        self.reset();
        self.set_top_level_params(inputs, &counter);
        self.set_port_params(inputs.topology);
        self.set_default_vport_weights();
        self.build_pq_groups(&counter, inputs.profile.offload_tc)?;
        self.log_layout();

        if inputs.profile.overflow_policy == OverflowPolicy::Strict {
            if let Some(overflow) = self.overflows.first() {
                return Err(QmError::resource_exhausted(
                    overflow.resource,
                    overflow.count,
                    overflow.max,
                ));
            }
        }

        Ok(())
    }

    /// Resizes the tables when the feature set changed since the last pass.
    /// WFQ bookkeeping of surviving vports is kept.
    fn fit_tables(&mut self, counter: &ResourceCounter, topology: &ChipTopology) {
        let num_vports = counter.count_vports() as usize;
        if self.qm_vport_params.len() != num_vports {
            debug!(
                "resizing vport tables [{} -> {}]",
                self.qm_vport_params.len(),
                num_vports
            );
            self.qm_vport_params
                .resize(num_vports, VportParams::default());
            self.wfq_data.resize(num_vports, WfqData::default());
        }

        let num_pqs = counter.count_pqs() as usize;
        if self.qm_pq_params.capacity() < num_pqs {
            self.qm_pq_params.reserve(num_pqs - self.qm_pq_params.len());
        }

        if self.qm_port_params.len() != topology.num_ports as usize {
            self.qm_port_params
                .resize(topology.num_ports as usize, PortParams::default());
        }
    }

    /// Clears every counter and group base, keeping table capacity.
    pub fn reset(&mut self) {
        self.num_pqs = 0;
        self.num_vports = 0;
        self.num_pf_rls = 0;
        self.num_vf_pqs = 0;
        self.pure_lb_pq = 0;
        self.ooo_pq = 0;
        self.pure_ack_pq = 0;
        self.offload_pq = 0;
        self.first_mcos_pq = 0;
        self.first_rl_pq = 0;
        self.first_vf_pq = 0;
        self.qm_pq_params.clear();
        self.overflows.clear();
    }

    /// Sets base offsets, feature toggles and topology-derived classes.
    pub fn set_top_level_params(&mut self, inputs: &PlanInputs<'_>, counter: &ResourceCounter) {
        self.pf_id = inputs.profile.pf_id;
        self.start_pq = inputs.budget.pqs.start;
        self.start_vport = inputs.budget.vports.start;

        self.pf_rl_en = true;
        self.pf_wfq_en = true;
        self.vport_rl_en = true;
        self.vport_wfq_en = true;

        self.max_phys_tcs_per_port = inputs.topology.max_phys_tcs_per_port();
        self.ooo_tc = inputs
            .profile
            .ooo_tc
            .unwrap_or_else(|| inputs.topology.default_ooo_tc());

        self.pq_flags = counter.flags();
        self.num_tcs = counter.num_tcs();
        self.limits = PlanLimits::from(counter);
    }

    /// Splits the per-engine buffer budgets evenly across the ports.
    pub fn set_port_params(&mut self, topology: &ChipTopology) {
        let num_ports = topology.num_ports as u32;
        if num_ports == 0 {
            return;
        }

        let active_phys_tcs = topology.active_tcs_bitmap();
        for port in self.qm_port_params.iter_mut() {
            *port = PortParams {
                active: true,
                active_phys_tcs,
                num_pbf_cmd_lines: hw::PBF_MAX_CMD_LINES / num_ports,
                num_btb_blocks: hw::BTB_MAX_BLOCKS / num_ports,
            };
        }
    }

    /// Gives every vport slot weight 1 and no head PQs.
    pub fn set_default_vport_weights(&mut self) {
        for vport in self.qm_vport_params.iter_mut() {
            *vport = VportParams::default();
        }
    }

    /// Builds every PQ group the function needs.
    pub fn build_pq_groups(&mut self, counter: &ResourceCounter, offload_tc: u8) -> QmResult<()> {
        let flags = counter.flags();

        // Must come first.
        if flags.contains(PqFlags::RLS) {
            self.record_group_base(PqFlags::RLS, self.num_pqs)?;
            for _ in 0..counter.count_rate_limited_pqs() {
                self.append_pq(offload_tc, false, PqRateLimit::Pf);
            }
        }

        if flags.contains(PqFlags::MCOS) {
            self.record_group_base(PqFlags::MCOS, self.num_pqs)?;
            for tc in 0..counter.num_tcs() {
                self.append_pq(tc, true, PqRateLimit::None);
            }
        }

        if flags.contains(PqFlags::LB) {
            self.record_group_base(PqFlags::LB, self.num_pqs)?;
            self.append_pq(hw::PURE_LB_TC, true, PqRateLimit::None);
        }

        if flags.contains(PqFlags::OOO) {
            self.record_group_base(PqFlags::OOO, self.num_pqs)?;
            self.append_pq(self.ooo_tc, true, PqRateLimit::None);
        }

        if flags.contains(PqFlags::ACK) {
            self.record_group_base(PqFlags::ACK, self.num_pqs)?;
            self.append_pq(offload_tc, true, PqRateLimit::None);
        }

        if flags.contains(PqFlags::OFLD) {
            self.record_group_base(PqFlags::OFLD, self.num_pqs)?;
            self.append_pq(offload_tc, true, PqRateLimit::None);
        }

        self.advance_vport();

        if flags.contains(PqFlags::VFS) {
            self.record_group_base(PqFlags::VFS, self.num_pqs)?;
            self.num_vf_pqs = counter.num_vfs();
            for _ in 0..counter.num_vfs() {
                self.append_pq(hw::PQ_DEFAULT_TC, false, PqRateLimit::Vf);
            }
        }

        Ok(())
    }

    /// Appends one PQ and does the resource accounting.
    ///
    /// The PQ lands on the current vport. Unless `share_vport` is set the
    /// vport is closed afterwards, so the next PQ gets a fresh one.
    pub fn append_pq(&mut self, tc: u8, share_vport: bool, rate_limit: PqRateLimit) {
        let pq_idx = self.num_pqs;
        let vport_idx = self.num_vports;

        self.qm_pq_params.push(PqParams {
            vport_id: self.start_vport.wrapping_add(vport_idx),
            tc_id: tc,
            wrr_group: hw::PQ_DEFAULT_WRR_GROUP,
            rl_valid: rate_limit.is_valid(),
        });

        if let Some(vport) = self.qm_vport_params.get_mut(vport_idx as usize) {
            if let Some(head) = vport.first_tx_pq_id.get_mut(tc as usize) {
                if *head == hw::QM_INVALID_PQ_ID {
                    *head = self.start_pq.wrapping_add(pq_idx);
                }
            }
        }

        // Totals stick at the index width; the validator keeps a checked
        // pass below it.
        self.num_pqs = self.num_pqs.saturating_add(1);
        if !share_vport {
            self.num_vports = self.num_vports.saturating_add(1);
        }
        if rate_limit == PqRateLimit::Pf {
            self.num_pf_rls = self.num_pf_rls.saturating_add(1);
        }

        self.check_limit(ResourceKind::Pq, self.num_pqs, self.limits.pqs);
        self.check_limit(ResourceKind::Vport, self.num_vports, self.limits.vports);
        self.check_limit(ResourceKind::RateLimiter, self.num_pf_rls, self.limits.pf_rls);
    }

    /// Closes the shared vport.
    fn advance_vport(&mut self) {
        self.num_vports = self.num_vports.saturating_add(1);
        self.check_limit(ResourceKind::Vport, self.num_vports, self.limits.vports);
    }

    fn check_limit(&mut self, resource: ResourceKind, count: u16, max: u32) {
        if u32::from(count) > max {
            self.note_overflow(resource, u32::from(count), max);
        }
    }

    fn note_overflow(&mut self, resource: ResourceKind, count: u32, max: u32) {
        error!("{} overflow! count {}, max {}", resource, count, max);
        self.overflows.push(Overflow {
            resource,
            count,
            max,
        });
    }

    /// Stores the absolute index of the first PQ of a group.
    pub fn record_group_base(&mut self, flag: PqFlags, pq_val: u16) -> QmResult<()> {
        let start_pq = self.start_pq;
        let slot = self.group_base_mut(flag)?;
        *slot = start_pq.wrapping_add(pq_val);
        Ok(())
    }

    /// Absolute index of the first PQ of a group.
    pub fn group_base(&self, flag: PqFlags) -> QmResult<u16> {
        let base = if flag == PqFlags::RLS {
            self.first_rl_pq
        } else if flag == PqFlags::MCOS {
            self.first_mcos_pq
        } else if flag == PqFlags::LB {
            self.pure_lb_pq
        } else if flag == PqFlags::OOO {
            self.ooo_pq
        } else if flag == PqFlags::ACK {
            self.pure_ack_pq
        } else if flag == PqFlags::OFLD {
            self.offload_pq
        } else if flag == PqFlags::VFS {
            self.first_vf_pq
        } else {
            return Err(bad_pq_flags(flag));
        };
        Ok(base)
    }

    fn group_base_mut(&mut self, flag: PqFlags) -> QmResult<&mut u16> {
        let slot = if flag == PqFlags::RLS {
            &mut self.first_rl_pq
        } else if flag == PqFlags::MCOS {
            &mut self.first_mcos_pq
        } else if flag == PqFlags::LB {
            &mut self.pure_lb_pq
        } else if flag == PqFlags::OOO {
            &mut self.ooo_pq
        } else if flag == PqFlags::ACK {
            &mut self.pure_ack_pq
        } else if flag == PqFlags::OFLD {
            &mut self.offload_pq
        } else if flag == PqFlags::VFS {
            &mut self.first_vf_pq
        } else {
            return Err(bad_pq_flags(flag));
        };
        Ok(slot)
    }

    /// Context PQ index of a single-PQ group, with the transmit base added.
    pub fn cm_pq_idx(&self, flag: PqFlags) -> QmResult<u16> {
        let base = self.group_base(flag)?;
        if !self.pq_flags.contains(flag) {
            return Err(QmError::invalid_config(format!(
                "pq group {} is not part of the layout ({})",
                flag, self.pq_flags
            )));
        }
        Ok(base.wrapping_add(hw::CM_TX_PQ_BASE))
    }

    /// Context PQ index of a multi-cos traffic class.
    pub fn cm_pq_idx_mcos(&self, tc: u8) -> QmResult<u16> {
        if tc >= self.num_tcs {
            return Err(QmError::invalid_config(format!(
                "tc {} must be smaller than {}",
                tc, self.num_tcs
            )));
        }
        Ok(self.cm_pq_idx(PqFlags::MCOS)?.wrapping_add(u16::from(tc)))
    }

    /// Context PQ index of a VF.
    pub fn cm_pq_idx_vf(&self, vf: u16) -> QmResult<u16> {
        if vf >= self.num_vf_pqs {
            return Err(QmError::invalid_config(format!(
                "vf {} must be smaller than {}",
                vf, self.num_vf_pqs
            )));
        }
        Ok(self.cm_pq_idx(PqFlags::VFS)?.wrapping_add(vf))
    }

    /// Context PQ index of a PF rate-limited PQ.
    pub fn cm_pq_idx_rl(&self, rl: u16) -> QmResult<u16> {
        if rl >= self.num_pf_rls {
            return Err(QmError::invalid_config(format!(
                "rl {} must be smaller than {}",
                rl, self.num_pf_rls
            )));
        }
        Ok(self.cm_pq_idx(PqFlags::RLS)?.wrapping_add(rl))
    }

    /// Dumps the layout at debug level.
    pub fn log_layout(&self) {
        debug!(
            "qm init top level params: start_pq {}, start_vport {}, pure_lb_pq {}, offload_pq {}, pure_ack_pq {}",
            self.start_pq, self.start_vport, self.pure_lb_pq, self.offload_pq, self.pure_ack_pq
        );
        debug!(
            "ooo_pq {}, first_vf_pq {}, num_pqs {}, num_vf_pqs {}, num_vports {}, max_phys_tcs_per_port {}",
            self.ooo_pq,
            self.first_vf_pq,
            self.num_pqs,
            self.num_vf_pqs,
            self.num_vports,
            self.max_phys_tcs_per_port
        );
        debug!(
            "pf_rl_en {}, pf_wfq_en {}, vport_rl_en {}, vport_wfq_en {}, pf_wfq {}, pf_rl {}, num_pf_rls {}, pq_flags {}",
            self.pf_rl_en,
            self.pf_wfq_en,
            self.vport_rl_en,
            self.vport_wfq_en,
            self.pf_wfq,
            self.pf_rl,
            self.num_pf_rls,
            self.pq_flags
        );

        for (i, port) in self.qm_port_params.iter().enumerate() {
            debug!(
                "port idx {}, active {}, active_phys_tcs {:#x}, num_pbf_cmd_lines {}, num_btb_blocks {}",
                i, port.active, port.active_phys_tcs, port.num_pbf_cmd_lines, port.num_btb_blocks
            );
        }

        for (i, vport) in self
            .qm_vport_params
            .iter()
            .take(self.num_vports as usize)
            .enumerate()
        {
            debug!(
                "vport idx {}, vport_rl {}, wfq {}, first_tx_pq_id {:?}",
                self.start_vport as usize + i,
                vport.vport_rl,
                vport.vport_wfq,
                vport.first_tx_pq_id
            );
        }

        for (i, pq) in self.qm_pq_params.iter().enumerate() {
            debug!(
                "pq idx {}, vport_id {}, tc {}, wrr_grp {}, rl_valid {}",
                self.start_pq as usize + i,
                pq.vport_id,
                pq.tc_id,
                pq.wrr_group,
                pq.rl_valid
            );
        }
    }
}

fn bad_pq_flags(flag: PqFlags) -> QmError {
    error!("BAD pq flags {}", flag);
    QmError::internal(format!("expected a single pq group, got {}", flag))
}
