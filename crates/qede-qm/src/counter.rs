//! Resource counting.
//!
//! Pure functions that decide which PQ groups a function needs and how many
//! PQs, vports and PF rate limiters the layout will consume. The planner
//! uses these numbers as the upper bounds of its overflow checks and the
//! validator compares them against the firmware budget.

use qede_types::{hw, ChipTopology, FunctionProfile, Personality, PqFlags, ResourceBudget};
use tracing::warn;

use crate::error::{QmError, QmResult};

/// Derives the PQ groups a function needs from its personality.
///
/// Loopback is always present and VF queues are added when SR-IOV is
/// active. The rate-limited group is not personality-driven, see
/// [`ResourceCounter::new`].
pub fn derive_flags(personality: &Personality, sriov_active: bool) -> QmResult<PqFlags> {
    let mut flags = PqFlags::LB;

    if sriov_active {
        flags |= PqFlags::VFS;
    }

    flags |= match personality {
        Personality::Eth => PqFlags::MCOS,
        Personality::Fcoe => PqFlags::OFLD,
        Personality::Iscsi => PqFlags::ACK | PqFlags::OOO | PqFlags::OFLD,
        Personality::EthRoce => PqFlags::MCOS | PqFlags::OFLD,
        Personality::EthIwarp => PqFlags::MCOS | PqFlags::ACK | PqFlags::OOO | PqFlags::OFLD,
        Personality::Unknown(tag) => {
            return Err(QmError::invalid_config(format!(
                "unknown personality {}",
                tag
            )));
        }
    };

    Ok(flags)
}

/// Resource requirements of one function under its current feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCounter {
    flags: PqFlags,
    num_tcs: u8,
    num_vfs: u16,
    num_rate_limited: u16,
    num_vports: u32,
    num_pqs: u32,
}

impl ResourceCounter {
    /// Computes the requirements of a function.
    ///
    /// The flag set is [`derive_flags`] plus [`PqFlags::RLS`] when the
    /// profile turns left-over rate limiters into PF rate-limited PQs.
    pub fn new(
        profile: &FunctionProfile,
        topology: &ChipTopology,
        budget: &ResourceBudget,
    ) -> QmResult<Self> {
        let mut flags = derive_flags(&profile.personality, profile.sriov.active)?;
        if profile.rate_limited_pqs {
            flags |= PqFlags::RLS;
        }

        Ok(Self::from_parts(
            flags,
            topology.num_traffic_classes,
            profile.sriov.num_vfs(),
            budget.rate_limiters.count,
            budget.vports.count,
        ))
    }

    /// Computes the requirements of an explicit flag set.
    pub fn from_parts(
        flags: PqFlags,
        num_tcs: u8,
        num_vfs: u16,
        rate_limiter_budget: u16,
        vport_budget: u16,
    ) -> Self {
        let num_rate_limited = rate_limited_pqs(rate_limiter_budget, vport_budget, num_vfs);
        let group = |flag: PqFlags, amount: u32| -> u32 {
            if flags.contains(flag) {
                amount
            } else {
                0
            }
        };

        let num_vports = 1
            + group(PqFlags::RLS, num_rate_limited as u32)
            + group(PqFlags::VFS, num_vfs as u32);

        let num_pqs = group(PqFlags::RLS, num_rate_limited as u32)
            + group(PqFlags::MCOS, num_tcs as u32)
            + group(PqFlags::LB, 1)
            + group(PqFlags::OOO, 1)
            + group(PqFlags::ACK, 1)
            + group(PqFlags::OFLD, 1)
            + group(PqFlags::VFS, num_vfs as u32);

        Self {
            flags,
            num_tcs,
            num_vfs,
            num_rate_limited,
            num_vports,
            num_pqs,
        }
    }

    /// PQ groups the function needs.
    pub fn flags(&self) -> PqFlags {
        self.flags
    }

    /// Active traffic classes.
    pub fn num_tcs(&self) -> u8 {
        self.num_tcs
    }

    /// VFs that need queues.
    pub fn num_vfs(&self) -> u16 {
        self.num_vfs
    }

    /// Rate limiters left for PF rate-limited PQs.
    pub fn count_rate_limited_pqs(&self) -> u16 {
        self.num_rate_limited
    }

    /// Vports the layout consumes: one shared vport plus one per
    /// rate-limited PQ and one per VF.
    ///
    /// Wider than a vport index; the validator rejects totals that do not
    /// fit the budget.
    pub fn count_vports(&self) -> u32 {
        self.num_vports
    }

    /// PQs the layout consumes.
    pub fn count_pqs(&self) -> u32 {
        self.num_pqs
    }
}

/// Rate limiters left after reserving one per VF and one default.
fn rate_limited_pqs(rate_limiter_budget: u16, vport_budget: u16, num_vfs: u16) -> u16 {
    let available = rate_limiter_budget.min(vport_budget) as u32;
    let reserved = num_vfs as u32 + hw::NUM_DEFAULT_RLS as u32;

    if available < reserved {
        warn!(
            "no rate limiters left for PF rate limiting [num_pf_rls {} num_vfs {}]",
            available, num_vfs
        );
        return 0;
    }

    (available - reserved) as u16
}
