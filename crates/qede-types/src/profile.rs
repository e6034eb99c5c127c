//! Service description of one hardware function.

use crate::{ParseError, Personality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SR-IOV state of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SriovState {
    /// Whether SR-IOV is enabled on the function.
    #[serde(default)]
    pub active: bool,
    /// Total VFs the function exposes.
    #[serde(default)]
    pub total_vfs: u16,
}

impl SriovState {
    /// Creates an active SR-IOV state with `total_vfs` VFs.
    pub const fn with_vfs(total_vfs: u16) -> Self {
        Self {
            active: true,
            total_vfs,
        }
    }

    /// VFs that need queues (zero when SR-IOV is inactive).
    pub const fn num_vfs(&self) -> u16 {
        if self.active {
            self.total_vfs
        } else {
            0
        }
    }
}

/// What the planner does when a PQ group overruns its computed maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Log the overflow and keep building.
    #[default]
    Warn,
    /// Log the overflow and fail the planning pass.
    Strict,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Warn => write!(f, "warn"),
            OverflowPolicy::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(OverflowPolicy::Warn),
            "strict" => Ok(OverflowPolicy::Strict),
            _ => Err(ParseError::InvalidOverflowPolicy(s.to_string())),
        }
    }
}

/// Service description of one hardware function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionProfile {
    /// Relative PF id on the engine.
    #[serde(default)]
    pub pf_id: u8,

    /// Protocol personality.
    #[serde(default)]
    pub personality: Personality,

    /// SR-IOV state.
    #[serde(default)]
    pub sriov: SriovState,

    /// Traffic class used by offloaded protocol queues.
    #[serde(default)]
    pub offload_tc: u8,

    /// Out-of-order class indicated by firmware, if any.
    #[serde(default)]
    pub ooo_tc: Option<u8>,

    /// Whether left-over rate limiters become PF rate-limited PQs.
    #[serde(default = "default_rate_limited_pqs")]
    pub rate_limited_pqs: bool,

    /// Handling of group overflow during planning.
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
}

fn default_rate_limited_pqs() -> bool {
    true
}

impl Default for FunctionProfile {
    fn default() -> Self {
        Self {
            pf_id: 0,
            personality: Personality::default(),
            sriov: SriovState::default(),
            offload_tc: 0,
            ooo_tc: None,
            rate_limited_pqs: default_rate_limited_pqs(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}
