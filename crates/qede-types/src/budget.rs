//! Resource budget granted to a function by firmware.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of QM resource tracked by the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Physical queues.
    Pq,
    /// Virtual ports.
    Vport,
    /// Rate limiters.
    RateLimiter,
}

impl ResourceKind {
    /// Returns the diagnostic name of the resource.
    pub const fn name(&self) -> &'static str {
        match self {
            ResourceKind::Pq => "PQ",
            ResourceKind::Vport => "VPORT",
            ResourceKind::RateLimiter => "RL",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Contiguous range of one resource owned by the function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceGrant {
    /// Number of units granted.
    pub count: u16,
    /// First absolute index of the range.
    #[serde(default)]
    pub start: u16,
}

impl ResourceGrant {
    /// Creates a grant.
    pub const fn new(count: u16, start: u16) -> Self {
        Self { count, start }
    }
}

/// Per-function resource budget.
///
/// How firmware arrived at these numbers (defaults, NVM, negotiation) is
/// not visible here: the planner only sees counts and start offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceBudget {
    /// Physical queues.
    pub pqs: ResourceGrant,
    /// Virtual ports.
    pub vports: ResourceGrant,
    /// Rate limiters.
    pub rate_limiters: ResourceGrant,
}

impl ResourceBudget {
    /// Returns the grant of one resource kind.
    pub const fn grant(&self, kind: ResourceKind) -> ResourceGrant {
        match kind {
            ResourceKind::Pq => self.pqs,
            ResourceKind::Vport => self.vports,
            ResourceKind::RateLimiter => self.rate_limiters,
        }
    }

    /// Returns the number of units granted for one resource kind.
    pub const fn count(&self, kind: ResourceKind) -> u16 {
        self.grant(kind).count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_lookup() {
        let budget = ResourceBudget {
            pqs: ResourceGrant::new(64, 128),
            vports: ResourceGrant::new(20, 40),
            rate_limiters: ResourceGrant::new(10, 0),
        };
        assert_eq!(budget.count(ResourceKind::Pq), 64);
        assert_eq!(budget.grant(ResourceKind::Vport).start, 40);
        assert_eq!(budget.count(ResourceKind::RateLimiter), 10);
    }

    #[test]
    fn test_resource_names() {
        assert_eq!(ResourceKind::Pq.to_string(), "PQ");
        assert_eq!(ResourceKind::RateLimiter.to_string(), "RL");
    }
}
