//! Common types for queue-manager (QM) layout planning.
//!
//! This crate provides the plain values the planner consumes from its
//! collaborators and the device profile:
//!
//! - [`Personality`]: protocol personality of a hardware function
//! - [`PqFlags`]: set of physical-queue groups a function needs
//! - [`ChipTopology`]: ports, traffic classes and functions per engine
//! - [`ResourceBudget`]: PQ/vport/rate-limiter grants from firmware
//! - [`LinkState`]: line speed and PF bandwidth percentages
//! - [`FunctionProfile`]: everything describing one function's service needs
//! - [`hw`]: hardware constants of the QM block

pub mod hw;
mod budget;
mod flags;
mod link;
mod personality;
mod profile;
mod topology;

pub use budget::{ResourceBudget, ResourceGrant, ResourceKind};
pub use flags::PqFlags;
pub use link::{validate_percent, LinkState};
pub use personality::Personality;
pub use profile::{FunctionProfile, OverflowPolicy, SriovState};
pub use topology::ChipTopology;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid PQ flag name: {0}")]
    InvalidPqFlag(String),

    #[error("invalid bandwidth percentage: {0} (must be 1-100)")]
    InvalidPercent(u8),

    #[error("invalid overflow policy: {0}")]
    InvalidOverflowPolicy(String),
}
