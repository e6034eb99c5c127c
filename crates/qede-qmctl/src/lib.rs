//! Support library of the `qede-qmctl` operator tool.
//!
//! Loads a device profile, instantiates its functions against a dry-run
//! collaborator and renders planner state as JSON or YAML.

pub mod device;
pub mod dry_run;
pub mod profile;
pub mod report;

pub use device::Device;
pub use dry_run::{DryRunCallbacks, DryRunOp};
pub use profile::{DeviceProfile, FunctionEntry, ProfileError, VportRate};
pub use report::{render, CountReport, OutputFormat, PlanReport, ReconfigureReport, VportWfqReport};
