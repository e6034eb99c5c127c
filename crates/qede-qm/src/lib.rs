//! Queue-manager (QM) layout planning for multi-function network adapters.
//!
//! Turns the service description of a hardware function into the PQ, vport
//! and port tables the queue-manager block consumes, and keeps them current
//! while the function runs.
//!
//! # Components
//!
//! - [`counter`]: which PQ groups a function needs and what they cost
//! - [`planner`]: builds the tables in firmware order
//! - [`validator`]: checks the predicted layout against the budget
//! - [`wfq`] and the bandwidth entry points on [`QmFunction`]: vport minimum
//!   rates, WFQ weights, PF rate limits
//! - [`reconf`]: stop, rebuild and start under the engine lock
//!
//! Register access and the firmware mailbox are behind [`QmCallbacks`].

mod bandwidth;
pub mod callbacks;
pub mod counter;
pub mod engine;
pub mod error;
pub mod function;
pub mod planner;
pub mod reconf;
pub mod types;
pub mod validator;
pub mod wfq;

pub use callbacks::{QmCallbacks, QmCommand, QmPfRuntime};
pub use counter::{derive_flags, ResourceCounter};
pub use engine::EngineContext;
pub use error::{QmError, QmResult};
pub use function::{QmFunction, QmFunctionStats};
pub use planner::{PlanInputs, PqRateLimit};
pub use reconf::ReconfState;
pub use types::{Overflow, PortParams, PqParams, QmInfo, VportParams, WfqData};
pub use validator::check_sanity;
pub use wfq::wfq_weight;
