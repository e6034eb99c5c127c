//! Sanity validator.
//!
//! The one hard gate of a planning pass: the layout the counter predicts
//! must fit the firmware budget before any table is rebuilt.

use qede_types::{hw, ChipTopology, ResourceBudget, ResourceKind};
use tracing::error;

use crate::counter::ResourceCounter;
use crate::error::{QmError, QmResult};

/// One past the last absolute PQ or vport index.
const MAX_INDEX_END: u32 = u16::MAX as u32 + 1;

/// Checks the predicted layout against the budget and the topology.
pub fn check_sanity(
    counter: &ResourceCounter,
    budget: &ResourceBudget,
    topology: &ChipTopology,
) -> QmResult<()> {
    if topology.num_ports == 0 || topology.num_ports > hw::MAX_NUM_PORTS_K2 {
        error!("invalid number of ports {}", topology.num_ports);
        return Err(QmError::invalid_config(format!(
            "invalid number of ports {} (must be 1-{})",
            topology.num_ports,
            hw::MAX_NUM_PORTS_K2
        )));
    }

    if counter.num_tcs() > hw::NUM_OF_PHYS_TCS {
        error!("invalid number of traffic classes {}", counter.num_tcs());
        return Err(QmError::invalid_config(format!(
            "invalid number of traffic classes {} (max {})",
            counter.num_tcs(),
            hw::NUM_OF_PHYS_TCS
        )));
    }

    check_resource(ResourceKind::Vport, counter.count_vports(), budget)?;
    check_resource(ResourceKind::Pq, counter.count_pqs(), budget)?;

    Ok(())
}

/// Checks one predicted total against its grant. The total must fit the
/// granted count and the range it covers must stay inside the 16-bit index
/// space the tables use.
fn check_resource(kind: ResourceKind, required: u32, budget: &ResourceBudget) -> QmResult<()> {
    let grant = budget.grant(kind);
    let available = u32::from(grant.count);
    if required > available {
        error!(
            "requested amount of {}s exceeds resource [{} > {}]",
            kind, required, available
        );
        return Err(QmError::invalid_config(format!(
            "requested amount of {}s exceeds resource ({} > {})",
            kind, required, available
        )));
    }

    let end = u32::from(grant.start) + required;
    if end > MAX_INDEX_END {
        error!(
            "{} range exceeds the index space [start {} count {}]",
            kind, grant.start, required
        );
        return Err(QmError::invalid_config(format!(
            "{} range {}..{} exceeds the index space",
            kind, grant.start, end
        )));
    }

    Ok(())
}
