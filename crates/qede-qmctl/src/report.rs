//! Serializable views of planner state for the CLI.

use clap::ValueEnum;
use qede_qm::{check_sanity, QmFunction, QmInfo, QmResult, ResourceCounter};
use serde::Serialize;

use crate::dry_run::DryRunOp;

/// Output encoding of CLI reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Renders a report in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    Ok(text)
}

/// Predicted resource needs of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountReport {
    pub pf_id: u8,
    pub personality: String,
    pub pq_flags: String,
    pub num_tcs: u8,
    pub num_vfs: u16,
    pub rate_limited_pqs: u16,
    pub vports: u32,
    pub pqs: u32,
    /// Why the layout would be rejected, if it would be.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

impl CountReport {
    /// Runs the counter and the sanity checks without building tables.
    pub fn for_function(func: &QmFunction) -> QmResult<Self> {
        let counter = ResourceCounter::new(func.profile(), func.topology(), func.budget())?;
        let rejected = check_sanity(&counter, func.budget(), func.topology())
            .err()
            .map(|err| err.to_string());

        Ok(Self {
            pf_id: func.profile().pf_id,
            personality: func.profile().personality.to_string(),
            pq_flags: counter.flags().to_string(),
            num_tcs: counter.num_tcs(),
            num_vfs: counter.num_vfs(),
            rate_limited_pqs: counter.count_rate_limited_pqs(),
            vports: counter.count_vports(),
            pqs: counter.count_pqs(),
            rejected,
        })
    }
}

/// WFQ state of one vport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VportWfqReport {
    pub vport: u16,
    pub min_speed: u32,
    pub configured: bool,
    pub weight: u16,
}

/// WFQ state of every vport of a layout.
pub fn vport_wfq(qm: &QmInfo) -> Vec<VportWfqReport> {
    qm.wfq_data
        .iter()
        .zip(&qm.qm_vport_params)
        .take(qm.num_vports as usize)
        .zip(0u16..)
        .map(|((data, params), vport)| VportWfqReport {
            vport,
            min_speed: data.min_speed,
            configured: data.configured,
            weight: params.vport_wfq,
        })
        .collect()
}

/// Layouts of a device, optionally with the operations that built them.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport<'a> {
    pub layouts: Vec<&'a QmInfo>,
    pub operations: Vec<DryRunOp>,
}

/// Outcome of a reconfiguration.
#[derive(Debug, Clone, Serialize)]
pub struct ReconfigureReport<'a> {
    pub pf_id: u8,
    pub operations: Vec<DryRunOp>,
    pub layout: Option<&'a QmInfo>,
}
