//! qede-qmctl entry point.
//!
//! Plans queue-manager layouts for the functions of a device profile and
//! drives bandwidth and reconfiguration requests against a dry-run
//! collaborator. Reports go to stdout, logs to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use qede_qmctl::report::vport_wfq;
use qede_qmctl::{
    render, CountReport, Device, DeviceProfile, OutputFormat, PlanReport, ReconfigureReport,
};
use qede_types::SriovState;
use tracing::{error, info};

/// Queue-manager layout planner for multi-function adapters
#[derive(Parser, Debug)]
#[command(name = "qede-qmctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Device profile (.yaml, .yml or .json)
    #[arg(short = 'p', long)]
    profile: PathBuf,

    /// Report format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the layout of every function and print it
    Plan {
        /// Only print this PF
        #[arg(long)]
        pf: Option<u8>,

        /// Also print the operations the planner issued
        #[arg(long)]
        operations: bool,
    },

    /// Print the predicted resource needs without building tables
    Counts,

    /// Request a minimum rate for a vport and print the resulting weights
    Wfq {
        #[arg(long)]
        pf: u8,

        /// Vport index relative to the PF
        #[arg(long)]
        vport: u16,

        /// Minimum rate in Mb/sec
        #[arg(long)]
        rate: u32,
    },

    /// Change the traffic classes or VF count of a PF and rebuild it online
    Reconfigure {
        #[arg(long)]
        pf: u8,

        /// New traffic class count
        #[arg(long)]
        tcs: Option<u8>,

        /// New active VF count (0 disables SR-IOV)
        #[arg(long)]
        vfs: Option<u16>,
    },
}

fn init_logging(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn run(args: &Args) -> anyhow::Result<String> {
    let profile = DeviceProfile::load(&args.profile)
        .with_context(|| format!("loading {}", args.profile.display()))?;
    info!(
        "loaded profile {} [engine {} functions {}]",
        args.profile.display(),
        profile.engine_id,
        profile.functions.len()
    );

    let mut device = Device::from_profile(profile);

    match &args.command {
        Command::Counts => {
            let counts = device
                .functions()
                .iter()
                .map(CountReport::for_function)
                .collect::<Result<Vec<_>, _>>()
                .context("counting resources")?;
            render(&counts, args.format)
        }

        Command::Plan { pf, operations } => {
            device.bring_up().context("planning the device")?;

            let layouts: Vec<_> = device
                .functions()
                .iter()
                .filter(|f| pf.map_or(true, |pf| f.profile().pf_id == pf))
                .filter_map(|f| f.qm_info())
                .collect();
            if layouts.is_empty() {
                anyhow::bail!("no layout for pf {:?}", pf);
            }

            if *operations {
                let report = PlanReport {
                    layouts,
                    operations: device.callbacks().journal(),
                };
                render(&report, args.format)
            } else {
                render(&layouts, args.format)
            }
        }

        Command::Wfq { pf, vport, rate } => {
            device.bring_up().context("planning the device")?;

            let func = device.function_mut(*pf)?;
            func.configure_vport_wfq(*vport, *rate)
                .with_context(|| format!("pf {} vport {} min rate {}", pf, vport, rate))?;

            let qm = func
                .qm_info()
                .with_context(|| format!("pf {} has no layout", pf))?;
            render(&vport_wfq(qm), args.format)
        }

        Command::Reconfigure { pf, tcs, vfs } => {
            device.bring_up().context("planning the device")?;
            device.callbacks().take_journal();

            let func = device.function_mut(*pf)?;
            if let Some(tcs) = tcs {
                func.set_num_traffic_classes(*tcs);
            }
            if let Some(vfs) = vfs {
                let mut profile = func.profile().clone();
                profile.sriov = if *vfs == 0 {
                    SriovState::default()
                } else {
                    SriovState::with_vfs(*vfs)
                };
                func.set_profile(profile);
            }
            func.reconfigure()
                .with_context(|| format!("reconfiguring pf {}", pf))?;

            let report = ReconfigureReport {
                pf_id: *pf,
                operations: device.callbacks().take_journal(),
                layout: device.function(*pf)?.qm_info(),
            };
            render(&report, args.format)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(&args) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
