use std::{env, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use krpc_rcs::{
    config::Config,
    suite::{run_scenario, Report, Scenario},
};
use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioArg {
    /// Reuse the vessel on the pad: activation, axis flags and fuel
    Parts,
    /// Fresh launch, properties at sea level
    SeaLevel,
    /// Fresh launch into a 250 km orbit, properties in vacuum
    Vacuum,
    All,
}

impl ScenarioArg {
    fn scenarios(&self) -> Vec<Scenario> {
        match self {
            ScenarioArg::Parts => vec![Scenario::Reuse],
            ScenarioArg::SeaLevel => vec![Scenario::SeaLevel],
            ScenarioArg::Vacuum => vec![Scenario::Vacuum],
            ScenarioArg::All => Scenario::ALL.to_vec(),
        }
    }
}

/// Checks RCS parts of a running KSP game through kRPC
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/krpc.toml")]
    config: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ScenarioArg::All)]
    scenario: ScenarioArg,

    #[arg(short, long)]
    address: Option<String>,

    #[arg(short = 'p', long)]
    rpc_port: Option<u16>,
}

fn main() -> Result<ExitCode> {
    // Default log level to "info"
    if env::var("RUST_LOG").is_err() {
        unsafe { env::set_var("RUST_LOG", "info") }
    }

    pretty_env_logger::init();

    let args = Args::parse();

    let config = if args.config.exists() {
        info!("Reading configuration from '{}'", args.config.display());
        Config::from_file(&args.config)?
    } else {
        warn!(
            "Configuration '{}' not found, using defaults",
            args.config.display()
        );
        Config::default()
    };

    let mut config = config.with_env_overrides()?;
    if let Some(address) = args.address {
        config.connection.address = address;
    }
    if let Some(port) = args.rpc_port {
        config.connection.rpc_port = port;
    }

    let mut reports = Vec::new();
    for scenario in args.scenario.scenarios() {
        let report = run_scenario(&config, scenario)
            .with_context(|| format!("Scenario {scenario} could not run"))?;
        reports.push(report);
    }

    Ok(summarize(&reports))
}

fn summarize(reports: &[Report]) -> ExitCode {
    let mut failed = 0;

    for report in reports {
        for outcome in report.failures() {
            if let Err(e) = &outcome.result {
                error!("{}::{}: {e}", report.scenario, outcome.case);
            }
        }
        failed += report.failed();
    }

    let total: usize = reports.iter().map(|r| r.outcomes.len()).sum();
    info!("{} of {total} cases passed", total - failed);

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
