//! vsphere-acc: runs the custom attribute scenarios against the in-memory
//! custom fields manager and prints a report.

use clap::Parser;
use std::time::Duration;
use tfacc::{HarnessConfig, RunContext};
use tracing_subscriber::EnvFilter;
use vsphere::simulator::CustomFieldsSimulator;
use vsphere::{fixtures, scenarios};

#[derive(Parser, Debug)]
#[command(name = "vsphere-acc", about = "vSphere custom attribute acceptance scenarios")]
#[command(version, long_about = None)]
struct Cli {
    /// Only run scenarios whose name contains this text
    #[arg(long)]
    scenario: Option<String>,

    /// List scenario names and exit
    #[arg(long)]
    list: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Require VSPHERE_USER, VSPHERE_PASSWORD and VSPHERE_SERVER before each scenario
    #[arg(long)]
    require_env: bool,

    /// Scenarios in flight at once (overrides TFACC_PARALLELISM)
    #[arg(long)]
    parallel: Option<usize>,

    /// Re-fetches while remote state has not converged (overrides TFACC_CONSISTENCY_RETRIES)
    #[arg(long)]
    consistency_retries: Option<u32>,

    /// Per-fetch timeout in seconds (overrides TFACC_FETCH_TIMEOUT_SECS)
    #[arg(long)]
    fetch_timeout: Option<u64>,

    /// Reads that miss a newly created field
    #[arg(long, default_value_t = 0)]
    lag: u32,

    /// Delay added to every simulated call, in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,
}

impl Cli {
    fn harness_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::from_env();
        if let Some(parallel) = self.parallel {
            config = config.with_parallelism(parallel);
        }
        if let Some(retries) = self.consistency_retries {
            config = config.with_consistency_retries(retries);
        }
        if let Some(secs) = self.fetch_timeout {
            config = config.with_fetch_timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vsphere=info,tfacc=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let pre_check = cli.require_env.then(scenarios::live_pre_check);
    let registry = scenarios::registry(pre_check)?;
    if cli.list {
        for name in registry.list_scenarios() {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = cli.harness_config();
    if config.parallelism > 1 {
        // One simulator backs every scenario and they all manage the same label
        tracing::warn!(
            "Scenarios share the logical name '{}', running them one at a time",
            fixtures::LOGICAL_NAME
        );
        config = config.with_parallelism(1);
    }

    let simulator = CustomFieldsSimulator::with_options(
        Duration::from_millis(cli.latency_ms),
        cli.lag,
    );
    let runner = vsphere::simulated_runner(config, simulator);

    let filter = cli.scenario.clone().unwrap_or_default();
    let batch = RunContext::new("vsphere-acc");
    let report = registry
        .run_matching(&runner, &batch, |name| name.contains(filter.as_str()))
        .await;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
