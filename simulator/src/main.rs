use anyhow::Context;
use clap::Parser;
use control::bridge::ControlBridge;
use generator::profile::default_zones;
use log::{info, warn};
use poolwatchcore::tracking::ZoneSet;
use poolwatchcore::WatchSession;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use transport::AnyTransport;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;
use workflow::zones::ZoneStore;

mod control;
mod generator;
mod transport;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Pool drowning monitor driver")]
struct Args {
    /// Play the synthetic scenario once and write a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Zone document; overrides `zones_path` from the workflow
    #[arg(long)]
    zones: Option<PathBuf>,
    #[arg(long)]
    swimmers: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Scenario length in seconds
    #[arg(long)]
    duration: Option<f64>,
    /// Keep the control bridge alive for detector frames and operator commands
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Log notifications instead of sending them to Telegram
    #[arg(long, default_value_t = false)]
    console: bool,
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn load_config(args: &Args) -> anyhow::Result<WorkflowConfig> {
    let mut config = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    let applied = config.apply_env();
    if !applied.is_empty() {
        info!("environment overrides: {}", applied.join(", "));
    }
    if let Some(path) = &args.zones {
        config.zones_path = path.clone();
    }
    if let Some(swimmers) = args.swimmers {
        config.scenario.swimmers = swimmers;
    }
    if let Some(seed) = args.seed {
        config.scenario.seed = seed;
    }
    if let Some(duration) = args.duration {
        config.scenario.duration_sec = duration;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    config.validate()?;
    Ok(config)
}

fn append_summary(dir: &std::path::Path, line: &str) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("offline_summary.log");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime")?;

    let store = ZoneStore::new(&config.zones_path);
    let mut zones = store.load();
    if zones.is_empty() && !args.serve {
        info!("using the scenario's built-in pool and deck zones");
        zones = default_zones(&config.scenario);
    }

    let transport = AnyTransport::select(args.console, |key| std::env::var(key).ok());
    let mut session = WatchSession::new(
        config.monitor.clone(),
        config.dispatch.clone(),
        ZoneSet::from_config(&zones),
        Arc::new(transport),
        runtime.handle(),
    )?;
    session.announce("Pool monitor started.");

    if args.offline || !args.serve {
        let result = Runner::new(config.clone()).execute(&mut session, &zones)?;
        println!(
            "Offline run -> frames {}, alerts {} ({} dispatched), max seen {}, still missing {}",
            result.frames,
            result.alerts_requested,
            result.alerts_dispatched,
            result.max_total_seen,
            result.missing_in_pool
        );
        let line = format!("{}\n", serde_json::to_string(&result)?);
        if let Err(err) = append_summary(&config.dispatch.output_dir, &line) {
            warn!("offline summary not written: {:#}", err);
        }
    }

    if args.serve {
        let shared = Arc::new(Mutex::new(session));
        let bridge = ControlBridge::new(
            Arc::clone(&shared),
            store,
            zones,
            (config.scenario.width, config.scenario.height),
        );
        runtime.block_on(bridge.serve(config.bind, async {
            if let Err(err) = signal::ctrl_c().await {
                warn!("Ctrl+C handler failed: {}", err);
            }
        }))?;
        session = match Arc::try_unwrap(shared) {
            Ok(mutex) => mutex
                .into_inner()
                .map_err(|_| anyhow::anyhow!("session lock poisoned"))?,
            Err(_) => anyhow::bail!("control bridge still holds the session"),
        };
    }

    session.announce("Pool monitor stopped.");
    runtime.block_on(session.shutdown());
    Ok(())
}
