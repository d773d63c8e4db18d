use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use watchdog_common::{MatchStrategy, StudentWarning, WatchdogConfig};
use watchdog_framework::{TickOutcome, WarningPublisher, Watchdog};
use watchdog_probes::list_processes;

#[derive(Parser, Debug)]
#[command(name = "proctor-agent")]
#[command(about = "Exam process-compliance watchdog", long_about = None)]
struct Args {
    /// Path to the watchdog configuration file (JSON). Built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the proctoring backend
    #[arg(long, env = "API_URL")]
    backend_url: Option<String>,

    /// Polling interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// How forbidden names are matched against the process listing
    #[arg(long, value_parser = parse_strategy)]
    match_strategy: Option<MatchStrategy>,

    /// Run a single tick, print its outcome and exit
    #[arg(long)]
    once: bool,

    /// Print the running processes (PID and name) and exit
    #[arg(long)]
    list_processes: bool,
}

fn parse_strategy(s: &str) -> Result<MatchStrategy, String> {
    match s.to_lowercase().as_str() {
        "substring" => Ok(MatchStrategy::Substring),
        "exact" => Ok(MatchStrategy::Exact),
        other => Err(format!("unknown match strategy {:?} (substring|exact)", other)),
    }
}

fn load_config(args: &Args) -> anyhow::Result<WatchdogConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let config = WatchdogConfig::from_file(path)?;
            info!("Loaded watchdog configuration from {}", path.display());
            config
        }
        None => WatchdogConfig::default(),
    };

    if let Some(url) = &args.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(ms) = args.interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(strategy) = args.match_strategy {
        config.match_strategy = strategy;
    }
    Ok(config.finish()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.list_processes {
        for entry in list_processes(config.request_timeout()).await? {
            println!("{:>7} {}", entry.pid, entry.name);
        }
        return Ok(());
    }

    info!("Starting proctor-agent against {}", config.backend_url);

    let warnings = WarningPublisher::new();
    let watchdog = Arc::new(Watchdog::from_config(&config, warnings.clone())?);
    let mut rx = warnings.subscribe();

    if args.once {
        let outcome = watchdog.tick().await;
        for warning in drain_warnings(&mut rx) {
            warn!("[STUDENT] {}", warning.message);
        }
        print_outcome(&outcome)?;
        return Ok(());
    }

    tokio::spawn(display_warnings(rx));

    let handle = watchdog.spawn();
    info!("Watchdog is running. Press Ctrl+C to stop.");

    signal::ctrl_c().await?;
    info!("Received Ctrl+C, stopping watchdog...");
    handle.stop().await;
    Ok(())
}

/// Stand-in for the desktop renderer: show each warning as it arrives.
async fn display_warnings(mut rx: broadcast::Receiver<StudentWarning>) {
    loop {
        match rx.recv().await {
            Ok(warning) => warn!("[STUDENT] {}", warning.message),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Dropped {} warning(s), display fell behind", n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Everything already published, without waiting for more.
fn drain_warnings(rx: &mut broadcast::Receiver<StudentWarning>) -> Vec<StudentWarning> {
    let mut drained = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(warning) => drained.push(warning),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!("Dropped {} warning(s), display fell behind", n)
            }
            Err(_) => break,
        }
    }
    drained
}

fn print_outcome(outcome: &TickOutcome) -> anyhow::Result<()> {
    let summary = match outcome {
        TickOutcome::Completed(report) => serde_json::json!({
            "outcome": "completed",
            "actions": report
                .actions
                .iter()
                .map(|a| format!("{:?}", a))
                .collect::<Vec<_>>(),
            "alerts_sent": report.enforcement.alerts_sent,
            "alerts_failed": report.enforcement.alerts_failed,
            "warnings_published": report.enforcement.warnings_published,
            "terminations_attempted": report.enforcement.terminations_attempted,
            "terminations_failed": report.enforcement.terminations_failed,
        }),
        TickOutcome::NoSnapshot => serde_json::json!({ "outcome": "no_snapshot" }),
        TickOutcome::Skipped => serde_json::json!({ "outcome": "skipped" }),
        TickOutcome::Stopped => serde_json::json!({ "outcome": "stopped" }),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
