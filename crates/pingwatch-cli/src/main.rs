mod dashboard;
mod history;
mod host_log;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use pingwatch_core::{
    Alert, Clock, EventSink, MonitorConfig, MonitoringCoordinator, Probe, SystemClock,
    SystemPing, TracingSink, FALLBACK_HOST,
};
use pingwatch_notify::dispatcher_from_config;

use history::HostHistory;
use host_log::{HostLogBook, SinkSet};

#[derive(Parser, Debug)]
#[command(name = "pingwatch", about = "Multi-host ping monitor with throttled alerts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (created with defaults if missing)
    #[arg(short, long, default_value = "pingwatch.toml", global = true, env = "PINGWATCH_CONFIG")]
    config: PathBuf,

    /// Recently monitored hosts
    #[arg(long, default_value = "pingwatch-history.json", global = true)]
    history: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Monitor hosts until Ctrl+C
    Run {
        /// Hosts to monitor
        hosts: Vec<String>,
        /// Also monitor hosts from the history list by position (1-based)
        #[arg(long, value_delimiter = ',')]
        recent: Vec<usize>,
        /// Dashboard refresh period in seconds
        #[arg(long, default_value_t = 5)]
        refresh: u64,
        /// Directory for per-host log files
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,
    },
    /// Probe a host once
    Probe { host: String },
    /// List or edit recently monitored hosts
    History {
        /// Drop a host from the list
        #[arg(long)]
        remove: Option<String>,
    },
    /// Create the config file if needed and print where it is
    Config {
        /// Print the effective settings
        #[arg(long)]
        show: bool,
    },
    /// Send a test alert on every configured channel
    NotifyTest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            hosts,
            recent,
            refresh,
            log_dir,
        } => run(&cli.config, &cli.history, hosts, &recent, refresh, log_dir).await,
        Commands::Probe { host } => {
            let config = MonitorConfig::load_or_init(&cli.config)?;
            let result = SystemPing::new(config.probe_timeout()).probe(&host).await;
            match result.latency_ms {
                Some(ms) => println!("{}: {} ({:.2} ms)", host, result.status, ms),
                None => println!("{}: {}", host, result.status),
            }
            Ok(())
        }
        Commands::History { remove } => {
            let mut history = HostHistory::load(&cli.history);
            if let Some(host) = remove {
                if !history.remove(&host) {
                    anyhow::bail!("{} is not in the history", host);
                }
                history.save()?;
                println!("Removed {}", host);
            }
            if history.is_empty() {
                println!("No recently monitored hosts.");
            }
            for (i, host) in history.hosts().iter().enumerate() {
                println!("  {}. {}", i + 1, host);
            }
            Ok(())
        }
        Commands::Config { show } => {
            let config = MonitorConfig::load_or_init(&cli.config)?;
            println!("Configuration: {}", cli.config.display());
            if show {
                println!("{}", config);
            }
            Ok(())
        }
        Commands::NotifyTest => notify_test(&cli.config).await,
    }
}

async fn run(
    config_path: &Path,
    history_path: &Path,
    hosts: Vec<String>,
    recent: &[usize],
    refresh: u64,
    log_dir: PathBuf,
) -> anyhow::Result<()> {
    let config = MonitorConfig::load_or_init(config_path)?;
    let mut history = HostHistory::load(history_path);
    let selected = select_hosts(hosts, recent, &history)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let log_book: Arc<dyn EventSink> = Arc::new(
        HostLogBook::new(&log_dir)
            .with_context(|| format!("creating log directory {}", log_dir.display()))?,
    );
    let tracing_sink: Arc<dyn EventSink> = Arc::new(TracingSink);
    let sink = Arc::new(SinkSet(vec![tracing_sink, log_book]));
    let probe = Arc::new(SystemPing::new(config.probe_timeout()));
    let coordinator = MonitoringCoordinator::new(probe, Arc::clone(&clock), sink);

    for host in &selected {
        match coordinator.add_host(host).await {
            Ok(()) => history.touch(host),
            Err(e) => warn!(host = %host, "Skipping host: {}", e),
        }
    }
    if let Err(e) = history.save() {
        warn!("Could not save host history: {:#}", e);
    }

    let dispatcher = Arc::new(dispatcher_from_config(&config.notifications, clock));
    let settings = config.settings();
    let registered = coordinator.hosts().await.len();
    let started = coordinator.start(settings.clone(), dispatcher).await?;
    if started < registered {
        warn!(
            polled = started,
            registered,
            max_hosts = settings.max_hosts,
            "Host limit reached, extra hosts stay idle"
        );
    }
    info!(log_dir = %log_dir.display(), "Monitoring {} host(s), Ctrl+C to stop", started);

    let mut redraw = tokio::time::interval(Duration::from_secs(refresh.max(1)));
    loop {
        tokio::select! {
            _ = redraw.tick() => {
                let stats = coordinator.obtain_statistics().await;
                dashboard::clear_screen();
                print!("{}", dashboard::render(&stats));
            }
            res = tokio::signal::ctrl_c() => {
                res?;
                break;
            }
        }
    }

    info!("Stopping, waiting for in-flight probes");
    coordinator.stop().await;
    Ok(())
}

/// Hosts given on the command line, then history picks; falls back to the
/// most recent history entry and finally to `FALLBACK_HOST`.
fn select_hosts(hosts: Vec<String>, recent: &[usize], history: &HostHistory) -> anyhow::Result<Vec<String>> {
    let mut selected: Vec<String> = Vec::new();
    let picks = recent.iter().map(|&pos| {
        history
            .get(pos)
            .map(str::to_string)
            .with_context(|| format!("no host at history position {}", pos))
    });

    for host in hosts.into_iter().map(Ok).chain(picks) {
        let host = host?;
        if !selected.contains(&host) {
            selected.push(host);
        }
    }

    if selected.is_empty() {
        let host = history.get(1).unwrap_or(FALLBACK_HOST);
        selected.push(host.to_string());
    }
    Ok(selected)
}

async fn notify_test(config_path: &Path) -> anyhow::Result<()> {
    let config = MonitorConfig::load_or_init(config_path)?;
    let dispatcher = dispatcher_from_config(&config.notifications, Arc::new(SystemClock));
    let alert = Alert::new(
        "pingwatch",
        "pingwatch test",
        "Test notification from pingwatch. If you can read this, the channel works.",
    );

    let outcomes = dispatcher.dispatch(&alert, &config.notifications.channels).await;
    for (channel, outcome) in &outcomes {
        println!("  {:<10} {}", channel.as_str(), serde_json::to_string(outcome)?);
    }
    if outcomes.values().any(|o| !o.is_sent()) {
        anyhow::bail!("one or more channels failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["pingwatch", "run", "a.example", "--recent", "1,3", "--refresh", "2"]);
        match cli.command {
            Commands::Run { hosts, recent, refresh, log_dir } => {
                assert_eq!(hosts, vec!["a.example"]);
                assert_eq!(recent, vec![1, 3]);
                assert_eq!(refresh, 2);
                assert_eq!(log_dir, PathBuf::from("logs"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.history, PathBuf::from("pingwatch-history.json"));
    }

    #[test]
    fn test_select_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HostHistory::load(dir.path().join("h.json"));

        // Nothing at all
        assert_eq!(select_hosts(vec![], &[], &history).unwrap(), vec![FALLBACK_HOST]);

        history.touch("old.example");
        history.touch("new.example");
        assert_eq!(select_hosts(vec![], &[], &history).unwrap(), vec!["new.example"]);

        let picked = select_hosts(vec!["x.example".into(), "old.example".into()], &[2, 1], &history).unwrap();
        assert_eq!(picked, vec!["x.example", "old.example", "new.example"]);

        assert!(select_hosts(vec![], &[7], &history).is_err());
    }
}
