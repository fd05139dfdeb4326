use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jetway::browser::{BrowserSession, RemoteBrowserSession, SidecarConfig};
use jetway::client::ReservationClient;
use jetway::config::Config;
use jetway::fare::LoggingFareChecker;
use jetway::headers::HeaderStore;
use jetway::monitor::{AccountMonitor, ReservationMonitor, ShutdownHandle};
use jetway::notifications::NotificationHandler;
use jetway::scheduler::CheckInScheduler;
use jetway::utils::retry::RetryConfig;

#[derive(Parser)]
#[command(
    name = "jetway",
    version,
    about = "Automated flight check-in monitor",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor the configured reservations and accounts
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check a configuration file without starting the monitors
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = Config::load(config.as_deref())?;
            setup_tracing(&config, cli.log_format.as_deref(), cli.verbose)?;
            run(config).await?;
        }

        Commands::Validate { config } => {
            let path = config.clone();
            let config = Config::load(config.as_deref())?;
            setup_tracing(&config, cli.log_format.as_deref(), cli.verbose)?;
            validate(&config, path.as_deref());
        }
    }

    Ok(())
}

fn setup_tracing(config: &Config, format_override: Option<&str>, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("jetway=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new(format!("jetway={},warn", config.logging.level))
    };

    let format = format_override.unwrap_or(&config.logging.format);
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn validate(config: &Config, path: Option<&std::path::Path>) {
    match path {
        Some(path) => println!("Configuration at {} is valid", path.display()),
        None => println!("Default configuration is valid"),
    }
    println!("  Reservations: {}", config.reservations.len());
    println!("  Accounts: {}", config.accounts.len());
    println!("  Webhooks: {}", config.notifications.webhook_urls.len());
    println!("  Poll interval: {}s", config.monitor.poll_interval_secs);
    println!(
        "  Check-in window: {}h before departure, {} attempts",
        config.checkin.opens_offset_hours, config.checkin.max_attempts
    );
}

/// Build a scheduler with its own header store and API client
fn build_scheduler(
    config: &Config,
    notifier: Arc<NotificationHandler>,
) -> Result<CheckInScheduler> {
    let header_store = HeaderStore::new();
    let client = Arc::new(ReservationClient::with_config(
        header_store.clone(),
        config.api.requests_per_second,
        std::time::Duration::from_secs(config.api.request_timeout_secs),
        RetryConfig::default(),
    )?);

    Ok(CheckInScheduler::new(
        header_store,
        client,
        notifier,
        Arc::new(LoggingFareChecker),
        config.checkin_policy(),
    ))
}

async fn run(config: Config) -> Result<()> {
    tracing::info!("jetway check-in monitor starting");

    let timezones = Arc::new(config.timezones()?);

    let mut notifier = NotificationHandler::new();
    for url in &config.notifications.webhook_urls {
        notifier.add_webhook(url)?;
    }
    let notifier = Arc::new(notifier);

    let session: Arc<dyn BrowserSession> = Arc::new(RemoteBrowserSession::new(
        SidecarConfig::new(&config.browser.endpoint)
            .with_timeout(std::time::Duration::from_secs(config.browser.timeout_secs)),
    )?);

    let mut handles: Vec<ShutdownHandle> = Vec::new();
    let mut tasks = Vec::new();

    let reservations = config.reservations();
    if !reservations.is_empty() {
        tracing::info!(count = reservations.len(), "Monitoring reservations");
        let mut monitor = ReservationMonitor::new(
            session.clone(),
            build_scheduler(&config, notifier.clone())?,
            reservations,
            timezones.clone(),
            notifier.clone(),
            config.poll_interval(),
        );
        handles.push(monitor.shutdown_handle());
        tasks.push(tokio::spawn(async move { monitor.monitor().await }));
    }

    for account in config.accounts() {
        tracing::info!(username = %account.username, "Monitoring account");
        let mut monitor = AccountMonitor::new(
            session.clone(),
            build_scheduler(&config, notifier.clone())?,
            account,
            timezones.clone(),
            notifier.clone(),
            config.poll_interval(),
        );
        handles.push(monitor.shutdown_handle());
        tasks.push(tokio::spawn(async move { monitor.monitor().await }));
    }

    let all = futures::future::join_all(tasks);
    tokio::pin!(all);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested, stopping monitors");
            for handle in &handles {
                handle.stop();
            }
            all.await;
        }
        _ = &mut all => {
            tracing::info!("All monitors finished");
        }
    }

    tracing::info!("jetway stopped");
    Ok(())
}
