// # aliddnsd - Alibaba Cloud DDNS Daemon
//
// Thin integration layer over `aliddns-core`. No sync, retry or DNS logic
// lives here.
//
// The aliddnsd daemon is responsible for:
// 1. Reading configuration (optional JSON file, then environment variables)
// 2. Initializing logging and the runtime
// 3. Wiring the HTTP IP resolver, the Alidns client and the state store
// 4. Running the scheduler, or a single cycle, or a record listing
//
// ## Commands
//
// - `run` (default): periodic sync until SIGINT/SIGTERM; SIGHUP syncs now
// - `once`: one cycle, results on stdout, exit code 2 if any record failed
// - `list-records`: every record of every domain, in `ALIDDNS_RECORDS` form
//
// ## Configuration
//
// - `ALIDDNS_CONFIG_FILE`: JSON configuration document (optional base)
// - `ALIDDNS_ACCESS_KEY_ID`, `ALIDDNS_ACCESS_KEY_SECRET`: AccessKey pair
// - `ALIDDNS_REGION`: API region (default `cn-hangzhou`)
// - `ALIDDNS_RECORDS`: comma-separated `record_id:domain:rr:type`
// - `ALIDDNS_CHECK_INTERVAL`: seconds between cycles (10-86400)
// - `ALIDDNS_STATE_STORE_TYPE`: `memory` (default) or `file`
// - `ALIDDNS_STATE_STORE_PATH`: path to state file (for file store)
// - `ALIDDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export ALIDDNS_ACCESS_KEY_ID=LTAI5t...
// export ALIDDNS_ACCESS_KEY_SECRET=...
// aliddnsd list-records
// export ALIDDNS_RECORDS=9999985:example.com:home:A,9999986:example.com:home:AAAA
// export ALIDDNS_STATE_STORE_TYPE=file
// export ALIDDNS_STATE_STORE_PATH=/var/lib/aliddns/state.json
//
// aliddnsd
// ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use aliddns_core::{
    Credentials, DdnsConfig, FileStateStore, MemoryStateStore, ProviderClient, Scheduler,
    SchedulerConfig, SchedulerEvent, SchedulerHandle, StateStore, SyncEngine, SyncResult,
    SyncStatus, SyncSummary, TrackedRecord,
};
use aliddns_ip_http::HttpIpResolver;
use aliddns_provider_aliyun::AliyunDnsApi;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long the scheduler may take to stop after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error, or a record that failed in `once`
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "aliddnsd",
    version,
    about = "Keep Alibaba Cloud DNS records on this host's public addresses"
)]
struct Cli {
    /// JSON configuration file, overridden by ALIDDNS_* variables
    #[arg(long, short, env = "ALIDDNS_CONFIG_FILE", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Sync periodically until stopped (default)
    Run,
    /// Run a single sync cycle and print the results
    Once,
    /// List all records of all domains in the account
    ListRecords,
}

/// Application configuration
#[derive(Debug)]
struct Config {
    ddns: DdnsConfig,
    state_store_type: String,
    state_store_path: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from the optional file and the environment
    fn from_env(config_file: Option<&PathBuf>) -> Result<Self> {
        let base = match config_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                DdnsConfig::from_json_str(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => DdnsConfig::default(),
        };

        Self::from_vars(base, |key| env::var(key).ok())
    }

    /// Apply `ALIDDNS_*` variables from `var` on top of `base`
    fn from_vars(mut ddns: DdnsConfig, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key_id = var("ALIDDNS_ACCESS_KEY_ID");
        let key_secret = var("ALIDDNS_ACCESS_KEY_SECRET");
        match (key_id, key_secret) {
            (Some(id), Some(secret)) => {
                let region = ddns
                    .credentials
                    .as_ref()
                    .map(|c| c.region.clone())
                    .unwrap_or_else(|| aliddns_core::config::DEFAULT_REGION.to_string());
                ddns.credentials = Some(Credentials::new(id, secret).with_region(region));
            }
            (None, None) => {}
            (Some(_), None) => anyhow::bail!(
                "ALIDDNS_ACCESS_KEY_SECRET is required when ALIDDNS_ACCESS_KEY_ID is set"
            ),
            (None, Some(_)) => anyhow::bail!(
                "ALIDDNS_ACCESS_KEY_ID is required when ALIDDNS_ACCESS_KEY_SECRET is set"
            ),
        }

        if let Some(region) = var("ALIDDNS_REGION") {
            match ddns.credentials.as_mut() {
                Some(credentials) => credentials.region = region,
                None => anyhow::bail!("ALIDDNS_REGION is set but no AccessKey is configured"),
            }
        }

        if let Some(records) = var("ALIDDNS_RECORDS") {
            ddns.tracked_records = parse_records(&records)?;
        }

        if let Some(interval) = var("ALIDDNS_CHECK_INTERVAL") {
            let interval: u64 = interval.trim().parse().with_context(|| {
                format!("ALIDDNS_CHECK_INTERVAL must be a number of seconds. Got: {interval}")
            })?;
            if !(10..=86400).contains(&interval) {
                anyhow::bail!(
                    "ALIDDNS_CHECK_INTERVAL must be between 10 and 86400 seconds. Got: {}",
                    interval
                );
            }
            ddns.check_interval_secs = interval;
        }

        Ok(Self {
            ddns,
            state_store_type: var("ALIDDNS_STATE_STORE_TYPE")
                .unwrap_or_else(|| "memory".to_string()),
            state_store_path: var("ALIDDNS_STATE_STORE_PATH"),
            log_level: var("ALIDDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.ddns.validate()?;

        match self.state_store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "ALIDDNS_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.state_store_type
            ),
        }

        if self.state_store_type == "file" {
            match self.state_store_path.as_deref() {
                None | Some("") => anyhow::bail!(
                    "ALIDDNS_STATE_STORE_PATH is required when ALIDDNS_STATE_STORE_TYPE=file. \
                    Set it via: export ALIDDNS_STATE_STORE_PATH=/var/lib/aliddns/state.json"
                ),
                Some(_) => {}
            }
        }

        self.log_level()?;
        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "ALIDDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

/// Parse `record_id:domain:rr:type` entries separated by commas
fn parse_records(value: &str) -> Result<Vec<TrackedRecord>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            match parts.as_slice() {
                [id, domain, rr, record_type]
                    if [id, domain, rr, record_type].iter().all(|p| !p.is_empty()) =>
                {
                    Ok(TrackedRecord::new(*id, *domain, *rr, *record_type))
                }
                _ => anyhow::bail!(
                    "Invalid ALIDDNS_RECORDS entry '{}'. Expected record_id:domain:rr:type",
                    entry
                ),
            }
        })
        .collect()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run);

    let config = match Config::from_env(cli.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    if command != Command::Run && !config.ddns.is_configured() {
        eprintln!(
            "Configuration error: ALIDDNS_ACCESS_KEY_ID and ALIDDNS_ACCESS_KEY_SECRET are required"
        );
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match command {
            Command::Run => run_daemon(config).await.map(|()| DdnsExitCode::CleanShutdown),
            Command::Once => run_once(config).await.map(|clean| {
                if clean {
                    DdnsExitCode::CleanShutdown
                } else {
                    DdnsExitCode::RuntimeError
                }
            }),
            Command::ListRecords => list_records(config)
                .await
                .map(|()| DdnsExitCode::CleanShutdown),
        }
    });

    match result {
        Ok(code) => code.into(),
        Err(e) => {
            error!("{:#}", e);
            DdnsExitCode::RuntimeError.into()
        }
    }
}

fn build_provider(config: &DdnsConfig) -> Result<ProviderClient> {
    match &config.credentials {
        Some(credentials) => {
            let api = AliyunDnsApi::new(credentials)?;
            Ok(ProviderClient::new(Arc::new(api), config.update.clone()))
        }
        None => Ok(ProviderClient::unconfigured(config.update.clone())),
    }
}

fn build_engine(config: &DdnsConfig) -> Result<SyncEngine> {
    let resolver = HttpIpResolver::new(&config.ip_lookup)?;
    Ok(SyncEngine::new(Arc::new(resolver), build_provider(config)?))
}

async fn build_state_store(config: &Config) -> Result<Arc<dyn StateStore>> {
    match (config.state_store_type.as_str(), &config.state_store_path) {
        ("file", Some(path)) => {
            let store = FileStateStore::new(path).await?;
            info!("State store: file {}", store.path().display());
            Ok(Arc::new(store))
        }
        _ => {
            info!("State store: memory");
            Ok(Arc::new(MemoryStateStore::new()))
        }
    }
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    info!("Starting aliddnsd daemon");

    if !config.ddns.is_configured() {
        warn!("No AccessKey configured; every cycle will fail until credentials are provided");
    }
    if config.ddns.tracked_records.is_empty() {
        warn!("No records to sync. Use `aliddnsd list-records` and set ALIDDNS_RECORDS");
    }
    for record in &config.ddns.tracked_records {
        info!("Managing record: {} ({})", record.key(), record.record_id);
    }

    let engine = Arc::new(build_engine(&config.ddns)?);
    let state_store = build_state_store(&config).await?;

    let (_records_tx, records_rx) = watch::channel(config.ddns.tracked_records.clone());
    let (scheduler, handle, events) = Scheduler::new(
        engine,
        records_rx,
        SchedulerConfig::from_config(&config.ddns),
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let scheduler_task = tokio::spawn(scheduler.run_with_shutdown(Some(shutdown_rx)));
    let events_task = tokio::spawn(record_events(events, state_store.clone()));

    let signal = wait_for_shutdown(&handle).await?;
    info!("Received shutdown signal: {}", signal);
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler_task).await {
        Ok(joined) => joined.context("Scheduler task panicked")??,
        Err(_) => anyhow::bail!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT),
    }

    // The event channel closes once the scheduler is dropped
    events_task.await.context("Event task panicked")?;
    state_store.flush().await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Persist every cycle outcome in the state store
async fn record_events(mut events: mpsc::Receiver<SchedulerEvent>, store: Arc<dyn StateStore>) {
    while let Some(event) = events.recv().await {
        match event {
            SchedulerEvent::CycleCompleted {
                trigger, results, ..
            } => {
                debug!("{:?} cycle produced {} results", trigger, results.len());
                for result in &results {
                    if let Err(e) = store.record_result(result).await {
                        warn!("Failed to record state for {}: {}", result.key(), e);
                    }
                }
            }
            SchedulerEvent::CycleFailed { trigger, error } => {
                warn!("{:?} cycle failed: {}", trigger, error);
            }
        }
    }
}

/// Run one cycle; returns `false` when any record failed
async fn run_once(config: Config) -> Result<bool> {
    let engine = build_engine(&config.ddns)?;
    let state_store = build_state_store(&config).await?;

    let results = engine.sync(&config.ddns.tracked_records, None).await?;

    for result in &results {
        state_store.record_result(result).await?;
        println!("{}", format_result(result));
    }
    state_store.flush().await?;

    println!("{}", SyncSummary::from(results.as_slice()));
    Ok(results.iter().all(|r| r.status != SyncStatus::Error))
}

/// Print every record of the account, one `ALIDDNS_RECORDS` entry per line
async fn list_records(config: Config) -> Result<()> {
    let provider = build_provider(&config.ddns)?;
    let listing = provider.list_all_records().await?;

    for record in &listing.records {
        println!(
            "{}:{}:{}:{}\t{}\tTTL {}",
            record.record_id,
            record.domain_name,
            record.rr,
            record.record_type,
            record.value,
            record.ttl
        );
    }

    for (domain, message) in &listing.failures {
        eprintln!("Failed to list records of {}: {}", domain, message);
    }

    if !listing.is_complete() {
        anyhow::bail!("{} domain(s) could not be listed", listing.failures.len());
    }
    Ok(())
}

fn format_result(result: &SyncResult) -> String {
    format!(
        "{:<8} {:<40} {}",
        result.status.to_string(),
        result.key(),
        result.message
    )
}

/// Wait for SIGTERM or SIGINT; SIGHUP requests an immediate sync
#[cfg(unix)]
async fn wait_for_shutdown(handle: &SchedulerHandle) -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
    let mut sighup = signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => return Ok("SIGTERM"),
            _ = sigint.recv() => return Ok("SIGINT"),
            _ = sighup.recv() => {
                if handle.refresh_now() {
                    info!("SIGHUP received, syncing now");
                } else {
                    info!("SIGHUP received, but a sync is already running or pending");
                }
            }
        }
    }
}

/// Wait for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown(_handle: &SchedulerHandle) -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
