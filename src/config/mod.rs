//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use cron::Schedule;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "ritaglio";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_EXPIRE_INTERVAL_SECS: u64 = 60;
const DEFAULT_POPULARITY_INTERVAL_SECS: u64 = 300;
const DEFAULT_PASS_TIMEOUT_SECS: u64 = 120;
/// Daily at 04:00.
const DEFAULT_PURGE_CRON: &str = "0 0 4 * * *";
/// Nightly at 03:30.
const DEFAULT_RATING_CRON: &str = "0 30 3 * * *";
const DEFAULT_POPULARITY_THRESHOLD: i64 = 1000;
const DEFAULT_POPULAR_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_VIEW_DEDUP_WINDOW_SECS: u64 = 30 * 60;
const DEFAULT_RETENTION_DAYS: u32 = 30;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: u32 = 1024;
const DEFAULT_OUTBOUND_FLUSH_INTERVAL_MS: u64 = 500;

/// Command-line arguments for the ritaglio binary.
#[derive(Debug, Parser)]
#[command(name = "ritaglio", version, about = "Ritaglio paste service engine")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "RITAGLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the lifecycle engine: background passes plus the outbound forwarder.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the expire pass period.
    #[arg(long = "scheduler-expire-interval-seconds", value_name = "SECONDS")]
    pub expire_interval_seconds: Option<u64>,

    /// Override the popularity pass period.
    #[arg(long = "scheduler-popularity-interval-seconds", value_name = "SECONDS")]
    pub popularity_interval_seconds: Option<u64>,

    /// Override the purge pass cron expression.
    #[arg(long = "scheduler-purge-cron", value_name = "CRON")]
    pub purge_cron: Option<String>,

    /// Override the rating pass cron expression.
    #[arg(long = "scheduler-rating-cron", value_name = "CRON")]
    pub rating_cron: Option<String>,

    /// Override the per-pass execution timeout.
    #[arg(long = "scheduler-pass-timeout-seconds", value_name = "SECONDS")]
    pub pass_timeout_seconds: Option<u64>,

    /// Override the popularity view threshold.
    #[arg(long = "engine-popularity-threshold", value_name = "VIEWS")]
    pub popularity_threshold: Option<i64>,

    /// Override the popular-paste cache TTL.
    #[arg(long = "engine-popular-cache-ttl-seconds", value_name = "SECONDS")]
    pub popular_cache_ttl_seconds: Option<u64>,

    /// Override the view dedup window.
    #[arg(long = "engine-view-dedup-window-seconds", value_name = "SECONDS")]
    pub view_dedup_window_seconds: Option<u64>,

    /// Override the soft-delete retention window.
    #[arg(long = "engine-retention-days", value_name = "DAYS")]
    pub retention_days: Option<u32>,

    /// Override the hash directory base URL.
    #[arg(long = "outbound-hash-service-url", value_name = "URL")]
    pub hash_service_url: Option<String>,

    /// Override the notification channel endpoint.
    #[arg(long = "outbound-notification-url", value_name = "URL")]
    pub notification_url: Option<String>,

    /// Override the search index channel endpoint.
    #[arg(long = "outbound-search-index-url", value_name = "URL")]
    pub search_index_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub scheduler: SchedulerSettings,
    pub engine: EngineSettings,
    pub outbound: OutboundSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub expire_interval: Duration,
    pub popularity_interval: Duration,
    pub purge_schedule: Schedule,
    pub rating_schedule: Schedule,
    pub pass_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub popularity_threshold: i64,
    pub popular_cache_ttl: Duration,
    pub view_dedup_window: Duration,
    pub retention_window: time::Duration,
}

#[derive(Debug, Clone)]
pub struct OutboundSettings {
    pub queue_capacity: usize,
    pub flush_interval: Duration,
    pub hash_service_url: Option<Url>,
    pub notification_url: Option<Url>,
    pub search_index_url: Option<Url>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse the CLI and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("RITAGLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    scheduler: RawSchedulerSettings,
    engine: RawEngineSettings,
    outbound: RawOutboundSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSchedulerSettings {
    expire_interval_seconds: Option<u64>,
    popularity_interval_seconds: Option<u64>,
    purge_cron: Option<String>,
    rating_cron: Option<String>,
    pass_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEngineSettings {
    popularity_threshold: Option<i64>,
    popular_cache_ttl_seconds: Option<u64>,
    view_dedup_window_seconds: Option<u64>,
    retention_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOutboundSettings {
    queue_capacity: Option<u32>,
    flush_interval_ms: Option<u64>,
    hash_service_url: Option<String>,
    notification_url: Option<String>,
    search_index_url: Option<String>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(seconds) = overrides.expire_interval_seconds {
            self.scheduler.expire_interval_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.popularity_interval_seconds {
            self.scheduler.popularity_interval_seconds = Some(seconds);
        }
        if let Some(cron) = overrides.purge_cron.as_ref() {
            self.scheduler.purge_cron = Some(cron.clone());
        }
        if let Some(cron) = overrides.rating_cron.as_ref() {
            self.scheduler.rating_cron = Some(cron.clone());
        }
        if let Some(seconds) = overrides.pass_timeout_seconds {
            self.scheduler.pass_timeout_seconds = Some(seconds);
        }
        if let Some(threshold) = overrides.popularity_threshold {
            self.engine.popularity_threshold = Some(threshold);
        }
        if let Some(seconds) = overrides.popular_cache_ttl_seconds {
            self.engine.popular_cache_ttl_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.view_dedup_window_seconds {
            self.engine.view_dedup_window_seconds = Some(seconds);
        }
        if let Some(days) = overrides.retention_days {
            self.engine.retention_days = Some(days);
        }
        if let Some(url) = overrides.hash_service_url.as_ref() {
            self.outbound.hash_service_url = Some(url.clone());
        }
        if let Some(url) = overrides.notification_url.as_ref() {
            self.outbound.notification_url = Some(url.clone());
        }
        if let Some(url) = overrides.search_index_url.as_ref() {
            self.outbound.search_index_url = Some(url.clone());
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            scheduler,
            engine,
            outbound,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            scheduler: build_scheduler_settings(scheduler)?,
            engine: build_engine_settings(engine)?,
            outbound: build_outbound_settings(outbound)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database.max_connections.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_scheduler_settings(
    scheduler: RawSchedulerSettings,
) -> Result<SchedulerSettings, LoadError> {
    let expire_interval = positive_seconds(
        scheduler
            .expire_interval_seconds
            .unwrap_or(DEFAULT_EXPIRE_INTERVAL_SECS),
        "scheduler.expire_interval_seconds",
    )?;
    let popularity_interval = positive_seconds(
        scheduler
            .popularity_interval_seconds
            .unwrap_or(DEFAULT_POPULARITY_INTERVAL_SECS),
        "scheduler.popularity_interval_seconds",
    )?;
    let pass_timeout = positive_seconds(
        scheduler
            .pass_timeout_seconds
            .unwrap_or(DEFAULT_PASS_TIMEOUT_SECS),
        "scheduler.pass_timeout_seconds",
    )?;

    let purge_schedule = parse_cron(
        scheduler
            .purge_cron
            .as_deref()
            .unwrap_or(DEFAULT_PURGE_CRON),
        "scheduler.purge_cron",
    )?;
    let rating_schedule = parse_cron(
        scheduler
            .rating_cron
            .as_deref()
            .unwrap_or(DEFAULT_RATING_CRON),
        "scheduler.rating_cron",
    )?;

    Ok(SchedulerSettings {
        expire_interval,
        popularity_interval,
        purge_schedule,
        rating_schedule,
        pass_timeout,
    })
}

fn build_engine_settings(engine: RawEngineSettings) -> Result<EngineSettings, LoadError> {
    let popularity_threshold = engine
        .popularity_threshold
        .unwrap_or(DEFAULT_POPULARITY_THRESHOLD);
    if popularity_threshold <= 0 {
        return Err(LoadError::invalid(
            "engine.popularity_threshold",
            "must be greater than zero",
        ));
    }

    let popular_cache_ttl = positive_seconds(
        engine
            .popular_cache_ttl_seconds
            .unwrap_or(DEFAULT_POPULAR_CACHE_TTL_SECS),
        "engine.popular_cache_ttl_seconds",
    )?;
    let view_dedup_window = positive_seconds(
        engine
            .view_dedup_window_seconds
            .unwrap_or(DEFAULT_VIEW_DEDUP_WINDOW_SECS),
        "engine.view_dedup_window_seconds",
    )?;

    let retention_days = engine.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS);
    if retention_days == 0 {
        return Err(LoadError::invalid(
            "engine.retention_days",
            "must be greater than zero",
        ));
    }

    Ok(EngineSettings {
        popularity_threshold,
        popular_cache_ttl,
        view_dedup_window,
        retention_window: time::Duration::days(i64::from(retention_days)),
    })
}

fn build_outbound_settings(outbound: RawOutboundSettings) -> Result<OutboundSettings, LoadError> {
    let queue_capacity = outbound
        .queue_capacity
        .unwrap_or(DEFAULT_OUTBOUND_QUEUE_CAPACITY);
    if queue_capacity == 0 {
        return Err(LoadError::invalid(
            "outbound.queue_capacity",
            "must be greater than zero",
        ));
    }

    let flush_interval_ms = outbound
        .flush_interval_ms
        .unwrap_or(DEFAULT_OUTBOUND_FLUSH_INTERVAL_MS);
    if flush_interval_ms == 0 {
        return Err(LoadError::invalid(
            "outbound.flush_interval_ms",
            "must be greater than zero",
        ));
    }

    Ok(OutboundSettings {
        queue_capacity: queue_capacity as usize,
        flush_interval: Duration::from_millis(flush_interval_ms),
        hash_service_url: parse_url(outbound.hash_service_url, "outbound.hash_service_url")?,
        notification_url: parse_url(outbound.notification_url, "outbound.notification_url")?,
        search_index_url: parse_url(outbound.search_index_url, "outbound.search_index_url")?,
    })
}

fn parse_cron(expression: &str, key: &'static str) -> Result<Schedule, LoadError> {
    Schedule::from_str(expression)
        .map_err(|err| LoadError::invalid(key, format!("failed to parse `{expression}`: {err}")))
}

fn parse_url(value: Option<String>, key: &'static str) -> Result<Option<Url>, LoadError> {
    value
        .and_then(|raw| {
            let trimmed = raw.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        })
        .map(|raw| Url::parse(&raw).map_err(|err| LoadError::invalid(key, err.to_string())))
        .transpose()
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_u32(value: u32, key: &'static str) -> Result<NonZeroU32, LoadError> {
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
