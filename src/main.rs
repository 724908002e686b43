use std::{process, sync::Arc};

use ritaglio::{
    application::{
        error::AppError,
        jobs::{
            Cadence, EngineTuning, PassContext, PassHandle, run_expire_pass,
            run_popularity_pass, run_purge_pass, run_rating_pass, spawn_pass,
        },
        outbound::{HashDirectory, NotificationPublisher, SearchIndexPublisher},
        repos::{NotificationLedgerRepo, PastesRepo, PastesWriteRepo, ReviewsRepo},
    },
    cache::{MemoryResponseCache, ResponseCache},
    config,
    infra::{
        clients::{DisabledHashDirectory, HttpHashDirectory},
        db::PostgresRepositories,
        error::InfraError,
        events::{OutboundForwarder, OutboundQueue},
        telemetry,
    },
};
use time::OffsetDateTime;
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let _repositories = init_repositories(&settings).await?;
    info!(target: "ritaglio::migrate", "migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let pastes_repo: Arc<dyn PastesRepo> = repositories.clone();
    let writes_repo: Arc<dyn PastesWriteRepo> = repositories.clone();
    let reviews_repo: Arc<dyn ReviewsRepo> = repositories.clone();
    let ledger_repo: Arc<dyn NotificationLedgerRepo> = repositories.clone();

    let cache: Arc<dyn ResponseCache> = Arc::new(MemoryResponseCache::new());
    let queue = Arc::new(OutboundQueue::new(settings.outbound.queue_capacity));
    let notifications: Arc<dyn NotificationPublisher> = queue.clone();
    let search: Arc<dyn SearchIndexPublisher> = queue.clone();

    let http = reqwest::Client::builder()
        .build()
        .map_err(|err| AppError::unexpected(format!("failed to build http client: {err}")))?;

    let hashes: Arc<dyn HashDirectory> = match settings.outbound.hash_service_url.clone() {
        Some(url) => Arc::new(HttpHashDirectory::new(http.clone(), url)),
        None => Arc::new(DisabledHashDirectory),
    };

    let context = PassContext {
        pastes: pastes_repo,
        writes: writes_repo,
        reviews: reviews_repo,
        ledger: ledger_repo,
        cache,
        notifications,
        search,
        hashes,
        tuning: EngineTuning {
            popularity_threshold: settings.engine.popularity_threshold,
            popular_cache_ttl: settings.engine.popular_cache_ttl,
            retention_window: settings.engine.retention_window,
        },
    };

    let pass_timeout = settings.scheduler.pass_timeout;
    let mut passes = Vec::new();

    let expire_context = context.clone();
    passes.push(spawn_pass(
        "expire",
        Cadence::Every(settings.scheduler.expire_interval),
        pass_timeout,
        move || {
            let context = expire_context.clone();
            async move {
                run_expire_pass(&context, OffsetDateTime::now_utc())
                    .await
                    .map(|_| ())
            }
        },
    ));

    let popularity_context = context.clone();
    passes.push(spawn_pass(
        "popularity",
        Cadence::Every(settings.scheduler.popularity_interval),
        pass_timeout,
        move || {
            let context = popularity_context.clone();
            async move {
                run_popularity_pass(&context, OffsetDateTime::now_utc())
                    .await
                    .map(|_| ())
            }
        },
    ));

    let purge_context = context.clone();
    passes.push(spawn_pass(
        "purge",
        Cadence::Cron(Box::new(settings.scheduler.purge_schedule.clone())),
        pass_timeout,
        move || {
            let context = purge_context.clone();
            async move {
                run_purge_pass(&context, OffsetDateTime::now_utc())
                    .await
                    .map(|_| ())
            }
        },
    ));

    let rating_context = context.clone();
    passes.push(spawn_pass(
        "rating",
        Cadence::Cron(Box::new(settings.scheduler.rating_schedule.clone())),
        pass_timeout,
        move || {
            let context = rating_context.clone();
            async move { run_rating_pass(&context).await.map(|_| ()) }
        },
    ));

    // Outbound forwarder loop: drains the event queue toward the
    // notification and search collaborators.
    let forwarder = OutboundForwarder::new(
        queue,
        http,
        settings.outbound.notification_url.clone(),
        settings.outbound.search_index_url.clone(),
    );
    let flush_interval = settings.outbound.flush_interval;
    let forwarder_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(flush_interval);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            forwarder.flush().await;
        }
    });

    info!(
        target: "ritaglio::serve",
        passes = passes.len(),
        "lifecycle engine running"
    );

    signal::ctrl_c()
        .await
        .map_err(|err| AppError::unexpected(format!("failed to listen for shutdown: {err}")))?;

    info!(target: "ritaglio::serve", "shutdown requested");

    futures::future::join_all(passes.into_iter().map(PassHandle::shutdown)).await;
    forwarder_handle.abort();
    let _ = forwarder_handle.await;

    Ok(())
}
