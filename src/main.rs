use std::{process, sync::Arc};

use clap::CommandFactory;
use gamedex::{
    application::{
        catalog::{
            CatalogContext, ConceptsService, GamesService, PeopleService, PlatformsService,
            ReleaseFilter, ReleaseService,
        },
        error::AppError,
        images::ImageResolver,
        repos::PageSource,
    },
    cache::{
        CacheConfig, CacheService, InMemoryVersionStore, KNOWN_PREFIXES, MemoryBackend,
        VersionStore, is_known_prefix,
    },
    config::{self, CliArgs, Command, PurgeArgs, ReleasesArgs, Settings},
    infra::{db::PostgresRepositories, error::InfraError, smw::SmwClient, telemetry},
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %report.render(), source = report.source, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.render(), source = report.source, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Migrate => run_migrate(&settings).await,
        Command::Purge(args) => {
            let cache = build_cache(&settings).await?;
            run_purge(&cache, args).await
        }
        command => run_query(&settings, command).await,
    }
}

async fn run_migrate(settings: &Settings) -> Result<(), AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::from(InfraError::configuration(
            "database.url is required for migrations",
        ))
    })?;
    let pool =
        PostgresRepositories::connect(url, settings.database.max_connections.get())
            .await
            .map_err(InfraError::from)?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    info!("Migrations applied");
    Ok(())
}

async fn init_version_store(settings: &Settings) -> Result<Arc<dyn VersionStore>, AppError> {
    let Some(url) = settings.database.url.as_deref() else {
        warn!("No database configured, cache versions are kept in memory");
        return Ok(Arc::new(InMemoryVersionStore::new()));
    };
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;
    let repositories = PostgresRepositories::new(pool);
    repositories
        .health_check()
        .await
        .map_err(InfraError::from)?;
    Ok(Arc::new(repositories))
}

async fn build_cache(settings: &Settings) -> Result<Arc<CacheService>, AppError> {
    let versions = init_version_store(settings).await?;
    let config = CacheConfig::from(&settings.cache);
    let backend = Arc::new(MemoryBackend::new(&config));
    Ok(Arc::new(CacheService::new(backend, versions, config)))
}

async fn build_catalog(settings: &Settings) -> Result<Arc<CatalogContext>, AppError> {
    let cache = build_cache(settings).await?;
    let smw = Arc::new(SmwClient::new(&settings.store)?);
    let pages: Arc<dyn PageSource> = smw.clone();
    let images = ImageResolver::new(
        Some(pages),
        settings.store.wiki_base_url.clone(),
        settings.images.legacy_host.clone(),
    );
    Ok(Arc::new(CatalogContext::new(
        smw,
        cache,
        images,
        settings.store.count_limit.get(),
    )))
}

async fn run_query(settings: &Settings, command: Command) -> Result<(), AppError> {
    let ctx = build_catalog(settings).await?;
    match command {
        Command::Games(args) => {
            let filter = args.to_filter()?;
            print_json(&GamesService::games(ctx).query(&filter).await)
        }
        Command::Platforms(args) => {
            let filter = args.to_filter()?;
            print_json(&PlatformsService::platforms(ctx).query(&filter).await)
        }
        Command::People(args) => {
            let filter = args.to_filter()?;
            print_json(&PeopleService::people(ctx).query(&filter).await)
        }
        Command::Concepts(args) => {
            let filter = args.to_filter()?;
            print_json(&ConceptsService::concepts(ctx).query(&filter).await)
        }
        Command::Releases(args) => run_releases(ctx, args).await,
        Command::PlatformList => print_json(&ctx.directory.all_platforms().await),
        Command::Purge(_) | Command::Migrate => Err(AppError::unexpected(
            "administrative command routed to the query runner",
        )),
    }
}

async fn run_releases(ctx: Arc<CatalogContext>, args: ReleasesArgs) -> Result<(), AppError> {
    let today = args
        .from
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());
    let mut filter = ReleaseFilter::new(today);
    if let Some(region) = args.region.as_deref() {
        filter = filter.with_region(region);
    }
    if let Some(platform) = args.platform.as_deref() {
        filter = filter.with_platform(platform);
    }
    if let Some(limit) = args.limit {
        filter.limit = limit.max(1);
    }

    let service = ReleaseService::new(ctx);
    if args.grouped {
        print_json(&service.calendar(&filter).await)
    } else {
        print_json(&service.query(&filter).await)
    }
}

async fn run_purge(cache: &CacheService, args: PurgeArgs) -> Result<(), AppError> {
    if args.is_empty() {
        let mut command = CliArgs::command();
        if let Some(purge) = command.find_subcommand_mut("purge") {
            purge
                .print_help()
                .map_err(|err| AppError::from(InfraError::from(err)))?;
        }
        return Err(AppError::validation(
            "purge needs one of --all, --prefix, --key, --list or --clear",
        ));
    }

    if args.clear {
        cache.clear().await?;
        println!("cache backend cleared");
    }

    if !args.keys.is_empty() {
        let (mut removed, mut missing, mut failed) = (0usize, 0usize, 0usize);
        for key in &args.keys {
            match cache.purge_key(key).await {
                Ok(true) => removed += 1,
                Ok(false) => missing += 1,
                Err(err) => {
                    warn!(key, error = %err, "Failed to purge key");
                    failed += 1;
                }
            }
        }
        println!("keys: {removed} removed, {missing} missing, {failed} failed");
    }

    if args.all {
        for (prefix, change) in cache.purge_all().await? {
            println!("{prefix}: v{} -> v{}", change.old, change.new);
        }
    }

    for prefix in &args.prefixes {
        if !is_known_prefix(prefix) {
            warn!(prefix, "Purging a prefix outside the known registry");
        }
        let old = cache.current_version(prefix).await;
        let new = cache.purge_by_prefix(prefix).await?;
        println!("{prefix}: v{old} -> v{new}");
    }

    if args.list {
        for prefix in KNOWN_PREFIXES {
            println!("{prefix}: v{}", cache.current_version(prefix).await);
        }
        println!("{} known prefixes", KNOWN_PREFIXES.len());
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{out}");
    Ok(())
}
