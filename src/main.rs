mod analytics;
mod cli;
mod config;
mod data;
mod estimation;
mod forecast;
mod monitoring;
mod report;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use analytics::comparison::select_for_comparison;
use analytics::map::map_view;
use analytics::trends::{analyze_market, AnalysisError, Timeframe, TrendFilter};
use cli::{Cli, Command, EstimateArgs, ForecastArgs};
use config::{Config, EnvConfig};
use data::cache::{CachedSource, ListingsCache};
use data::listings_api::RestListingsClient;
use data::source::{FetchPurpose, FetchRequest, ListingSource, MemorySource};
use data::store::{sync_snapshot, SqliteListingStore};
use data::types::{Listing, PropertyType};
use estimation::heuristic::PriceEstimator;
use estimation::service::EstimationService;
use estimation::types::EstimateError;
use estimation::validation::QueryForm;
use forecast::model::{ForecastInput, ForecastModel, MarketIndicators, Period};
use monitoring::logger::CsvLogger;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    // Logs go to stderr so --json output stays clean
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🏠 Baan estimator starting...");

    // Load configuration
    let config = Config::load_or_default(&cli.config)?;
    let env_config = EnvConfig::load()?;
    let offline = cli.offline || env_config.offline.unwrap_or(config.system.offline);

    info!("Offline mode: {}", offline);

    match &cli.command {
        Command::Estimate(args) => {
            let source = build_source(&cli, &config, &env_config, offline)?;
            run_estimate(&cli, &config, source, args).await
        }
        Command::Trends {
            location,
            property_type,
            timeframe,
        } => {
            let source = build_source(&cli, &config, &env_config, offline)?;
            run_trends(
                &cli,
                &config,
                source.as_ref(),
                location.as_deref(),
                property_type.as_deref(),
                timeframe,
            )
            .await
        }
        Command::Compare { search, ids } => {
            let source = build_source(&cli, &config, &env_config, offline)?;
            run_compare(&cli, &config, source.as_ref(), search.as_deref(), ids).await
        }
        Command::Map { search } => {
            let source = build_source(&cli, &config, &env_config, offline)?;
            run_map(&cli, &config, source.as_ref(), search.as_deref()).await
        }
        Command::Forecast(args) => run_forecast(&cli, args),
        Command::Sync => run_sync(&config, &env_config).await,
    }
}

/// JSON export, local snapshot or hosted store, in that order of precedence
fn build_source(
    cli: &Cli,
    config: &Config,
    env_config: &EnvConfig,
    offline: bool,
) -> Result<Arc<dyn ListingSource>> {
    if let Some(path) = &cli.listings_file {
        let source: Arc<dyn ListingSource> = Arc::new(MemorySource::from_json_file(path)?);
        info!("📊 Listings source: {}", source.name());
        return Ok(source);
    }

    let cache = ListingsCache::new(config.cache.clone());

    if offline {
        let store = SqliteListingStore::new(&config.system.database_path)?;
        match store.last_synced_at()? {
            Some(ts) => info!(
                "Local snapshot: {} listings, last synced {}",
                store.count_listings()?,
                ts
            ),
            None => warn!("Local snapshot has never been synced; run `baan sync` first"),
        }
        info!("📊 Listings source: sqlite ({})", config.system.database_path);
        return Ok(Arc::new(CachedSource::new(store, cache)));
    }

    let (url, key) = env_config.store_credentials()?;
    let client = RestListingsClient::new(
        url,
        key,
        config.store.table.clone(),
        config.store.timeout_secs,
    )?;

    info!("📊 Listings source: rest ({})", config.store.table);
    Ok(Arc::new(CachedSource::new(client, cache)))
}

/// Fetch listings, or tell the user why not
async fn fetch_or_report(
    source: &dyn ListingSource,
    request: &FetchRequest,
) -> Option<Vec<Listing>> {
    match source.fetch(request).await {
        Ok(listings) => Some(listings),
        Err(e) => {
            warn!("Fetch from {} failed: {:#}", source.name(), e);
            eprintln!("Could not load listings: {:#}. Please try again.", e);
            None
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn user_message(err: &EstimateError) -> String {
    let message = match err {
        EstimateError::NoData => {
            "No data found for this area. Try a nearby location or another property type.".to_string()
        }
        EstimateError::Store(e) => format!("Could not reach the listings store: {:#}", e),
        other => other.to_string(),
    };

    if err.is_retryable() {
        format!("{}. Please try again.", message)
    } else {
        message
    }
}

async fn run_estimate(
    cli: &Cli,
    config: &Config,
    source: Arc<dyn ListingSource>,
    args: &EstimateArgs,
) -> Result<ExitCode> {
    let logger = if config.monitoring.csv_logging {
        match CsvLogger::new(config.monitoring.csv_log_path.clone()) {
            Ok(logger) => Some(logger),
            Err(e) => {
                warn!("Estimate log disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let service = EstimationService::new(
        source,
        PriceEstimator::new(config.estimator.clone()),
        config.fetch.estimate_limit,
        logger,
    );

    // Batch mode: one result per form, failures don't stop the rest
    if let Some(path) = &args.batch {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file: {}", path))?;
        let forms: Vec<QueryForm> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse batch file: {}", path))?;

        info!("Estimating {} properties from {}", forms.len(), path);
        let results = service.estimate_batch(&forms).await;
        let failed = results.iter().filter(|r| r.is_err()).count();

        if cli.json {
            let values: Vec<serde_json::Value> = results
                .iter()
                .map(|r| match r {
                    Ok(estimate) => serde_json::to_value(estimate),
                    Err(e) => Ok(serde_json::json!({ "error": user_message(e) })),
                })
                .collect::<Result<_, _>>()?;
            print_json(&values)?;
        } else {
            for (i, (form, result)) in forms.iter().zip(&results).enumerate() {
                println!("[{}] {}", i + 1, form.location);
                match result {
                    Ok(estimate) => report::print_estimate(estimate),
                    Err(e) => println!("{}", user_message(e)),
                }
                println!();
            }
        }

        info!("✅ Batch done: {} ok, {} failed", results.len() - failed, failed);
        return Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let form = QueryForm {
        property_type: args.property_type.clone(),
        location: args.location.clone(),
        area: args.area.clone(),
        bedrooms: args.bedrooms.clone(),
        bathrooms: args.bathrooms.clone(),
        year_built: args.year_built.clone(),
        furnished: args.furnished.clone(),
    };

    match service.estimate_form(&form).await {
        Ok(estimate) => {
            if cli.json {
                print_json(&estimate)?;
            } else {
                report::print_estimate(&estimate);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", user_message(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Blank or "all" means every type
fn parse_type_filter(raw: Option<&str>) -> Result<Option<PropertyType>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => Ok(Some(s.parse()?)),
    }
}

async fn run_trends(
    cli: &Cli,
    config: &Config,
    source: &dyn ListingSource,
    location: Option<&str>,
    property_type: Option<&str>,
    timeframe: &str,
) -> Result<ExitCode> {
    let property_type = match parse_type_filter(property_type) {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("Invalid input: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let request = FetchRequest::recent(FetchPurpose::Trends, config.fetch.trends_limit);
    let Some(listings) = fetch_or_report(source, &request).await else {
        return Ok(ExitCode::FAILURE);
    };

    let filter = TrendFilter::new(location, property_type, Timeframe::parse(timeframe));

    match analyze_market(&listings, &filter, Utc::now().date_naive()) {
        Ok(analysis) => {
            if cli.json {
                print_json(&analysis)?;
            } else {
                report::print_analysis(&analysis);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_analysis_error(&e)),
    }
}

/// Empty store and empty search are told apart
fn report_analysis_error(err: &AnalysisError) -> ExitCode {
    match err {
        AnalysisError::NoData => eprintln!("No data found for selected criteria"),
        AnalysisError::NoMatches(search) => {
            eprintln!("No listings match \"{}\". Try a broader search.", search)
        }
    }
    ExitCode::FAILURE
}

async fn run_compare(
    cli: &Cli,
    config: &Config,
    source: &dyn ListingSource,
    search: Option<&str>,
    ids: &[String],
) -> Result<ExitCode> {
    let request = FetchRequest::recent(FetchPurpose::Comparison, config.fetch.comparison_limit);
    let Some(listings) = fetch_or_report(source, &request).await else {
        return Ok(ExitCode::FAILURE);
    };

    let set = match select_for_comparison(&listings, search.unwrap_or(""), ids) {
        Ok(set) => set,
        Err(e) => return Ok(report_analysis_error(&e)),
    };

    let picked: Vec<&str> = set.listings().iter().map(|l| l.listing_id.as_str()).collect();
    info!("Comparing {} listings: {}", set.len(), picked.join(", "));
    let summary = set.summary(Utc::now().year());

    if cli.json {
        print_json(&summary)?;
    } else {
        report::print_comparison(&summary);
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_map(
    cli: &Cli,
    config: &Config,
    source: &dyn ListingSource,
    search: Option<&str>,
) -> Result<ExitCode> {
    let request = FetchRequest {
        purpose: FetchPurpose::Map,
        limit: config.fetch.map_limit,
        geolocated_only: true,
    };
    let Some(listings) = fetch_or_report(source, &request).await else {
        return Ok(ExitCode::FAILURE);
    };

    let view = match map_view(&listings, search.unwrap_or("")) {
        Ok(view) => view,
        Err(e) => return Ok(report_analysis_error(&e)),
    };

    if cli.json {
        print_json(&view)?;
    } else {
        report::print_map(&view);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_forecast(cli: &Cli, args: &ForecastArgs) -> Result<ExitCode> {
    let property_type: PropertyType = match args.property_type.parse() {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("Invalid input: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut periods = Vec::with_capacity(args.periods.len());
    for raw in &args.periods {
        match Period::parse(raw) {
            Some(period) => periods.push(period),
            None => {
                eprintln!("Invalid input: unknown period {} (use 3m, 6m, 1y, 2y or 5y)", raw);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(args.area) || !positive(args.price) {
        eprintln!("Invalid input: area and price must be positive numbers");
        return Ok(ExitCode::FAILURE);
    }

    let input = ForecastInput {
        location: args.location.clone(),
        property_type,
        area_sq_m: args.area,
        current_price: args.price,
        indicators: MarketIndicators {
            gdp_growth: args.gdp_growth,
            interest_rate: args.interest_rate,
            inflation_rate: args.inflation_rate,
            population_growth: args.population_growth,
            construction_index: args.construction_index,
        },
    };

    let mut rng = rand::thread_rng();
    let mut model = ForecastModel::default();
    if args.retrain {
        model = model.retrain(std::slice::from_ref(&input), &mut rng);
    }

    let forecast = model.forecast(&input, &periods, Utc::now().month0(), &mut rng);

    if cli.json {
        print_json(&forecast)?;
    } else {
        report::print_forecast(&forecast);
    }

    Ok(ExitCode::SUCCESS)
}

/// Copy the hosted listings table into the local SQLite snapshot
async fn run_sync(config: &Config, env_config: &EnvConfig) -> Result<ExitCode> {
    let (url, key) = env_config.store_credentials()?;
    let client = RestListingsClient::new(
        url,
        key,
        config.store.table.clone(),
        config.store.timeout_secs,
    )?;

    info!("Initializing database: {}", config.system.database_path);
    let store = SqliteListingStore::new(&config.system.database_path)?;

    let request = FetchRequest::recent(FetchPurpose::Estimate, config.fetch.sync_limit);
    match sync_snapshot(&client, &store, &request).await {
        Ok(written) => {
            info!("✅ Snapshot holds {} listings", store.count_listings()?);
            println!("Synced {} listings", written);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Sync failed: {:#}. Please try again.", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
