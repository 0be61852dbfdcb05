//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::techaura_adapter::TechauraClient;
use crate::domain::config_validation::{Settings, build_settings};
use crate::domain::dataset::DatasetStore;
use crate::domain::dcf::{self, DEFAULT_PERIODS};
use crate::domain::error::AnalystError;
use crate::domain::ratios::{self, LeverageRatios, LiquidityRatios, ProfitabilityRatios};
use crate::domain::risk::{RatioSnapshot, RiskAlert, generate_alerts};
use crate::domain::sales_sync::{self, DEFAULT_SALES_DATASET, SalesWindow, SyncReport};
use crate::domain::timestamp;
use crate::domain::tools::{self, DEFAULT_DATASET, DEFAULT_TREND_COLUMN};
use crate::domain::trend::analyze_trend;

#[derive(Parser, Debug)]
#[command(name = "fin-analyst", about = "Financial analysis toolkit", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Descriptive statistics and growth for one CSV column
    Trend {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long, default_value = DEFAULT_TREND_COLUMN)]
        column: String,
    },
    /// Discounted cash flow projection
    Dcf {
        #[arg(long, allow_hyphen_values = true)]
        flow: f64,
        /// Annual growth rate in percent
        #[arg(long, allow_hyphen_values = true)]
        growth: f64,
        /// Annual discount rate in percent
        #[arg(long, allow_hyphen_values = true)]
        discount: f64,
        #[arg(long, default_value_t = DEFAULT_PERIODS)]
        periods: u32,
    },
    /// Financial ratios and the risk alerts they raise
    Ratios(RatioArgs),
    /// Print the tool declarations as JSON
    Tools,
    /// Pull sales from Techaura and print them as dataset records
    SalesSync {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Start of the window (ISO 8601); defaults to `window_days` before the end
        #[arg(long, value_parser = timestamp::parse)]
        from: Option<NaiveDateTime>,
        /// End of the window (ISO 8601); defaults to now
        #[arg(long, value_parser = timestamp::parse)]
        to: Option<NaiveDateTime>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct RatioArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub current_assets: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub current_liabilities: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub inventory: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub total_liabilities: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub total_assets: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub equity: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub net_income: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub revenue: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RatioReport {
    #[serde(rename = "liquidez", skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<LiquidityRatios>,
    #[serde(rename = "endeudamiento", skip_serializing_if = "Option::is_none")]
    pub leverage: Option<LeverageRatios>,
    #[serde(rename = "rentabilidad", skip_serializing_if = "Option::is_none")]
    pub profitability: Option<ProfitabilityRatios>,
    #[serde(rename = "alertas")]
    pub alerts: Vec<RiskAlert>,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: Command) -> Result<(), AnalystError> {
    match command {
        Command::Serve { config } => run_serve(config.as_ref()),
        Command::Trend { file, column } => run_trend(&file, &column),
        Command::Dcf {
            flow,
            growth,
            discount,
            periods,
        } => dcf::project(flow, growth, discount, periods).and_then(|r| print_json(&r)),
        Command::Ratios(args) => ratio_report(&args).and_then(|r| print_json(&r)),
        Command::Tools => print_json(&tools::declarations()),
        Command::SalesSync {
            config,
            from,
            to,
            limit,
        } => sync_sales(config.as_ref(), from, to, limit).and_then(|r| print_json(&r)),
    }
}

/// Installs the global subscriber. Output goes to stderr so stdout stays
/// machine-readable. `RUST_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let json = std::env::var("RUST_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    // A second call (tests driving `run` repeatedly) keeps the first subscriber.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

pub fn load_settings(path: Option<&PathBuf>) -> Result<Settings, AnalystError> {
    let adapter = match path {
        Some(p) => {
            tracing::info!(path = %p.display(), "loading config");
            FileConfigAdapter::from_file(p)?
        }
        None => FileConfigAdapter::empty(),
    };
    build_settings(&adapter)
}

pub fn ratio_report(args: &RatioArgs) -> Result<RatioReport, AnalystError> {
    let liquidity = match (args.current_assets, args.current_liabilities) {
        (Some(assets), Some(liabilities)) => Some(ratios::liquidity_ratios(
            assets,
            liabilities,
            args.inventory,
        )?),
        _ => None,
    };
    let leverage = match (args.total_liabilities, args.total_assets, args.equity) {
        (Some(liabilities), Some(assets), Some(equity)) => {
            Some(ratios::leverage_ratios(liabilities, assets, equity)?)
        }
        _ => None,
    };
    let profitability = match (args.net_income, args.revenue, args.total_assets, args.equity) {
        (Some(income), Some(revenue), Some(assets), Some(equity)) => Some(
            ratios::profitability_ratios(income, revenue, assets, equity)?,
        ),
        _ => None,
    };

    if liquidity.is_none() && leverage.is_none() && profitability.is_none() {
        return Err(AnalystError::invalid_input(
            "no complete ratio group given (need current assets and liabilities, \
             total liabilities, assets and equity, or net income, revenue, assets and equity)",
        ));
    }

    let snapshot =
        RatioSnapshot::from_ratios(liquidity.as_ref(), leverage.as_ref(), profitability.as_ref());
    Ok(RatioReport {
        liquidity,
        leverage,
        profitability,
        alerts: generate_alerts(&snapshot),
    })
}

fn run_trend(file: &PathBuf, column: &str) -> Result<(), AnalystError> {
    tracing::info!(path = %file.display(), "loading CSV");
    let records = csv_adapter::load_file(file)?;
    let store = DatasetStore::new();
    store.store(DEFAULT_DATASET, records);
    let result = analyze_trend(&store, DEFAULT_DATASET, column)?;
    print_json(&result)
}

pub fn sync_sales(
    config_path: Option<&PathBuf>,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    limit: Option<usize>,
) -> Result<SyncReport, AnalystError> {
    let settings = load_settings(config_path)?;
    let window = SalesWindow::resolve(
        from,
        to,
        limit,
        &settings.sales,
        chrono::Local::now().naive_local(),
    )?;
    let client = TechauraClient::new(settings.sales);
    let store = DatasetStore::new();
    sales_sync::sync_sales(&client, &store, DEFAULT_SALES_DATASET, &window)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AnalystError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AnalystError::invalid_input(format!("unserializable output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn run_serve(config_path: Option<&PathBuf>) -> Result<(), AnalystError> {
    let settings = load_settings(config_path)?;

    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};

        let listen = settings.listen;
        let router = build_router(AppState::new(settings));

        tokio::runtime::Runtime::new()?.block_on(async {
            let listener = tokio::net::TcpListener::bind(listen).await?;
            tracing::info!(%listen, "serving HTTP API");
            axum::serve(listener, router).await?;
            Ok::<(), AnalystError>(())
        })
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = settings;
        Err(AnalystError::invalid_input(
            "serve requires the `web` feature",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_negative_growth() {
        let cli = Cli::try_parse_from([
            "fin-analyst",
            "dcf",
            "--flow",
            "100",
            "--growth",
            "-5",
            "--discount",
            "10",
        ])
        .unwrap();
        match cli.command {
            Command::Dcf {
                growth, periods, ..
            } => {
                assert_eq!(growth, -5.0);
                assert_eq!(periods, DEFAULT_PERIODS);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn trend_column_defaults_to_revenue() {
        let cli = Cli::try_parse_from(["fin-analyst", "trend", "--file", "data.csv"]).unwrap();
        match cli.command {
            Command::Trend { column, .. } => assert_eq!(column, "ingresos"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn ratio_report_requires_a_group() {
        let err = ratio_report(&RatioArgs {
            current_assets: Some(100.0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AnalystError::InvalidInput { .. }));
    }

    #[test]
    fn ratio_report_raises_alerts() {
        let report = ratio_report(&RatioArgs {
            current_assets: Some(80.0),
            current_liabilities: Some(100.0),
            total_liabilities: Some(800.0),
            total_assets: Some(1000.0),
            equity: Some(200.0),
            ..Default::default()
        })
        .unwrap();
        assert!(report.profitability.is_none());
        let categories: Vec<&str> = report.alerts.iter().map(|a| a.category.as_str()).collect();
        assert_eq!(categories, vec!["liquidez", "endeudamiento"]);
    }

    #[test]
    fn parses_sales_window() {
        let cli = Cli::try_parse_from([
            "fin-analyst",
            "sales-sync",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-10T00:00:00Z",
            "--limit",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::SalesSync {
                from, to, limit, ..
            } => {
                assert_eq!(from.unwrap().to_string(), "2024-01-01 00:00:00");
                assert_eq!(to.unwrap().to_string(), "2024-01-10 00:00:00");
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_sales_date_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["fin-analyst", "sales-sync", "--from", "ayer"]).is_err());
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let err = load_settings(Some(&PathBuf::from("/nonexistent/fin.ini"))).unwrap_err();
        assert!(matches!(err, AnalystError::ConfigParse { .. }));
    }

    #[test]
    fn no_config_gives_defaults() {
        assert_eq!(load_settings(None).unwrap(), Settings::default());
    }
}
