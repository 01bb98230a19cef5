//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::adapters::csv_adapter::CsvPriceSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_chart::{SvgChartReport, DEFAULT_CHART};
use crate::adapters::xlsx_report::{XlsxReport, DEFAULT_WORKBOOK};
use crate::domain::asset::Universe;
use crate::domain::backtest::{
    build_portfolios, BacktestConfig, BacktestResult, Backtester, DataConfig, MarketData,
    PortfolioSpec,
};
use crate::domain::config_validation::{
    build_universe, parse_bool, parse_date, parse_number, portfolio_sections, validate_config,
};
use crate::domain::error::BacktestError;
use crate::domain::metrics::{round_to, PerformanceSummary};
use crate::domain::portfolio::{Portfolio, DEFAULT_INITIAL_VALUE};
use crate::domain::weights::{Allocation, WeightCheck};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "allocbt",
    about = "Backtest static equity/bond portfolios with bitcoin and gold sleeves"
)]
pub struct Cli {
    /// trace, debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and export the results
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Workbook path (overrides [export] workbook)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Chart path (overrides [export] chart)
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Print results only
        #[arg(long)]
        no_export: bool,
    },
    /// Validate a configuration and show the resulting portfolios
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    // a subscriber may already be installed when embedded
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level);
    let outcome = match cli.command {
        Command::Backtest {
            config,
            output,
            chart,
            no_export,
        } => run_backtest(&config, output, chart, no_export),
        Command::Validate { config } => run_validate(&config),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BacktestError> {
    FileConfigAdapter::from_file(path).map_err(|e| BacktestError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_data_config(config: &dyn ConfigPort) -> Result<DataConfig, BacktestError> {
    Ok(DataConfig {
        universe: build_universe(config),
        start_date: parse_date(config, "data", "start_date")?,
        end_date: parse_date(config, "data", "end_date")?,
    })
}

fn build_portfolio_spec(
    config: &dyn ConfigPort,
    number: usize,
    section: &str,
) -> Result<PortfolioSpec, BacktestError> {
    Ok(PortfolioSpec {
        number,
        name: config.get_string(section, "name"),
        allocation: Allocation {
            btc_pct: parse_number(config, section, "btc", 0.0)?,
            btc_from_equities_pct: parse_number(config, section, "btc_from_equities", 0.5)?,
            gld_pct: parse_number(config, section, "gld", 0.0)?,
            gld_from_equities_pct: parse_number(config, section, "gld_from_equities", 0.5)?,
        },
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    let defaults = BacktestConfig::default();

    let weight_check = match config.get_string("backtest", "weight_check") {
        Some(mode) => mode
            .parse::<WeightCheck>()
            .map_err(|reason| BacktestError::config_invalid("backtest", "weight_check", reason))?,
        None => defaults.weight_check,
    };

    let sections = portfolio_sections(config)?;
    let portfolios = if sections.is_empty() {
        defaults.portfolios
    } else {
        sections
            .iter()
            .map(|(number, section)| build_portfolio_spec(config, *number, section))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(BacktestConfig {
        initial_value: parse_number(config, "backtest", "initial_value", DEFAULT_INITIAL_VALUE)?,
        include_baseline: parse_bool(
            config,
            "backtest",
            "include_baseline",
            defaults.include_baseline,
        )?,
        baseline_name: config
            .get_string("backtest", "baseline_name")
            .unwrap_or(defaults.baseline_name),
        baseline_equities: parse_number(
            config,
            "backtest",
            "baseline_equities",
            defaults.baseline_equities,
        )?,
        baseline_bonds: parse_number(
            config,
            "backtest",
            "baseline_bonds",
            defaults.baseline_bonds,
        )?,
        weight_check,
        portfolios,
    })
}

fn format_cell(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

fn name_width(names: impl Iterator<Item = usize>) -> usize {
    names.max().unwrap_or(0).max(9)
}

/// Performance table, four decimals, one row per portfolio.
pub fn render_summary_table(result: &BacktestResult) -> String {
    let width = name_width(result.portfolios.iter().map(|p| p.portfolio.name.len()));
    let mut out = format!("{:<width$}", "Portfolio");
    for column in PerformanceSummary::COLUMNS {
        out.push_str(&format!("  {:>14}", column));
    }
    out.push('\n');
    for p in &result.portfolios {
        out.push_str(&format!("{:<width$}", p.portfolio.name));
        for v in p.summary.rounded(4).as_row() {
            out.push_str(&format!("  {:>14}", format_cell(v, 4)));
        }
        out.push('\n');
    }
    out
}

/// Allocation table, three decimals, columns in universe order.
pub fn render_allocation_table(universe: &Universe, portfolios: &[Portfolio]) -> String {
    let width = name_width(portfolios.iter().map(|p| p.name.len()));
    let tickers = universe.tickers();
    let mut out = format!("{:<width$}", "Portfolio");
    for t in &tickers {
        out.push_str(&format!("  {:>9}", t));
    }
    out.push('\n');
    for p in portfolios {
        out.push_str(&format!("{:<width$}", p.name));
        for t in &tickers {
            let w = p.weights.get(t).map(|w| round_to(w, 3)).unwrap_or(f64::NAN);
            out.push_str(&format!("  {:>9}", format_cell(w, 3)));
        }
        out.push('\n');
    }
    out
}

fn export_path(
    cli_override: Option<PathBuf>,
    config: &dyn ConfigPort,
    key: &str,
    default: &str,
) -> PathBuf {
    cli_override
        .or_else(|| config.get_string("export", key).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

fn run_backtest(
    config_path: &Path,
    output: Option<PathBuf>,
    chart: Option<PathBuf>,
    no_export: bool,
) -> Result<(), BacktestError> {
    info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let data_config = build_data_config(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let source_dir = config
        .get_string("data", "source_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    info!(
        dir = %source_dir.display(),
        tickers = %data_config.universe.tickers().join(","),
        start = %data_config.start_date,
        end = %data_config.end_date,
        "loading prices"
    );
    let source = CsvPriceSource::new(source_dir);
    let market = MarketData::load(&source, &data_config)?;

    let result = Backtester::new(&market).run(&bt_config)?;

    println!("Performance Summary");
    print!("{}", render_summary_table(&result));
    println!();
    println!("Asset Allocations");
    let portfolios: Vec<Portfolio> = result.portfolios.iter().map(|p| p.portfolio.clone()).collect();
    print!("{}", render_allocation_table(&market.universe, &portfolios));

    if no_export {
        return Ok(());
    }

    let workbook = export_path(output, &config, "workbook", DEFAULT_WORKBOOK);
    XlsxReport::new().write(&market, &result, &workbook)?;
    eprintln!("\nExported as {}", workbook.display());

    let chart = export_path(chart, &config, "chart", DEFAULT_CHART);
    SvgChartReport::new().write(&market, &result, &chart)?;
    eprintln!("Chart written to {}", chart.display());

    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let data_config = build_data_config(&config)?;
    let bt_config = build_backtest_config(&config)?;

    eprintln!(
        "\nData: {} from {} to {} (exclusive)",
        data_config.universe.tickers().join(", "),
        data_config.start_date,
        data_config.end_date
    );
    eprintln!(
        "Initial value: {}  Weight check: {}",
        bt_config.initial_value, bt_config.weight_check
    );

    let portfolios = build_portfolios(&data_config.universe, &bt_config)?;
    eprintln!();
    print!("{}", render_allocation_table(&data_config.universe, &portfolios));

    eprintln!("\nConfiguration is valid.");
    Ok(())
}
