//! chainscope CLI
//!
//! # Usage
//!
//! ```bash
//! # Chain overview, optionally saved as a JSON snapshot
//! chainscope chain --symbol SPY --save
//!
//! # At-the-money contracts for the next 14-60 DTE expiration
//! chainscope atm --symbol AAPL --policy median
//!
//! # Rank symbols by maximum implied volatility
//! chainscope screen --symbols TSLA,NVDA,AMD --min-iv 0.6
//!
//! # Expiration payoff of a short put
//! chainscope payoff --strike 100 --premium 5 --option-type put --position short
//!
//! # Work offline from saved snapshots
//! chainscope --provider file --data-dir data/chains validate --symbol SPY
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use chainscope::analytics::{
    AtmAnalysis, AtmAnalyzer, GreeksProfile, IVScreener, PayoffCalculator, Position,
    ScreenReport, SkipReason, StrikeProfiler, VolatilitySmile,
};
use chainscope::config::AppConfig;
use chainscope::data::{
    build_provider, ChainProvider, ChainSummary, ContractRecord, FileProvider, OptionChain,
    OptionType, ProviderKind,
};
use chainscope::selection::ExpirationPolicy;
use chainscope::validation::{ChainIntegrityReport, ChainValidator};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "chainscope")]
#[command(about = "Option chain analytics: ATM selection, IV screening, payoff curves")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Market-data provider (cboe, orats, file)
    #[arg(long, global = true)]
    provider: Option<ProviderKind>,

    /// Snapshot directory for the file provider and --save
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the option chain of one symbol
    Chain {
        #[arg(long)]
        symbol: String,

        /// Store the retrieved chain as a JSON snapshot under --data-dir
        #[arg(long)]
        save: bool,
    },

    /// At-the-money calls and puts for one expiration
    Atm {
        #[arg(long)]
        symbol: String,

        #[arg(long)]
        min_dte: Option<i32>,

        #[arg(long)]
        max_dte: Option<i32>,

        /// Strike band half-width as a fraction of the underlying price
        #[arg(long)]
        band: Option<Decimal>,

        /// Expiration choice within the window (earliest, median)
        #[arg(long)]
        policy: Option<ExpirationPolicy>,
    },

    /// Rank symbols by maximum implied volatility
    Screen {
        /// Comma-separated list of symbols
        #[arg(long, value_delimiter = ',', required = true)]
        symbols: Vec<String>,

        #[arg(long)]
        min_dte: Option<i32>,

        #[arg(long)]
        min_iv: Option<f64>,

        /// Concurrent retrievals (1 = sequential)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Expiration payoff of a single option position
    Payoff {
        #[arg(long)]
        strike: Decimal,

        #[arg(long)]
        premium: Decimal,

        #[arg(long, default_value = "call")]
        option_type: OptionType,

        #[arg(long, default_value = "long")]
        position: Position,

        /// Number of prices on the grid
        #[arg(long)]
        points: Option<usize>,
    },

    /// Implied volatility by strike for one expiration
    Smile {
        #[arg(long)]
        symbol: String,

        #[arg(long)]
        min_dte: Option<i32>,

        #[arg(long)]
        max_dte: Option<i32>,
    },

    /// Call Greeks by strike for one expiration
    Greeks {
        #[arg(long)]
        symbol: String,
    },

    /// Run integrity checks on a chain
    Validate {
        #[arg(long)]
        symbol: String,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(kind) = cli.provider {
        config.provider.kind = kind;
    }
    if let Some(dir) = &cli.data_dir {
        config.provider.data_dir = dir.clone();
    }

    match &cli.command {
        Commands::Atm {
            min_dte,
            max_dte,
            band,
            policy,
            ..
        } => {
            config.atm.min_dte = min_dte.unwrap_or(config.atm.min_dte);
            config.atm.max_dte = max_dte.unwrap_or(config.atm.max_dte);
            config.atm.band_fraction = band.unwrap_or(config.atm.band_fraction);
            config.atm.policy = policy.unwrap_or(config.atm.policy);
        }
        Commands::Screen {
            min_dte,
            min_iv,
            concurrency,
            ..
        } => {
            config.screener.min_dte = min_dte.unwrap_or(config.screener.min_dte);
            config.screener.min_iv = min_iv.unwrap_or(config.screener.min_iv);
            config.screener.max_concurrency = concurrency.unwrap_or(config.screener.max_concurrency);
        }
        Commands::Smile {
            min_dte, max_dte, ..
        } => {
            config.smile.min_dte = min_dte.unwrap_or(config.smile.min_dte);
            config.smile.max_dte = max_dte.unwrap_or(config.smile.max_dte);
        }
        Commands::Payoff { points, .. } => {
            config.payoff.points = points.unwrap_or(config.payoff.points);
        }
        Commands::Chain { .. } | Commands::Greeks { .. } | Commands::Validate { .. } => {}
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fmt_quote(quote: Option<Decimal>) -> String {
    quote.map(|q| q.to_string()).unwrap_or_else(|| "-".to_string())
}

fn connect(config: &AppConfig) -> Result<Box<dyn ChainProvider>> {
    build_provider(&config.provider)
        .with_context(|| format!("Failed to initialize {} provider", config.provider.kind))
}

fn fetch(provider: &dyn ChainProvider, symbol: &str) -> Result<OptionChain> {
    let chain = provider
        .fetch_chain(symbol)
        .with_context(|| format!("Failed to retrieve {} from {}", symbol, provider.name()))?;
    info!("{}: {} contracts from {}", chain.symbol(), chain.len(), provider.name());
    Ok(chain)
}

fn cmd_chain(
    provider: &dyn ChainProvider,
    config: &AppConfig,
    symbol: &str,
    save: bool,
    format: OutputFormat,
) -> Result<()> {
    let chain = fetch(provider, symbol)?;
    let summary = chain.summary(10);

    if save {
        let path = FileProvider::new(&config.provider.data_dir)
            .store(&chain)
            .context("Failed to save snapshot")?;
        info!("Saved {} to {}", symbol, path.display());
    }

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => {
            print_chain_summary(&summary);
            Ok(())
        }
    }
}

fn print_chain_summary(summary: &ChainSummary) {
    println!("{}", SEPARATOR);
    println!("{} @ {} ({})", summary.symbol, summary.underlying_price, summary.snapshot_date);
    println!("{}", SEPARATOR);
    println!("  Contracts: {}", summary.total_contracts);
    println!("  Calls: {}", summary.calls);
    println!("  Puts: {}", summary.puts);
    println!("  Expirations: {}", summary.expiration_count);
    println!("\n  First expirations:");
    for expiration in &summary.first_expirations {
        println!("    {}", expiration);
    }
}

fn cmd_atm(
    provider: &dyn ChainProvider,
    config: &AppConfig,
    symbol: &str,
    format: OutputFormat,
) -> Result<()> {
    let analysis = AtmAnalyzer::from_config(&config.atm)
        .analyze_symbol(provider, symbol)
        .with_context(|| format!("ATM analysis failed for {}", symbol))?;

    match format {
        OutputFormat::Json => print_json(&analysis),
        OutputFormat::Table => {
            print_atm(&analysis);
            Ok(())
        }
    }
}

fn print_atm(analysis: &AtmAnalysis) {
    println!("{}", SEPARATOR);
    println!(
        "{} @ {}: expiration {} ({} DTE)",
        analysis.symbol, analysis.underlying_price, analysis.target_expiration, analysis.target_dte
    );
    if analysis.tier > 0 {
        println!("  (no expiration in the requested window; relaxed fallback used)");
    }
    println!("  Strike band: {} - {}", analysis.band.lower, analysis.band.upper);
    println!("{}", SEPARATOR);

    println!("\nCalls:");
    print_contracts(&analysis.atm_calls);
    println!("\nPuts:");
    print_contracts(&analysis.atm_puts);
}

fn print_contracts(contracts: &[ContractRecord]) {
    if contracts.is_empty() {
        println!("  (none)");
        return;
    }
    println!(
        "  {:>10} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "strike", "delta", "gamma", "theta", "vega", "iv", "bid", "ask"
    );
    for c in contracts {
        println!(
            "  {:>10} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8} {:>8}",
            c.strike,
            c.greeks.delta,
            c.greeks.gamma,
            c.greeks.theta,
            c.greeks.vega,
            c.implied_volatility,
            fmt_quote(c.bid),
            fmt_quote(c.ask)
        );
    }
}

fn cmd_screen(
    provider: &dyn ChainProvider,
    config: &AppConfig,
    symbols: &[String],
    format: OutputFormat,
) -> Result<()> {
    let screener = IVScreener::new(config.screener.clone());

    let report = match format {
        OutputFormat::Json => screener.screen(provider, symbols),
        OutputFormat::Table => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            spinner.set_message(format!("Screening {} symbols...", symbols.len()));
            spinner.enable_steady_tick(Duration::from_millis(100));
            let report = screener.screen(provider, symbols);
            spinner.finish_and_clear();
            report
        }
    };

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "ranked": report.ranked(),
            "outcomes": report.outcomes,
        })),
        OutputFormat::Table => {
            print_screen(&report);
            Ok(())
        }
    }
}

fn print_screen(report: &ScreenReport) {
    let ranked = report.ranked();
    println!("{}", SEPARATOR);
    println!("High IV Screen: {} hits", ranked.len());
    println!("{}", SEPARATOR);
    if !ranked.is_empty() {
        println!("  {:<8} {:>8} {:>10}", "symbol", "count", "max_iv");
        for result in &ranked {
            println!("  {:<8} {:>8} {:>10.4}", result.symbol, result.count, result.max_iv);
        }
    }

    let skipped = report.skipped();
    if !skipped.is_empty() {
        println!("\nSkipped:");
        for (symbol, reason) in skipped {
            match reason {
                SkipReason::NoQualifyingContracts => {
                    println!("  {}: no qualifying contracts", symbol)
                }
                SkipReason::RetrievalFailed(e) => println!("  {}: {}", symbol, e),
            }
        }
    }
}

fn cmd_payoff(
    config: &AppConfig,
    calc: PayoffCalculator,
    format: OutputFormat,
) -> Result<()> {
    let grid = calc.default_grid(&config.payoff);
    let summary = calc
        .summarize(grid.clone())
        .context("Payoff grid is empty")?;
    let curve = calc.curve(grid);

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "position": calc,
            "summary": summary,
            "curve": curve.collect::<Vec<_>>(),
        })),
        OutputFormat::Table => {
            println!("{}", SEPARATOR);
            println!(
                "{} {} K={} premium={}",
                calc.position, calc.option_type, calc.strike, calc.premium
            );
            println!("{}", SEPARATOR);
            println!("  Breakeven: {}", summary.breakeven);
            println!("  Max profit on range: {}", summary.max_profit.round_dp(2));
            println!("  Max loss on range: {}", summary.max_loss.round_dp(2));
            println!("\n  {:>10} {:>10}", "price", "p/l");
            for point in curve {
                println!(
                    "  {:>10} {:>10}",
                    point.price.round_dp(2),
                    point.profit_loss.round_dp(2)
                );
            }
            Ok(())
        }
    }
}

fn cmd_smile(
    provider: &dyn ChainProvider,
    config: &AppConfig,
    symbol: &str,
    format: OutputFormat,
) -> Result<()> {
    let chain = fetch(provider, symbol)?;
    let smile = StrikeProfiler::from_config(&config.smile)
        .smile(&chain)
        .with_context(|| format!("Volatility smile failed for {}", symbol))?;

    match format {
        OutputFormat::Json => print_json(&smile),
        OutputFormat::Table => {
            print_smile(&smile);
            Ok(())
        }
    }
}

fn print_smile(smile: &VolatilitySmile) {
    println!("{}", SEPARATOR);
    println!(
        "{} @ {}: IV smile for {} ({} DTE)",
        smile.symbol, smile.underlying_price, smile.expiration, smile.dte
    );
    println!("{}", SEPARATOR);
    for (label, points) in [("Calls", &smile.calls), ("Puts", &smile.puts)] {
        println!("\n{}:", label);
        println!("  {:>10} {:>8}", "strike", "iv");
        for p in points {
            println!("  {:>10} {:>8.4}", p.strike, p.implied_volatility);
        }
    }
}

fn cmd_greeks(
    provider: &dyn ChainProvider,
    config: &AppConfig,
    symbol: &str,
    format: OutputFormat,
) -> Result<()> {
    let chain = fetch(provider, symbol)?;
    let profile = StrikeProfiler::from_config(&config.smile)
        .call_greeks(&chain)
        .with_context(|| format!("Greeks profile failed for {}", symbol))?;

    match format {
        OutputFormat::Json => print_json(&profile),
        OutputFormat::Table => {
            print_greeks(&profile);
            Ok(())
        }
    }
}

fn print_greeks(profile: &GreeksProfile) {
    println!("{}", SEPARATOR);
    println!(
        "{} @ {}: call Greeks for {} ({} DTE)",
        profile.symbol, profile.underlying_price, profile.expiration, profile.dte
    );
    println!("{}", SEPARATOR);
    println!(
        "  {:>10} {:>8} {:>8} {:>8} {:>8}",
        "strike", "delta", "gamma", "theta", "vega"
    );
    for p in &profile.points {
        println!(
            "  {:>10} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
            p.strike, p.delta, p.gamma, p.theta, p.vega
        );
    }
}

fn cmd_validate(provider: &dyn ChainProvider, symbol: &str, format: OutputFormat) -> Result<()> {
    let chain = fetch(provider, symbol)?;
    let report = ChainValidator::default().validate(&chain);

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            print_validation(&report);
            Ok(())
        }
    }
}

fn print_validation(report: &ChainIntegrityReport) {
    println!("{}", report.summary());
    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!("  [{}] {}: {}", status, check.name, check.message);
        if let Some(details) = &check.details {
            println!("         {}", details);
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chainscope=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let format = cli.format;

    match &cli.command {
        Commands::Chain { symbol, save } => {
            cmd_chain(connect(&config)?.as_ref(), &config, symbol, *save, format)
        }
        Commands::Atm { symbol, .. } => cmd_atm(connect(&config)?.as_ref(), &config, symbol, format),
        Commands::Screen { symbols, .. } => {
            cmd_screen(connect(&config)?.as_ref(), &config, symbols, format)
        }
        Commands::Payoff {
            strike,
            premium,
            option_type,
            position,
            ..
        } => {
            let calc = PayoffCalculator::new(*strike, *premium, *option_type, *position);
            cmd_payoff(&config, calc, format)
        }
        Commands::Smile { symbol, .. } => {
            cmd_smile(connect(&config)?.as_ref(), &config, symbol, format)
        }
        Commands::Greeks { symbol } => {
            cmd_greeks(connect(&config)?.as_ref(), &config, symbol, format)
        }
        Commands::Validate { symbol } => cmd_validate(connect(&config)?.as_ref(), symbol, format),
    }
}
