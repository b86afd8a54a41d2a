use std::env;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tracing_subscriber::EnvFilter;

use etf_portfolio_tracker::{
    api::YahooApi,
    app::{Portfolio, normalize, refresh},
    db,
    models::Currency,
};

#[derive(Parser)]
#[command(name = "etf-portfolio-tracker", about = "Track an ETF portfolio from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the valuation table, portfolio KPIs and distributions
    Report,
    /// Record a purchase manually
    Add {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        quantity: Decimal,
        #[arg(long)]
        price: Decimal,
        /// Operation date (ISO or day/month/year); defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "EUR")]
        currency: String,
        #[arg(long)]
        isin: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Flag the row as test data, removable with purge-test
        #[arg(long)]
        test: bool,
    },
    /// Import a broker transaction export (CSV)
    Import { file: String },
    /// Replace the holdings snapshot of an ETF from an export (CSV)
    Holdings { etf_ticker: String, file: String },
    /// Fetch and store the current price of every tracked ticker
    RefreshPrices,
    /// Fetch and store the full price history of every tracked ticker
    RefreshHistory,
    /// Preview the cost and portfolio weight of a prospective purchase
    Simulate {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        quantity: Decimal,
    },
    /// Print the amount invested per calendar year
    Annual,
    /// Delete transactions flagged as test data
    PurgeTest,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database_url =
        env::var("ETF_TRACKER_DB").unwrap_or_else(|_| String::from("etf_portfolio.db"));
    let db_connect_options = SqliteConnectOptions::new()
        .filename(&database_url)
        .create_if_missing(true);

    let connection = SqlitePool::connect_with(db_connect_options).await?;
    db::init::create_all(&connection).await?;

    let portfolio = Portfolio::new(connection.clone());
    let cli = Cli::parse();

    match cli.command {
        Command::Report => {
            let (rows, kpi) = portfolio.position_report().await?;

            println!(
                "{:<8} {:>12} {:>10} {:>10} {:>12} {:>12} {:>9}  {}",
                "Ticker", "Quantita", "Prezzo", "Corrente", "Costo", "Mkt Value", "Crescita", "Data"
            );
            for row in &rows {
                println!(
                    "{:<8} {:>12} {:>10} {:>10} {:>12} {:>12} {:>9}  {}",
                    row.ticker(),
                    row.quantity(),
                    row.purchase_price(),
                    row.current_price(),
                    normalize::format_currency(*row.cost(), "€"),
                    normalize::format_currency(*row.market_value(), "€"),
                    pct_or_dash(row.growth_pct()),
                    normalize::format_date(row.operation_date()),
                );
            }

            println!();
            println!(
                "Totale investito: {}",
                normalize::format_currency(*kpi.total_cost(), "€")
            );
            println!(
                "Valore di mercato: {}",
                normalize::format_currency(*kpi.total_market_value(), "€")
            );
            println!(
                "Guadagno/Perdita: {}",
                normalize::format_currency(*kpi.gain(), "€")
            );
            println!("Rendimento: {}", pct_or_dash(kpi.return_pct()));
            println!("CAGR: {}", pct_or_dash(kpi.cagr_pct()));

            print_ranked(&connection, true).await?;
            print_ranked(&connection, false).await?;
            print_distributions(&connection).await?;

            println!("\nPrezzo medio di acquisto:");
            for (ticker, avg) in db::read::average_purchase_price(&connection).await? {
                println!("  {:<8} {}", ticker, avg);
            }
        }
        Command::Add {
            ticker,
            quantity,
            price,
            date,
            currency,
            isin,
            description,
            test,
        } => {
            let operation_date = match date {
                Some(raw) => normalize::parse_date_lenient(&raw)
                    .with_context(|| format!("Unparseable date '{}'", raw))?,
                None => chrono::Local::now().date_naive(),
            };
            let currency: Currency = currency
                .parse()
                .map_err(|_| anyhow::anyhow!("Unsupported currency '{}'", currency))?;

            let transaction = portfolio
                .add_transaction(
                    &ticker,
                    isin.as_deref(),
                    operation_date,
                    quantity,
                    price,
                    currency,
                    &description,
                    test,
                )
                .await?;

            println!(
                "Saved {} x {} @ {} (ref {})",
                transaction.quantity(),
                transaction.ticker(),
                transaction.purchase_price(),
                transaction.order_reference()
            );
        }
        Command::Import { file } => {
            let report = portfolio.import_transactions(&file).await?;
            println!(
                "Parsed {} rows: {} inserted, {} duplicates ignored, {} skipped",
                report.parsed(),
                report.inserted(),
                *report.parsed() as u64 - report.inserted(),
                report.skipped()
            );
        }
        Command::Holdings { etf_ticker, file } => {
            let stored = portfolio.upload_holdings(&etf_ticker, &file).await?;
            println!("Snapshot replaced: {} holdings stored for {}", stored, etf_ticker);
        }
        Command::RefreshPrices => {
            let api = YahooApi::new();
            let report = refresh::refresh_prices(&api, &connection).await?;
            print_refresh(&report);
        }
        Command::RefreshHistory => {
            let api = YahooApi::new();
            let report = refresh::refresh_history(&api, &connection).await?;
            print_refresh(&report);
        }
        Command::Simulate { ticker, quantity } => {
            let sim = portfolio.simulate_purchase(&ticker, quantity).await?;
            println!(
                "{} x {} @ {} = {}",
                sim.quantity(),
                sim.ticker(),
                sim.current_price(),
                normalize::format_currency(*sim.cost(), "€")
            );
            println!("Peso nel portafoglio: {}", pct_or_dash(sim.weight_pct()));
        }
        Command::Annual => {
            println!("{:<6} {:>14}", "Anno", "Investito");
            for (year, invested) in db::read::annual_invested(&connection).await? {
                println!("{:<6} {:>14}", year, normalize::format_currency(invested, "€"));
            }
        }
        Command::PurgeTest => {
            let removed = db::write::purge_test_transactions(&connection).await?;
            println!("Removed {} test transactions", removed);
        }
    }

    Ok(())
}

fn pct_or_dash(value: &Option<Decimal>) -> String {
    match value {
        Some(pct) => format!("{}%", pct),
        None => String::from("n/d"),
    }
}

fn print_refresh(report: &refresh::RefreshReport) {
    println!(
        "Updated {} of {} tickers",
        report.updated(),
        report.total()
    );
    for (ticker, reason) in report.failures() {
        println!("  {}: {}", ticker, reason);
    }
}

async fn print_ranked(connection: &SqlitePool, best: bool) -> Result<()> {
    let label = if best { "Top 3 ETF" } else { "Bottom 3 ETF" };
    println!("\n{}:", label);
    for (ticker, gain) in db::read::ranked_performers(connection, 3, best).await? {
        println!("  {:<8} {}", ticker, normalize::format_currency(gain, "€"));
    }
    Ok(())
}

async fn print_distributions(connection: &SqlitePool) -> Result<()> {
    println!("\nDistribuzione per ETF:");
    for (label, pct) in db::read::distribution_by_etf(connection).await? {
        println!("  {:<24} {}%", label, pct);
    }

    let dimensions = [
        ("settore", db::read::HoldingDimension::Sector),
        ("area geografica", db::read::HoldingDimension::GeographicArea),
        ("valuta", db::read::HoldingDimension::MarketCurrency),
    ];
    for (name, dimension) in dimensions {
        println!("\nDistribuzione per {}:", name);
        for (label, pct) in db::read::distribution_by_dimension(connection, dimension).await? {
            println!("  {:<24} {}%", label, pct);
        }
    }

    Ok(())
}
