use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::FromPrimitive};
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::models::{Currency, OperationType, Transaction};

pub fn parse_string_from_row(row: &SqliteRow, column: &str) -> Result<String> {
    row.try_get::<String, _>(column)
        .with_context(|| format!("Failed to parse String from column '{}'", column))
}

pub fn parse_optional_string_from_row(row: &SqliteRow, column: &str) -> Result<Option<String>> {
    row.try_get::<Option<String>, _>(column)
        .with_context(|| format!("Failed to parse String from column '{}'", column))
}

pub fn parse_f64_from_row(row: &SqliteRow, column: &str) -> Result<f64> {
    row.try_get::<f64, _>(column)
        .with_context(|| format!("Failed to parse f64 from column '{}'", column))
}

pub fn parse_decimal_from_row(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let value = parse_f64_from_row(row, column)?;
    Decimal::from_f64(value)
        .with_context(|| format!("Failed to convert f64 to Decimal for column '{}'", column))
}

pub fn parse_date_from_row(row: &SqliteRow, column: &str) -> Result<NaiveDate> {
    let text = parse_string_from_row(row, column)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse date '{}' from column '{}'", text, column))
}

pub fn parse_transaction(row: &SqliteRow) -> Result<Transaction> {
    let currency_text = parse_string_from_row(row, "divisa")?;
    let currency = currency_text
        .parse::<Currency>()
        .with_context(|| format!("Unknown currency '{}' in ledger", currency_text))?;

    Ok(Transaction::new(
        parse_string_from_row(row, "ticker")?,
        parse_optional_string_from_row(row, "isin")?,
        parse_date_from_row(row, "data_operazione")?,
        parse_date_from_row(row, "data_valuta")?,
        OperationType::parse_lenient(&parse_string_from_row(row, "tipo_operazione")?),
        parse_decimal_from_row(row, "quantita")?,
        parse_decimal_from_row(row, "prezzo_acquisto")?,
        currency,
        parse_decimal_from_row(row, "importo_euro")?,
        parse_decimal_from_row(row, "importo_divisa")?,
        parse_string_from_row(row, "riferimento_ordine")?,
        parse_string_from_row(row, "protocollo")?,
        parse_optional_string_from_row(row, "descrizione")?.unwrap_or_default(),
        row.try_get::<i64, _>("is_test").unwrap_or(0) != 0,
    ))
}

/// Every ticker the tracker currently follows, from both the ledger and
/// the holdings snapshots.
pub async fn distinct_tickers(connection: &Pool<Sqlite>) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT ticker FROM transactions
        UNION
        SELECT etf_ticker FROM etf_holdings
        ORDER BY ticker
        "#,
    )
    .fetch_all(connection)
    .await?;

    rows.iter()
        .map(|row| parse_string_from_row(row, "ticker"))
        .collect()
}

pub async fn load_transactions(connection: &Pool<Sqlite>) -> Result<Vec<Transaction>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM transactions
        ORDER BY data_operazione, id
        "#,
    )
    .fetch_all(connection)
    .await?;

    rows.iter().map(parse_transaction).collect()
}

pub async fn current_prices(connection: &Pool<Sqlite>) -> Result<HashMap<String, Decimal>> {
    let rows = sqlx::query("SELECT ticker, price FROM etf_prices")
        .fetch_all(connection)
        .await?;

    let mut prices = HashMap::new();
    for row in &rows {
        prices.insert(
            parse_string_from_row(row, "ticker")?,
            parse_decimal_from_row(row, "price")?,
        );
    }

    Ok(prices)
}

pub async fn transaction_count(connection: &Pool<Sqlite>) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM transactions")
        .fetch_one(connection)
        .await?;
    row.try_get::<i64, _>("n")
        .context("Failed to count transactions")
}

pub async fn holdings_count(connection: &Pool<Sqlite>, etf_ticker: &str) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM etf_holdings WHERE etf_ticker = ?")
        .bind(etf_ticker)
        .fetch_one(connection)
        .await?;
    row.try_get::<i64, _>("n").context("Failed to count holdings")
}

/// Per-ticker absolute gain (market value minus cost basis), best or worst
/// first. Tickers without a stored price value at zero.
pub async fn ranked_performers(
    connection: &Pool<Sqlite>,
    limit: u32,
    best_first: bool,
) -> Result<Vec<(String, Decimal)>> {
    let order = if best_first { "DESC" } else { "ASC" };
    let sql = format!(
        r#"
        SELECT t.ticker AS ticker,
               SUM(t.quantita) * COALESCE(p.price, 0)
                 - SUM(t.quantita * t.prezzo_acquisto) AS gain
        FROM transactions t
        LEFT JOIN etf_prices p ON p.ticker = t.ticker
        GROUP BY t.ticker
        ORDER BY gain {order}
        LIMIT ?
        "#
    );

    let rows = sqlx::query(&sql).bind(limit).fetch_all(connection).await?;

    rows.iter()
        .map(|row| {
            Ok((
                parse_string_from_row(row, "ticker")?,
                parse_decimal_from_row(row, "gain")?.round_dp(2),
            ))
        })
        .collect()
}

/// Holdings dimensions the distribution report can group by.
#[derive(Clone, Copy, Debug)]
pub enum HoldingDimension {
    Sector,
    GeographicArea,
    MarketCurrency,
}

impl HoldingDimension {
    fn column(&self) -> &'static str {
        match self {
            HoldingDimension::Sector => "settore",
            HoldingDimension::GeographicArea => "area_geografica",
            HoldingDimension::MarketCurrency => "valuta_mercato",
        }
    }
}

/// Cost-basis share of the portfolio per ETF, as (label, percentage).
pub async fn distribution_by_etf(connection: &Pool<Sqlite>) -> Result<Vec<(String, Decimal)>> {
    let rows = sqlx::query(
        r#"
        SELECT ticker AS label,
               ROUND(100.0 * SUM(quantita * prezzo_acquisto) /
                     (SELECT SUM(quantita * prezzo_acquisto) FROM transactions), 2) AS pct
        FROM transactions
        GROUP BY ticker
        ORDER BY pct DESC
        "#,
    )
    .fetch_all(connection)
    .await?;

    collect_distribution(&rows)
}

/// Look-through distribution over a holdings dimension: each constituent's
/// weighting is scaled by its parent ETF's share of the portfolio cost.
pub async fn distribution_by_dimension(
    connection: &Pool<Sqlite>,
    dimension: HoldingDimension,
) -> Result<Vec<(String, Decimal)>> {
    let column = dimension.column();
    let sql = format!(
        r#"
        WITH etf_cost AS (
            SELECT ticker, SUM(quantita * prezzo_acquisto) AS cost
            FROM transactions
            GROUP BY ticker
        )
        SELECT h.{column} AS label,
               ROUND(100.0 * SUM(COALESCE(h.ponderazione, 0) / 100.0 * e.cost) /
                     (SELECT SUM(cost) FROM etf_cost), 2) AS pct
        FROM etf_holdings h
        JOIN etf_cost e ON e.ticker = h.etf_ticker
        GROUP BY h.{column}
        ORDER BY pct DESC
        "#
    );

    let rows = sqlx::query(&sql).fetch_all(connection).await?;

    collect_distribution(&rows)
}

fn collect_distribution(rows: &[SqliteRow]) -> Result<Vec<(String, Decimal)>> {
    rows.iter()
        .map(|row| {
            let pct = row
                .try_get::<Option<f64>, _>("pct")
                .context("Failed to parse distribution percentage")?
                .and_then(Decimal::from_f64)
                .unwrap_or(Decimal::ZERO);
            Ok((parse_string_from_row(row, "label")?, pct))
        })
        .collect()
}

/// Weighted-average acquisition price per ticker.
pub async fn average_purchase_price(
    connection: &Pool<Sqlite>,
) -> Result<Vec<(String, Decimal)>> {
    let rows = sqlx::query(
        r#"
        SELECT ticker,
               ROUND(SUM(quantita * prezzo_acquisto) / SUM(quantita), 4) AS avg_price
        FROM transactions
        WHERE quantita > 0
        GROUP BY ticker
        ORDER BY ticker
        "#,
    )
    .fetch_all(connection)
    .await?;

    rows.iter()
        .map(|row| {
            Ok((
                parse_string_from_row(row, "ticker")?,
                parse_decimal_from_row(row, "avg_price")?,
            ))
        })
        .collect()
}

/// Amount invested per calendar year, from the ledger's operation dates.
pub async fn annual_invested(connection: &Pool<Sqlite>) -> Result<Vec<(i64, Decimal)>> {
    let rows = sqlx::query(
        r#"
        SELECT CAST(strftime('%Y', data_operazione) AS INTEGER) AS year,
               SUM(quantita * prezzo_acquisto) AS invested
        FROM transactions
        GROUP BY year
        ORDER BY year
        "#,
    )
    .fetch_all(connection)
    .await?;

    rows.iter()
        .map(|row| {
            Ok((
                row.try_get::<i64, _>("year")
                    .context("Failed to parse year")?,
                parse_decimal_from_row(row, "invested")?.round_dp(2),
            ))
        })
        .collect()
}
