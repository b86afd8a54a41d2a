use std::collections::HashMap;

use anyhow::{Context, Error, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use derive_getters::Getters;
use derive_new::new;
use encoding_rs::WINDOWS_1252;
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite};
use tracing::warn;

use crate::{
    app::{metrics, normalize},
    db,
    errors::ValidationError,
    models::{Currency, EtfHolding, OperationType, PortfolioKpi, PositionRow, Transaction},
};

/// Preamble lines before the header row of a Directa transaction export.
const BROKER_HEADER_SKIP: usize = 8;

/// Preamble lines before the header row of an ETF holdings export.
const HOLDINGS_HEADER_SKIP: usize = 2;

/// Protocol sentinel for manually entered transactions, so manual and
/// imported rows share one ledger and one dedup key shape.
const MANUAL_PROTOCOL: &str = "MANUALE";

/// Placeholder for missing string fields in a holdings snapshot.
const FIELD_PLACEHOLDER: &str = "-";

/// Outcome of one broker-file import.
#[derive(Clone, Copy, Debug, Getters, new)]
pub struct ImportReport {
    parsed: usize,
    inserted: u64,
    skipped: usize,
}

/// Prospective purchase preview: cost of the order and the weight the
/// ticker would take in the portfolio afterwards.
#[derive(Clone, Debug, Getters, new)]
pub struct PurchaseSimulation {
    ticker: String,
    quantity: Decimal,
    current_price: Decimal,
    cost: Decimal,
    weight_pct: Option<Decimal>,
}

/// All user-triggered operations run through this type; it owns nothing
/// beyond the connection pool and never caches writes locally.
#[derive(Clone, Debug)]
pub struct Portfolio {
    connection: Pool<Sqlite>,
}

impl Portfolio {
    pub fn new(connection: Pool<Sqlite>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Pool<Sqlite> {
        &self.connection
    }

    /// Imports a broker transaction export (comma-separated, Windows-1252,
    /// fixed preamble). Rows failing validation are reported and skipped;
    /// surviving rows are batch-upserted under the composite natural key,
    /// so importing the same file twice changes nothing.
    pub async fn import_transactions(&self, path: &str) -> Result<ImportReport> {
        let text = read_export_file(path, BROKER_HEADER_SKIP)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(b',')
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns = normalize_columns(reader.headers().context("Missing header row")?);

        let mut transactions = Vec::new();
        let mut skipped = 0;

        for (row_idx, record) in reader.records().enumerate() {
            let rec = record
                .with_context(|| format!("Failed to read CSV record at row {}", row_idx + 1))?;

            match broker_row_to_transaction(&rec, &columns) {
                Ok(transaction) => transactions.push(transaction),
                Err(err) => {
                    warn!("Skipping row {}: {}", row_idx + 1, err);
                    skipped += 1;
                }
            }
        }

        let inserted = db::write::insert_transactions(&transactions, &self.connection)
            .await
            .context("Failed to upsert imported transactions")?;

        Ok(ImportReport::new(transactions.len(), inserted, skipped))
    }

    /// Stores a manually entered purchase. The order reference is a fresh
    /// random token and the protocol is the manual sentinel.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_transaction(
        &self,
        ticker: &str,
        isin: Option<&str>,
        operation_date: NaiveDate,
        quantity: Decimal,
        purchase_price: Decimal,
        currency: Currency,
        description: &str,
        is_test: bool,
    ) -> Result<Transaction> {
        let amount = quantity * purchase_price;
        let transaction = Transaction::new(
            ticker.trim().to_uppercase(),
            isin.map(|i| i.trim().to_uppercase()).filter(|i| !i.is_empty()),
            operation_date,
            operation_date,
            OperationType::Purchase,
            quantity,
            purchase_price,
            currency,
            -amount,
            amount,
            normalize::new_order_reference(),
            MANUAL_PROTOCOL.to_string(),
            description.to_string(),
            is_test,
        );

        validate_transaction(&transaction).map_err(Error::new)?;

        db::write::insert_transactions(std::slice::from_ref(&transaction), &self.connection)
            .await
            .context("Failed to store transaction")?;

        Ok(transaction)
    }

    /// Replaces the holdings snapshot of one ETF from an uploaded export
    /// (semicolon-separated, Latin-1). Returns the number of rows stored.
    pub async fn upload_holdings(&self, etf_ticker: &str, path: &str) -> Result<usize> {
        let etf_ticker = etf_ticker.trim().to_uppercase();
        if etf_ticker.is_empty() {
            return Err(Error::new(ValidationError::MissingField("etf_ticker")));
        }

        let text = read_export_file(path, HOLDINGS_HEADER_SKIP)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns = normalize_columns(reader.headers().context("Missing header row")?);

        let mut holdings = Vec::new();
        for record in reader.records() {
            let rec = record.context("Failed to read holdings record")?;
            holdings.push(holding_row(&etf_ticker, &rec, &columns));
        }

        db::write::replace_holdings(&etf_ticker, &holdings, &self.connection)
            .await
            .with_context(|| format!("Failed to replace holdings for {}", etf_ticker))?;

        Ok(holdings.len())
    }

    /// The per-transaction valuation table plus the portfolio KPI block.
    pub async fn position_report(&self) -> Result<(Vec<PositionRow>, PortfolioKpi)> {
        let transactions = db::read::load_transactions(&self.connection).await?;
        let prices = db::read::current_prices(&self.connection).await?;

        let rows = metrics::position_rows(&transactions, &prices);
        let kpi = metrics::portfolio_kpi(&rows);

        Ok((rows, kpi))
    }

    /// Previews buying `quantity` units of `ticker` at the stored current
    /// price: order cost and resulting portfolio weight.
    pub async fn simulate_purchase(
        &self,
        ticker: &str,
        quantity: Decimal,
    ) -> Result<PurchaseSimulation> {
        if quantity <= Decimal::ZERO {
            return Err(Error::new(ValidationError::NonPositive("quantita")));
        }

        let ticker = ticker.trim().to_uppercase();
        let prices = db::read::current_prices(&self.connection).await?;
        let current_price = prices
            .get(&ticker)
            .copied()
            .with_context(|| format!("No stored price for {}; run a price refresh first", ticker))?;

        let cost = (quantity * current_price).round_dp(2);

        let transactions = db::read::load_transactions(&self.connection).await?;
        let total_cost: Decimal = transactions.iter().map(Transaction::cost).sum();
        let denominator = total_cost + cost;
        let weight_pct = (!denominator.is_zero())
            .then(|| (cost / denominator * Decimal::ONE_HUNDRED).round_dp(2));

        Ok(PurchaseSimulation::new(
            ticker,
            quantity,
            current_price,
            cost,
            weight_pct,
        ))
    }
}

/// Rejects a record before it can reach the ledger. The error names the
/// offending field.
pub fn validate_transaction(transaction: &Transaction) -> Result<(), ValidationError> {
    if transaction.ticker().trim().is_empty() {
        return Err(ValidationError::MissingField("ticker"));
    }
    if *transaction.quantity() <= Decimal::ZERO {
        return Err(ValidationError::NonPositive("quantita"));
    }
    if *transaction.purchase_price() <= Decimal::ZERO {
        return Err(ValidationError::NonPositive("prezzo_acquisto"));
    }
    if let Some(isin) = transaction.isin() {
        if !normalize::validate_isin(isin) {
            return Err(ValidationError::InvalidIsin(isin.clone()));
        }
    }
    Ok(())
}

/// Decodes a code-page export and drops its fixed preamble so the CSV
/// reader sees the header row first.
fn read_export_file(path: &str, skip_lines: usize) -> Result<String> {
    let expanded = shellexpand::tilde(path);
    let bytes = std::fs::read(expanded.as_ref())
        .with_context(|| format!("Failed to open export file at path: {}", path))?;
    let (text, _, _) = WINDOWS_1252.decode(&bytes);

    Ok(text
        .lines()
        .skip(skip_lines)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Maps canonical column names to their index in the uploaded header.
/// Everything downstream works on the canonical schema only.
fn normalize_columns(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize::normalize_header(name), idx))
        .collect()
}

fn field<'a>(
    rec: &'a StringRecord,
    columns: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    columns
        .get(name)
        .and_then(|idx| rec.get(*idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Exports label the same column differently across brokers ("Prezzo" vs
/// "Prezzo di acquisto"); the first alias present wins.
fn field_any<'a>(
    rec: &'a StringRecord,
    columns: &HashMap<String, usize>,
    names: &[&str],
) -> Option<&'a str> {
    names.iter().find_map(|name| field(rec, columns, name))
}

fn broker_row_to_transaction(
    rec: &StringRecord,
    columns: &HashMap<String, usize>,
) -> Result<Transaction> {
    let ticker = field(rec, columns, "ticker")
        .ok_or(ValidationError::MissingField("ticker"))?
        .to_uppercase();

    let date_raw = field(rec, columns, "data_operazione")
        .ok_or(ValidationError::MissingField("data_operazione"))?;
    let operation_date = normalize::parse_date_lenient(date_raw)
        .ok_or_else(|| ValidationError::InvalidDate("data_operazione", date_raw.to_string()))?;

    let value_date = field(rec, columns, "data_valuta")
        .and_then(normalize::parse_date_lenient)
        .unwrap_or(operation_date);

    let quantity = field(rec, columns, "quantita")
        .and_then(normalize::parse_decimal_lenient)
        .ok_or(ValidationError::MissingField("quantita"))?;

    let purchase_price = field_any(
        rec,
        columns,
        &["prezzo_acquisto", "prezzo_di_acquisto", "prezzo"],
    )
    .and_then(normalize::parse_decimal_lenient)
    .ok_or(ValidationError::MissingField("prezzo_acquisto"))?;

    let currency = match field(rec, columns, "divisa") {
        Some(raw) => raw
            .parse::<Currency>()
            .map_err(|_| ValidationError::UnknownCurrency(raw.to_string()))?,
        None => Currency::Eur,
    };

    let amount_currency = field(rec, columns, "importo_divisa")
        .and_then(normalize::parse_decimal_lenient)
        .unwrap_or(quantity * purchase_price);
    let amount_eur = field(rec, columns, "importo_euro")
        .and_then(normalize::parse_decimal_lenient)
        .unwrap_or(-amount_currency);

    let transaction = Transaction::new(
        ticker,
        field(rec, columns, "isin").map(str::to_uppercase),
        operation_date,
        value_date,
        field(rec, columns, "tipo_operazione")
            .map(OperationType::parse_lenient)
            .unwrap_or(OperationType::Purchase),
        quantity,
        purchase_price,
        currency,
        amount_eur,
        amount_currency,
        field(rec, columns, "riferimento_ordine")
            .map(str::to_string)
            .unwrap_or_else(normalize::new_order_reference),
        field(rec, columns, "protocollo")
            .unwrap_or(FIELD_PLACEHOLDER)
            .to_string(),
        field(rec, columns, "descrizione").unwrap_or("").to_string(),
        false,
    );

    validate_transaction(&transaction)?;

    Ok(transaction)
}

/// Builds a sanitized holdings row. A missing constituent ticker falls
/// back to the parent ETF, missing text fields become the placeholder
/// and an unparseable weighting becomes `None` instead of failing the
/// upload.
fn holding_row(
    etf_ticker: &str,
    rec: &StringRecord,
    columns: &HashMap<String, usize>,
) -> EtfHolding {
    let text = |names: &[&str], default: &str| {
        field_any(rec, columns, names)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    };

    EtfHolding::new(
        etf_ticker.to_string(),
        text(&["ticker"], etf_ticker),
        text(&["nome"], FIELD_PLACEHOLDER),
        text(&["settore"], FIELD_PLACEHOLDER),
        text(&["asset_class"], FIELD_PLACEHOLDER),
        field(rec, columns, "ponderazione").and_then(normalize::parse_decimal_lenient),
        text(&["area_geografica"], FIELD_PLACEHOLDER),
        text(&["cambio"], "EUR"),
        text(&["valuta_mercato", "valuta_di_mercato"], FIELD_PLACEHOLDER),
    )
}
