use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use sqlx::{Pool, Sqlite};

use crate::models::{CurrentPrice, EtfHolding, PricePoint, Transaction};

/// Batch-upserts canonical transactions into the ledger. The UNIQUE index
/// on (ticker, data_operazione, riferimento_ordine, protocollo) plus
/// `INSERT OR IGNORE` makes re-importing the same broker export a no-op.
/// Returns how many rows were actually inserted.
pub async fn insert_transactions(
    transactions: &[Transaction],
    connection: &Pool<Sqlite>,
) -> Result<u64> {
    let mut tx = connection.begin().await?;
    let mut inserted = 0;

    for transaction in transactions {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO transactions
            (
                ticker,
                isin,
                data_operazione,
                data_valuta,
                tipo_operazione,
                quantita,
                prezzo_acquisto,
                divisa,
                importo_euro,
                importo_divisa,
                riferimento_ordine,
                protocollo,
                descrizione,
                is_test
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.ticker())
        .bind(transaction.isin())
        .bind(transaction.operation_date().format("%Y-%m-%d").to_string())
        .bind(transaction.value_date().format("%Y-%m-%d").to_string())
        .bind(transaction.operation_type().to_string())
        .bind(transaction.quantity().round_dp(4).to_f64())
        .bind(transaction.purchase_price().round_dp(4).to_f64())
        .bind(transaction.currency().to_string())
        .bind(transaction.amount_eur().round_dp(2).to_f64())
        .bind(transaction.amount_currency().round_dp(2).to_f64())
        .bind(transaction.order_reference())
        .bind(transaction.protocol())
        .bind(transaction.description())
        .bind(*transaction.is_test() as i64)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;

    Ok(inserted)
}

/// Replace-on-conflict by ticker: at most one current price per ticker.
pub async fn upsert_price(price: &CurrentPrice, connection: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO etf_prices (ticker, price, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT (ticker) DO UPDATE
        SET price = excluded.price, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(price.ticker())
    .bind(price.price().round_dp(4).to_f64())
    .execute(connection)
    .await?;

    Ok(())
}

/// Bulk append of historical closes. Points are immutable facts keyed by
/// (ticker, date, close); duplicates are silently skipped.
pub async fn insert_price_history(
    points: &[PricePoint],
    connection: &Pool<Sqlite>,
) -> Result<u64> {
    let mut tx = connection.begin().await?;
    let mut inserted = 0;

    for point in points {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO etf_price_history (ticker, date, close, dividends)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(point.ticker())
        .bind(point.date().format("%Y-%m-%d").to_string())
        .bind(point.close().round_dp(4).to_f64())
        .bind(point.dividend().round_dp(4).to_f64())
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;

    Ok(inserted)
}

/// Replaces the holdings snapshot of one ETF wholesale. Delete and insert
/// run in a single transaction so no reader observes the ticker with an
/// empty snapshot; rows of other tickers are never touched.
pub async fn replace_holdings(
    etf_ticker: &str,
    holdings: &[EtfHolding],
    connection: &Pool<Sqlite>,
) -> Result<()> {
    let mut tx = connection.begin().await?;

    sqlx::query("DELETE FROM etf_holdings WHERE etf_ticker = ?")
        .bind(etf_ticker)
        .execute(&mut *tx)
        .await?;

    for holding in holdings {
        sqlx::query(
            r#"
            INSERT INTO etf_holdings
            (etf_ticker, ticker, nome, settore, asset_class, ponderazione,
             area_geografica, cambio, valuta_mercato)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(holding.etf_ticker())
        .bind(holding.ticker())
        .bind(holding.name())
        .bind(holding.sector())
        .bind(holding.asset_class())
        .bind(holding.weighting().as_ref().and_then(|w| w.round_dp(4).to_f64()))
        .bind(holding.geographic_area())
        .bind(holding.fx_reference())
        .bind(holding.market_currency())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Manual maintenance: removes transactions flagged as test data.
pub async fn purge_test_transactions(connection: &Pool<Sqlite>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM transactions WHERE is_test = 1")
        .execute(connection)
        .await?;

    Ok(result.rows_affected())
}
