use anyhow::Result;
use derive_getters::Getters;
use derive_new::new;
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite};
use tracing::{debug, error, info, warn};

use crate::{
    api::QuoteSource,
    db,
    models::{CurrentPrice, PricePoint},
};

/// Exchange suffixes tried in priority order, Borsa Italiana first; the
/// bare symbol is the last candidate.
pub const MARKET_SUFFIXES: [&str; 4] = [".MI", ".DE", ".AS", ".L"];

/// Short window used when the live price field is absent or zero.
const FALLBACK_RANGE: &str = "5d";

/// Range for the bulk history refresh.
const HISTORY_RANGE: &str = "max";

/// Outcome of one refresh run: how many tickers were updated out of how
/// many were tracked, and why the rest failed.
#[derive(Clone, Debug, Getters, new)]
pub struct RefreshReport {
    updated: usize,
    total: usize,
    failures: Vec<(String, String)>,
}

/// The exchange-qualified symbols to try for a tracked ticker.
pub fn candidate_symbols(ticker: &str) -> Vec<String> {
    MARKET_SUFFIXES
        .iter()
        .map(|suffix| format!("{ticker}{suffix}"))
        .chain(std::iter::once(ticker.to_string()))
        .collect()
}

/// Tries every candidate symbol until one yields a usable price. A live
/// price that is absent or zero falls back to the most recent close of a
/// short history window before the candidate is rejected. Returns the
/// winning symbol together with the price, or `None` when every candidate
/// fails.
pub async fn resolve_price<S: QuoteSource + ?Sized>(
    source: &S,
    ticker: &str,
) -> Option<(String, Decimal)> {
    for symbol in candidate_symbols(ticker) {
        match source.current_price(&symbol).await {
            Ok(Some(price)) if !price.is_zero() => return Some((symbol, price)),
            Ok(_) => match source.price_history(&symbol, FALLBACK_RANGE).await {
                Ok(bars) => {
                    let last_close = bars
                        .iter()
                        .rev()
                        .map(|bar| *bar.close())
                        .find(|close| !close.is_zero());
                    if let Some(close) = last_close {
                        return Some((symbol, close));
                    }
                }
                Err(err) => debug!(%symbol, "history fallback failed: {err:#}"),
            },
            Err(err) => debug!(%symbol, "candidate rejected: {err:#}"),
        }
    }

    None
}

/// Refreshes the stored current price of every tracked ticker. One ticker
/// failing, on the provider side or on the store side, never aborts the
/// rest of the batch.
pub async fn refresh_prices<S: QuoteSource + ?Sized>(
    source: &S,
    connection: &Pool<Sqlite>,
) -> Result<RefreshReport> {
    let tickers = db::read::distinct_tickers(connection).await?;
    let total = tickers.len();
    let mut updated = 0;
    let mut failures = Vec::new();

    for ticker in tickers {
        match resolve_price(source, &ticker).await {
            Some((symbol, price)) => {
                let row = CurrentPrice::new(ticker.clone(), price);
                match db::write::upsert_price(&row, connection).await {
                    Ok(()) => {
                        info!(%ticker, %symbol, %price, "price updated");
                        updated += 1;
                    }
                    Err(err) => {
                        error!(%ticker, "failed to store price: {err:#}");
                        failures.push((ticker, format!("store failure: {err:#}")));
                    }
                }
            }
            None => {
                warn!(%ticker, "no market suffix yielded a price");
                failures.push((ticker, String::from("no quote under any market suffix")));
            }
        }
    }

    info!("price refresh complete: {updated} of {total} tickers updated");

    Ok(RefreshReport::new(updated, total, failures))
}

/// Bulk-loads the full available price history of every tracked ticker,
/// appending (ticker, date, close, dividend) points and skipping the ones
/// already stored. Same suffix resolution and per-ticker failure policy
/// as the price refresh.
pub async fn refresh_history<S: QuoteSource + ?Sized>(
    source: &S,
    connection: &Pool<Sqlite>,
) -> Result<RefreshReport> {
    let tickers = db::read::distinct_tickers(connection).await?;
    let total = tickers.len();
    let mut updated = 0;
    let mut failures = Vec::new();

    for ticker in tickers {
        let mut bars = Vec::new();
        for symbol in candidate_symbols(&ticker) {
            match source.price_history(&symbol, HISTORY_RANGE).await {
                Ok(series) if !series.is_empty() => {
                    bars = series;
                    break;
                }
                Ok(_) => debug!(%symbol, "empty history"),
                Err(err) => debug!(%symbol, "history candidate rejected: {err:#}"),
            }
        }

        if bars.is_empty() {
            warn!(%ticker, "no market suffix yielded a price history");
            failures.push((ticker, String::from("no history under any market suffix")));
            continue;
        }

        let points: Vec<PricePoint> = bars
            .iter()
            .map(|bar| PricePoint::new(ticker.clone(), *bar.date(), *bar.close(), *bar.dividend()))
            .collect();

        match db::write::insert_price_history(&points, connection).await {
            Ok(inserted) => {
                info!(%ticker, points = points.len(), inserted, "history refreshed");
                updated += 1;
            }
            Err(err) => {
                error!(%ticker, "failed to store history: {err:#}");
                failures.push((ticker, format!("store failure: {err:#}")));
            }
        }
    }

    info!("history refresh complete: {updated} of {total} tickers updated");

    Ok(RefreshReport::new(updated, total, failures))
}
