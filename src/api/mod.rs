pub mod utils;
pub mod yahoo;
pub mod yahoo_dto;

use async_trait::async_trait;

use anyhow::Result;
use chrono::NaiveDate;
use derive_getters::Getters;
use derive_new::new;
use rust_decimal::Decimal;

pub use yahoo::YahooApi;

/// One historical close as returned by a quote provider, before the
/// tracker attaches its own ticker to it.
#[derive(Clone, Debug, Getters, new)]
pub struct HistoryBar {
    date: NaiveDate,
    close: Decimal,
    dividend: Decimal,
}

/// The two operations the tracker consumes from a market-data provider.
/// The refresh loop is generic over this trait so it can run against a
/// fake source in tests.
#[async_trait]
pub trait QuoteSource {
    /// Latest live price for an exchange-qualified symbol, or `None` when
    /// the provider has no current price field for it.
    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>>;

    /// Historical closes over a provider-defined range (for example "5d"
    /// or "max"). An unknown symbol is an error, not an empty series.
    async fn price_history(&self, symbol: &str, range: &str) -> Result<Vec<HistoryBar>>;
}
