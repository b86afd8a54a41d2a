use anyhow::{Context, Error, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use rust_decimal::Decimal;

use crate::api::{
    HistoryBar, QuoteSource,
    utils::make_request,
    yahoo_dto::{ChartResponseDto, ChartResultDto},
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart endpoint. No API key; symbols carry the exchange
/// as a suffix (VWCE.MI, VWCE.DE, ...).
#[derive(Clone, Debug, Default)]
pub struct YahooApi {
    client: Client,
}

impl YahooApi {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn fetch_chart(&self, symbol: &str, range: &str) -> Result<ChartResultDto> {
        let endpoint = format!("{}?range={}&interval=1d&events=div", symbol, range);
        let data = make_request(&self.client, BASE_URL, &endpoint).await?;

        let response = serde_json::from_value::<ChartResponseDto>(data)
            .with_context(|| format!("Unexpected chart response for {}", symbol))?;

        if let Some(error) = response.chart().error() {
            if !error.is_null() {
                return Err(Error::msg(format!(
                    "Provider error for {}: {}",
                    symbol, error
                )));
            }
        }

        response
            .into_first_result()
            .ok_or_else(|| Error::msg(format!("No chart data for {}", symbol)))
    }
}

#[async_trait]
impl QuoteSource for YahooApi {
    async fn current_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        let result = self.fetch_chart(symbol, "1d").await?;
        Ok(*result.meta().regular_market_price())
    }

    async fn price_history(&self, symbol: &str, range: &str) -> Result<Vec<HistoryBar>> {
        let result = self.fetch_chart(symbol, range).await?;

        let closes = result
            .indicators()
            .quote()
            .first()
            .map(|q| q.close().clone())
            .unwrap_or_default();

        let dividends: std::collections::HashMap<i64, Decimal> = result
            .events()
            .as_ref()
            .map(|events| {
                events
                    .dividends()
                    .values()
                    .map(|d| (*d.date(), *d.amount()))
                    .collect()
            })
            .unwrap_or_default();

        let bars = result
            .timestamp()
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
                let dividend = dividends.get(ts).copied().unwrap_or(Decimal::ZERO);
                close.map(|close| HistoryBar::new(date, close, dividend))
            })
            .collect();

        Ok(bars)
    }
}
