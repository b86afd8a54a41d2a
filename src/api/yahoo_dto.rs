use std::collections::HashMap;

use derive_getters::Getters;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Getters)]
pub struct ChartResponseDto {
    chart: ChartDto,
}

#[derive(Debug, Deserialize, Getters)]
pub struct ChartDto {
    result: Option<Vec<ChartResultDto>>,
    error: Option<Value>,
}

impl ChartResponseDto {
    /// Consumes the envelope and yields the single result series the
    /// chart endpoint returns for a one-symbol query.
    pub fn into_first_result(self) -> Option<ChartResultDto> {
        self.chart.result.and_then(|mut results| {
            if results.is_empty() {
                None
            } else {
                Some(results.remove(0))
            }
        })
    }
}

#[derive(Debug, Deserialize, Getters)]
pub struct ChartResultDto {
    meta: ChartMetaDto,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: IndicatorsDto,
    events: Option<EventsDto>,
}

#[derive(Debug, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetaDto {
    #[serde(default)]
    regular_market_price: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize, Getters)]
pub struct IndicatorsDto {
    #[serde(default)]
    quote: Vec<QuoteIndicatorDto>,
}

#[derive(Debug, Deserialize, Getters)]
pub struct QuoteIndicatorDto {
    #[serde(default)]
    close: Vec<Option<Decimal>>,
}

#[derive(Debug, Deserialize, Getters)]
pub struct EventsDto {
    #[serde(default)]
    dividends: HashMap<String, DividendDto>,
}

#[derive(Debug, Deserialize, Getters)]
pub struct DividendDto {
    amount: Decimal,
    date: i64,
}
