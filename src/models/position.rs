use chrono::NaiveDate;
use derive_getters::Getters;
use derive_new::new;
use rust_decimal::Decimal;

/// Per-transaction valuation, computed on read and never persisted.
/// `growth_pct` is `None` when the cost basis is zero.
#[derive(Clone, Debug, Getters, new)]
pub struct PositionRow {
    ticker: String,
    operation_date: NaiveDate,
    quantity: Decimal,
    purchase_price: Decimal,
    current_price: Decimal,
    cost: Decimal,
    market_value: Decimal,
    growth_pct: Option<Decimal>,
}

/// Portfolio-level aggregates. Percentage metrics are `None` when not
/// computable (empty portfolio or zero total cost).
#[derive(Clone, Debug, Getters, new)]
pub struct PortfolioKpi {
    total_cost: Decimal,
    total_market_value: Decimal,
    gain: Decimal,
    return_pct: Option<Decimal>,
    cagr_pct: Option<Decimal>,
}
