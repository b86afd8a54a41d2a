use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::models::{PortfolioKpi, PositionRow, Transaction};

/// Growth of a position as a percentage of its cost basis, rounded to two
/// decimals. A zero cost basis is not computable and yields `None`; a
/// NaN or infinity must never leak into downstream aggregation.
pub fn growth_pct(cost: Decimal, market_value: Decimal) -> Option<Decimal> {
    if cost.is_zero() {
        return None;
    }
    Some(((market_value - cost) / cost * Decimal::ONE_HUNDRED).round_dp(2))
}

/// Adds the derived Cost / Market Value / Growth % columns to each
/// transaction. Tickers without a stored current price value at zero
/// rather than failing the whole report.
pub fn position_rows(
    transactions: &[Transaction],
    prices: &HashMap<String, Decimal>,
) -> Vec<PositionRow> {
    transactions
        .iter()
        .map(|t| {
            let current_price = prices.get(t.ticker()).copied().unwrap_or(Decimal::ZERO);
            let cost = *t.quantity() * *t.purchase_price();
            let market_value = *t.quantity() * current_price;
            PositionRow::new(
                t.ticker().clone(),
                *t.operation_date(),
                *t.quantity(),
                t.purchase_price().round_dp(2),
                current_price.round_dp(2),
                cost.round_dp(2),
                market_value.round_dp(2),
                growth_pct(cost, market_value),
            )
        })
        .collect()
}

/// Portfolio totals plus overall return and CAGR. The CAGR horizon runs
/// from the earliest to the latest operation date.
pub fn portfolio_kpi(rows: &[PositionRow]) -> PortfolioKpi {
    let total_cost: Decimal = rows.iter().map(|r| *r.cost()).sum();
    let total_market_value: Decimal = rows.iter().map(|r| *r.market_value()).sum();
    let gain = total_market_value - total_cost;

    let first = rows.iter().map(|r| *r.operation_date()).min();
    let last = rows.iter().map(|r| *r.operation_date()).max();
    let cagr = match (first, last) {
        (Some(first), Some(last)) => cagr_pct(total_cost, total_market_value, first, last),
        _ => None,
    };

    PortfolioKpi::new(
        total_cost.round_dp(2),
        total_market_value.round_dp(2),
        gain.round_dp(2),
        growth_pct(total_cost, total_market_value),
        cagr,
    )
}

/// Compound annual growth rate as a percentage, using 365.25-day years.
/// A span shorter than one year is floored to one year so a same-day
/// portfolio is not annualized into an extreme figure.
pub fn cagr_pct(
    total_cost: Decimal,
    total_market_value: Decimal,
    first_date: NaiveDate,
    last_date: NaiveDate,
) -> Option<Decimal> {
    if total_cost.is_zero() {
        return None;
    }

    let ratio = (total_market_value / total_cost).to_f64()?;
    if ratio <= 0.0 {
        return None;
    }

    let days = (last_date - first_date).num_days() as f64;
    let years = (days / 365.25).max(1.0);

    let cagr = ratio.powf(1.0 / years) - 1.0;
    Decimal::from_f64(cagr * 100.0).map(|d| d.round_dp(2))
}

// Risk statistics over a plain return series. These are independent of the
// portfolio model so they can run on whatever series becomes available
// (price history, simulated returns). Sample standard deviation (n-1)
// throughout; degenerate inputs return 0 instead of dividing by zero.

pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate).collect();
    let std = sample_std(&excess);
    if std == 0.0 {
        return 0.0;
    }
    mean(&excess) / std
}

pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let downside: Vec<f64> = returns
        .iter()
        .copied()
        .filter(|r| *r < risk_free_rate)
        .collect();
    let downside_std = sample_std(&downside);
    if downside_std == 0.0 {
        return 0.0;
    }
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate).collect();
    mean(&excess) / downside_std
}

/// Largest peak-to-trough decline of a value series, as a negative
/// fraction of the running peak. An empty series has no drawdown.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut running_max = f64::MIN;
    let mut worst = 0.0_f64;
    for &value in values {
        running_max = running_max.max(value);
        if running_max > 0.0 {
            worst = worst.min((value - running_max) / running_max);
        }
    }
    worst
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
