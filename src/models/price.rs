use chrono::NaiveDate;
use derive_getters::Getters;
use derive_new::new;
use rust_decimal::Decimal;

/// Latest known quote for a ticker. At most one row per ticker exists in
/// the store; refreshing always replaces, never accumulates.
#[derive(Clone, Debug, Getters, new)]
pub struct CurrentPrice {
    ticker: String,
    price: Decimal,
}

/// One historical close. Append-only: re-inserting an identical
/// (ticker, date, close) point is a no-op.
#[derive(Clone, Debug, Getters, new)]
pub struct PricePoint {
    ticker: String,
    date: NaiveDate,
    close: Decimal,
    dividend: Decimal,
}
