use derive_getters::Getters;
use derive_new::new;
use rust_decimal::Decimal;

/// One underlying constituent of an ETF, from the most recent uploaded
/// snapshot. No history is kept: a new upload for the same parent ticker
/// replaces every row scoped to it.
///
/// Missing string fields arrive as the "-" placeholder, a missing exchange
/// rate reference as "EUR" and an unparseable weighting as `None`; the
/// upload path applies those defaults before constructing this type.
#[derive(Clone, Debug, Getters, new)]
pub struct EtfHolding {
    etf_ticker: String,
    ticker: String,
    name: String,
    sector: String,
    asset_class: String,
    weighting: Option<Decimal>,
    geographic_area: String,
    fx_reference: String,
    market_currency: String,
}
