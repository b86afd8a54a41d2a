use chrono::NaiveDate;
use derive_getters::Getters;
use derive_new::new;
use rust_decimal::Decimal;
use strum_macros::{Display, EnumString};

/// One purchase event in the ledger. Column names in the store keep the
/// broker's Italian identifiers; the composite natural key is
/// (ticker, operation_date, order_reference, protocol).
#[derive(Clone, Debug, Getters, new)]
pub struct Transaction {
    ticker: String,
    isin: Option<String>,
    operation_date: NaiveDate,
    value_date: NaiveDate,
    operation_type: OperationType,
    quantity: Decimal,
    purchase_price: Decimal,
    currency: Currency,
    amount_eur: Decimal,
    amount_currency: Decimal,
    order_reference: String,
    protocol: String,
    description: String,
    is_test: bool,
}

impl Transaction {
    /// The tuple that deduplicates re-imported broker rows.
    pub fn natural_key(&self) -> (&str, NaiveDate, &str, &str) {
        (
            &self.ticker,
            self.operation_date,
            &self.order_reference,
            &self.protocol,
        )
    }

    /// Cost basis of this purchase.
    pub fn cost(&self) -> Decimal {
        self.quantity * self.purchase_price
    }
}

#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq)]
pub enum OperationType {
    #[default]
    #[strum(to_string = "Acquisto", serialize = "Buy")]
    Purchase,
    #[strum(to_string = "Altro")]
    Other,
}

impl OperationType {
    /// Broker exports use a handful of labels for buys; anything
    /// unrecognized lands in `Other` rather than failing the import.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(OperationType::Other)
    }
}

#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq)]
pub enum Currency {
    #[default]
    #[strum(to_string = "EUR")]
    Eur,
    #[strum(to_string = "USD")]
    Usd,
    #[strum(to_string = "GBP")]
    Gbp,
    #[strum(to_string = "CHF")]
    Chf,
}
