use thiserror::Error;

/// Validation failures raised before a record reaches the ledger.
/// Each variant names the offending field so the message can be shown
/// to the user as-is; nothing is stored when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{0}' must be greater than zero")]
    NonPositive(&'static str),

    #[error("Invalid ISIN '{0}': expected 12 alphanumeric characters")]
    InvalidIsin(String),

    #[error("Unsupported currency '{0}'")]
    UnknownCurrency(String),

    #[error("Unparseable date '{1}' in field '{0}'")]
    InvalidDate(&'static str, String),
}
