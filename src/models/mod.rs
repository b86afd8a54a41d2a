pub mod holding;
pub mod position;
pub mod price;
pub mod transaction;

pub use holding::EtfHolding;
pub use position::{PortfolioKpi, PositionRow};
pub use price::{CurrentPrice, PricePoint};
pub use transaction::{Currency, OperationType, Transaction};
