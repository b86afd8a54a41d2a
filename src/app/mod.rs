pub mod metrics;
pub mod normalize;
pub mod portfolio;
pub mod refresh;

pub use portfolio::Portfolio;
pub use refresh::RefreshReport;
