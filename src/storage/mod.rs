pub mod currency_config;
#[cfg(test)]
pub mod memory;
pub mod observations;
pub mod sqlite;

pub use currency_config::{CurrencyConfigStore, SqliteCurrencyConfigStore};
pub use observations::{ObservationStore, SqliteObservationStore};
pub use sqlite::Database;
