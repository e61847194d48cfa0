// Derivatum common library - main library exports

pub mod branch;
pub mod decimal;
pub mod ledger;
pub mod messages;
pub mod queries;
pub mod types;

// Flattened re-exports
pub use self::decimal::Decimal;
pub use self::types::*;
