//! Derivatum derivative state module
//! Staking derivative accounting over the ledger facade: the contract state machine,
//! a query bridge whose reward lookups run on discarded ledger branches, and a host
//! that serialises executes while letting queries run side by side.

pub mod host;
pub mod query_bridge;
pub mod state;
pub mod state_config;

pub use host::{Host, SharedHost};
pub use query_bridge::QueryBridge;
pub use state::{ClaimEntry, DerivativeError, State};
pub use state_config::StateConfig;
