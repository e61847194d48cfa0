//! Query definitions - staking queries proxied to the ledger and derivative queries
//! answered from contract state

pub mod derivative;
pub mod errors;
pub mod staking;

use crate::queries::{
    derivative::{DerivativeQuery, DerivativeQueryResponse},
    errors::QueryError,
    staking::{StakingQuery, StakingQueryResponse},
};

/// Any query a host can route to the derivative core
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateQuery {
    Staking(StakingQuery),
    Derivative(DerivativeQuery),
}

/// Response to a StateQuery
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateQueryResponse {
    Staking(StakingQueryResponse),
    Derivative(DerivativeQueryResponse),
    Error(QueryError),
}
