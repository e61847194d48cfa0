//! Derivative queries - answered from contract state, plus the ledger for staked amounts

use crate::{Address, Amount, Coin, Decimal, ValidatorAddress};
use serde_with::{serde_as, DisplayFromStr};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeQuery {
    Balance { address: Address },
    Claims { address: Address },
    TokenInfo {},
    Investment {},
}

impl DerivativeQuery {
    /// Name of the variant, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Balance { .. } => "balance",
            Self::Claims { .. } => "claims",
            Self::TokenInfo {} => "token_info",
            Self::Investment {} => "investment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeQueryResponse {
    Balance(BalanceResponse),
    Claims(ClaimsResponse),
    TokenInfo(TokenInfoResponse),
    Investment(InvestmentResponse),
}

impl DerivativeQueryResponse {
    /// Serialise the inner response the way the contract host expects it on the wire
    pub fn to_wire(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::Balance(r) => serde_json::to_vec(r),
            Self::Claims(r) => serde_json::to_vec(r),
            Self::TokenInfo(r) => serde_json::to_vec(r),
            Self::Investment(r) => serde_json::to_vec(r),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BalanceResponse {
    #[serde_as(as = "DisplayFromStr")]
    pub balance: Amount,
}

/// Total base asset still owed to a holder from unbonding
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClaimsResponse {
    #[serde_as(as = "DisplayFromStr")]
    pub claims: Amount,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenInfoResponse {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde_as(as = "DisplayFromStr")]
    pub total_supply: Amount,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InvestmentResponse {
    /// Derivative tokens issued
    #[serde_as(as = "DisplayFromStr")]
    pub token_supply: Amount,

    /// Base asset currently bonded by the pool
    pub staked_tokens: Coin,

    /// staked_tokens / token_supply
    pub nominal_value: Decimal,

    pub owner: Address,
    pub validator: ValidatorAddress,
    pub exit_tax: Decimal,

    #[serde_as(as = "DisplayFromStr")]
    pub min_withdrawal: Amount,
}
