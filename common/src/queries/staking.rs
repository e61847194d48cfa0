//! Staking queries - answered from the ledger facade
//! Accumulated rewards are computed on a simulation branch, everything else is a plain read

use crate::ledger::{Delegation, Validator};
use crate::{Address, Coin, Decimal, ValidatorAddress};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingQuery {
    BondedDenom {},
    Validators {},
    Validator { address: ValidatorAddress },
    AllDelegations { delegator: Address },
    Delegation {
        delegator: Address,
        validator: ValidatorAddress,
    },
}

impl StakingQuery {
    /// Name of the variant, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::BondedDenom {} => "bonded_denom",
            Self::Validators {} => "validators",
            Self::Validator { .. } => "validator",
            Self::AllDelegations { .. } => "all_delegations",
            Self::Delegation { .. } => "delegation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingQueryResponse {
    BondedDenom(BondedDenomResponse),
    Validators(ValidatorsResponse),
    Validator(ValidatorResponse),
    AllDelegations(AllDelegationsResponse),
    Delegation(DelegationResponse),
}

impl StakingQueryResponse {
    /// Serialise the inner response the way the contract host expects it on the wire
    pub fn to_wire(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::BondedDenom(r) => serde_json::to_vec(r),
            Self::Validators(r) => serde_json::to_vec(r),
            Self::Validator(r) => serde_json::to_vec(r),
            Self::AllDelegations(r) => serde_json::to_vec(r),
            Self::Delegation(r) => serde_json::to_vec(r),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BondedDenomResponse {
    pub denom: String,
}

/// Public view of a validator
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidatorInfo {
    pub address: ValidatorAddress,
    pub commission: Decimal,
    pub max_commission: Decimal,
    pub max_change_rate: Decimal,
}

impl From<&Validator> for ValidatorInfo {
    fn from(validator: &Validator) -> Self {
        Self {
            address: validator.operator.clone(),
            commission: validator.commission.rate.clone(),
            max_commission: validator.commission.max_rate.clone(),
            max_change_rate: validator.commission.max_change_rate.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidatorsResponse {
    pub validators: Vec<ValidatorInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidatorResponse {
    pub validator: Option<ValidatorInfo>,
}

/// Delegation summary, without reward information
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DelegationInfo {
    pub delegator: Address,
    pub validator: ValidatorAddress,
    pub amount: Coin,
}

impl From<&Delegation> for DelegationInfo {
    fn from(delegation: &Delegation) -> Self {
        Self {
            delegator: delegation.delegator.clone(),
            validator: delegation.validator.clone(),
            amount: delegation.balance.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AllDelegationsResponse {
    pub delegations: Vec<DelegationInfo>,
}

/// Full delegation view including rewards that have not been withdrawn yet
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FullDelegation {
    pub delegator: Address,
    pub validator: ValidatorAddress,
    pub amount: Coin,
    pub can_redelegate: Coin,
    pub accumulated_rewards: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DelegationResponse {
    pub delegation: Option<FullDelegation>,
}
