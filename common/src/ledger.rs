//! Ledger facade - the proof-of-stake ledger as seen by the derivative core
//! Validators, delegations, unbonding queues, the reward pool and bank balances are
//! reached only through this trait; the ledger's own mechanics live behind it.

use crate::{Address, Amount, Coin, DecCoin, Decimal, Timestamp, ValidatorAddress};
use serde_with::{serde_as, DisplayFromStr};

/// Validator commission configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommissionRates {
    /// Current commission rate
    pub rate: Decimal,

    /// Upper bound the rate may ever be set to
    pub max_rate: Decimal,

    /// Largest daily change of the rate
    pub max_change_rate: Decimal,
}

/// Validator bonding status
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BondStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

/// Validator record
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Validator {
    /// Operator address
    pub operator: ValidatorAddress,

    /// Bonded tokens
    #[serde_as(as = "DisplayFromStr")]
    pub tokens: Amount,

    /// Total shares issued to delegators
    pub delegator_shares: Decimal,

    /// Commission
    pub commission: CommissionRates,

    /// Status
    pub status: BondStatus,
}

impl Validator {
    /// Shares that `amount` tokens are worth now; None once all tokens are gone
    pub fn shares_from_tokens(&self, amount: Amount) -> Option<Decimal> {
        if self.tokens == 0 {
            return None;
        }
        self.delegator_shares.mul_amount(amount).quo_amount(self.tokens)
    }

    /// Tokens that `shares` are worth now
    pub fn tokens_from_shares(&self, shares: &Decimal) -> Decimal {
        shares
            .mul_amount(self.tokens)
            .checked_quo(&self.delegator_shares)
            .unwrap_or_else(Decimal::zero)
    }
}

/// A delegation from one delegator to one validator
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    pub validator: ValidatorAddress,

    /// Shares held
    pub shares: Decimal,

    /// Token value of the shares, truncated
    pub balance: Coin,
}

/// One pending unbonding
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UnbondingEntry {
    /// Height the unbonding started
    pub creation_height: u64,

    /// Time the tokens are released
    pub completion_time: Timestamp,

    /// Tokens at start
    #[serde_as(as = "DisplayFromStr")]
    pub initial_balance: Amount,

    /// Tokens to be released
    #[serde_as(as = "DisplayFromStr")]
    pub balance: Amount,
}

/// Unbonding queue of one delegator/validator pair
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UnbondingDelegation {
    pub delegator: Address,
    pub validator: ValidatorAddress,
    pub entries: Vec<UnbondingEntry>,
}

/// Rewards accumulated by a validator's delegators in the current period
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidatorCurrentRewards {
    pub rewards: Vec<DecCoin>,
    pub period: u64,
}

/// Errors raised by the ledger; every failing operation leaves the ledger untouched
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("validator {0} does not exist")]
    ValidatorNotFound(ValidatorAddress),

    #[error("no delegation from {delegator} to {validator}")]
    DelegationNotFound {
        delegator: Address,
        validator: ValidatorAddress,
    },

    #[error("insufficient funds: {address} holds {available}, {required} required")]
    InsufficientFunds {
        address: Address,
        available: Amount,
        required: Amount,
    },

    #[error("insufficient delegation shares")]
    InsufficientShares,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid denom {got}, expected {expected}")]
    InvalidDenom { got: String, expected: String },

    #[error("too many unbonding entries from {delegator} to {validator}")]
    TooManyUnbondingEntries {
        delegator: Address,
        validator: ValidatorAddress,
    },
}

/// Read/write access to the staking ledger
pub trait LedgerFacade {
    /// Denomination that can be bonded
    fn bonded_denom(&self) -> String;

    /// Time of the current block
    fn block_time(&self) -> Timestamp;

    /// All known validators
    fn validators(&self) -> Vec<Validator>;

    fn get_validator(&self, validator: &ValidatorAddress) -> Option<Validator>;

    /// Delegate `amount` of the bonded denom from the delegator's bank balance,
    /// returning the shares issued
    fn delegate(
        &mut self,
        delegator: &Address,
        validator: &ValidatorAddress,
        amount: Amount,
    ) -> Result<Decimal, LedgerError>;

    /// Start unbonding `amount` tokens, returning the completion time
    fn undelegate(
        &mut self,
        delegator: &Address,
        validator: &ValidatorAddress,
        amount: Amount,
    ) -> Result<Timestamp, LedgerError>;

    fn get_delegation(
        &self,
        delegator: &Address,
        validator: &ValidatorAddress,
    ) -> Option<Delegation>;

    /// All delegations of one delegator
    fn delegator_delegations(&self, delegator: &Address) -> Vec<Delegation>;

    fn get_unbonding_delegation(
        &self,
        delegator: &Address,
        validator: &ValidatorAddress,
    ) -> Option<UnbondingDelegation>;

    /// Pay out accrued delegation rewards to the delegator's bank balance.
    /// Zeroes the accrued amount and closes the validator's reward period.
    fn withdraw_delegation_rewards(
        &mut self,
        delegator: &Address,
        validator: &ValidatorAddress,
    ) -> Result<Vec<Coin>, LedgerError>;

    fn get_validator_current_rewards(
        &self,
        validator: &ValidatorAddress,
    ) -> Option<ValidatorCurrentRewards>;

    /// Bank balance
    fn balance(&self, address: &Address, denom: &str) -> Amount;

    /// Bank transfer
    fn transfer(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<(), LedgerError>;
}
