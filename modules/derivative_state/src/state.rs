//! Derivatum derivative state
//! Tokenised claim on a single validator delegation held by the contract. Holders bond the
//! base asset for derivative tokens, unbond them for a delayed claim on the base asset, and
//! share in rewards as they are reinvested.

use derivatum_common::{
    branch::{transact, Branchable},
    decimal::multiply_ratio,
    ledger::{LedgerError, LedgerFacade},
    messages::{ExecuteMsg, ExecuteOutcome, InstantiateMsg, MessageInfo},
    queries::derivative::{InvestmentResponse, TokenInfoResponse},
    sum_denom, Address, Amount, Coin, Decimal, Timestamp, ValidatorAddress,
};
use imbl::OrdMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Errors raised by the derivative contract; a failed execute changes nothing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivativeError {
    #[error("{0} is not a registered validator")]
    InvalidValidator(ValidatorAddress),

    #[error("insufficient balance: {available} available, {required} required")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("unbond of {amount} is below the minimum withdrawal of {min_withdrawal}")]
    BelowMinWithdrawal {
        amount: Amount,
        min_withdrawal: Amount,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("ledger error: {0}")]
    LedgerFacadeError(LedgerError),

    #[error("invalid funds: {0}")]
    InvalidFunds(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("exit tax {0} must be at least 0 and below 1")]
    InvalidExitTax(Decimal),

    #[error("invalid token info: {0}")]
    InvalidTokenInfo(String),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("contract is not instantiated")]
    NotInstantiated,

    #[error("serialisation failed: {0}")]
    Serialization(String),
}

impl From<LedgerError> for DerivativeError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::ValidatorNotFound(validator) => Self::InvalidValidator(validator),
            error => Self::LedgerFacadeError(error),
        }
    }
}

/// Derivative token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    fn validate(&self) -> Result<(), DerivativeError> {
        if !(3..=30).contains(&self.name.chars().count()) {
            return Err(DerivativeError::InvalidTokenInfo(format!(
                "name '{}' must be 3 to 30 characters",
                self.name
            )));
        }
        if !(3..=6).contains(&self.symbol.len())
            || !self.symbol.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(DerivativeError::InvalidTokenInfo(format!(
                "symbol '{}' must be 3 to 6 uppercase letters",
                self.symbol
            )));
        }
        if self.decimals > 18 {
            return Err(DerivativeError::InvalidTokenInfo(format!(
                "decimals {} exceed 18",
                self.decimals
            )));
        }
        Ok(())
    }
}

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    /// Receives exit tax, may change ownership
    pub owner: Address,

    /// The only validator the pool delegates to
    pub validator: ValidatorAddress,

    /// Bonded denom of the ledger at instantiation
    pub bond_denom: String,

    pub exit_tax: Decimal,
    pub min_withdrawal: Amount,
}

/// Base asset owed to a holder once the ledger releases it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEntry {
    pub amount: Amount,
    pub release_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Address the contract holds funds and delegates under
    contract: Address,

    token_info: TokenInfo,
    investment: Investment,

    /// Derivative tokens issued, always the sum of balances
    token_supply: Amount,

    balances: OrdMap<Address, Amount>,
    claims: OrdMap<Address, Vec<ClaimEntry>>,
}

impl State {
    /// Create the contract, validating its parameters against the ledger
    pub fn instantiate<L: LedgerFacade>(
        ledger: &L,
        contract: Address,
        info: &MessageInfo,
        msg: &InstantiateMsg,
    ) -> Result<Self, DerivativeError> {
        let token_info = TokenInfo {
            name: msg.name.clone(),
            symbol: msg.symbol.clone(),
            decimals: msg.decimals,
        };
        token_info.validate()?;

        if msg.exit_tax.is_negative() || msg.exit_tax >= Decimal::one() {
            return Err(DerivativeError::InvalidExitTax(msg.exit_tax.clone()));
        }
        if ledger.get_validator(&msg.validator).is_none() {
            return Err(DerivativeError::InvalidValidator(msg.validator.clone()));
        }
        if info.funds.iter().any(|coin| coin.amount > 0) {
            return Err(DerivativeError::InvalidFunds(
                "instantiate does not accept funds".to_string(),
            ));
        }

        info!(%contract, owner = %info.sender, validator = %msg.validator,
              symbol = %token_info.symbol, "Instantiated derivative contract");

        Ok(Self {
            contract,
            token_info,
            investment: Investment {
                owner: info.sender.clone(),
                validator: msg.validator.clone(),
                bond_denom: ledger.bonded_denom(),
                exit_tax: msg.exit_tax.clone(),
                min_withdrawal: msg.min_withdrawal,
            },
            token_supply: 0,
            balances: OrdMap::new(),
            claims: OrdMap::new(),
        })
    }

    /// Run one execute. Attached funds move to the contract first; contract and ledger
    /// changes are kept only if the whole message succeeds.
    pub fn execute<L: Branchable>(
        &mut self,
        ledger: &mut L,
        info: &MessageInfo,
        msg: &ExecuteMsg,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        let mut next = self.clone();
        let outcome = transact(ledger, |branch| {
            next.receive_funds(branch, info)?;
            next.apply(branch, info, msg)
        })?;
        *self = next;

        debug!(msg = msg.name(), sender = %info.sender, supply = self.token_supply, "Executed");
        Ok(outcome)
    }

    fn receive_funds<L: LedgerFacade>(
        &self,
        ledger: &mut L,
        info: &MessageInfo,
    ) -> Result<(), DerivativeError> {
        for coin in info.funds.iter().filter(|coin| coin.amount > 0) {
            ledger.transfer(&info.sender, &self.contract, coin)?;
        }
        Ok(())
    }

    fn apply<L: LedgerFacade>(
        &mut self,
        ledger: &mut L,
        info: &MessageInfo,
        msg: &ExecuteMsg,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        match msg {
            ExecuteMsg::Bond {} => self.bond(ledger, &info.sender, &info.funds),
            ExecuteMsg::Unbond { amount } => self.unbond(ledger, &info.sender, *amount),
            ExecuteMsg::Claim {} => self.claim(ledger, &info.sender),
            ExecuteMsg::Reinvest {} => self.reinvest(ledger),
            ExecuteMsg::ChangeOwner { owner } => self.change_owner(&info.sender, owner),
            ExecuteMsg::Transfer { recipient, amount } => {
                self.transfer(&info.sender, recipient, *amount)
            }
        }
    }

    fn bond<L: LedgerFacade>(
        &mut self,
        ledger: &mut L,
        holder: &Address,
        funds: &[Coin],
    ) -> Result<ExecuteOutcome, DerivativeError> {
        let amount = match funds {
            [coin] if coin.denom == self.investment.bond_denom && coin.amount > 0 => coin.amount,
            _ => {
                return Err(DerivativeError::InvalidFunds(format!(
                    "expected a single positive coin of {}",
                    self.investment.bond_denom
                )))
            }
        };

        let staked = self.staked(ledger);
        ledger.delegate(&self.contract, &self.investment.validator, amount)?;

        let minted = if self.token_supply == 0 || staked == 0 {
            amount
        } else {
            multiply_ratio(amount, self.token_supply, staked).ok_or(DerivativeError::Overflow)?
        };
        if minted == 0 {
            return Err(DerivativeError::InvalidFunds(format!(
                "bond of {amount} is too small to mint tokens"
            )));
        }

        self.credit(holder, minted)?;
        self.token_supply =
            self.token_supply.checked_add(minted).ok_or(DerivativeError::Overflow)?;

        info!(%holder, bonded = amount, minted, supply = self.token_supply, "Bond");
        Ok(ExecuteOutcome::Bonded {
            bonded: amount,
            minted,
        })
    }

    fn unbond<L: LedgerFacade>(
        &mut self,
        ledger: &mut L,
        holder: &Address,
        amount: Amount,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        if amount < self.investment.min_withdrawal {
            return Err(DerivativeError::BelowMinWithdrawal {
                amount,
                min_withdrawal: self.investment.min_withdrawal,
            });
        }
        if amount == 0 {
            return Err(DerivativeError::InvalidAmount("cannot unbond zero".to_string()));
        }
        self.debit(holder, amount)?;

        let tax = self
            .investment
            .exit_tax
            .mul_amount(amount)
            .to_amount()
            .ok_or(DerivativeError::Overflow)?;
        let remainder = amount - tax;
        let staked = self.staked(ledger);
        let unbonding =
            multiply_ratio(remainder, staked, self.token_supply).ok_or(DerivativeError::Overflow)?;

        let release_at =
            ledger.undelegate(&self.contract, &self.investment.validator, unbonding)?;

        let owner = self.investment.owner.clone();
        self.credit(&owner, tax)?;
        self.token_supply -= remainder;
        let mut entries = self.claim_entries(holder);
        entries.push(ClaimEntry {
            amount: unbonding,
            release_at,
        });
        self.claims.insert(holder.clone(), entries);

        info!(%holder, burned = remainder, tax, unbonding, release_at,
              supply = self.token_supply, "Unbond");
        Ok(ExecuteOutcome::Unbonded {
            burned: remainder,
            tax,
            unbonding,
            release_at,
        })
    }

    fn claim<L: LedgerFacade>(
        &mut self,
        ledger: &mut L,
        holder: &Address,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        let now = ledger.block_time();
        let entries = self.claims.get(holder).cloned().unwrap_or_default();
        let (matured, pending): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|entry| entry.release_at <= now);

        let amount = matured
            .iter()
            .try_fold(0u128, |total, entry| total.checked_add(entry.amount))
            .ok_or(DerivativeError::Overflow)?;
        if amount == 0 {
            debug!(%holder, "Nothing to claim");
            return Ok(ExecuteOutcome::Claimed { amount: 0 });
        }

        let coin = Coin::new(amount, self.investment.bond_denom.as_str());
        ledger.transfer(&self.contract, holder, &coin)?;
        if pending.is_empty() {
            self.claims.remove(holder);
        } else {
            self.claims.insert(holder.clone(), pending);
        }

        info!(%holder, amount, "Claim");
        Ok(ExecuteOutcome::Claimed { amount })
    }

    fn reinvest<L: LedgerFacade>(
        &mut self,
        ledger: &mut L,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        let denom = self.investment.bond_denom.clone();
        let withdrawn =
            match ledger.withdraw_delegation_rewards(&self.contract, &self.investment.validator) {
                Ok(rewards) => sum_denom(&rewards, &denom),
                Err(LedgerError::DelegationNotFound { .. }) => 0,
                Err(e) => return Err(e.into()),
            };

        // Funds released for matured claims belong to their holders
        let reserved = self.matured_claims(ledger.block_time())?;
        let bonded = ledger.balance(&self.contract, &denom).saturating_sub(reserved);
        if bonded > 0 {
            ledger.delegate(&self.contract, &self.investment.validator, bonded)?;
        }

        info!(withdrawn, bonded, supply = self.token_supply, "Reinvest");
        Ok(ExecuteOutcome::Reinvested { withdrawn, bonded })
    }

    fn change_owner(
        &mut self,
        sender: &Address,
        owner: &Address,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        if sender != &self.investment.owner {
            return Err(DerivativeError::Unauthorized);
        }
        if owner.is_empty() {
            return Err(DerivativeError::InvalidAmount("owner address is empty".to_string()));
        }

        info!(from = %sender, to = %owner, "Ownership changed");
        self.investment.owner = owner.clone();
        Ok(ExecuteOutcome::OwnerChanged {
            owner: owner.clone(),
        })
    }

    fn transfer(
        &mut self,
        sender: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        if amount == 0 {
            return Err(DerivativeError::InvalidAmount("cannot transfer zero".to_string()));
        }
        self.debit(sender, amount)?;
        self.credit(recipient, amount)?;

        debug!(from = %sender, to = %recipient, amount, "Transfer");
        Ok(ExecuteOutcome::Transferred {
            recipient: recipient.clone(),
            amount,
        })
    }

    fn credit(&mut self, holder: &Address, amount: Amount) -> Result<(), DerivativeError> {
        if amount == 0 {
            return Ok(());
        }
        let balance =
            self.balance(holder).checked_add(amount).ok_or(DerivativeError::Overflow)?;
        self.balances.insert(holder.clone(), balance);
        Ok(())
    }

    fn debit(&mut self, holder: &Address, amount: Amount) -> Result<(), DerivativeError> {
        let available = self.balance(holder);
        let remaining =
            available.checked_sub(amount).ok_or(DerivativeError::InsufficientBalance {
                available,
                required: amount,
            })?;
        if remaining == 0 {
            self.balances.remove(holder);
        } else {
            self.balances.insert(holder.clone(), remaining);
        }
        Ok(())
    }

    /// Claims released by the ledger but not yet paid out
    fn matured_claims(&self, now: Timestamp) -> Result<Amount, DerivativeError> {
        self.claims
            .values()
            .flatten()
            .filter(|entry| entry.release_at <= now)
            .try_fold(0u128, |total, entry| total.checked_add(entry.amount))
            .ok_or(DerivativeError::Overflow)
    }

    /// Base asset currently bonded by the pool
    pub fn staked<L: LedgerFacade>(&self, ledger: &L) -> Amount {
        ledger
            .get_delegation(&self.contract, &self.investment.validator)
            .map(|delegation| delegation.balance.amount)
            .unwrap_or(0)
    }

    // -- Queries --

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    pub fn investment(&self) -> &Investment {
        &self.investment
    }

    pub fn token_supply(&self) -> Amount {
        self.token_supply
    }

    pub fn balance(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Sum of all balances, equal to the token supply
    pub fn total_balances(&self) -> Amount {
        self.balances.values().sum()
    }

    pub fn claim_entries(&self, holder: &Address) -> Vec<ClaimEntry> {
        self.claims.get(holder).cloned().unwrap_or_default()
    }

    /// Total base asset owed to a holder, matured or not
    pub fn claims(&self, holder: &Address) -> Amount {
        self.claims.get(holder).map(|entries| entries.iter().map(|e| e.amount).sum()).unwrap_or(0)
    }

    pub fn token_info(&self) -> TokenInfoResponse {
        TokenInfoResponse {
            name: self.token_info.name.clone(),
            symbol: self.token_info.symbol.clone(),
            decimals: self.token_info.decimals,
            total_supply: self.token_supply,
        }
    }

    pub fn investment_info<L: LedgerFacade>(&self, ledger: &L) -> InvestmentResponse {
        let staked = self.staked(ledger);
        InvestmentResponse {
            token_supply: self.token_supply,
            staked_tokens: Coin::new(staked, self.investment.bond_denom.as_str()),
            nominal_value: Decimal::from_ratio(staked, self.token_supply)
                .unwrap_or_else(Decimal::one),
            owner: self.investment.owner.clone(),
            validator: self.investment.validator.clone(),
            exit_tax: self.investment.exit_tax.clone(),
            min_withdrawal: self.investment.min_withdrawal,
        }
    }
}
