//! Derivatum in-memory staking ledger
//! A single-chain proof-of-stake ledger behind the ledger facade: bank balances,
//! validators with share accounting, unbonding queues and period based reward distribution.
//! All state lives in persistent collections so branching is a cheap clone.

mod bank;
mod distribution;
mod params;

pub use distribution::CurrentRewards;
pub use params::LedgerParams;

use bank::Bank;
use config::Config;
use derivatum_common::{
    branch::{transact, Branchable},
    ledger::{
        BondStatus, CommissionRates, Delegation, LedgerError, LedgerFacade, UnbondingDelegation,
        UnbondingEntry, Validator, ValidatorCurrentRewards,
    },
    Address, Amount, Coin, DecCoin, Decimal, Timestamp, ValidatorAddress,
};
use distribution::Distribution;
use imbl::OrdMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingLedger {
    params: LedgerParams,

    /// Current block height
    height: u64,

    /// Current block time
    time: Timestamp,

    bank: Bank,

    validators: OrdMap<ValidatorAddress, Validator>,

    /// Shares held per delegator/validator pair
    delegations: OrdMap<(Address, ValidatorAddress), Decimal>,

    /// Pending unbonding entries per delegator/validator pair
    unbondings: OrdMap<(Address, ValidatorAddress), Vec<UnbondingEntry>>,

    distribution: Distribution,
}

impl StakingLedger {
    /// Empty ledger at height 1 and the given genesis time
    pub fn new(params: LedgerParams, genesis_time: Timestamp) -> Self {
        Self {
            params,
            height: 1,
            time: genesis_time,
            bank: Bank::default(),
            validators: OrdMap::new(),
            delegations: OrdMap::new(),
            unbondings: OrdMap::new(),
            distribution: Distribution::default(),
        }
    }

    /// Empty ledger with parameters read from configuration
    pub fn from_config(config: &Config, genesis_time: Timestamp) -> Self {
        Self::new(LedgerParams::from(config), genesis_time)
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Mint funds into an account
    pub fn fund_account(&mut self, address: &Address, coin: &Coin) -> Result<(), LedgerError> {
        self.bank.credit(address, coin)
    }

    /// Register a validator and bond its self delegation from `self_delegator`'s balance
    pub fn create_validator(
        &mut self,
        operator: &ValidatorAddress,
        self_delegator: &Address,
        self_bond: Amount,
        commission: CommissionRates,
    ) -> Result<(), LedgerError> {
        if self.validators.contains_key(operator) {
            return Err(LedgerError::InvalidAmount(format!(
                "validator {operator} already exists"
            )));
        }
        if commission.rate > commission.max_rate || commission.max_rate > Decimal::one() {
            return Err(LedgerError::InvalidAmount(format!(
                "commission rate {} is out of range",
                commission.rate
            )));
        }

        transact(self, |ledger| {
            ledger.validators.insert(
                operator.clone(),
                Validator {
                    operator: operator.clone(),
                    tokens: 0,
                    delegator_shares: Decimal::zero(),
                    commission,
                    status: BondStatus::Bonded,
                },
            );
            ledger.distribution.initialize_validator(operator);
            ledger.delegate(self_delegator, operator, self_bond)?;
            info!(validator = %operator, self_bond, "Created validator");
            Ok(())
        })
    }

    /// Allocate a block reward to a validator and its delegators
    pub fn allocate_tokens_to_validator(
        &mut self,
        operator: &ValidatorAddress,
        reward: &Decimal,
    ) -> Result<(), LedgerError> {
        let validator = self
            .validators
            .get(operator)
            .ok_or_else(|| LedgerError::ValidatorNotFound(operator.clone()))?;
        self.distribution.allocate(validator, reward);
        Ok(())
    }

    /// Advance one block of `seconds`, releasing every unbonding entry that has matured.
    /// Returns the total released.
    pub fn next_block(&mut self, seconds: u64) -> Result<Amount, LedgerError> {
        transact(self, |ledger| {
            ledger.height += 1;
            ledger.time += seconds;

            let denom = ledger.params.bond_denom.clone();
            let mut released: Amount = 0;
            let pairs: Vec<_> = ledger.unbondings.keys().cloned().collect();
            for key in pairs {
                let Some(entries) = ledger.unbondings.remove(&key) else {
                    continue;
                };
                let (matured, pending): (Vec<_>, Vec<_>) =
                    entries.into_iter().partition(|entry| entry.completion_time <= ledger.time);

                for entry in &matured {
                    ledger.bank.credit(&key.0, &Coin::new(entry.balance, denom.as_str()))?;
                    released += entry.balance;
                    debug!(delegator = %key.0, validator = %key.1, amount = entry.balance,
                           "Unbonding completed");
                }
                if !pending.is_empty() {
                    ledger.unbondings.insert(key, pending);
                }
            }

            debug!(height = ledger.height, time = ledger.time, released, "New block");
            Ok(released)
        })
    }

    /// Accrued commission of a validator operator
    pub fn accumulated_commission(&self, operator: &ValidatorAddress) -> Decimal {
        self.distribution.accumulated_commission(operator)
    }

    /// Rewards allocated to a validator and not yet withdrawn
    pub fn outstanding_rewards(&self, operator: &ValidatorAddress) -> Decimal {
        self.distribution.outstanding_rewards(operator)
    }

    pub fn community_pool(&self) -> &Decimal {
        self.distribution.community_pool()
    }

    /// Token value of a delegation's shares
    fn stake_of(&self, validator: &Validator, shares: &Decimal) -> Decimal {
        validator.tokens_from_shares(shares)
    }

    /// Pay out a delegation's rewards and drop its starting info.
    /// The caller re-initialises the starting info once the stake is final.
    fn withdraw_rewards(
        &mut self,
        delegator: &Address,
        validator: &ValidatorAddress,
    ) -> Result<Amount, LedgerError> {
        let tokens = self
            .validators
            .get(validator)
            .map(|v| v.tokens)
            .ok_or_else(|| LedgerError::ValidatorNotFound(validator.clone()))?;
        if !self.delegations.contains_key(&(delegator.clone(), validator.clone())) {
            return Err(LedgerError::DelegationNotFound {
                delegator: delegator.clone(),
                validator: validator.clone(),
            });
        }

        let ending = self.distribution.increment_period(validator, tokens);
        let rewards = self.distribution.delegation_rewards(delegator, validator, ending);
        let rewards = self.distribution.take_outstanding(validator, &rewards);
        let (paid, dust) = rewards.split_amount().unwrap_or((0, Decimal::zero()));
        self.distribution.add_to_community_pool(&dust);
        if paid > 0 {
            let coin = Coin::new(paid, self.params.bond_denom.as_str());
            self.bank.credit(delegator, &coin)?;
        }
        self.distribution.remove_delegation(delegator, validator);

        debug!(%delegator, %validator, paid, period = ending, "Withdrew delegation rewards");
        Ok(paid)
    }

    fn start_rewards(&mut self, delegator: &Address, validator: &Validator, shares: &Decimal) {
        let stake = self.stake_of(validator, shares);
        self.distribution.initialize_delegation(
            delegator,
            &validator.operator,
            stake,
            self.height,
        );
    }

    fn delegate_inner(
        &mut self,
        delegator: &Address,
        operator: &ValidatorAddress,
        amount: Amount,
    ) -> Result<Decimal, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("cannot delegate zero".to_string()));
        }
        let mut validator = self
            .get_validator(operator)
            .ok_or_else(|| LedgerError::ValidatorNotFound(operator.clone()))?;

        let key = (delegator.clone(), operator.clone());
        let held = self.delegations.get(&key).cloned();
        match held {
            Some(_) => {
                self.withdraw_rewards(delegator, operator)?;
            }
            None => {
                self.distribution.increment_period(operator, validator.tokens);
            }
        }

        self.bank.debit(delegator, &Coin::new(amount, self.params.bond_denom.as_str()))?;

        let issued = if validator.delegator_shares.is_zero() {
            Decimal::from_amount(amount)
        } else {
            validator.shares_from_tokens(amount).ok_or_else(|| {
                LedgerError::InvalidAmount(format!("validator {operator} has no tokens"))
            })?
        };
        if issued.is_zero() {
            return Err(LedgerError::InvalidAmount(format!(
                "{amount} is too small to issue shares"
            )));
        }

        validator.tokens = validator
            .tokens
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount("validator tokens overflow".to_string()))?;
        validator.delegator_shares = &validator.delegator_shares + &issued;

        let shares = match held {
            Some(held) => &held + &issued,
            None => issued.clone(),
        };
        self.delegations.insert(key, shares.clone());
        self.validators.insert(operator.clone(), validator.clone());
        self.start_rewards(delegator, &validator, &shares);

        debug!(%delegator, validator = %operator, amount, shares = %issued, "Delegated");
        Ok(issued)
    }

    fn undelegate_inner(
        &mut self,
        delegator: &Address,
        operator: &ValidatorAddress,
        amount: Amount,
    ) -> Result<Timestamp, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("cannot undelegate zero".to_string()));
        }
        let mut validator = self
            .get_validator(operator)
            .ok_or_else(|| LedgerError::ValidatorNotFound(operator.clone()))?;
        let key = (delegator.clone(), operator.clone());
        let held = self.delegations.get(&key).cloned().ok_or_else(|| {
            LedgerError::DelegationNotFound {
                delegator: delegator.clone(),
                validator: operator.clone(),
            }
        })?;

        let shares = validator.shares_from_tokens(amount).ok_or(LedgerError::InsufficientShares)?;
        let remaining = held.checked_sub(&shares).ok_or(LedgerError::InsufficientShares)?;

        let mut entries = self.unbondings.get(&key).cloned().unwrap_or_default();
        if entries.len() >= self.params.max_entries {
            return Err(LedgerError::TooManyUnbondingEntries {
                delegator: delegator.clone(),
                validator: operator.clone(),
            });
        }

        self.withdraw_rewards(delegator, operator)?;

        // The last shares out take whatever tokens are left
        let remaining_shares = &validator.delegator_shares - &shares;
        let released = if remaining_shares.is_zero() {
            validator.tokens
        } else {
            validator.tokens_from_shares(&shares).to_amount().unwrap_or(0)
        };
        if released == 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "{amount} is too small to undelegate"
            )));
        }
        validator.tokens -= released;
        validator.delegator_shares = remaining_shares;
        self.validators.insert(operator.clone(), validator.clone());

        if remaining.is_zero() {
            self.delegations.remove(&key);
        } else {
            self.delegations.insert(key.clone(), remaining.clone());
            self.start_rewards(delegator, &validator, &remaining);
        }

        let completion_time = self.time + self.params.unbonding_time;
        entries.push(UnbondingEntry {
            creation_height: self.height,
            completion_time,
            initial_balance: released,
            balance: released,
        });
        self.unbondings.insert(key, entries);

        debug!(%delegator, validator = %operator, released, completion_time, "Undelegated");
        Ok(completion_time)
    }

    fn to_delegation(
        &self,
        delegator: &Address,
        validator: &Validator,
        shares: &Decimal,
    ) -> Delegation {
        let balance = self.stake_of(validator, shares).to_amount().unwrap_or(0);
        Delegation {
            delegator: delegator.clone(),
            validator: validator.operator.clone(),
            shares: shares.clone(),
            balance: Coin::new(balance, self.params.bond_denom.as_str()),
        }
    }
}

impl LedgerFacade for StakingLedger {
    fn bonded_denom(&self) -> String {
        self.params.bond_denom.clone()
    }

    fn block_time(&self) -> Timestamp {
        self.time
    }

    fn validators(&self) -> Vec<Validator> {
        self.validators.values().cloned().collect()
    }

    fn get_validator(&self, validator: &ValidatorAddress) -> Option<Validator> {
        self.validators.get(validator).cloned()
    }

    fn delegate(
        &mut self,
        delegator: &Address,
        validator: &ValidatorAddress,
        amount: Amount,
    ) -> Result<Decimal, LedgerError> {
        transact(self, |ledger| ledger.delegate_inner(delegator, validator, amount))
    }

    fn undelegate(
        &mut self,
        delegator: &Address,
        validator: &ValidatorAddress,
        amount: Amount,
    ) -> Result<Timestamp, LedgerError> {
        transact(self, |ledger| ledger.undelegate_inner(delegator, validator, amount))
    }

    fn get_delegation(
        &self,
        delegator: &Address,
        validator: &ValidatorAddress,
    ) -> Option<Delegation> {
        let shares = self.delegations.get(&(delegator.clone(), validator.clone()))?;
        let validator = self.validators.get(validator)?;
        Some(self.to_delegation(delegator, validator, shares))
    }

    fn delegator_delegations(&self, delegator: &Address) -> Vec<Delegation> {
        self.delegations
            .iter()
            .filter(|((d, _), _)| d == delegator)
            .filter_map(|((d, v), shares)| {
                self.validators.get(v).map(|validator| self.to_delegation(d, validator, shares))
            })
            .collect()
    }

    fn get_unbonding_delegation(
        &self,
        delegator: &Address,
        validator: &ValidatorAddress,
    ) -> Option<UnbondingDelegation> {
        let entries = self.unbondings.get(&(delegator.clone(), validator.clone()))?;
        Some(UnbondingDelegation {
            delegator: delegator.clone(),
            validator: validator.clone(),
            entries: entries.clone(),
        })
    }

    fn withdraw_delegation_rewards(
        &mut self,
        delegator: &Address,
        operator: &ValidatorAddress,
    ) -> Result<Vec<Coin>, LedgerError> {
        transact(self, |ledger| {
            let paid = ledger.withdraw_rewards(delegator, operator)?;

            // Reward accounting restarts from the period just opened
            let shares = ledger
                .delegations
                .get(&(delegator.clone(), operator.clone()))
                .cloned()
                .unwrap_or_default();
            let validator = ledger
                .get_validator(operator)
                .ok_or_else(|| LedgerError::ValidatorNotFound(operator.clone()))?;
            ledger.start_rewards(delegator, &validator, &shares);

            Ok(match paid {
                0 => vec![],
                paid => vec![Coin::new(paid, ledger.params.bond_denom.as_str())],
            })
        })
    }

    fn get_validator_current_rewards(
        &self,
        validator: &ValidatorAddress,
    ) -> Option<ValidatorCurrentRewards> {
        let current = self.distribution.current_rewards(validator)?;
        let rewards = match current.rewards.is_zero() {
            true => vec![],
            false => vec![DecCoin::new(current.rewards.clone(), self.params.bond_denom.as_str())],
        };
        Some(ValidatorCurrentRewards {
            rewards,
            period: current.period,
        })
    }

    fn balance(&self, address: &Address, denom: &str) -> Amount {
        self.bank.balance(address, denom)
    }

    fn transfer(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<(), LedgerError> {
        if coin.amount == 0 {
            return Ok(());
        }
        transact(self, |ledger| ledger.bank.transfer(from, to, coin))
    }
}

impl Branchable for StakingLedger {
    fn branch(&self) -> Self {
        self.clone()
    }

    fn commit(&mut self, branch: Self) {
        *self = branch;
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;
    use derivatum_common::branch::simulate;

    const DENOM: &str = "stake";

    fn commission() -> CommissionRates {
        CommissionRates {
            rate: Decimal::percent(10),
            max_rate: Decimal::percent(20),
            max_change_rate: Decimal::percent(1),
        }
    }

    fn setup() -> (StakingLedger, ValidatorAddress) {
        let mut ledger = StakingLedger::new(LedgerParams::default(), 1_000_000);
        let operator = Address::new("operator");
        let validator = ValidatorAddress::new("val1");
        ledger.fund_account(&operator, &Coin::new(1_000_000, DENOM)).unwrap();
        ledger.create_validator(&validator, &operator, 1_000_000, commission()).unwrap();
        (ledger, validator)
    }

    fn funded(ledger: &mut StakingLedger, name: &str, amount: Amount) -> Address {
        let address = Address::new(name);
        ledger.fund_account(&address, &Coin::new(amount, DENOM)).unwrap();
        address
    }

    #[test]
    fn create_validator_self_bonds() {
        let (ledger, validator) = setup();
        let val = ledger.get_validator(&validator).unwrap();
        assert_eq!(val.tokens, 1_000_000);
        assert_eq!(val.delegator_shares, Decimal::from_amount(1_000_000));
        assert_eq!(ledger.balance(&Address::new("operator"), DENOM), 0);
    }

    #[test]
    fn delegation_issues_shares_and_debits_the_bank() {
        let (mut ledger, validator) = setup();
        let bob = funded(&mut ledger, "bob", 100_000);

        let shares = ledger.delegate(&bob, &validator, 80000).unwrap();

        assert_eq!(shares, Decimal::from_amount(80000));
        assert_eq!(ledger.balance(&bob, DENOM), 20000);
        let delegation = ledger.get_delegation(&bob, &validator).unwrap();
        assert_eq!(delegation.balance, Coin::new(80000, DENOM));
        assert_eq!(ledger.delegator_delegations(&bob).len(), 1);
        assert_eq!(ledger.get_validator(&validator).unwrap().tokens, 1_080_000);
    }

    #[test]
    fn failed_delegation_leaves_the_ledger_untouched() {
        let (mut ledger, validator) = setup();
        let bob = funded(&mut ledger, "bob", 100);
        let before = ledger.clone();

        let err = ledger.delegate(&bob, &validator, 101).unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger, before);
        assert!(matches!(
            ledger.delegate(&bob, &ValidatorAddress::new("nobody"), 10),
            Err(LedgerError::ValidatorNotFound(_))
        ));
    }

    #[test]
    fn rewards_are_paid_in_proportion_to_stake() {
        let (mut ledger, validator) = setup();
        let contract = funded(&mut ledger, "contract", 200000);
        ledger.delegate(&contract, &validator, 200000).unwrap();

        ledger.allocate_tokens_to_validator(&validator, &Decimal::from_amount(240000)).unwrap();
        let current = ledger.get_validator_current_rewards(&validator).unwrap();
        assert_eq!(current.rewards, vec![DecCoin::new(Decimal::from_amount(216000), DENOM)]);

        let paid = ledger.withdraw_delegation_rewards(&contract, &validator).unwrap();

        assert_eq!(paid, vec![Coin::new(36000, DENOM)]);
        assert_eq!(ledger.balance(&contract, DENOM), 36000);
        let current = ledger.get_validator_current_rewards(&validator).unwrap();
        assert!(current.rewards.is_empty());
        assert_eq!(ledger.accumulated_commission(&validator), Decimal::from_amount(24000));

        // Nothing more to withdraw until new rewards arrive
        assert!(ledger.withdraw_delegation_rewards(&contract, &validator).unwrap().is_empty());
    }

    #[test]
    fn withdrawing_without_a_delegation_fails() {
        let (mut ledger, validator) = setup();
        let bob = Address::new("bob");
        assert_eq!(
            ledger.withdraw_delegation_rewards(&bob, &validator),
            Err(LedgerError::DelegationNotFound {
                delegator: bob.clone(),
                validator: validator.clone(),
            })
        );
    }

    #[test]
    fn undelegation_queues_an_entry_released_after_unbonding_time() {
        let (mut ledger, validator) = setup();
        let bob = funded(&mut ledger, "bob", 80000);
        ledger.delegate(&bob, &validator, 80000).unwrap();

        let completion = ledger.undelegate(&bob, &validator, 27000).unwrap();

        assert_eq!(completion, ledger.block_time() + ledger.params().unbonding_time);
        let unbonding = ledger.get_unbonding_delegation(&bob, &validator).unwrap();
        assert_eq!(unbonding.entries.len(), 1);
        assert_eq!(unbonding.entries[0].balance, 27000);
        assert_eq!(ledger.get_delegation(&bob, &validator).unwrap().balance.amount, 53000);

        assert_eq!(ledger.next_block(60).unwrap(), 0);
        assert_eq!(ledger.balance(&bob, DENOM), 0);

        let released = ledger.next_block(ledger.params().unbonding_time).unwrap();
        assert_eq!(released, 27000);
        assert_eq!(ledger.balance(&bob, DENOM), 27000);
        assert!(ledger.get_unbonding_delegation(&bob, &validator).is_none());
    }

    #[test]
    fn failed_release_keeps_the_unbonding_queue() {
        let (mut ledger, validator) = setup();
        let bob = funded(&mut ledger, "bob", 500);
        ledger.delegate(&bob, &validator, 500).unwrap();
        ledger.undelegate(&bob, &validator, 500).unwrap();
        ledger.fund_account(&bob, &Coin::new(Amount::MAX, DENOM)).unwrap();
        let before = ledger.clone();

        let result = ledger.next_block(ledger.params().unbonding_time);

        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert_eq!(ledger, before);
        assert_eq!(ledger.get_unbonding_delegation(&bob, &validator).unwrap().entries.len(), 1);
    }

    #[test]
    fn from_config_reads_ledger_params() {
        let config = Config::builder()
            .set_override("bond-denom", "ustake")
            .unwrap()
            .set_override("unbonding-time", 60)
            .unwrap()
            .build()
            .unwrap();

        let ledger = StakingLedger::from_config(&config, 1_000_000);

        assert_eq!(ledger.bonded_denom(), "ustake");
        assert_eq!(ledger.params().unbonding_time, 60);
        assert_eq!(ledger.block_time(), 1_000_000);
        assert_eq!(ledger.height(), 1);
    }

    #[test]
    fn repeated_withdrawals_keep_reward_history_bounded() {
        let (mut ledger, validator) = setup();
        let contract = funded(&mut ledger, "contract", 200000);
        ledger.delegate(&contract, &validator, 200000).unwrap();
        let baseline = ledger.distribution.historical_periods();

        for _ in 0..500 {
            ledger.allocate_tokens_to_validator(&validator, &Decimal::from_amount(1200)).unwrap();
            assert_eq!(
                ledger.withdraw_delegation_rewards(&contract, &validator).unwrap(),
                vec![Coin::new(180, DENOM)]
            );
        }

        assert_eq!(ledger.distribution.historical_periods(), baseline);
        assert_eq!(ledger.balance(&contract, DENOM), 500 * 180);
    }

    #[test]
    fn undelegating_more_than_held_fails() {
        let (mut ledger, validator) = setup();
        let bob = funded(&mut ledger, "bob", 500);
        ledger.delegate(&bob, &validator, 500).unwrap();

        assert_eq!(
            ledger.undelegate(&bob, &validator, 501),
            Err(LedgerError::InsufficientShares)
        );
    }

    #[test]
    fn unbonding_entries_are_capped() {
        let (mut ledger, validator) = setup();
        let bob = funded(&mut ledger, "bob", 100);
        ledger.delegate(&bob, &validator, 100).unwrap();

        for _ in 0..ledger.params().max_entries {
            ledger.undelegate(&bob, &validator, 1).unwrap();
        }

        assert!(matches!(
            ledger.undelegate(&bob, &validator, 1),
            Err(LedgerError::TooManyUnbondingEntries { .. })
        ));
    }

    #[test]
    fn full_undelegation_removes_the_delegation() {
        let (mut ledger, validator) = setup();
        let bob = funded(&mut ledger, "bob", 500);
        ledger.delegate(&bob, &validator, 500).unwrap();

        ledger.undelegate(&bob, &validator, 500).unwrap();

        assert!(ledger.get_delegation(&bob, &validator).is_none());
        assert!(ledger.delegator_delegations(&bob).is_empty());
    }

    #[test]
    fn simulated_withdrawal_leaves_no_trace() {
        let (mut ledger, validator) = setup();
        let contract = funded(&mut ledger, "contract", 200000);
        ledger.delegate(&contract, &validator, 200000).unwrap();
        ledger.allocate_tokens_to_validator(&validator, &Decimal::from_amount(240000)).unwrap();
        let before = ledger.clone();

        let paid = simulate(&ledger, |branch| {
            branch.withdraw_delegation_rewards(&contract, &validator)
        })
        .unwrap();

        assert_eq!(paid, vec![Coin::new(36000, DENOM)]);
        assert_eq!(ledger, before);
    }

    #[test]
    fn nested_simulations_are_isolated() {
        let (mut ledger, validator) = setup();
        let contract = funded(&mut ledger, "contract", 200000);
        ledger.delegate(&contract, &validator, 200000).unwrap();
        ledger.allocate_tokens_to_validator(&validator, &Decimal::from_amount(240000)).unwrap();
        let before = ledger.clone();

        let (outer, inner) = simulate(&ledger, |branch| {
            let outer_before = branch.clone();
            let inner = simulate(&*branch, |nested| {
                nested.withdraw_delegation_rewards(&contract, &validator)
            })?;
            assert_eq!(*branch, outer_before);

            let outer = branch.withdraw_delegation_rewards(&contract, &validator)?;
            let again = simulate(&*branch, |nested| {
                nested.withdraw_delegation_rewards(&contract, &validator)
            })?;
            assert!(again.is_empty());
            Ok::<_, LedgerError>((outer, inner))
        })
        .unwrap();

        assert_eq!(inner, vec![Coin::new(36000, DENOM)]);
        assert_eq!(outer, inner);
        assert_eq!(ledger, before);
        assert_eq!(ledger.balance(&contract, DENOM), 0);
    }

    #[test]
    fn transact_commits_only_on_success() {
        let (mut ledger, _) = setup();
        let alice = funded(&mut ledger, "alice", 100);
        let bob = Address::new("bob");

        let result: Result<(), LedgerError> = transact(&mut ledger, |l| {
            l.transfer(&alice, &bob, &Coin::new(60, DENOM))?;
            l.transfer(&alice, &bob, &Coin::new(60, DENOM))
        });
        assert!(result.is_err());
        assert_eq!(ledger.balance(&alice, DENOM), 100);

        transact(&mut ledger, |l| l.transfer(&alice, &bob, &Coin::new(60, DENOM))).unwrap();
        assert_eq!(ledger.balance(&bob, DENOM), 60);
    }
}
