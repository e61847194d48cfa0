//! Derivatum staking ledger: reward distribution
//! Rewards are tracked per validator in periods. Closing a period folds its rewards into a
//! cumulative reward-per-token ratio; a delegation is owed its stake times the growth of that
//! ratio since the period it started in.

use derivatum_common::{ledger::Validator, Address, Decimal, ValidatorAddress};
use imbl::OrdMap;
use tracing::debug;

/// Rewards collected in the open period
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CurrentRewards {
    pub rewards: Decimal,
    pub period: u64,
}

/// Cumulative reward ratio at the close of a period.
/// Referenced by the open period that follows it and by every delegation starting from it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HistoricalRewards {
    ratio: Decimal,
    reference_count: u32,
}

/// Where a delegation's reward accounting starts
#[derive(Debug, Clone, PartialEq, Eq)]
struct StartingInfo {
    previous_period: u64,
    stake: Decimal,
    height: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Open period per validator
    current: OrdMap<ValidatorAddress, CurrentRewards>,

    /// Cumulative reward ratio at the close of each period
    historical: OrdMap<(ValidatorAddress, u64), HistoricalRewards>,

    /// Reward start point per delegation
    starting: OrdMap<(Address, ValidatorAddress), StartingInfo>,

    /// Commission owed to each validator operator
    commission: OrdMap<ValidatorAddress, Decimal>,

    /// Rewards allocated but not yet paid, per validator
    outstanding: OrdMap<ValidatorAddress, Decimal>,

    /// Truncation dust and rewards of validators with no stake
    community_pool: Decimal,
}

impl Distribution {
    /// Set up the reward records of a new validator
    pub fn initialize_validator(&mut self, validator: &ValidatorAddress) {
        self.historical.insert(
            (validator.clone(), 0),
            HistoricalRewards {
                ratio: Decimal::zero(),
                reference_count: 1,
            },
        );
        self.current.insert(
            validator.clone(),
            CurrentRewards {
                rewards: Decimal::zero(),
                period: 1,
            },
        );
        self.commission.insert(validator.clone(), Decimal::zero());
        self.outstanding.insert(validator.clone(), Decimal::zero());
    }

    /// Allocate a block reward to a validator, splitting off its commission
    pub fn allocate(&mut self, validator: &Validator, reward: &Decimal) {
        let commission = reward.mul_truncate(&validator.commission.rate);
        let shared = reward - &commission;
        let operator = &validator.operator;

        let accumulated = self.commission.get(operator).cloned().unwrap_or_default();
        self.commission.insert(operator.clone(), &accumulated + &commission);

        let mut current = self.current.get(operator).cloned().unwrap_or_default();
        current.rewards = &current.rewards + &shared;
        self.current.insert(operator.clone(), current);

        let outstanding = self.outstanding.get(operator).cloned().unwrap_or_default();
        self.outstanding.insert(operator.clone(), &outstanding + reward);

        debug!(validator = %operator, %reward, %commission, "Allocated rewards");
    }

    /// Close the open period of a validator with `tokens` bonded, returning the closed period
    pub fn increment_period(&mut self, validator: &ValidatorAddress, tokens: u128) -> u64 {
        let current = self.current.get(validator).cloned().unwrap_or(CurrentRewards {
            rewards: Decimal::zero(),
            period: 1,
        });

        let ratio = match current.rewards.quo_amount(tokens) {
            Some(ratio) => ratio,
            None => {
                // Nobody to pay
                self.community_pool = &self.community_pool + &current.rewards;
                Decimal::zero()
            }
        };

        let previous_period = current.period - 1;
        let previous = self.ratio_at(validator, previous_period);
        self.release_period(validator, previous_period);
        self.historical.insert(
            (validator.clone(), current.period),
            HistoricalRewards {
                ratio: &previous + &ratio,
                reference_count: 1,
            },
        );

        self.current.insert(
            validator.clone(),
            CurrentRewards {
                rewards: Decimal::zero(),
                period: current.period + 1,
            },
        );

        current.period
    }

    /// Start reward accounting for a delegation worth `stake` tokens
    pub fn initialize_delegation(
        &mut self,
        delegator: &Address,
        validator: &ValidatorAddress,
        stake: Decimal,
        height: u64,
    ) {
        let previous_period = self.current.get(validator).map(|c| c.period - 1).unwrap_or(0);
        self.retain_period(validator, previous_period);
        if let Some(replaced) = self.starting.get(&(delegator.clone(), validator.clone())) {
            let period = replaced.previous_period;
            self.release_period(validator, period);
        }
        self.starting.insert(
            (delegator.clone(), validator.clone()),
            StartingInfo {
                previous_period,
                stake,
                height,
            },
        );
    }

    pub fn remove_delegation(&mut self, delegator: &Address, validator: &ValidatorAddress) {
        if let Some(start) = self.starting.remove(&(delegator.clone(), validator.clone())) {
            self.release_period(validator, start.previous_period);
        }
    }

    fn ratio_at(&self, validator: &ValidatorAddress, period: u64) -> Decimal {
        self.historical
            .get(&(validator.clone(), period))
            .map(|h| h.ratio.clone())
            .unwrap_or_default()
    }

    fn retain_period(&mut self, validator: &ValidatorAddress, period: u64) {
        let key = (validator.clone(), period);
        if let Some(mut historical) = self.historical.get(&key).cloned() {
            historical.reference_count += 1;
            self.historical.insert(key, historical);
        }
    }

    /// Drop one reference to a closed period, forgetting it once unreferenced
    fn release_period(&mut self, validator: &ValidatorAddress, period: u64) {
        let key = (validator.clone(), period);
        let Some(mut historical) = self.historical.get(&key).cloned() else {
            return;
        };
        historical.reference_count = historical.reference_count.saturating_sub(1);
        if historical.reference_count == 0 {
            self.historical.remove(&key);
        } else {
            self.historical.insert(key, historical);
        }
    }

    /// Rewards owed to a delegation up to and including `ending_period`
    pub fn delegation_rewards(
        &self,
        delegator: &Address,
        validator: &ValidatorAddress,
        ending_period: u64,
    ) -> Decimal {
        let Some(start) = self.starting.get(&(delegator.clone(), validator.clone())) else {
            return Decimal::zero();
        };
        if start.previous_period > ending_period {
            return Decimal::zero();
        }

        self.ratio_at(validator, ending_period)
            .checked_sub(&self.ratio_at(validator, start.previous_period))
            .map(|growth| growth.mul_truncate(&start.stake))
            .unwrap_or_default()
    }

    /// Remove `rewards` from a validator's outstanding pool, capped at what is there
    pub fn take_outstanding(
        &mut self,
        validator: &ValidatorAddress,
        rewards: &Decimal,
    ) -> Decimal {
        let outstanding = self.outstanding.get(validator).cloned().unwrap_or_default();
        let taken = if rewards > &outstanding { outstanding.clone() } else { rewards.clone() };
        self.outstanding.insert(validator.clone(), &outstanding - &taken);
        taken
    }

    pub fn add_to_community_pool(&mut self, amount: &Decimal) {
        self.community_pool = &self.community_pool + amount;
    }

    pub fn current_rewards(&self, validator: &ValidatorAddress) -> Option<&CurrentRewards> {
        self.current.get(validator)
    }

    pub fn accumulated_commission(&self, validator: &ValidatorAddress) -> Decimal {
        self.commission.get(validator).cloned().unwrap_or_default()
    }

    pub fn outstanding_rewards(&self, validator: &ValidatorAddress) -> Decimal {
        self.outstanding.get(validator).cloned().unwrap_or_default()
    }

    pub fn community_pool(&self) -> &Decimal {
        &self.community_pool
    }

    /// Closed periods still held in history
    #[cfg(test)]
    pub fn historical_periods(&self) -> usize {
        self.historical.len()
    }
}
