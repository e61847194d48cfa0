//! Shared fixtures for Derivatum tests

use derivatum_common::{
    ledger::CommissionRates, messages::InstantiateMsg, Address, Amount, Coin, Decimal, Timestamp,
    ValidatorAddress,
};
use derivatum_staking_ledger::{LedgerParams, StakingLedger};

pub const BOND_DENOM: &str = "stake";
pub const GENESIS_TIME: Timestamp = 1_600_000_000;
pub const VALIDATOR: &str = "validator";
pub const OPERATOR: &str = "operator";

pub fn addr(name: &str) -> Address {
    Address::new(name)
}

pub fn validator_address() -> ValidatorAddress {
    ValidatorAddress::new(VALIDATOR)
}

pub fn coins(amount: Amount) -> Vec<Coin> {
    vec![Coin::new(amount, BOND_DENOM)]
}

/// 10% commission, capped at 20%
pub fn default_commission() -> CommissionRates {
    CommissionRates {
        rate: Decimal::percent(10),
        max_rate: Decimal::percent(20),
        max_change_rate: Decimal::percent(1),
    }
}

/// Ledger with one bonded validator whose operator has self-bonded `self_bond`
pub fn ledger_with_validator(self_bond: Amount) -> StakingLedger {
    let mut ledger = StakingLedger::new(LedgerParams::default(), GENESIS_TIME);
    let operator = addr(OPERATOR);
    ledger.fund_account(&operator, &Coin::new(self_bond, BOND_DENOM)).unwrap();
    ledger
        .create_validator(&validator_address(), &operator, self_bond, default_commission())
        .unwrap();
    ledger
}

/// Mint `amount` of the bond denom to `name`, returning its address
pub fn fund(ledger: &mut StakingLedger, name: &str, amount: Amount) -> Address {
    let address = addr(name);
    ledger.fund_account(&address, &Coin::new(amount, BOND_DENOM)).unwrap();
    address
}

/// "Staking Derivatives" / DRV, 10% exit tax, minimum withdrawal of 100
pub fn default_instantiate_msg() -> InstantiateMsg {
    InstantiateMsg {
        name: "Staking Derivatives".to_string(),
        symbol: "DRV".to_string(),
        decimals: 0,
        validator: validator_address(),
        exit_tax: Decimal::percent(10),
        min_withdrawal: 100,
    }
}

/// Move the ledger past the unbonding period
pub fn skip_unbonding(ledger: &mut StakingLedger) -> Amount {
    let seconds = ledger.params().unbonding_time + 1;
    ledger.next_block(seconds).unwrap()
}
