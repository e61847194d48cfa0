//! Derivatum staking ledger: bank balances

use derivatum_common::{ledger::LedgerError, Address, Amount, Coin};
use imbl::OrdMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bank {
    balances: OrdMap<(Address, String), Amount>,
}

impl Bank {
    pub fn balance(&self, address: &Address, denom: &str) -> Amount {
        self.balances.get(&(address.clone(), denom.to_string())).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, address: &Address, coin: &Coin) -> Result<(), LedgerError> {
        let balance = self
            .balance(address, &coin.denom)
            .checked_add(coin.amount)
            .ok_or_else(|| LedgerError::InvalidAmount(format!("balance of {address} overflows")))?;
        self.balances.insert((address.clone(), coin.denom.clone()), balance);
        Ok(())
    }

    pub fn debit(&mut self, address: &Address, coin: &Coin) -> Result<(), LedgerError> {
        let available = self.balance(address, &coin.denom);
        let remaining =
            available.checked_sub(coin.amount).ok_or_else(|| LedgerError::InsufficientFunds {
                address: address.clone(),
                available,
                required: coin.amount,
            })?;

        let key = (address.clone(), coin.denom.clone());
        if remaining == 0 {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, remaining);
        }
        Ok(())
    }

    /// Debits are checked before anything is credited
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        self.debit(from, coin)?;
        self.credit(to, coin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_moves_funds() {
        let (alice, bob) = (Address::new("alice"), Address::new("bob"));
        let mut bank = Bank::default();
        bank.credit(&alice, &Coin::new(100, "stake")).unwrap();

        bank.transfer(&alice, &bob, &Coin::new(40, "stake")).unwrap();

        assert_eq!(bank.balance(&alice, "stake"), 60);
        assert_eq!(bank.balance(&bob, "stake"), 40);
        assert_eq!(bank.balance(&bob, "other"), 0);
    }

    #[test]
    fn overdraft_is_refused() {
        let (alice, bob) = (Address::new("alice"), Address::new("bob"));
        let mut bank = Bank::default();
        bank.credit(&alice, &Coin::new(10, "stake")).unwrap();

        let err = bank.transfer(&alice, &bob, &Coin::new(11, "stake")).unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                address: alice.clone(),
                available: 10,
                required: 11,
            }
        );
        assert_eq!(bank.balance(&alice, "stake"), 10);
    }
}
