//! Core type definitions for Derivatum

use crate::decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;

/// Amount of a token in its smallest unit
pub type Amount = u128;

/// Ledger time in seconds since the unix epoch
pub type Timestamp = u64;

/// Account address - holders, contracts and delegators
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Validator operator address
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorAddress(String);

impl ValidatorAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ValidatorAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Integral amount of a single denomination
/// Amount goes over the wire as a decimal string
#[serde_as]
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination
    pub denom: String,

    /// Amount in smallest units
    #[serde_as(as = "DisplayFromStr")]
    pub amount: Amount,
}

impl Coin {
    pub fn new(amount: Amount, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Fractional amount of a single denomination, used for reward accounting
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Decimal,
}

impl DecCoin {
    pub fn new(amount: Decimal, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// Sum the amounts of `denom` in a set of coins
pub fn sum_denom(coins: &[Coin], denom: &str) -> Amount {
    coins.iter().filter(|coin| coin.denom == denom).map(|coin| coin.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_amount_is_a_string_on_the_wire() {
        let coin = Coin::new(36000, "stake");
        let json = serde_json::to_string(&coin).unwrap();
        assert_eq!(json, r#"{"denom":"stake","amount":"36000"}"#);

        let back: Coin = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coin);
    }

    #[test]
    fn addresses_serialize_transparently() {
        let address = Address::new("bob");
        assert_eq!(serde_json::to_string(&address).unwrap(), r#""bob""#);
        assert_eq!(address.to_string(), "bob");
    }

    #[test]
    fn sum_denom_ignores_other_denominations() {
        let coins = vec![Coin::new(5, "stake"), Coin::new(7, "denom"), Coin::new(10, "stake")];
        assert_eq!(sum_denom(&coins, "stake"), 15);
        assert_eq!(sum_denom(&coins, "other"), 0);
    }
}
