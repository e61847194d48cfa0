use std::str::FromStr;

use anyhow::{Context, Result};
use config::Config;
use derivatum_common::{messages::InstantiateMsg, Address, Decimal, ValidatorAddress};

const DEFAULT_CONTRACT_ADDRESS: (&str, &str) = ("contract-address", "derivative-pool");
const DEFAULT_TOKEN_NAME: (&str, &str) = ("token-name", "Staking Derivatives");
const DEFAULT_TOKEN_SYMBOL: (&str, &str) = ("token-symbol", "DRV");
const DEFAULT_TOKEN_DECIMALS: (&str, i64) = ("token-decimals", 0);
const DEFAULT_EXIT_TAX: (&str, &str) = ("exit-tax", "0.10");
const DEFAULT_MIN_WITHDRAWAL: (&str, i64) = ("min-withdrawal", 100);

// Required, there is no sensible default validator
const VALIDATOR: &str = "validator";

#[derive(Debug, Clone)]
pub struct StateConfig {
    pub contract: Address,
    pub instantiate: InstantiateMsg,
}

impl StateConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        fn get_string(config: &Config, key: (&str, &str)) -> String {
            config.get_string(key.0).unwrap_or_else(|_| key.1.to_string())
        }

        let validator = config
            .get_string(VALIDATOR)
            .with_context(|| format!("'{VALIDATOR}' must be configured"))?;

        let exit_tax = get_string(config, DEFAULT_EXIT_TAX);
        let exit_tax = Decimal::from_str(&exit_tax)
            .with_context(|| format!("invalid {} '{exit_tax}'", DEFAULT_EXIT_TAX.0))?;

        let decimals = config.get_int(DEFAULT_TOKEN_DECIMALS.0).unwrap_or(DEFAULT_TOKEN_DECIMALS.1);
        let decimals = u8::try_from(decimals)
            .with_context(|| format!("invalid {} {decimals}", DEFAULT_TOKEN_DECIMALS.0))?;

        let min_withdrawal =
            config.get_int(DEFAULT_MIN_WITHDRAWAL.0).unwrap_or(DEFAULT_MIN_WITHDRAWAL.1);
        let min_withdrawal = u128::try_from(min_withdrawal)
            .with_context(|| format!("invalid {} {min_withdrawal}", DEFAULT_MIN_WITHDRAWAL.0))?;

        Ok(Self {
            contract: Address::new(get_string(config, DEFAULT_CONTRACT_ADDRESS)),
            instantiate: InstantiateMsg {
                name: get_string(config, DEFAULT_TOKEN_NAME),
                symbol: get_string(config, DEFAULT_TOKEN_SYMBOL),
                decimals,
                validator: ValidatorAddress::new(validator),
                exit_tax,
                min_withdrawal,
            },
        })
    }
}
