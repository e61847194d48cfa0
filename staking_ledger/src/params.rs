use config::Config;

const DEFAULT_BOND_DENOM: (&str, &str) = ("bond-denom", "stake");
const DEFAULT_UNBONDING_TIME: (&str, u64) = ("unbonding-time", 21 * 24 * 60 * 60);
const DEFAULT_MAX_ENTRIES: (&str, usize) = ("max-unbonding-entries", 7);

/// Staking parameters of the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerParams {
    /// Denomination that can be bonded
    pub bond_denom: String,

    /// Seconds between undelegating and release of the tokens
    pub unbonding_time: u64,

    /// Maximum pending unbonding entries per delegator/validator pair
    pub max_entries: usize,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            bond_denom: DEFAULT_BOND_DENOM.1.to_string(),
            unbonding_time: DEFAULT_UNBONDING_TIME.1,
            max_entries: DEFAULT_MAX_ENTRIES.1,
        }
    }
}

impl From<&Config> for LedgerParams {
    fn from(config: &Config) -> Self {
        Self {
            bond_denom: config
                .get_string(DEFAULT_BOND_DENOM.0)
                .unwrap_or(DEFAULT_BOND_DENOM.1.to_string()),
            unbonding_time: config
                .get_int(DEFAULT_UNBONDING_TIME.0)
                .ok()
                .and_then(|secs| u64::try_from(secs).ok())
                .unwrap_or(DEFAULT_UNBONDING_TIME.1),
            max_entries: config
                .get_int(DEFAULT_MAX_ENTRIES.0)
                .ok()
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_ENTRIES.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gives_defaults() {
        let config = Config::builder().build().unwrap();
        assert_eq!(LedgerParams::from(&config), LedgerParams::default());
    }

    #[test]
    fn config_overrides_defaults() {
        let config = Config::builder()
            .set_override("bond-denom", "ustake")
            .unwrap()
            .set_override("unbonding-time", 60)
            .unwrap()
            .set_override("max-unbonding-entries", -3)
            .unwrap()
            .build()
            .unwrap();

        let params = LedgerParams::from(&config);
        assert_eq!(params.bond_denom, "ustake");
        assert_eq!(params.unbonding_time, 60);
        assert_eq!(params.max_entries, 7);
    }
}
