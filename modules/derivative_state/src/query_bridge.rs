//! Derivatum query bridge
//! Answers staking queries from the ledger and derivative queries from contract state.
//! Nothing here takes the ledger mutably: values that only a mutating ledger call can
//! produce are computed on a simulation branch that is dropped afterwards.

use crate::state::{DerivativeError, State};
use derivatum_common::{
    branch::{simulate, Branchable},
    ledger::LedgerFacade,
    queries::{
        derivative::{BalanceResponse, ClaimsResponse, DerivativeQuery, DerivativeQueryResponse},
        errors::QueryError,
        staking::{
            AllDelegationsResponse, BondedDenomResponse, DelegationInfo, DelegationResponse,
            FullDelegation, StakingQuery, StakingQueryResponse, ValidatorInfo, ValidatorResponse,
            ValidatorsResponse,
        },
        StateQuery, StateQueryResponse,
    },
    Address, ValidatorAddress,
};
use tracing::{debug, warn};

impl From<DerivativeError> for QueryError {
    fn from(error: DerivativeError) -> Self {
        match error {
            DerivativeError::UnsupportedQuery(query) => QueryError::unsupported_query(query),
            DerivativeError::InvalidValidator(validator) => {
                QueryError::not_found(format!("validator {validator}"))
            }
            DerivativeError::NotInstantiated => QueryError::not_found("derivative contract"),
            error => QueryError::query_failed(error.to_string()),
        }
    }
}

/// Read-only view over one ledger and, once instantiated, the contract state
pub struct QueryBridge<'a, L: Branchable> {
    ledger: &'a L,
    state: Option<&'a State>,
}

impl<'a, L: Branchable> QueryBridge<'a, L> {
    pub fn new(ledger: &'a L, state: Option<&'a State>) -> Self {
        Self { ledger, state }
    }

    fn state(&self) -> Result<&'a State, DerivativeError> {
        self.state.ok_or(DerivativeError::NotInstantiated)
    }

    pub fn query_staking(
        &self,
        query: &StakingQuery,
    ) -> Result<StakingQueryResponse, DerivativeError> {
        let response = match query {
            StakingQuery::BondedDenom {} => {
                StakingQueryResponse::BondedDenom(BondedDenomResponse {
                    denom: self.ledger.bonded_denom(),
                })
            }

            StakingQuery::Validators {} => StakingQueryResponse::Validators(ValidatorsResponse {
                validators: self.ledger.validators().iter().map(ValidatorInfo::from).collect(),
            }),

            StakingQuery::Validator { address } => {
                StakingQueryResponse::Validator(ValidatorResponse {
                    validator: self.ledger.get_validator(address).as_ref().map(ValidatorInfo::from),
                })
            }

            StakingQuery::AllDelegations { delegator } => {
                StakingQueryResponse::AllDelegations(AllDelegationsResponse {
                    delegations: self
                        .ledger
                        .delegator_delegations(delegator)
                        .iter()
                        .map(DelegationInfo::from)
                        .collect(),
                })
            }

            StakingQuery::Delegation {
                delegator,
                validator,
            } => StakingQueryResponse::Delegation(DelegationResponse {
                delegation: self.full_delegation(delegator, validator)?,
            }),
        };

        debug!(query = query.name(), "Answered staking query");
        Ok(response)
    }

    /// Delegation with the rewards it would receive if withdrawn now
    fn full_delegation(
        &self,
        delegator: &Address,
        validator: &ValidatorAddress,
    ) -> Result<Option<FullDelegation>, DerivativeError> {
        let Some(delegation) = self.ledger.get_delegation(delegator, validator) else {
            return Ok(None);
        };

        let accumulated_rewards = simulate(self.ledger, |branch| {
            branch.withdraw_delegation_rewards(delegator, validator)
        })?;

        Ok(Some(FullDelegation {
            delegator: delegation.delegator,
            validator: delegation.validator,
            can_redelegate: delegation.balance.clone(),
            amount: delegation.balance,
            accumulated_rewards,
        }))
    }

    pub fn query_derivative(
        &self,
        query: &DerivativeQuery,
    ) -> Result<DerivativeQueryResponse, DerivativeError> {
        let state = self.state()?;
        let response = match query {
            DerivativeQuery::Balance { address } => {
                DerivativeQueryResponse::Balance(BalanceResponse {
                    balance: state.balance(address),
                })
            }
            DerivativeQuery::Claims { address } => {
                DerivativeQueryResponse::Claims(ClaimsResponse {
                    claims: state.claims(address),
                })
            }
            DerivativeQuery::TokenInfo {} => DerivativeQueryResponse::TokenInfo(state.token_info()),
            DerivativeQuery::Investment {} => {
                DerivativeQueryResponse::Investment(state.investment_info(self.ledger))
            }
        };

        debug!(query = query.name(), "Answered derivative query");
        Ok(response)
    }

    /// Typed entry point used by the host envelope
    pub fn query(&self, query: &StateQuery) -> StateQueryResponse {
        let result = match query {
            StateQuery::Staking(query) => {
                self.query_staking(query).map(StateQueryResponse::Staking)
            }
            StateQuery::Derivative(query) => {
                self.query_derivative(query).map(StateQueryResponse::Derivative)
            }
        };
        result.unwrap_or_else(|e| StateQueryResponse::Error(e.into()))
    }

    /// Raw JSON staking query, answered with the JSON of the inner response
    pub fn query_staking_raw(&self, raw: &[u8]) -> Result<Vec<u8>, DerivativeError> {
        let query: StakingQuery = parse_query(raw)?;
        let response = self.query_staking(&query)?;
        response.to_wire().map_err(|e| DerivativeError::Serialization(e.to_string()))
    }

    /// Raw JSON derivative query, answered with the JSON of the inner response
    pub fn query_smart(&self, raw: &[u8]) -> Result<Vec<u8>, DerivativeError> {
        let query: DerivativeQuery = parse_query(raw)?;
        let response = self.query_derivative(&query)?;
        response.to_wire().map_err(|e| DerivativeError::Serialization(e.to_string()))
    }
}

fn parse_query<T: serde::de::DeserializeOwned>(raw: &[u8]) -> Result<T, DerivativeError> {
    serde_json::from_slice(raw).map_err(|e| {
        warn!("Unsupported query: {e}");
        DerivativeError::UnsupportedQuery(String::from_utf8_lossy(raw).into_owned())
    })
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;
    use derivatum_common::{
        messages::{ExecuteMsg, MessageInfo},
        Coin, Decimal,
    };
    use derivatum_staking_ledger::StakingLedger;
    use derivatum_test_utils::*;

    fn setup() -> (StakingLedger, State) {
        let mut ledger = ledger_with_validator(1_000_000);
        let mut state = State::instantiate(
            &ledger,
            addr("contract"),
            &MessageInfo::new(&addr("creator"), &[]),
            &default_instantiate_msg(),
        )
        .unwrap();
        let bob = fund(&mut ledger, "bob", 200000);
        state
            .execute(&mut ledger, &MessageInfo::new(&bob, &coins(200000)), &ExecuteMsg::Bond {})
            .unwrap();
        (ledger, state)
    }

    #[test]
    fn bonded_denom_and_validators_come_from_the_ledger() {
        let (ledger, state) = setup();
        let bridge = QueryBridge::new(&ledger, Some(&state));

        assert_eq!(
            bridge.query_staking(&StakingQuery::BondedDenom {}).unwrap(),
            StakingQueryResponse::BondedDenom(BondedDenomResponse {
                denom: BOND_DENOM.to_string()
            })
        );

        let StakingQueryResponse::Validators(response) =
            bridge.query_staking(&StakingQuery::Validators {}).unwrap()
        else {
            panic!("expected validators");
        };
        assert_eq!(response.validators.len(), 1);
        assert_eq!(response.validators[0].address, validator_address());
        assert_eq!(response.validators[0].commission, Decimal::percent(10));
    }

    #[test]
    fn unknown_validator_is_none() {
        let (ledger, state) = setup();
        let bridge = QueryBridge::new(&ledger, Some(&state));
        assert_eq!(
            bridge
                .query_staking(&StakingQuery::Validator {
                    address: ValidatorAddress::new("nobody")
                })
                .unwrap(),
            StakingQueryResponse::Validator(ValidatorResponse { validator: None })
        );
    }

    #[test]
    fn all_delegations_lists_the_pool() {
        let (ledger, state) = setup();
        let bridge = QueryBridge::new(&ledger, Some(&state));
        let StakingQueryResponse::AllDelegations(response) = bridge
            .query_staking(&StakingQuery::AllDelegations {
                delegator: addr("contract"),
            })
            .unwrap()
        else {
            panic!("expected delegations");
        };
        assert_eq!(
            response.delegations,
            vec![DelegationInfo {
                delegator: addr("contract"),
                validator: validator_address(),
                amount: Coin::new(200000, BOND_DENOM),
            }]
        );
    }

    #[test]
    fn delegation_query_reports_rewards_without_paying_them() {
        let (mut ledger, state) = setup();
        ledger
            .allocate_tokens_to_validator(&validator_address(), &Decimal::from_amount(240000))
            .unwrap();
        let before = ledger.clone();
        let bridge = QueryBridge::new(&ledger, Some(&state));

        let response = bridge
            .query_staking(&StakingQuery::Delegation {
                delegator: addr("contract"),
                validator: validator_address(),
            })
            .unwrap();

        let StakingQueryResponse::Delegation(DelegationResponse {
            delegation: Some(delegation),
        }) = response
        else {
            panic!("expected a delegation");
        };
        assert_eq!(delegation.amount, Coin::new(200000, BOND_DENOM));
        assert_eq!(delegation.can_redelegate, Coin::new(200000, BOND_DENOM));
        assert_eq!(delegation.accumulated_rewards, vec![Coin::new(36000, BOND_DENOM)]);
        assert_eq!(ledger, before);
        assert_eq!(ledger.balance(&addr("contract"), BOND_DENOM), 0);
    }

    #[test]
    fn missing_delegation_is_none() {
        let (ledger, state) = setup();
        let bridge = QueryBridge::new(&ledger, Some(&state));
        assert_eq!(
            bridge
                .query_staking(&StakingQuery::Delegation {
                    delegator: addr("bob"),
                    validator: validator_address(),
                })
                .unwrap(),
            StakingQueryResponse::Delegation(DelegationResponse { delegation: None })
        );
    }

    #[test]
    fn derivative_queries_need_an_instance() {
        let ledger = ledger_with_validator(1_000_000);
        let bridge = QueryBridge::new(&ledger, None);
        assert_eq!(
            bridge.query(&StateQuery::Derivative(DerivativeQuery::TokenInfo {})),
            StateQueryResponse::Error(QueryError::not_found("derivative contract"))
        );
    }

    #[test]
    fn smart_queries_answer_in_wire_form() {
        let (ledger, state) = setup();
        let bridge = QueryBridge::new(&ledger, Some(&state));

        let raw = bridge.query_smart(br#"{"balance":{"address":"bob"}}"#).unwrap();
        assert_eq!(String::from_utf8(raw).unwrap(), r#"{"balance":"200000"}"#);

        let raw = bridge.query_smart(br#"{"token_info":{}}"#).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["symbol"], "DRV");
        assert_eq!(json["total_supply"], "200000");

        let raw = bridge.query_smart(br#"{"investment":{}}"#).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["nominal_value"], "1.000000000000000000");
        assert_eq!(json["exit_tax"], "0.100000000000000000");
        assert_eq!(json["staked_tokens"]["amount"], "200000");
    }

    #[test]
    fn unknown_raw_queries_are_unsupported() {
        let (ledger, state) = setup();
        let bridge = QueryBridge::new(&ledger, Some(&state));

        assert!(matches!(
            bridge.query_smart(br#"{"allowance":{}}"#),
            Err(DerivativeError::UnsupportedQuery(_))
        ));
        assert!(matches!(
            bridge.query_staking_raw(b"not json"),
            Err(DerivativeError::UnsupportedQuery(_))
        ));

        let raw = bridge.query_staking_raw(br#"{"bonded_denom":{}}"#).unwrap();
        assert_eq!(String::from_utf8(raw).unwrap(), r#"{"denom":"stake"}"#);
    }
}
