//! Definition of Derivatum messages

use crate::queries::{StateQuery, StateQueryResponse};
use crate::{Address, Amount, Coin, Decimal, Timestamp, ValidatorAddress};
use serde_with::{serde_as, DisplayFromStr};

/// Parameters a derivative contract is created with
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InstantiateMsg {
    /// Token name
    pub name: String,

    /// Token ticker
    pub symbol: String,

    /// Token decimals
    pub decimals: u8,

    /// The single validator the pool delegates to
    pub validator: ValidatorAddress,

    /// Fraction of every unbond paid to the owner, in [0, 1)
    pub exit_tax: Decimal,

    /// Smallest amount of derivative tokens that may be unbonded
    #[serde_as(as = "DisplayFromStr")]
    pub min_withdrawal: Amount,
}

/// Contract execute surface
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    /// Bond the attached base asset, minting derivative tokens
    Bond {},

    /// Burn derivative tokens and start unbonding the base asset they are worth
    Unbond {
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },

    /// Pay out matured unbondings
    Claim {},

    /// Withdraw accrued rewards and bond them back into the pool
    Reinvest {},

    /// Hand ownership (and future exit tax) to another address
    ChangeOwner { owner: Address },

    /// Move derivative tokens between holders
    Transfer {
        recipient: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
}

impl ExecuteMsg {
    /// Name of the variant, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bond {} => "bond",
            Self::Unbond { .. } => "unbond",
            Self::Claim {} => "claim",
            Self::Reinvest {} => "reinvest",
            Self::ChangeOwner { .. } => "change_owner",
            Self::Transfer { .. } => "transfer",
        }
    }
}

/// Caller information attached to an execute or instantiate
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageInfo {
    /// Signer of the message
    pub sender: Address,

    /// Base asset sent along with the message
    pub funds: Vec<Coin>,
}

impl MessageInfo {
    pub fn new(sender: &Address, funds: &[Coin]) -> Self {
        Self {
            sender: sender.clone(),
            funds: funds.to_vec(),
        }
    }
}

/// What a successful execute did
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteOutcome {
    Bonded {
        #[serde_as(as = "DisplayFromStr")]
        bonded: Amount,
        #[serde_as(as = "DisplayFromStr")]
        minted: Amount,
    },
    Unbonded {
        #[serde_as(as = "DisplayFromStr")]
        burned: Amount,
        #[serde_as(as = "DisplayFromStr")]
        tax: Amount,
        #[serde_as(as = "DisplayFromStr")]
        unbonding: Amount,
        release_at: Timestamp,
    },
    Claimed {
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
    Reinvested {
        #[serde_as(as = "DisplayFromStr")]
        withdrawn: Amount,
        #[serde_as(as = "DisplayFromStr")]
        bonded: Amount,
    },
    OwnerChanged {
        owner: Address,
    },
    Transferred {
        recipient: Address,
        #[serde_as(as = "DisplayFromStr")]
        amount: Amount,
    },
}

/// An execute routed through the host
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecuteRequest {
    pub info: MessageInfo,
    pub msg: ExecuteMsg,
}

/// Result of an execute routed through the host
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExecuteResponse {
    Ok(ExecuteOutcome),
    Error(String),
}

// === Global message enum ===
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Message {
    None(()), // Just so we have a simple default

    // Execute path
    Execute(ExecuteRequest),
    ExecuteResponse(ExecuteResponse),

    // Query path
    StateQuery(StateQuery),
    StateQueryResponse(StateQueryResponse),
}

impl Default for Message {
    fn default() -> Self {
        Self::None(())
    }
}

impl From<ExecuteRequest> for Message {
    fn from(request: ExecuteRequest) -> Self {
        Message::Execute(request)
    }
}

impl From<StateQuery> for Message {
    fn from(query: StateQuery) -> Self {
        Message::StateQuery(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::derivative::DerivativeQuery;

    #[test]
    fn execute_messages_use_snake_case_tags() {
        let msg: ExecuteMsg = serde_json::from_str(r#"{"unbond":{"amount":"30000"}}"#).unwrap();
        assert_eq!(msg, ExecuteMsg::Unbond { amount: 30000 });

        let msg: ExecuteMsg = serde_json::from_str(r#"{"bond":{}}"#).unwrap();
        assert_eq!(msg, ExecuteMsg::Bond {});

        let json = serde_json::to_string(&ExecuteMsg::ChangeOwner {
            owner: Address::new("carol"),
        })
        .unwrap();
        assert_eq!(json, r#"{"change_owner":{"owner":"carol"}}"#);
    }

    #[test]
    fn instantiate_msg_reads_string_numbers() {
        let msg: InstantiateMsg = serde_json::from_str(
            r#"{"name":"Staking Derivatives","symbol":"DRV","decimals":0,
                "validator":"val1","exit_tax":"0.10","min_withdrawal":"100"}"#,
        )
        .unwrap();
        assert_eq!(msg.exit_tax, Decimal::percent(10));
        assert_eq!(msg.min_withdrawal, 100);
    }

    #[test]
    fn messages_convert_into_the_envelope() {
        let query = StateQuery::Derivative(DerivativeQuery::TokenInfo {});
        assert_eq!(Message::from(query.clone()), Message::StateQuery(query));
        assert_eq!(Message::default(), Message::None(()));
    }
}
