//! Derivatum contract host
//! Owns one ledger and one derivative contract. Executes need exclusive access;
//! queries only ever borrow the ledger and may run concurrently.

use std::sync::Arc;

use anyhow::Context;
use config::Config;
use derivatum_common::{
    branch::Branchable,
    messages::{ExecuteMsg, ExecuteOutcome, ExecuteResponse, InstantiateMsg, Message, MessageInfo},
    queries::{errors::QueryError, StateQuery, StateQueryResponse},
    Address,
};
use tokio::sync::RwLock;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    query_bridge::QueryBridge,
    state::{DerivativeError, State},
    state_config::StateConfig,
};

pub struct Host<L: Branchable> {
    ledger: L,
    contract: Address,
    state: Option<State>,
}

impl<L: Branchable> Host<L> {
    pub fn new(ledger: L, contract: Address) -> Self {
        Self {
            ledger,
            contract,
            state: None,
        }
    }

    /// Host with a contract instantiated by `creator` from configuration
    pub fn from_config(ledger: L, creator: &Address, config: &Config) -> anyhow::Result<Self> {
        let state_config = StateConfig::from_config(config)?;
        let mut host = Self::new(ledger, state_config.contract);
        host.instantiate(&MessageInfo::new(creator, &[]), &state_config.instantiate)
            .context("instantiating derivative contract")?;
        Ok(host)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access, for block production and genesis setup
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    pub fn instantiate(
        &mut self,
        info: &MessageInfo,
        msg: &InstantiateMsg,
    ) -> Result<(), DerivativeError> {
        if self.state.is_some() {
            return Err(DerivativeError::Unauthorized);
        }
        self.state = Some(State::instantiate(&self.ledger, self.contract.clone(), info, msg)?);
        Ok(())
    }

    pub fn execute(
        &mut self,
        info: &MessageInfo,
        msg: &ExecuteMsg,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        let state = self.state.as_mut().ok_or(DerivativeError::NotInstantiated)?;
        state.execute(&mut self.ledger, info, msg).inspect_err(|e| {
            warn!(msg = msg.name(), sender = %info.sender, "Execute failed: {e}");
        })
    }

    pub fn bridge(&self) -> QueryBridge<'_, L> {
        QueryBridge::new(&self.ledger, self.state.as_ref())
    }

    pub fn query(&self, query: &StateQuery) -> StateQueryResponse {
        self.bridge().query(query)
    }

    /// Raw JSON derivative query
    pub fn query_smart(&self, raw: &[u8]) -> Result<Vec<u8>, DerivativeError> {
        self.bridge().query_smart(raw)
    }

    /// Raw JSON staking query
    pub fn query_staking(&self, raw: &[u8]) -> Result<Vec<u8>, DerivativeError> {
        self.bridge().query_staking_raw(raw)
    }

    /// Dispatch one envelope message, answering with its response
    pub fn handle(&mut self, message: &Message) -> Message {
        match message {
            Message::Execute(request) => Message::ExecuteResponse(
                match self.execute(&request.info, &request.msg) {
                    Ok(outcome) => ExecuteResponse::Ok(outcome),
                    Err(e) => ExecuteResponse::Error(e.to_string()),
                },
            ),
            Message::StateQuery(query) => Message::StateQueryResponse(self.query(query)),
            msg => unexpected(msg),
        }
    }
}

fn unexpected(message: &Message) -> Message {
    error!("Unexpected message {message:?} for derivative host");
    Message::StateQueryResponse(StateQueryResponse::Error(QueryError::invalid_request(
        "Invalid message for derivative host",
    )))
}

/// Host shared between tasks: queries take the read lock, executes the write lock
pub struct SharedHost<L: Branchable> {
    host: Arc<RwLock<Host<L>>>,
}

impl<L: Branchable> Clone for SharedHost<L> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
        }
    }
}

impl<L: Branchable + Send + Sync> SharedHost<L> {
    pub fn new(host: Host<L>) -> Self {
        info!(contract = %host.contract(), "Starting derivative host");
        Self {
            host: Arc::new(RwLock::new(host)),
        }
    }

    pub async fn execute(
        &self,
        info: &MessageInfo,
        msg: &ExecuteMsg,
    ) -> Result<ExecuteOutcome, DerivativeError> {
        let span = info_span!("derivative_state.execute", msg = msg.name());
        async { self.host.write().await.execute(info, msg) }.instrument(span).await
    }

    pub async fn query(&self, query: &StateQuery) -> StateQueryResponse {
        let span = info_span!("derivative_state.query");
        async { self.host.read().await.query(query) }.instrument(span).await
    }

    pub async fn query_smart(&self, raw: &[u8]) -> Result<Vec<u8>, DerivativeError> {
        self.host.read().await.query_smart(raw)
    }

    pub async fn query_staking(&self, raw: &[u8]) -> Result<Vec<u8>, DerivativeError> {
        self.host.read().await.query_staking(raw)
    }

    pub async fn handle(&self, message: Arc<Message>) -> Arc<Message> {
        let response = match message.as_ref() {
            Message::StateQuery(query) => Message::StateQueryResponse(self.query(query).await),
            Message::Execute(_) => {
                let span = info_span!("derivative_state.handle");
                async { self.host.write().await.handle(&message) }.instrument(span).await
            }
            msg => unexpected(msg),
        };
        Arc::new(response)
    }

    /// Run `f` with exclusive access to the host
    pub async fn write<T>(&self, f: impl FnOnce(&mut Host<L>) -> T) -> T {
        f(&mut *self.host.write().await)
    }

    /// Run `f` with shared access to the host
    pub async fn read<T>(&self, f: impl FnOnce(&Host<L>) -> T) -> T {
        f(&*self.host.read().await)
    }
}
