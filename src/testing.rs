//! In-memory chain and indexer used by the pipeline and orchestrator tests.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    time::Duration,
};

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    calls::BridgeCall,
    chain::{BridgeChain, Confirmation},
    error::{ChainError, IndexerError},
    indexer::PacketIndexer,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    BalanceOf,
    Allowance,
    Approve(U256),
    SendStarted,
    SendFinished,
}

pub struct MockChain {
    pub owner: Address,
    pub bridge: Address,
    pub balance: U256,
    pub allowance: U256,
    /// Time each write takes to confirm.
    pub confirm_after: Duration,
    pub approve_result: RefCell<Option<ChainError>>,
    /// Per-send overrides, consumed in order. Missing entries succeed.
    pub send_results: RefCell<VecDeque<Result<(), ChainError>>>,
    pub calls: RefCell<Vec<(Call, Instant)>>,
}

impl MockChain {
    pub fn new(owner: Address, balance: u64, allowance: u64) -> Self {
        Self {
            owner,
            bridge: Address::repeat_byte(0xbb),
            balance: U256::from(balance),
            allowance: U256::from(allowance),
            confirm_after: Duration::from_secs(2),
            approve_result: RefCell::new(None),
            send_results: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push((call, Instant::now()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|c| *c == wanted).count()
    }

    pub fn approvals(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Approve(_)))
            .count()
    }

    fn confirmation(&self) -> Confirmation {
        let n = self.calls.borrow().len() as u8;
        Confirmation {
            tx_hash: B256::repeat_byte(n),
            block_number: Some(u64::from(n)),
        }
    }
}

#[async_trait(?Send)]
impl BridgeChain for MockChain {
    fn owner(&self) -> Address {
        self.owner
    }

    fn bridge(&self) -> Address {
        self.bridge
    }

    async fn balance_of(&self, _owner: Address) -> Result<U256, ChainError> {
        self.record(Call::BalanceOf);
        Ok(self.balance)
    }

    async fn allowance(&self, _owner: Address, _spender: Address) -> Result<U256, ChainError> {
        self.record(Call::Allowance);
        Ok(self.allowance)
    }

    async fn approve(&self, _spender: Address, amount: U256) -> Result<Confirmation, ChainError> {
        self.record(Call::Approve(amount));
        tokio::time::sleep(self.confirm_after).await;
        match self.approve_result.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(self.confirmation()),
        }
    }

    async fn send(&self, _call: BridgeCall) -> Result<Confirmation, ChainError> {
        self.record(Call::SendStarted);
        tokio::time::sleep(self.confirm_after).await;
        self.record(Call::SendFinished);
        match self.send_results.borrow_mut().pop_front() {
            Some(Err(err)) => Err(err),
            _ => Ok(self.confirmation()),
        }
    }
}

/// Answers every lookup the same way and counts them per transaction.
#[derive(Default)]
pub struct StaticIndexer {
    pub packet_hash: Option<String>,
    pub lookups: RefCell<HashMap<String, u32>>,
}

#[async_trait(?Send)]
impl PacketIndexer for StaticIndexer {
    async fn packet_hash(&self, tx_hash: &str) -> Result<Option<String>, IndexerError> {
        *self.lookups.borrow_mut().entry(tx_hash.to_string()).or_default() += 1;
        Ok(self.packet_hash.clone())
    }
}
