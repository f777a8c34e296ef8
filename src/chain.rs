use std::{future::Future, marker::PhantomData, sync::Arc};

use alloy::{
    contract,
    network::{Ethereum, EthereumWallet},
    primitives::{Address, B256, U256},
    providers::{PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
    transports::{
        http::{Client, Http},
        RpcError, Transport, TransportError,
    },
};
use async_trait::async_trait;

use crate::{
    bindings::{Ucs03Zkgm, IERC20},
    calls::BridgeCall,
    error::ChainError,
    pool::RpcPool,
};

/// A mined, successful transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Token and bridge calls made on behalf of one wallet.
#[async_trait(?Send)]
pub trait BridgeChain {
    /// Address of the signing wallet.
    fn owner(&self) -> Address;

    /// Address of the bridge entrypoint, the spender of the token.
    fn bridge(&self) -> Address;

    async fn balance_of(&self, owner: Address) -> Result<U256, ChainError>;

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, ChainError>;

    async fn approve(&self, spender: Address, amount: U256) -> Result<Confirmation, ChainError>;

    async fn send(&self, call: BridgeCall) -> Result<Confirmation, ChainError>;
}

/// One signing provider per pool endpoint, in pool order.
pub fn connect(
    pool: &RpcPool,
    signer: PrivateKeySigner,
) -> Vec<impl Provider<Http<Client>, Ethereum>> {
    let wallet = EthereumWallet::from(signer);
    pool.endpoints()
        .iter()
        .map(|url| {
            ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(wallet.clone())
                .on_http(url.clone())
        })
        .collect()
}

pub struct ChainClient<P, T> {
    providers: Vec<P>,
    pool: Arc<RpcPool>,
    owner: Address,
    token: Address,
    bridge: Address,
    _phantom: PhantomData<T>,
}

impl<P, T> ChainClient<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    /// `providers` must be indexed like `pool.endpoints()`.
    pub fn new(
        providers: Vec<P>,
        pool: Arc<RpcPool>,
        owner: Address,
        token: Address,
        bridge: Address,
    ) -> Self {
        debug_assert_eq!(providers.len(), pool.len());
        Self {
            providers,
            pool,
            owner,
            token,
            bridge,
            _phantom: PhantomData,
        }
    }

    /// Runs a read against the active endpoint, moving on to the next one
    /// when the endpoint cannot be reached. Each endpoint is tried once.
    async fn read<R, F, Fut>(&self, op: F) -> Result<R, ChainError>
    where
        F: Fn(usize) -> Fut,
        Fut: Future<Output = Result<R, contract::Error>>,
    {
        let mut last = String::new();
        for _ in 0..self.pool.len() {
            let idx = self.pool.active();
            match op(idx).await {
                Ok(value) => {
                    self.pool.report_success(idx);
                    return Ok(value);
                }
                Err(err) if call_unreachable(&err) => {
                    self.pool.report_failure(idx);
                    last = err.to_string();
                }
                Err(err) => return Err(ChainError::Rpc(err.to_string())),
            }
        }
        Err(ChainError::Rpc(last))
    }

    /// Writes are never re-broadcast. An unreachable endpoint is reported so
    /// the next call goes elsewhere.
    fn write_error(&self, idx: usize, unreachable: bool, reason: String) -> ChainError {
        if unreachable {
            self.pool.report_failure(idx);
            ChainError::Rpc(reason)
        } else {
            ChainError::Transaction { reason }
        }
    }

    fn submit_error(&self, idx: usize, err: contract::Error) -> ChainError {
        self.write_error(idx, call_unreachable(&err), err.to_string())
    }

    fn receipt_error(&self, idx: usize, err: PendingTransactionError) -> ChainError {
        let unreachable = matches!(
            &err,
            PendingTransactionError::TransportError(e) if is_unreachable(e)
        );
        self.write_error(idx, unreachable, err.to_string())
    }

    async fn confirm(
        &self,
        idx: usize,
        pending: PendingTransactionBuilder<T, Ethereum>,
    ) -> Result<Confirmation, ChainError> {
        let tx_hash = *pending.tx_hash();
        tracing::debug!(%tx_hash, "waiting for confirmation");

        let receipt = pending
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .map_err(|e| self.receipt_error(idx, e))?;
        self.pool.report_success(idx);

        settle(tx_hash, &receipt)
    }
}

#[async_trait(?Send)]
impl<P, T> BridgeChain for ChainClient<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    fn owner(&self) -> Address {
        self.owner
    }

    fn bridge(&self) -> Address {
        self.bridge
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, ChainError> {
        self.read(|idx| {
            let provider = &self.providers[idx];
            async move {
                let token = IERC20::new(self.token, provider);
                Ok::<_, contract::Error>(token.balanceOf(owner).call().await?._0)
            }
        })
        .await
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, ChainError> {
        self.read(|idx| {
            let provider = &self.providers[idx];
            async move {
                let token = IERC20::new(self.token, provider);
                Ok::<_, contract::Error>(token.allowance(owner, spender).call().await?._0)
            }
        })
        .await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<Confirmation, ChainError> {
        let idx = self.pool.active();
        let token = IERC20::new(self.token, &self.providers[idx]);
        let pending = token
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| self.submit_error(idx, e))?;
        self.confirm(idx, pending).await
    }

    async fn send(&self, call: BridgeCall) -> Result<Confirmation, ChainError> {
        let idx = self.pool.active();
        let bridge = Ucs03Zkgm::new(self.bridge, &self.providers[idx]);
        let pending = bridge
            .send(
                call.channel_id,
                call.timeout_height,
                call.timeout_timestamp,
                call.salt,
                call.instruction,
            )
            .send()
            .await
            .map_err(|e| self.submit_error(idx, e))?;
        self.confirm(idx, pending).await
    }
}

/// A mined receipt only counts when its status is success.
fn settle(tx_hash: B256, receipt: &TransactionReceipt) -> Result<Confirmation, ChainError> {
    if !receipt.status() {
        return Err(ChainError::Transaction {
            reason: format!("{tx_hash} reverted"),
        });
    }
    Ok(Confirmation {
        tx_hash,
        block_number: receipt.block_number,
    })
}

/// True when the node was never reached (connection refused, timeout, HTTP
/// status errors). JSON-RPC error responses are answers, not outages.
fn is_unreachable(err: &TransportError) -> bool {
    matches!(err, RpcError::Transport(_))
}

fn call_unreachable(err: &contract::Error) -> bool {
    matches!(err, contract::Error::TransportError(e) if is_unreachable(e))
}
