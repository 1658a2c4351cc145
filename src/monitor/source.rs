use alloy::consensus::Transaction;
use alloy::network::TransactionResponse;
use alloy::primitives::B256;
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::Error;

use super::types::PendingTx;

/// Upstream pending-transaction feed.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Subscribe to pending transaction hashes. The stream may repeat or drop hashes.
    async fn subscribe_pending(&self) -> Result<BoxStream<'static, B256>, Error>;

    /// Fetch a transaction by hash. `Ok(None)` when the node no longer knows it.
    async fn get_transaction(&self, hash: B256) -> Result<Option<PendingTx>, Error>;
}

/// `TransactionSource` backed by an alloy WebSocket provider.
pub struct RpcTransactionSource {
    provider: DynProvider,
}

impl RpcTransactionSource {
    pub async fn connect(ws_url: &str) -> Result<Self, Error> {
        let ws = WsConnect::new(ws_url);
        let provider = ProviderBuilder::new()
            .connect_ws(ws)
            .await
            .map_err(|e| Error::Rpc(format!("WebSocket connect to {} failed: {}", ws_url, e)))?;

        tracing::info!(url = %ws_url, "WebSocket provider connected");
        Ok(Self {
            provider: provider.erased(),
        })
    }
}

#[async_trait]
impl TransactionSource for RpcTransactionSource {
    async fn subscribe_pending(&self) -> Result<BoxStream<'static, B256>, Error> {
        let sub = self
            .provider
            .subscribe_pending_transactions()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))?;

        tracing::info!("Pending transaction subscription active");
        Ok(sub.into_stream().boxed())
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<PendingTx>, Error> {
        let tx = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| Error::Resolution {
                hash,
                reason: e.to_string(),
            })?;

        Ok(tx.map(|tx| PendingTx {
            hash,
            from: TransactionResponse::from(&tx),
            to: Transaction::to(&tx),
            value: Transaction::value(&tx),
            input: Transaction::input(&tx).clone(),
        }))
    }
}
