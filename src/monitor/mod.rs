pub mod retry;
pub mod source;
pub mod types;

use alloy::primitives::{Address, B256};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::chat::registry::ChatRegistry;
use crate::error::Error;
use crate::notify::{policy, Notifier};
use crate::payment::attributor::PaymentAttributor;

use self::retry::retry_rpc;
use self::source::TransactionSource;
use self::types::PendingTx;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Payments to this wallet go to the attributor.
    pub operator_wallet: Address,
    /// Upper bound on concurrently resolving/dispatching hashes.
    pub max_in_flight: usize,
    pub reconnect_delay: Duration,
}

/// Consumes the pending-transaction stream once and fans every transaction
/// out to per-chat buy matching and to payment attribution.
pub struct TransactionMonitor {
    source: Arc<dyn TransactionSource>,
    registry: Arc<ChatRegistry>,
    attributor: Arc<PaymentAttributor>,
    notifier: Arc<dyn Notifier>,
    settings: MonitorSettings,
}

impl TransactionMonitor {
    pub fn new(
        source: Arc<dyn TransactionSource>,
        registry: Arc<ChatRegistry>,
        attributor: Arc<PaymentAttributor>,
        notifier: Arc<dyn Notifier>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            source,
            registry,
            attributor,
            notifier,
            settings,
        }
    }

    /// Keep the subscription alive until `shutdown` fires, resubscribing
    /// whenever the upstream stream ends or cannot be established.
    pub async fn run_until_cancelled(self: Arc<Self>, shutdown: CancellationToken) {
        while !shutdown.is_cancelled() {
            match self.clone().run(shutdown.clone()).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        delay_ms = self.settings.reconnect_delay.as_millis() as u64,
                        "Monitor subscription lost, resubscribing"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.reconnect_delay) => {}
                        _ = shutdown.cancelled() => break,
                    }
                }
            }
        }

        tracing::info!("Transaction monitor stopped");
    }

    /// One subscription lifetime. Returns `Ok(())` on shutdown and
    /// `Err(SubscriptionClosed)` when the upstream stream ends.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), Error> {
        let Some(mut stream) = retry_rpc(&shutdown, || self.source.subscribe_pending()).await? else {
            return Ok(());
        };
        let slots = Arc::new(Semaphore::new(self.settings.max_in_flight.max(1)));
        let mut in_flight = JoinSet::new();

        tracing::info!(
            max_in_flight = self.settings.max_in_flight,
            operator_wallet = %self.settings.operator_wallet,
            "Monitoring pending transactions"
        );

        let result = loop {
            // Wait for a free slot before pulling the next hash.
            let permit = tokio::select! {
                permit = slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break Ok(()),
                },
                _ = shutdown.cancelled() => break Ok(()),
            };

            let hash = tokio::select! {
                next = stream.next() => match next {
                    Some(hash) => hash,
                    None => break Err(Error::SubscriptionClosed),
                },
                _ = shutdown.cancelled() => break Ok(()),
            };

            let this = self.clone();
            in_flight.spawn(async move {
                this.handle_hash(hash).await;
                drop(permit);
            });

            while in_flight.try_join_next().is_some() {}
        };

        tracing::debug!(remaining = in_flight.len(), "Draining in-flight dispatches");
        while in_flight.join_next().await.is_some() {}

        result
    }

    /// Resolve one hash and dispatch it. Failures are logged, never propagated.
    pub async fn handle_hash(&self, hash: B256) {
        match self.source.get_transaction(hash).await {
            Ok(Some(tx)) => self.dispatch(&tx).await,
            Ok(None) => {
                tracing::debug!(tx = %hash, "Pending transaction not found");
            }
            Err(e) => {
                tracing::warn!(tx = %hash, error = %e, "Failed to resolve pending transaction");
            }
        }
    }

    /// Run buy matching and payment attribution independently.
    pub async fn dispatch(&self, tx: &PendingTx) {
        tokio::join!(self.match_buys(tx), self.attribute_payment(tx));
    }

    async fn match_buys(&self, tx: &PendingTx) {
        let Some(token) = tx.to else {
            return;
        };

        let watchers = self.registry.watchers_of(token).await;
        if watchers.is_empty() {
            return;
        }

        let value = tx.value_eth();
        let matched: Vec<_> = watchers
            .into_iter()
            .filter(|(_, config)| value > config.threshold)
            .collect();
        if matched.is_empty() {
            return;
        }

        let trending = self.registry.trending_list().await;
        let deliveries = matched.iter().map(|(chat, config)| {
            let text = policy::render(config, &trending, &value, token);
            async move {
                match self.notifier.notify(*chat, &text).await {
                    Ok(()) => {
                        tracing::info!(chat = %chat, tx = %tx.hash, token = %token, "Buy alert sent");
                    }
                    Err(e) => {
                        tracing::warn!(chat = %chat, tx = %tx.hash, error = %e, "Failed to send buy alert");
                    }
                }
            }
        });
        futures::future::join_all(deliveries).await;
    }

    async fn attribute_payment(&self, tx: &PendingTx) {
        if tx.to != Some(self.settings.operator_wallet) {
            return;
        }

        match self.attributor.process(tx).await {
            Ok(outcome) => {
                tracing::info!(
                    tx = %tx.hash,
                    from = %tx.from,
                    ads_removed_for = ?outcome.ads_removed_for,
                    trending = ?outcome.trending,
                    "Operator wallet payment processed"
                );
            }
            Err(e) => {
                tracing::warn!(tx = %tx.hash, error = %e, "Payment attribution failed");
            }
        }
    }
}
