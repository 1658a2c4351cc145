//! In-memory fakes for the external capabilities.

use alloy::primitives::{B256, U256};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};

use crate::chat::types::{ChatId, UserId};
use crate::error::Error;
use crate::monitor::source::TransactionSource;
use crate::monitor::types::PendingTx;
use crate::notify::{AdminCheck, Notifier};

pub fn eth_to_wei(eth: &str) -> U256 {
    let wei = BigDecimal::from_str(eth).unwrap() * BigDecimal::from(10u64.pow(18));
    let (digits, _) = wei.with_scale(0).into_bigint_and_exponent();
    U256::from_str(&digits.to_string()).unwrap()
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(ChatId, String)>>,
    failing: Mutex<HashSet<ChatId>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub async fn fail_for(&self, chat: ChatId) {
        self.failing.lock().await.insert(chat);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, chat: ChatId, text: &str) -> Result<(), Error> {
        if self.failing.lock().await.contains(&chat) {
            return Err(Error::Notify {
                chat,
                reason: "bot was kicked".to_string(),
            });
        }
        self.sent.lock().await.push((chat, text.to_string()));
        Ok(())
    }
}

/// Admin check against a fixed list of (chat, user) pairs.
#[derive(Default)]
pub struct StaticAdmins {
    admins: HashSet<(ChatId, u64)>,
}

impl StaticAdmins {
    pub fn with(pairs: &[(ChatId, UserId)]) -> Self {
        Self {
            admins: pairs.iter().map(|(c, u)| (*c, u.0)).collect(),
        }
    }
}

#[async_trait]
impl AdminCheck for StaticAdmins {
    async fn is_admin(&self, chat: ChatId, user: UserId) -> bool {
        self.admins.contains(&(chat, user.0))
    }
}

/// Counters shared between a `FakeSource` and the test driving it.
#[derive(Default)]
pub struct SourceStats {
    subscriptions: AtomicUsize,
    pulled: AtomicUsize,
    resolving: AtomicUsize,
    peak_resolving: AtomicUsize,
}

impl SourceStats {
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Hashes taken off the stream so far.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Lookups currently inside `get_transaction`.
    pub fn resolving(&self) -> usize {
        self.resolving.load(Ordering::SeqCst)
    }

    pub fn peak_resolving(&self) -> usize {
        self.peak_resolving.load(Ordering::SeqCst)
    }
}

/// Hash streams fed through channels, transactions served from a map.
/// Hashes missing from the map resolve to `Ok(None)`; hashes in `broken` error.
/// Each subscription consumes the next queued stream.
pub struct FakeSource {
    streams: Mutex<VecDeque<mpsc::UnboundedReceiver<B256>>>,
    txs: HashMap<B256, PendingTx>,
    broken: HashSet<B256>,
    gate: Option<Arc<Semaphore>>,
    stats: Arc<SourceStats>,
}

impl FakeSource {
    pub fn new(txs: Vec<PendingTx>) -> (Self, mpsc::UnboundedSender<B256>) {
        let mut source = Self {
            streams: Mutex::new(VecDeque::new()),
            txs: txs.into_iter().map(|tx| (tx.hash, tx)).collect(),
            broken: HashSet::new(),
            gate: None,
            stats: Arc::default(),
        };
        let sender = source.add_stream();
        (source, sender)
    }

    /// Queue another stream for the next subscription.
    pub fn add_stream(&mut self) -> mpsc::UnboundedSender<B256> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.streams.get_mut().push_back(receiver);
        sender
    }

    pub fn with_broken(mut self, hash: B256) -> Self {
        self.broken.insert(hash);
        self
    }

    /// Every lookup waits for one permit on `gate` before answering.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn stats(&self) -> Arc<SourceStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl TransactionSource for FakeSource {
    async fn subscribe_pending(&self) -> Result<BoxStream<'static, B256>, Error> {
        let receiver = self
            .streams
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| Error::Rpc("no stream available".to_string()))?;
        self.stats.subscriptions.fetch_add(1, Ordering::SeqCst);

        let stats = self.stats.clone();
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|hash| (hash, receiver))
        })
        .inspect(move |_| {
            stats.pulled.fetch_add(1, Ordering::SeqCst);
        });
        Ok(stream.boxed())
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<PendingTx>, Error> {
        let now = self.stats.resolving.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_resolving.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.stats.resolving.fetch_sub(1, Ordering::SeqCst);

        if self.broken.contains(&hash) {
            return Err(Error::Resolution {
                hash,
                reason: "connection reset".to_string(),
            });
        }
        Ok(self.txs.get(&hash).cloned())
    }
}
