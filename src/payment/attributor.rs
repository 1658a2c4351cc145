use alloy::primitives::{Address, B256};
use bigdecimal::BigDecimal;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::address::parse_address;
use crate::amount::format_eth;
use crate::chat::registry::ChatRegistry;
use crate::chat::types::ChatId;
use crate::error::Error;
use crate::monitor::types::PendingTx;
use crate::notify::Notifier;

use super::references::ReferenceTable;

/// Length of a `0x`-prefixed address in hex.
const ADDRESS_HEX_LEN: usize = 42;

/// Prices of the paid features, in ETH.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub remove_ads_cost: BigDecimal,
    pub trending_cost: BigDecimal,
}

/// What a payment changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub ads_removed_for: Option<ChatId>,
    pub trending: Option<Address>,
}

/// Maps incoming operator-wallet payments to the chat or token they pay for.
pub struct PaymentAttributor {
    settings: PaymentSettings,
    references: Arc<ReferenceTable>,
    registry: Arc<ChatRegistry>,
    notifier: Arc<dyn Notifier>,
    processed: Mutex<HashSet<B256>>,
}

impl PaymentAttributor {
    pub fn new(
        settings: PaymentSettings,
        references: Arc<ReferenceTable>,
        registry: Arc<ChatRegistry>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            references,
            registry,
            notifier,
            processed: Mutex::new(HashSet::new()),
        }
    }

    /// Run the ads-removal and trending checks for a payment.
    ///
    /// Both checks always run. A transaction hash is only ever counted once.
    pub async fn process(&self, tx: &PendingTx) -> Result<PaymentOutcome, Error> {
        if !self.processed.lock().await.insert(tx.hash) {
            tracing::debug!(tx = %tx.hash, "Payment already processed, skipping");
            return Ok(PaymentOutcome::default());
        }

        let value = tx.value_eth();
        let data = tx.data_hex();

        let ads = self.check_ads_removal(tx, &value, &data).await;
        let trending = self.check_trending(tx, &value, &data).await;

        Ok(PaymentOutcome {
            ads_removed_for: ads?,
            trending,
        })
    }

    async fn check_ads_removal(
        &self,
        tx: &PendingTx,
        value: &BigDecimal,
        data: &str,
    ) -> Result<Option<ChatId>, Error> {
        if *value < self.settings.remove_ads_cost {
            return Ok(None);
        }

        let Some(chat) = self.references.take(data).await else {
            tracing::debug!(tx = %tx.hash, "Ads payment without a known reference, ignoring");
            return Ok(None);
        };

        self.registry.disable_ads(chat).await;
        tracing::info!(
            tx = %tx.hash,
            chat = %chat,
            value = %format_eth(value),
            "Ads removed after payment"
        );

        self.notifier
            .notify(
                chat,
                &format!(
                    "✅ Payment of {} ETH received. Ads are now removed for this chat.",
                    format_eth(value)
                ),
            )
            .await?;

        Ok(Some(chat))
    }

    async fn check_trending(
        &self,
        tx: &PendingTx,
        value: &BigDecimal,
        data: &str,
    ) -> Option<Address> {
        if *value < self.settings.trending_cost {
            return None;
        }

        let candidate = data.get(..ADDRESS_HEX_LEN)?;
        let token = parse_address(candidate)?;

        if self.registry.mark_trending(token).await {
            tracing::info!(tx = %tx.hash, token = %token, "Token marked trending");
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{eth_to_wei, RecordingNotifier};
    use alloy::primitives::Bytes;
    use std::str::FromStr;

    fn eth(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    struct Fixture {
        registry: Arc<ChatRegistry>,
        references: Arc<ReferenceTable>,
        notifier: Arc<RecordingNotifier>,
        attributor: PaymentAttributor,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ChatRegistry::new());
        let references = Arc::new(ReferenceTable::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let attributor = PaymentAttributor::new(
            PaymentSettings {
                remove_ads_cost: eth("0.5"),
                trending_cost: eth("1"),
            },
            references.clone(),
            registry.clone(),
            notifier.clone(),
        );
        Fixture {
            registry,
            references,
            notifier,
            attributor,
        }
    }

    fn payment(hash: u8, value: &str, input: Vec<u8>) -> PendingTx {
        PendingTx {
            hash: B256::repeat_byte(hash),
            from: Address::repeat_byte(0x01),
            to: Some(Address::repeat_byte(0x0f)),
            value: eth_to_wei(value),
            input: Bytes::from(input),
        }
    }

    #[tokio::test]
    async fn test_reference_payment_removes_ads() {
        let f = fixture();
        let chat = ChatId(42);
        f.registry.ensure_chat(chat).await;
        let reference = f.references.issue(chat).await;
        let input = hex::decode(reference.trim_start_matches("0x")).unwrap();

        let outcome = f.attributor.process(&payment(1, "1.0", input)).await.unwrap();

        assert_eq!(outcome.ads_removed_for, Some(chat));
        assert_eq!(outcome.trending, None);
        assert!(!f.registry.get(chat).await.unwrap().ads_enabled);
        let sent = f.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, chat);
    }

    #[tokio::test]
    async fn test_duplicate_hash_counts_once() {
        let f = fixture();
        let chat = ChatId(42);
        let reference = f.references.issue(chat).await;
        let input = hex::decode(reference.trim_start_matches("0x")).unwrap();
        let tx = payment(1, "1.0", input);

        f.attributor.process(&tx).await.unwrap();
        let again = f.attributor.process(&tx).await.unwrap();

        assert_eq!(again, PaymentOutcome::default());
        assert_eq!(f.notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_reference_is_ignored() {
        let f = fixture();
        let outcome = f
            .attributor
            .process(&payment(2, "0.75", vec![0xde, 0xad]))
            .await
            .unwrap();

        assert_eq!(outcome, PaymentOutcome::default());
        assert!(f.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_underpaid_reference_is_kept() {
        let f = fixture();
        let reference = f.references.issue(ChatId(9)).await;
        let input = hex::decode(reference.trim_start_matches("0x")).unwrap();

        let outcome = f.attributor.process(&payment(3, "0.1", input)).await.unwrap();

        assert_eq!(outcome.ads_removed_for, None);
        assert_eq!(f.references.resolve(&reference).await, Some(ChatId(9)));
    }

    #[tokio::test]
    async fn test_token_in_data_marks_trending() {
        let f = fixture();
        let token = Address::repeat_byte(0xab);

        let outcome = f
            .attributor
            .process(&payment(4, "1.0", token.to_vec()))
            .await
            .unwrap();

        assert_eq!(outcome.trending, Some(token));
        assert_eq!(f.registry.trending_list().await, vec![token]);
        assert!(f.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_trending_needs_full_price() {
        let f = fixture();
        let token = Address::repeat_byte(0xab);

        f.attributor
            .process(&payment(5, "0.99", token.to_vec()))
            .await
            .unwrap();
        assert!(f.registry.trending_list().await.is_empty());
    }

    #[tokio::test]
    async fn test_both_checks_run_for_one_payment() {
        let f = fixture();
        let chat = ChatId(-77);
        let token = Address::repeat_byte(0xcd);
        let mut data = token.to_vec();
        data.extend_from_slice(&[0x01, 0x02]);
        // reference equal to the full data string
        f.references
            .register(&format!("0x{}", hex::encode(&data)), chat)
            .await;

        let outcome = f.attributor.process(&payment(6, "2", data)).await.unwrap();

        assert_eq!(outcome.ads_removed_for, Some(chat));
        assert_eq!(outcome.trending, Some(token));
    }

    #[tokio::test]
    async fn test_notify_failure_still_marks_trending() {
        let f = fixture();
        let chat = ChatId(-78);
        f.notifier.fail_for(chat).await;
        let token = Address::repeat_byte(0xcd);
        let data = token.to_vec();
        f.references
            .register(&format!("0x{}", hex::encode(&data)), chat)
            .await;

        let result = f.attributor.process(&payment(7, "1", data)).await;

        assert!(matches!(result, Err(Error::Notify { .. })));
        assert!(!f.registry.get(chat).await.unwrap().ads_enabled);
        assert_eq!(f.registry.trending_list().await, vec![token]);
    }
}
