use alloy::primitives::Address;
use bigdecimal::num_bigint::Sign;
use bigdecimal::BigDecimal;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::address::parse_address;
use crate::error::Error;

use super::types::{ChatConfig, ChatId};

/// Thresholds finer than one wei can never be distinguished from a real value.
const MAX_THRESHOLD_DECIMALS: i64 = 18;
/// A U256 wei amount has at most 60 integer digits once expressed in ETH.
const MAX_THRESHOLD_INTEGER_DIGITS: i64 = 60;

#[derive(Default)]
struct RegistryState {
    chats: HashMap<ChatId, ChatConfig>,
    trending: BTreeSet<Address>,
}

/// Owns every chat's configuration and the global trending set.
///
/// All state sits behind one lock so that multi-key operations (migration)
/// are a single critical section. Callers only ever receive clones; the lock
/// is never held across I/O.
#[derive(Default)]
pub struct ChatRegistry {
    state: RwLock<RegistryState>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the chat's config, creating the default one on first use.
    pub async fn ensure_chat(&self, chat: ChatId) -> ChatConfig {
        let mut state = self.state.write().await;
        state.chats.entry(chat).or_default().clone()
    }

    pub async fn get(&self, chat: ChatId) -> Option<ChatConfig> {
        self.state.read().await.chats.get(&chat).cloned()
    }

    pub async fn set_token(&self, chat: ChatId, address: &str) -> Result<Address, Error> {
        let token = parse_address(address)
            .ok_or_else(|| Error::invalid(format!("Invalid Ethereum address: {}", address)))?;

        self.update(chat, |config| config.token_address = Some(token))
            .await;
        tracing::info!(chat = %chat, token = %token, "Token address set");
        Ok(token)
    }

    /// Store a positive threshold, normalized. Returns the stored value.
    pub async fn set_threshold(&self, chat: ChatId, amount: BigDecimal) -> Result<BigDecimal, Error> {
        let amount = checked_threshold(amount)?;

        tracing::info!(chat = %chat, threshold = %amount, "Threshold set");
        let stored = amount.clone();
        self.update(chat, |config| config.threshold = stored).await;
        Ok(amount)
    }

    /// Stored as sent; only an all-whitespace message is rejected.
    pub async fn set_message(&self, chat: ChatId, text: &str) -> Result<(), Error> {
        if text.trim().is_empty() {
            return Err(Error::invalid("Custom message must not be empty"));
        }

        let text = text.to_string();
        self.update(chat, |config| config.custom_message = text).await;
        Ok(())
    }

    /// Flip the ads flag and return its new value.
    pub async fn toggle_ads(&self, chat: ChatId) -> bool {
        let mut state = self.state.write().await;
        let config = state.chats.entry(chat).or_default();
        config.ads_enabled = !config.ads_enabled;
        config.ads_enabled
    }

    /// Turn ads off. Returns false if they were already off.
    pub async fn disable_ads(&self, chat: ChatId) -> bool {
        let mut state = self.state.write().await;
        let config = state.chats.entry(chat).or_default();
        std::mem::replace(&mut config.ads_enabled, false)
    }

    /// Returns true if the token was not trending before.
    pub async fn mark_trending(&self, token: Address) -> bool {
        self.state.write().await.trending.insert(token)
    }

    /// Trending tokens in lexical address order.
    pub async fn trending_list(&self) -> Vec<Address> {
        self.state.read().await.trending.iter().copied().collect()
    }

    /// Snapshot of every active chat watching `token`.
    pub async fn watchers_of(&self, token: Address) -> Vec<(ChatId, ChatConfig)> {
        let state = self.state.read().await;
        state
            .chats
            .iter()
            .filter(|(_, config)| config.watches(token))
            .map(|(chat, config)| (*chat, config.clone()))
            .collect()
    }

    /// Move the config stored under `old` to `new`, replacing whatever `new` held.
    ///
    /// Returns the config that was discarded at `new`, if any. A missing `old`
    /// config leaves the registry untouched.
    pub async fn migrate(&self, old: ChatId, new: ChatId) -> Option<ChatConfig> {
        let mut state = self.state.write().await;
        let config = state.chats.remove(&old)?;
        state.chats.insert(new, config)
    }

    async fn update(&self, chat: ChatId, apply: impl FnOnce(&mut ChatConfig)) {
        let mut state = self.state.write().await;
        apply(state.chats.entry(chat).or_default());
    }
}

/// Reject non-positive amounts and amounts outside the wei-representable range.
///
/// Only the digit string and exponent are inspected, so an input such as
/// `1e-2000000000` is refused without ever being expanded.
fn checked_threshold(amount: BigDecimal) -> Result<BigDecimal, Error> {
    let (digits, scale) = amount.as_bigint_and_exponent();
    if digits.sign() != Sign::Plus {
        return Err(Error::invalid("Threshold must be a number greater than zero"));
    }

    let decimal = digits.magnitude().to_str_radix(10);
    let trailing_zeros = (decimal.len() - decimal.trim_end_matches('0').len()) as i64;
    if scale - trailing_zeros > MAX_THRESHOLD_DECIMALS {
        return Err(Error::invalid(format!(
            "Threshold can have at most {} decimal places",
            MAX_THRESHOLD_DECIMALS
        )));
    }
    if decimal.len() as i64 - scale > MAX_THRESHOLD_INTEGER_DIGITS {
        return Err(Error::invalid("Threshold is too large"));
    }
    Ok(amount.normalized())
}
