use alloy::primitives::Address;
use bigdecimal::{BigDecimal, Zero};
use std::fmt;

/// Upstream chat identifier (negative for groups on Telegram).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-chat notification settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub token_address: Option<Address>,
    /// Minimum buy value in ETH. Zero means monitoring is inactive.
    pub threshold: BigDecimal,
    pub custom_message: String,
    pub ads_enabled: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            token_address: None,
            threshold: BigDecimal::zero(),
            custom_message: String::new(),
            ads_enabled: true,
        }
    }
}

impl ChatConfig {
    pub fn is_active(&self) -> bool {
        self.token_address.is_some() && self.threshold > BigDecimal::zero()
    }

    /// True when this chat watches `token` and monitoring is active.
    pub fn watches(&self, token: Address) -> bool {
        self.is_active() && self.token_address == Some(token)
    }
}
