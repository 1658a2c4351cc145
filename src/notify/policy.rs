use alloy::primitives::Address;
use bigdecimal::BigDecimal;

use crate::amount::format_eth;
use crate::chat::types::ChatConfig;

pub const WHALE_LINE: &str = "🐋 Whale detected! This is a large transaction!";
pub const AD_LINE: &str = "🔔 Advertisement: Check out our premium services!";
pub const NO_TRENDS_LINE: &str = "No current trends.";

const WHALE_MULTIPLIER: u32 = 10;

/// Whale escalation: value at least ten times the chat's threshold.
pub fn is_whale(value: &BigDecimal, threshold: &BigDecimal) -> bool {
    *value >= threshold * BigDecimal::from(WHALE_MULTIPLIER)
}

/// Render a buy notification. Line order is fixed:
/// base, custom message, whale alert, advertisement, trending summary.
pub fn render(
    config: &ChatConfig,
    trending: &[Address],
    value: &BigDecimal,
    token: Address,
) -> String {
    let mut lines = vec![format!(
        "Buy detected: {} ETH for token {}",
        format_eth(value),
        token
    )];

    if !config.custom_message.is_empty() {
        lines.push(config.custom_message.clone());
    }

    if is_whale(value, &config.threshold) {
        lines.push(WHALE_LINE.to_string());
    }

    if config.ads_enabled {
        lines.push(AD_LINE.to_string());
    }

    lines.push(trending_summary(trending));

    lines.join("\n")
}

pub fn trending_summary(trending: &[Address]) -> String {
    if trending.is_empty() {
        return NO_TRENDS_LINE.to_string();
    }

    let tokens: Vec<String> = trending.iter().map(|t| t.to_string()).collect();
    format!("🔥 Trending: {}", tokens.join(", "))
}
