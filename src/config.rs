use alloy::primitives::Address;
use bigdecimal::{BigDecimal, Zero};
use serde::Deserialize;
use std::time::Duration;

use crate::address::parse_address;
use crate::monitor::MonitorSettings;
use crate::payment::attributor::PaymentSettings;

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RpcConfig {
    pub ws_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub operator_wallet: String,
    #[serde(default = "default_remove_ads_cost")]
    pub remove_ads_cost: BigDecimal,
    #[serde(default = "default_trending_cost")]
    pub trending_cost: BigDecimal,
}

fn default_remove_ads_cost() -> BigDecimal {
    BigDecimal::new(5.into(), 1)
}

fn default_trending_cost() -> BigDecimal {
    BigDecimal::from(1)
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

fn default_max_in_flight() -> usize {
    64
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if !self.rpc.ws_url.starts_with("ws://") && !self.rpc.ws_url.starts_with("wss://") {
            return Err(eyre::eyre!(
                "rpc.ws_url must be a ws:// or wss:// URL, got '{}'",
                self.rpc.ws_url
            ));
        }
        self.operator_wallet()?;
        if self.payments.remove_ads_cost <= BigDecimal::zero() {
            return Err(eyre::eyre!("payments.remove_ads_cost must be greater than zero"));
        }
        if self.payments.trending_cost <= BigDecimal::zero() {
            return Err(eyre::eyre!("payments.trending_cost must be greater than zero"));
        }
        if self.monitor.max_in_flight == 0 {
            return Err(eyre::eyre!("monitor.max_in_flight must be at least 1"));
        }
        Ok(())
    }

    pub fn operator_wallet(&self) -> eyre::Result<Address> {
        parse_address(&self.payments.operator_wallet).ok_or_else(|| {
            eyre::eyre!(
                "Invalid operator wallet address '{}'",
                self.payments.operator_wallet
            )
        })
    }

    /// Bot token from the environment, falling back to the config file.
    pub fn bot_token(&self) -> eyre::Result<String> {
        std::env::var(BOT_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.telegram.bot_token.clone())
            .ok_or_else(|| {
                eyre::eyre!(
                    "No Telegram bot token: set {} or telegram.bot_token",
                    BOT_TOKEN_ENV
                )
            })
    }

    pub fn payment_settings(&self) -> PaymentSettings {
        PaymentSettings {
            remove_ads_cost: self.payments.remove_ads_cost.clone(),
            trending_cost: self.payments.trending_cost.clone(),
        }
    }

    pub fn monitor_settings(&self) -> eyre::Result<MonitorSettings> {
        Ok(MonitorSettings {
            operator_wallet: self.operator_wallet()?,
            max_in_flight: self.monitor.max_in_flight,
            reconnect_delay: Duration::from_millis(self.monitor.reconnect_delay_ms),
        })
    }
}
