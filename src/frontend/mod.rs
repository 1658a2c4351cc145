//! Chat command front end: turns chat events into registry mutations and reply text.

pub mod telegram;

use alloy::primitives::Address;
use bigdecimal::BigDecimal;
use std::str::FromStr;
use std::sync::Arc;

use crate::amount::format_eth;
use crate::chat::migration::MigrationHandler;
use crate::chat::registry::ChatRegistry;
use crate::chat::types::{ChatId, UserId};
use crate::error::Error;
use crate::notify::policy::trending_summary;
use crate::notify::AdminCheck;
use crate::payment::attributor::PaymentSettings;
use crate::payment::references::ReferenceTable;

/// An inbound chat update, independent of the transport.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub chat: ChatId,
    pub user: Option<UserId>,
    /// Set when the chat was upgraded and now lives under a new id.
    pub migrated_to: Option<ChatId>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    SetToken(String),
    SetThreshold(String),
    SetMessage(String),
    ToggleAds,
    RemoveAds,
    Advertise,
    Trending,
    Status,
}

/// A recognized command that is missing its argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Usage(pub &'static str);

impl Command {
    /// Parse `/name args...`. Unknown commands and plain text yield `None`.
    pub fn parse(text: &str) -> Option<Result<Command, Usage>> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        // "/cmd@botname" in groups
        let name = head.split('@').next().unwrap_or(head);

        let with_arg = |build: fn(String) -> Command, usage: &'static str| {
            let first = args.split_whitespace().next().unwrap_or("");
            if first.is_empty() {
                Err(Usage(usage))
            } else {
                Ok(build(first.to_string()))
            }
        };

        let command = match name {
            "start" => Ok(Command::Start),
            "set_token" => with_arg(Command::SetToken, "Usage: /set_token <token_address>"),
            "set_threshold" => with_arg(Command::SetThreshold, "Usage: /set_threshold <amount>"),
            "set_message" => {
                if args.is_empty() {
                    Err(Usage("Usage: /set_message <text>"))
                } else {
                    Ok(Command::SetMessage(args.to_string()))
                }
            }
            "toggle_ads" => Ok(Command::ToggleAds),
            "remove_ads" => Ok(Command::RemoveAds),
            "advertise" => Ok(Command::Advertise),
            "trending" => Ok(Command::Trending),
            "status" => Ok(Command::Status),
            _ => return None,
        };
        Some(command)
    }

    fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::SetToken(_)
                | Command::SetThreshold(_)
                | Command::SetMessage(_)
                | Command::ToggleAds
        )
    }
}

/// Routes chat events: migration first, then command dispatch.
pub struct CommandRouter {
    registry: Arc<ChatRegistry>,
    references: Arc<ReferenceTable>,
    migration: MigrationHandler,
    admins: Arc<dyn AdminCheck>,
    operator_wallet: Address,
    prices: PaymentSettings,
}

impl CommandRouter {
    pub fn new(
        registry: Arc<ChatRegistry>,
        references: Arc<ReferenceTable>,
        admins: Arc<dyn AdminCheck>,
        operator_wallet: Address,
        prices: PaymentSettings,
    ) -> Self {
        let migration = MigrationHandler::new(registry.clone(), references.clone());
        Self {
            registry,
            references,
            migration,
            admins,
            operator_wallet,
            prices,
        }
    }

    /// Handle one event and return the reply to send back, if any.
    pub async fn handle(&self, event: ChatEvent) -> Option<String> {
        if let Some(new_chat) = event.migrated_to {
            self.migration.handle(event.chat, new_chat).await;
            return None;
        }

        let command = match Command::parse(event.text.as_deref()?)? {
            Ok(command) => command,
            Err(Usage(usage)) => return Some(usage.to_string()),
        };

        let reply = match self.execute(event.chat, event.user, command).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(chat = %event.chat, error = %e, "Command rejected");
                e.to_string()
            }
        };
        Some(reply)
    }

    pub async fn execute(
        &self,
        chat: ChatId,
        user: Option<UserId>,
        command: Command,
    ) -> Result<String, Error> {
        if command.requires_admin() {
            let user = user.ok_or_else(|| Error::invalid("Anonymous senders cannot change settings"))?;
            if !self.admins.is_admin(chat, user).await {
                return Err(Error::NotAdmin { chat, user });
            }
        }

        let config = self.registry.ensure_chat(chat).await;

        match command {
            Command::Start => Ok(
                "Welcome! Use /set_token, /set_threshold, and /set_message to begin.".to_string(),
            ),
            Command::SetToken(address) => {
                let token = self.registry.set_token(chat, &address).await?;
                Ok(format!("Token address set to {}", token))
            }
            Command::SetThreshold(amount) => {
                let amount = BigDecimal::from_str(&amount)
                    .map_err(|_| Error::invalid("Please enter a valid number for the threshold."))?;
                let stored = self.registry.set_threshold(chat, amount).await?;
                Ok(format!("Threshold set to {} ETH", format_eth(&stored)))
            }
            Command::SetMessage(text) => {
                self.registry.set_message(chat, &text).await?;
                Ok("Custom message set.".to_string())
            }
            Command::ToggleAds => {
                let enabled = self.registry.toggle_ads(chat).await;
                Ok(format!("Ads are now {}.", if enabled { "enabled" } else { "disabled" }))
            }
            Command::RemoveAds => {
                let reference = self.references.issue(chat).await;
                Ok(format!(
                    "To remove ads, send at least {} ETH to {} with the transaction data set to {}",
                    format_eth(&self.prices.remove_ads_cost),
                    self.operator_wallet,
                    reference
                ))
            }
            Command::Advertise => Ok(format!(
                "To make a token trending, send at least {} ETH to {} with the token address as the transaction data.",
                format_eth(&self.prices.trending_cost),
                self.operator_wallet
            )),
            Command::Trending => Ok(trending_summary(&self.registry.trending_list().await)),
            Command::Status => {
                let token = config
                    .token_address
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "not set".to_string());
                Ok(format!(
                    "Token: {}\nThreshold: {} ETH\nMessage: {}\nAds: {}\nMonitoring: {}",
                    token,
                    format_eth(&config.threshold),
                    if config.custom_message.is_empty() {
                        "none"
                    } else {
                        config.custom_message.as_str()
                    },
                    if config.ads_enabled { "on" } else { "off" },
                    if config.is_active() { "active" } else { "inactive" },
                ))
            }
        }
    }
}
