use async_trait::async_trait;
use std::sync::Arc;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::prelude::{Requester, ResponseResult};
use teloxide::types::{self as tg, Message, Update};
use teloxide::{dptree, Bot};
use tokio_util::sync::CancellationToken;

use crate::chat::types::{ChatId, UserId};
use crate::error::Error;
use crate::notify::{AdminCheck, Notifier};

use super::{ChatEvent, CommandRouter};

/// Bot API cap on message text, counted in UTF-16 code units.
const MESSAGE_LIMIT: usize = 4096;

/// Bot API access for outbound alerts and admin lookups.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramGateway {
    async fn notify(&self, chat: ChatId, text: &str) -> Result<(), Error> {
        for part in split_message(text, MESSAGE_LIMIT) {
            self.bot
                .send_message(tg::ChatId(chat.0), part)
                .await
                .map_err(|e| Error::Notify {
                    chat,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl AdminCheck for TelegramGateway {
    async fn is_admin(&self, chat: ChatId, user: UserId) -> bool {
        // private chat with the user
        if chat.0 == user.0 as i64 {
            return true;
        }

        match self
            .bot
            .get_chat_member(tg::ChatId(chat.0), tg::UserId(user.0))
            .await
        {
            Ok(member) => member.is_privileged(),
            Err(e) => {
                tracing::warn!(chat = %chat, user = %user, error = %e, "Admin lookup failed");
                false
            }
        }
    }
}

/// Long-poll updates and feed them to the router until `shutdown` fires.
pub async fn run_updates(bot: Bot, router: Arc<CommandRouter>, shutdown: CancellationToken) {
    let handler = Update::filter_message().endpoint(handle_message);

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .default_handler(|_| async {})
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        if let Ok(stopped) = token.shutdown() {
            stopped.await;
        }
    });

    tracing::info!("Telegram update dispatcher running");
    dispatcher.dispatch().await;
    tracing::info!("Telegram update dispatcher stopped");
}

async fn handle_message(bot: Bot, msg: Message, router: Arc<CommandRouter>) -> ResponseResult<()> {
    if let Some(reply) = router.handle(chat_event(&msg)).await {
        bot.send_message(msg.chat.id, reply).await?;
    }
    Ok(())
}

fn chat_event(msg: &Message) -> ChatEvent {
    ChatEvent {
        chat: ChatId(msg.chat.id.0),
        user: msg.from().map(|u| UserId(u.id.0)),
        migrated_to: msg.migrate_to_chat_id().map(|id| ChatId(id.0)),
        text: msg.text().map(str::to_string),
    }
}

/// Split `text` into parts of at most `limit` UTF-16 units.
///
/// Breaks fall on line boundaries first. A single over-long line (the trending
/// summary) is broken after a `", "` separator so no address is cut in half.
fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        for piece in split_line(line, limit) {
            let joined = utf16_len(&current) + 1 + utf16_len(piece);
            if !current.is_empty() && joined > limit {
                parts.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(piece);
        }
    }

    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}

fn split_line(line: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;

    while utf16_len(rest) > limit {
        let mut end = 0;
        let mut units = 0;
        for (i, c) in rest.char_indices() {
            if units + c.len_utf16() > limit {
                break;
            }
            units += c.len_utf16();
            end = i + c.len_utf8();
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let cut = rest[..end].rfind(", ").map_or(end, |i| i + 1);
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail.trim_start();
    }

    pieces.push(rest);
    pieces
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}
