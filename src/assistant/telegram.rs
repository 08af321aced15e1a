//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatKind, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode,
};
use tracing::warn;

use crate::assistant::interaction::{ChatContext, Interaction, Origin, Request};
use crate::assistant::keyboard::Keyboard;
use crate::assistant::messenger::Messenger;

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.callback_data.clone()))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, String> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);

        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), String> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .parse_mode(ParseMode::Html);

        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }

        request.await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to edit message: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), String> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .show_alert(show_alert);

        if let Some(text) = text {
            request = request.text(text);
        }

        request
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to answer callback: {e}"))
    }

    async fn ping(&self) -> Result<String, String> {
        self.bot
            .get_me()
            .await
            .map(|me| me.username().to_string())
            .map_err(|e| format!("getMe failed: {e}"))
    }
}

fn context_of(kind: &ChatKind) -> ChatContext {
    match kind {
        ChatKind::Private(_) => ChatContext::Direct,
        ChatKind::Public(_) => ChatContext::Shared,
    }
}

fn display_name(user: &teloxide::types::User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.full_name())
}

/// Build an interaction from a text message. `None` for messages the bot has
/// no business with (no sender, no text, commands for other bots).
pub fn interaction_from_message(msg: &Message, bot_username: Option<&str>) -> Option<Interaction> {
    let user = msg.from.as_ref()?;
    let text = msg.text()?;
    let request = Request::from_text(text, bot_username)?;

    Some(Interaction {
        chat_id: msg.chat.id.0,
        context: context_of(&msg.chat.kind),
        user_id: user.id.0 as i64,
        user_name: display_name(user),
        origin: Origin::Message,
        request,
    })
}

/// Build an interaction from an inline-button tap.
pub fn interaction_from_callback(query: &CallbackQuery) -> Option<Interaction> {
    let data = query.data.as_deref()?;
    let message = query.message.as_ref();

    // Inline-mode messages carry no chat; answer in the user's private chat.
    let (chat_id, context, message_id) = match message {
        Some(m) => (m.chat().id.0, context_of(&m.chat().kind), Some(m.id().0 as i64)),
        None => (query.from.id.0 as i64, ChatContext::Direct, None),
    };

    Some(Interaction {
        chat_id,
        context,
        user_id: query.from.id.0 as i64,
        user_name: display_name(&query.from),
        origin: Origin::Callback {
            callback_id: query.id.0.clone(),
            message_id,
        },
        request: Request::from_callback(data),
    })
}
