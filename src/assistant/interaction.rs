//! Inbound interactions, independent of the Telegram types.

use regex::Regex;
use std::sync::LazyLock;

use crate::assistant::keyboard::{CLOSE_MENU, SHOW_MENU};
use crate::assistant::topic::CALLBACK_PREFIX;

static COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([A-Za-z0-9_]+)(?:@([A-Za-z0-9_]+))?(?:\s|$)").expect("command regex")
});

/// Where the interaction happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatContext {
    /// One-to-one chat with the bot.
    Direct,
    /// Group chat; replies there are visible to everyone.
    Shared,
}

/// How the interaction reached us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Message,
    Callback {
        callback_id: String,
        /// The message carrying the tapped keyboard, if still accessible.
        message_id: Option<i64>,
    },
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Start,
    ShowMenu,
    CloseMenu,
    /// Raw topic key; may not name a known topic.
    Topic(String),
    Text(String),
}

impl Request {
    /// Parse message text. Returns `None` for commands addressed to another bot.
    pub fn from_text(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let Some(caps) = COMMAND.captures(text) else {
            return Some(Request::Text(text.to_string()));
        };

        if let (Some(mention), Some(ours)) = (caps.get(2), bot_username)
            && !mention.as_str().eq_ignore_ascii_case(ours)
        {
            return None;
        }

        let command = caps[1].to_lowercase();
        Some(match command.as_str() {
            "start" => Request::Start,
            "menu" => Request::ShowMenu,
            _ => Request::Topic(command),
        })
    }

    /// Parse an inline-button payload.
    pub fn from_callback(data: &str) -> Self {
        match data {
            SHOW_MENU => Request::ShowMenu,
            CLOSE_MENU => Request::CloseMenu,
            _ => Request::Topic(data.strip_prefix(CALLBACK_PREFIX).unwrap_or(data).to_string()),
        }
    }
}

/// One inbound event for the router.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub chat_id: i64,
    pub context: ChatContext,
    pub user_id: i64,
    pub user_name: String,
    pub origin: Origin,
    pub request: Request,
}

impl Interaction {
    pub fn is_shared(&self) -> bool {
        self.context == ChatContext::Shared
    }

    pub fn callback_id(&self) -> Option<&str> {
        match &self.origin {
            Origin::Callback { callback_id, .. } => Some(callback_id),
            Origin::Message => None,
        }
    }
}
