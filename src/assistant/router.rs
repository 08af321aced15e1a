//! Delivery router: decides where each reply goes.
//!
//! Direct chats get the answer in place. Group requests are answered in the
//! user's private chat so the group stays clean; the tap itself is only
//! acknowledged to the requester. If the user never opened a private chat with
//! the bot, Telegram refuses the send and the requester gets instructions
//! instead.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::assistant::content::{
    ContentRepository, DELIVERY_FAILED, GROUP_POINTER, MENU_CLOSED, MENU_CLOSED_TOAST, NOT_FOUND, SENT_TO_PRIVATE,
    USE_MENU_PROMPT,
};
use crate::assistant::interaction::{ChatContext, Interaction, Origin, Request};
use crate::assistant::keyboard::Keyboard;
use crate::assistant::messenger::Messenger;
use crate::assistant::topic::Topic;

/// Result of sending content to a user's private chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    ChannelUnavailable,
}

/// What the router did with an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Replied in the originating chat.
    Answered,
    /// Group request routed to the user's private chat.
    Private(DeliveryOutcome),
    /// Requested topic does not exist.
    NotFound,
    /// Nothing to do (group chatter not addressed to the bot).
    Ignored,
}

pub struct DeliveryRouter {
    content: Arc<ContentRepository>,
    messenger: Arc<dyn Messenger>,
    /// Lowercase substrings that make group chatter worth a reply.
    trigger_words: Vec<String>,
}

impl DeliveryRouter {
    pub fn new(
        content: Arc<ContentRepository>,
        messenger: Arc<dyn Messenger>,
        trigger_words: Vec<String>,
    ) -> Self {
        Self {
            content,
            messenger,
            trigger_words: trigger_words.into_iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    /// Handle one interaction. Errors are delivery failures in the
    /// originating chat, returned unchanged from the messenger; a tapped
    /// button is still answered with an alert before the error is returned.
    pub async fn handle(&self, interaction: &Interaction) -> Result<Outcome, String> {
        let result = self.dispatch(interaction).await;
        if result.is_err()
            && let Some(id) = interaction.callback_id()
            && let Err(e) = self.messenger.answer_callback(id, Some(DELIVERY_FAILED), true).await
        {
            warn!("Failed to answer callback: {e}");
        }
        result
    }

    async fn dispatch(&self, interaction: &Interaction) -> Result<Outcome, String> {
        match &interaction.request {
            Request::Start => self.start(interaction).await,
            Request::ShowMenu => self.show_menu(interaction).await,
            Request::CloseMenu => self.close_menu(interaction).await,
            Request::Topic(key) => match Topic::from_key(key) {
                Some(topic) => self.topic(interaction, topic).await,
                None => {
                    info!("❓ Unknown topic {:?} from {}", key, interaction.user_name);
                    self.acknowledge(interaction, NOT_FOUND, false).await;
                    Ok(Outcome::NotFound)
                }
            },
            Request::Text(text) => self.text(interaction, text).await,
        }
    }

    async fn topic(&self, interaction: &Interaction, topic: Topic) -> Result<Outcome, String> {
        let text = self.content.render(topic);
        let keyboard = Keyboard::back_to_menu();

        match interaction.context {
            ChatContext::Direct => {
                self.reply_in_place(interaction, &text, Some(&keyboard)).await?;
                self.clear_spinner(interaction).await;
                info!("📨 Sent {} to {} directly", topic, interaction.user_name);
                Ok(Outcome::Answered)
            }
            ChatContext::Shared => {
                let outcome = match self
                    .messenger
                    .send_message(interaction.user_id, &text, Some(&keyboard))
                    .await
                {
                    Ok(_) => {
                        info!("📬 Sent {} privately to {}", topic, interaction.user_name);
                        self.acknowledge(interaction, SENT_TO_PRIVATE, false).await;
                        DeliveryOutcome::Delivered
                    }
                    Err(e) => {
                        warn!(
                            "Private chat with {} ({}) unavailable: {e}",
                            interaction.user_name, interaction.user_id
                        );
                        let instructions = self
                            .content
                            .open_private_chat_instructions(interaction.callback_id().is_some());
                        self.acknowledge(interaction, &instructions, true).await;
                        DeliveryOutcome::ChannelUnavailable
                    }
                };
                Ok(Outcome::Private(outcome))
            }
        }
    }

    async fn start(&self, interaction: &Interaction) -> Result<Outcome, String> {
        let text = self.content.welcome(interaction.is_shared());
        self.messenger
            .send_message(interaction.chat_id, &text, Some(&Keyboard::welcome()))
            .await?;
        if interaction.context == ChatContext::Direct {
            info!("👋 New user in private chat: {}", interaction.user_name);
        }
        Ok(Outcome::Answered)
    }

    async fn show_menu(&self, interaction: &Interaction) -> Result<Outcome, String> {
        let text = self.content.menu(interaction.is_shared());
        self.reply_in_place(interaction, &text, Some(&Keyboard::main_menu())).await?;
        self.clear_spinner(interaction).await;
        Ok(Outcome::Answered)
    }

    async fn close_menu(&self, interaction: &Interaction) -> Result<Outcome, String> {
        self.reply_in_place(interaction, MENU_CLOSED, None).await?;
        if interaction.callback_id().is_some() {
            self.acknowledge(interaction, MENU_CLOSED_TOAST, false).await;
        }
        Ok(Outcome::Answered)
    }

    async fn text(&self, interaction: &Interaction, text: &str) -> Result<Outcome, String> {
        match interaction.context {
            ChatContext::Direct => {
                self.messenger
                    .send_message(interaction.chat_id, USE_MENU_PROMPT, Some(&Keyboard::welcome()))
                    .await?;
                Ok(Outcome::Answered)
            }
            ChatContext::Shared => {
                if !self.is_triggered(text) {
                    return Ok(Outcome::Ignored);
                }
                debug!("Group mention from {}", interaction.user_name);
                self.messenger
                    .send_message(interaction.chat_id, GROUP_POINTER, Some(&Keyboard::welcome()))
                    .await?;
                Ok(Outcome::Answered)
            }
        }
    }

    fn is_triggered(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.trigger_words.iter().any(|w| lower.contains(w.as_str()))
    }

    /// Edit the tapped message when there is one, otherwise send a new message.
    async fn reply_in_place(
        &self,
        interaction: &Interaction,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), String> {
        match interaction.origin {
            Origin::Callback { message_id: Some(message_id), .. } => {
                self.messenger
                    .edit_message(interaction.chat_id, message_id, text, keyboard)
                    .await
            }
            _ => self
                .messenger
                .send_message(interaction.chat_id, text, keyboard)
                .await
                .map(|_| ()),
        }
    }

    /// Short notice for the requester. Button taps get a toast or alert only
    /// they can see; typed commands get a reply in the chat.
    async fn acknowledge(&self, interaction: &Interaction, text: &str, alert: bool) {
        let result = match interaction.callback_id() {
            Some(id) => self.messenger.answer_callback(id, Some(text), alert).await,
            None => self
                .messenger
                .send_message(interaction.chat_id, text, None)
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            warn!("Failed to acknowledge {}: {e}", interaction.user_name);
        }
    }

    /// Stop the loading indicator on a tapped button.
    async fn clear_spinner(&self, interaction: &Interaction) {
        if let Some(id) = interaction.callback_id()
            && let Err(e) = self.messenger.answer_callback(id, None, false).await
        {
            warn!("Failed to answer callback: {e}");
        }
    }
}
