//! The narrow messaging surface the router and supervisor depend on.

use async_trait::async_trait;

use crate::assistant::keyboard::Keyboard;

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML message, returning its message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, String>;

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), String>;

    /// Answer a button tap. The text is only visible to the user who tapped.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), String>;

    /// Confirm the connection is alive, returning the bot's username.
    async fn ping(&self) -> Result<String, String>;
}

#[cfg(test)]
pub mod mock {
    //! Recording messenger for tests.

    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Send { chat_id: i64, text: String, keyboard: Option<Keyboard> },
        Edit { chat_id: i64, message_id: i64, text: String },
        Answer { callback_id: String, text: Option<String>, show_alert: bool },
    }

    #[derive(Default)]
    pub struct MockMessenger {
        pub calls: Mutex<Vec<Call>>,
        /// Chats that refuse messages (user never started the bot).
        pub unreachable: Mutex<HashSet<i64>>,
        pub offline: Mutex<bool>,
    }

    impl MockMessenger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn refuse(&self, chat_id: i64) {
            self.unreachable.lock().unwrap().insert(chat_id);
        }

        pub fn set_offline(&self, offline: bool) {
            *self.offline.lock().unwrap() = offline;
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        /// Messages sent or edited, i.e. content that reached a chat.
        pub fn deliveries(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|c| !matches!(c, Call::Answer { .. }))
                .collect()
        }

        pub fn answers(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|c| matches!(c, Call::Answer { .. }))
                .collect()
        }

        pub fn sent_to(&self, chat_id: i64) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Send { chat_id: id, text, .. } if id == chat_id => Some(text),
                    _ => None,
                })
                .collect()
        }

        fn check(&self, chat_id: i64) -> Result<(), String> {
            if *self.offline.lock().unwrap() {
                return Err("Failed to send: network down".to_string());
            }
            if self.unreachable.lock().unwrap().contains(&chat_id) {
                return Err("Failed to send: Forbidden: bot can't initiate conversation with a user".to_string());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Messenger for MockMessenger {
        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            keyboard: Option<&Keyboard>,
        ) -> Result<i64, String> {
            self.check(chat_id)?;
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::Send {
                chat_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            });
            Ok(calls.len() as i64)
        }

        async fn edit_message(
            &self,
            chat_id: i64,
            message_id: i64,
            text: &str,
            _keyboard: Option<&Keyboard>,
        ) -> Result<(), String> {
            self.check(chat_id)?;
            self.calls.lock().unwrap().push(Call::Edit {
                chat_id,
                message_id,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn answer_callback(
            &self,
            callback_id: &str,
            text: Option<&str>,
            show_alert: bool,
        ) -> Result<(), String> {
            self.calls.lock().unwrap().push(Call::Answer {
                callback_id: callback_id.to_string(),
                text: text.map(str::to_string),
                show_alert,
            });
            Ok(())
        }

        async fn ping(&self) -> Result<String, String> {
            if *self.offline.lock().unwrap() {
                return Err("network down".to_string());
            }
            Ok("village_bot".to_string())
        }
    }
}
