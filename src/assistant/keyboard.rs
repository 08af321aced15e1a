//! Inline keyboards, as plain data. The Telegram client converts them.

use crate::assistant::topic::Topic;

pub const SHOW_MENU: &str = "menu_show";
pub const CLOSE_MENU: &str = "menu_close";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(label: &str, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            callback_data: callback_data.into(),
        }
    }

    fn topic(topic: Topic) -> Self {
        Self::new(topic.label(), topic.callback_data())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Two buttons per row, every topic except help, then help and "collapse".
    pub fn main_menu() -> Self {
        let topics: Vec<Button> = Topic::ALL
            .into_iter()
            .filter(|t| *t != Topic::Help)
            .map(Button::topic)
            .collect();

        let mut rows: Vec<Vec<Button>> = topics.chunks(2).map(|c| c.to_vec()).collect();
        rows.push(vec![
            Button::topic(Topic::Help),
            Button::new("↩️ Свернуть меню", CLOSE_MENU),
        ]);
        Self { rows }
    }

    pub fn welcome() -> Self {
        Self {
            rows: vec![vec![
                Button::new("📋 Открыть меню", SHOW_MENU),
                Button::new("ℹ️ Помощь", Topic::Help.callback_data()),
            ]],
        }
    }

    pub fn back_to_menu() -> Self {
        Self {
            rows: vec![vec![Button::new("📋 Вернуться в меню", SHOW_MENU)]],
        }
    }

    #[cfg(test)]
    pub fn callbacks(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.callback_data.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::topic::CALLBACK_PREFIX;

    #[test]
    fn test_main_menu_covers_every_topic() {
        let menu = Keyboard::main_menu();
        for topic in Topic::ALL {
            let data = topic.callback_data();
            assert!(menu.callbacks().any(|c| c == data), "{topic} missing from menu");
        }
        assert!(menu.callbacks().any(|c| c == CLOSE_MENU));
    }

    #[test]
    fn test_rows_hold_at_most_two_buttons() {
        assert!(Keyboard::main_menu().rows.iter().all(|r| r.len() <= 2));
    }

    #[test]
    fn test_all_callbacks_share_prefix() {
        for keyboard in [Keyboard::main_menu(), Keyboard::welcome(), Keyboard::back_to_menu()] {
            assert!(keyboard.callbacks().all(|c| c.starts_with(CALLBACK_PREFIX)));
        }
    }
}
