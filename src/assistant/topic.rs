//! Topics the assistant can answer about.

use std::fmt;

/// Prefix used in inline-button callback payloads (`menu_emergency`, ...).
pub const CALLBACK_PREFIX: &str = "menu_";

/// One renderable category of reference information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Emergency,
    Electricity,
    Utilities,
    Administration,
    Rules,
    AllContacts,
    Help,
    Clinic,
    BusSchedule,
}

impl Topic {
    pub const ALL: [Topic; 9] = [
        Topic::Emergency,
        Topic::Electricity,
        Topic::Utilities,
        Topic::Administration,
        Topic::Rules,
        Topic::AllContacts,
        Topic::Help,
        Topic::Clinic,
        Topic::BusSchedule,
    ];

    /// Canonical key, used for commands and callback payloads.
    pub fn key(self) -> &'static str {
        match self {
            Topic::Emergency => "emergency",
            Topic::Electricity => "electricity",
            Topic::Utilities => "garbage",
            Topic::Administration => "admin",
            Topic::Rules => "rules",
            Topic::AllContacts => "contacts",
            Topic::Help => "help",
            Topic::Clinic => "clinic",
            Topic::BusSchedule => "bus",
        }
    }

    /// Extra spellings accepted from typed commands.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Topic::Emergency => &["sos"],
            Topic::Electricity => &["power"],
            Topic::Utilities => &["utilities"],
            Topic::Administration => &["administration"],
            Topic::Rules => &[],
            Topic::AllContacts => &["all_contacts", "all"],
            Topic::Help => &[],
            Topic::Clinic => &["fap"],
            Topic::BusSchedule => &["bus_schedule", "schedule"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Topic::Emergency => "🆘 Экстренно",
            Topic::Electricity => "⚡ Электричество",
            Topic::Utilities => "🗑️ Коммуналка",
            Topic::Administration => "🏠 Администрация",
            Topic::Rules => "📌 Правила",
            Topic::AllContacts => "📞 Все контакты",
            Topic::Help => "❓ Помощь",
            Topic::Clinic => "🏥 Медпункт",
            Topic::BusSchedule => "🚌 Автобус",
        }
    }

    pub fn callback_data(self) -> String {
        format!("{CALLBACK_PREFIX}{}", self.key())
    }

    /// Look a topic up by key or alias (case-insensitive).
    pub fn from_key(key: &str) -> Option<Topic> {
        let key = key.trim().to_lowercase();
        Topic::ALL
            .into_iter()
            .find(|t| t.key() == key || t.aliases().contains(&key.as_str()))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_resolve_to_themselves() {
        for topic in Topic::ALL {
            assert_eq!(Topic::from_key(topic.key()), Some(topic));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Topic::from_key("utilities"), Some(Topic::Utilities));
        assert_eq!(Topic::from_key("BUS_SCHEDULE"), Some(Topic::BusSchedule));
        assert_eq!(Topic::from_key("all"), Some(Topic::AllContacts));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(Topic::from_key("weather"), None);
        assert_eq!(Topic::from_key(""), None);
    }

    #[test]
    fn test_callback_data() {
        assert_eq!(Topic::Utilities.callback_data(), "menu_garbage");
    }
}
