//! Renders reference data into Telegram HTML documents.
//!
//! Rendering never fails: a topic whose section is missing from the dataset
//! renders [`UNAVAILABLE`] instead.

use crate::assistant::dataset::ReferenceDataset;
use crate::assistant::topic::Topic;

/// Placeholder for topics with no data.
pub const UNAVAILABLE: &str = "⚠️ Информация временно недоступна";

/// Phone value the dataset uses for "not known yet".
const PHONE_PENDING: &str = "уточняется";

/// Escape dataset text for Telegram's HTML parse mode.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    result
}

/// Non-empty trimmed value of an optional field.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Read-only view over the dataset that renders one document per topic.
pub struct ContentRepository {
    dataset: ReferenceDataset,
    bot_username: Option<String>,
}

impl ContentRepository {
    pub fn new(dataset: ReferenceDataset, bot_username: Option<String>) -> Self {
        Self { dataset, bot_username }
    }

    pub fn render(&self, topic: Topic) -> String {
        match topic {
            Topic::Emergency => self.emergency(),
            Topic::Electricity => self.electricity(),
            Topic::Utilities => self.utilities(),
            Topic::Administration => self.administration(),
            Topic::Rules => self.rules(),
            Topic::AllContacts => self.all_contacts(),
            Topic::Help => help(),
            Topic::Clinic => self.clinic(),
            Topic::BusSchedule => self.bus_schedule(),
        }
    }

    fn emergency(&self) -> String {
        let data = &self.dataset;
        if data.emergency_phones.is_empty() {
            return UNAVAILABLE.to_string();
        }

        let mut text = String::from("<b>🆘 ЭКСТРЕННЫЕ СЛУЖБЫ</b>\n\n");

        if !data.emergency.is_empty() {
            text.push_str("<b>Короткие номера (работают с мобильных):</b>\n");
            for (number, description) in &data.emergency {
                text.push_str(&format!(
                    "<code>{}</code> — {}\n",
                    html_escape(number),
                    html_escape(description)
                ));
            }
            text.push('\n');
        }

        text.push_str("<b>Подробные контакты:</b>\n");
        for service in &data.emergency_phones {
            text.push_str(&format!("\n<b>{}:</b>\n", html_escape(&service.service)));
            for phone in &service.phones {
                text.push_str(&format!("• {}\n", html_escape(phone)));
            }
        }

        text.push_str("\n<i>📢 Сохраните эти номера! В экстренной ситуации звоните сразу.</i>");
        text
    }

    fn electricity(&self) -> String {
        let companies = &self.dataset.electricity;
        if companies.is_empty() {
            return UNAVAILABLE.to_string();
        }

        let mut text = String::from("<b>⚡ ЭЛЕКТРОСНАБЖЕНИЕ</b>\n\n");
        text.push_str("<i>Контакты энергетических компаний:</i>\n\n");

        for (i, company) in companies.iter().enumerate() {
            text.push_str(&format!("<b>{}. {}</b>\n", i + 1, html_escape(&company.company)));
            if let Some(description) = present(&company.description) {
                text.push_str(&format!("   <i>{}</i>\n", html_escape(description)));
            }
            if !company.phone.trim().is_empty() {
                text.push_str(&format!("   📞 {}\n", html_escape(&company.phone)));
            }
            if let Some(kind) = present(&company.kind) {
                text.push_str(&format!("   🏷️ Тип: {}\n", html_escape(kind)));
            }
            text.push('\n');
        }

        text.push_str(
            "<i>Для отключений света сначала звоните в центр обслуживания клиентов (8-800-220-02-20)</i>",
        );
        text
    }

    fn utilities(&self) -> String {
        let data = &self.dataset;
        let garbage = data.garbage();
        let dispatcher = data.water.as_ref().and_then(|w| present(&w.dispatcher));
        let water_note = data.water.as_ref().and_then(|w| present(&w.note));
        if garbage.is_none() && dispatcher.is_none() {
            return UNAVAILABLE.to_string();
        }

        let mut text = String::from("<b>🗑️ КОММУНАЛЬНЫЕ УСЛУГИ</b>\n\n");

        if let Some(garbage) = garbage {
            text.push_str("<b>Вывоз мусора (ТКО):</b>\n");
            text.push_str(&format!("🏢 <b>{}</b>\n", html_escape(&garbage.company)));
            if let Some(service) = present(&garbage.service) {
                text.push_str(&format!("📝 {}\n", html_escape(service)));
            }
            if !garbage.phone.trim().is_empty() {
                text.push_str(&format!("📞 {}\n", html_escape(&garbage.phone)));
            }
            if let Some(hours) = present(&garbage.hours) {
                text.push_str(&format!("⏰ {}\n", html_escape(hours)));
            }
        }

        if let Some(dispatcher) = dispatcher {
            text.push_str("\n<b>💧 Водоснабжение:</b>\n");
            text.push_str(&format!("📞 Диспетчер: {}\n", html_escape(dispatcher)));
        }

        if let Some(note) = water_note {
            text.push_str(&format!("\n<i>{}</i>", html_escape(note)));
        }

        text.trim_end().to_string()
    }

    fn administration(&self) -> String {
        let Some(admin) = &self.dataset.administration else {
            return UNAVAILABLE.to_string();
        };

        let mut text = String::from("<b>🏠 АДМИНИСТРАЦИЯ ДЕРЕВНИ</b>\n\n");
        text.push_str(&format!(
            "<b>Должность:</b> {}\n",
            html_escape(present(&admin.position).unwrap_or("Староста"))
        ));
        text.push_str(&format!(
            "<b>Контактное лицо:</b> {}\n",
            html_escape(present(&admin.name).unwrap_or(PHONE_PENDING))
        ));

        if let Some(phone) = present(&admin.phone).filter(|p| *p != PHONE_PENDING) {
            text.push_str(&format!("<b>Телефон:</b> {}\n", html_escape(phone)));
        }
        if let Some(hours) = present(&admin.hours) {
            text.push_str(&format!("<b>Часы приёма:</b> {}\n", html_escape(hours)));
        }
        if let Some(email) = present(&admin.email) {
            text.push_str(&format!("<b>Email:</b> {}\n", html_escape(email)));
        }
        if let Some(note) = present(&admin.note) {
            text.push_str(&format!("\n<i>{}</i>", html_escape(note)));
        }

        text.trim_end().to_string()
    }

    fn rules(&self) -> String {
        let rules = &self.dataset.rules;
        if rules.is_empty() {
            return UNAVAILABLE.to_string();
        }
        // Rule lines are authored as HTML in the data file.
        rules.join("\n")
    }

    fn clinic(&self) -> String {
        let Some(clinic) = &self.dataset.clinic else {
            return UNAVAILABLE.to_string();
        };

        let mut text = String::from("<b>🏥 МЕДПУНКТ</b>\n\n");
        if !clinic.name.trim().is_empty() {
            text.push_str(&format!("<b>{}</b>\n", html_escape(&clinic.name)));
        }
        if let Some(address) = present(&clinic.address) {
            text.push_str(&format!("📍 {}\n", html_escape(address)));
        }
        for phone in &clinic.phones {
            text.push_str(&format!("📞 {}\n", html_escape(phone)));
        }
        if let Some(hours) = present(&clinic.hours) {
            text.push_str(&format!("⏰ {}\n", html_escape(hours)));
        }
        if let Some(note) = present(&clinic.note) {
            text.push_str(&format!("\n<i>{}</i>", html_escape(note)));
        }

        text.trim_end().to_string()
    }

    fn bus_schedule(&self) -> String {
        let routes = &self.dataset.bus_schedule;
        if routes.is_empty() {
            return UNAVAILABLE.to_string();
        }

        let mut text = String::from("<b>🚌 РАСПИСАНИЕ АВТОБУСОВ</b>\n");
        for route in routes {
            text.push_str(&format!("\n<b>{}</b>\n", html_escape(&route.route)));
            if !route.departures.is_empty() {
                let departures: Vec<String> =
                    route.departures.iter().map(|d| html_escape(d)).collect();
                text.push_str(&format!("🕒 {}\n", departures.join(", ")));
            }
            if let Some(note) = present(&route.note) {
                text.push_str(&format!("<i>{}</i>\n", html_escape(note)));
            }
        }

        text.push_str("\n<i>Расписание может меняться в праздничные дни.</i>");
        text
    }

    /// Digest of the phone numbers from every contact topic.
    fn all_contacts(&self) -> String {
        let data = &self.dataset;
        let garbage = data.garbage();
        if data.emergency_phones.is_empty()
            && data.electricity.is_empty()
            && garbage.is_none()
            && data.clinic.is_none()
        {
            return UNAVAILABLE.to_string();
        }

        let mut text = String::from("<b>📞 ПОЛНЫЙ СПИСОК КОНТАКТОВ</b>\n");

        if !data.emergency_phones.is_empty() {
            text.push_str("\n<b>🆘 Экстренные службы:</b>\n");
            for service in &data.emergency_phones {
                text.push_str(&format!("\n<b>{}</b>\n", html_escape(&service.service)));
                for phone in &service.phones {
                    text.push_str(&format!("• {}\n", html_escape(phone)));
                }
            }
        }

        if !data.electricity.is_empty() {
            text.push_str("\n<b>⚡ Электроснабжение:</b>\n");
            for company in &data.electricity {
                text.push_str(&format!("\n• <b>{}</b>\n", html_escape(&company.company)));
                if !company.phone.trim().is_empty() {
                    text.push_str(&format!("  {}\n", html_escape(&company.phone)));
                }
            }
        }

        if let Some(garbage) = garbage {
            text.push_str("\n<b>🗑️ Коммунальные услуги:</b>\n");
            text.push_str(&format!("\n• <b>{}</b>\n", html_escape(&garbage.company)));
            match present(&garbage.service) {
                Some(service) => text.push_str(&format!(
                    "  {} - {}\n",
                    html_escape(&garbage.phone),
                    html_escape(service)
                )),
                None => text.push_str(&format!("  {}\n", html_escape(&garbage.phone))),
            }
        }

        if let Some(clinic) = &data.clinic {
            text.push_str("\n<b>🏥 Медпункт:</b>\n");
            text.push_str(&format!("\n• <b>{}</b>\n", html_escape(&clinic.name)));
            for phone in &clinic.phones {
                text.push_str(&format!("  {}\n", html_escape(phone)));
            }
        }

        text.push_str("\n<i>💡 Для быстрого доступа используйте соответствующие разделы меню</i>");
        text
    }

    fn bot_handle(&self) -> String {
        match &self.bot_username {
            Some(name) => format!("@{name}"),
            None => "бота".to_string(),
        }
    }

    pub fn welcome(&self, shared: bool) -> String {
        if shared {
            format!(
                "👋 <b>Помощник деревни Вечерницы</b>\n\n\
                 Я помогу вам получить важные контакты и информацию.\n\n\
                 💡 <b>Как пользоваться:</b>\n\
                 1. Нажмите кнопку '📋 Открыть меню' ниже\n\
                 2. Выберите нужный раздел\n\
                 3. <b>Информация придет в ваши ЛИЧНЫЕ СООБЩЕНИЯ!</b>\n\n\
                 <i>Если не получается, сначала напишите боту в личку: {}</i>",
                self.bot_handle()
            )
        } else {
            "👋 <b>Добро пожаловать в помощник деревни Вечерницы!</b>\n\n\
             Я здесь, чтобы помочь с важными контактами и информацией.\n\n\
             💡 <b>Как пользоваться:</b>\n\
             1. Нажмите кнопку '📋 Открыть меню' ниже\n\
             2. Выберите нужный раздел\n\
             3. Информация придет прямо сюда\n\n\
             <i>В группе информация будет приходить в ЛИЧНЫЕ СООБЩЕНИЯ</i>"
                .to_string()
        }
    }

    pub fn menu(&self, shared: bool) -> String {
        let mut text = String::from("📋 <b>Главное меню помощника</b>\n\nВыберите нужный раздел:");
        if shared {
            text.push_str("\n\n<i>📱 Информация будет отправлена в ваши ЛИЧНЫЕ СООБЩЕНИЯ</i>");
        }
        text
    }

    /// Shown in a group when the user's private chat can't be reached.
    /// `tapped` is false for typed commands, which have no button to press.
    pub fn open_private_chat_instructions(&self, tapped: bool) -> String {
        let retry = if tapped {
            "Вернитесь и нажмите кнопку снова"
        } else {
            "Вернитесь и повторите команду"
        };
        format!(
            "⚠️ Чтобы получить информацию, сначала напишите мне в личку!\n\n\
             1. Перейдите в {}\n\
             2. Нажмите START\n\
             3. {retry}",
            self.bot_handle()
        )
    }
}

pub const MENU_CLOSED: &str = "Меню свернуто. Используйте /menu чтобы открыть снова.";
pub const MENU_CLOSED_TOAST: &str = "Меню свернуто";
pub const SENT_TO_PRIVATE: &str = "✅ Информация отправлена в ваши личные сообщения!";
pub const NOT_FOUND: &str = "❌ Команда не найдена";
pub const DELIVERY_FAILED: &str = "⚠️ Не удалось отправить ответ, попробуйте позже";
pub const USE_MENU_PROMPT: &str =
    "Используйте команду /menu для открытия меню или /help для справки.";
pub const GROUP_POINTER: &str = "👋 Напишите /menu чтобы открыть меню помощника!\n\
     <i>Вся информация будет отправлена в ваши личные сообщения</i>";

fn help() -> String {
    "<b>ℹ️ Помощь по боту:</b>\n\n\
     • <b>🆘 Экстренно</b> — все экстренные службы с номерами\n\
     • <b>⚡ Электросети</b> — электроснабжение\n\
     • <b>🗑️ Коммуналка</b> — вывоз мусора и коммунальные услуги\n\
     • <b>🏠 Администрация</b> — контакты старосты\n\
     • <b>📌 Правила</b> — правила сообщества\n\
     • <b>🏥 Медпункт</b> — фельдшерский пункт\n\
     • <b>🚌 Автобус</b> — расписание автобусов\n\
     • <b>📞 Все контакты</b> — полный список телефонов\n\n\
     <i>Для срочных вызовов используйте короткие номера:</i>\n\
     <code>101</code> — пожарные\n\
     <code>102</code> — полиция\n\
     <code>103</code> — скорая\n\
     <code>112</code> — ЕДДС (любая экстренная ситуация)"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(json: &str) -> ContentRepository {
        ContentRepository::new(ReferenceDataset::parse(json).unwrap(), Some("village_bot".into()))
    }

    fn full() -> ContentRepository {
        repo(
            r#"{
                "emergency": {"112": "ЕДДС", "101": "пожарные"},
                "emergency_phones": [{"service": "Fire", "phones": ["101", "8-800-100-00-01"]}],
                "electricity": [
                    {"company": "Россети", "description": "Сети", "phone": "8-800-220-02-20", "type": "сетевая"},
                    {"company": "Энергосбыт", "phone": "8-800-000-00-00"}
                ],
                "utilities": {"garbage": {"company": "Эко", "service": "ТКО", "phone": "8-900", "hours": "9-18"}},
                "water": {"dispatcher": "8-901", "note": "Воду отключают по вторникам"},
                "administration": {"name": "Иван", "phone": "уточняется", "email": "a@b.ru"},
                "rules": ["1. Не шуметь", "2. <b>Уважать</b> соседей"],
                "clinic": {"name": "ФАП", "phones": ["8-902"], "hours": "пн-пт"},
                "bus_schedule": [{"route": "№ 12 → город", "departures": ["06:40", "13:10"]}]
            }"#,
        )
    }

    #[test]
    fn test_every_topic_renders_non_empty_on_empty_data() {
        let repo = repo("{}");
        for topic in Topic::ALL {
            assert!(!repo.render(topic).is_empty(), "{topic} rendered empty");
        }
    }

    #[test]
    fn test_every_topic_renders_non_empty_on_full_data() {
        let repo = full();
        for topic in Topic::ALL {
            let text = repo.render(topic);
            assert!(!text.is_empty());
            assert_ne!(text, UNAVAILABLE, "{topic} should have data");
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let repo = full();
        for topic in Topic::ALL {
            assert_eq!(repo.render(topic), repo.render(topic));
        }
    }

    #[test]
    fn test_emergency_contains_service_and_number() {
        let repo = repo(r#"{"emergency_phones": [{"service": "Fire", "phones": ["101"]}]}"#);
        let text = repo.render(Topic::Emergency);
        assert!(text.contains("101"));
        assert!(text.contains("Fire"));
        assert!(!text.contains("Короткие номера"));
    }

    #[test]
    fn test_bad_section_does_not_hide_emergency_numbers() {
        let repo = repo(
            r#"{"emergency_phones":[{"service":"Fire","phones":["101"]}],"electricity":[{"company":"X","phone":null}],"rules":{"oops":1}}"#,
        );
        assert!(repo.render(Topic::Emergency).contains("101"));
        assert!(repo.render(Topic::Electricity).contains("X"));
        assert_eq!(repo.render(Topic::Rules), UNAVAILABLE);
    }

    #[test]
    fn test_short_numbers_in_key_order() {
        let text = full().render(Topic::Emergency);
        let a = text.find("<code>101</code>").unwrap();
        let b = text.find("<code>112</code>").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_rules_placeholder_on_empty_dataset() {
        assert_eq!(repo("{}").render(Topic::Rules), UNAVAILABLE);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let text = full().render(Topic::Electricity);
        assert_eq!(text.matches("🏷️ Тип").count(), 1);

        let admin = full().render(Topic::Administration);
        assert!(!admin.contains("Телефон"));
        assert!(!admin.contains("Часы приёма"));
        assert!(admin.contains("Email"));
        assert!(admin.contains("Староста"));
    }

    #[test]
    fn test_utilities_includes_water() {
        let text = full().render(Topic::Utilities);
        assert!(text.contains("Эко"));
        assert!(text.contains("Диспетчер: 8-901"));
        assert!(text.contains("вторникам"));
    }

    #[test]
    fn test_utilities_water_only() {
        let text = repo(r#"{"water": {"dispatcher": "8-901"}}"#).render(Topic::Utilities);
        assert!(!text.contains("ТКО"));
        assert!(text.contains("8-901"));
    }

    #[test]
    fn test_all_contacts_aggregates() {
        let text = full().render(Topic::AllContacts);
        for needle in ["Fire", "Россети", "Энергосбыт", "Эко", "ФАП", "8-902"] {
            assert!(text.contains(needle), "missing {needle}");
        }
        // The digest lists numbers only, not descriptions.
        assert!(!text.contains("Сети</i>"));
    }

    #[test]
    fn test_all_contacts_placeholder_without_contacts() {
        let text = repo(r#"{"rules": ["x"]}"#).render(Topic::AllContacts);
        assert_eq!(text, UNAVAILABLE);
    }

    #[test]
    fn test_help_ignores_dataset() {
        assert_eq!(repo("{}").render(Topic::Help), full().render(Topic::Help));
    }

    #[test]
    fn test_dataset_text_is_escaped() {
        let text = repo(r#"{"emergency_phones": [{"service": "A&B <x>", "phones": ["1"]}]}"#)
            .render(Topic::Emergency);
        assert!(text.contains("A&amp;B &lt;x&gt;"));
    }

    #[test]
    fn test_instructions_name_the_bot() {
        assert!(full().open_private_chat_instructions(true).contains("@village_bot"));
        let anonymous = ContentRepository::new(ReferenceDataset::default(), None);
        assert!(!anonymous.open_private_chat_instructions(true).contains('@'));
    }

    #[test]
    fn test_instructions_match_how_the_request_was_made() {
        let repo = full();
        assert!(repo.open_private_chat_instructions(true).contains("нажмите кнопку"));
        let typed = repo.open_private_chat_instructions(false);
        assert!(typed.contains("повторите команду"));
        assert!(!typed.contains("кнопку"));
    }

    #[test]
    fn test_shared_menu_mentions_private_messages() {
        let repo = full();
        assert!(repo.menu(true).contains("ЛИЧНЫЕ СООБЩЕНИЯ"));
        assert!(!repo.menu(false).contains("ЛИЧНЫЕ СООБЩЕНИЯ"));
    }
}
