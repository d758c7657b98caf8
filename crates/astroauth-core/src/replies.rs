//! User-facing reply texts.
//!
//! Constants are plain text; builders return Telegram HTML with every interpolated
//! value escaped.

use crate::{domain::Requester, formatting::escape_html};

pub const GREETING: &str =
    "👋 Привет! Этот бот — ключ от AstroPanel. Начните вход на сайте, чтобы использовать его.";

pub const DATASTORE_ERROR: &str = "⚠️ Ошибка базы данных. Попробуйте позже.";

pub const ACCESS_BLOCKED: &str = "⛔️ Ваш доступ заблокирован администратором.";

pub const SESSION_EXPIRED: &str =
    "⚠️ Не удалось обновить сессию. Возможно, она истекла. Обновите страницу в браузере.";

pub const INTERNAL_ERROR: &str = "Произошла внутренняя ошибка бота.";

pub fn welcome(manager_name: &str) -> String {
    format!(
        "✅ <b>Вход выполнен!</b>\n\nДобро пожаловать, {}.\nВы можете вернуться в браузер.",
        escape_html(manager_name)
    )
}

/// Access request the requester forwards to an administrator by hand.
pub fn access_request(requester: &Requester) -> String {
    let mut lines = vec![
        "⛔️ <b>Доступ не найден</b>".to_string(),
        String::new(),
        "Вашего аккаунта нет в системе. Отправьте данные ниже администратору:".to_string(),
        String::new(),
        "----------------------------".to_string(),
        "<b>Заявка на доступ:</b>".to_string(),
        String::new(),
    ];
    lines.push(format!(
        "👤 <b>ФИО:</b> {}",
        escape_html(&requester.full_name())
    ));
    lines.push("📱 <b>Телефон:</b> (ваш номер)".to_string());
    lines.push("📧 <b>Email:</b> (ваша почта)".to_string());
    lines.push(format!(
        "🆔 <b>Telegram ID:</b> <code>{}</code>",
        requester.id.0
    ));
    lines.push(format!("👤 <b>Ник:</b> {}", escape_html(&requester.handle())));
    lines.push("🎂 <b>Дата рождения:</b> (ДД.ММ.ГГГГ)".to_string());
    lines.push("📸 <b>Фото:</b> (прикрепите селфи)".to_string());
    lines.push("----------------------------".to_string());
    lines.join("\n")
}
