use teloxide::types::{Message, User};

use astroauth_core::domain::{ChatId, Requester, SessionId, StartEvent, UserId};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`; command names are case-sensitive.
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_string();

    (cmd, rest)
}

/// Deep-link payload of a `/start` message.
///
/// Outer `None`: not a `/start` command. Inner `None`: `/start` without a payload.
pub fn parse_start_payload(text: &str) -> Option<Option<String>> {
    if !text.trim_start().starts_with('/') {
        return None;
    }
    let (cmd, rest) = parse_command(text);
    if cmd != "start" {
        return None;
    }
    Some(if rest.is_empty() { None } else { Some(rest) })
}

pub(super) fn start_event(msg: &Message) -> Option<StartEvent> {
    let payload = parse_start_payload(msg.text()?)?;
    let user = msg.from()?;
    Some(StartEvent {
        chat_id: ChatId(msg.chat.id.0),
        requester: requester(user),
        payload: payload.map(SessionId),
    })
}

fn requester(user: &User) -> Requester {
    Requester {
        id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|s| !s.is_empty()),
        last_name: user.last_name.clone(),
    }
}
