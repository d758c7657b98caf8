/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Opaque login session id, minted by the web flow and carried in the deep link.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Primary key of a manager row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ManagerId(pub i64);

/// The Telegram user who opened the deep link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Requester {
    /// `@handle`, or a placeholder when the account has none.
    pub fn handle(&self) -> String {
        match self.username.as_deref() {
            Some(u) if !u.is_empty() => format!("@{u}"),
            _ => "Без никнейма".to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Inbound `/start` command.
#[derive(Clone, Debug)]
pub struct StartEvent {
    pub chat_id: ChatId,
    pub requester: Requester,
    /// Deep-link payload; `None` when absent or blank.
    pub payload: Option<SessionId>,
}
