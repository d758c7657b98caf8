//! Typed shapes of the two datastore tables the bridge touches.
//!
//! Rows are decoded at the datastore boundary; the authorizer never sees raw JSON.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    domain::{ManagerId, UserId},
    errors::Error,
    Result,
};

/// Administrative status of a manager account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagerStatus {
    Active,
    Blocked,
    Banned,
    Other(String),
}

impl ManagerStatus {
    pub fn denies_access(&self) -> bool {
        matches!(self, Self::Blocked | Self::Banned)
    }
}

impl From<String> for ManagerStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => Self::Active,
            "blocked" => Self::Blocked,
            "banned" => Self::Banned,
            _ => Self::Other(s),
        }
    }
}

impl<'de> Deserialize<'de> for ManagerStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(d).map(Self::from)
    }
}

/// A row of the `managers` table. Extra columns are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Manager {
    pub id: ManagerId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub telegram_id: Option<i64>,
    #[serde(default)]
    pub status: Option<ManagerStatus>,
}

impl Manager {
    pub fn from_json(v: serde_json::Value) -> Result<Self> {
        serde_json::from_value(v).map_err(|e| Error::Decode(format!("manager row: {e}")))
    }

    pub fn is_denied(&self) -> bool {
        self.status.as_ref().is_some_and(ManagerStatus::denies_access)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// `telegram_id` may be stored as bigint or text depending on the schema.
fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrText {
        Num(i64),
        Text(String),
    }

    match Option::<NumOrText>::deserialize(d)? {
        None => Ok(None),
        Some(NumOrText::Num(n)) => Ok(Some(n)),
        Some(NumOrText::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Status column of `auth_sessions`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Success,
    Failed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Partial update applied to one `auth_sessions` row.
///
/// Unset optional fields are omitted from the patch, so existing values stay as they were.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionUpdate {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<ManagerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<UserId>,
}

impl SessionUpdate {
    pub fn new(status: SessionStatus) -> Self {
        Self {
            status,
            manager_id: None,
            telegram_id: None,
        }
    }

    pub fn with_manager(mut self, manager_id: Option<ManagerId>) -> Self {
        self.manager_id = manager_id;
        self
    }

    pub fn with_telegram_id(mut self, telegram_id: Option<UserId>) -> Self {
        self.telegram_id = telegram_id;
        self
    }
}
