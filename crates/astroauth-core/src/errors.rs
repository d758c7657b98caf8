/// Core error type for the bridge.
///
/// Adapter crates should map their specific errors into this type so the authorizer
/// can treat datastore and transport failures consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("datastore error{}: {}", code_suffix(.code), .message)]
    Datastore {
        code: Option<String>,
        message: String,
    },

    #[error("invalid record: {0}")]
    Decode(String),

    #[error("messaging error: {0}")]
    Messaging(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn datastore(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Datastore {
            code,
            message: message.into(),
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
