use std::{env, fmt, time::Duration};

use crate::{errors::Error, Result};

const REQUIRED: [&str; 3] = ["BOT_TOKEN", "SUPABASE_URL", "SUPABASE_KEY"];

/// Typed process configuration.
#[derive(Clone)]
pub struct Config {
    // Credentials / endpoints
    pub bot_token: String,
    pub supabase_url: String,
    pub supabase_key: String,

    // Datastore layout
    pub managers_table: String,
    pub sessions_table: String,

    // HTTP client
    pub datastore_timeout: Duration,
}

impl Config {
    /// Load from the process environment, reading `.env` first if one exists.
    pub fn load() -> Result<Self> {
        // Existing environment variables win over `.env` entries.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let missing = REQUIRED
            .iter()
            .filter(|k| get(**k).is_none())
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let bot_token = get("BOT_TOKEN").unwrap_or_default();
        let supabase_url = get("SUPABASE_URL")
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/')
            .to_string();
        let supabase_key = get("SUPABASE_KEY").unwrap_or_default();

        let managers_table = get("MANAGERS_TABLE").unwrap_or_else(|| "managers".to_string());
        let sessions_table =
            get("SESSIONS_TABLE").unwrap_or_else(|| "auth_sessions".to_string());

        let datastore_timeout = match get("DATASTORE_TIMEOUT_MS") {
            None => Duration::from_millis(10_000),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| {
                    Error::Config(format!("DATASTORE_TIMEOUT_MS must be an integer, got {raw:?}"))
                })?,
        };

        Ok(Self {
            bot_token,
            supabase_url,
            supabase_key,
            managers_table,
            sessions_table,
            datastore_timeout,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .field("managers_table", &self.managers_table)
            .field("sessions_table", &self.sessions_table)
            .field("datastore_timeout", &self.datastore_timeout)
            .finish()
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
