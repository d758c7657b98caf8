//! Supabase adapter (PostgREST over HTTPS).
//!
//! Implements the `astroauth-core` datastore ports against `/rest/v1`, authenticating
//! with the project's static API key.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    StatusCode,
};
use serde::Deserialize;
use tracing::debug;

use astroauth_core::{
    config::Config,
    domain::{SessionId, UserId},
    errors::Error,
    ports::{ManagerDirectory, SessionStore},
    records::{Manager, SessionUpdate},
    Result,
};

/// PostgREST code for "single object requested, zero or many rows returned".
const NO_SINGLE_ROW: &str = "PGRST116";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Clone, Debug)]
pub struct SupabaseStore {
    rest_url: String,
    managers_table: String,
    sessions_table: String,
    http: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(&cfg.supabase_key)
            .map_err(|_| Error::Config("SUPABASE_KEY is not a valid header value".to_string()))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", cfg.supabase_key))
            .map_err(|_| Error::Config("SUPABASE_KEY is not a valid header value".to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(cfg.datastore_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::External(format!("supabase client build error: {e}")))?;

        Ok(Self {
            rest_url: format!("{}/rest/v1", cfg.supabase_url.trim_end_matches('/')),
            managers_table: cfg.managers_table.clone(),
            sessions_table: cfg.sessions_table.clone(),
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn map_err(e: reqwest::Error) -> Error {
        Error::datastore(None, format!("request error: {e}"))
    }
}

#[async_trait]
impl ManagerDirectory for SupabaseStore {
    async fn find_manager_by_telegram_id(&self, telegram_id: UserId) -> Result<Option<Manager>> {
        let resp = self
            .http
            .get(self.table_url(&self.managers_table))
            .query(&[
                ("telegram_id", format!("eq.{}", telegram_id.0)),
                ("select", "*".to_string()),
            ])
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await
            .map_err(Self::map_err)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Self::map_err)?;
        debug!(telegram_id = telegram_id.0, %status, "manager lookup response");
        decode_lookup(status, &body)
    }
}

#[async_trait]
impl SessionStore for SupabaseStore {
    async fn update_session(&self, session_id: &SessionId, update: &SessionUpdate) -> Result<()> {
        let resp = self
            .http
            .patch(self.table_url(&self.sessions_table))
            .query(&[("id", format!("eq.{}", session_id.0))])
            .header("Prefer", "return=representation")
            .json(update)
            .send()
            .await
            .map_err(Self::map_err)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Self::map_err)?;
        debug!(session = %session_id, %status, "session update response");
        decode_update(status, &body)
    }
}

/// Error envelope PostgREST returns on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

fn error_from_response(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<PostgrestError>(body).unwrap_or_default();
    let mut message = parsed.message.unwrap_or_else(|| {
        format!(
            "HTTP {status}: {}",
            body.chars().take(200).collect::<String>()
        )
    });
    if let Some(details) = parsed.details.filter(|d| !d.is_empty()) {
        message.push_str(&format!(" ({details})"));
    }
    Error::datastore(parsed.code, message)
}

fn decode_lookup(status: StatusCode, body: &str) -> Result<Option<Manager>> {
    if status.is_success() {
        let v: serde_json::Value = serde_json::from_str(body)?;
        return Manager::from_json(v).map(Some);
    }

    match error_from_response(status, body) {
        Error::Datastore { code: Some(code), .. } if code == NO_SINGLE_ROW => Ok(None),
        other => Err(other),
    }
}

fn decode_update(status: StatusCode, body: &str) -> Result<()> {
    if !status.is_success() {
        return Err(error_from_response(status, body));
    }

    let rows: Vec<serde_json::Value> = serde_json::from_str(body)?;
    if rows.is_empty() {
        return Err(Error::datastore(None, "no session matched"));
    }
    Ok(())
}
