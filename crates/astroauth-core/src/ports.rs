//! Datastore ports.
//!
//! The remote datastore owns both tables; these traits are the only way the authorizer
//! reaches them, so tests can swap in in-memory fakes.

use async_trait::async_trait;

use crate::{
    domain::{SessionId, UserId},
    records::{Manager, SessionUpdate},
    Result,
};

/// Read-only view of the `managers` table.
#[async_trait]
pub trait ManagerDirectory: Send + Sync {
    /// Look up the single manager bound to a Telegram account.
    ///
    /// `Ok(None)` means no such manager. `Err` is a lookup fault.
    async fn find_manager_by_telegram_id(&self, telegram_id: UserId) -> Result<Option<Manager>>;
}

/// Write access to the `auth_sessions` table.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Apply a partial update to the session row with this id.
    ///
    /// Fails when the datastore rejects the write or no row matched.
    async fn update_session(&self, session_id: &SessionId, update: &SessionUpdate) -> Result<()>;
}
