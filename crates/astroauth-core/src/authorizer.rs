//! Session authorizer: resolves a deep-link `/start` into a session status flip.
//!
//! Flow per event: parse → lookup → branch → update → reply. No state is kept between
//! events; both tables live in the remote datastore.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    domain::{ManagerId, SessionId, StartEvent, UserId},
    messaging::port::MessagingPort,
    ports::{ManagerDirectory, SessionStore},
    records::{SessionStatus, SessionUpdate},
    replies, Result,
};

/// Terminal branch taken for one start event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    /// No payload: greeting sent, datastore untouched.
    Greeted,
    /// Manager lookup faulted; session left pending.
    LookupFailed,
    /// Manager is blocked or banned; session marked failed.
    Blocked,
    /// Session marked success and the welcome sent.
    Authorized { manager_id: ManagerId },
    /// Manager is allowed but the session write failed.
    SessionStale { manager_id: ManagerId },
    /// Unknown Telegram account; session marked failed and the access request sent.
    AccessRequested,
}

pub struct SessionAuthorizer {
    managers: Arc<dyn ManagerDirectory>,
    sessions: Arc<dyn SessionStore>,
    messenger: Arc<dyn MessagingPort>,
}

impl SessionAuthorizer {
    pub fn new(
        managers: Arc<dyn ManagerDirectory>,
        sessions: Arc<dyn SessionStore>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            managers,
            sessions,
            messenger,
        }
    }

    /// Handle one `/start` event and send exactly one reply.
    ///
    /// Datastore faults are absorbed into the matching reply. `Err` only comes from the
    /// reply itself failing to send; the transport adapter answers those with
    /// [`replies::INTERNAL_ERROR`].
    pub async fn handle_start(&self, event: &StartEvent) -> Result<AuthOutcome> {
        let requester = &event.requester;
        info!(
            user = %requester.handle(),
            telegram_id = requester.id.0,
            payload = event.payload.as_ref().map(|s| s.0.as_str()).unwrap_or(""),
            "start received"
        );

        let Some(session_id) = &event.payload else {
            self.messenger
                .send_text(event.chat_id, replies::GREETING)
                .await?;
            return Ok(AuthOutcome::Greeted);
        };

        let manager = match self.managers.find_manager_by_telegram_id(requester.id).await {
            Ok(m) => m,
            Err(e) => {
                error!(telegram_id = requester.id.0, error = %e, "manager lookup failed");
                self.messenger
                    .send_text(event.chat_id, replies::DATASTORE_ERROR)
                    .await?;
                return Ok(AuthOutcome::LookupFailed);
            }
        };

        let outcome = match manager {
            Some(manager) if manager.is_denied() => {
                self.update_session_status(session_id, SessionStatus::Failed, None, None)
                    .await;
                self.messenger
                    .send_text(event.chat_id, replies::ACCESS_BLOCKED)
                    .await?;
                AuthOutcome::Blocked
            }
            Some(manager) => {
                let updated = self
                    .update_session_status(
                        session_id,
                        SessionStatus::Success,
                        Some(manager.id),
                        Some(requester.id),
                    )
                    .await;
                if updated {
                    self.messenger
                        .send_html(event.chat_id, &replies::welcome(manager.display_name()))
                        .await?;
                    AuthOutcome::Authorized {
                        manager_id: manager.id,
                    }
                } else {
                    self.messenger
                        .send_text(event.chat_id, replies::SESSION_EXPIRED)
                        .await?;
                    AuthOutcome::SessionStale {
                        manager_id: manager.id,
                    }
                }
            }
            None => {
                // The access request goes out whether or not the write landed.
                self.update_session_status(session_id, SessionStatus::Failed, None, None)
                    .await;
                self.messenger
                    .send_html(event.chat_id, &replies::access_request(requester))
                    .await?;
                AuthOutcome::AccessRequested
            }
        };

        info!(session = %session_id, telegram_id = requester.id.0, ?outcome, "start handled");
        Ok(outcome)
    }

    /// Overwrite a session's status, attaching whichever references were given.
    ///
    /// Never fails: datastore errors are logged and reported as `false`.
    pub async fn update_session_status(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
        manager_id: Option<ManagerId>,
        telegram_id: Option<UserId>,
    ) -> bool {
        let update = SessionUpdate::new(status)
            .with_manager(manager_id)
            .with_telegram_id(telegram_id);

        match self.sessions.update_session(session_id, &update).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    session = %session_id,
                    status = status.as_str(),
                    error = %e,
                    "session update failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId, MessageRef, Requester};
    use crate::errors::Error;
    use crate::records::{Manager, ManagerStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Lookup {
        Found(Manager),
        Missing,
        Fault,
    }

    struct FakeDirectory {
        lookup: Mutex<Lookup>,
        calls: AtomicUsize,
    }

    impl FakeDirectory {
        fn new(lookup: Lookup) -> Self {
            Self {
                lookup: Mutex::new(lookup),
                calls: AtomicUsize::new(0),
            }
        }

        fn set(&self, lookup: Lookup) {
            *self.lookup.lock().unwrap() = lookup;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ManagerDirectory for FakeDirectory {
        async fn find_manager_by_telegram_id(&self, _id: UserId) -> Result<Option<Manager>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &*self.lookup.lock().unwrap() {
                Lookup::Found(m) => Ok(Some(m.clone())),
                Lookup::Missing => Ok(None),
                Lookup::Fault => Err(Error::datastore(
                    Some("08006".to_string()),
                    "connection failure",
                )),
            }
        }
    }

    #[derive(Default)]
    struct FakeSessions {
        fail: bool,
        updates: Mutex<Vec<(SessionId, SessionUpdate)>>,
    }

    impl FakeSessions {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn updates(&self) -> Vec<(SessionId, SessionUpdate)> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionStore for FakeSessions {
        async fn update_session(&self, id: &SessionId, update: &SessionUpdate) -> Result<()> {
            self.updates
                .lock()
                .unwrap()
                .push((id.clone(), update.clone()));
            if self.fail {
                return Err(Error::datastore(None, "no session matched"));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        fail: bool,
        sends: Mutex<Vec<(ChatId, String)>>,
    }

    impl FakeMessenger {
        fn sent(&self) -> Vec<String> {
            self.sends
                .lock()
                .unwrap()
                .iter()
                .map(|(_, t)| t.clone())
                .collect()
        }

        fn record(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            if self.fail {
                return Err(Error::Messaging("chat not found".to_string()));
            }
            let mut sends = self.sends.lock().unwrap();
            sends.push((chat_id, text.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(sends.len() as i32),
            })
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            self.record(chat_id, html)
        }

        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.record(chat_id, text)
        }
    }

    struct Harness {
        directory: Arc<FakeDirectory>,
        sessions: Arc<FakeSessions>,
        messenger: Arc<FakeMessenger>,
        authorizer: SessionAuthorizer,
    }

    fn harness(lookup: Lookup, sessions: FakeSessions, messenger: FakeMessenger) -> Harness {
        let directory = Arc::new(FakeDirectory::new(lookup));
        let sessions = Arc::new(sessions);
        let messenger = Arc::new(messenger);
        let authorizer =
            SessionAuthorizer::new(directory.clone(), sessions.clone(), messenger.clone());
        Harness {
            directory,
            sessions,
            messenger,
            authorizer,
        }
    }

    fn manager(id: i64, name: &str, status: Option<ManagerStatus>) -> Manager {
        Manager {
            id: ManagerId(id),
            name: Some(name.to_string()),
            telegram_id: Some(777),
            status,
        }
    }

    fn event(user_id: i64, payload: Option<&str>) -> StartEvent {
        StartEvent {
            chat_id: ChatId(user_id),
            requester: Requester {
                id: UserId(user_id),
                username: Some("ana_l".to_string()),
                first_name: Some("Ana".to_string()),
                last_name: None,
            },
            payload: payload.map(|p| SessionId(p.to_string())),
        }
    }

    fn sess(id: &str) -> SessionId {
        SessionId(id.to_string())
    }

    #[tokio::test]
    async fn missing_payload_greets_without_touching_datastore() {
        let h = harness(Lookup::Missing, FakeSessions::default(), FakeMessenger::default());

        let out = h.authorizer.handle_start(&event(555, None)).await.unwrap();

        assert_eq!(out, AuthOutcome::Greeted);
        assert_eq!(h.directory.calls(), 0);
        assert!(h.sessions.updates().is_empty());
        assert_eq!(h.messenger.sent(), vec![replies::GREETING.to_string()]);
    }

    #[tokio::test]
    async fn active_manager_marks_success_and_welcomes() {
        let h = harness(
            Lookup::Found(manager(9, "Ana", Some(ManagerStatus::Active))),
            FakeSessions::default(),
            FakeMessenger::default(),
        );

        let out = h
            .authorizer
            .handle_start(&event(777, Some("sess-123")))
            .await
            .unwrap();

        assert_eq!(
            out,
            AuthOutcome::Authorized {
                manager_id: ManagerId(9)
            }
        );
        assert_eq!(
            h.sessions.updates(),
            vec![(
                sess("sess-123"),
                SessionUpdate::new(SessionStatus::Success)
                    .with_manager(Some(ManagerId(9)))
                    .with_telegram_id(Some(UserId(777)))
            )]
        );
        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Ana"));
        assert!(sent[0].contains("Вход выполнен"));
    }

    #[tokio::test]
    async fn manager_without_status_is_allowed() {
        let h = harness(
            Lookup::Found(manager(3, "Ivan", None)),
            FakeSessions::default(),
            FakeMessenger::default(),
        );

        let out = h
            .authorizer
            .handle_start(&event(777, Some("sess-1")))
            .await
            .unwrap();

        assert_eq!(
            out,
            AuthOutcome::Authorized {
                manager_id: ManagerId(3)
            }
        );
    }

    #[tokio::test]
    async fn failed_success_write_reports_stale_session() {
        let h = harness(
            Lookup::Found(manager(9, "Ana", Some(ManagerStatus::Active))),
            FakeSessions::failing(),
            FakeMessenger::default(),
        );

        let out = h
            .authorizer
            .handle_start(&event(777, Some("sess-123")))
            .await
            .unwrap();

        assert_eq!(
            out,
            AuthOutcome::SessionStale {
                manager_id: ManagerId(9)
            }
        );
        assert_eq!(h.messenger.sent(), vec![replies::SESSION_EXPIRED.to_string()]);
    }

    #[tokio::test]
    async fn blocked_and_banned_managers_fail_the_session() {
        for status in [ManagerStatus::Blocked, ManagerStatus::Banned] {
            let h = harness(
                Lookup::Found(manager(9, "Ana", Some(status.clone()))),
                FakeSessions::default(),
                FakeMessenger::default(),
            );

            let out = h
                .authorizer
                .handle_start(&event(777, Some("sess-123")))
                .await
                .unwrap();

            assert_eq!(out, AuthOutcome::Blocked, "status {status:?}");
            assert_eq!(
                h.sessions.updates(),
                vec![(sess("sess-123"), SessionUpdate::new(SessionStatus::Failed))]
            );
            assert_eq!(h.messenger.sent(), vec![replies::ACCESS_BLOCKED.to_string()]);
        }
    }

    #[tokio::test]
    async fn unknown_requester_gets_access_request() {
        let h = harness(Lookup::Missing, FakeSessions::default(), FakeMessenger::default());

        let out = h
            .authorizer
            .handle_start(&event(555, Some("sess-123")))
            .await
            .unwrap();

        assert_eq!(out, AuthOutcome::AccessRequested);
        assert_eq!(
            h.sessions.updates(),
            vec![(sess("sess-123"), SessionUpdate::new(SessionStatus::Failed))]
        );
        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("<code>555</code>"));
        assert!(sent[0].contains("Заявка на доступ"));
    }

    #[tokio::test]
    async fn access_request_is_sent_even_when_write_fails() {
        let h = harness(Lookup::Missing, FakeSessions::failing(), FakeMessenger::default());

        let out = h
            .authorizer
            .handle_start(&event(555, Some("sess-123")))
            .await
            .unwrap();

        assert_eq!(out, AuthOutcome::AccessRequested);
        assert_eq!(h.sessions.updates().len(), 1);
        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("<code>555</code>"));
    }

    #[tokio::test]
    async fn lookup_fault_leaves_session_pending() {
        let h = harness(Lookup::Fault, FakeSessions::default(), FakeMessenger::default());

        let out = h
            .authorizer
            .handle_start(&event(777, Some("sess-123")))
            .await
            .unwrap();

        assert_eq!(out, AuthOutcome::LookupFailed);
        assert!(h.sessions.updates().is_empty());
        assert_eq!(h.messenger.sent(), vec![replies::DATASTORE_ERROR.to_string()]);
    }

    #[tokio::test]
    async fn repeated_start_refails_regardless_of_prior_state() {
        let h = harness(
            Lookup::Found(manager(9, "Ana", Some(ManagerStatus::Active))),
            FakeSessions::default(),
            FakeMessenger::default(),
        );
        let ev = event(777, Some("sess-123"));

        h.authorizer.handle_start(&ev).await.unwrap();
        h.directory
            .set(Lookup::Found(manager(9, "Ana", Some(ManagerStatus::Blocked))));
        assert_eq!(h.authorizer.handle_start(&ev).await.unwrap(), AuthOutcome::Blocked);
        assert_eq!(h.authorizer.handle_start(&ev).await.unwrap(), AuthOutcome::Blocked);

        let statuses = h
            .sessions
            .updates()
            .into_iter()
            .map(|(_, u)| u.status)
            .collect::<Vec<_>>();
        assert_eq!(
            statuses,
            vec![
                SessionStatus::Success,
                SessionStatus::Failed,
                SessionStatus::Failed
            ]
        );
    }

    #[tokio::test]
    async fn reply_failure_surfaces_as_error() {
        let h = harness(
            Lookup::Missing,
            FakeSessions::default(),
            FakeMessenger {
                fail: true,
                ..FakeMessenger::default()
            },
        );

        let err = h
            .authorizer
            .handle_start(&event(555, Some("sess-123")))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Messaging(_)));
    }

    #[tokio::test]
    async fn update_session_status_converts_errors_to_false() {
        let ok = harness(Lookup::Missing, FakeSessions::default(), FakeMessenger::default());
        assert!(
            ok.authorizer
                .update_session_status(&sess("a"), SessionStatus::Failed, None, None)
                .await
        );

        let failing = harness(Lookup::Missing, FakeSessions::failing(), FakeMessenger::default());
        assert!(
            !failing
                .authorizer
                .update_session_status(
                    &sess("a"),
                    SessionStatus::Success,
                    Some(ManagerId(1)),
                    Some(UserId(2))
                )
                .await
        );
        assert_eq!(
            failing.sessions.updates()[0].1,
            SessionUpdate::new(SessionStatus::Success)
                .with_manager(Some(ManagerId(1)))
                .with_telegram_id(Some(UserId(2)))
        );
    }
}
