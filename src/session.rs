use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::{GateSettings, WorkflowSettings},
    gate::{AccessGate, AuthOutcome},
    store::ImageStore,
    workflow::{Completion, UploadBatch, UploadWorkflow, WorkflowStatus, run_batch},
};

/// Gate plus workflow for one browser.
#[derive(Debug)]
pub struct UploaderSession {
    gate: AccessGate,
    workflow: UploadWorkflow,
    last_seen: DateTime<Utc>,
}

impl UploaderSession {
    pub fn new(gate: GateSettings, workflow: WorkflowSettings) -> Self {
        Self {
            gate: AccessGate::new(gate),
            workflow: UploadWorkflow::new(workflow),
            last_seen: Utc::now(),
        }
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn is_authenticated(&self) -> bool {
        self.gate.is_authenticated()
    }

    pub fn attempt_login(&mut self, candidate: &str) -> AuthOutcome {
        self.gate.attempt_login(candidate)
    }

    /// Leaves the gate and throws away every piece of workflow state.
    pub fn logout(&mut self) {
        self.gate.logout();
        self.workflow.clear();
    }

    /// The workflow is only reachable through an open gate.
    pub fn workflow(&self) -> Option<&UploadWorkflow> {
        self.gate.is_authenticated().then_some(&self.workflow)
    }

    pub fn workflow_mut(&mut self) -> Option<&mut UploadWorkflow> {
        if self.gate.is_authenticated() {
            Some(&mut self.workflow)
        } else {
            None
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen = now;
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }
}

pub type SharedSession = Arc<Mutex<UploaderSession>>;

/// Transfers a batch started with [`UploadWorkflow::begin_upload`] on its own
/// task and records the outcome on the session.
///
/// The task does not depend on the caller: a dropped request still moves the
/// workflow out of `Uploading`.
pub fn spawn_batch(
    session: SharedSession,
    store: Arc<dyn ImageStore>,
    batch: UploadBatch,
) -> JoinHandle<Completion> {
    tokio::spawn(async move {
        let outcome = run_batch(store.as_ref(), &batch).await;

        let mut session = session.lock().await;
        let completion = session.workflow.finish_upload(batch.id(), outcome);
        match completion {
            Completion::Published(count) => info!(batch = batch.id(), count, "upload finished"),
            Completion::Failed => warn!(batch = batch.id(), "upload failed"),
            Completion::Discarded => {}
        }
        completion
    })
}

/// In-memory sessions keyed by the id stored in the browser cookie.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
    gate: GateSettings,
    workflow: WorkflowSettings,
}

impl SessionStore {
    pub fn new(gate: GateSettings, workflow: WorkflowSettings) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            gate,
            workflow,
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        let guard = self.sessions.read().await;
        guard.get(&id).cloned()
    }

    pub async fn create(&self) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(UploaderSession::new(
            self.gate.clone(),
            self.workflow.clone(),
        )));
        let mut guard = self.sessions.write().await;
        guard.insert(id, session.clone());
        (id, session)
    }

    /// Returns the session for `id`, or a fresh one when it is unknown.
    /// The flag is `true` when a new session was created.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SharedSession, bool) {
        if let Some(id) = id {
            if let Some(session) = self.get(id).await {
                return (id, session, false);
            }
        }
        let (id, session) = self.create().await;
        (id, session, true)
    }

    /// Drops sessions idle since before `cutoff`.
    ///
    /// Sessions that are locked right now or have a batch in flight are kept.
    pub async fn purge_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut guard = self.sessions.write().await;
        let before = guard.len();
        guard.retain(|_, session| match session.try_lock() {
            Ok(session) => {
                session.last_seen() >= cutoff
                    || session.workflow.status() == WorkflowStatus::Uploading
            }
            Err(_) => true,
        });
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::workflow::RawFile;

    fn store() -> SessionStore {
        SessionStore::new(GateSettings::new("pw"), WorkflowSettings::default())
    }

    #[test]
    fn workflow_is_hidden_until_login() {
        let mut session = UploaderSession::new(GateSettings::new("pw"), WorkflowSettings::default());
        assert!(session.workflow().is_none());
        assert!(session.workflow_mut().is_none());

        session.attempt_login("wrong");
        assert!(session.workflow_mut().is_none());

        session.attempt_login("pw");
        assert!(session.workflow_mut().is_some());
    }

    #[test]
    fn logout_resets_workflow() {
        let mut session = UploaderSession::new(GateSettings::new("pw"), WorkflowSettings::default());
        session.attempt_login("pw");
        session
            .workflow_mut()
            .unwrap()
            .select_files(vec![RawFile::new("a.png", "image/png", vec![1])])
            .unwrap();

        session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.gate().message(), None);

        session.attempt_login("pw");
        let workflow = session.workflow().unwrap();
        assert!(workflow.staged().is_empty());
        assert_eq!(workflow.status(), WorkflowStatus::Idle);
    }

    #[tokio::test]
    async fn get_or_create_reuses_known_ids() {
        let store = store();
        let (id, _, created) = store.get_or_create(None).await;
        assert!(created);

        let (same, _, created) = store.get_or_create(Some(id)).await;
        assert_eq!(same, id);
        assert!(!created);

        let (other, _, created) = store.get_or_create(Some(Uuid::new_v4())).await;
        assert_ne!(other, id);
        assert!(created);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn purge_removes_only_idle_sessions() {
        let store = store();
        let now = Utc::now();

        let (stale_id, stale, _) = store.get_or_create(None).await;
        stale.lock().await.touch(now - Duration::hours(2));
        let (fresh_id, fresh, _) = store.get_or_create(None).await;
        fresh.lock().await.touch(now);

        let removed = store.purge_idle(now - Duration::hours(1)).await;

        assert_eq!(removed, 1);
        assert!(store.get(stale_id).await.is_none());
        assert!(store.get(fresh_id).await.is_some());
    }

    #[tokio::test]
    async fn purge_keeps_sessions_mid_upload() {
        let store = store();
        let now = Utc::now();
        let (id, session, _) = store.get_or_create(None).await;
        {
            let mut session = session.lock().await;
            session.attempt_login("pw");
            let workflow = session.workflow_mut().unwrap();
            workflow
                .select_files(vec![RawFile::new("a.png", "image/png", vec![1])])
                .unwrap();
            workflow.begin_upload().unwrap();
            session.touch(now - Duration::days(1));
        }

        assert_eq!(store.purge_idle(now).await, 0);
        assert!(store.get(id).await.is_some());
    }
}
