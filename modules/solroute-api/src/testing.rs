// Test mocks for the API and the batch runner.
//
// One mock per trait boundary:
// - MemoryOperationStore (OperationStore): HashMap-backed, with call counters,
//   an optional "goes inactive after N checks" budget and a read-failure switch
// - MemoryCredentialStore (CredentialStore): token to user id
// - MockAutomation (Automation): records submissions, fails on demand
// - RecordingSleeper / GatedSleeper (Sleeper): never touch the real clock

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::db::models::operation::{Operation, OperationStatus};
use crate::error::{AutomationError, StoreError};
use crate::runner::BatchRunner;
use crate::traits::{Automation, AutomationSession, CredentialStore, OperationStore, Sleeper};
use crate::AppState;

// ---------------------------------------------------------------------------
// MemoryOperationStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryOperationStore {
    rows: Mutex<HashMap<String, Operation>>,
    /// How many more `is_active` checks may answer `true` before every
    /// ongoing operation is flipped to finished, as if stopped externally.
    active_budget: Mutex<Option<usize>>,
    fail_reads: Mutex<bool>,
    is_active_calls: AtomicUsize,
    finish_calls: AtomicUsize,
}

impl MemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `checks` more status checks succeed, then stop everything.
    pub fn stop_after_checks(self, checks: usize) -> Self {
        *self.active_budget.lock().unwrap() = Some(checks);
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Flip an operation to finished without going through `finish`.
    pub fn stop_externally(&self, operation_id: &str) {
        if let Some(row) = self.rows.lock().unwrap().get_mut(operation_id) {
            row.status = OperationStatus::Finished;
            row.finished_at = Some(Utc::now());
        }
    }

    /// Seed an `ongoing` row with a known id.
    pub fn insert(&self, operation_id: &str, owner_id: i64, target: &str) {
        self.rows.lock().unwrap().insert(
            operation_id.to_string(),
            Operation {
                operation_id: operation_id.to_string(),
                owner_id,
                target: target.to_string(),
                status: OperationStatus::Ongoing,
                created_at: Utc::now(),
                finished_at: None,
            },
        );
    }

    pub fn status(&self, operation_id: &str) -> Option<OperationStatus> {
        self.rows.lock().unwrap().get(operation_id).map(|r| r.status)
    }

    pub fn is_active_calls(&self) -> usize {
        self.is_active_calls.load(Ordering::SeqCst)
    }

    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationStore for MemoryOperationStore {
    async fn create(&self, owner_id: i64, target: &str) -> Result<String, StoreError> {
        let operation_id = Uuid::new_v4().to_string();
        self.insert(&operation_id, owner_id, target);
        Ok(operation_id)
    }

    async fn is_active(&self, operation_id: &str) -> Result<bool, StoreError> {
        self.is_active_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }

        let mut budget = self.active_budget.lock().unwrap();
        if let Some(remaining) = budget.as_mut() {
            if *remaining == 0 {
                for row in self.rows.lock().unwrap().values_mut() {
                    row.status = OperationStatus::Finished;
                }
            } else {
                *remaining -= 1;
            }
        }
        drop(budget);

        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(operation_id)
            .is_some_and(|r| r.is_active()))
    }

    async fn finish(&self, operation_id: &str) -> Result<bool, StoreError> {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(operation_id) {
            Some(row) if row.is_active() => {
                row.status = OperationStatus::Finished;
                row.finished_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find(&self, operation_id: &str) -> Result<Option<Operation>, StoreError> {
        Ok(self.rows.lock().unwrap().get(operation_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCredentialStore {
    tokens: HashMap<String, i64>,
    unavailable: bool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, user_id: i64) -> Self {
        self.tokens.insert(token.to_string(), user_id);
        self
    }

    /// Every lookup fails with a store error.
    pub fn unavailable() -> Self {
        Self {
            tokens: HashMap::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn resolve(&self, token: &str) -> Result<Option<i64>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("credential store down".into()));
        }
        Ok(self.tokens.get(token).copied())
    }
}

// ---------------------------------------------------------------------------
// MockAutomation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    pub session: usize,
    pub target: String,
    pub text: String,
    pub attachment: Option<String>,
}

/// Records every submission. Sessions are numbered in the order they were
/// authenticated, so tests can check that no session is reused.
#[derive(Default)]
pub struct MockAutomation {
    sessions: AtomicUsize,
    failing_auth: HashSet<usize>,
    failing_texts: HashSet<String>,
    posted: Arc<Mutex<Vec<PostedComment>>>,
    liked: Arc<Mutex<Vec<String>>>,
}

impl MockAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th `authenticate` call (0-based).
    pub fn fail_auth_on(mut self, attempt: usize) -> Self {
        self.failing_auth.insert(attempt);
        self
    }

    /// Fail submission of any comment with this exact text.
    pub fn fail_comment(mut self, text: &str) -> Self {
        self.failing_texts.insert(text.to_string());
        self
    }

    pub fn posted(&self) -> Vec<PostedComment> {
        self.posted.lock().unwrap().clone()
    }

    pub fn liked(&self) -> Vec<String> {
        self.liked.lock().unwrap().clone()
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Automation for MockAutomation {
    async fn authenticate(&self) -> Result<Box<dyn AutomationSession>, AutomationError> {
        let attempt = self.sessions.fetch_add(1, Ordering::SeqCst);
        if self.failing_auth.contains(&attempt) {
            return Err(AutomationError::Auth(format!("login {attempt} rejected")));
        }
        Ok(Box::new(MockSession {
            id: attempt,
            failing_texts: self.failing_texts.clone(),
            posted: self.posted.clone(),
            liked: self.liked.clone(),
        }))
    }
}

struct MockSession {
    id: usize,
    failing_texts: HashSet<String>,
    posted: Arc<Mutex<Vec<PostedComment>>>,
    liked: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AutomationSession for MockSession {
    async fn post_comment(
        &mut self,
        target: &str,
        text: &str,
        attachment: Option<&str>,
    ) -> Result<(), AutomationError> {
        if self.failing_texts.contains(text) {
            return Err(AutomationError::Submission(format!("rejected: {text}")));
        }
        self.posted.lock().unwrap().push(PostedComment {
            session: self.id,
            target: target.to_string(),
            text: text.to_string(),
            attachment: attachment.map(String::from),
        });
        Ok(())
    }

    async fn like(&mut self, message_id: &str) -> Result<(), AutomationError> {
        self.liked.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sleepers
// ---------------------------------------------------------------------------

/// Returns immediately and remembers every requested delay.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Blocks every sleep until the test releases it, so a run can be held
/// mid-flight deterministically.
pub struct GatedSleeper {
    gate: Semaphore,
}

impl GatedSleeper {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
        }
    }

    /// Allow `steps` more sleeps to complete.
    pub fn release(&self, steps: usize) {
        self.gate.add_permits(steps);
    }
}

impl Default for GatedSleeper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sleeper for GatedSleeper {
    async fn sleep(&self, _duration: Duration) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn runner(
    operations: Arc<MemoryOperationStore>,
    automation: Arc<MockAutomation>,
    sleeper: Arc<dyn Sleeper>,
) -> BatchRunner {
    BatchRunner::new(operations, automation, sleeper)
}

pub fn app_state(
    operations: Arc<MemoryOperationStore>,
    credentials: MemoryCredentialStore,
    automation: Arc<MockAutomation>,
    sleeper: Arc<dyn Sleeper>,
) -> Arc<AppState> {
    Arc::new(AppState::new(
        operations,
        Arc::new(credentials),
        automation,
        sleeper,
    ))
}
