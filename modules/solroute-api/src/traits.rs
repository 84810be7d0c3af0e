// Trait seams between the HTTP surface, the batch runner and the outside world.
//
// OperationStore / CredentialStore: Postgres in production, in-memory in tests.
// Automation / AutomationSession: the platform client; one session per identity.
// Sleeper: the runner's only suspension point, swappable so tests never wait.

use std::time::Duration;

use async_trait::async_trait;

use crate::db::models::operation::Operation;
use crate::error::{AutomationError, StoreError};

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Durable bookkeeping of batch operations. Status is the single coordination
/// primitive between request handlers and background runs.
#[async_trait]
pub trait OperationStore: Send + Sync {
    /// Insert an `ongoing` operation and return its fresh identifier.
    async fn create(&self, owner_id: i64, target: &str) -> Result<String, StoreError>;

    /// Whether the operation is `ongoing`. Unknown identifiers are inactive.
    async fn is_active(&self, operation_id: &str) -> Result<bool, StoreError>;

    /// Move `ongoing` to `finished`. Returns whether this call made the
    /// transition; finished or unknown operations are left untouched.
    async fn finish(&self, operation_id: &str) -> Result<bool, StoreError>;

    async fn find(&self, operation_id: &str) -> Result<Option<Operation>, StoreError>;
}

/// Maps opaque bearer tokens to user identifiers.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<i64>, StoreError>;
}

// ---------------------------------------------------------------------------
// Automation
// ---------------------------------------------------------------------------

/// Produces logged-in platform sessions. Every call yields a new identity.
#[async_trait]
pub trait Automation: Send + Sync {
    async fn authenticate(&self) -> Result<Box<dyn AutomationSession>, AutomationError>;
}

#[async_trait]
pub trait AutomationSession: Send {
    async fn post_comment(
        &mut self,
        target: &str,
        text: &str,
        attachment: Option<&str>,
    ) -> Result<(), AutomationError>;

    async fn like(&mut self, message_id: &str) -> Result<(), AutomationError>;
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
