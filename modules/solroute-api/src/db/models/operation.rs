use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::traits::OperationStore;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Ongoing,
    Finished,
}

impl OperationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationStatus::Ongoing => "ongoing",
            OperationStatus::Finished => "finished",
        }
    }

    /// Anything other than `ongoing` counts as finished, so a row can only
    /// ever read as active when it is exactly `ongoing`.
    pub fn from_db(value: &str) -> Self {
        if value == "ongoing" {
            OperationStatus::Ongoing
        } else {
            OperationStatus::Finished
        }
    }
}

/// Row from the `comment_operations` table.
#[derive(Debug, Clone)]
pub struct Operation {
    pub operation_id: String,
    pub owner_id: i64,
    pub target: String,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Operation {
    pub fn is_active(&self) -> bool {
        self.status == OperationStatus::Ongoing
    }
}

// ---------------------------------------------------------------------------
// Postgres store
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgOperationStore {
    pool: PgPool,
}

impl PgOperationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperationStore for PgOperationStore {
    async fn create(&self, owner_id: i64, target: &str) -> Result<String, StoreError> {
        let operation_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO comment_operations (operationid, userid, mint, status)
            VALUES ($1, $2, $3, 'ongoing')
            "#,
        )
        .bind(&operation_id)
        .bind(owner_id)
        .bind(target)
        .execute(&self.pool)
        .await?;

        Ok(operation_id)
    }

    async fn is_active(&self, operation_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT status
            FROM comment_operations
            WHERE operationid = $1
            "#,
        )
        .bind(operation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some_and(|(status,)| OperationStatus::from_db(&status) == OperationStatus::Ongoing))
    }

    async fn finish(&self, operation_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE comment_operations
            SET status = 'finished', finished_at = now()
            WHERE operationid = $1
              AND status = 'ongoing'
            "#,
        )
        .bind(operation_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, operation_id: &str) -> Result<Option<Operation>, StoreError> {
        let row = sqlx::query_as::<_, (String, i64, String, String, DateTime<Utc>, Option<DateTime<Utc>>)>(
            r#"
            SELECT operationid, userid, mint, status, created_at, finished_at
            FROM comment_operations
            WHERE operationid = $1
            "#,
        )
        .bind(operation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_operation))
    }
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn row_to_operation(
    r: (String, i64, String, String, DateTime<Utc>, Option<DateTime<Utc>>),
) -> Operation {
    Operation {
        operation_id: r.0,
        owner_id: r.1,
        target: r.2,
        status: OperationStatus::from_db(&r.3),
        created_at: r.4,
        finished_at: r.5,
    }
}
