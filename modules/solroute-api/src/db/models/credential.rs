use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::traits::CredentialStore;

/// Token lookups against the `auth` table. Tokens are matched verbatim.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn resolve(&self, token: &str) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT userid FROM auth WHERE cookie = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(user_id,)| user_id))
    }
}
