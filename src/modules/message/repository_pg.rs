use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{repository::MessageRepository, schema::OfflineMessageEntity},
};

#[derive(Clone)]
pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn store(
        &self,
        id: &Uuid,
        from_account: &str,
        to_account: &str,
        content: &str,
        created_at: i64,
    ) -> Result<OfflineMessageEntity, error::SystemError> {
        let message = sqlx::query_as::<_, OfflineMessageEntity>(
            r#"
            INSERT INTO offline_messages (id, from_account, to_account, content, created_at, delivered)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from_account)
        .bind(to_account)
        .bind(content)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn pending_for(
        &self,
        to_account: &str,
    ) -> Result<Vec<OfflineMessageEntity>, error::SystemError> {
        let messages = sqlx::query_as::<_, OfflineMessageEntity>(
            "SELECT * FROM offline_messages
             WHERE to_account = $1 AND NOT delivered
             ORDER BY created_at ASC",
        )
        .bind(to_account)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn mark_delivered(&self, ids: &[Uuid]) -> Result<(), error::SystemError> {
        sqlx::query("UPDATE offline_messages SET delivered = TRUE WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
