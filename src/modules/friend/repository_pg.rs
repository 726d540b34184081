use uuid::Uuid;

use crate::{
    api::error,
    modules::friend::{
        repository::FriendRepository,
        schema::{FriendRequestEntity, FriendshipEntity, RequestStatus},
    },
};

#[derive(Clone)]
pub struct FriendRepositoryPg {
    pool: sqlx::PgPool,
}

impl FriendRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FriendRepository for FriendRepositoryPg {
    async fn find_friendship(
        &self,
        account_a: &str,
        account_b: &str,
    ) -> Result<Option<FriendshipEntity>, error::SystemError> {
        let friendship = sqlx::query_as::<_, FriendshipEntity>(
            "SELECT * FROM friendships WHERE account_a = $1 AND account_b = $2",
        )
        .bind(account_a)
        .bind(account_b)
        .fetch_optional(&self.pool)
        .await?;
        Ok(friendship)
    }

    async fn create_friendship(
        &self,
        account_a: &str,
        account_b: &str,
        now: i64,
    ) -> Result<(), error::SystemError> {
        sqlx::query(
            "INSERT INTO friendships (account_a, account_b, created_at) VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING",
        )
        .bind(account_a)
        .bind(account_b)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request =
            sqlx::query_as::<_, FriendRequestEntity>("SELECT * FROM friend_requests WHERE id = $1")
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(request)
    }

    async fn find_pending_between(
        &self,
        account_a: &str,
        account_b: &str,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            SELECT *
            FROM friend_requests
            WHERE status = 'pending'
              AND (
                    (from_account = $1 AND to_account = $2)
                 OR (from_account = $2 AND to_account = $1)
              )
            "#,
        )
        .bind(account_a)
        .bind(account_b)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn find_pending_to(
        &self,
        to_account: &str,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
        let requests = sqlx::query_as::<_, FriendRequestEntity>(
            "SELECT * FROM friend_requests
             WHERE to_account = $1 AND status = 'pending'
             ORDER BY created_at ASC",
        )
        .bind(to_account)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn create_request(
        &self,
        from_account: &str,
        to_account: &str,
        message: &Option<String>,
        now: i64,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            INSERT INTO friend_requests
                (id, from_account, to_account, message, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'pending', $5, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from_account)
        .bind(to_account)
        .bind(message)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    async fn transition_request(
        &self,
        request_id: &Uuid,
        to_status: &str,
        now: i64,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            UPDATE friend_requests
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(to_status)
        .bind(now)
        .bind(RequestStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }
}
