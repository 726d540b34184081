use uuid::Uuid;

use crate::{
    api::error,
    modules::character::{
        model::BringOnline, repository::CharacterRepository, schema::CharacterEntity,
    },
};

#[derive(Clone)]
pub struct CharacterRepositoryPg {
    pool: sqlx::PgPool,
}

impl CharacterRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CharacterRepository for CharacterRepositoryPg {
    async fn find_by_account(
        &self,
        wx_account: &str,
    ) -> Result<Option<CharacterEntity>, error::SystemError> {
        let character =
            sqlx::query_as::<_, CharacterEntity>("SELECT * FROM characters WHERE wx_account = $1")
                .bind(wx_account)
                .fetch_optional(&self.pool)
                .await?;
        Ok(character)
    }

    async fn find_by_account_ci(
        &self,
        wx_account: &str,
    ) -> Result<Option<CharacterEntity>, error::SystemError> {
        let character = sqlx::query_as::<_, CharacterEntity>(
            "SELECT * FROM characters WHERE lower(wx_account) = lower($1)",
        )
        .bind(wx_account)
        .fetch_optional(&self.pool)
        .await?;
        Ok(character)
    }

    async fn find_by_accounts(
        &self,
        accounts: &[String],
    ) -> Result<Vec<CharacterEntity>, error::SystemError> {
        let characters = sqlx::query_as::<_, CharacterEntity>(
            "SELECT * FROM characters WHERE wx_account = ANY($1) ORDER BY wx_account",
        )
        .bind(accounts)
        .fetch_all(&self.pool)
        .await?;
        Ok(characters)
    }

    async fn find_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<CharacterEntity>, error::SystemError> {
        let characters = sqlx::query_as::<_, CharacterEntity>(
            "SELECT * FROM characters WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(characters)
    }

    async fn find_online_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<CharacterEntity>, error::SystemError> {
        let characters = sqlx::query_as::<_, CharacterEntity>(
            "SELECT * FROM characters WHERE user_id = $1 AND is_online",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(characters)
    }

    async fn upsert_online(
        &self,
        user_id: &Uuid,
        profile: &BringOnline,
        now: i64,
    ) -> Result<Option<CharacterEntity>, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let character = sqlx::query_as::<_, CharacterEntity>(
            r#"
            INSERT INTO characters
                (id, user_id, wx_account, nickname, avatar, bio, is_online, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7)
            ON CONFLICT (wx_account) DO UPDATE SET
                nickname  = EXCLUDED.nickname,
                avatar    = EXCLUDED.avatar,
                bio       = EXCLUDED.bio,
                is_online = TRUE
            WHERE characters.user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&profile.wx_account)
        .bind(&profile.nickname)
        .bind(&profile.avatar)
        .bind(&profile.bio)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(character)
    }

    async fn create(
        &self,
        user_id: &Uuid,
        profile: &BringOnline,
        is_online: bool,
        now: i64,
    ) -> Result<CharacterEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let character = sqlx::query_as::<_, CharacterEntity>(
            r#"
            INSERT INTO characters
                (id, user_id, wx_account, nickname, avatar, bio, is_online, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&profile.wx_account)
        .bind(&profile.nickname)
        .bind(&profile.avatar)
        .bind(&profile.bio)
        .bind(is_online)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(character)
    }

    async fn set_offline(
        &self,
        wx_account: &str,
        last_seen: i64,
    ) -> Result<(), error::SystemError> {
        sqlx::query(
            "UPDATE characters SET is_online = FALSE, last_seen = $2 WHERE wx_account = $1",
        )
        .bind(wx_account)
        .bind(last_seen)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_offline_many(
        &self,
        accounts: &[String],
        last_seen: i64,
    ) -> Result<(), error::SystemError> {
        sqlx::query(
            "UPDATE characters SET is_online = FALSE, last_seen = $2 WHERE wx_account = ANY($1)",
        )
        .bind(accounts)
        .bind(last_seen)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
