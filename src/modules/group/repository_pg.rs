use uuid::Uuid;

use crate::{
    api::error,
    modules::group::{
        model::{GroupPersona, HistoryQuery, InsertGroupMessage},
        repository::GroupRepository,
        schema::{GroupEntity, GroupMemberEntity, GroupMessageEntity, GroupMessageRow},
    },
};

/// Câu SELECT lịch sử dùng chung: augment avatar người gửi từ bảng
/// characters và avatar persona từ group_members. Tin system không join
/// được gì thì các cột augment là NULL — trả về nguyên trạng.
const HISTORY_SELECT: &str = r#"
    SELECT
        m.id,
        m.group_id,
        m.sender_type,
        m.sender_account,
        m.sender_name,
        m.character_name,
        m.content,
        m.msg_type,
        m.created_at,
        c.avatar AS sender_avatar,
        CASE WHEN m.sender_type = 'character' THEN gm.character_avatar END AS character_avatar
    FROM group_messages m
    LEFT JOIN characters c ON c.wx_account = m.sender_account
    LEFT JOIN group_members gm
        ON gm.group_id = m.group_id AND gm.user_account = m.sender_account
"#;

#[derive(Clone)]
pub struct GroupRepositoryPg {
    pool: sqlx::PgPool,
}

impl GroupRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GroupRepository for GroupRepositoryPg {
    async fn create_group_with_creator(
        &self,
        name: &str,
        avatar: &Option<String>,
        creator_account: &str,
        persona: &GroupPersona,
        now: i64,
    ) -> Result<GroupEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let group_id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let group = sqlx::query_as::<_, GroupEntity>(
            r#"
            INSERT INTO online_groups (id, name, avatar, creator_account, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(name)
        .bind(avatar)
        .bind(creator_account)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO group_members
                (group_id, user_account, character_name, character_avatar, character_desc, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(group_id)
        .bind(creator_account)
        .bind(&persona.character_name)
        .bind(&persona.character_avatar)
        .bind(&persona.character_desc)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(group)
    }

    async fn find_group(
        &self,
        group_id: &Uuid,
    ) -> Result<Option<GroupEntity>, error::SystemError> {
        let group =
            sqlx::query_as::<_, GroupEntity>("SELECT * FROM online_groups WHERE id = $1")
                .bind(group_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(group)
    }

    async fn find_member(
        &self,
        group_id: &Uuid,
        user_account: &str,
    ) -> Result<Option<GroupMemberEntity>, error::SystemError> {
        let member = sqlx::query_as::<_, GroupMemberEntity>(
            "SELECT * FROM group_members WHERE group_id = $1 AND user_account = $2",
        )
        .bind(group_id)
        .bind(user_account)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn upsert_member(
        &self,
        group_id: &Uuid,
        user_account: &str,
        persona: &GroupPersona,
        now: i64,
    ) -> Result<GroupMemberEntity, error::SystemError> {
        let member = sqlx::query_as::<_, GroupMemberEntity>(
            r#"
            INSERT INTO group_members
                (group_id, user_account, character_name, character_avatar, character_desc, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (group_id, user_account) DO UPDATE SET
                character_name   = EXCLUDED.character_name,
                character_avatar = EXCLUDED.character_avatar,
                character_desc   = EXCLUDED.character_desc
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(user_account)
        .bind(&persona.character_name)
        .bind(&persona.character_avatar)
        .bind(&persona.character_desc)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    async fn update_member_persona(
        &self,
        group_id: &Uuid,
        user_account: &str,
        persona: &GroupPersona,
    ) -> Result<Option<GroupMemberEntity>, error::SystemError> {
        let member = sqlx::query_as::<_, GroupMemberEntity>(
            r#"
            UPDATE group_members
            SET character_name = $3, character_avatar = $4, character_desc = $5
            WHERE group_id = $1 AND user_account = $2
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(user_account)
        .bind(&persona.character_name)
        .bind(&persona.character_avatar)
        .bind(&persona.character_desc)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn members(
        &self,
        group_id: &Uuid,
    ) -> Result<Vec<GroupMemberEntity>, error::SystemError> {
        let members = sqlx::query_as::<_, GroupMemberEntity>(
            "SELECT * FROM group_members WHERE group_id = $1 ORDER BY joined_at ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn groups_for(
        &self,
        user_account: &str,
    ) -> Result<Vec<GroupEntity>, error::SystemError> {
        let groups = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT g.*
            FROM online_groups g
            JOIN group_members gm ON gm.group_id = g.id
            WHERE gm.user_account = $1
            ORDER BY g.created_at ASC
            "#,
        )
        .bind(user_account)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn insert_message(
        &self,
        message: &InsertGroupMessage,
        now: i64,
    ) -> Result<GroupMessageEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let message = sqlx::query_as::<_, GroupMessageEntity>(
            r#"
            INSERT INTO group_messages
                (id, group_id, sender_type, sender_account, sender_name,
                 character_name, content, msg_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(message.group_id)
        .bind(&message.sender_type)
        .bind(&message.sender_account)
        .bind(&message.sender_name)
        .bind(&message.character_name)
        .bind(&message.content)
        .bind(&message.msg_type)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn find_message(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<GroupMessageEntity>, error::SystemError> {
        let message =
            sqlx::query_as::<_, GroupMessageEntity>("SELECT * FROM group_messages WHERE id = $1")
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(message)
    }

    async fn update_message_content(
        &self,
        message_id: &Uuid,
        content: &str,
    ) -> Result<(), error::SystemError> {
        sqlx::query("UPDATE group_messages SET content = $2 WHERE id = $1")
            .bind(message_id)
            .bind(content)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn history(
        &self,
        group_id: &Uuid,
        query: HistoryQuery,
    ) -> Result<Vec<GroupMessageRow>, error::SystemError> {
        let rows = match query {
            HistoryQuery::Since(since) => {
                let sql = format!(
                    "{HISTORY_SELECT} WHERE m.group_id = $1 AND m.created_at > $2
                     ORDER BY m.created_at ASC"
                );
                sqlx::query_as::<_, GroupMessageRow>(&sql)
                    .bind(group_id)
                    .bind(since)
                    .fetch_all(&self.pool)
                    .await?
            }
            HistoryQuery::Recent(limit) => {
                let sql = format!(
                    "{HISTORY_SELECT} WHERE m.group_id = $1
                     ORDER BY m.created_at DESC LIMIT $2"
                );
                let mut rows = sqlx::query_as::<_, GroupMessageRow>(&sql)
                    .bind(group_id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?;
                // DESC để lấy N tin cuối, đảo lại cho client nhận tăng dần
                rows.reverse();
                rows
            }
            HistoryQuery::All => {
                let sql =
                    format!("{HISTORY_SELECT} WHERE m.group_id = $1 ORDER BY m.created_at ASC");
                sqlx::query_as::<_, GroupMessageRow>(&sql)
                    .bind(group_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }
}
