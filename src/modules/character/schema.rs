use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct CharacterEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wx_account: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<i64>,
    pub created_at: i64,
}
