use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct OfflineMessageEntity {
    pub id: Uuid,
    pub from_account: String,
    pub to_account: String,
    pub content: String,
    pub created_at: i64,
    pub delivered: bool,
}
