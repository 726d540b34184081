use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub hash_password: String,
    pub created_at: i64,
    pub last_login: Option<i64>,
}
