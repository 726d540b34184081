use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub creator_account: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupMemberEntity {
    pub group_id: Uuid,
    pub user_account: String,
    pub character_name: Option<String>,
    pub character_avatar: Option<String>,
    pub character_desc: Option<String>,
    pub joined_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupMessageEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub sender_type: String,
    pub sender_account: String,
    pub sender_name: String,
    pub character_name: Option<String>,
    pub content: String,
    pub msg_type: String,
    pub created_at: i64,
}

/// Row lịch sử đã augment avatar: avatar nhân vật toàn cục của người gửi
/// và avatar persona trong group (cho sender_type = character).
#[derive(Debug, Clone, FromRow)]
pub struct GroupMessageRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub sender_type: String,
    pub sender_account: String,
    pub sender_name: String,
    pub character_name: Option<String>,
    pub content: String,
    pub msg_type: String,
    pub created_at: i64,
    pub sender_avatar: Option<String>,
    pub character_avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Character,
    System,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::User => "user",
            SenderType::Character => "character",
            SenderType::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(SenderType::User),
            "character" => Some(SenderType::Character),
            "system" => Some(SenderType::System),
            _ => None,
        }
    }
}
