use serde::{Deserialize, Serialize};

use crate::modules::character::schema::CharacterEntity;

/// Profile đầy đủ của một nhân vật, trả về cho chính chủ sở hữu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterResponse {
    pub wx_account: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<i64>,
    pub created_at: i64,
}

impl From<CharacterEntity> for CharacterResponse {
    fn from(entity: CharacterEntity) -> Self {
        CharacterResponse {
            wx_account: entity.wx_account,
            nickname: entity.nickname,
            avatar: entity.avatar,
            bio: entity.bio,
            is_online: entity.is_online,
            last_seen: entity.last_seen,
            created_at: entity.created_at,
        }
    }
}

/// Kết quả search: không bao giờ kèm `bio` của nhân vật người khác.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCharacter {
    pub wx_account: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub is_online: bool,
}

impl SearchCharacter {
    pub fn from_entity(entity: CharacterEntity, is_online: bool) -> Self {
        SearchCharacter {
            wx_account: entity.wx_account,
            nickname: entity.nickname,
            avatar: entity.avatar,
            is_online,
        }
    }
}

/// Profile rút gọn dùng trong friend request và thông báo kết bạn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterBrief {
    pub wx_account: String,
    pub nickname: String,
    pub avatar: Option<String>,
}

impl From<CharacterEntity> for CharacterBrief {
    fn from(entity: CharacterEntity) -> Self {
        CharacterBrief {
            wx_account: entity.wx_account,
            nickname: entity.nickname,
            avatar: entity.avatar,
        }
    }
}

pub struct BringOnline {
    pub wx_account: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}
