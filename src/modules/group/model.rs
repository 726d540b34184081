use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::group::schema::{GroupEntity, GroupMemberEntity, GroupMessageRow};

/// Avatar persona trong group bị cắt còn tối đa chừng này byte.
pub const PERSONA_AVATAR_MAX_BYTES: usize = 65_000;

pub const MSG_TYPE_TEXT: &str = "text";
pub const MSG_TYPE_SYSTEM: &str = "system";
pub const MSG_TYPE_REDPACKET: &str = "redpacket";

/// Persona trong group do member tự chọn; khác với Character toàn cục.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupPersona {
    pub character_name: Option<String>,
    pub character_avatar: Option<String>,
    pub character_desc: Option<String>,
}

impl GroupPersona {
    /// Cắt avatar còn tối đa `PERSONA_AVATAR_MAX_BYTES` byte, lùi về
    /// char boundary gần nhất để không cắt giữa một ký tự UTF-8.
    pub fn truncated(mut self) -> Self {
        if let Some(avatar) = self.character_avatar.take() {
            self.character_avatar = Some(truncate_bytes(avatar, PERSONA_AVATAR_MAX_BYTES));
        }
        self
    }
}

fn truncate_bytes(s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut s = s;
    s.truncate(end);
    s
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub creator_wx_account: String,
    pub created_at: i64,
}

impl From<GroupEntity> for GroupResponse {
    fn from(entity: GroupEntity) -> Self {
        GroupResponse {
            id: entity.id,
            name: entity.name,
            avatar: entity.avatar,
            creator_wx_account: entity.creator_account,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMemberResponse {
    pub group_id: Uuid,
    pub wx_account: String,
    pub character_name: Option<String>,
    pub character_avatar: Option<String>,
    pub character_desc: Option<String>,
    pub joined_at: i64,
}

impl From<GroupMemberEntity> for GroupMemberResponse {
    fn from(entity: GroupMemberEntity) -> Self {
        GroupMemberResponse {
            group_id: entity.group_id,
            wx_account: entity.user_account,
            character_name: entity.character_name,
            character_avatar: entity.character_avatar,
            character_desc: entity.character_desc,
            joined_at: entity.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessageResponse {
    pub id: Uuid,
    pub group_id: Uuid,
    pub sender_type: String,
    pub sender_wx_account: String,
    pub sender_name: String,
    pub character_name: Option<String>,
    pub content: String,
    pub msg_type: String,
    pub created_at: i64,
    pub sender_avatar: Option<String>,
    pub character_avatar: Option<String>,
}

impl From<GroupMessageRow> for GroupMessageResponse {
    fn from(row: GroupMessageRow) -> Self {
        GroupMessageResponse {
            id: row.id,
            group_id: row.group_id,
            sender_type: row.sender_type,
            sender_wx_account: row.sender_account,
            sender_name: row.sender_name,
            character_name: row.character_name,
            content: row.content,
            msg_type: row.msg_type,
            created_at: row.created_at,
            sender_avatar: row.sender_avatar,
            character_avatar: row.character_avatar,
        }
    }
}

/// Ba chế độ đọc lịch sử group.
#[derive(Debug, Clone, Copy)]
pub enum HistoryQuery {
    /// Tin sau mốc thời gian (exclusive), tăng dần.
    Since(i64),
    /// N tin mới nhất, trả về theo thứ tự tăng dần.
    Recent(i64),
    /// Toàn bộ lịch sử.
    All,
}

pub struct InsertGroupMessage {
    pub group_id: Uuid,
    pub sender_type: String,
    pub sender_account: String,
    pub sender_name: String,
    pub character_name: Option<String>,
    pub content: String,
    pub msg_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_avatar_truncated_at_char_boundary() {
        let avatar = "ký".repeat(PERSONA_AVATAR_MAX_BYTES); // mỗi "ký" 3 byte
        let persona = GroupPersona {
            character_name: Some("Knight".to_string()),
            character_avatar: Some(avatar),
            character_desc: None,
        }
        .truncated();

        let truncated = persona.character_avatar.unwrap();
        assert!(truncated.len() <= PERSONA_AVATAR_MAX_BYTES);
        assert!(truncated.is_char_boundary(truncated.len()));
        // cắt ngắn, không xóa trắng
        assert!(!truncated.is_empty());
    }

    #[test]
    fn small_persona_avatar_untouched() {
        let persona = GroupPersona {
            character_name: None,
            character_avatar: Some("small".to_string()),
            character_desc: None,
        }
        .truncated();
        assert_eq!(persona.character_avatar.as_deref(), Some("small"));
    }
}
