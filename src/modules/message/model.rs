use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::message::schema::OfflineMessageEntity;

/// Tin nhắn 1:1 trên wire. Cùng một shape cho push trực tiếp lẫn replay
/// từ offline queue, để client không phải phân biệt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: Uuid,
    pub from_wx_account: String,
    pub to_wx_account: String,
    pub content: String,
    pub created_at: i64,
}

impl From<OfflineMessageEntity> for DirectMessage {
    fn from(entity: OfflineMessageEntity) -> Self {
        DirectMessage {
            id: entity.id,
            from_wx_account: entity.from_account,
            to_wx_account: entity.to_account,
            content: entity.content,
            created_at: entity.created_at,
        }
    }
}
