use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::character::model::CharacterBrief;
use crate::modules::friend::schema::FriendRequestEntity;

/// Cặp account chuẩn hóa theo thứ tự từ điển. Friendship là quan hệ
/// không thứ tự nên mỗi cặp chỉ được lưu một lần.
pub fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestResponse {
    pub id: Uuid,
    pub from_wx_account: String,
    pub to_wx_account: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: i64,
    /// Profile rút gọn của người gửi, để UI hiển thị mà không cần query thêm.
    pub from_character: Option<CharacterBrief>,
}

impl FriendRequestResponse {
    pub fn from_entity(entity: FriendRequestEntity, from_character: Option<CharacterBrief>) -> Self {
        FriendRequestResponse {
            id: entity.id,
            from_wx_account: entity.from_account,
            to_wx_account: entity.to_account,
            message: entity.message,
            status: entity.status,
            created_at: entity.created_at,
            from_character,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_pair_is_canonical() {
        assert_eq!(ordered_pair("a_wx", "b_wx"), ("a_wx", "b_wx"));
        assert_eq!(ordered_pair("b_wx", "a_wx"), ("a_wx", "b_wx"));
        assert_eq!(ordered_pair("a_wx", "a_wx"), ("a_wx", "a_wx"));
    }
}
