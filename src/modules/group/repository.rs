use uuid::Uuid;

use crate::{
    api::error,
    modules::group::{
        model::{GroupPersona, HistoryQuery, InsertGroupMessage},
        schema::{GroupEntity, GroupMemberEntity, GroupMessageEntity, GroupMessageRow},
    },
};

#[async_trait::async_trait]
pub trait GroupRepository {
    /// Tạo group và membership của creator trong cùng một transaction.
    async fn create_group_with_creator(
        &self,
        name: &str,
        avatar: &Option<String>,
        creator_account: &str,
        persona: &GroupPersona,
        now: i64,
    ) -> Result<GroupEntity, error::SystemError>;

    async fn find_group(&self, group_id: &Uuid)
    -> Result<Option<GroupEntity>, error::SystemError>;

    async fn find_member(
        &self,
        group_id: &Uuid,
        user_account: &str,
    ) -> Result<Option<GroupMemberEntity>, error::SystemError>;

    /// Insert membership mới hoặc cập nhật persona nếu đã là member.
    async fn upsert_member(
        &self,
        group_id: &Uuid,
        user_account: &str,
        persona: &GroupPersona,
        now: i64,
    ) -> Result<GroupMemberEntity, error::SystemError>;

    async fn update_member_persona(
        &self,
        group_id: &Uuid,
        user_account: &str,
        persona: &GroupPersona,
    ) -> Result<Option<GroupMemberEntity>, error::SystemError>;

    async fn members(
        &self,
        group_id: &Uuid,
    ) -> Result<Vec<GroupMemberEntity>, error::SystemError>;

    async fn groups_for(
        &self,
        user_account: &str,
    ) -> Result<Vec<GroupEntity>, error::SystemError>;

    async fn insert_message(
        &self,
        message: &InsertGroupMessage,
        now: i64,
    ) -> Result<GroupMessageEntity, error::SystemError>;

    async fn find_message(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<GroupMessageEntity>, error::SystemError>;

    /// Ghi đè content của một message (redpacket state).
    async fn update_message_content(
        &self,
        message_id: &Uuid,
        content: &str,
    ) -> Result<(), error::SystemError>;

    /// Lịch sử đã augment avatar, luôn tăng dần theo created_at.
    async fn history(
        &self,
        group_id: &Uuid,
        query: HistoryQuery,
    ) -> Result<Vec<GroupMessageRow>, error::SystemError>;
}
