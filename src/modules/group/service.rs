use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::character::repository::CharacterRepository;
use crate::modules::group::model::{
    GroupMemberResponse, GroupMessageResponse, GroupPersona, GroupResponse, HistoryQuery,
    InsertGroupMessage, MSG_TYPE_REDPACKET,
};
use crate::modules::group::repository::GroupRepository;
use crate::modules::group::schema::{GroupEntity, GroupMemberEntity, SenderType};
use crate::modules::redpacket::model::RedpacketContent;
use crate::utils::now_ms;

#[derive(Clone)]
pub struct GroupService<G, C>
where
    G: GroupRepository + Send + Sync,
    C: CharacterRepository + Send + Sync,
{
    group_repo: Arc<G>,
    character_repo: Arc<C>,
}

impl<G, C> GroupService<G, C>
where
    G: GroupRepository + Send + Sync,
    C: CharacterRepository + Send + Sync,
{
    pub fn with_dependencies(group_repo: Arc<G>, character_repo: Arc<C>) -> Self {
        GroupService { group_repo, character_repo }
    }

    pub async fn create(
        &self,
        creator_account: &str,
        name: &str,
        avatar: Option<String>,
        persona: GroupPersona,
    ) -> Result<GroupResponse, error::SystemError> {
        if name.trim().is_empty() {
            return Err(error::SystemError::invalid("Group name cannot be empty"));
        }

        let group = self
            .group_repo
            .create_group_with_creator(
                name,
                &avatar,
                creator_account,
                &persona.truncated(),
                now_ms(),
            )
            .await?;

        Ok(GroupResponse::from(group))
    }

    /// Member check dùng chung: `Forbidden` nếu account không trong group.
    pub async fn require_member(
        &self,
        group_id: &Uuid,
        user_account: &str,
    ) -> Result<GroupMemberEntity, error::SystemError> {
        self.group_repo
            .find_member(group_id, user_account)
            .await?
            .ok_or_else(|| error::SystemError::forbidden("You are not a member of this group"))
    }

    pub async fn require_group(
        &self,
        group_id: &Uuid,
    ) -> Result<GroupEntity, error::SystemError> {
        self.group_repo
            .find_group(group_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Group not found"))
    }

    /// Join mới hoặc cập nhật persona nếu đã là member.
    pub async fn join(
        &self,
        group_id: &Uuid,
        user_account: &str,
        persona: GroupPersona,
    ) -> Result<(GroupEntity, GroupMemberEntity), error::SystemError> {
        let group = self.require_group(group_id).await?;
        let member = self
            .group_repo
            .upsert_member(group_id, user_account, &persona.truncated(), now_ms())
            .await?;
        Ok((group, member))
    }

    pub async fn members(
        &self,
        group_id: &Uuid,
        requester_account: &str,
    ) -> Result<Vec<GroupMemberResponse>, error::SystemError> {
        self.require_member(group_id, requester_account).await?;
        let members = self.group_repo.members(group_id).await?;
        Ok(members.into_iter().map(Into::into).collect())
    }

    pub async fn member_accounts(
        &self,
        group_id: &Uuid,
    ) -> Result<Vec<String>, error::SystemError> {
        let members = self.group_repo.members(group_id).await?;
        Ok(members.into_iter().map(|m| m.user_account).collect())
    }

    pub async fn groups_for(
        &self,
        user_account: &str,
    ) -> Result<Vec<GroupResponse>, error::SystemError> {
        let groups = self.group_repo.groups_for(user_account).await?;
        Ok(groups.into_iter().map(Into::into).collect())
    }

    pub async fn history(
        &self,
        group_id: &Uuid,
        requester_account: &str,
        query: HistoryQuery,
    ) -> Result<Vec<GroupMessageResponse>, error::SystemError> {
        self.require_member(group_id, requester_account).await?;
        let rows = self.group_repo.history(group_id, query).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Persist tin nhắn group. Với sender_type = character, character_name
    /// phải trùng persona hiện tại của người gửi trong group — chặn mạo danh
    /// khi đổi persona xong gửi với tên cũ.
    pub async fn send_message(
        &self,
        group_id: &Uuid,
        sender_account: &str,
        sender_type: &str,
        sender_name: Option<String>,
        character_name: Option<String>,
        content: String,
        msg_type: String,
    ) -> Result<GroupMessageResponse, error::SystemError> {
        let member = self.require_member(group_id, sender_account).await?;

        let sender_type = SenderType::parse(sender_type)
            .ok_or_else(|| error::SystemError::invalid("Unknown sender type"))?;

        if content.is_empty() {
            return Err(error::SystemError::invalid("Message content cannot be empty"));
        }

        if sender_type == SenderType::Character && character_name != member.character_name {
            return Err(error::SystemError::forbidden(
                "Character name does not match your current group persona",
            ));
        }

        // redpacket mới phải có state sạch: parse tổng/số suất từ client
        // rồi dựng lại, không tin claimed/claimed_amounts gửi lên
        let content = if msg_type == MSG_TYPE_REDPACKET {
            let packet: RedpacketContent = serde_json::from_str(&content)
                .map_err(|_| error::SystemError::invalid("Malformed redpacket content"))?;
            if packet.total_amount <= 0.0 || packet.count == 0 {
                return Err(error::SystemError::invalid(
                    "Redpacket needs a positive amount and at least one share",
                ));
            }
            serde_json::to_string(&RedpacketContent::new(
                packet.total_amount,
                packet.count,
                packet.redpacket_type,
            ))?
        } else {
            content
        };

        let sender_name = match sender_name {
            Some(name) if !name.is_empty() => name,
            _ => member
                .character_name
                .clone()
                .unwrap_or_else(|| sender_account.to_string()),
        };

        let insert = InsertGroupMessage {
            group_id: *group_id,
            sender_type: sender_type.as_str().to_string(),
            sender_account: sender_account.to_string(),
            sender_name,
            character_name,
            content,
            msg_type,
        };
        let entity = self.group_repo.insert_message(&insert, now_ms()).await?;

        let sender_avatar = self
            .character_repo
            .find_by_account(sender_account)
            .await?
            .and_then(|c| c.avatar);

        let character_avatar = if sender_type == SenderType::Character {
            member.character_avatar.clone()
        } else {
            None
        };

        Ok(GroupMessageResponse {
            id: entity.id,
            group_id: entity.group_id,
            sender_type: entity.sender_type,
            sender_wx_account: entity.sender_account,
            sender_name: entity.sender_name,
            character_name: entity.character_name,
            content: entity.content,
            msg_type: entity.msg_type,
            created_at: entity.created_at,
            sender_avatar,
            character_avatar,
        })
    }

    pub async fn update_persona(
        &self,
        group_id: &Uuid,
        user_account: &str,
        persona: GroupPersona,
    ) -> Result<GroupMemberEntity, error::SystemError> {
        self.group_repo
            .update_member_persona(group_id, user_account, &persona.truncated())
            .await?
            .ok_or_else(|| error::SystemError::forbidden("You are not a member of this group"))
    }
}
