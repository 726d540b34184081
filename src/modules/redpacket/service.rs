use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::api::error;
use crate::modules::group::model::MSG_TYPE_REDPACKET;
use crate::modules::group::repository::GroupRepository;
use crate::modules::redpacket::model::RedpacketContent;

/// Kết quả một lượt claim thành công, đủ dữ liệu cho các frame broadcast.
#[derive(Debug)]
pub struct ClaimOutcome {
    pub content: RedpacketContent,
    pub amount: f64,
}

/// Engine claim redpacket.
///
/// State nằm trong blob JSON của message row nên mọi lượt claim trên cùng
/// một message phải được serialize — ở đây bằng một lock table async theo
/// message_id (hub chạy single-node, sở hữu toàn bộ presence nên lock
/// in-process là đủ). Không bao giờ read-modify-write ngoài lock.
pub struct RedpacketService<G>
where
    G: GroupRepository + Send + Sync,
{
    group_repo: Arc<G>,
    locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<G> Clone for RedpacketService<G>
where
    G: GroupRepository + Send + Sync,
{
    fn clone(&self) -> Self {
        RedpacketService { group_repo: self.group_repo.clone(), locks: self.locks.clone() }
    }
}

impl<G> RedpacketService<G>
where
    G: GroupRepository + Send + Sync,
{
    pub fn with_dependencies(group_repo: Arc<G>) -> Self {
        RedpacketService { group_repo, locks: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn lock_for(&self, message_id: &Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(*message_id).or_default().clone()
    }

    fn drop_lock(&self, message_id: &Uuid) {
        self.locks.lock().unwrap().remove(message_id);
    }

    pub async fn claim(
        &self,
        group_id: &Uuid,
        message_id: &Uuid,
        account: &str,
    ) -> Result<ClaimOutcome, error::SystemError> {
        // membership check trước khi đụng tới state
        self.group_repo
            .find_member(group_id, account)
            .await?
            .ok_or_else(|| error::SystemError::forbidden("You are not a member of this group"))?;

        let lock = self.lock_for(message_id);
        let _guard = lock.lock().await;

        // reload trong lock: state có thể đã đổi bởi lượt claim trước
        let message = self
            .group_repo
            .find_message(message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Redpacket not found"))?;

        if message.group_id != *group_id || message.msg_type != MSG_TYPE_REDPACKET {
            return Err(error::SystemError::not_found("Redpacket not found"));
        }

        let mut content: RedpacketContent = serde_json::from_str(&message.content)
            .map_err(|_| error::SystemError::inconsistent("Redpacket state is corrupt"))?;

        let amount = content.claim(account, &mut rand::thread_rng())?;

        let serialized = serde_json::to_string(&content)?;
        self.group_repo.update_message_content(message_id, &serialized).await?;

        if content.is_exhausted() {
            self.drop_lock(message_id);
        }

        Ok(ClaimOutcome { content, amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use crate::modules::group::model::{GroupPersona, HistoryQuery, InsertGroupMessage};
    use crate::modules::group::schema::{
        GroupEntity, GroupMemberEntity, GroupMessageEntity, GroupMessageRow,
    };
    use crate::modules::redpacket::model::RedpacketType;

    /// Fake repo chỉ đủ cho claim path: một group, members cố định,
    /// một message redpacket.
    struct FakeGroupRepo {
        group_id: Uuid,
        members: Vec<String>,
        message: StdMutex<GroupMessageEntity>,
    }

    impl FakeGroupRepo {
        fn with_redpacket(members: &[&str], content: &RedpacketContent) -> Self {
            let group_id = Uuid::now_v7();
            FakeGroupRepo {
                group_id,
                members: members.iter().map(|s| s.to_string()).collect(),
                message: StdMutex::new(GroupMessageEntity {
                    id: Uuid::now_v7(),
                    group_id,
                    sender_type: "user".to_string(),
                    sender_account: members[0].to_string(),
                    sender_name: members[0].to_string(),
                    character_name: None,
                    content: serde_json::to_string(content).unwrap(),
                    msg_type: MSG_TYPE_REDPACKET.to_string(),
                    created_at: 0,
                }),
            }
        }
    }

    #[async_trait::async_trait]
    impl GroupRepository for FakeGroupRepo {
        async fn create_group_with_creator(
            &self,
            _name: &str,
            _avatar: &Option<String>,
            _creator_account: &str,
            _persona: &GroupPersona,
            _now: i64,
        ) -> Result<GroupEntity, error::SystemError> {
            unimplemented!()
        }

        async fn find_group(
            &self,
            _group_id: &Uuid,
        ) -> Result<Option<GroupEntity>, error::SystemError> {
            unimplemented!()
        }

        async fn find_member(
            &self,
            group_id: &Uuid,
            user_account: &str,
        ) -> Result<Option<GroupMemberEntity>, error::SystemError> {
            if *group_id != self.group_id || !self.members.iter().any(|m| m == user_account) {
                return Ok(None);
            }
            Ok(Some(GroupMemberEntity {
                group_id: *group_id,
                user_account: user_account.to_string(),
                character_name: None,
                character_avatar: None,
                character_desc: None,
                joined_at: 0,
            }))
        }

        async fn upsert_member(
            &self,
            _group_id: &Uuid,
            _user_account: &str,
            _persona: &GroupPersona,
            _now: i64,
        ) -> Result<GroupMemberEntity, error::SystemError> {
            unimplemented!()
        }

        async fn update_member_persona(
            &self,
            _group_id: &Uuid,
            _user_account: &str,
            _persona: &GroupPersona,
        ) -> Result<Option<GroupMemberEntity>, error::SystemError> {
            unimplemented!()
        }

        async fn members(
            &self,
            _group_id: &Uuid,
        ) -> Result<Vec<GroupMemberEntity>, error::SystemError> {
            Ok(vec![])
        }

        async fn groups_for(
            &self,
            _user_account: &str,
        ) -> Result<Vec<GroupEntity>, error::SystemError> {
            Ok(vec![])
        }

        async fn insert_message(
            &self,
            _message: &InsertGroupMessage,
            _now: i64,
        ) -> Result<GroupMessageEntity, error::SystemError> {
            unimplemented!()
        }

        async fn find_message(
            &self,
            message_id: &Uuid,
        ) -> Result<Option<GroupMessageEntity>, error::SystemError> {
            let message = self.message.lock().unwrap().clone();
            Ok((message.id == *message_id).then_some(message))
        }

        async fn update_message_content(
            &self,
            _message_id: &Uuid,
            content: &str,
        ) -> Result<(), error::SystemError> {
            self.message.lock().unwrap().content = content.to_string();
            Ok(())
        }

        async fn history(
            &self,
            _group_id: &Uuid,
            _query: HistoryQuery,
        ) -> Result<Vec<GroupMessageRow>, error::SystemError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn concurrent_claims_conserve_money() {
        let content = RedpacketContent::new(1.00, 3, RedpacketType::Lucky);
        let repo = Arc::new(FakeGroupRepo::with_redpacket(
            &["a_wx", "b_wx", "c_wx", "d_wx"],
            &content,
        ));
        let group_id = repo.group_id;
        let message_id = repo.message.lock().unwrap().id;
        let svc = RedpacketService::with_dependencies(repo.clone());

        // 4 lượt claim đồng thời cho redpacket 3 suất
        let mut handles = Vec::new();
        for account in ["a_wx", "b_wx", "c_wx", "d_wx"] {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.claim(&group_id, &message_id, account).await
            }));
        }

        let mut amounts = Vec::new();
        let mut exhausted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) => amounts.push(outcome.amount),
                Err(error::SystemError::Exhausted) => exhausted += 1,
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }

        assert_eq!(amounts.len(), 3);
        assert_eq!(exhausted, 1);
        let total: f64 = amounts.iter().sum();
        assert!(total <= 1.00 + 1e-9);
        assert!(total >= 0.97 - 1e-9);

        // state persisted khớp với kết quả trả về
        let stored: RedpacketContent =
            serde_json::from_str(&repo.message.lock().unwrap().content).unwrap();
        assert_eq!(stored.claimed.len(), 3);
        assert!(stored.is_exhausted());
    }

    #[tokio::test]
    async fn second_claim_by_same_account_fails() {
        let content = RedpacketContent::new(1.00, 3, RedpacketType::Average);
        let repo = Arc::new(FakeGroupRepo::with_redpacket(&["a_wx", "b_wx"], &content));
        let group_id = repo.group_id;
        let message_id = repo.message.lock().unwrap().id;
        let svc = RedpacketService::with_dependencies(repo);

        svc.claim(&group_id, &message_id, "a_wx").await.unwrap();
        let err = svc.claim(&group_id, &message_id, "a_wx").await.unwrap_err();
        assert!(matches!(err, error::SystemError::AlreadyClaimed));
    }

    #[tokio::test]
    async fn claim_requires_membership_and_valid_target() {
        let content = RedpacketContent::new(1.00, 1, RedpacketType::Lucky);
        let repo = Arc::new(FakeGroupRepo::with_redpacket(&["a_wx"], &content));
        let group_id = repo.group_id;
        let message_id = repo.message.lock().unwrap().id;
        let svc = RedpacketService::with_dependencies(repo);

        let err = svc.claim(&group_id, &message_id, "z_wx").await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let err = svc.claim(&group_id, &Uuid::now_v7(), "a_wx").await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }
}
