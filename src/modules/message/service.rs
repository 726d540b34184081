use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::model::ordered_pair;
use crate::modules::friend::repository::FriendRepository;
use crate::modules::message::model::DirectMessage;
use crate::modules::message::repository::MessageRepository;
use crate::utils::now_ms;

#[derive(Clone)]
pub struct DirectMessageService<M, F>
where
    M: MessageRepository + Send + Sync,
    F: FriendRepository + Send + Sync,
{
    message_repo: Arc<M>,
    friend_repo: Arc<F>,
}

impl<M, F> DirectMessageService<M, F>
where
    M: MessageRepository + Send + Sync,
    F: FriendRepository + Send + Sync,
{
    pub fn with_dependencies(message_repo: Arc<M>, friend_repo: Arc<F>) -> Self {
        DirectMessageService { message_repo, friend_repo }
    }

    /// Validate và dựng tin nhắn outgoing. Chưa persist gì cả: caller push
    /// qua registry trước, chỉ khi người nhận không reachable mới `queue`.
    pub async fn outgoing(
        &self,
        from_account: &str,
        to_account: &str,
        content: &str,
    ) -> Result<DirectMessage, error::SystemError> {
        if content.is_empty() {
            return Err(error::SystemError::invalid("Message content cannot be empty"));
        }

        let (a, b) = ordered_pair(from_account, to_account);
        if self.friend_repo.find_friendship(a, b).await?.is_none() {
            return Err(error::SystemError::forbidden("You can only message friends"));
        }

        Ok(DirectMessage {
            id: Uuid::now_v7(),
            from_wx_account: from_account.to_string(),
            to_wx_account: to_account.to_string(),
            content: content.to_string(),
            created_at: now_ms(),
        })
    }

    /// Persist tin nhắn cho người nhận đang offline.
    pub async fn queue(&self, message: &DirectMessage) -> Result<(), error::SystemError> {
        self.message_repo
            .store(
                &message.id,
                &message.from_wx_account,
                &message.to_wx_account,
                &message.content,
                message.created_at,
            )
            .await?;
        Ok(())
    }

    /// Tin đang chờ cho một account, tăng dần theo created_at.
    /// Caller push hết rồi mới gọi `mark_delivered` — không bao giờ đánh dấu
    /// delivered mà chưa thử push.
    pub async fn pending_for(
        &self,
        to_account: &str,
    ) -> Result<Vec<DirectMessage>, error::SystemError> {
        let messages = self.message_repo.pending_for(to_account).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    pub async fn mark_delivered(&self, ids: &[Uuid]) -> Result<(), error::SystemError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.message_repo.mark_delivered(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::modules::friend::schema::{FriendRequestEntity, FriendshipEntity};
    use crate::modules::message::schema::OfflineMessageEntity;

    #[derive(Default)]
    struct FakeMessageRepo {
        messages: Mutex<Vec<OfflineMessageEntity>>,
    }

    #[async_trait::async_trait]
    impl MessageRepository for FakeMessageRepo {
        async fn store(
            &self,
            id: &Uuid,
            from_account: &str,
            to_account: &str,
            content: &str,
            created_at: i64,
        ) -> Result<OfflineMessageEntity, error::SystemError> {
            let entity = OfflineMessageEntity {
                id: *id,
                from_account: from_account.to_string(),
                to_account: to_account.to_string(),
                content: content.to_string(),
                created_at,
                delivered: false,
            };
            self.messages.lock().unwrap().push(entity.clone());
            Ok(entity)
        }

        async fn pending_for(
            &self,
            to_account: &str,
        ) -> Result<Vec<OfflineMessageEntity>, error::SystemError> {
            let mut pending: Vec<_> = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.to_account == to_account && !m.delivered)
                .cloned()
                .collect();
            pending.sort_by_key(|m| m.created_at);
            Ok(pending)
        }

        async fn mark_delivered(&self, ids: &[Uuid]) -> Result<(), error::SystemError> {
            let mut messages = self.messages.lock().unwrap();
            for message in messages.iter_mut() {
                if ids.contains(&message.id) {
                    message.delivered = true;
                }
            }
            Ok(())
        }
    }

    struct FakeFriendRepo {
        friendships: Mutex<HashMap<(String, String), i64>>,
    }

    impl FakeFriendRepo {
        fn with_friends(pairs: &[(&str, &str)]) -> Self {
            let map = pairs
                .iter()
                .map(|(a, b)| {
                    let (a, b) = ordered_pair(a, b);
                    ((a.to_string(), b.to_string()), 0)
                })
                .collect();
            FakeFriendRepo { friendships: Mutex::new(map) }
        }
    }

    #[async_trait::async_trait]
    impl FriendRepository for FakeFriendRepo {
        async fn find_friendship(
            &self,
            account_a: &str,
            account_b: &str,
        ) -> Result<Option<FriendshipEntity>, error::SystemError> {
            let map = self.friendships.lock().unwrap();
            Ok(map.get(&(account_a.to_string(), account_b.to_string())).map(|&created_at| {
                FriendshipEntity {
                    account_a: account_a.to_string(),
                    account_b: account_b.to_string(),
                    created_at,
                }
            }))
        }

        async fn create_friendship(
            &self,
            _account_a: &str,
            _account_b: &str,
            _now: i64,
        ) -> Result<(), error::SystemError> {
            Ok(())
        }

        async fn find_request_by_id(
            &self,
            _request_id: &Uuid,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(None)
        }

        async fn find_pending_between(
            &self,
            _account_a: &str,
            _account_b: &str,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(None)
        }

        async fn find_pending_to(
            &self,
            _to_account: &str,
        ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
            Ok(vec![])
        }

        async fn create_request(
            &self,
            _from_account: &str,
            _to_account: &str,
            _message: &Option<String>,
            _now: i64,
        ) -> Result<FriendRequestEntity, error::SystemError> {
            unimplemented!()
        }

        async fn transition_request(
            &self,
            _request_id: &Uuid,
            _to_status: &str,
            _now: i64,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(None)
        }
    }

    fn service() -> DirectMessageService<FakeMessageRepo, FakeFriendRepo> {
        DirectMessageService::with_dependencies(
            Arc::new(FakeMessageRepo::default()),
            Arc::new(FakeFriendRepo::with_friends(&[("a_wx", "b_wx")])),
        )
    }

    #[tokio::test]
    async fn outgoing_requires_friendship() {
        let svc = service();

        assert!(svc.outgoing("a_wx", "b_wx", "hi").await.is_ok());
        // chiều ngược lại cũng là bạn (quan hệ không thứ tự)
        assert!(svc.outgoing("b_wx", "a_wx", "hi").await.is_ok());

        let err = svc.outgoing("a_wx", "c_wx", "hi").await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let err = svc.outgoing("a_wx", "b_wx", "").await.unwrap_err();
        assert!(matches!(err, error::SystemError::Invalid(_)));
    }

    #[tokio::test]
    async fn offline_queue_replays_in_order_then_drains() {
        let svc = service();

        let m1 = svc.outgoing("a_wx", "b_wx", "first").await.unwrap();
        svc.queue(&m1).await.unwrap();
        let mut m2 = svc.outgoing("a_wx", "b_wx", "second").await.unwrap();
        m2.created_at = m1.created_at + 1;
        svc.queue(&m2).await.unwrap();

        let pending = svc.pending_for("b_wx").await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].content, "first");
        assert_eq!(pending[1].content, "second");

        let ids: Vec<Uuid> = pending.iter().map(|m| m.id).collect();
        svc.mark_delivered(&ids).await.unwrap();

        // sau khi delivered thì không còn pending (S2: zero pending)
        assert!(svc.pending_for("b_wx").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_untouched_until_marked() {
        let svc = service();

        let m = svc.outgoing("a_wx", "b_wx", "hi").await.unwrap();
        svc.queue(&m).await.unwrap();

        // đọc pending nhiều lần không tự đánh dấu delivered
        assert_eq!(svc.pending_for("b_wx").await.unwrap().len(), 1);
        assert_eq!(svc.pending_for("b_wx").await.unwrap().len(), 1);
    }
}
