use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::character::model::CharacterBrief;
use crate::modules::character::repository::CharacterRepository;
use crate::modules::friend::model::{FriendRequestResponse, ordered_pair};
use crate::modules::friend::repository::FriendRepository;
use crate::modules::friend::schema::{FriendRequestEntity, RequestStatus};
use crate::utils::now_ms;

/// Kết quả accept: hai chiều đều cần profile của phía bên kia để push.
#[derive(Debug)]
pub struct AcceptedRequest {
    pub request: FriendRequestEntity,
    pub from_character: Option<CharacterBrief>,
    pub to_character: Option<CharacterBrief>,
}

#[derive(Clone)]
pub struct FriendService<F, C>
where
    F: FriendRepository + Send + Sync,
    C: CharacterRepository + Send + Sync,
{
    friend_repo: Arc<F>,
    character_repo: Arc<C>,
}

impl<F, C> FriendService<F, C>
where
    F: FriendRepository + Send + Sync,
    C: CharacterRepository + Send + Sync,
{
    pub fn with_dependencies(friend_repo: Arc<F>, character_repo: Arc<C>) -> Self {
        FriendService { friend_repo, character_repo }
    }

    #[allow(dead_code)]
    pub async fn are_friends(&self, a: &str, b: &str) -> Result<bool, error::SystemError> {
        let (a, b) = ordered_pair(a, b);
        Ok(self.friend_repo.find_friendship(a, b).await?.is_some())
    }

    pub async fn send_request(
        &self,
        from_account: &str,
        to_account: &str,
        message: Option<String>,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        if from_account == to_account {
            return Err(error::SystemError::invalid("Cannot send friend request to yourself"));
        }

        if self.character_repo.find_by_account(to_account).await?.is_none() {
            return Err(error::SystemError::not_found("Target account not found"));
        }

        let (a, b) = ordered_pair(from_account, to_account);
        if self.friend_repo.find_friendship(a, b).await?.is_some() {
            return Err(error::SystemError::conflict("You are already friends"));
        }

        if self.friend_repo.find_pending_between(from_account, to_account).await?.is_some() {
            return Err(error::SystemError::conflict("Friend request already exists"));
        }

        self.friend_repo.create_request(from_account, to_account, &message, now_ms()).await
    }

    /// Accept: chuyển trạng thái đúng một lần rồi chèn friendship idempotent.
    /// `owner_account` phải là to_account của request.
    pub async fn accept_request(
        &self,
        request_id: &Uuid,
        owner_accounts: &[String],
    ) -> Result<AcceptedRequest, error::SystemError> {
        let request = self
            .friend_repo
            .find_request_by_id(request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if !owner_accounts.contains(&request.to_account) {
            return Err(error::SystemError::forbidden(
                "You are not allowed to accept this friend request",
            ));
        }

        let now = now_ms();
        let request = self
            .friend_repo
            .transition_request(request_id, RequestStatus::Accepted.as_str(), now)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request already handled"))?;

        let (a, b) = ordered_pair(&request.from_account, &request.to_account);
        self.friend_repo.create_friendship(a, b, now).await?;

        let from_character =
            self.character_repo.find_by_account(&request.from_account).await?.map(Into::into);
        let to_character =
            self.character_repo.find_by_account(&request.to_account).await?.map(Into::into);

        Ok(AcceptedRequest { request, from_character, to_character })
    }

    /// Reject: chuyển trạng thái, không thông báo cho ai.
    pub async fn reject_request(
        &self,
        request_id: &Uuid,
        owner_accounts: &[String],
    ) -> Result<(), error::SystemError> {
        let request = self
            .friend_repo
            .find_request_by_id(request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if !owner_accounts.contains(&request.to_account) {
            return Err(error::SystemError::forbidden(
                "You are not allowed to reject this friend request",
            ));
        }

        self.friend_repo
            .transition_request(request_id, RequestStatus::Rejected.as_str(), now_ms())
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request already handled"))?;

        Ok(())
    }

    pub async fn pending_for(
        &self,
        to_account: &str,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let requests = self.friend_repo.find_pending_to(to_account).await?;
        if requests.is_empty() {
            return Ok(vec![]);
        }

        let from_accounts: Vec<String> =
            requests.iter().map(|r| r.from_account.clone()).collect();
        let characters = self.character_repo.find_by_accounts(&from_accounts).await?;

        Ok(requests
            .into_iter()
            .map(|r| {
                let brief = characters
                    .iter()
                    .find(|c| c.wx_account == r.from_account)
                    .cloned()
                    .map(Into::into);
                FriendRequestResponse::from_entity(r, brief)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::modules::character::model::BringOnline;
    use crate::modules::character::schema::CharacterEntity;
    use crate::modules::friend::schema::FriendshipEntity;

    #[derive(Default)]
    struct FakeFriendRepo {
        friendships: Mutex<HashMap<(String, String), i64>>,
        requests: Mutex<Vec<FriendRequestEntity>>,
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
            account_a: &str,
            account_b: &str,
            now: i64,
        ) -> Result<(), error::SystemError> {
            self.friendships
                .lock()
                .unwrap()
                .entry((account_a.to_string(), account_b.to_string()))
                .or_insert(now);
            Ok(())
        }

        async fn find_request_by_id(
            &self,
            request_id: &Uuid,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(self.requests.lock().unwrap().iter().find(|r| r.id == *request_id).cloned())
        }

        async fn find_pending_between(
            &self,
            account_a: &str,
            account_b: &str,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| {
                    r.status == "pending"
                        && ((r.from_account == account_a && r.to_account == account_b)
                            || (r.from_account == account_b && r.to_account == account_a))
                })
                .cloned())
        }

        async fn find_pending_to(
            &self,
            to_account: &str,
        ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
            let mut pending: Vec<_> = self
                .requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.to_account == to_account && r.status == "pending")
                .cloned()
                .collect();
            pending.sort_by_key(|r| r.created_at);
            Ok(pending)
        }

        async fn create_request(
            &self,
            from_account: &str,
            to_account: &str,
            message: &Option<String>,
            now: i64,
        ) -> Result<FriendRequestEntity, error::SystemError> {
            let request = FriendRequestEntity {
                id: Uuid::now_v7(),
                from_account: from_account.to_string(),
                to_account: to_account.to_string(),
                message: message.clone(),
                status: "pending".to_string(),
                created_at: now,
                updated_at: now,
            };
            self.requests.lock().unwrap().push(request.clone());
            Ok(request)
        }

        async fn transition_request(
            &self,
            request_id: &Uuid,
            to_status: &str,
            now: i64,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            let mut requests = self.requests.lock().unwrap();
            let Some(request) =
                requests.iter_mut().find(|r| r.id == *request_id && r.status == "pending")
            else {
                return Ok(None);
            };
            request.status = to_status.to_string();
            request.updated_at = now;
            Ok(Some(request.clone()))
        }
    }

    struct FakeCharacterRepo {
        accounts: Mutex<HashMap<String, CharacterEntity>>,
    }

    impl FakeCharacterRepo {
        fn with_accounts(accounts: &[&str]) -> Self {
            let map = accounts
                .iter()
                .map(|a| {
                    (
                        a.to_string(),
                        CharacterEntity {
                            id: Uuid::now_v7(),
                            user_id: Uuid::now_v7(),
                            wx_account: a.to_string(),
                            nickname: a.to_uppercase(),
                            avatar: None,
                            bio: None,
                            is_online: false,
                            last_seen: None,
                            created_at: 0,
                        },
                    )
                })
                .collect();
            FakeCharacterRepo { accounts: Mutex::new(map) }
        }
    }

    #[async_trait::async_trait]
    impl CharacterRepository for FakeCharacterRepo {
        async fn find_by_account(
            &self,
            wx_account: &str,
        ) -> Result<Option<CharacterEntity>, error::SystemError> {
            Ok(self.accounts.lock().unwrap().get(wx_account).cloned())
        }

        async fn find_by_account_ci(
            &self,
            wx_account: &str,
        ) -> Result<Option<CharacterEntity>, error::SystemError> {
            self.find_by_account(&wx_account.to_lowercase()).await
        }

        async fn find_by_accounts(
            &self,
            accounts: &[String],
        ) -> Result<Vec<CharacterEntity>, error::SystemError> {
            let map = self.accounts.lock().unwrap();
            Ok(accounts.iter().filter_map(|a| map.get(a).cloned()).collect())
        }

        async fn find_by_user(
            &self,
            _user_id: &Uuid,
        ) -> Result<Vec<CharacterEntity>, error::SystemError> {
            Ok(vec![])
        }

        async fn find_online_by_user(
            &self,
            _user_id: &Uuid,
        ) -> Result<Vec<CharacterEntity>, error::SystemError> {
            Ok(vec![])
        }

        async fn upsert_online(
            &self,
            _user_id: &Uuid,
            _profile: &BringOnline,
            _now: i64,
        ) -> Result<Option<CharacterEntity>, error::SystemError> {
            unimplemented!()
        }

        async fn create(
            &self,
            _user_id: &Uuid,
            _profile: &BringOnline,
            _is_online: bool,
            _now: i64,
        ) -> Result<CharacterEntity, error::SystemError> {
            unimplemented!()
        }

        async fn set_offline(
            &self,
            _wx_account: &str,
            _last_seen: i64,
        ) -> Result<(), error::SystemError> {
            Ok(())
        }

        async fn set_offline_many(
            &self,
            _accounts: &[String],
            _last_seen: i64,
        ) -> Result<(), error::SystemError> {
            Ok(())
        }
    }

    fn service() -> FriendService<FakeFriendRepo, FakeCharacterRepo> {
        FriendService::with_dependencies(
            Arc::new(FakeFriendRepo::default()),
            Arc::new(FakeCharacterRepo::with_accounts(&["a_wx", "b_wx", "c_wx"])),
        )
    }

    #[tokio::test]
    async fn request_lifecycle_accept_once() {
        let svc = service();

        let request = svc.send_request("a_wx", "b_wx", Some("hi".to_string())).await.unwrap();
        assert_eq!(request.status, "pending");

        // pending hiển thị ở phía người nhận
        let pending = svc.pending_for("b_wx").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].from_wx_account, "a_wx");
        assert_eq!(pending[0].from_character.as_ref().unwrap().nickname, "A_WX");

        let owned = vec!["b_wx".to_string()];
        let accepted = svc.accept_request(&request.id, &owned).await.unwrap();
        assert_eq!(accepted.request.status, "accepted");

        // friendship đối xứng: tra từ cả hai phía đều thấy
        assert!(svc.are_friends("a_wx", "b_wx").await.unwrap());
        assert!(svc.are_friends("b_wx", "a_wx").await.unwrap());

        // accept lần hai phải lỗi
        let err = svc.accept_request(&request.id, &owned).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn request_rejected_silently() {
        let svc = service();
        let request = svc.send_request("a_wx", "b_wx", None).await.unwrap();

        let owned = vec!["b_wx".to_string()];
        svc.reject_request(&request.id, &owned).await.unwrap();
        assert!(!svc.are_friends("a_wx", "b_wx").await.unwrap());

        // reject xong thì accept phải lỗi
        let err = svc.accept_request(&request.id, &owned).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_and_existing_friend_guards() {
        let svc = service();

        let request = svc.send_request("a_wx", "b_wx", None).await.unwrap();

        // pending trùng (kể cả chiều ngược lại) bị chặn
        let err = svc.send_request("a_wx", "b_wx", None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Conflict(_)));
        let err = svc.send_request("b_wx", "a_wx", None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Conflict(_)));

        svc.accept_request(&request.id, &["b_wx".to_string()]).await.unwrap();

        // đã là bạn thì không gửi lại được
        let err = svc.send_request("b_wx", "a_wx", None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Conflict(_)));

        // target không tồn tại
        let err = svc.send_request("a_wx", "ghost", None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));

        // tự gửi cho mình
        let err = svc.send_request("a_wx", "a_wx", None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Invalid(_)));
    }

    #[tokio::test]
    async fn accept_requires_ownership_of_target() {
        let svc = service();
        let request = svc.send_request("a_wx", "b_wx", None).await.unwrap();

        let err = svc.accept_request(&request.id, &["c_wx".to_string()]).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
    }
}
