use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::character::model::BringOnline;
use crate::modules::character::repository::CharacterRepository;
use crate::modules::character::schema::CharacterEntity;
use crate::utils::now_ms;

/// Avatar nhân vật vượt ngưỡng này (ký tự) bị xóa trắng khi go_online,
/// không cắt ngắn.
pub const CHARACTER_AVATAR_MAX_CHARS: usize = 10_000;

#[derive(Clone)]
pub struct CharacterService<R>
where
    R: CharacterRepository + Send + Sync,
{
    repo: Arc<R>,
}

impl<R> CharacterService<R>
where
    R: CharacterRepository + Send + Sync,
{
    pub fn with_dependencies(repo: Arc<R>) -> Self {
        CharacterService { repo }
    }

    /// Upsert nhân vật và bật cờ online. `Forbidden` nếu account đã thuộc
    /// user khác. Cờ `is_online` trong DB chỉ là trạng thái persisted cuối;
    /// routing luôn dựa vào Presence Registry.
    pub async fn bring_online(
        &self,
        user_id: &Uuid,
        mut profile: BringOnline,
    ) -> Result<CharacterEntity, error::SystemError> {
        if profile.wx_account.trim().is_empty() {
            return Err(error::SystemError::invalid("Account cannot be empty"));
        }
        if profile.nickname.trim().is_empty() {
            return Err(error::SystemError::invalid("Nickname cannot be empty"));
        }

        if profile.avatar.as_ref().is_some_and(|a| a.chars().count() > CHARACTER_AVATAR_MAX_CHARS) {
            profile.avatar = None;
        }

        self.repo
            .upsert_online(user_id, &profile, now_ms())
            .await?
            .ok_or_else(|| error::SystemError::forbidden("Account is owned by another user"))
    }

    /// Tạo nhân vật mới (đã online trên session hiện tại).
    /// Unique violation trên wx_account ánh xạ thành Conflict.
    pub async fn register(
        &self,
        user_id: &Uuid,
        mut profile: BringOnline,
    ) -> Result<CharacterEntity, error::SystemError> {
        if profile.wx_account.trim().is_empty() {
            return Err(error::SystemError::invalid("Account cannot be empty"));
        }
        if profile.nickname.trim().is_empty() {
            return Err(error::SystemError::invalid("Nickname cannot be empty"));
        }

        if profile.avatar.as_ref().is_some_and(|a| a.chars().count() > CHARACTER_AVATAR_MAX_CHARS) {
            profile.avatar = None;
        }

        self.repo.create(user_id, &profile, true, now_ms()).await
    }

    pub async fn bring_offline(&self, wx_account: &str) -> Result<(), error::SystemError> {
        self.repo.set_offline(wx_account, now_ms()).await
    }

    pub async fn mark_offline_many(&self, accounts: &[String]) -> Result<(), error::SystemError> {
        if accounts.is_empty() {
            return Ok(());
        }
        self.repo.set_offline_many(accounts, now_ms()).await
    }

    pub async fn find_by_account(
        &self,
        wx_account: &str,
    ) -> Result<Option<CharacterEntity>, error::SystemError> {
        self.repo.find_by_account(wx_account).await
    }

    pub async fn search(
        &self,
        wx_account: &str,
    ) -> Result<Option<CharacterEntity>, error::SystemError> {
        self.repo.find_by_account_ci(wx_account).await
    }

    pub async fn find_by_accounts(
        &self,
        accounts: &[String],
    ) -> Result<Vec<CharacterEntity>, error::SystemError> {
        if accounts.is_empty() {
            return Ok(vec![]);
        }
        self.repo.find_by_accounts(accounts).await
    }

    pub async fn find_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<CharacterEntity>, error::SystemError> {
        self.repo.find_by_user(user_id).await
    }

    pub async fn online_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<CharacterEntity>, error::SystemError> {
        self.repo.find_online_by_user(user_id).await
    }
}
