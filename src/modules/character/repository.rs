use uuid::Uuid;

use crate::{
    api::error,
    modules::character::{model::BringOnline, schema::CharacterEntity},
};

#[async_trait::async_trait]
pub trait CharacterRepository {
    async fn find_by_account(
        &self,
        wx_account: &str,
    ) -> Result<Option<CharacterEntity>, error::SystemError>;

    /// Tra cứu theo account, không phân biệt hoa thường (cho search).
    async fn find_by_account_ci(
        &self,
        wx_account: &str,
    ) -> Result<Option<CharacterEntity>, error::SystemError>;

    async fn find_by_accounts(
        &self,
        accounts: &[String],
    ) -> Result<Vec<CharacterEntity>, error::SystemError>;

    async fn find_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<CharacterEntity>, error::SystemError>;

    async fn find_online_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<CharacterEntity>, error::SystemError>;

    /// Upsert nhân vật với `is_online = TRUE`. Trả về `None` nếu account
    /// đã thuộc về user khác (điều kiện owner nằm trong câu UPDATE).
    async fn upsert_online(
        &self,
        user_id: &Uuid,
        profile: &BringOnline,
        now: i64,
    ) -> Result<Option<CharacterEntity>, error::SystemError>;

    async fn create(
        &self,
        user_id: &Uuid,
        profile: &BringOnline,
        is_online: bool,
        now: i64,
    ) -> Result<CharacterEntity, error::SystemError>;

    async fn set_offline(&self, wx_account: &str, last_seen: i64)
    -> Result<(), error::SystemError>;

    async fn set_offline_many(
        &self,
        accounts: &[String],
        last_seen: i64,
    ) -> Result<(), error::SystemError>;
}
