use uuid::Uuid;

use crate::{api::error, modules::message::schema::OfflineMessageEntity};

#[async_trait::async_trait]
pub trait MessageRepository {
    async fn store(
        &self,
        id: &Uuid,
        from_account: &str,
        to_account: &str,
        content: &str,
        created_at: i64,
    ) -> Result<OfflineMessageEntity, error::SystemError>;

    /// Tin chưa delivered cho một account, tăng dần theo created_at.
    async fn pending_for(
        &self,
        to_account: &str,
    ) -> Result<Vec<OfflineMessageEntity>, error::SystemError>;

    /// Đánh dấu delivered trong một câu UPDATE duy nhất.
    async fn mark_delivered(&self, ids: &[Uuid]) -> Result<(), error::SystemError>;
}
