use uuid::Uuid;

use crate::{
    api::error,
    modules::friend::schema::{FriendRequestEntity, FriendshipEntity},
};

#[async_trait::async_trait]
pub trait FriendRepository {
    /// `(account_a, account_b)` đã được chuẩn hóa thứ tự ở tầng service.
    async fn find_friendship(
        &self,
        account_a: &str,
        account_b: &str,
    ) -> Result<Option<FriendshipEntity>, error::SystemError>;

    async fn create_friendship(
        &self,
        account_a: &str,
        account_b: &str,
        now: i64,
    ) -> Result<(), error::SystemError>;

    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    /// Request pending giữa hai account, theo cả hai chiều.
    async fn find_pending_between(
        &self,
        account_a: &str,
        account_b: &str,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_pending_to(
        &self,
        to_account: &str,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError>;

    async fn create_request(
        &self,
        from_account: &str,
        to_account: &str,
        message: &Option<String>,
        now: i64,
    ) -> Result<FriendRequestEntity, error::SystemError>;

    /// Chuyển trạng thái pending → accepted|rejected đúng một lần.
    /// Trả về `None` nếu request không còn ở trạng thái pending.
    async fn transition_request(
        &self,
        request_id: &Uuid,
        to_status: &str,
        now: i64,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;
}
