use std::sync::Arc;

use validator::Validate;

use crate::ENV;
use crate::api::error;
use crate::modules::user::model::{InsertUser, LoginModel, RegisterModel, UserResponse};
use crate::modules::user::repository::UserRepository;
use crate::modules::user::schema::UserEntity;
use crate::utils::{Claims, hash_password, now_ms, verify_password};

#[derive(Clone)]
pub struct UserService<R>
where
    R: UserRepository + Send + Sync,
{
    repo: Arc<R>,
}

impl<R> UserService<R>
where
    R: UserRepository + Send + Sync,
{
    pub fn with_dependencies(repo: Arc<R>) -> Self {
        UserService { repo }
    }

    pub async fn register(
        &self,
        model: RegisterModel,
    ) -> Result<(String, UserResponse), error::SystemError> {
        model.validate().map_err(|e| error::SystemError::invalid(e.to_string()))?;
        if !model.username_shape_ok() {
            return Err(error::SystemError::invalid(
                "Username may only contain letters, digits and underscores",
            ));
        }

        let new_user = InsertUser {
            username: model.username,
            email: model.email,
            hash_password: hash_password(&model.password)?,
            created_at: now_ms(),
        };

        // Unique violation trên username ánh xạ thành Conflict.
        let entity = self.repo.create(&new_user).await?;
        let token = self.issue_token(&entity)?;

        Ok((token, UserResponse::from(entity)))
    }

    pub async fn login(
        &self,
        model: LoginModel,
    ) -> Result<(String, UserResponse), error::SystemError> {
        let entity = self
            .repo
            .find_by_username(&model.username)
            .await?
            .ok_or_else(|| error::SystemError::auth_rejected("Invalid username or password"))?;

        let valid = verify_password(&entity.hash_password, &model.password)?;
        if !valid {
            return Err(error::SystemError::auth_rejected("Invalid username or password"));
        }

        let last_login = now_ms();
        self.repo.touch_last_login(&entity.id, last_login).await?;

        let token = self.issue_token(&entity)?;
        let entity = UserEntity { last_login: Some(last_login), ..entity };

        Ok((token, UserResponse::from(entity)))
    }

    /// Verify token và nạp user cho bước auth của session.
    pub async fn verify_token(&self, token: &str) -> Result<UserEntity, error::SystemError> {
        let claims = Claims::decode(token, ENV.secret_key.as_ref())
            .map_err(|_| error::SystemError::auth_rejected("Invalid or expired token"))?;

        self.repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| error::SystemError::auth_rejected("Unknown user"))
    }

    fn issue_token(&self, entity: &UserEntity) -> Result<String, error::SystemError> {
        Claims::new(&entity.id, &entity.username, ENV.token_expiration)
            .encode(ENV.secret_key.as_ref())
    }
}
