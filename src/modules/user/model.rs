use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::user::schema::UserEntity;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterModel {
    #[validate(length(min = 3, max = 20, message = "Username must be 3 to 20 characters long"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

impl RegisterModel {
    /// Username chỉ gồm chữ cái, chữ số và dấu gạch dưới.
    pub fn username_shape_ok(&self) -> bool {
        self.username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

pub struct InsertUser {
    pub username: String,
    pub email: Option<String>,
    pub hash_password: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: Option<String>,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        UserResponse {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            created_at: entity.created_at,
            last_login: entity.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn model(username: &str, password: &str) -> RegisterModel {
        RegisterModel { username: username.to_string(), email: None, password: password.to_string() }
    }

    #[test]
    fn username_shape() {
        assert!(model("alice_01", "pw123456").username_shape_ok());
        assert!(!model("alice!", "pw123456").username_shape_ok());
        assert!(!model("ali ce", "pw123456").username_shape_ok());
    }

    #[test]
    fn register_validation_bounds() {
        assert!(model("alice", "pw123456").validate().is_ok());
        assert!(model("al", "pw123456").validate().is_err());
        assert!(model("a".repeat(21).as_str(), "pw123456").validate().is_err());
        assert!(model("alice", "pw123").validate().is_err());
    }
}
