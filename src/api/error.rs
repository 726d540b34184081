use std::borrow::Cow;

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // jwt errors
    #[error("JWT Error")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    // argon2 errors
    #[error("Hash Error")]
    Hash(#[from] argon2::password_hash::Error),
    // sqlx errors
    #[error("Database Error: {0}")]
    Database(Cow<'static, str>),
    // serde errors
    #[error("JSON Serialization/Deserialization Error")]
    Json(#[from] serde_json::Error),
    #[error("Internal System Error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    // request errors
    #[error("Invalid: {0}")]
    Invalid(Cow<'static, str>),
    #[error("Authentication required")]
    AuthRequired,
    #[error("Auth rejected: {0}")]
    AuthRejected(Cow<'static, str>),
    #[error("Forbidden: {0}")]
    Forbidden(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Conflict: {0}")]
    Conflict(Cow<'static, str>),
    // redpacket errors
    #[error("Redpacket already claimed")]
    AlreadyClaimed,
    #[error("Redpacket exhausted")]
    Exhausted,
    #[error("Redpacket inconsistent: {0}")]
    Inconsistent(Cow<'static, str>),
}

impl SystemError {
    pub fn invalid(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn auth_rejected(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::AuthRejected(msg.into())
    }

    pub fn forbidden(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn inconsistent(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Inconsistent(msg.into())
    }

    /// Message an toàn để gửi xuống client trong frame `error`.
    /// Lỗi hạ tầng không được lộ chi tiết ra ngoài.
    pub fn wire_message(&self) -> String {
        match self {
            SystemError::Invalid(msg)
            | SystemError::AuthRejected(msg)
            | SystemError::Forbidden(msg)
            | SystemError::NotFound(msg)
            | SystemError::Conflict(msg)
            | SystemError::Inconsistent(msg) => msg.to_string(),
            SystemError::AuthRequired => "Authentication required".to_string(),
            SystemError::AlreadyClaimed => "You already claimed this redpacket".to_string(),
            SystemError::Exhausted => "This redpacket has been fully claimed".to_string(),
            _ => {
                log::error!("Internal Server Error: {:?}", self);
                "Internal server error".to_string()
            }
        }
    }
}

fn conflict_message(constraint: Option<&str>) -> Cow<'static, str> {
    let Some(constraint) = constraint else {
        return "Duplicate value".into();
    };

    let field = constraint
        .trim_end_matches("_pkey")
        .trim_end_matches("_key")
        .split('_')
        .next_back()
        .unwrap_or("value");

    let mut chars = field.chars();
    let field = match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Value".to_string(),
    };

    format!("{field} already exists").into()
}

impl From<sqlx::Error> for SystemError {
    fn from(err: sqlx::Error) -> Self {
        log::error!("{:?}", err);
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return SystemError::Conflict(conflict_message(db_err.constraint()));
                }
                Some("42P01") => {
                    return SystemError::not_found("Resource not found");
                }
                _ => {
                    log::error!("Unhandled DB error: {:?}", db_err);
                    return SystemError::Database(db_err.message().to_string().into());
                }
            }
        }
        SystemError::Internal(Box::new(err))
    }
}
