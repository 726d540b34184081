pub struct Env {
    pub secret_key: String,
    pub token_expiration: u64,
    pub database_url: String,
    pub ip: String,
    pub port: u16,
}

/// Token mặc định sống 30 ngày (giây).
const DEFAULT_TOKEN_EXPIRATION: u64 = 30 * 24 * 60 * 60;

impl Env {
    fn new() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");

        let secret_key =
            std::env::var("SECRET_KEY").unwrap_or_else(|_| "roleplay-hub-dev-secret".to_string());

        let token_expiration = std::env::var("TOKEN_EXPIRATION")
            .unwrap_or_else(|_| DEFAULT_TOKEN_EXPIRATION.to_string())
            .parse::<u64>()
            .expect("TOKEN_EXPIRATION must be a valid u64 integer");

        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        Env { secret_key, token_expiration, database_url, ip, port }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
