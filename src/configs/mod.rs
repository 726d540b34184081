use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{ENV, api::error};

pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let database_url = &ENV.database_url;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_slow_threshold(std::time::Duration::from_secs(3))
        .connect(database_url)
        .await?;
    Ok(pool)
}

const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username VARCHAR(20) NOT NULL UNIQUE,
        email TEXT,
        hash_password TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        last_login BIGINT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS characters (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        wx_account TEXT NOT NULL UNIQUE,
        nickname TEXT NOT NULL,
        avatar TEXT,
        bio TEXT,
        is_online BOOLEAN NOT NULL DEFAULT FALSE,
        last_seen BIGINT,
        created_at BIGINT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_characters_account_ci ON characters (lower(wx_account))",
    r#"
    CREATE TABLE IF NOT EXISTS friendships (
        account_a TEXT NOT NULL,
        account_b TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        PRIMARY KEY (account_a, account_b)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS friend_requests (
        id UUID PRIMARY KEY,
        from_account TEXT NOT NULL,
        to_account TEXT NOT NULL,
        message TEXT,
        status VARCHAR(16) NOT NULL DEFAULT 'pending',
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_friend_requests_pending
        ON friend_requests (to_account) WHERE status = 'pending'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS offline_messages (
        id UUID PRIMARY KEY,
        from_account TEXT NOT NULL,
        to_account TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at BIGINT NOT NULL,
        delivered BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_offline_messages_pending
        ON offline_messages (to_account, created_at) WHERE NOT delivered
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS online_groups (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        avatar TEXT,
        creator_account TEXT NOT NULL,
        created_at BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_members (
        group_id UUID NOT NULL,
        user_account TEXT NOT NULL,
        character_name TEXT,
        character_avatar TEXT,
        character_desc TEXT,
        joined_at BIGINT NOT NULL,
        PRIMARY KEY (group_id, user_account)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_messages (
        id UUID PRIMARY KEY,
        group_id UUID NOT NULL,
        sender_type VARCHAR(16) NOT NULL,
        sender_account TEXT NOT NULL,
        sender_name TEXT NOT NULL,
        character_name TEXT,
        content TEXT NOT NULL,
        msg_type VARCHAR(16) NOT NULL,
        created_at BIGINT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_group_messages_group_time ON group_messages (group_id, created_at)",
];

// Nới rộng các cột nội dung/avatar cũ lên TEXT. Chạy lại nhiều lần vô hại.
const WIDEN_COLUMNS: &[&str] = &[
    "ALTER TABLE offline_messages ALTER COLUMN content TYPE TEXT",
    "ALTER TABLE group_messages ALTER COLUMN content TYPE TEXT",
    "ALTER TABLE group_members ALTER COLUMN character_avatar TYPE TEXT",
];

const DROP_GROUP_TABLES: &[&str] = &[
    "DROP TABLE IF EXISTS group_messages",
    "DROP TABLE IF EXISTS group_members",
    "DROP TABLE IF EXISTS online_groups",
];

/// Khởi tạo schema idempotent.
///
/// Riêng bộ ba bảng group chat: nếu bảng `group_members` tồn tại nhưng cột
/// `character_avatar` thiếu hoặc sai kiểu thì drop cả ba bảng và tạo lại.
/// Lịch sử group chat chưa được coi là durable qua các lần migrate;
/// lịch sử tin nhắn trực tiếp thì có, không bao giờ bị drop.
pub async fn run_migrations(pool: &PgPool) -> Result<(), error::SystemError> {
    repair_group_tables_if_needed(pool).await?;

    for stmt in CREATE_TABLES {
        sqlx::query(stmt).execute(pool).await?;
    }

    for stmt in WIDEN_COLUMNS {
        sqlx::query(stmt).execute(pool).await?;
    }

    tracing::info!("Database schema ready");
    Ok(())
}

async fn repair_group_tables_if_needed(pool: &PgPool) -> Result<(), error::SystemError> {
    let table_exists: Option<(String,)> = sqlx::query_as(
        "SELECT table_name FROM information_schema.tables
         WHERE table_schema = current_schema() AND table_name = 'group_members'",
    )
    .fetch_optional(pool)
    .await?;

    if table_exists.is_none() {
        return Ok(());
    }

    let avatar_type: Option<(String,)> = sqlx::query_as(
        "SELECT data_type FROM information_schema.columns
         WHERE table_schema = current_schema()
           AND table_name = 'group_members' AND column_name = 'character_avatar'",
    )
    .fetch_optional(pool)
    .await?;

    let ok = matches!(
        avatar_type.as_ref().map(|(t,)| t.as_str()),
        Some("text") | Some("character varying")
    );
    if ok {
        return Ok(());
    }

    tracing::warn!(
        "group_members.character_avatar missing or mistyped ({:?}), rebuilding group chat tables",
        avatar_type.map(|(t,)| t)
    );

    for stmt in DROP_GROUP_TABLES {
        sqlx::query(stmt).execute(pool).await?;
    }

    Ok(())
}
