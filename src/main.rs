use actix::Actor;
use actix_cors::Cors;
use actix_web::{self, App, HttpServer, middleware::Logger, web};
use std::sync::{Arc, LazyLock};

use crate::modules::{
    character::{repository_pg::CharacterRepositoryPg, service::CharacterService},
    friend::{repository_pg::FriendRepositoryPg, service::FriendService},
    group::{repository_pg::GroupRepositoryPg, service::GroupService},
    message::{repository_pg::MessageRepositoryPg, service::DirectMessageService},
    redpacket::service::RedpacketService,
    user::{repository_pg::UserRepositoryPg, service::UserService},
    websocket::{
        events::GetStats,
        handler::websocket_handler,
        server::HubServer,
        session::Services,
    },
};

mod api;
mod configs;
mod constants;
mod modules;
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_target(false).with_thread_ids(true).init();

    tracing::info!("Tracing initialized");
    tracing::info!("Environment variables loaded from .env file");

    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check(
    hub: web::Data<actix::Addr<HubServer>>,
) -> actix_web::Result<web::Json<serde_json::Value>> {
    let stats = hub
        .send(GetStats)
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("hub unavailable"))?;

    tracing::debug!(
        "Health check: {} connection(s), {} account(s) online",
        stats.connections,
        stats.online_accounts
    );

    Ok(web::Json(serde_json::json!({
        "status": "ok",
        "message": "Role-play hub is running",
        "connections": stats.connections,
        "websocket": "/ws",
    })))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // DATABASE_URL thiếu hoặc DB không kết nối được là lỗi fatal lúc khởi động
    let db_pool = configs::connect_database()
        .await
        .map_err(|e| std::io::Error::other(format!("Database connection error: {e}")))?;

    configs::run_migrations(&db_pool)
        .await
        .map_err(|e| std::io::Error::other(format!("Database migration error: {e}")))?;

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let character_repo = Arc::new(CharacterRepositoryPg::new(db_pool.clone()));
    let friend_repo = Arc::new(FriendRepositoryPg::new(db_pool.clone()));
    let message_repo = Arc::new(MessageRepositoryPg::new(db_pool.clone()));
    let group_repo = Arc::new(GroupRepositoryPg::new(db_pool.clone()));

    let services = Services {
        user: UserService::with_dependencies(user_repo),
        character: CharacterService::with_dependencies(character_repo.clone()),
        friend: FriendService::with_dependencies(friend_repo.clone(), character_repo.clone()),
        dm: DirectMessageService::with_dependencies(message_repo, friend_repo),
        group: GroupService::with_dependencies(group_repo.clone(), character_repo.clone()),
        redpacket: RedpacketService::with_dependencies(group_repo),
    };
    let services = web::Data::new(services);

    let hub = HubServer::new(CharacterRepositoryPg::new(db_pool.clone())).start();

    println!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    tracing::info!("Starting hub at http://{}:{}", ENV.ip.as_str(), ENV.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(services.clone())
            .app_data(web::Data::new(hub.clone()))
            .service(health_check)
            // WebSocket endpoint — auth diễn ra bên trong session, không
            // phải ở handshake
            .route("/ws", web::get().to(websocket_handler))
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
