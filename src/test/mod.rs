#![allow(dead_code)]

#[cfg(test)]
mod tests {
    use actix::Actor;
    use actix_web::{App, test, web};

    use crate::modules::character::repository_pg::CharacterRepositoryPg;
    use crate::modules::websocket::server::HubServer;

    /// Chỉ chạy phần thân khi có DATABASE_URL trỏ tới Postgres thật;
    /// môi trường CI không có DB thì test này là no-op.
    #[actix_web::test]
    async fn test_health_check_endpoint() {
        let pool = sqlx::PgPool::connect(&std::env::var("DATABASE_URL").unwrap_or_default())
            .await
            .ok();

        if let Some(pool) = pool {
            let hub = HubServer::new(CharacterRepositoryPg::new(pool)).start();

            let app = test::init_service(
                App::new().app_data(web::Data::new(hub)).service(crate::health_check),
            )
            .await;
            let req = test::TestRequest::get().uri("/").to_request();
            let resp = test::call_service(&app, req).await;

            assert!(resp.status().is_success());

            let body = test::read_body(resp).await;
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

            assert_eq!(json["status"], "ok");
            assert_eq!(json["websocket"], "/ws");
            assert_eq!(json["connections"], 0);
        }
    }
}
