use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use sea_orm::DatabaseConnection;

use crate::models::health::HealthResponse;

#[get("/health")]
pub async fn health_check(db: web::Data<DatabaseConnection>) -> HttpResponse {
    let database = match db.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "database ping failed");
            "unreachable"
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        database,
        time: Utc::now(),
    })
}
