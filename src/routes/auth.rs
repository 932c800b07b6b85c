use actix_web::{post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::user_service::{LoginRequest, UserService};

/// POST /api/auth/token/login/ - Email + mot de passe -> {auth_token} (PUBLIC)
#[post("/token/login/")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let token = UserService::login(db.get_ref(), config.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(token))
}

/// POST /api/auth/token/logout/ - Invalide le token courant (PROTÉGÉE)
#[post("/token/logout/")]
pub async fn logout(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    UserService::logout(db.get_ref(), &auth_user).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(login)
            .service(logout),
    );
}
