use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{revoked_token, users};
use crate::utils::jwt;

/// Structure qui contient les infos de l'utilisateur authentifié
/// Utilisée comme extracteur dans les routes protégées.
/// Pour les routes ouvertes aux anonymes : `Option<AuthUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub is_staff: bool,
    pub jti: String,
    pub expires_at: i64,
}

impl AuthUser {
    /// Auteur de l'objet ou membre du staff
    pub fn can_edit(&self, author_id: i32) -> bool {
        self.is_staff || self.user_id == author_id
    }
}

/// Implémentation de FromRequest pour AuthUser
/// Le token est vérifié puis l'utilisateur relu en BD (banni / supprimé = 401)
impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = extract_token(req);
        let config = req.app_data::<web::Data<AppConfig>>().cloned();
        let db = req.app_data::<web::Data<DatabaseConnection>>().cloned();

        Box::pin(async move {
            let token = token?;
            let (config, db) = match (config, db) {
                (Some(config), Some(db)) => (config, db),
                _ => return Err(ApiError::Internal("App state not configured".to_string())),
            };

            let claims = jwt::verify_token(&token, &config.jwt_secret)
                .map_err(|_| ApiError::Unauthorized("Invalid token.".to_string()))?;

            let revoked = revoked_token::Entity::find_by_id(claims.jti.clone())
                .one(db.get_ref())
                .await?;
            if revoked.is_some() {
                return Err(ApiError::Unauthorized("Invalid token.".to_string()));
            }

            let user = users::Entity::find_by_id(claims.sub)
                .one(db.get_ref())
                .await?
                .filter(|user| user.is_active)
                .ok_or_else(|| {
                    ApiError::Unauthorized("User inactive or deleted.".to_string())
                })?;

            Ok(AuthUser {
                user_id: user.id,
                username: user.username,
                is_staff: user.is_staff,
                jti: claims.jti,
                expires_at: claims.exp,
            })
        })
    }
}

/// Header Authorization: "Token <jwt>" (format du frontend) ou "Bearer <jwt>"
fn extract_token(req: &HttpRequest) -> Result<String, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(ApiError::unauthorized)?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".to_string()))?;

    value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized(
                "Invalid Authorization format (expected: Token <token>)".to_string(),
            )
        })
}
