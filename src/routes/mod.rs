pub mod auth;
pub mod health;
pub mod ingredients;
pub mod media;
pub mod recipes;
pub mod tags;
pub mod users;

use actix_web::web;

use crate::error::ApiError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // JSON / query string invalide -> 400 {"detail": ...} comme les autres erreurs
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    );

    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(users::users_routes)
            .configure(tags::tags_routes)
            .configure(ingredients::ingredients_routes)
            .configure(recipes::recipes_routes),
    )
    .configure(media::media_routes);
}
