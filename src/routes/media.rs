use actix_web::{get, web, HttpResponse};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::utils::image::{content_type_for, resolve_media_path};

/// GET /media/{path} - Images des recettes stockées dans MEDIA_ROOT
#[get("/media/{path:.*}")]
pub async fn serve_media(
    path: web::Path<String>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let file = resolve_media_path(&config.media_root, &path.into_inner())
        .ok_or_else(|| ApiError::not_found("File"))?;

    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|_| ApiError::not_found("File"))?;

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&file))
        .body(bytes))
}

pub fn media_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(serve_media);
}
