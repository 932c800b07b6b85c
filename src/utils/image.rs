// Stockage des images de recettes envoyées en data URI base64
// ("data:image/png;base64,iVBOR...") dans MEDIA_ROOT/recipe_images/.
// Chaque image est décodée puis redimensionnée en 500x300 avant écriture.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::ImageFormat;
use image::imageops::FilterType;
use uuid::Uuid;

use crate::error::ApiError;

pub const RECIPE_IMAGES_DIR: &str = "recipe_images";
pub const MEDIA_URL: &str = "/media/";
pub const RECIPE_IMAGE_SIZE: (u32, u32) = (500, 300);

fn invalid_image() -> ApiError {
    ApiError::field("image", "Upload a valid base64 encoded image.")
}

/// Décode le data URI et écrit le fichier. Retourne le chemin relatif
/// à MEDIA_ROOT, c'est lui qui est stocké en BD.
pub async fn save_base64_image(data_uri: &str, media_root: &Path) -> Result<String, ApiError> {
    let (format, bytes) = decode_data_uri(data_uri)?;
    let extension = format.extensions_str().first().copied().unwrap_or("img");

    let bytes = tokio::task::spawn_blocking(move || resize_image(&bytes, format))
        .await
        .map_err(|e| ApiError::Internal(format!("Image task failed: {}", e)))??;

    let dir = media_root.join(RECIPE_IMAGES_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create media dir: {}", e)))?;

    let relative = format!("{}/{}.{}", RECIPE_IMAGES_DIR, Uuid::new_v4(), extension);
    tokio::fs::write(media_root.join(&relative), bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to write image: {}", e)))?;

    Ok(relative)
}

/// Suppression best-effort : une image orpheline n'empêche pas la requête
pub async fn remove_image(relative: &str, media_root: &Path) {
    if let Some(path) = resolve_media_path(media_root, relative) {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove image");
        }
    }
}

/// URL publique d'une image stockée
pub fn image_url(relative: &str) -> String {
    format!("{}{}", MEDIA_URL, relative)
}

/// Chemin absolu d'un fichier média, `None` si le chemin sort de MEDIA_ROOT
pub fn resolve_media_path(media_root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(media_root.join(relative))
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn decode_data_uri(data_uri: &str) -> Result<(ImageFormat, Vec<u8>), ApiError> {
    let (header, payload) = data_uri.split_once(";base64,").ok_or_else(invalid_image)?;
    let mime = header.strip_prefix("data:").ok_or_else(invalid_image)?;

    let format = match mime {
        "image/png" => ImageFormat::Png,
        "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
        "image/gif" => ImageFormat::Gif,
        "image/webp" => ImageFormat::WebP,
        _ => return Err(invalid_image()),
    };

    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid_image())?;
    if bytes.is_empty() {
        return Err(invalid_image());
    }

    Ok((format, bytes))
}

/// Les octets doivent être une vraie image du format annoncé
fn resize_image(bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>, ApiError> {
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|_| invalid_image())?;

    let (width, height) = RECIPE_IMAGE_SIZE;
    let resized = decoded.resize_exact(width, height, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, format)
        .map_err(|e| ApiError::Internal(format!("Failed to encode image: {}", e)))?;
    Ok(out.into_inner())
}
