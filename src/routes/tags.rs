use std::sync::LazyLock;

use actix_web::{get, post, web, HttpResponse};
use regex::Regex;
use sea_orm::*;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::tag::{self, ActiveModel as TagActiveModel, Entity as Tag};
use crate::services::relation_service::conflict_on_unique;
use crate::utils::validators::{hex_color, OneOfTwoValidator};

static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[-a-z0-9_]+$").expect("static regex"));

// DTO pour la création d'un tag (staff)
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub color: String,
    #[validate(length(min = 1, max = 64))]
    pub slug: String,
}

/// Tag validé, prêt à être inséré
#[derive(Debug)]
struct NewTag {
    name: String,
    color: String,
    slug: String,
}

impl CreateTagRequest {
    /// Nom et slug en minuscules, couleur normalisée en #RRGGBB
    fn normalize(self) -> Result<NewTag, ApiError> {
        self.validate()?;

        let name = self.name.trim().to_lowercase();
        OneOfTwoValidator::for_field("Name")
            .check(&name)
            .map_err(|m| ApiError::field("name", m))?;

        let slug = self.slug.trim().to_lowercase();
        if !SLUG.is_match(&slug) {
            return Err(ApiError::field(
                "slug",
                "Slug may contain only latin letters, digits, '-' and '_'.",
            ));
        }

        let color = hex_color(&self.color).map_err(|m| ApiError::field("color", m))?;

        Ok(NewTag { name, color, slug })
    }
}

/// GET /api/tags/ - Tous les tags, sans pagination (PUBLIC)
#[get("/")]
pub async fn list_tags(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let tags = Tag::find()
        .order_by_asc(tag::Column::Id)
        .all(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(tags))
}

/// GET /api/tags/{id}/ (PUBLIC)
#[get("/{id}/")]
pub async fn get_tag(
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let tag = Tag::find_by_id(path.into_inner())
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Tag"))?;
    Ok(HttpResponse::Ok().json(tag))
}

/// POST /api/tags/ - Création réservée au staff
#[post("/")]
pub async fn create_tag(
    auth_user: AuthUser,
    body: web::Json<CreateTagRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    if !auth_user.is_staff {
        return Err(ApiError::Forbidden);
    }

    let new_tag = body.into_inner().normalize()?;

    // name / color / slug sont uniques
    let taken = Tag::find()
        .filter(
            Condition::any()
                .add(tag::Column::Name.eq(new_tag.name.as_str()))
                .add(tag::Column::Color.eq(new_tag.color.as_str()))
                .add(tag::Column::Slug.eq(new_tag.slug.as_str())),
        )
        .one(db.get_ref())
        .await?;
    if taken.is_some() {
        return Err(ApiError::BadRequest(
            "A tag with this name, color or slug already exists.".to_string(),
        ));
    }

    let tag = TagActiveModel {
        name: Set(new_tag.name),
        color: Set(new_tag.color),
        slug: Set(new_tag.slug),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await
    .map_err(|e| conflict_on_unique(e, "A tag with this name, color or slug already exists."))?;

    info!(tag_id = tag.id, slug = %tag.slug, user_id = auth_user.user_id, "tag created");
    Ok(HttpResponse::Created().json(tag))
}

pub fn tags_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tags")
            .service(list_tags)
            .service(get_tag)
            .service(create_tag),
    );
}
