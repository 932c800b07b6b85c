use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::recipe_service::{RecipeQuery, RecipeService, RecipeWrite};
use crate::services::relation_service::{CartLink, FavoriteLink, RelationService};
use crate::services::shopping_list_service::ShoppingListService;
use crate::utils::pagination::{Page, PageParams, QueryPairs};

/// GET /api/recipes/ - Liste paginée et filtrée (PUBLIC)
#[get("/")]
pub async fn list_recipes(
    req: HttpRequest,
    pairs: QueryPairs,
    auth_user: Option<AuthUser>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let params = PageParams::from_pairs(&pairs);
    let (page, limit) = (params.page(), params.limit(config.page_size));
    let query = RecipeQuery::from_pairs(&pairs);

    let viewer = auth_user.map(|u| u.user_id);
    let (count, results) = RecipeService::list(db.get_ref(), viewer, &query, page, limit).await?;

    Ok(HttpResponse::Ok().json(Page::new(&req, page, limit, count, results)))
}

/// POST /api/recipes/ (PROTÉGÉE)
#[post("/")]
pub async fn create_recipe(
    auth_user: AuthUser,
    body: web::Json<RecipeWrite>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let recipe =
        RecipeService::create(db.get_ref(), config.get_ref(), auth_user.user_id, body.into_inner())
            .await?;
    let response = RecipeService::represent(db.get_ref(), Some(auth_user.user_id), recipe).await?;
    Ok(HttpResponse::Created().json(response))
}

/// GET /api/recipes/download_shopping_cart/ - Liste de courses en .txt (PROTÉGÉE)
#[get("/download_shopping_cart/")]
pub async fn download_shopping_cart(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let text = ShoppingListService::build(
        db.get_ref(),
        auth_user.user_id,
        &auth_user.username,
        Utc::now(),
    )
    .await?;

    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(format!(
            "{}_shopping_list.txt",
            auth_user.username
        ))],
    };

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header(disposition)
        .body(text))
}

/// GET /api/recipes/{id}/ (PUBLIC)
#[get("/{id}/")]
pub async fn get_recipe(
    path: web::Path<i32>,
    auth_user: Option<AuthUser>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let viewer = auth_user.map(|u| u.user_id);
    let recipe = RecipeService::get(db.get_ref(), viewer, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(recipe))
}

/// PATCH /api/recipes/{id}/ - Auteur ou staff
#[patch("/{id}/")]
pub async fn update_recipe(
    path: web::Path<i32>,
    auth_user: AuthUser,
    body: web::Json<RecipeWrite>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let recipe = RecipeService::update(
        db.get_ref(),
        config.get_ref(),
        &auth_user,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    let response = RecipeService::represent(db.get_ref(), Some(auth_user.user_id), recipe).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /api/recipes/{id}/ - Auteur ou staff
#[delete("/{id}/")]
pub async fn delete_recipe(
    path: web::Path<i32>,
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    RecipeService::delete(db.get_ref(), config.get_ref(), &auth_user, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/recipes/{id}/favorite/
#[post("/{id}/favorite/")]
pub async fn add_favorite(
    path: web::Path<i32>,
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = path.into_inner();
    RelationService::create(db.get_ref(), &FavoriteLink, auth_user.user_id, recipe_id).await?;
    Ok(HttpResponse::Created().json(RecipeService::short(db.get_ref(), recipe_id).await?))
}

/// DELETE /api/recipes/{id}/favorite/
#[delete("/{id}/favorite/")]
pub async fn remove_favorite(
    path: web::Path<i32>,
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    RelationService::delete(db.get_ref(), &FavoriteLink, auth_user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/recipes/{id}/shopping_cart/
#[post("/{id}/shopping_cart/")]
pub async fn add_to_cart(
    path: web::Path<i32>,
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = path.into_inner();
    RelationService::create(db.get_ref(), &CartLink, auth_user.user_id, recipe_id).await?;
    Ok(HttpResponse::Created().json(RecipeService::short(db.get_ref(), recipe_id).await?))
}

/// DELETE /api/recipes/{id}/shopping_cart/
#[delete("/{id}/shopping_cart/")]
pub async fn remove_from_cart(
    path: web::Path<i32>,
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    RelationService::delete(db.get_ref(), &CartLink, auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// download_shopping_cart avant /{id}/
pub fn recipes_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/recipes")
            .service(list_recipes)
            .service(create_recipe)
            .service(download_shopping_cart)
            .service(get_recipe)
            .service(update_recipe)
            .service(delete_recipe)
            .service(add_favorite)
            .service(remove_favorite)
            .service(add_to_cart)
            .service(remove_from_cart),
    );
}
