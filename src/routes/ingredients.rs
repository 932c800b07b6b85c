use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::error::ApiError;
use crate::services::ingredient_service::IngredientService;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
}

/// GET /api/ingredients/?name=... - Recherche, sans pagination (PUBLIC)
#[get("/")]
pub async fn search_ingredients(
    query: web::Query<SearchParams>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let found = IngredientService::search(db.get_ref(), query.name.as_deref()).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// GET /api/ingredients/{id}/ (PUBLIC)
#[get("/{id}/")]
pub async fn get_ingredient(
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let ingredient = IngredientService::get(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ingredient))
}

pub fn ingredients_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ingredients")
            .service(search_ingredients)
            .service(get_ingredient),
    );
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{context, create_ingredient, init_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_search_wrong_layout_over_http() {
        let ctx = context().await;
        create_ingredient(&ctx.db, "молоко", "мл").await;
        create_ingredient(&ctx.db, "соль", "г").await;
        let app = init_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/api/ingredients/?name=vjk")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "молоко");
        assert_eq!(items[0]["measurement_unit"], "мл");
    }

    #[actix_web::test]
    async fn test_missing_ingredient_is_404() {
        let ctx = context().await;
        let app = init_app!(ctx);

        let req = test::TestRequest::get()
            .uri("/api/ingredients/7/")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
