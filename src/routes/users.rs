use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::RegisteredUserResponse;
use crate::services::relation_service::{RelationService, SubscriptionLink};
use crate::services::user_service::{RegisterRequest, SetPasswordRequest, UserService};
use crate::utils::pagination::{Page, PageParams, QueryPairs};

/// `recipes_limit` des cartes d'abonnement (valeur invalide ignorée)
fn recipes_limit(pairs: &[(String, String)]) -> Option<u64> {
    pairs
        .iter()
        .find(|(k, _)| k == "recipes_limit")
        .and_then(|(_, v)| v.parse().ok())
}

/// GET /api/users/ - Liste paginée (PUBLIC)
#[get("/")]
pub async fn list_users(
    req: HttpRequest,
    query: QueryPairs,
    auth_user: Option<AuthUser>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let params = PageParams::from_pairs(&query);
    let (page, limit) = (params.page(), params.limit(config.page_size));

    let viewer = auth_user.map(|u| u.user_id);
    let (count, results) = UserService::list(db.get_ref(), viewer, page, limit).await?;

    Ok(HttpResponse::Ok().json(Page::new(&req, page, limit, count, results)))
}

/// POST /api/users/ - Inscription (PUBLIC)
#[post("/")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let user = UserService::register(db.get_ref(), config.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(RegisteredUserResponse::from(user)))
}

/// GET /api/users/me/ - Utilisateur courant (PROTÉGÉE)
#[get("/me/")]
pub async fn me(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let user = UserService::find(db.get_ref(), auth_user.user_id).await?;
    let response = UserService::represent(db.get_ref(), Some(auth_user.user_id), user).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/users/set_password/ (PROTÉGÉE)
#[post("/set_password/")]
pub async fn set_password(
    auth_user: AuthUser,
    body: web::Json<SetPasswordRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    UserService::set_password(
        db.get_ref(),
        config.get_ref(),
        auth_user.user_id,
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/users/subscriptions/ - Auteurs suivis, paginés (PROTÉGÉE)
#[get("/subscriptions/")]
pub async fn subscriptions(
    req: HttpRequest,
    query: QueryPairs,
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let params = PageParams::from_pairs(&query);
    let (page, limit) = (params.page(), params.limit(config.page_size));

    let (count, results) = UserService::subscriptions(
        db.get_ref(),
        auth_user.user_id,
        page,
        limit,
        recipes_limit(&query),
    )
    .await?;

    Ok(HttpResponse::Ok().json(Page::new(&req, page, limit, count, results)))
}

/// GET /api/users/{id}/ - Profil (PUBLIC)
#[get("/{id}/")]
pub async fn get_user(
    path: web::Path<i32>,
    auth_user: Option<AuthUser>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let user = UserService::find(db.get_ref(), path.into_inner()).await?;
    let viewer = auth_user.map(|u| u.user_id);
    Ok(HttpResponse::Ok().json(UserService::represent(db.get_ref(), viewer, user).await?))
}

/// POST /api/users/{id}/subscribe/ (PROTÉGÉE)
#[post("/{id}/subscribe/")]
pub async fn subscribe(
    query: QueryPairs,
    path: web::Path<i32>,
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let author_id = path.into_inner();
    RelationService::create(db.get_ref(), &SubscriptionLink, auth_user.user_id, author_id).await?;

    let author = UserService::find(db.get_ref(), author_id).await?;
    let card =
        UserService::subscription_card(db.get_ref(), author, recipes_limit(&query))
            .await?;
    Ok(HttpResponse::Created().json(card))
}

/// DELETE /api/users/{id}/subscribe/ (PROTÉGÉE)
#[delete("/{id}/subscribe/")]
pub async fn unsubscribe(
    path: web::Path<i32>,
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    RelationService::delete(
        db.get_ref(),
        &SubscriptionLink,
        auth_user.user_id,
        path.into_inner(),
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

// Les chemins fixes (me, set_password, subscriptions) avant /{id}/
pub fn users_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(list_users)
            .service(register)
            .service(me)
            .service(set_password)
            .service(subscriptions)
            .service(get_user)
            .service(subscribe)
            .service(unsubscribe),
    );
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{auth_header, context, create_recipe, create_user, init_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_register_then_listed_unsubscribed() {
        let ctx = context().await;
        let app = init_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/users/")
            .set_json(json!({
                "email": "vasya@yandex.ru",
                "username": "Vasya",
                "first_name": "Вася",
                "last_name": "Пупкин",
                "password": "Qwerty-123456"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["username"], "Vasya");
        assert_eq!(body["first_name"], "Вася");
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());

        let req = test::TestRequest::get().uri("/api/users/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["username"], "Vasya");
        assert_eq!(body["results"][0]["is_subscribed"], false);
    }

    #[actix_web::test]
    async fn test_register_rejects_mixed_username() {
        let ctx = context().await;
        let app = init_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/users/")
            .set_json(json!({
                "email": "mix@yandex.ru",
                "username": "Vasyаа",
                "first_name": "Вася",
                "last_name": "Пупкин",
                "password": "Qwerty-123456"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body.get("username").is_some());
    }

    #[actix_web::test]
    async fn test_me_requires_auth() {
        let ctx = context().await;
        let app = init_app!(ctx);

        let req = test::TestRequest::get().uri("/api/users/me/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_unknown_user_is_404() {
        let ctx = context().await;
        let app = init_app!(ctx);

        let req = test::TestRequest::get().uri("/api/users/42/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_subscribe_toggle_and_listing() {
        let ctx = context().await;
        let fan = create_user(&ctx.db, "fan").await;
        let author = create_user(&ctx.db, "author").await;
        for name in ["Борщ", "Щи", "Уха"] {
            create_recipe(&ctx.db, &author, name, &[], &[]).await;
        }
        let header = auth_header(&ctx.config, &fan);
        let app = init_app!(ctx);

        let uri = format!("/api/users/{}/subscribe/?recipes_limit=1", author.id);
        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(header.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let card: Value = test::read_body_json(resp).await;
        assert_eq!(card["is_subscribed"], true);
        assert_eq!(card["recipes"].as_array().unwrap().len(), 1);
        assert_eq!(card["recipes_count"], 3);

        let req = test::TestRequest::post()
            .uri(&uri)
            .insert_header(header.clone())
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get()
            .uri("/api/users/subscriptions/")
            .insert_header(header.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["id"], author.id);

        let req = test::TestRequest::get()
            .uri(&format!("/api/users/{}/", author.id))
            .insert_header(header.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_subscribed"], true);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/users/{}/subscribe/", author.id))
            .insert_header(header)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );
    }

    #[actix_web::test]
    async fn test_subscribe_to_self_is_rejected() {
        let ctx = context().await;
        let user = create_user(&ctx.db, "lonely").await;
        let header = auth_header(&ctx.config, &user);
        let app = init_app!(ctx);

        let req = test::TestRequest::post()
            .uri(&format!("/api/users/{}/subscribe/", user.id))
            .insert_header(header)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn test_set_password() {
        let ctx = context().await;
        let user = create_user(&ctx.db, "chef").await;
        let header = auth_header(&ctx.config, &user);
        let app = init_app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/users/set_password/")
            .insert_header(header)
            .set_json(json!({
                "current_password": crate::test_utils::TEST_PASSWORD,
                "new_password": "Brand-new-pass-1"
            }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );
    }
}
