// ============================================================================
// UTILISATEURS : inscription, profils, mot de passe, abonnements, tokens
// ============================================================================

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Query;
use sea_orm::*;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::{ShortRecipeResponse, SubscriptionResponse, TokenResponse, UserResponse};
use crate::models::{recipe, revoked_token, subscription, users};
use crate::services::relation_service::conflict_on_unique;
use crate::utils::validators::{validate_person_name, validate_username};
use crate::utils::{jwt, password};

// DTO pour l'inscription
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: String,
    #[validate(length(max = 32), custom(function = "validate_username"))]
    pub username: String,
    #[validate(length(min = 1, max = 32), custom(function = "validate_person_name"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 32), custom(function = "validate_person_name"))]
    pub last_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

// DTO pour la connexion (par email, comme le frontend)
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// DTO pour changer le mot de passe
#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

pub struct UserService;

impl UserService {
    pub async fn register(
        db: &DatabaseConnection,
        config: &AppConfig,
        request: RegisterRequest,
    ) -> Result<users::Model, ApiError> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();
        let username = request.username.trim().to_string();

        let email_taken = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(db)
            .await?
            .is_some();
        if email_taken {
            return Err(ApiError::field("email", "A user with that email already exists."));
        }

        let username_taken = users::Entity::find()
            .filter(users::Column::Username.eq(username.as_str()))
            .one(db)
            .await?
            .is_some();
        if username_taken {
            return Err(ApiError::field(
                "username",
                "A user with that username already exists.",
            ));
        }

        let password_hash = password::hash_password(&request.password, config.password_iterations)
            .map_err(ApiError::Internal)?;

        let user = users::ActiveModel {
            email: Set(email),
            username: Set(username),
            first_name: Set(request.first_name.trim().to_string()),
            last_name: Set(request.last_name.trim().to_string()),
            password_hash: Set(password_hash),
            is_active: Set(true),
            is_staff: Set(false),
            date_joined: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| conflict_on_unique(e, "A user with these credentials already exists."))?;

        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Auteurs (parmi `author_ids`) suivis par `viewer`
    pub async fn subscribed_ids(
        db: &DatabaseConnection,
        viewer: Option<i32>,
        author_ids: &[i32],
    ) -> Result<HashSet<i32>, DbErr> {
        let Some(viewer) = viewer else {
            return Ok(HashSet::new());
        };
        if author_ids.is_empty() {
            return Ok(HashSet::new());
        }

        Ok(subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(viewer))
            .filter(subscription::Column::AuthorId.is_in(author_ids.iter().copied()))
            .all(db)
            .await?
            .into_iter()
            .map(|s| s.author_id)
            .collect())
    }

    /// `is_subscribed` toujours faux pour un anonyme et pour sa propre fiche
    pub async fn represent_many(
        db: &DatabaseConnection,
        viewer: Option<i32>,
        users: Vec<users::Model>,
    ) -> Result<Vec<UserResponse>, DbErr> {
        let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
        let subscribed = Self::subscribed_ids(db, viewer, &ids).await?;

        Ok(users
            .into_iter()
            .map(|user| {
                let is_subscribed = Some(user.id) != viewer && subscribed.contains(&user.id);
                UserResponse::new(user, is_subscribed)
            })
            .collect())
    }

    pub async fn represent(
        db: &DatabaseConnection,
        viewer: Option<i32>,
        user: users::Model,
    ) -> Result<UserResponse, DbErr> {
        let mut list = Self::represent_many(db, viewer, vec![user]).await?;
        list.pop()
            .ok_or_else(|| DbErr::Custom("empty user representation".to_string()))
    }

    pub async fn find(db: &DatabaseConnection, id: i32) -> Result<users::Model, ApiError> {
        users::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    /// Page d'utilisateurs triés par id
    pub async fn list(
        db: &DatabaseConnection,
        viewer: Option<i32>,
        page: u64,
        limit: u64,
    ) -> Result<(u64, Vec<UserResponse>), ApiError> {
        let paginator = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .paginate(db, limit);
        let count = paginator.num_items().await?;
        let users = paginator.fetch_page(page - 1).await?;

        Ok((count, Self::represent_many(db, viewer, users).await?))
    }

    pub async fn set_password(
        db: &DatabaseConnection,
        config: &AppConfig,
        user_id: i32,
        request: SetPasswordRequest,
    ) -> Result<(), ApiError> {
        request.validate()?;

        let user = Self::find(db, user_id).await?;
        let valid = password::verify_password(&request.current_password, &user.password_hash)
            .map_err(ApiError::Internal)?;
        if !valid {
            return Err(ApiError::field("current_password", "Invalid password."));
        }

        let new_hash = password::hash_password(&request.new_password, config.password_iterations)
            .map_err(ApiError::Internal)?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.update(db).await?;

        info!(user_id, "password changed");
        Ok(())
    }

    /// Carte d'abonnement : l'auteur + ses recettes les plus récentes
    pub async fn subscription_card(
        db: &DatabaseConnection,
        author: users::Model,
        recipes_limit: Option<u64>,
    ) -> Result<SubscriptionResponse, DbErr> {
        let query = recipe::Entity::find()
            .filter(recipe::Column::AuthorId.eq(author.id))
            .order_by_desc(recipe::Column::PubDate);

        let recipes_count = query.clone().count(db).await?;
        let recipes = match recipes_limit {
            Some(limit) => query.limit(limit).all(db).await?,
            None => query.all(db).await?,
        };

        Ok(SubscriptionResponse {
            user: UserResponse::new(author, true),
            recipes: recipes.into_iter().map(ShortRecipeResponse::from).collect(),
            recipes_count,
        })
    }

    /// Auteurs suivis par `user_id`, paginés
    pub async fn subscriptions(
        db: &DatabaseConnection,
        user_id: i32,
        page: u64,
        limit: u64,
        recipes_limit: Option<u64>,
    ) -> Result<(u64, Vec<SubscriptionResponse>), ApiError> {
        let followed = Query::select()
            .column(subscription::Column::AuthorId)
            .from(subscription::Entity)
            .and_where(subscription::Column::UserId.eq(user_id))
            .to_owned();

        let paginator = users::Entity::find()
            .filter(users::Column::Id.in_subquery(followed))
            .order_by_asc(users::Column::Id)
            .paginate(db, limit);
        let count = paginator.num_items().await?;

        let mut cards = Vec::new();
        for author in paginator.fetch_page(page - 1).await? {
            cards.push(Self::subscription_card(db, author, recipes_limit).await?);
        }

        Ok((count, cards))
    }

    /// Email + mot de passe -> JWT. Même message pour toutes les causes d'échec.
    pub async fn login(
        db: &DatabaseConnection,
        config: &AppConfig,
        request: LoginRequest,
    ) -> Result<TokenResponse, ApiError> {
        let invalid =
            || ApiError::BadRequest("Unable to log in with provided credentials.".to_string());

        let user = users::Entity::find()
            .filter(users::Column::Email.eq(request.email.trim().to_lowercase()))
            .one(db)
            .await?
            .ok_or_else(invalid)?;

        let valid = password::verify_password(&request.password, &user.password_hash)
            .map_err(ApiError::Internal)?;
        if !valid || !user.is_active {
            return Err(invalid());
        }

        let auth_token = jwt::generate_token(
            user.id,
            &user.username,
            &config.jwt_secret,
            config.jwt_ttl_hours,
        )
        .map_err(ApiError::Internal)?;

        info!(user_id = user.id, "user logged in");
        Ok(TokenResponse { auth_token })
    }

    /// Le jti du token courant est conservé jusqu'à son expiration
    pub async fn logout(db: &DatabaseConnection, auth: &AuthUser) -> Result<(), ApiError> {
        let expires_at =
            DateTime::<Utc>::from_timestamp(auth.expires_at, 0).unwrap_or_else(Utc::now);

        revoked_token::ActiveModel {
            jti: Set(auth.jti.clone()),
            user_id: Set(auth.user_id),
            expires_at: Set(expires_at),
        }
        .insert(db)
        .await
        .map_err(|e| conflict_on_unique(e, "Token already revoked."))?;
        Self::purge_revoked_tokens(db).await?;

        info!(user_id = auth.user_id, "user logged out");
        Ok(())
    }

    /// Un jti expiré ne sert plus : le JWT est refusé à la vérification
    pub async fn purge_revoked_tokens(db: &DatabaseConnection) -> Result<u64, DbErr> {
        let result = revoked_token::Entity::delete_many()
            .filter(revoked_token::Column::ExpiresAt.lt(Utc::now()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{context, create_recipe, create_user, TEST_PASSWORD};
    use crate::services::relation_service::{RelationService, SubscriptionLink};

    fn registration(username: &str) -> RegisterRequest {
        RegisterRequest {
            email: format!("{username}@mail.ru"),
            username: username.to_string(),
            first_name: "Иван".to_string(),
            last_name: "Петров".to_string(),
            password: "Secret-pass-42".to_string(),
        }
    }

    #[actix_web::test]
    async fn test_register_hashes_password() {
        let ctx = context().await;
        let user = UserService::register(&ctx.db, &ctx.config, registration("Ivan"))
            .await
            .unwrap();

        assert_eq!(user.email, "ivan@mail.ru");
        assert_ne!(user.password_hash, "Secret-pass-42");
        assert!(password::verify_password("Secret-pass-42", &user.password_hash).unwrap());
    }

    #[actix_web::test]
    async fn test_register_rejects_mixed_alphabets() {
        let ctx = context().await;
        let result = UserService::register(&ctx.db, &ctx.config, registration("Ivanов")).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[actix_web::test]
    async fn test_register_duplicate_email() {
        let ctx = context().await;
        UserService::register(&ctx.db, &ctx.config, registration("Ivan"))
            .await
            .unwrap();

        let mut again = registration("Petr");
        again.email = "IVAN@mail.ru".to_string();
        let result = UserService::register(&ctx.db, &ctx.config, again).await;
        assert!(matches!(result, Err(ApiError::Field { field: "email", .. })));
    }

    #[actix_web::test]
    async fn test_is_subscribed_resolution() {
        let ctx = context().await;
        let fan = create_user(&ctx.db, "fan").await;
        let author = create_user(&ctx.db, "author").await;
        RelationService::create(&ctx.db, &SubscriptionLink, fan.id, author.id)
            .await
            .unwrap();

        let seen_by_fan = UserService::represent(&ctx.db, Some(fan.id), author.clone())
            .await
            .unwrap();
        assert!(seen_by_fan.is_subscribed);

        let anonymous = UserService::represent(&ctx.db, None, author.clone())
            .await
            .unwrap();
        assert!(!anonymous.is_subscribed);

        let own = UserService::represent(&ctx.db, Some(fan.id), fan).await.unwrap();
        assert!(!own.is_subscribed);
    }

    #[actix_web::test]
    async fn test_subscription_card_respects_recipes_limit() {
        let ctx = context().await;
        let author = create_user(&ctx.db, "author").await;
        for name in ["Борщ", "Щи", "Уха"] {
            create_recipe(&ctx.db, &author, name, &[], &[]).await;
        }

        let card = UserService::subscription_card(&ctx.db, author, Some(2))
            .await
            .unwrap();
        assert_eq!(card.recipes.len(), 2);
        assert_eq!(card.recipes_count, 3);
        assert!(card.user.is_subscribed);
    }

    #[actix_web::test]
    async fn test_set_password_checks_current() {
        let ctx = context().await;
        let user = create_user(&ctx.db, "chef").await;

        let wrong = SetPasswordRequest {
            current_password: "nope".to_string(),
            new_password: "Another-pass-1".to_string(),
        };
        assert!(UserService::set_password(&ctx.db, &ctx.config, user.id, wrong).await.is_err());

        let ok = SetPasswordRequest {
            current_password: TEST_PASSWORD.to_string(),
            new_password: "Another-pass-1".to_string(),
        };
        UserService::set_password(&ctx.db, &ctx.config, user.id, ok).await.unwrap();

        let reloaded = UserService::find(&ctx.db, user.id).await.unwrap();
        assert!(password::verify_password("Another-pass-1", &reloaded.password_hash).unwrap());
    }

    #[actix_web::test]
    async fn test_logout_purges_expired_revocations() {
        let ctx = context().await;
        let user = create_user(&ctx.db, "cook").await;

        for (jti, expires_at) in [
            ("expired", Utc::now() - chrono::Duration::hours(1)),
            ("live", Utc::now() + chrono::Duration::hours(1)),
        ] {
            revoked_token::ActiveModel {
                jti: Set(jti.to_string()),
                user_id: Set(user.id),
                expires_at: Set(expires_at),
            }
            .insert(&ctx.db)
            .await
            .unwrap();
        }

        let auth = AuthUser {
            user_id: user.id,
            username: user.username.clone(),
            is_staff: false,
            jti: "current".to_string(),
            expires_at: (Utc::now() + chrono::Duration::hours(24)).timestamp(),
        };
        UserService::logout(&ctx.db, &auth).await.unwrap();

        let mut left: Vec<String> = revoked_token::Entity::find()
            .all(&ctx.db)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.jti)
            .collect();
        left.sort();
        assert_eq!(left, vec!["current", "live"]);

        assert_eq!(UserService::purge_revoked_tokens(&ctx.db).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn test_login_with_email() {
        let ctx = context().await;
        let user = create_user(&ctx.db, "chef").await;

        let token = UserService::login(
            &ctx.db,
            &ctx.config,
            LoginRequest {
                email: user.email.clone(),
                password: TEST_PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();
        let claims = jwt::verify_token(&token.auth_token, &ctx.config.jwt_secret).unwrap();
        assert_eq!(claims.sub, user.id);

        let bad = UserService::login(
            &ctx.db,
            &ctx.config,
            LoginRequest {
                email: user.email,
                password: "wrong".to_string(),
            },
        )
        .await;
        assert!(matches!(bad, Err(ApiError::BadRequest(_))));
    }
}
