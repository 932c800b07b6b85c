// ============================================================================
// RELATIONS MANY-TO-MANY (favoris, panier, abonnements)
// ============================================================================
//
// Un seul service d'ajout / suppression de lien, paramétré par un descripteur :
//   - table de jointure (Link)
//   - colonne propriétaire (l'utilisateur qui agit)
//   - colonne cible (recette ou auteur)
//
// Comportement (non idempotent) :
//   - cible inexistante            -> 404
//   - POST sur un lien existant    -> 400
//   - DELETE sur un lien absent    -> 400
//   - doublon concurrent rejeté par l'index unique -> 400 (pas 500)
//
// ============================================================================

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::error::ApiError;
use crate::models::{cart, favorite, recipe, subscription, users};

#[async_trait]
pub trait LinkDescriptor: Sync {
    type Link: EntityTrait;
    type ActiveLink: ActiveModelTrait<Entity = Self::Link> + Send;

    /// Nom de la cible dans le message 404
    const TARGET: &'static str;
    const ALREADY_LINKED: &'static str;
    const NOT_LINKED: &'static str;

    fn owner_column(&self) -> <Self::Link as EntityTrait>::Column;
    fn target_column(&self) -> <Self::Link as EntityTrait>::Column;

    async fn target_exists(&self, txn: &DatabaseTransaction, target_id: i32) -> Result<bool, DbErr>;

    fn new_link(&self, owner_id: i32, target_id: i32) -> Self::ActiveLink;

    /// Règle propre à une relation (ex: pas d'abonnement à soi-même)
    fn check(&self, _owner_id: i32, _target_id: i32) -> Result<(), ApiError> {
        Ok(())
    }
}

pub struct FavoriteLink;
pub struct CartLink;
pub struct SubscriptionLink;

async fn recipe_exists(txn: &DatabaseTransaction, recipe_id: i32) -> Result<bool, DbErr> {
    Ok(recipe::Entity::find_by_id(recipe_id).one(txn).await?.is_some())
}

#[async_trait]
impl LinkDescriptor for FavoriteLink {
    type Link = favorite::Entity;
    type ActiveLink = favorite::ActiveModel;

    const TARGET: &'static str = "Recipe";
    const ALREADY_LINKED: &'static str = "Recipe is already in favorites.";
    const NOT_LINKED: &'static str = "Recipe is not in favorites.";

    fn owner_column(&self) -> favorite::Column {
        favorite::Column::UserId
    }

    fn target_column(&self) -> favorite::Column {
        favorite::Column::RecipeId
    }

    async fn target_exists(
        &self,
        txn: &DatabaseTransaction,
        target_id: i32,
    ) -> Result<bool, DbErr> {
        recipe_exists(txn, target_id).await
    }

    fn new_link(&self, owner_id: i32, target_id: i32) -> favorite::ActiveModel {
        favorite::ActiveModel {
            user_id: Set(owner_id),
            recipe_id: Set(target_id),
            date_added: Set(Utc::now()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LinkDescriptor for CartLink {
    type Link = cart::Entity;
    type ActiveLink = cart::ActiveModel;

    const TARGET: &'static str = "Recipe";
    const ALREADY_LINKED: &'static str = "Recipe is already in the shopping cart.";
    const NOT_LINKED: &'static str = "Recipe is not in the shopping cart.";

    fn owner_column(&self) -> cart::Column {
        cart::Column::UserId
    }

    fn target_column(&self) -> cart::Column {
        cart::Column::RecipeId
    }

    async fn target_exists(
        &self,
        txn: &DatabaseTransaction,
        target_id: i32,
    ) -> Result<bool, DbErr> {
        recipe_exists(txn, target_id).await
    }

    fn new_link(&self, owner_id: i32, target_id: i32) -> cart::ActiveModel {
        cart::ActiveModel {
            user_id: Set(owner_id),
            recipe_id: Set(target_id),
            date_added: Set(Utc::now()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LinkDescriptor for SubscriptionLink {
    type Link = subscription::Entity;
    type ActiveLink = subscription::ActiveModel;

    const TARGET: &'static str = "User";
    const ALREADY_LINKED: &'static str = "You are already subscribed to this author.";
    const NOT_LINKED: &'static str = "You are not subscribed to this author.";

    fn owner_column(&self) -> subscription::Column {
        subscription::Column::UserId
    }

    fn target_column(&self) -> subscription::Column {
        subscription::Column::AuthorId
    }

    async fn target_exists(
        &self,
        txn: &DatabaseTransaction,
        target_id: i32,
    ) -> Result<bool, DbErr> {
        Ok(users::Entity::find_by_id(target_id).one(txn).await?.is_some())
    }

    fn new_link(&self, owner_id: i32, target_id: i32) -> subscription::ActiveModel {
        subscription::ActiveModel {
            user_id: Set(owner_id),
            author_id: Set(target_id),
            date_added: Set(Utc::now()),
            ..Default::default()
        }
    }

    fn check(&self, owner_id: i32, target_id: i32) -> Result<(), ApiError> {
        if owner_id == target_id {
            return Err(ApiError::BadRequest(
                "You cannot subscribe to yourself.".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct RelationService;

impl RelationService {
    /// Crée le lien owner -> target dans une transaction
    pub async fn create<D: LinkDescriptor>(
        db: &DatabaseConnection,
        descriptor: &D,
        owner_id: i32,
        target_id: i32,
    ) -> Result<(), ApiError> {
        let txn = db.begin().await?;

        if !descriptor.target_exists(&txn, target_id).await? {
            return Err(ApiError::not_found(D::TARGET));
        }
        descriptor.check(owner_id, target_id)?;

        let existing = D::Link::find()
            .filter(descriptor.owner_column().eq(owner_id))
            .filter(descriptor.target_column().eq(target_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ApiError::Conflict(D::ALREADY_LINKED.to_string()));
        }

        D::Link::insert(descriptor.new_link(owner_id, target_id))
            .exec(&txn)
            .await
            .map_err(|e| conflict_on_unique(e, D::ALREADY_LINKED))?;

        txn.commit().await?;

        info!(owner_id, target_id, target = D::TARGET, "link created");
        Ok(())
    }

    /// Supprime le lien owner -> target, 400 s'il n'existait pas
    pub async fn delete<D: LinkDescriptor>(
        db: &DatabaseConnection,
        descriptor: &D,
        owner_id: i32,
        target_id: i32,
    ) -> Result<(), ApiError> {
        let txn = db.begin().await?;

        if !descriptor.target_exists(&txn, target_id).await? {
            return Err(ApiError::not_found(D::TARGET));
        }

        let result = D::Link::delete_many()
            .filter(descriptor.owner_column().eq(owner_id))
            .filter(descriptor.target_column().eq(target_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ApiError::Conflict(D::NOT_LINKED.to_string()));
        }

        txn.commit().await?;

        info!(owner_id, target_id, target = D::TARGET, "link removed");
        Ok(())
    }
}

/// Violation d'index unique -> même réponse qu'un doublon détecté avant l'insert
pub fn conflict_on_unique(err: DbErr, message: &str) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ApiError::Conflict(message.to_string()),
        _ => ApiError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_recipe, create_user, setup_db};

    #[actix_web::test]
    async fn test_favorite_create_then_conflict() {
        let db = setup_db().await;
        let user = create_user(&db, "reader").await;
        let author = create_user(&db, "author").await;
        let recipe = create_recipe(&db, &author, "Борщ", &[], &[]).await;

        RelationService::create(&db, &FavoriteLink, user.id, recipe.id)
            .await
            .unwrap();

        let second = RelationService::create(&db, &FavoriteLink, user.id, recipe.id).await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));

        let count = favorite::Entity::find().count(&db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[actix_web::test]
    async fn test_toggle_alternates() {
        let db = setup_db().await;
        let user = create_user(&db, "reader").await;
        let recipe = create_recipe(&db, &user, "Суп", &[], &[]).await;

        RelationService::create(&db, &CartLink, user.id, recipe.id).await.unwrap();
        RelationService::delete(&db, &CartLink, user.id, recipe.id).await.unwrap();
        RelationService::create(&db, &CartLink, user.id, recipe.id).await.unwrap();

        let count = cart::Entity::find().count(&db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[actix_web::test]
    async fn test_delete_missing_link_is_conflict() {
        let db = setup_db().await;
        let user = create_user(&db, "reader").await;
        let recipe = create_recipe(&db, &user, "Каша", &[], &[]).await;

        let result = RelationService::delete(&db, &FavoriteLink, user.id, recipe.id).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[actix_web::test]
    async fn test_unknown_target_is_not_found() {
        let db = setup_db().await;
        let user = create_user(&db, "reader").await;

        let result = RelationService::create(&db, &CartLink, user.id, 999).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));

        let result = RelationService::delete(&db, &SubscriptionLink, user.id, 999).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[actix_web::test]
    async fn test_cannot_subscribe_to_self() {
        let db = setup_db().await;
        let user = create_user(&db, "narcissus").await;

        let result = RelationService::create(&db, &SubscriptionLink, user.id, user.id).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert_eq!(subscription::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn test_subscription_links_owner_to_author() {
        let db = setup_db().await;
        let fan = create_user(&db, "fan").await;
        let author = create_user(&db, "author").await;

        RelationService::create(&db, &SubscriptionLink, fan.id, author.id)
            .await
            .unwrap();

        let row = subscription::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(row.user_id, fan.id);
        assert_eq!(row.author_id, author.id);
    }

    #[actix_web::test]
    async fn test_unique_violation_maps_to_conflict() {
        let db = setup_db().await;
        let user = create_user(&db, "reader").await;
        let recipe = create_recipe(&db, &user, "Плов", &[], &[]).await;

        FavoriteLink.new_link(user.id, recipe.id).insert(&db).await.unwrap();
        let err = FavoriteLink
            .new_link(user.id, recipe.id)
            .insert(&db)
            .await
            .unwrap_err();

        assert!(matches!(
            conflict_on_unique(err, FavoriteLink::ALREADY_LINKED),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            conflict_on_unique(DbErr::Custom("boom".into()), "x"),
            ApiError::Database(_)
        ));
    }
}
