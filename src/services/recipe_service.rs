// ============================================================================
// RECETTES : création / modification / suppression, représentation, filtres
// ============================================================================
//
// Écritures :
//   - une transaction par requête (recette + tags + quantités)
//   - l'image est écrite sur disque avant la transaction, supprimée si elle échoue
//   - modification / suppression réservées à l'auteur ou au staff
//
// Lecture :
//   - représentation complète chargée par lots (auteurs, tags, ingrédients,
//     favoris, panier) pour éviter une requête par recette
//   - filtres : tags (OU), auteur, panier, favoris (ces deux derniers
//     ignorés pour un anonyme)
//
// ============================================================================

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::Query;
use sea_orm::*;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::{RecipeIngredientResponse, RecipeResponse, ShortRecipeResponse};
use crate::models::{amount_ingredient, cart, favorite, ingredient, recipe, recipe_tag, tag, users};
use crate::services::relation_service::conflict_on_unique;
use crate::services::user_service::UserService;
use crate::utils::image::{self, image_url};

pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32_000;

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i32,
}

/// Payload POST / PATCH. En PATCH tous les champs sont optionnels,
/// un champ absent garde sa valeur.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RecipeWrite {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<i32>>,
    pub image: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 300))]
    pub cooking_time: Option<i32>,
}

impl RecipeWrite {
    /// Vérifications sans BD. `partial = false` pour la création.
    fn check(&self, partial: bool) -> Result<(), ApiError> {
        self.validate()?;

        if !partial {
            let missing = [
                ("ingredients", self.ingredients.is_none()),
                ("tags", self.tags.is_none()),
                ("image", self.image.is_none()),
                ("name", self.name.is_none()),
                ("text", self.text.is_none()),
                ("cooking_time", self.cooking_time.is_none()),
            ];
            if let Some((field, _)) = missing.iter().find(|(_, absent)| *absent) {
                return Err(ApiError::field(*field, "This field is required."));
            }
        }

        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ApiError::field("name", "This field may not be blank."));
            }
        }

        if let Some(tags) = &self.tags {
            if tags.is_empty() {
                return Err(ApiError::field("tags", "At least one tag is required."));
            }
        }

        if let Some(ingredients) = &self.ingredients {
            if ingredients.is_empty() {
                return Err(ApiError::field(
                    "ingredients",
                    "At least one ingredient is required.",
                ));
            }
            let mut seen = HashSet::new();
            for item in ingredients {
                if !seen.insert(item.id) {
                    return Err(ApiError::field(
                        "ingredients",
                        format!("Ingredient {} is listed twice.", item.id),
                    ));
                }
                if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&item.amount) {
                    return Err(ApiError::field(
                        "ingredients",
                        format!("Amount must be between {MIN_AMOUNT} and {MAX_AMOUNT}."),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Filtres de la liste des recettes (query string)
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecipeQuery {
    pub tags: Vec<String>,
    pub author: Option<i32>,
    pub is_in_shopping_cart: Option<bool>,
    pub is_favorited: Option<bool>,
}

impl RecipeQuery {
    /// `tags` peut être répété ; valeurs inconnues des drapeaux = pas de filtre
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut query = RecipeQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "tags" if !value.is_empty() => query.tags.push(value.clone()),
                "author" => query.author = value.parse().ok(),
                "is_in_shopping_cart" => query.is_in_shopping_cart = flag(value),
                "is_favorited" => query.is_favorited = flag(value),
                _ => {}
            }
        }
        query
    }
}

fn flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// "борщ украинский" -> "Борщ украинский"
pub fn capitalize(value: &str) -> String {
    let mut chars = value.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub struct RecipeService;

impl RecipeService {
    /// Requête filtrée, plus récentes d'abord
    pub fn filtered(query: &RecipeQuery, viewer: Option<i32>) -> Select<recipe::Entity> {
        let mut select = recipe::Entity::find()
            .order_by_desc(recipe::Column::PubDate)
            .order_by_desc(recipe::Column::Id);

        if !query.tags.is_empty() {
            let tag_ids = Query::select()
                .column(tag::Column::Id)
                .from(tag::Entity)
                .and_where(tag::Column::Slug.is_in(query.tags.clone()))
                .to_owned();
            let tagged = Query::select()
                .column(recipe_tag::Column::RecipeId)
                .from(recipe_tag::Entity)
                .and_where(recipe_tag::Column::TagId.in_subquery(tag_ids))
                .to_owned();
            select = select.filter(recipe::Column::Id.in_subquery(tagged));
        }

        if let Some(author) = query.author {
            select = select.filter(recipe::Column::AuthorId.eq(author));
        }

        // Panier / favoris : seulement pour un utilisateur connecté
        let Some(viewer) = viewer else {
            return select;
        };

        if let Some(in_cart) = query.is_in_shopping_cart {
            let carted = Query::select()
                .column(cart::Column::RecipeId)
                .from(cart::Entity)
                .and_where(cart::Column::UserId.eq(viewer))
                .to_owned();
            select = if in_cart {
                select.filter(recipe::Column::Id.in_subquery(carted))
            } else {
                select.filter(recipe::Column::Id.not_in_subquery(carted))
            };
        }

        if let Some(favorited) = query.is_favorited {
            let favorites = Query::select()
                .column(favorite::Column::RecipeId)
                .from(favorite::Entity)
                .and_where(favorite::Column::UserId.eq(viewer))
                .to_owned();
            select = if favorited {
                select.filter(recipe::Column::Id.in_subquery(favorites))
            } else {
                select.filter(recipe::Column::Id.not_in_subquery(favorites))
            };
        }

        select
    }

    pub async fn list(
        db: &DatabaseConnection,
        viewer: Option<i32>,
        query: &RecipeQuery,
        page: u64,
        limit: u64,
    ) -> Result<(u64, Vec<RecipeResponse>), ApiError> {
        let paginator = Self::filtered(query, viewer).paginate(db, limit);
        let count = paginator.num_items().await?;
        let recipes = paginator.fetch_page(page - 1).await?;

        Ok((count, Self::represent_many(db, viewer, recipes).await?))
    }

    pub async fn find(db: &DatabaseConnection, id: i32) -> Result<recipe::Model, ApiError> {
        recipe::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found("Recipe"))
    }

    pub async fn get(
        db: &DatabaseConnection,
        viewer: Option<i32>,
        id: i32,
    ) -> Result<RecipeResponse, ApiError> {
        let recipe = Self::find(db, id).await?;
        Self::represent(db, viewer, recipe).await
    }

    pub async fn short(db: &DatabaseConnection, id: i32) -> Result<ShortRecipeResponse, ApiError> {
        Ok(ShortRecipeResponse::from(Self::find(db, id).await?))
    }

    pub async fn represent(
        db: &DatabaseConnection,
        viewer: Option<i32>,
        recipe: recipe::Model,
    ) -> Result<RecipeResponse, ApiError> {
        Self::represent_many(db, viewer, vec![recipe])
            .await?
            .pop()
            .ok_or_else(|| ApiError::Internal("empty recipe representation".to_string()))
    }

    /// Représentation complète, chargée par lots
    pub async fn represent_many(
        db: &DatabaseConnection,
        viewer: Option<i32>,
        recipes: Vec<recipe::Model>,
    ) -> Result<Vec<RecipeResponse>, ApiError> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();

        // auteurs
        let author_ids: HashSet<i32> = recipes.iter().map(|r| r.author_id).collect();
        let authors = users::Entity::find()
            .filter(users::Column::Id.is_in(author_ids))
            .all(db)
            .await?;
        let authors: HashMap<i32, _> = UserService::represent_many(db, viewer, authors)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        // tags
        let mut tags: HashMap<i32, Vec<tag::Model>> = HashMap::new();
        for (link, tag) in recipe_tag::Entity::find()
            .filter(recipe_tag::Column::RecipeId.is_in(ids.clone()))
            .order_by_asc(recipe_tag::Column::Id)
            .find_also_related(tag::Entity)
            .all(db)
            .await?
        {
            if let Some(tag) = tag {
                tags.entry(link.recipe_id).or_default().push(tag);
            }
        }

        // ingrédients + quantités
        let mut ingredients: HashMap<i32, Vec<RecipeIngredientResponse>> = HashMap::new();
        for (amount, ingredient) in amount_ingredient::Entity::find()
            .filter(amount_ingredient::Column::RecipeId.is_in(ids.clone()))
            .order_by_asc(amount_ingredient::Column::Id)
            .find_also_related(ingredient::Entity)
            .all(db)
            .await?
        {
            if let Some(ingredient) = ingredient {
                ingredients
                    .entry(amount.recipe_id)
                    .or_default()
                    .push(RecipeIngredientResponse {
                        id: ingredient.id,
                        name: ingredient.name,
                        measurement_unit: ingredient.measurement_unit,
                        amount: amount.amount,
                    });
            }
        }

        let (favorited, in_cart): (HashSet<i32>, HashSet<i32>) = match viewer {
            Some(user_id) => (
                favorite::Entity::find()
                    .filter(favorite::Column::UserId.eq(user_id))
                    .filter(favorite::Column::RecipeId.is_in(ids.clone()))
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|f| f.recipe_id)
                    .collect(),
                cart::Entity::find()
                    .filter(cart::Column::UserId.eq(user_id))
                    .filter(cart::Column::RecipeId.is_in(ids.clone()))
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|c| c.recipe_id)
                    .collect(),
            ),
            None => (HashSet::new(), HashSet::new()),
        };

        let mut responses = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            let author = match authors.get(&recipe.author_id) {
                Some(author) => author.clone(),
                None => {
                    return Err(ApiError::Internal(format!(
                        "author of recipe {} missing",
                        recipe.id
                    )));
                }
            };
            responses.push(RecipeResponse {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: image_url(&recipe.image),
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            });
        }

        Ok(responses)
    }

    pub async fn create(
        db: &DatabaseConnection,
        config: &AppConfig,
        author_id: i32,
        payload: RecipeWrite,
    ) -> Result<recipe::Model, ApiError> {
        payload.check(false)?;

        let data_uri = payload.image.as_deref().unwrap_or_default();
        let image = image::save_base64_image(data_uri, &config.media_root).await?;

        match Self::insert(db, author_id, &payload, &image).await {
            Ok(recipe) => {
                info!(recipe_id = recipe.id, author_id, "recipe created");
                Ok(recipe)
            }
            Err(e) => {
                image::remove_image(&image, &config.media_root).await;
                Err(e)
            }
        }
    }

    async fn insert(
        db: &DatabaseConnection,
        author_id: i32,
        payload: &RecipeWrite,
        image: &str,
    ) -> Result<recipe::Model, ApiError> {
        let name = capitalize(payload.name.as_deref().unwrap_or_default());

        let txn = db.begin().await?;
        ensure_unique_name(&txn, &name, author_id, None).await?;

        let recipe = recipe::ActiveModel {
            name: Set(name),
            author_id: Set(author_id),
            image: Set(image.to_string()),
            text: Set(payload.text.clone().unwrap_or_default()),
            cooking_time: Set(payload.cooking_time.unwrap_or_default()),
            pub_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| conflict_on_unique(e, "You already have a recipe with this name."))?;

        if let Some(tags) = &payload.tags {
            set_tags(&txn, recipe.id, tags).await?;
        }
        if let Some(ingredients) = &payload.ingredients {
            set_ingredients(&txn, recipe.id, ingredients).await?;
        }

        txn.commit().await?;
        Ok(recipe)
    }

    pub async fn update(
        db: &DatabaseConnection,
        config: &AppConfig,
        auth: &AuthUser,
        recipe_id: i32,
        payload: RecipeWrite,
    ) -> Result<recipe::Model, ApiError> {
        let current = Self::find(db, recipe_id).await?;
        if !auth.can_edit(current.author_id) {
            return Err(ApiError::Forbidden);
        }
        payload.check(true)?;

        let new_image = match payload.image.as_deref() {
            Some(data_uri) => Some(image::save_base64_image(data_uri, &config.media_root).await?),
            None => None,
        };

        match Self::apply_update(db, current.clone(), &payload, new_image.as_deref()).await {
            Ok(updated) => {
                if new_image.is_some() {
                    image::remove_image(&current.image, &config.media_root).await;
                }
                info!(recipe_id, user_id = auth.user_id, "recipe updated");
                Ok(updated)
            }
            Err(e) => {
                if let Some(image) = &new_image {
                    image::remove_image(image, &config.media_root).await;
                }
                Err(e)
            }
        }
    }

    async fn apply_update(
        db: &DatabaseConnection,
        current: recipe::Model,
        payload: &RecipeWrite,
        new_image: Option<&str>,
    ) -> Result<recipe::Model, ApiError> {
        let txn = db.begin().await?;
        let recipe_id = current.id;
        let author_id = current.author_id;
        let mut active: recipe::ActiveModel = current.into();

        if let Some(name) = &payload.name {
            let name = capitalize(name);
            ensure_unique_name(&txn, &name, author_id, Some(recipe_id)).await?;
            active.name = Set(name);
        }
        if let Some(text) = &payload.text {
            active.text = Set(text.clone());
        }
        if let Some(cooking_time) = payload.cooking_time {
            active.cooking_time = Set(cooking_time);
        }
        if let Some(image) = new_image {
            active.image = Set(image.to_string());
        }

        let updated = if active.is_changed() {
            active
                .update(&txn)
                .await
                .map_err(|e| conflict_on_unique(e, "You already have a recipe with this name."))?
        } else {
            recipe::Entity::find_by_id(recipe_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ApiError::not_found("Recipe"))?
        };

        if let Some(tags) = &payload.tags {
            set_tags(&txn, recipe_id, tags).await?;
        }
        if let Some(ingredients) = &payload.ingredients {
            set_ingredients(&txn, recipe_id, ingredients).await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete(
        db: &DatabaseConnection,
        config: &AppConfig,
        auth: &AuthUser,
        recipe_id: i32,
    ) -> Result<(), ApiError> {
        let recipe = Self::find(db, recipe_id).await?;
        if !auth.can_edit(recipe.author_id) {
            return Err(ApiError::Forbidden);
        }

        let txn = db.begin().await?;
        recipe_tag::Entity::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        amount_ingredient::Entity::delete_many()
            .filter(amount_ingredient::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        favorite::Entity::delete_many()
            .filter(favorite::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        cart::Entity::delete_many()
            .filter(cart::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        recipe::Entity::delete_by_id(recipe_id).exec(&txn).await?;
        txn.commit().await?;

        image::remove_image(&recipe.image, &config.media_root).await;
        info!(recipe_id, user_id = auth.user_id, "recipe deleted");
        Ok(())
    }
}

async fn ensure_unique_name<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    author_id: i32,
    exclude: Option<i32>,
) -> Result<(), ApiError> {
    let mut query = recipe::Entity::find()
        .filter(recipe::Column::Name.eq(name))
        .filter(recipe::Column::AuthorId.eq(author_id));
    if let Some(id) = exclude {
        query = query.filter(recipe::Column::Id.ne(id));
    }

    if query.one(conn).await?.is_some() {
        return Err(ApiError::field("name", "You already have a recipe with this name."));
    }
    Ok(())
}

/// Remplace les tags de la recette (doublons ignorés)
async fn set_tags<C: ConnectionTrait>(
    conn: &C,
    recipe_id: i32,
    tag_ids: &[i32],
) -> Result<(), ApiError> {
    let mut unique: Vec<i32> = Vec::new();
    for id in tag_ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }

    let known: HashSet<i32> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(unique.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if let Some(missing) = unique.iter().find(|id| !known.contains(id)) {
        return Err(ApiError::field(
            "tags",
            format!("Invalid pk \"{missing}\" - object does not exist."),
        ));
    }

    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    recipe_tag::Entity::insert_many(unique.into_iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
        ..Default::default()
    }))
    .exec(conn)
    .await?;

    Ok(())
}

/// Remplace les ingrédients de la recette
async fn set_ingredients<C: ConnectionTrait>(
    conn: &C,
    recipe_id: i32,
    items: &[IngredientAmount],
) -> Result<(), ApiError> {
    let ids: Vec<i32> = items.iter().map(|i| i.id).collect();
    let known: HashSet<i32> = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();
    if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
        return Err(ApiError::field(
            "ingredients",
            format!("Ingredient {missing} does not exist."),
        ));
    }

    amount_ingredient::Entity::delete_many()
        .filter(amount_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    amount_ingredient::Entity::insert_many(items.iter().map(|item| amount_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(item.id),
        amount: Set(item.amount),
        ..Default::default()
    }))
    .exec(conn)
    .await?;

    Ok(())
}
