// connexion BD + création du schéma

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use tracing::info;

use crate::models::{
    amount_ingredient, cart, favorite, ingredient, recipe, recipe_tag, revoked_token,
    subscription, tag, users,
};

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);

    Database::connect(options).await
}

/// Crée les tables (si absentes) puis les index d'unicité multi-colonnes.
/// L'ordre compte : une table est créée après celles qu'elle référence.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, users::Entity).await?;
    create_table(db, tag::Entity).await?;
    create_table(db, ingredient::Entity).await?;
    create_table(db, recipe::Entity).await?;
    create_table(db, recipe_tag::Entity).await?;
    create_table(db, amount_ingredient::Entity).await?;
    create_table(db, favorite::Entity).await?;
    create_table(db, cart::Entity).await?;
    create_table(db, subscription::Entity).await?;
    create_table(db, revoked_token::Entity).await?;

    for index in unique_indexes() {
        db.execute(db.get_database_backend().build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();

    db.execute(backend.build(&statement)).await?;
    Ok(())
}

fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uq_ingredient_name_unit")
            .table(ingredient::Entity)
            .col(ingredient::Column::Name)
            .col(ingredient::Column::MeasurementUnit)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_recipe_name_author")
            .table(recipe::Entity)
            .col(recipe::Column::Name)
            .col(recipe::Column::AuthorId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_recipe_tag")
            .table(recipe_tag::Entity)
            .col(recipe_tag::Column::RecipeId)
            .col(recipe_tag::Column::TagId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_amount_ingredient")
            .table(amount_ingredient::Entity)
            .col(amount_ingredient::Column::RecipeId)
            .col(amount_ingredient::Column::IngredientId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_favorite_user_recipe")
            .table(favorite::Entity)
            .col(favorite::Column::UserId)
            .col(favorite::Column::RecipeId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_cart_user_recipe")
            .table(cart::Entity)
            .col(cart::Column::UserId)
            .col(cart::Column::RecipeId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_subscription_user_author")
            .table(subscription::Entity)
            .col(subscription::Column::UserId)
            .col(subscription::Column::AuthorId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}
