// Outils partagés par les tests : BD SQLite en mémoire avec le vrai schéma,
// config de test, fixtures insérées directement via SeaORM.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use tempfile::TempDir;

use crate::config::AppConfig;
use crate::db;
use crate::models::{amount_ingredient, cart, favorite, ingredient, recipe, recipe_tag, tag, users};
use crate::utils::{jwt, password};

pub const TEST_PASSWORD: &str = "tStpss123wrD";
pub const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Une seule connexion : chaque connexion SQLite ":memory:" a sa propre base
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    db::create_schema(&db).await.unwrap();
    db
}

pub struct TestContext {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    _media: TempDir,
}

pub async fn context() -> TestContext {
    let media = tempfile::tempdir().unwrap();
    let config = AppConfig {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_ttl_hours: 1,
        media_root: media.path().to_path_buf(),
        password_iterations: 1_000,
        page_size: 6,
    };

    TestContext {
        db: setup_db().await,
        config,
        _media: media,
    }
}

/// App actix complète (mêmes routes que le serveur)
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.db.clone()))
                .app_data(actix_web::web::Data::new($ctx.config.clone()))
                .configure(crate::routes::configure_routes),
        )
        .await
    };
}
pub(crate) use init_app;

pub async fn create_user(db: &DatabaseConnection, username: &str) -> users::Model {
    users::ActiveModel {
        email: Set(format!("{username}@example.com")),
        username: Set(username.to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        password_hash: Set(password::hash_password(TEST_PASSWORD, 1_000).unwrap()),
        is_active: Set(true),
        is_staff: Set(false),
        date_joined: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_staff(db: &DatabaseConnection, username: &str) -> users::Model {
    let user = create_user(db, username).await;
    let mut active: users::ActiveModel = user.into();
    active.is_staff = Set(true);
    active.update(db).await.unwrap()
}

/// Header Authorization attendu par le frontend ("Token <jwt>")
pub fn auth_header(config: &AppConfig, user: &users::Model) -> (&'static str, String) {
    let token =
        jwt::generate_token(user.id, &user.username, &config.jwt_secret, config.jwt_ttl_hours)
            .unwrap();
    ("Authorization", format!("Token {token}"))
}

pub async fn create_tag(db: &DatabaseConnection, slug: &str, color: &str) -> tag::Model {
    tag::ActiveModel {
        name: Set(slug.to_string()),
        color: Set(color.to_string()),
        slug: Set(slug.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_ingredient(
    db: &DatabaseConnection,
    name: &str,
    unit: &str,
) -> ingredient::Model {
    ingredient::ActiveModel {
        name: Set(name.to_string()),
        measurement_unit: Set(unit.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Recette insérée sans passer par le service (pas de fichier image)
pub async fn create_recipe(
    db: &DatabaseConnection,
    author: &users::Model,
    name: &str,
    tags: &[&tag::Model],
    ingredients: &[(&ingredient::Model, i32)],
) -> recipe::Model {
    let recipe = recipe::ActiveModel {
        name: Set(name.to_string()),
        author_id: Set(author.id),
        image: Set("recipe_images/test.png".to_string()),
        text: Set("Описание".to_string()),
        cooking_time: Set(10),
        pub_date: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    for tag in tags {
        recipe_tag::ActiveModel {
            recipe_id: Set(recipe.id),
            tag_id: Set(tag.id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    for (ingredient, amount) in ingredients {
        amount_ingredient::ActiveModel {
            recipe_id: Set(recipe.id),
            ingredient_id: Set(ingredient.id),
            amount: Set(*amount),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    recipe
}

pub async fn add_to_cart(db: &DatabaseConnection, user: &users::Model, recipe: &recipe::Model) {
    cart::ActiveModel {
        user_id: Set(user.id),
        recipe_id: Set(recipe.id),
        date_added: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn add_to_favorites(
    db: &DatabaseConnection,
    user: &users::Model,
    recipe: &recipe::Model,
) {
    favorite::ActiveModel {
        user_id: Set(user.id),
        recipe_id: Set(recipe.id),
        date_added: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}
