use std::collections::HashSet;
use std::path::Path;

use sea_orm::sea_query::{Expr, LikeExpr, SimpleExpr};
use sea_orm::*;
use serde::Deserialize;
use tracing::info;

use crate::error::ApiError;
use crate::models::ingredient::{self, Entity as Ingredient};

// Saisie faite avec le clavier en disposition latine au lieu de cyrillique
const LATIN_LAYOUT: &str = "qwertyuiop[]asdfghjkl;'zxcvbnm,./";
const CYRILLIC_LAYOUT: &str = "йцукенгшщзхъфывапролджэячсмитьбю.";

/// Ligne du fichier de fixtures (data/ingredients.json)
#[derive(Debug, Deserialize)]
pub struct IngredientFixture {
    pub name: String,
    pub measurement_unit: String,
}

/// `%`, `_` et `\\` pris littéralement dans un motif LIKE (échappement `\\`)
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn name_like(pattern: String) -> SimpleExpr {
    Expr::col(ingredient::Column::Name).like(LikeExpr::new(pattern).escape('\\'))
}

pub struct IngredientService;

impl IngredientService {
    /// Prépare la saisie utilisateur pour la recherche.
    ///
    /// `%...` = valeur encodée pour l'URL, on la décode.
    /// Sinon chaque touche latine est remplacée par la touche cyrillique
    /// à la même position sur le clavier.
    pub fn normalize_query(raw: &str) -> String {
        if raw.starts_with('%') {
            return urlencoding::decode(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string())
                .to_lowercase();
        }

        raw.chars()
            .map(|c| {
                LATIN_LAYOUT
                    .chars()
                    .position(|l| l == c)
                    .and_then(|i| CYRILLIC_LAYOUT.chars().nth(i))
                    .unwrap_or(c)
            })
            .collect::<String>()
            .to_lowercase()
    }

    /// Début du nom d'abord, puis le reste des noms qui contiennent la saisie
    pub async fn search(
        db: &DatabaseConnection,
        name: Option<&str>,
    ) -> Result<Vec<ingredient::Model>, DbErr> {
        let query = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(raw) => Self::normalize_query(raw),
            None => {
                return Ingredient::find()
                    .order_by_asc(ingredient::Column::Name)
                    .all(db)
                    .await;
            }
        };

        let escaped = escape_like(&query);

        let mut found = Ingredient::find()
            .filter(name_like(format!("{escaped}%")))
            .order_by_asc(ingredient::Column::Name)
            .all(db)
            .await?;

        let seen: Vec<i32> = found.iter().map(|i| i.id).collect();
        let contained = Ingredient::find()
            .filter(name_like(format!("%{escaped}%")))
            .filter(ingredient::Column::Id.is_not_in(seen))
            .order_by_asc(ingredient::Column::Name)
            .all(db)
            .await?;

        found.extend(contained);
        Ok(found)
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> Result<ingredient::Model, ApiError> {
        Ingredient::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found("Ingredient"))
    }

    /// Charge un fichier JSON `[{name, measurement_unit}, ...]`.
    /// Les couples déjà en base (ou répétés dans le fichier) sont ignorés.
    /// Retourne le nombre d'ingrédients insérés.
    pub async fn load_fixture(db: &DatabaseConnection, path: &Path) -> Result<usize, ApiError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ApiError::Internal(format!("Cannot read {}: {}", path.display(), e)))?;
        let rows: Vec<IngredientFixture> = serde_json::from_str(&content)
            .map_err(|e| ApiError::BadRequest(format!("Invalid fixture file: {}", e)))?;

        Self::insert_new(db, rows).await
    }

    pub async fn insert_new(
        db: &DatabaseConnection,
        rows: Vec<IngredientFixture>,
    ) -> Result<usize, ApiError> {
        let mut known: HashSet<(String, String)> = Ingredient::find()
            .all(db)
            .await?
            .into_iter()
            .map(|i| (i.name, i.measurement_unit))
            .collect();

        let mut to_insert = Vec::new();
        for row in rows {
            let name = row.name.trim().to_lowercase();
            let unit = row.measurement_unit.trim().to_lowercase();
            if name.is_empty() || unit.is_empty() {
                continue;
            }
            if known.insert((name.clone(), unit.clone())) {
                to_insert.push(ingredient::ActiveModel {
                    name: Set(name),
                    measurement_unit: Set(unit),
                    ..Default::default()
                });
            }
        }

        let inserted = to_insert.len();
        if inserted > 0 {
            let txn = db.begin().await?;
            Ingredient::insert_many(to_insert).exec(&txn).await?;
            txn.commit().await?;
        }

        info!(inserted, "ingredients loaded");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_ingredient, setup_db};

    fn names(items: &[ingredient::Model]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_normalize_wrong_layout() {
        // "vjkjrj" tapé en disposition latine = "молоко"
        assert_eq!(IngredientService::normalize_query("vjkjrj"), "молоко");
        assert_eq!(IngredientService::normalize_query("vjk"), "мол");
        assert_eq!(IngredientService::normalize_query("Мол"), "мол");
    }

    #[test]
    fn test_normalize_url_encoded() {
        assert_eq!(
            IngredientService::normalize_query("%D0%9C%D0%BE%D0%BB"),
            "мол"
        );
    }

    #[actix_web::test]
    async fn test_prefix_matches_come_first() {
        let db = setup_db().await;
        create_ingredient(&db, "сгущённое молоко", "г").await;
        create_ingredient(&db, "молоко", "мл").await;
        create_ingredient(&db, "молоко", "г").await;
        create_ingredient(&db, "мука", "г").await;
        create_ingredient(&db, "кокосовое молоко", "мл").await;

        let found = IngredientService::search(&db, Some("мол")).await.unwrap();

        assert_eq!(
            names(&found),
            vec!["молоко", "молоко", "кокосовое молоко", "сгущённое молоко"]
        );
        let ids: HashSet<i32> = found.iter().map(|i| i.id).collect();
        assert_eq!(ids.len(), found.len());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("мол"), "мол");
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    }

    #[actix_web::test]
    async fn test_wildcards_are_literal() {
        let db = setup_db().await;
        create_ingredient(&db, "соль", "г").await;
        create_ingredient(&db, "мука", "г").await;
        create_ingredient(&db, "сахар_тростниковый", "г").await;

        assert!(IngredientService::search(&db, Some("%")).await.unwrap().is_empty());

        let found = IngredientService::search(&db, Some("_")).await.unwrap();
        assert_eq!(names(&found), vec!["сахар_тростниковый"]);

        let found = IngredientService::search(&db, Some("р_т")).await.unwrap();
        assert_eq!(names(&found), vec!["сахар_тростниковый"]);
    }

    #[actix_web::test]
    async fn test_empty_query_returns_all_sorted() {
        let db = setup_db().await;
        create_ingredient(&db, "соль", "г").await;
        create_ingredient(&db, "вода", "мл").await;

        let found = IngredientService::search(&db, None).await.unwrap();
        assert_eq!(names(&found), vec!["вода", "соль"]);

        let found = IngredientService::search(&db, Some("  ")).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[actix_web::test]
    async fn test_no_match_is_empty() {
        let db = setup_db().await;
        create_ingredient(&db, "соль", "г").await;

        let found = IngredientService::search(&db, Some("сахар")).await.unwrap();
        assert!(found.is_empty());
    }

    #[actix_web::test]
    async fn test_load_fixture_skips_duplicates() {
        let db = setup_db().await;
        create_ingredient(&db, "соль", "г").await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingredients.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "Соль", "measurement_unit": "г"},
                {"name": "Перец", "measurement_unit": "г"},
                {"name": "перец", "measurement_unit": "г"},
                {"name": "Перец", "measurement_unit": "щепотка"}
            ]"#,
        )
        .unwrap();

        let inserted = IngredientService::load_fixture(&db, &path).await.unwrap();
        assert_eq!(inserted, 2);

        // second passage : rien de nouveau
        let inserted = IngredientService::load_fixture(&db, &path).await.unwrap();
        assert_eq!(inserted, 0);

        assert_eq!(Ingredient::find().count(&db).await.unwrap(), 3);
    }
}
