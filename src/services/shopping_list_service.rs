use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::*;

use crate::error::ApiError;
use crate::models::{amount_ingredient, cart, ingredient};

const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Une ligne de la liste : quantité totale d'un ingrédient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

pub struct ShoppingListService;

impl ShoppingListService {
    /// Somme des quantités par ingrédient (id), triée par nom puis unité.
    /// Même nom + autre unité = autre ingrédient, donc autre ligne.
    pub fn aggregate<I>(rows: I) -> Vec<ShoppingLine>
    where
        I: IntoIterator<Item = (ingredient::Model, i32)>,
    {
        let mut totals: BTreeMap<i32, ShoppingLine> = BTreeMap::new();

        for (ingredient, amount) in rows {
            totals
                .entry(ingredient.id)
                .or_insert_with(|| ShoppingLine {
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: 0,
                })
                .amount += i64::from(amount);
        }

        let mut lines: Vec<ShoppingLine> = totals.into_values().collect();
        lines.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
        });
        lines
    }

    /// Texte du fichier téléchargé
    pub fn render(username: &str, at: DateTime<Utc>, lines: &[ShoppingLine]) -> String {
        let mut parts = vec![format!(
            "Список покупок для:\n\n{}\n{}\n",
            username,
            at.format(DATE_TIME_FORMAT)
        )];
        parts.extend(
            lines
                .iter()
                .map(|l| format!("{}: {} {}", l.name, l.amount, l.measurement_unit)),
        );
        parts.push("\nПосчитано в Foodgram".to_string());
        parts.join("\n")
    }

    /// Lignes agrégées pour le panier de l'utilisateur.
    /// Panier vide -> 400.
    pub async fn lines_for_user(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> Result<Vec<ShoppingLine>, ApiError> {
        let recipe_ids: Vec<i32> = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|c| c.recipe_id)
            .collect();

        if recipe_ids.is_empty() {
            return Err(ApiError::BadRequest("Shopping cart is empty.".to_string()));
        }

        let rows = amount_ingredient::Entity::find()
            .filter(amount_ingredient::Column::RecipeId.is_in(recipe_ids))
            .find_also_related(ingredient::Entity)
            .all(db)
            .await?;

        Ok(Self::aggregate(rows.into_iter().filter_map(
            |(amount, ingredient)| ingredient.map(|i| (i, amount.amount)),
        )))
    }

    pub async fn build(
        db: &DatabaseConnection,
        user_id: i32,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<String, ApiError> {
        let lines = Self::lines_for_user(db, user_id).await?;
        Ok(Self::render(username, at, &lines))
    }
}
