use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Données de référence chargées une fois (commande `load-ingredients`).
// Le couple (name, measurement_unit) est unique, index créé dans db.rs.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredient")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::amount_ingredient::Entity")]
    AmountIngredient,
}

impl Related<super::amount_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AmountIngredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
