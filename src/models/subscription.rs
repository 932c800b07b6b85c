use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Abonnement d'un utilisateur (user_id) à un auteur (author_id).
//   - couple (user_id, author_id) unique (index dans db.rs)
//   - user_id != author_id (vérifié par SubscriptionLink::check)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub author_id: i32,
    pub date_added: DateTimeUtc,
}

// Deux FK vers users : pas d'impl Related (ambigu), on passe par les colonnes
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Subscriber,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl ActiveModelBehavior for ActiveModel {}
