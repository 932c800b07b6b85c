use sea_orm::entity::prelude::*;

// Tokens invalidés par /auth/token/logout/.
// Le jti suffit : le token expiré est de toute façon rejeté à la vérification,
// expires_at permet de purger la table plus tard.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "revoked_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub jti: String,
    pub user_id: i32,
    pub expires_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
