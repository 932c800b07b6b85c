// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table avec SeaORM, sauf dto/health
//   (réponses JSON).
//
// Liste des modules:
//   - users : Utilisateurs (email/username uniques, is_active, is_staff)
//   - tag : Tags des recettes (couleur #RRGGBB, slug)
//   - ingredient : Ingrédients + unité de mesure
//   - recipe : Recettes (auteur, image, temps de préparation)
//   - recipe_tag : Jointure recette <-> tag
//   - amount_ingredient : Jointure recette <-> ingrédient avec quantité
//   - favorite / cart : Jointures utilisateur <-> recette
//   - subscription : Jointure abonné <-> auteur
//   - revoked_token : Tokens invalidés au logout
//   - dto : Réponses JSON de l'API
//
// Points d'attention:
//   - Les contraintes d'unicité sur plusieurs colonnes sont créées dans db.rs
//   - Toutes les FK vers recipe/users sont en ON DELETE CASCADE
//
// ============================================================================

pub mod health;
pub mod dto;
pub mod users;
pub mod tag;
pub mod ingredient;
pub mod recipe;
pub mod recipe_tag;
pub mod amount_ingredient;
pub mod favorite;
pub mod cart;
pub mod subscription;
pub mod revoked_token;
