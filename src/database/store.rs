use async_trait::async_trait;

use super::{
    error::Error,
    schema::{
        Id, Ingredient, IngredientLine, NewIngredient, NewRecipe, NewTag, NewUser, Recipe,
        RecipeChanges, RecipeQuery, Relation, RelationKind, Tag, User,
    },
};

/// Typed repository over every persisted entity.
///
/// Multi-row writes (`insert_recipe`, `update_recipe`, `delete_recipe`) are
/// all-or-nothing: either every row of the recipe version lands or none does.
/// Relation pairs are unique per `(kind, user, target)`; a second insert of the
/// same pair reports `None` instead of writing.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;
    async fn get_user(&self, id: Id) -> Result<Option<User>, Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn list_users(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), Error>;

    async fn create_tag(&self, tag: NewTag) -> Result<Tag, Error>;
    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error>;
    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, Error>;
    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error>;
    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error>;

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error>;
    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error>;
    async fn recipe_lines(&self, recipe_id: Id) -> Result<Vec<IngredientLine>, Error>;
    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, Error>;
    async fn update_recipe(&self, id: Id, changes: RecipeChanges) -> Result<Recipe, Error>;
    async fn delete_recipe(&self, id: Id) -> Result<bool, Error>;
    async fn query_recipes(
        &self,
        query: &RecipeQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), Error>;
    async fn recipes_by_author(&self, author: Id, limit: Option<i64>) -> Result<Vec<Recipe>, Error>;
    async fn count_recipes_by_author(&self, author: Id) -> Result<i64, Error>;

    async fn insert_relation(
        &self,
        kind: RelationKind,
        user: Id,
        target: Id,
    ) -> Result<Option<Relation>, Error>;
    async fn delete_relation(&self, kind: RelationKind, user: Id, target: Id)
        -> Result<bool, Error>;
    async fn relation_exists(&self, kind: RelationKind, user: Id, target: Id)
        -> Result<bool, Error>;
    async fn count_relations(&self, kind: RelationKind, target: Id) -> Result<i64, Error>;
    async fn followed_users(
        &self,
        follower: Id,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), Error>;
    /// Lines of every recipe in the user's cart, cart order first, then line order.
    async fn cart_lines(&self, user: Id) -> Result<Vec<IngredientLine>, Error>;
}
