use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres};

use super::{
    actions::{ingredients, recipes, relations, tags, users},
    error::{Error, QueryError},
    schema::{
        Id, Ingredient, IngredientLine, NewIngredient, NewRecipe, NewTag, NewUser, Recipe,
        RecipeChanges, RecipeQuery, Relation, RelationKind, Tag, User,
    },
    store::EntityStore,
};

const SCHEMA: &str = "
DO $$ BEGIN
    CREATE TYPE user_role AS ENUM ('user', 'admin');
EXCEPTION
    WHEN duplicate_object THEN NULL;
END $$;

CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    email VARCHAR(254) NOT NULL UNIQUE,
    username VARCHAR(150) NOT NULL UNIQUE,
    first_name VARCHAR(150) NOT NULL,
    last_name VARCHAR(150) NOT NULL,
    password TEXT NOT NULL,
    role user_role NOT NULL DEFAULT 'user'
);

CREATE TABLE IF NOT EXISTS tags (
    id SERIAL PRIMARY KEY,
    name VARCHAR(150) NOT NULL,
    color VARCHAR(16) NOT NULL,
    slug VARCHAR(16) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS ingredients (
    id SERIAL PRIMARY KEY,
    name VARCHAR(150) NOT NULL,
    measurement_unit VARCHAR(16) NOT NULL
);

CREATE TABLE IF NOT EXISTS recipes (
    id SERIAL PRIMARY KEY,
    author_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    name VARCHAR(200) NOT NULL,
    text TEXT NOT NULL,
    image TEXT NOT NULL,
    cooking_time INTEGER NOT NULL CHECK (cooking_time > 0)
);

CREATE TABLE IF NOT EXISTS recipe_tags (
    recipe_id INTEGER NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
    PRIMARY KEY (recipe_id, tag_id)
);

CREATE TABLE IF NOT EXISTS recipe_ingredients (
    id SERIAL PRIMARY KEY,
    recipe_id INTEGER NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
    ingredient_id INTEGER NOT NULL REFERENCES ingredients (id) ON DELETE CASCADE,
    amount INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS favorites (
    id SERIAL PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    recipe_id INTEGER NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
    UNIQUE (user_id, recipe_id)
);

CREATE TABLE IF NOT EXISTS shopping_cart (
    id SERIAL PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    recipe_id INTEGER NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
    UNIQUE (user_id, recipe_id)
);

CREATE TABLE IF NOT EXISTS follows (
    id SERIAL PRIMARY KEY,
    follower_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    author_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    UNIQUE (follower_id, author_id),
    CONSTRAINT follows_no_self_follow CHECK (follower_id <> author_id)
);
";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(QueryError::from)?;

        Ok(Self::new(pool))
    }

    /// Creates missing types and tables. Safe to run on every start.
    pub async fn ensure_schema(&self) -> Result<(), Error> {
        self.pool.execute(SCHEMA).await.map_err(QueryError::from)?;
        log::info!("Database schema is up to date");

        Ok(())
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        users::register_user(user, &self.pool).await
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        users::get_user(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        users::find_user_by_email(&self.pool, email).await
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), Error> {
        users::list_users(offset, limit, &self.pool).await
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag, Error> {
        tags::create_tag(tag, &self.pool).await
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        tags::get_tag(id, &self.pool).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        tags::list_tags(&self.pool).await
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, Error> {
        ingredients::create_ingredient(ingredient, &self.pool).await
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        ingredients::get_ingredient(id, &self.pool).await
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        ingredients::list_ingredients(name_prefix, &self.pool).await
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        recipes::get_recipe(id, &self.pool).await
    }

    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        tags::list_recipe_tags(&self.pool, recipe_id).await
    }

    async fn recipe_lines(&self, recipe_id: Id) -> Result<Vec<IngredientLine>, Error> {
        ingredients::list_recipe_lines(&self.pool, recipe_id).await
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, Error> {
        recipes::create_recipe(recipe, &self.pool).await
    }

    async fn update_recipe(&self, id: Id, changes: RecipeChanges) -> Result<Recipe, Error> {
        recipes::update_recipe(id, changes, &self.pool).await
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, Error> {
        recipes::delete_recipe(id, &self.pool).await
    }

    async fn query_recipes(
        &self,
        query: &RecipeQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        recipes::fetch_recipes(query, offset, limit, &self.pool).await
    }

    async fn recipes_by_author(&self, author: Id, limit: Option<i64>) -> Result<Vec<Recipe>, Error> {
        recipes::list_author_recipes(author, limit, &self.pool).await
    }

    async fn count_recipes_by_author(&self, author: Id) -> Result<i64, Error> {
        recipes::count_author_recipes(author, &self.pool).await
    }

    async fn insert_relation(
        &self,
        kind: RelationKind,
        user: Id,
        target: Id,
    ) -> Result<Option<Relation>, Error> {
        relations::add_relation(kind, user, target, &self.pool).await
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        user: Id,
        target: Id,
    ) -> Result<bool, Error> {
        relations::remove_relation(kind, user, target, &self.pool).await
    }

    async fn relation_exists(
        &self,
        kind: RelationKind,
        user: Id,
        target: Id,
    ) -> Result<bool, Error> {
        relations::has_relation(kind, user, target, &self.pool).await
    }

    async fn count_relations(&self, kind: RelationKind, target: Id) -> Result<i64, Error> {
        relations::count_relations(kind, target, &self.pool).await
    }

    async fn followed_users(
        &self,
        follower: Id,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        relations::fetch_followed_users(follower, offset, limit, &self.pool).await
    }

    async fn cart_lines(&self, user: Id) -> Result<Vec<IngredientLine>, Error> {
        relations::list_cart_lines(user, &self.pool).await
    }
}
