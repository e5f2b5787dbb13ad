//! Seed helpers shared by the service tests.

use std::sync::Arc;

use crate::{
    memory::MemoryStore,
    schema::{
        Id, Ingredient, NewIngredient, NewIngredientLine, NewRecipe, NewTag, NewUser, Recipe,
        RecipeFields, Tag, User, UserRole,
    },
    store::EntityStore,
};

/// A 1x1 PNG.
pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn store() -> Arc<dyn EntityStore> {
    Arc::new(MemoryStore::new())
}

pub async fn user(store: &Arc<dyn EntityStore>, username: &str) -> User {
    store
        .create_user(NewUser {
            email: format!("{username}@example.com"),
            username: username.to_owned(),
            first_name: username.to_owned(),
            last_name: String::from("Tester"),
            password: String::from("not-a-hash"),
            role: UserRole::User,
        })
        .await
        .unwrap()
}

pub async fn ingredient(store: &Arc<dyn EntityStore>, name: &str, unit: &str) -> Ingredient {
    store
        .create_ingredient(NewIngredient {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
        })
        .await
        .unwrap()
}

pub async fn tag(store: &Arc<dyn EntityStore>, slug: &str) -> Tag {
    store
        .create_tag(NewTag {
            name: slug.to_uppercase(),
            color: String::from("#E26C2D"),
            slug: slug.to_owned(),
        })
        .await
        .unwrap()
}

pub fn fields(name: &str) -> RecipeFields {
    RecipeFields {
        name: name.to_owned(),
        text: String::from("Mix and bake."),
        image: String::from("recipes/images/test.png"),
        cooking_time: 30,
    }
}

pub fn lines(lines: &[(Id, i32)]) -> Vec<NewIngredientLine> {
    lines
        .iter()
        .map(|(ingredient_id, amount)| NewIngredientLine {
            ingredient_id: *ingredient_id,
            amount: *amount,
        })
        .collect()
}

pub async fn recipe(
    store: &Arc<dyn EntityStore>,
    author: &User,
    name: &str,
    tag_ids: &[Id],
    ingredient_lines: &[(Id, i32)],
) -> Recipe {
    store
        .insert_recipe(NewRecipe {
            author_id: author.id,
            fields: fields(name),
            tag_ids: tag_ids.to_vec(),
            lines: lines(ingredient_lines),
        })
        .await
        .unwrap()
}
