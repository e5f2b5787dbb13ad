use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

/// The three user-to-target join tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Favorite,
    Cart,
    Follow,
}

impl RelationKind {
    pub fn table(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::Cart => "shopping_cart",
            RelationKind::Follow => "follows",
        }
    }

    pub fn user_column(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::Cart => "user_id",
            RelationKind::Follow => "follower_id",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::Cart => "recipe_id",
            RelationKind::Follow => "author_id",
        }
    }

    /// What the target id points at, used in error messages.
    pub fn target_name(&self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::Cart => "Recipe",
            RelationKind::Follow => "User",
        }
    }

    pub fn duplicate_message(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "Recipe is already in favorites",
            RelationKind::Cart => "Recipe is already in the shopping cart",
            RelationKind::Follow => "Already subscribed to this user",
        }
    }

    pub fn missing_message(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "Recipe is not in favorites",
            RelationKind::Cart => "Recipe is not in the shopping cart",
            RelationKind::Follow => "Not subscribed to this user",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Already hashed.
    pub password: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
}

/// A recipe's ingredient line joined with its ingredient.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct IngredientLine {
    pub recipe_id: Id,
    pub ingredient_id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NewIngredientLine {
    #[serde(rename = "id")]
    pub ingredient_id: Id,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeFields {
    pub name: String,
    pub text: String,
    /// Relative media path.
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub author_id: Id,
    pub fields: RecipeFields,
    pub tag_ids: Vec<Id>,
    pub lines: Vec<NewIngredientLine>,
}

/// Partial recipe write. `None` fields keep their stored value, `lines` always
/// replaces the stored set.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    pub tag_ids: Option<Vec<Id>>,
    pub lines: Vec<NewIngredientLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub kind: RelationKind,
    pub user_id: Id,
    pub target_id: Id,
}

/// Store-level recipe predicate. Every set field narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeQuery {
    pub author: Option<Id>,
    /// Matches recipes carrying any of these slugs.
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<Id>,
    pub in_cart_of: Option<Id>,
}
