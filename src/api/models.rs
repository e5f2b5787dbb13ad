use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    pagination::Page,
    schema::{Id, IngredientLine, NewIngredientLine, Recipe, RelationKind, Tag, User},
    store::EntityStore,
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserRead {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

/// Returned once on registration.
#[derive(Serialize, Debug)]
pub struct UserCreated {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserCreated {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct FollowingUser {
    #[serde(flatten)]
    pub user: UserRead,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LineRead {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<IngredientLine> for LineRead {
    fn from(line: IngredientLine) -> Self {
        Self {
            id: line.ingredient_id,
            name: line.name,
            measurement_unit: line.measurement_unit,
            amount: line.amount,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RecipeRead {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserRead,
    pub ingredients: Vec<LineRead>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ShortRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Deserialize, Debug)]
pub struct Registration {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct AuthToken {
    pub auth_token: String,
}

/// Recipe write shape shared by create and update. Create requires every
/// field except `tags` and `ingredients`.
#[derive(Deserialize, Debug, Default)]
pub struct RecipeWrite {
    pub name: Option<String>,
    pub text: Option<String>,
    /// Base64 data URI.
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<NewIngredientLine>>,
}

/// Builds response shapes as seen by one requester.
pub struct Presenter<'a> {
    store: &'a dyn EntityStore,
    media_url: &'a str,
    requester: Option<Id>,
}

impl<'a> Presenter<'a> {
    pub fn new(store: &'a dyn EntityStore, media_url: &'a str, requester: Option<Id>) -> Self {
        Self {
            store,
            media_url,
            requester,
        }
    }

    fn image_url(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path)
    }

    async fn requester_has(&self, kind: RelationKind, target: Id) -> Result<bool, Error> {
        match self.requester {
            Some(user) => self.store.relation_exists(kind, user, target).await,
            None => Ok(false),
        }
    }

    pub async fn user(&self, user: User) -> Result<UserRead, Error> {
        let is_subscribed = self.requester_has(RelationKind::Follow, user.id).await?;

        Ok(UserRead {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        })
    }

    pub fn short_recipe(&self, recipe: Recipe) -> ShortRecipe {
        ShortRecipe {
            id: recipe.id,
            image: self.image_url(&recipe.image),
            name: recipe.name,
            cooking_time: recipe.cooking_time,
        }
    }

    pub async fn recipe(&self, recipe: Recipe) -> Result<RecipeRead, Error> {
        let author = self
            .store
            .get_user(recipe.author_id)
            .await?
            .ok_or_else(|| Error::not_found("User"))?;
        let tags = self.store.recipe_tags(recipe.id).await?;
        let ingredients = self
            .store
            .recipe_lines(recipe.id)
            .await?
            .into_iter()
            .map(LineRead::from)
            .collect();

        Ok(RecipeRead {
            id: recipe.id,
            tags,
            author: self.user(author).await?,
            ingredients,
            is_favorited: self.requester_has(RelationKind::Favorite, recipe.id).await?,
            is_in_shopping_cart: self.requester_has(RelationKind::Cart, recipe.id).await?,
            image: self.image_url(&recipe.image),
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        })
    }

    /// `recipes_limit` caps the embedded recipe list, not `recipes_count`.
    pub async fn following(&self, user: User, recipes_limit: i64) -> Result<FollowingUser, Error> {
        let recipes = self
            .store
            .recipes_by_author(user.id, Some(recipes_limit))
            .await?
            .into_iter()
            .map(|r| self.short_recipe(r))
            .collect();
        let recipes_count = self.store.count_recipes_by_author(user.id).await?;

        Ok(FollowingUser {
            user: self.user(user).await?,
            recipes,
            recipes_count,
        })
    }

    pub async fn user_page(&self, page: Page<User>) -> Result<Page<UserRead>, Error> {
        let mut results = Vec::with_capacity(page.results.len());
        for user in page.results {
            results.push(self.user(user).await?);
        }

        Ok(Page {
            count: page.count,
            next: page.next,
            previous: page.previous,
            results,
        })
    }

    pub async fn recipe_page(&self, page: Page<Recipe>) -> Result<Page<RecipeRead>, Error> {
        let mut results = Vec::with_capacity(page.results.len());
        for recipe in page.results {
            results.push(self.recipe(recipe).await?);
        }

        Ok(Page {
            count: page.count,
            next: page.next,
            previous: page.previous,
            results,
        })
    }

    pub async fn following_page(
        &self,
        page: Page<User>,
        recipes_limit: i64,
    ) -> Result<Page<FollowingUser>, Error> {
        let mut results = Vec::with_capacity(page.results.len());
        for user in page.results {
            results.push(self.following(user, recipes_limit).await?);
        }

        Ok(Page {
            count: page.count,
            next: page.next,
            previous: page.previous,
            results,
        })
    }
}
