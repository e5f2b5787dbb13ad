use std::sync::Arc;

use crate::{
    config::Bounds,
    error::Error,
    schema::{Id, NewIngredientLine, NewRecipe, Recipe, RecipeChanges, RecipeFields},
    services::images::ImageStore,
    store::EntityStore,
};

/// Fields of a recipe update. `None` keeps the stored value, except for
/// `ingredients`: an absent ingredient list clears the recipe's lines.
/// `image` is a base64 data URI, like on creation.
#[derive(Debug, Clone, Default)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    pub tag_ids: Option<Vec<Id>>,
    pub ingredients: Option<Vec<NewIngredientLine>>,
}

/// Validates recipe writes and hands them to the store as single transactions.
/// Callers are expected to have checked who may edit the recipe.
///
/// Images arrive as data URIs and are written to disk only once every other
/// check has passed.
#[derive(Clone)]
pub struct RecipeComposer {
    store: Arc<dyn EntityStore>,
    bounds: Bounds,
    images: ImageStore,
}

impl RecipeComposer {
    pub fn new(store: Arc<dyn EntityStore>, bounds: Bounds, images: ImageStore) -> Self {
        Self {
            store,
            bounds,
            images,
        }
    }

    fn check_lines(&self, lines: &[NewIngredientLine]) -> Result<(), Error> {
        for line in lines {
            self.bounds.amount.check("amount", line.amount)?;
        }
        Ok(())
    }

    async fn check_references(&self, tag_ids: &[Id], lines: &[NewIngredientLine]) -> Result<(), Error> {
        for tag_id in tag_ids {
            if self.store.get_tag(*tag_id).await?.is_none() {
                return Err(Error::InvalidRequest(format!(
                    "Invalid tag id \"{tag_id}\" - object does not exist"
                )));
            }
        }
        for line in lines {
            if self.store.get_ingredient(line.ingredient_id).await?.is_none() {
                return Err(Error::InvalidRequest(format!(
                    "Invalid ingredient id \"{}\" - object does not exist",
                    line.ingredient_id
                )));
            }
        }
        Ok(())
    }

    pub async fn create(
        &self,
        author_id: Id,
        mut fields: RecipeFields,
        tag_ids: Vec<Id>,
        lines: Vec<NewIngredientLine>,
    ) -> Result<Recipe, Error> {
        self.bounds
            .cooking_time
            .check("cooking_time", fields.cooking_time)?;
        self.check_lines(&lines)?;

        let tag_ids = dedup(tag_ids);
        self.check_references(&tag_ids, &lines).await?;
        fields.image = self.images.save_data_uri(&fields.image).await?;

        let recipe = self
            .store
            .insert_recipe(NewRecipe {
                author_id,
                fields,
                tag_ids,
                lines,
            })
            .await?;

        log::info!("Recipe {} created by user {}", recipe.id, author_id);
        Ok(recipe)
    }

    pub async fn update(&self, recipe_id: Id, update: RecipeUpdate) -> Result<Recipe, Error> {
        if self.store.get_recipe(recipe_id).await?.is_none() {
            return Err(Error::not_found("Recipe"));
        }

        if let Some(cooking_time) = update.cooking_time {
            self.bounds.cooking_time.check("cooking_time", cooking_time)?;
        }

        // an absent list replaces the lines with nothing
        let lines = update.ingredients.unwrap_or_default();
        self.check_lines(&lines)?;

        let tag_ids = update.tag_ids.map(dedup);
        self.check_references(tag_ids.as_deref().unwrap_or(&[]), &lines)
            .await?;

        let image = match update.image {
            Some(data) => Some(self.images.save_data_uri(&data).await?),
            None => None,
        };

        let recipe = self
            .store
            .update_recipe(
                recipe_id,
                RecipeChanges {
                    name: update.name,
                    text: update.text,
                    image,
                    cooking_time: update.cooking_time,
                    tag_ids,
                    lines,
                },
            )
            .await?;

        log::info!("Recipe {} updated", recipe.id);
        Ok(recipe)
    }

    pub async fn delete(&self, recipe_id: Id) -> Result<(), Error> {
        if !self.store.delete_recipe(recipe_id).await? {
            return Err(Error::not_found("Recipe"));
        }

        log::info!("Recipe {recipe_id} deleted");
        Ok(())
    }
}

fn dedup(ids: Vec<Id>) -> Vec<Id> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::{config::ValueRange, services::fixtures};

    fn composer_with(store: &Arc<dyn EntityStore>, bounds: Bounds) -> (RecipeComposer, TempDir) {
        let media = tempfile::tempdir().unwrap();
        let composer = RecipeComposer::new(store.clone(), bounds, ImageStore::new(media.path()));
        (composer, media)
    }

    fn composer(store: &Arc<dyn EntityStore>) -> (RecipeComposer, TempDir) {
        composer_with(store, Bounds::default())
    }

    fn upload(name: &str) -> RecipeFields {
        RecipeFields {
            image: fixtures::PIXEL.to_owned(),
            ..fixtures::fields(name)
        }
    }

    #[tokio::test]
    async fn cooking_time_lower_bound() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let (composer, media) = composer(&store);

        let mut fields = upload("Tea");
        fields.cooking_time = 0;
        let result = composer.create(cook.id, fields, vec![], vec![]).await;
        assert!(matches!(
            result,
            Err(Error::OutOfRange {
                field: "cooking_time",
                ..
            })
        ));

        // nothing was written for the rejected recipe
        assert!(!media.path().join("recipes").exists());

        let mut fields = upload("Tea");
        fields.cooking_time = 1;
        let recipe = composer.create(cook.id, fields, vec![], vec![]).await.unwrap();
        assert_eq!(recipe.cooking_time, 1);
        assert!(media.path().join(&recipe.image).is_file());
    }

    #[tokio::test]
    async fn amount_outside_bounds_is_rejected() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let salt = fixtures::ingredient(&store, "Salt", "g").await;
        let (composer, _media) = composer_with(
            &store,
            Bounds {
                cooking_time: ValueRange::new(1, 600),
                amount: ValueRange::new(1, 1000),
            },
        );

        let result = composer
            .create(
                cook.id,
                upload("Brine"),
                vec![],
                fixtures::lines(&[(salt.id, 1001)]),
            )
            .await;

        assert!(matches!(result, Err(Error::OutOfRange { field: "amount", .. })));
        assert_eq!(store.count_recipes_by_author(cook.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_round_trips_lines_and_tags() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let flour = fixtures::ingredient(&store, "Flour", "g").await;
        let eggs = fixtures::ingredient(&store, "Eggs", "pcs").await;
        let breakfast = fixtures::tag(&store, "breakfast").await;
        let lunch = fixtures::tag(&store, "lunch").await;

        let (composer, _media) = composer(&store);

        let recipe = composer
            .create(
                cook.id,
                upload("Pancakes"),
                vec![lunch.id, breakfast.id, lunch.id],
                fixtures::lines(&[(flour.id, 5), (eggs.id, 3)]),
            )
            .await
            .unwrap();

        let mut amounts: Vec<(Id, i32)> = store
            .recipe_lines(recipe.id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| (l.ingredient_id, l.amount))
            .collect();
        amounts.sort();
        assert_eq!(amounts, vec![(flour.id, 5), (eggs.id, 3)]);

        let mut tags: Vec<Id> = store
            .recipe_tags(recipe.id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        tags.sort();
        assert_eq!(tags, vec![breakfast.id, lunch.id]);
    }

    #[tokio::test]
    async fn unknown_ingredient_leaves_nothing_behind() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let flour = fixtures::ingredient(&store, "Flour", "g").await;

        let (composer, _media) = composer(&store);

        let result = composer
            .create(
                cook.id,
                upload("Bread"),
                vec![],
                fixtures::lines(&[(flour.id, 500), (999, 1)]),
            )
            .await;

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(store.count_recipes_by_author(cook.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_without_ingredients_clears_lines() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let flour = fixtures::ingredient(&store, "Flour", "g").await;
        let tag = fixtures::tag(&store, "dinner").await;
        let recipe = fixtures::recipe(&store, &cook, "Bread", &[tag.id], &[(flour.id, 500)]).await;

        let (composer, _media) = composer(&store);

        let updated = composer
            .update(
                recipe.id,
                RecipeUpdate {
                    name: Some(String::from("Flatbread")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Flatbread");
        assert_eq!(updated.cooking_time, recipe.cooking_time);
        assert_eq!(updated.image, recipe.image);
        assert!(store.recipe_lines(recipe.id).await.unwrap().is_empty());
        // tags were omitted too, and survive
        assert_eq!(store.recipe_tags(recipe.id).await.unwrap(), vec![tag]);
    }

    #[tokio::test]
    async fn update_replaces_full_line_set() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let flour = fixtures::ingredient(&store, "Flour", "g").await;
        let water = fixtures::ingredient(&store, "Water", "ml").await;
        let recipe = fixtures::recipe(&store, &cook, "Bread", &[], &[(flour.id, 500)]).await;

        let (composer, _media) = composer(&store);

        composer
            .update(
                recipe.id,
                RecipeUpdate {
                    tag_ids: Some(vec![]),
                    ingredients: Some(fixtures::lines(&[(water.id, 300)])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let lines = store.recipe_lines(recipe.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Water");
        assert_eq!(lines[0].amount, 300);
    }

    #[tokio::test]
    async fn update_and_delete_missing_recipe() {
        let store = fixtures::store();
        let (composer, _media) = composer(&store);

        let update = composer.update(42, RecipeUpdate::default()).await;
        let delete = composer.delete(42).await;

        assert_eq!(update.unwrap_err(), Error::not_found("Recipe"));
        assert_eq!(delete, Err(Error::not_found("Recipe")));
    }

    #[tokio::test]
    async fn missing_recipe_wins_over_invalid_fields() {
        let store = fixtures::store();
        let (composer, _media) = composer(&store);

        let update = composer
            .update(
                42,
                RecipeUpdate {
                    cooking_time: Some(0),
                    tag_ids: Some(vec![999]),
                    ..RecipeUpdate::default()
                },
            )
            .await;

        assert_eq!(update.unwrap_err(), Error::not_found("Recipe"));
    }

    #[tokio::test]
    async fn delete_cascades_relations() {
        let store = fixtures::store();
        let cook = fixtures::user(&store, "cook").await;
        let recipe = fixtures::recipe(&store, &cook, "Soup", &[], &[]).await;
        store
            .insert_relation(crate::schema::RelationKind::Favorite, cook.id, recipe.id)
            .await
            .unwrap();

        let (composer, _media) = composer(&store);

        composer.delete(recipe.id).await.unwrap();

        assert!(store.get_recipe(recipe.id).await.unwrap().is_none());
        assert_eq!(
            store
                .count_relations(crate::schema::RelationKind::Favorite, recipe.id)
                .await
                .unwrap(),
            0
        );
    }
}
