use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    error::Error,
    schema::{
        Id, Ingredient, IngredientLine, NewIngredient, NewIngredientLine, NewRecipe, NewTag,
        NewUser, Recipe, RecipeChanges, RecipeQuery, Relation, RelationKind, Tag, User,
    },
    store::EntityStore,
};

#[derive(Default)]
struct Sequences {
    user: Id,
    tag: Id,
    ingredient: Id,
    recipe: Id,
}

fn next_id(counter: &mut Id) -> Id {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: Vec<User>,
    tags: Vec<Tag>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<Recipe>,
    recipe_tags: Vec<(Id, Id)>,
    lines: Vec<(Id, NewIngredientLine)>,
    relations: Vec<Relation>,
}

impl Tables {
    fn user(&self, id: Id) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn recipe_lines(&self, recipe_id: Id) -> Vec<IngredientLine> {
        self.lines
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(r, line)| self.join_line(*r, line))
            .collect()
    }

    fn join_line(&self, recipe_id: Id, line: &NewIngredientLine) -> Option<IngredientLine> {
        self.ingredients
            .iter()
            .find(|i| i.id == line.ingredient_id)
            .map(|i| IngredientLine {
                recipe_id,
                ingredient_id: i.id,
                name: i.name.to_owned(),
                measurement_unit: i.measurement_unit.to_owned(),
                amount: line.amount,
            })
    }

    fn has_relation(&self, kind: RelationKind, user: Id, target: Id) -> bool {
        self.relations
            .iter()
            .any(|r| r.kind == kind && r.user_id == user && r.target_id == target)
    }

    fn target_exists(&self, kind: RelationKind, target: Id) -> bool {
        match kind {
            RelationKind::Favorite | RelationKind::Cart => {
                self.recipes.iter().any(|r| r.id == target)
            }
            RelationKind::Follow => self.user(target).is_some(),
        }
    }

    /// Mirrors the foreign keys of the relational schema.
    fn check_references(
        &self,
        tag_ids: Option<&[Id]>,
        lines: &[NewIngredientLine],
    ) -> Result<(), Error> {
        if let Some(tag_ids) = tag_ids {
            if let Some(id) = tag_ids.iter().find(|id| !self.tags.iter().any(|t| t.id == **id)) {
                return Err(Error::Internal(format!("foreign key violation: tag {id}")));
            }
        }
        if let Some(line) = lines
            .iter()
            .find(|l| !self.ingredients.iter().any(|i| i.id == l.ingredient_id))
        {
            return Err(Error::Internal(format!(
                "foreign key violation: ingredient {}",
                line.ingredient_id
            )));
        }
        Ok(())
    }

    fn link_tags(&mut self, recipe_id: Id, tag_ids: &[Id]) {
        self.recipe_tags.retain(|(r, _)| *r != recipe_id);
        for tag_id in tag_ids {
            if !self.recipe_tags.contains(&(recipe_id, *tag_id)) {
                self.recipe_tags.push((recipe_id, *tag_id));
            }
        }
    }

    fn replace_lines(&mut self, recipe_id: Id, lines: &[NewIngredientLine]) {
        self.lines.retain(|(r, _)| *r != recipe_id);
        self.lines.extend(lines.iter().map(|line| (recipe_id, *line)));
    }

    fn matches(&self, recipe: &Recipe, query: &RecipeQuery) -> bool {
        if query.author.is_some_and(|author| recipe.author_id != author) {
            return false;
        }
        if !query.tag_slugs.is_empty() {
            let tagged = self
                .recipe_tags
                .iter()
                .filter(|(r, _)| *r == recipe.id)
                .filter_map(|(_, tag_id)| self.tags.iter().find(|t| t.id == *tag_id))
                .any(|tag| query.tag_slugs.contains(&tag.slug));
            if !tagged {
                return false;
            }
        }
        if query
            .favorited_by
            .is_some_and(|user| !self.has_relation(RelationKind::Favorite, user, recipe.id))
        {
            return false;
        }
        if query
            .in_cart_of
            .is_some_and(|user| !self.has_relation(RelationKind::Cart, user, recipe.id))
        {
            return false;
        }
        true
    }
}

/// Negative counts read as zero, counts past `usize` as `usize::MAX`.
fn count(n: i64) -> usize {
    usize::try_from(n.max(0)).unwrap_or(usize::MAX)
}

fn page<T: Clone>(rows: &[T], offset: i64, limit: i64) -> Vec<T> {
    rows.iter()
        .skip(count(offset))
        .take(count(limit))
        .cloned()
        .collect()
}

/// [`EntityStore`] held in process memory. Every call takes one lock, so each
/// write is atomic with respect to every other call.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, Error> {
        self.tables
            .lock()
            .map_err(|_| Error::Internal(String::from("Memory store lock poisoned")))
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut tables = self.tables()?;
        let taken = tables.users.iter().any(|u| {
            u.email.eq_ignore_ascii_case(&user.email) || u.username == user.username
        });
        if taken {
            return Err(Error::AlreadyExists(String::from(
                "A user with that email or username already exists",
            )));
        }

        let row = User {
            id: next_id(&mut tables.seq.user),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password: user.password,
            role: user.role,
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        Ok(self.tables()?.user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), Error> {
        let tables = self.tables()?;
        let mut rows = tables.users.clone();
        rows.sort_by(|a, b| a.username.cmp(&b.username));
        Ok((page(&rows, offset, limit), rows.len() as i64))
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag, Error> {
        let mut tables = self.tables()?;
        if tables.tags.iter().any(|t| t.slug == tag.slug) {
            return Err(Error::AlreadyExists(String::from(
                "Tag with this slug already exists",
            )));
        }

        let row = Tag {
            id: next_id(&mut tables.seq.tag),
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        };
        tables.tags.push(row.clone());
        Ok(row)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, Error> {
        Ok(self.tables()?.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        Ok(self.tables()?.tags.clone())
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient, Error> {
        let mut tables = self.tables()?;
        let row = Ingredient {
            id: next_id(&mut tables.seq.ingredient),
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        };
        tables.ingredients.push(row.clone());
        Ok(row)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, Error> {
        Ok(self
            .tables()?
            .ingredients
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        let prefix = name_prefix.map(str::to_lowercase);
        let mut rows: Vec<Ingredient> = self
            .tables()?
            .ingredients
            .iter()
            .filter(|i| match &prefix {
                Some(prefix) => i.name.to_lowercase().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, Error> {
        Ok(self.tables()?.recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, Error> {
        let tables = self.tables()?;
        let mut rows: Vec<Tag> = tables
            .recipe_tags
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, tag_id)| tables.tags.iter().find(|t| t.id == *tag_id))
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.id);
        Ok(rows)
    }

    async fn recipe_lines(&self, recipe_id: Id) -> Result<Vec<IngredientLine>, Error> {
        Ok(self.tables()?.recipe_lines(recipe_id))
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, Error> {
        let mut tables = self.tables()?;
        if tables.user(recipe.author_id).is_none() {
            return Err(Error::Internal(format!(
                "foreign key violation: user {}",
                recipe.author_id
            )));
        }
        tables.check_references(Some(recipe.tag_ids.as_slice()), &recipe.lines)?;

        let row = Recipe {
            id: next_id(&mut tables.seq.recipe),
            author_id: recipe.author_id,
            name: recipe.fields.name,
            text: recipe.fields.text,
            image: recipe.fields.image,
            cooking_time: recipe.fields.cooking_time,
        };
        tables.recipes.push(row.clone());
        tables.link_tags(row.id, &recipe.tag_ids);
        tables.replace_lines(row.id, &recipe.lines);
        Ok(row)
    }

    async fn update_recipe(&self, id: Id, changes: RecipeChanges) -> Result<Recipe, Error> {
        let mut tables = self.tables()?;
        if !tables.recipes.iter().any(|r| r.id == id) {
            return Err(Error::not_found("Recipe"));
        }
        tables.check_references(changes.tag_ids.as_deref(), &changes.lines)?;

        if let Some(tag_ids) = &changes.tag_ids {
            tables.link_tags(id, tag_ids);
        }
        tables.replace_lines(id, &changes.lines);

        let recipe = tables
            .recipes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::not_found("Recipe"))?;
        if let Some(name) = changes.name {
            recipe.name = name;
        }
        if let Some(text) = changes.text {
            recipe.text = text;
        }
        if let Some(image) = changes.image {
            recipe.image = image;
        }
        if let Some(cooking_time) = changes.cooking_time {
            recipe.cooking_time = cooking_time;
        }
        Ok(recipe.clone())
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, Error> {
        let mut tables = self.tables()?;
        let before = tables.recipes.len();
        tables.recipes.retain(|r| r.id != id);
        if tables.recipes.len() == before {
            return Ok(false);
        }

        tables.recipe_tags.retain(|(r, _)| *r != id);
        tables.lines.retain(|(r, _)| *r != id);
        tables
            .relations
            .retain(|rel| rel.kind == RelationKind::Follow || rel.target_id != id);
        Ok(true)
    }

    async fn query_recipes(
        &self,
        query: &RecipeQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), Error> {
        let tables = self.tables()?;
        let mut rows: Vec<Recipe> = tables
            .recipes
            .iter()
            .filter(|r| tables.matches(r, query))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok((page(&rows, offset, limit), rows.len() as i64))
    }

    async fn recipes_by_author(&self, author: Id, limit: Option<i64>) -> Result<Vec<Recipe>, Error> {
        let tables = self.tables()?;
        let mut rows: Vec<Recipe> = tables
            .recipes
            .iter()
            .filter(|r| r.author_id == author)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(limit) = limit {
            rows.truncate(count(limit));
        }
        Ok(rows)
    }

    async fn count_recipes_by_author(&self, author: Id) -> Result<i64, Error> {
        Ok(self
            .tables()?
            .recipes
            .iter()
            .filter(|r| r.author_id == author)
            .count() as i64)
    }

    async fn insert_relation(
        &self,
        kind: RelationKind,
        user: Id,
        target: Id,
    ) -> Result<Option<Relation>, Error> {
        let mut tables = self.tables()?;
        if kind == RelationKind::Follow && user == target {
            return Err(Error::SelfReferenceNotAllowed);
        }
        if tables.user(user).is_none() || !tables.target_exists(kind, target) {
            return Err(Error::Internal(format!(
                "foreign key violation: {} {target}",
                kind.table()
            )));
        }
        if tables.has_relation(kind, user, target) {
            return Ok(None);
        }

        let relation = Relation {
            kind,
            user_id: user,
            target_id: target,
        };
        tables.relations.push(relation);
        Ok(Some(relation))
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        user: Id,
        target: Id,
    ) -> Result<bool, Error> {
        let mut tables = self.tables()?;
        let before = tables.relations.len();
        tables
            .relations
            .retain(|r| !(r.kind == kind && r.user_id == user && r.target_id == target));
        Ok(tables.relations.len() < before)
    }

    async fn relation_exists(
        &self,
        kind: RelationKind,
        user: Id,
        target: Id,
    ) -> Result<bool, Error> {
        Ok(self.tables()?.has_relation(kind, user, target))
    }

    async fn count_relations(&self, kind: RelationKind, target: Id) -> Result<i64, Error> {
        Ok(self
            .tables()?
            .relations
            .iter()
            .filter(|r| r.kind == kind && r.target_id == target)
            .count() as i64)
    }

    async fn followed_users(
        &self,
        follower: Id,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), Error> {
        let tables = self.tables()?;
        let rows: Vec<User> = tables
            .relations
            .iter()
            .filter(|r| r.kind == RelationKind::Follow && r.user_id == follower)
            .filter_map(|r| tables.user(r.target_id))
            .cloned()
            .collect();
        Ok((page(&rows, offset, limit), rows.len() as i64))
    }

    async fn cart_lines(&self, user: Id) -> Result<Vec<IngredientLine>, Error> {
        let tables = self.tables()?;
        Ok(tables
            .relations
            .iter()
            .filter(|r| r.kind == RelationKind::Cart && r.user_id == user)
            .flat_map(|r| tables.recipe_lines(r.target_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_tolerates_any_offset_and_limit() {
        let rows = [1, 2, 3];

        assert_eq!(page(&rows, 1, 1), [2]);
        assert_eq!(page(&rows, -3, 2), [1, 2]);
        assert_eq!(page(&rows, 0, -1), Vec::<i32>::new());
        assert_eq!(page(&rows, i64::MAX, 6), Vec::<i32>::new());
        assert_eq!(page(&rows, 0, i64::MAX), [1, 2, 3]);
    }
}
