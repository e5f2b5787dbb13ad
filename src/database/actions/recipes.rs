use crate::{
    error::{Error, QueryError},
    schema::{Id, NewRecipe, Recipe, RecipeChanges, RecipeQuery},
};

use super::{ingredients::replace_recipe_lines, tags::set_recipe_tags};

use sqlx::{Pool, Postgres, QueryBuilder};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Writes the recipe row, its tag links and its ingredient lines in one transaction.
pub async fn create_recipe(recipe: NewRecipe, pool: &Pool<Postgres>) -> Result<Recipe, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let row: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(recipe.author_id)
    .bind(recipe.fields.name)
    .bind(recipe.fields.text)
    .bind(recipe.fields.image)
    .bind(recipe.fields.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    set_recipe_tags(row.id, &recipe.tag_ids, &mut *tr).await?;
    replace_recipe_lines(row.id, &recipe.lines, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(row)
}

/// Applies the present fields, re-links tags when given and always replaces
/// the ingredient lines, all in one transaction.
pub async fn update_recipe(
    id: Id,
    changes: RecipeChanges,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let row: Option<Recipe> = sqlx::query_as(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        image = COALESCE($3, image),
        cooking_time = COALESCE($4, cooking_time)
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(changes.name)
    .bind(changes.text)
    .bind(changes.image)
    .bind(changes.cooking_time)
    .bind(id)
    .fetch_optional(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    let row = row.ok_or_else(|| Error::not_found("Recipe"))?;

    if let Some(tag_ids) = &changes.tag_ids {
        set_recipe_tags(id, tag_ids, &mut *tr).await?;
    }
    replace_recipe_lines(id, &changes.lines, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(row)
}

pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

fn push_recipe_filters(query_builder: &mut QueryBuilder<'_, Postgres>, query: &RecipeQuery) {
    query_builder.push(" WHERE TRUE");

    if let Some(author) = query.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !query.tag_slugs.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(query.tag_slugs.clone())
            .push("))");
    }

    if let Some(user) = query.favorited_by {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user)
            .push(")");
    }

    if let Some(user) = query.in_cart_of {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
            )
            .push_bind(user)
            .push(")");
    }
}

pub async fn fetch_recipes(
    query: &RecipeQuery,
    offset: i64,
    limit: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT r.* FROM recipes r");
    push_recipe_filters(&mut query_builder, query);
    query_builder
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<Recipe> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_recipe_filters(&mut count_builder, query);

    let total: (i64,) = count_builder
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok((rows, total.0))
}

pub async fn list_author_recipes(
    author: Id,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, Error> {
    // LIMIT NULL means no limit
    let rows: Vec<Recipe> =
        sqlx::query_as("SELECT * FROM recipes WHERE author_id = $1 ORDER BY id DESC LIMIT $2")
            .bind(author)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_author_recipes(author: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}
