use crate::{
    error::{Error, QueryError},
    schema::{Id, Ingredient, IngredientLine, NewIngredient, NewIngredientLine},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn create_ingredient(
    ingredient: NewIngredient,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, Error> {
    let row: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(ingredient.name)
    .bind(ingredient.measurement_unit)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_ingredients(
    name_prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match name_prefix {
        Some(prefix) => sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name")
            .bind(format!("{}%", escape_like(prefix)))
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn list_recipe_lines(
    pool: &Pool<Postgres>,
    recipe_id: Id,
) -> Result<Vec<IngredientLine>, Error> {
    let rows: Vec<IngredientLine> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Deletes every line of the recipe and bulk-inserts `lines`. Runs on the
/// caller's transaction.
pub async fn replace_recipe_lines(
    recipe_id: Id,
    lines: &[NewIngredientLine],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if lines.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(lines.iter().take(65535 / 3), |mut b, line| {
        b.push_bind(recipe_id)
            .push_bind(line.ingredient_id)
            .push_bind(line.amount);
    });

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
