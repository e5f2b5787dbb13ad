use crate::{
    error::{Error, QueryError},
    schema::{Id, NewTag, Tag},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn create_tag(tag: NewTag, pool: &Pool<Postgres>) -> Result<Tag, Error> {
    let row: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(tag.name)
    .bind(tag.color)
    .bind(tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| Error::AlreadyExists(String::from("Tag with this slug already exists")))
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(pool: &Pool<Postgres>, recipe_id: Id) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Replaces the tag links of a recipe. Runs on the caller's transaction.
pub async fn set_recipe_tags(
    recipe_id: Id,
    tag_ids: &[Id],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query_builder.push_values(tag_ids.iter().take(65535 / 2), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });
    query_builder.push(" ON CONFLICT DO NOTHING");

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
