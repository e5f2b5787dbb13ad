use crate::{
    error::{Error, QueryError},
    schema::{Id, IngredientLine, Relation, RelationKind, User},
};

use sqlx::{Pool, Postgres};

/// Inserts the pair unless it exists. `None` means the pair was already there.
pub async fn add_relation(
    kind: RelationKind,
    user: Id,
    target: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Relation>, Error> {
    let (table, user_column, target_column) =
        (kind.table(), kind.user_column(), kind.target_column());

    let row: Option<(Id, Id)> = sqlx::query_as(&format!(
        "INSERT INTO {table} ({user_column}, {target_column}) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING {user_column}, {target_column};"
    ))
    .bind(user)
    .bind(target)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.map(|(user_id, target_id)| Relation {
        kind,
        user_id,
        target_id,
    }))
}

pub async fn remove_relation(
    kind: RelationKind,
    user: Id,
    target: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let (table, user_column, target_column) =
        (kind.table(), kind.user_column(), kind.target_column());

    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE {user_column} = $1 AND {target_column} = $2"
    ))
    .bind(user)
    .bind(target)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn has_relation(
    kind: RelationKind,
    user: Id,
    target: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let (table, user_column, target_column) =
        (kind.table(), kind.user_column(), kind.target_column());

    let result: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT {target_column} FROM {table} WHERE {user_column} = $1 AND {target_column} = $2"
    ))
    .bind(user)
    .bind(target)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

pub async fn count_relations(
    kind: RelationKind,
    target: Id,
    pool: &Pool<Postgres>,
) -> Result<i64, Error> {
    let (table, target_column) = (kind.table(), kind.target_column());

    let count: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {table} WHERE {target_column} = $1"
    ))
    .bind(target)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(count.0)
}

pub async fn fetch_followed_users(
    follower: Id,
    offset: i64,
    limit: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.follower_id = $1
        ORDER BY f.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(follower)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total = count_following(follower, pool).await?;

    Ok((rows, total))
}

async fn count_following(follower: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
        .bind(follower)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

pub async fn list_cart_lines(user: Id, pool: &Pool<Postgres>) -> Result<Vec<IngredientLine>, Error> {
    let rows: Vec<IngredientLine> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        ORDER BY c.id, ri.id
    ",
    )
    .bind(user)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
