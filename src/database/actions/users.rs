use crate::{
    error::{Error, QueryError},
    schema::{Id, NewUser, User},
};

use sqlx::{Pool, Postgres};

pub async fn get_user(pool: &Pool<Postgres>, id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn find_user_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user. `user.password` is expected to be hashed already.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(user.email)
    .bind(user.username)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.password)
    .bind(user.role)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| {
        Error::AlreadyExists(String::from(
            "A user with that email or username already exists",
        ))
    })
}

pub async fn list_users(
    offset: i64,
    limit: i64,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY username LIMIT $1 OFFSET $2")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok((rows, total.0))
}
