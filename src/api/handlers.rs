use chrono::Local;
use serde::Serialize;
use warp::{
    http::StatusCode,
    reply::{Reply, Response},
    Rejection,
};

use crate::{
    api::{
        context::Context,
        models::{AuthToken, Credentials, RecipeWrite, Registration, UserCreated},
    },
    constants::DEFAULT_RECIPES_LIMIT,
    cryptography::{hash_password, verify_password},
    error::Error,
    jwt::{generate_jwt_session, SessionData},
    pagination::{Page, Pagination},
    permissions::ActionType,
    schema::{Id, NewUser, Recipe, RecipeFields, RelationKind, UserRole},
    services::{composer::RecipeUpdate, filters::RecipeFilter, shopping_list::ShoppingList},
};

type Query = Vec<(String, String)>;

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn param<'a>(query: &'a Query, key: &str) -> Option<&'a str> {
    query
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn recipes_limit(query: &Query) -> i64 {
    param(query, "recipes_limit")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|limit| *limit >= 0)
        .unwrap_or(DEFAULT_RECIPES_LIMIT)
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::InvalidRequest(format!("{field}: This field is required.")))
}

fn not_blank(value: String, field: &str) -> Result<String, Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidRequest(format!(
            "{field}: This field may not be blank."
        )));
    }
    Ok(value)
}

async fn recipe_or_404(context: &Context, id: Id) -> Result<Recipe, Error> {
    context
        .store
        .get_recipe(id)
        .await?
        .ok_or_else(|| Error::not_found("Recipe"))
}

/// Loads a recipe the session may edit.
async fn get_recipe_mut(context: &Context, id: Id, session: &SessionData) -> Result<Recipe, Error> {
    let recipe = recipe_or_404(context, id).await?;
    if !session.can_manage(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    ) {
        return Err(Error::Forbidden);
    }
    Ok(recipe)
}

// Users

pub async fn list_users(
    session: Option<SessionData>,
    query: Query,
    context: Context,
) -> Result<Response, Rejection> {
    let pagination = Pagination::from_pairs(&query);
    let limit = pagination.limit(context.settings.page_size);
    let offset = pagination.offset();

    let (rows, total) = context.store.list_users(offset, limit).await?;
    let page = Page::from_rows(rows, total, limit, offset, "/users/", &pagination.params);
    let page = context
        .presenter(session.map(|s| s.user_id))
        .user_page(page)
        .await?;

    Ok(json(StatusCode::OK, &page))
}

pub async fn register(registration: Registration, context: Context) -> Result<Response, Rejection> {
    let email = not_blank(registration.email, "email")?;
    if !email.contains('@') {
        return Err(Error::InvalidRequest(String::from("email: Enter a valid email address.")).into());
    }
    let username = not_blank(registration.username, "username")?;
    let password = not_blank(registration.password, "password")?;

    let user = context
        .store
        .create_user(NewUser {
            email: email.trim().to_owned(),
            username: username.trim().to_owned(),
            first_name: registration.first_name,
            last_name: registration.last_name,
            password: hash_password(&password)?,
            role: UserRole::User,
        })
        .await?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(json(StatusCode::CREATED, &UserCreated::from(user)))
}

pub async fn me(session: SessionData, context: Context) -> Result<Response, Rejection> {
    let user = context
        .store
        .get_user(session.user_id)
        .await?
        .ok_or_else(|| Error::not_found("User"))?;
    let user = context.presenter(Some(session.user_id)).user(user).await?;

    Ok(json(StatusCode::OK, &user))
}

pub async fn get_user(
    id: Id,
    session: Option<SessionData>,
    context: Context,
) -> Result<Response, Rejection> {
    let user = context
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| Error::not_found("User"))?;
    let user = context
        .presenter(session.map(|s| s.user_id))
        .user(user)
        .await?;

    Ok(json(StatusCode::OK, &user))
}

pub async fn subscriptions(
    session: SessionData,
    query: Query,
    context: Context,
) -> Result<Response, Rejection> {
    let pagination = Pagination::from_pairs(&query);
    let limit = pagination.limit(context.settings.page_size);
    let offset = pagination.offset();

    let (rows, total) = context
        .store
        .followed_users(session.user_id, offset, limit)
        .await?;
    let page = Page::from_rows(
        rows,
        total,
        limit,
        offset,
        "/users/subscriptions/",
        &pagination.params,
    );
    let page = context
        .presenter(Some(session.user_id))
        .following_page(page, recipes_limit(&query))
        .await?;

    Ok(json(StatusCode::OK, &page))
}

pub async fn subscribe(
    id: Id,
    session: SessionData,
    query: Query,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    context
        .relations
        .add(RelationKind::Follow, session.user_id, id)
        .await?;

    let author = context
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| Error::not_found("User"))?;
    let following = context
        .presenter(Some(session.user_id))
        .following(author, recipes_limit(&query))
        .await?;

    Ok(json(StatusCode::CREATED, &following))
}

pub async fn unsubscribe(id: Id, session: SessionData, context: Context) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    context
        .relations
        .remove(RelationKind::Follow, session.user_id, id)
        .await?;

    Ok(no_content())
}

// Tokens

pub async fn login(credentials: Credentials, context: Context) -> Result<Response, Rejection> {
    let user = context
        .store
        .find_user_by_email(credentials.email.trim())
        .await?
        .ok_or(Error::InvalidCredentials)?;
    if !verify_password(&credentials.password, &user.password)? {
        log::trace!("> Failed login for user {}", user.id);
        return Err(Error::InvalidCredentials.into());
    }

    let auth_token = generate_jwt_session(
        &user,
        &context.settings.secret,
        context.settings.session_hours,
    )?;

    Ok(json(StatusCode::OK, &AuthToken { auth_token }))
}

pub async fn logout(session: SessionData) -> Result<Response, Rejection> {
    log::trace!("> Logout for user {}", session.user_id);
    Ok(no_content())
}

// Tags and ingredients

pub async fn list_tags(context: Context) -> Result<Response, Rejection> {
    let tags = context.store.list_tags().await?;
    Ok(json(StatusCode::OK, &tags))
}

pub async fn get_tag(id: Id, context: Context) -> Result<Response, Rejection> {
    let tag = context
        .store
        .get_tag(id)
        .await?
        .ok_or_else(|| Error::not_found("Tag"))?;
    Ok(json(StatusCode::OK, &tag))
}

pub async fn list_ingredients(query: Query, context: Context) -> Result<Response, Rejection> {
    let prefix = param(&query, "name").filter(|name| !name.is_empty());
    let ingredients = context.store.list_ingredients(prefix).await?;
    Ok(json(StatusCode::OK, &ingredients))
}

pub async fn get_ingredient(id: Id, context: Context) -> Result<Response, Rejection> {
    let ingredient = context
        .store
        .get_ingredient(id)
        .await?
        .ok_or_else(|| Error::not_found("Ingredient"))?;
    Ok(json(StatusCode::OK, &ingredient))
}

// Recipes

pub async fn list_recipes(
    session: Option<SessionData>,
    query: Query,
    context: Context,
) -> Result<Response, Rejection> {
    let pagination = Pagination::from_pairs(&query);
    let filter = RecipeFilter::from_pairs(query)?;
    if filter.needs_requester() && session.is_none() {
        return Err(Error::AuthenticationRequired.into());
    }

    let requester = session.map(|s| s.user_id);
    let page = context
        .finder
        .filter_recipes(&filter, requester, pagination, "/recipes/")
        .await?;
    let page = context.presenter(requester).recipe_page(page).await?;

    Ok(json(StatusCode::OK, &page))
}

pub async fn create_recipe(
    session: SessionData,
    body: RecipeWrite,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;

    let fields = RecipeFields {
        name: not_blank(required(body.name, "name")?, "name")?,
        text: not_blank(required(body.text, "text")?, "text")?,
        image: required(body.image, "image")?,
        cooking_time: required(body.cooking_time, "cooking_time")?,
    };
    let recipe = context
        .composer
        .create(
            session.user_id,
            fields,
            body.tags.unwrap_or_default(),
            body.ingredients.unwrap_or_default(),
        )
        .await?;

    let recipe = context
        .presenter(Some(session.user_id))
        .recipe(recipe)
        .await?;
    Ok(json(StatusCode::CREATED, &recipe))
}

pub async fn get_recipe(
    id: Id,
    session: Option<SessionData>,
    context: Context,
) -> Result<Response, Rejection> {
    let recipe = recipe_or_404(&context, id).await?;
    let recipe = context
        .presenter(session.map(|s| s.user_id))
        .recipe(recipe)
        .await?;

    Ok(json(StatusCode::OK, &recipe))
}

pub async fn update_recipe(
    id: Id,
    session: SessionData,
    body: RecipeWrite,
    context: Context,
) -> Result<Response, Rejection> {
    get_recipe_mut(&context, id, &session).await?;

    let update = RecipeUpdate {
        name: body.name.map(|name| not_blank(name, "name")).transpose()?,
        text: body.text.map(|text| not_blank(text, "text")).transpose()?,
        image: body.image,
        cooking_time: body.cooking_time,
        tag_ids: body.tags,
        ingredients: body.ingredients,
    };
    let recipe = context.composer.update(id, update).await?;

    let recipe = context
        .presenter(Some(session.user_id))
        .recipe(recipe)
        .await?;
    Ok(json(StatusCode::OK, &recipe))
}

pub async fn delete_recipe(id: Id, session: SessionData, context: Context) -> Result<Response, Rejection> {
    get_recipe_mut(&context, id, &session).await?;
    context.composer.delete(id).await?;

    Ok(no_content())
}

/// Favorites and the shopping cart share the same add/remove pair.
pub async fn add_recipe_relation(
    kind: RelationKind,
    id: Id,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    context.relations.add(kind, session.user_id, id).await?;

    let recipe = recipe_or_404(&context, id).await?;
    let recipe = context.presenter(Some(session.user_id)).short_recipe(recipe);
    Ok(json(StatusCode::CREATED, &recipe))
}

pub async fn remove_recipe_relation(
    kind: RelationKind,
    id: Id,
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnRelations)?;
    context.relations.remove(kind, session.user_id, id).await?;

    Ok(no_content())
}

pub async fn download_shopping_cart(
    session: SessionData,
    context: Context,
) -> Result<Response, Rejection> {
    let list = context.shopping.build_list(session.user_id).await?;
    let filename = ShoppingList::attachment_name(&session.username, Local::now().date_naive());

    let reply = warp::reply::with_header(
        list.render_text(),
        "content-disposition",
        format!("attachment; filename=\"{filename}\""),
    );
    Ok(reply.into_response())
}
