use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::{
    filters::BoxedFilter,
    path,
    reply::{Reply, Response},
    Filter, Rejection,
};

use crate::{
    api::{context::Context, handlers, rejection::handle_rejection},
    constants::MAX_BODY_BYTES,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::{Id, RelationKind},
};

type Query = Vec<(String, String)>;

fn with_context(context: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

fn session(context: &Context) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_session(context.secret.clone())
}

fn possible_session(
    context: &Context,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    with_possible_session(context.secret.clone())
}

fn query() -> impl Filter<Extract = (Query,), Error = Rejection> + Clone {
    warp::query::<Query>()
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn users(context: &Context) -> BoxedFilter<(Response,)> {
    let list = path!("users")
        .and(warp::get())
        .and(possible_session(context))
        .and(query())
        .and(with_context(context.clone()))
        .and_then(handlers::list_users);

    let register = path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::register);

    let me = path!("users" / "me")
        .and(warp::get())
        .and(session(context))
        .and(with_context(context.clone()))
        .and_then(handlers::me);

    let subscriptions = path!("users" / "subscriptions")
        .and(warp::get())
        .and(session(context))
        .and(query())
        .and(with_context(context.clone()))
        .and_then(handlers::subscriptions);

    let detail = path!("users" / Id)
        .and(warp::get())
        .and(possible_session(context))
        .and(with_context(context.clone()))
        .and_then(handlers::get_user);

    let subscribe = path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(session(context))
        .and(query())
        .and(with_context(context.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(session(context))
        .and(with_context(context.clone()))
        .and_then(handlers::unsubscribe);

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(subscriptions)
        .unify()
        .or(detail)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn tokens(context: &Context) -> BoxedFilter<(Response,)> {
    let login = path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::login);

    let logout = path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(session(context))
        .and_then(handlers::logout);

    login.or(logout).unify().boxed()
}

fn reference(context: &Context) -> BoxedFilter<(Response,)> {
    let tags = path!("tags")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(handlers::list_tags);

    let tag = path!("tags" / Id)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(handlers::get_tag);

    let ingredients = path!("ingredients")
        .and(warp::get())
        .and(query())
        .and(with_context(context.clone()))
        .and_then(handlers::list_ingredients);

    let ingredient = path!("ingredients" / Id)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(handlers::get_ingredient);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

fn recipe_relation(
    context: &Context,
    kind: RelationKind,
    segment: &'static str,
) -> BoxedFilter<(Response,)> {
    let target = warp::any()
        .map(move || kind)
        .and(warp::path("recipes"))
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = target
        .clone()
        .and(warp::post())
        .and(session(context))
        .and(with_context(context.clone()))
        .and_then(handlers::add_recipe_relation);

    let remove = target
        .and(warp::delete())
        .and(session(context))
        .and(with_context(context.clone()))
        .and_then(handlers::remove_recipe_relation);

    add.or(remove).unify().boxed()
}

fn recipes(context: &Context) -> BoxedFilter<(Response,)> {
    let list = path!("recipes")
        .and(warp::get())
        .and(possible_session(context))
        .and(query())
        .and(with_context(context.clone()))
        .and_then(handlers::list_recipes);

    let create = path!("recipes")
        .and(warp::post())
        .and(session(context))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::create_recipe);

    let download = path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session(context))
        .and(with_context(context.clone()))
        .and_then(handlers::download_shopping_cart);

    let detail = path!("recipes" / Id)
        .and(warp::get())
        .and(possible_session(context))
        .and(with_context(context.clone()))
        .and_then(handlers::get_recipe);

    let update = path!("recipes" / Id)
        .and(warp::put().or(warp::patch()).unify())
        .and(session(context))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::update_recipe);

    let delete = path!("recipes" / Id)
        .and(warp::delete())
        .and(session(context))
        .and(with_context(context.clone()))
        .and_then(handlers::delete_recipe);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(recipe_relation(context, RelationKind::Favorite, "favorite"))
        .unify()
        .or(recipe_relation(context, RelationKind::Cart, "shopping_cart"))
        .unify()
        .boxed()
}

fn media(context: &Context) -> BoxedFilter<(Response,)> {
    warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(context.settings.media_root.clone()))
        .map(|file: warp::fs::File| file.into_response())
        .boxed()
}

/// The whole HTTP surface with JSON error handling.
pub fn routes(context: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    users(&context)
        .or(tokens(&context))
        .unify()
        .or(reference(&context))
        .unify()
        .or(recipes(&context))
        .unify()
        .or(media(&context))
        .unify()
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}
