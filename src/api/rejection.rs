use std::convert::Infallible;

use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType},
    Rejection, Reply,
};

use crate::error::Error;

/// Turns every rejection into a JSON error response.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "detail": "Not found." }))
    } else if let Some(e) = err.find::<Error>() {
        if e.status().is_server_error() {
            log::error!("Request failed: {e}");
        }
        (e.status(), e.body())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if err.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "detail": "Method not allowed." }),
        )
    } else if err.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "errors": "Request body is too large" }),
        )
    } else if err.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            json!({ "errors": "Content-Length header is required" }),
        )
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            json!({ "errors": "Unsupported media type" }),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "errors": "Internal server error" }),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
