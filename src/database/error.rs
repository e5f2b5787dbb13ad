use std::fmt::{self, Display};

use serde_json::{json, Map, Value};
use warp::{http::StatusCode, reject::Reject};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("You can't subscribe to yourself")]
    SelfReferenceNotAllowed,
    #[error("Ensure {field} is between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i32,
        max: i32,
    },
    #[error("Authentication credentials were not provided")]
    AuthenticationRequired,
    #[error("You don't have permission to perform this action")]
    Forbidden,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Unable to log in with provided credentials")]
    InvalidCredentials,
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyExists(_)
            | Error::SelfReferenceNotAllowed
            | Error::OutOfRange { .. }
            | Error::InvalidRequest(_)
            | Error::InvalidCredentials => StatusCode::BAD_REQUEST,
            Error::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Configuration(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent back to the client.
    pub fn body(&self) -> Value {
        match self {
            Error::OutOfRange { field, min, max } => {
                let mut body = Map::new();
                body.insert(
                    field.to_string(),
                    json!([format!("Ensure this value is between {min} and {max}.")]),
                );
                Value::Object(body)
            }
            Error::NotFound(_) => json!({ "detail": self.to_string() }),
            Error::AuthenticationRequired | Error::Forbidden => {
                json!({ "detail": self.to_string() })
            }
            _ => json!({ "errors": self.to_string() }),
        }
    }
}

impl Reject for Error {}

/// Check constraint that keeps users from following themselves.
pub const NO_SELF_FOLLOW: &str = "follows_no_self_follow";

/// Wraps a driver error before it is folded into [`Error`].
#[derive(Debug)]
pub struct QueryError {
    info: String,
    code: Option<String>,
    constraint: Option<String>,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            code: None,
            constraint: None,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                info: format!("{e}"),
                code: e.code().map(|c| c.into_owned()),
                constraint: e.constraint().map(str::to_owned),
            },
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "({code}) {}", self.info),
            None => write!(f, "{}", self.info),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        // 23505 unique_violation, 23514 check_violation
        match value.code.as_deref() {
            Some("23505") => Error::AlreadyExists(String::from("Record already exists")),
            Some("23514") if value.constraint.as_deref() == Some(NO_SELF_FOLLOW) => {
                Error::SelfReferenceNotAllowed
            }
            Some("23514") => {
                log::debug!("Check violation: {value}");
                Error::InvalidRequest(value.info)
            }
            _ => {
                log::error!("Query failed: {value}");
                Error::Internal(value.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(Error::not_found("Recipe").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::AlreadyExists("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::SelfReferenceNotAllowed.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::AuthenticationRequired.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn out_of_range_body_is_keyed_by_field() {
        let body = Error::OutOfRange {
            field: "cooking_time",
            min: 1,
            max: 32000,
        }
        .body();

        assert_eq!(
            body["cooking_time"][0],
            "Ensure this value is between 1 and 32000."
        );
    }

    #[test]
    fn constraint_codes_become_domain_errors() {
        let unique = QueryError {
            info: String::from("duplicate key"),
            code: Some(String::from("23505")),
            constraint: Some(String::from("follows_pkey")),
        };
        assert!(matches!(Error::from(unique), Error::AlreadyExists(_)));

        let self_follow = QueryError {
            info: String::from("violates check constraint"),
            code: Some(String::from("23514")),
            constraint: Some(String::from(NO_SELF_FOLLOW)),
        };
        assert_eq!(Error::from(self_follow), Error::SelfReferenceNotAllowed);

        let cooking_time = QueryError {
            info: String::from("violates check constraint \"recipes_cooking_time_check\""),
            code: Some(String::from("23514")),
            constraint: Some(String::from("recipes_cooking_time_check")),
        };
        assert!(matches!(
            Error::from(cooking_time),
            Error::InvalidRequest(info) if info.contains("recipes_cooking_time_check")
        ));

        let other = QueryError::new(String::from("Pool closed"));
        assert!(matches!(Error::from(other), Error::Internal(_)));
    }
}
