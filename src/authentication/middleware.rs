use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{constants::TOKEN_PREFIXES, error::Error};

use super::jwt::{verify_jwt_session, SessionData};

fn strip_prefix(header: &str) -> Option<&str> {
    TOKEN_PREFIXES
        .iter()
        .find_map(|prefix| header.strip_prefix(prefix))
        .map(str::trim)
}

fn resolve(header: Option<String>, secret: &str) -> Result<Option<SessionData>, Error> {
    let Some(header) = header else {
        return Ok(None);
    };
    let token = strip_prefix(&header).ok_or(Error::AuthenticationRequired)?;
    let session = verify_jwt_session(token, secret).map_err(|e| {
        log::trace!("> Rejected session: {e}");
        Error::AuthenticationRequired
    })?;

    Ok(Some(session.into()))
}

/// Requires a valid `Authorization: Token <jwt>` header.
pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            match resolve(header, &secret) {
                Ok(Some(session)) => Ok(session),
                Ok(None) => Err(warp::reject::custom(Error::AuthenticationRequired)),
                Err(e) => Err(warp::reject::custom(e)),
            }
        }
    })
}

/// Like [`with_session`] but lets anonymous requests through. A header that is
/// present but invalid is still rejected.
pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move { resolve(header, &secret).map_err(warp::reject::custom) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jwt::generate_jwt_session,
        schema::{User, UserRole},
    };

    fn token() -> String {
        let user = User {
            id: 1,
            email: String::from("a@example.com"),
            username: String::from("a"),
            first_name: String::new(),
            last_name: String::new(),
            password: String::new(),
            role: UserRole::User,
        };
        generate_jwt_session(&user, "secret", 1).unwrap()
    }

    #[tokio::test]
    async fn accepts_token_and_bearer_prefixes() {
        let filter = with_session(Arc::from("secret"));

        for prefix in ["Token", "Bearer"] {
            let session = warp::test::request()
                .header("authorization", format!("{prefix} {}", token()))
                .filter(&filter)
                .await
                .unwrap();
            assert_eq!(session.user_id, 1);
        }
    }

    #[tokio::test]
    async fn missing_header_is_anonymous_or_rejected() {
        let optional = with_possible_session(Arc::from("secret"));
        let required = with_session(Arc::from("secret"));

        assert!(warp::test::request()
            .filter(&optional)
            .await
            .unwrap()
            .is_none());
        assert!(warp::test::request().filter(&required).await.is_err());
    }
}
