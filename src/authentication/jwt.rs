use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User, UserRole};
use crate::error::Error;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden);
        }
        Ok(())
    }

    /// Whether this session may act on something owned by `owner_id`.
    pub fn can_manage(&self, owner_id: Id, own: ActionType, all: ActionType) -> bool {
        match self.authenticate(all) {
            Ok(_) => true,
            Err(_) => self.authenticate(own).is_ok() && owner_id == self.user_id,
        }
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, Error> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(format!("Invalid signing key: {e}")))
}

pub fn generate_jwt_session(user: &User, secret: &str, lifetime_hours: i64) -> Result<String, Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role, lifetime_hours);

    claims
        .sign_with_key(&key)
        .map_err(|e| Error::Internal(format!("Could not sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| Error::InvalidRequest(String::from("Invalid session; Invalid token")))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(Error::InvalidRequest(String::from(
            "Invalid session; Token expired",
        )));
    }

    Ok(session)
}
