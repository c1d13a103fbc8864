use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::database::schema::{User, UserRole, Uuid};
use crate::error::ApiError;

use super::permissions::ActionType;

const DEV_SESSION_SECRET: &str = "reseptikirja-dev-secret";

fn session_key() -> Result<Hmac<Sha256>, ApiError> {
    let secret =
        std::env::var("SESSION_SECRET").unwrap_or_else(|_| DEV_SESSION_SECRET.to_string());

    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Query(String::from("Invalid session secret")))
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_uid: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, uid: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            user_uid: uid,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_uid: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Unauthorized(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            is_admin: value.user_uid == UserRole::Admin,
            user_uid: value.user_uid,
        }
    }
}

pub fn generate_jwt_session(user: &User) -> Result<String, ApiError> {
    let key = session_key()?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.uid.to_owned());

    claims
        .sign_with_key(&key)
        .map_err(|_| ApiError::Query(String::from("Failed to sign session token")))
}

pub fn verify_jwt_session(token: String) -> Result<JwtSessionData, ApiError> {
    let key = session_key()?;

    token
        .verify_with_key(&key)
        .map_err(|_| ApiError::InvalidSession(String::from("Invalid session; Invalid token")))
        .map(|session: JwtSessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(ApiError::InvalidSession(String::from(
                    "Invalid session; Token expired",
                )));
            }
            Ok(session)
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: String::from("anna@example.com"),
            username: String::from("anna"),
            password: String::from("hash"),
            first_name: String::from("Anna"),
            last_name: String::from("Virtanen"),
            avatar: None,
            uid: UserRole::User,
        }
    }

    #[test]
    fn session_round_trip() {
        let token = generate_jwt_session(&user()).unwrap();
        let session = verify_jwt_session(token).unwrap();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "anna");
        assert_eq!(session.user_uid, UserRole::User);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let mut token = generate_jwt_session(&user()).unwrap();
        token.push('x');

        assert!(verify_jwt_session(token).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let key = session_key().unwrap();
        let mut claims = JwtSessionData::new(7, String::from("anna"), UserRole::User);
        claims.iat -= 7200;
        claims.exp -= 7200;
        let token = claims.sign_with_key(&key).unwrap();

        assert!(verify_jwt_session(token).is_err());
    }

    #[test]
    fn admin_flag_follows_the_role() {
        let session: SessionData =
            JwtSessionData::new(1, String::from("root"), UserRole::Admin).into();
        assert!(session.is_admin);

        let session: SessionData =
            JwtSessionData::new(2, String::from("anna"), UserRole::User).into();
        assert!(!session.is_admin);
    }
}
