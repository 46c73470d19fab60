use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    constants::SESSION_LIFETIME_HOURS,
    error::{Error, HtmlError},
    schema::{Id, User, UserRole},
};

use super::permissions::ActionType;

pub type SessionKey = Hmac<Sha256>;

/// Builds the signing key from the configured secret, or from fresh random
/// bytes when there is none. Sessions signed with a random key do not survive
/// a restart.
pub fn session_key(secret: Option<&str>) -> Result<SessionKey, Error> {
    let bytes = match secret {
        Some(secret) => secret.as_bytes().to_vec(),
        None => {
            log::warn!("No session secret configured, using a random key");
            let mut bytes = vec![0u8; 64];
            rand::thread_rng().fill_bytes(&mut bytes);
            bytes
        }
    };

    SessionKey::new_from_slice(&bytes).map_err(|e| {
        log::error!("Invalid session key: {e}");
        HtmlError::InternalServerError.default()
    })
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_LIFETIME_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(HtmlError::Forbidden.default());
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

pub fn generate_jwt_session(user: &User, key: &SessionKey) -> Result<String, Error> {
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role);

    claims.sign_with_key(key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        HtmlError::InternalServerError.default()
    })
}

pub fn verify_jwt_session(token: &str, key: &SessionKey) -> Result<JwtSessionData, Error> {
    let session: JwtSessionData = token
        .verify_with_key(key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid token."))?;

    if session.is_expired() {
        return Err(HtmlError::InvalidSession.new("Token has expired."));
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 7,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Julia"),
            last_name: String::from("Child"),
            password: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn signed_session_verifies() {
        let key = session_key(Some("test-secret")).unwrap();
        let token = generate_jwt_session(&user(UserRole::Admin), &key).unwrap();

        let session: SessionData = verify_jwt_session(&token, &key).unwrap().into();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "cook");
        assert!(session.is_admin);
    }

    #[test]
    fn other_key_is_rejected() {
        let key = session_key(Some("test-secret")).unwrap();
        let other = session_key(Some("other-secret")).unwrap();
        let token = generate_jwt_session(&user(UserRole::User), &key).unwrap();

        let error = verify_jwt_session(&token, &other).unwrap_err();
        assert_eq!(error.code, 401);
    }

    #[test]
    fn expired_session_is_rejected() {
        let key = session_key(Some("test-secret")).unwrap();
        let mut claims = JwtSessionData::new(1, String::from("cook"), UserRole::User);
        claims.exp = Utc::now().timestamp() - 10;
        let token = claims.sign_with_key(&key).unwrap();

        let error = verify_jwt_session(&token, &key).unwrap_err();
        assert_eq!(error.info.as_deref(), Some("Token has expired."));
    }

    #[test]
    fn random_keys_differ() {
        let token = generate_jwt_session(&user(UserRole::User), &session_key(None).unwrap()).unwrap();
        assert!(verify_jwt_session(&token, &session_key(None).unwrap()).is_err());
    }

    #[test]
    fn users_cannot_manage_all_recipes() {
        let session: SessionData = JwtSessionData::new(1, String::from("cook"), UserRole::User).into();

        assert!(session.authenticate(ActionType::CreateRecipes).is_ok());
        assert_eq!(
            session
                .authenticate(ActionType::ManageAllRecipes)
                .unwrap_err()
                .code,
            403
        );
    }
}
