use actix_identity::Identity;
use argon2::Config;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::errors::ServiceError;

/// Every account is either a player or a club,
/// both log in with the same session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Club,
}

/// What the signed session cookie holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub role: Role,
}

/// store the account in the session cookie
pub fn remember(id: &Identity, user: SessionUser) -> Result<(), ServiceError> {
    id.remember(serde_json::to_string(&user)?);
    Ok(())
}

/// get the account of the current authenticated session
/// returns Unauthorized when no (valid) session is found
pub fn get_user(id: &Identity) -> Result<SessionUser, ServiceError> {
    let identity = id.identity().ok_or(ServiceError::Unauthorized)?;

    serde_json::from_str::<SessionUser>(&identity).map_err(|error| {
        warn!("unable to parse session identity: {}", error);
        ServiceError::Unauthorized
    })
}

/// returns the authenticated player, clubs get Forbidden
pub fn get_player(id: &Identity) -> Result<SessionUser, ServiceError> {
    let user = get_user(id)?;

    if user.role != Role::Player {
        forbidden!("only players can do this");
    }

    Ok(user)
}

/// returns the authenticated club, players get Forbidden
pub fn get_club(id: &Identity) -> Result<SessionUser, ServiceError> {
    let user = get_user(id)?;

    if user.role != Role::Club {
        forbidden!("only clubs can do this");
    }

    Ok(user)
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt: [u8; 32] = rand::thread_rng().gen();
    let config = Config::default();

    let hash = argon2::hash_encoded(password.as_bytes(), &salt, &config)?;

    Ok(hash)
}

/// returns Unauthorized when the password doesn't match the hash
pub fn verify_password(hash: &str, password: &[u8]) -> Result<(), ServiceError> {
    let is_match = argon2::verify_encoded(hash, password)?;

    if !is_match {
        return Err(ServiceError::Unauthorized);
    }

    Ok(())
}

/// random url-safe token used for password resets
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incorrect_password() {
        let hash = hash_password("hunter2boogaloo").unwrap();

        assert!(verify_password(&hash, b"hunter2boogaloo").is_ok());
        assert!(verify_password(&hash, b"not-hunter2").is_err());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("hunter2boogaloo").unwrap();
        let second = hash_password("hunter2boogaloo").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn session_user_format() {
        let user = SessionUser {
            id: 42,
            role: Role::Club,
        };

        let serialized = serde_json::to_string(&user).unwrap();
        assert_eq!(serialized, r#"{"id":42,"role":"club"}"#);

        let parsed: SessionUser = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed, user);
    }

    #[test]
    fn tokens() {
        let token = generate_token();

        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }
}
