use serde::de::DeserializeOwned;

use crate::errors::ServiceError;

/// Wraps request bodies so handlers can accept `Json<Validator<T>>`
/// and only ever see input that passed `T::validate`.
#[derive(Deserialize)]
pub struct Validator<T>(T);

pub trait Validate<T> {
    fn validate(&self) -> Result<(), ServiceError>;
}

impl<T> Validator<T> {
    pub fn new(i: T) -> Validator<T> {
        Validator::<T>(i)
    }
}

impl<T> Validator<T>
where
    T: Validate<T>,
    T: DeserializeOwned,
{
    pub fn validate(self) -> Result<T, ServiceError> {
        self.0.validate()?;
        Ok(self.0)
    }
}

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_NAME_LENGTH: usize = 60;

pub fn email(email: &str) -> Result<(), ServiceError> {
    if !::validator::validate_email(email) {
        bad_request!("invalid email address");
    }

    Ok(())
}

pub fn name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        bad_request!("name is too short");
    }

    if name.trim().chars().count() > MAX_NAME_LENGTH {
        bad_request!(format!(
            "name is too long, maximum {} characters",
            MAX_NAME_LENGTH
        ));
    }

    Ok(())
}

pub fn password(password: &str) -> Result<(), ServiceError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        bad_request!("your password should be at least 8 characters long");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Court(String);

    impl Validate<Court> for Court {
        fn validate(&self) -> Result<(), ServiceError> {
            name(&self.0)
        }
    }

    #[test]
    fn invalid_value() {
        let invalid = Validator::new(Court(String::from("   ")));

        assert!(invalid.validate().is_err());
    }

    #[test]
    fn valid_value() {
        let valid = Validator::new(Court(String::from("court 1")));

        assert!(valid.validate().is_ok());
    }

    #[test]
    fn emails() {
        assert!(email("player@club.com").is_ok());
        assert!(email("first.last+padel@mail.example.org").is_ok());

        assert!(email("").is_err());
        assert!(email("player").is_err());
        assert!(email("player@").is_err());
        assert!(email("pla yer@club.com").is_err());
    }

    #[test]
    fn long_names() {
        assert!(name(&"a".repeat(60)).is_ok());
        assert!(name(&"a".repeat(61)).is_err());
    }

    #[test]
    fn short_passwords() {
        assert!(password("hunter2").is_err());
        assert!(password("hunter22").is_ok());
    }
}
