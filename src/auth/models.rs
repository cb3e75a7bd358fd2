use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use crate::auth::helpers;
use crate::db;
use crate::errors::ServiceError;
use crate::schema::password_resets;
use crate::validator;

/// password reset links stay valid for one hour
const RESET_TOKEN_HOURS: i64 = 1;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PasswordChange {
    pub old: String,
    pub new: String,
}

impl crate::validator::Validate<PasswordChange> for PasswordChange {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.old == self.new {
            bad_request!("the new password can't be the same as the old password");
        }

        validator::password(&self.new)
    }
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetConfirmation {
    pub token: String,
    pub password: String,
}

impl crate::validator::Validate<ResetConfirmation> for ResetConfirmation {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.token.trim().is_empty() {
            bad_request!("missing reset token");
        }

        validator::password(&self.password)
    }
}

#[derive(Debug, Queryable, Insertable)]
#[table_name = "password_resets"]
pub struct PasswordReset {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    pub fn new(user_id: i64) -> Self {
        PasswordReset {
            token: helpers::generate_token(),
            user_id,
            expires_at: Utc::now() + Duration::hours(RESET_TOKEN_HOURS),
        }
    }

    pub fn save(&self, conn: &db::Conn) -> Result<(), ServiceError> {
        diesel::insert_into(password_resets::table)
            .values(self)
            .execute(conn)?;

        Ok(())
    }

    /// Removes the token and returns the user it belonged to.
    /// Unknown or expired tokens are rejected with a BadRequest.
    pub fn consume(token: &str, conn: &db::Conn) -> Result<i64, ServiceError> {
        let reset = diesel::delete(password_resets::table.find(token))
            .get_result::<PasswordReset>(conn)
            .optional()?;

        match reset {
            Some(reset) if !reset.is_expired(Utc::now()) => Ok(reset.user_id),
            _ => bad_request!("this password reset link is invalid or has expired"),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;

    #[test]
    fn same_password_change() {
        let change = PasswordChange {
            old: String::from("hunter2boogaloo"),
            new: String::from("hunter2boogaloo"),
        };

        assert!(Validator::new(change).validate().is_err());
    }

    #[test]
    fn short_new_password() {
        let change = PasswordChange {
            old: String::from("hunter2boogaloo"),
            new: String::from("short"),
        };

        assert!(Validator::new(change).validate().is_err());
    }

    #[test]
    fn reset_tokens_expire_after_an_hour() {
        let reset = PasswordReset::new(1);
        let now = Utc::now();

        assert!(!reset.is_expired(now));
        assert!(!reset.is_expired(now + Duration::minutes(59)));
        assert!(reset.is_expired(now + Duration::minutes(61)));
    }
}
