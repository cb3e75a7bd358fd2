use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::auth;
use crate::db;
use crate::errors::ServiceError;
use crate::schema::users;
use crate::validator;

/// the best padel category
pub const MIN_LEVEL: i16 = 1;
/// the beginner category
pub const MAX_LEVEL: i16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "MALE"),
            Gender::Female => write!(f, "FEMALE"),
        }
    }
}

/// A player account
#[derive(Serialize, Deserialize, Queryable, Identifiable, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, skip_deserializing)]
    pub password: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub level: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The public view of a player, without contact details
#[derive(Serialize, Queryable, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub gender: Option<String>,
    pub level: Option<i16>,
}

/// **POST /api/auth/register**
#[derive(Debug, Deserialize)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub level: Option<i16>,
}

#[derive(Insertable)]
#[table_name = "users"]
struct NewUser<'a> {
    email: String,
    name: &'a str,
    password: String,
    phone: Option<&'a str>,
    gender: Option<String>,
    level: Option<i16>,
}

/// **PATCH /api/users/me**
///
/// Only the fields that are sent get updated.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub level: Option<i16>,
}

#[derive(AsChangeset)]
#[table_name = "users"]
struct ProfileChangeset {
    name: Option<String>,
    phone: Option<String>,
    gender: Option<String>,
    level: Option<i16>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct Filter {
    /// filter users by %name%
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryFilter {
    /// default false, set to true to include matches that already ended
    pub include_past: Option<bool>,
}

impl User {
    pub fn find_all(filter: Filter, conn: &db::Conn) -> Result<Vec<UserResponse>, ServiceError> {
        let mut query = users::table
            .select((users::id, users::name, users::gender, users::level))
            .order(users::name)
            .into_boxed();

        if let Some(name) = filter.name {
            query = query.filter(users::name.ilike(format!("%{}%", name)));
        }

        let users = query.load::<UserResponse>(conn)?;

        Ok(users)
    }

    pub fn find(id: i64, conn: &db::Conn) -> Result<Self, ServiceError> {
        let user = users::table.find(id).first(conn)?;

        Ok(user)
    }

    pub fn find_many(ids: &[i64], conn: &db::Conn) -> Result<Vec<Self>, ServiceError> {
        let users = users::table
            .filter(users::id.eq_any(ids))
            .load::<User>(conn)?;

        Ok(users)
    }

    pub fn find_by_email(email: &str, conn: &db::Conn) -> Result<Self, ServiceError> {
        let user = users::table
            .filter(users::email.eq(email.trim().to_lowercase()))
            .first(conn)?;

        Ok(user)
    }

    /// players of a category who are not in the given list
    pub fn find_by_level_excluding(
        level: i16,
        excluded: &[i64],
        conn: &db::Conn,
    ) -> Result<Vec<Self>, ServiceError> {
        let users = users::table
            .filter(users::level.eq(level))
            .filter(users::id.ne_all(excluded))
            .load::<User>(conn)?;

        Ok(users)
    }

    pub fn create(registration: &Registration, conn: &db::Conn) -> Result<Self, ServiceError> {
        let new_user = NewUser {
            email: registration.email.trim().to_lowercase(),
            name: registration.name.trim(),
            password: auth::hash_password(&registration.password)?,
            phone: registration.phone.as_deref(),
            gender: registration.gender.map(|gender| gender.to_string()),
            level: registration.level,
        };

        let user: User = diesel::insert_into(users::table)
            .values(&new_user)
            .get_result(conn)?;

        Ok(user)
    }

    pub fn update_profile(
        id: i64,
        update: ProfileUpdate,
        conn: &db::Conn,
    ) -> Result<Self, ServiceError> {
        let changes = ProfileChangeset {
            name: update.name.map(|name| name.trim().to_string()),
            phone: update.phone,
            gender: update.gender.map(|gender| gender.to_string()),
            level: update.level,
            updated_at: Utc::now(),
        };

        let user = diesel::update(users::table.find(id))
            .set(&changes)
            .get_result(conn)?;

        Ok(user)
    }

    pub fn update_password(id: i64, password: &str, conn: &db::Conn) -> Result<(), ServiceError> {
        let hash = auth::hash_password(password)?;

        diesel::update(users::table.find(id))
            .set((users::password.eq(hash), users::updated_at.eq(Utc::now())))
            .execute(conn)?;

        Ok(())
    }

    pub fn verify_password(&self, password: &[u8]) -> Result<(), ServiceError> {
        auth::verify_password(&self.password, password)
    }

    /// the gender as an enum, None when unset or unknown
    pub fn gender(&self) -> Option<Gender> {
        match self.gender.as_deref() {
            Some("MALE") => Some(Gender::Male),
            Some("FEMALE") => Some(Gender::Female),
            _ => None,
        }
    }

    /// matches can only be joined with a complete profile
    pub fn can_play(&self) -> bool {
        self.level.is_some() && self.gender().is_some()
    }
}

fn validate_level(level: Option<i16>) -> Result<(), ServiceError> {
    if let Some(level) = level {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            bad_request!(format!(
                "the level should be within [{}-{}]",
                MIN_LEVEL, MAX_LEVEL
            ));
        }
    }
    Ok(())
}

impl crate::validator::Validate<Registration> for Registration {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::email(self.email.trim())?;
        validator::name(&self.name)?;
        validator::password(&self.password)?;
        validate_level(self.level)
    }
}

impl crate::validator::Validate<ProfileUpdate> for ProfileUpdate {
    fn validate(&self) -> Result<(), ServiceError> {
        if let Some(name) = &self.name {
            validator::name(name)?;
        }
        validate_level(self.level)
    }
}
