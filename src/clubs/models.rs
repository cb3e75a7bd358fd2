use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::auth;
use crate::db;
use crate::errors::ServiceError;
use crate::schema::clubs;
use crate::validator;

/// A venue account, clubs own matches, events, inventory and finances.
#[derive(Serialize, Deserialize, Queryable, Identifiable, Debug, Clone)]
pub struct Club {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, skip_deserializing)]
    pub password: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// **POST /api/auth/clubs/register**
#[derive(Debug, Deserialize)]
pub struct ClubRegistration {
    pub email: String,
    pub name: String,
    pub password: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Insertable)]
#[table_name = "clubs"]
struct NewClub<'a> {
    email: String,
    name: &'a str,
    password: String,
    address: Option<&'a str>,
    phone: Option<&'a str>,
}

/// **PATCH /api/clubs/me**
#[derive(Debug, Deserialize, AsChangeset)]
#[table_name = "clubs"]
pub struct ClubUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClubFilter {
    /// filter clubs by %name%
    pub name: Option<String>,
}

impl Club {
    pub fn find_all(filter: ClubFilter, conn: &db::Conn) -> Result<Vec<Club>, ServiceError> {
        let mut query = clubs::table.order(clubs::name).into_boxed();

        if let Some(name) = filter.name {
            query = query.filter(clubs::name.ilike(format!("%{}%", name)));
        }

        let clubs = query.load::<Club>(conn)?;

        Ok(clubs)
    }

    pub fn find(id: i64, conn: &db::Conn) -> Result<Club, ServiceError> {
        let club = clubs::table.find(id).first(conn)?;

        Ok(club)
    }

    pub fn find_by_email(email: &str, conn: &db::Conn) -> Result<Club, ServiceError> {
        let club = clubs::table
            .filter(clubs::email.eq(email.trim().to_lowercase()))
            .first(conn)?;

        Ok(club)
    }

    pub fn create(registration: &ClubRegistration, conn: &db::Conn) -> Result<Club, ServiceError> {
        let new_club = NewClub {
            email: registration.email.trim().to_lowercase(),
            name: registration.name.trim(),
            password: auth::hash_password(&registration.password)?,
            address: registration.address.as_deref(),
            phone: registration.phone.as_deref(),
        };

        let club = diesel::insert_into(clubs::table)
            .values(&new_club)
            .get_result(conn)?;

        Ok(club)
    }

    pub fn update(id: i64, update: &ClubUpdate, conn: &db::Conn) -> Result<Club, ServiceError> {
        let club = diesel::update(clubs::table.find(id))
            .set((update, clubs::updated_at.eq(Utc::now())))
            .get_result(conn)?;

        Ok(club)
    }

    pub fn update_password(id: i64, password: &str, conn: &db::Conn) -> Result<(), ServiceError> {
        let hash = auth::hash_password(password)?;

        diesel::update(clubs::table.find(id))
            .set((clubs::password.eq(hash), clubs::updated_at.eq(Utc::now())))
            .execute(conn)?;

        Ok(())
    }

    pub fn verify_password(&self, password: &[u8]) -> Result<(), ServiceError> {
        auth::verify_password(&self.password, password)
    }
}

impl crate::validator::Validate<ClubRegistration> for ClubRegistration {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::email(self.email.trim())?;
        validator::name(&self.name)?;
        validator::password(&self.password)
    }
}

impl crate::validator::Validate<ClubUpdate> for ClubUpdate {
    fn validate(&self) -> Result<(), ServiceError> {
        if let Some(name) = &self.name {
            validator::name(name)?;
        }

        if self.name.is_none() && self.address.is_none() && self.phone.is_none() {
            bad_request!("nothing to update");
        }

        Ok(())
    }
}
