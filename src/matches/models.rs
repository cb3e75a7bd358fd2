use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;

use crate::cancellations::CancellationRecord;
use crate::db;
use crate::errors::ServiceError;
use crate::matches::lifecycle::{JoinOutcome, LeaveOutcome, MATCH_CAPACITY};
use crate::schema::{clubs, matches, users};
use crate::users::{User, UserResponse};

/// A padel session at a club, at most 4 players can join.
///
/// `players` is kept in join order, the first entry is the player who
/// set the category of the match.
#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
#[table_name = "matches"]
pub struct Match {
    pub id: i64,
    pub club_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub court: String,
    pub capacity: i16,
    pub players: Vec<i64>,
    pub category: Option<i16>,
    /// price in cents
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

///
/// **POST /api/matches**
///
/// Only clubs can create matches, the club_id is taken from the session.
///
/// ``` shell
/// curl --location --request POST 'localhost:8080/api/matches' \
///     --header 'Content-Type: application/json' \
///     --data-raw '{
///         "starts_at": "2026-02-01T18:00:00Z",
///         "ends_at": "2026-02-01T19:30:00Z",
///         "court": "court 2",
///         "price": 2400
///     }'
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMatch {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub court: String,
    #[serde(default)]
    pub price: i64,
}

#[derive(Insertable)]
#[table_name = "matches"]
struct NewMatch<'a> {
    club_id: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    court: &'a str,
    capacity: i16,
    price: i64,
}

/// **PATCH /api/matches/{id}**
#[derive(Debug, Deserialize, AsChangeset)]
#[table_name = "matches"]
pub struct UpdateMatch {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub court: Option<String>,
    pub price: Option<i64>,
}

/// MatchFilter is what the client can use to query for matches.
#[derive(Debug, Deserialize)]
pub struct MatchFilter {
    pub club_id: Option<i64>,
    pub category: Option<i16>,
    /// only matches on this day (UTC)
    pub date: Option<NaiveDate>,
    /// only matches with free spots
    pub open: Option<bool>,
    /// default false, set to true to also list matches that already started
    pub include_past: Option<bool>,
}

/// A match together with the players who joined it
#[derive(Debug, Serialize)]
pub struct MatchDetails {
    #[serde(flatten)]
    pub padel_match: Match,
    pub club_name: String,
    pub roster: Vec<UserResponse>,
}

/// minimum duration is 30 minutes
const MIN_MATCH_SECONDS: i64 = 60 * 30;
/// maximum duration is 4 hours
const MAX_MATCH_SECONDS: i64 = 60 * 60 * 4;

fn validate_schedule(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), ServiceError> {
    let duration: Duration = ends_at.signed_duration_since(starts_at);

    if duration.num_seconds() < MIN_MATCH_SECONDS {
        bad_request!("a match should last at least 30 minutes");
    }

    if duration.num_seconds() > MAX_MATCH_SECONDS {
        bad_request!("the max duration of a match is 4 hours");
    }

    Ok(())
}

fn validate_court(court: &str) -> Result<(), ServiceError> {
    if court.trim().is_empty() {
        bad_request!("court name is too short");
    }

    if court.trim().len() > 40 {
        bad_request!("court name is too long, maximum 40 characters");
    }

    Ok(())
}

impl Match {
    pub fn create(
        new_match: &CreateMatch,
        club_id: i64,
        conn: &db::Conn,
    ) -> Result<Match, ServiceError> {
        let padel_match = diesel::insert_into(matches::table)
            .values(&NewMatch {
                club_id,
                starts_at: new_match.starts_at,
                ends_at: new_match.ends_at,
                court: new_match.court.trim(),
                capacity: MATCH_CAPACITY,
                price: new_match.price,
            })
            .get_result::<Match>(conn)?;

        Ok(padel_match)
    }

    pub fn find(id: i64, conn: &db::Conn) -> Result<Match, ServiceError> {
        let padel_match = matches::table.find(id).first::<Match>(conn)?;

        Ok(padel_match)
    }

    pub fn find_details(id: i64, conn: &db::Conn) -> Result<MatchDetails, ServiceError> {
        let padel_match = Match::find(id, conn)?;

        let club_name = clubs::table
            .find(padel_match.club_id)
            .select(clubs::name)
            .first::<String>(conn)?;

        let mut roster = users::table
            .filter(users::id.eq_any(&padel_match.players))
            .select((users::id, users::name, users::gender, users::level))
            .load::<UserResponse>(conn)?;

        let position = |id: i64| padel_match.players.iter().position(|player| *player == id);
        roster.sort_by_key(|player| position(player.id));

        Ok(MatchDetails {
            padel_match,
            club_name,
            roster,
        })
    }

    pub fn find_all(filter: MatchFilter, conn: &db::Conn) -> Result<Vec<Match>, ServiceError> {
        use diesel::dsl::{now, sql};
        use diesel::sql_types::Bool;

        let mut query = matches::table.order(matches::starts_at).into_boxed();

        if !filter.include_past.unwrap_or(false) {
            query = query.filter(matches::starts_at.gt(now));
        }

        if let Some(club_id) = filter.club_id {
            query = query.filter(matches::club_id.eq(club_id));
        }

        if let Some(category) = filter.category {
            query = query.filter(matches::category.eq(category));
        }

        if let Some(date) = filter.date {
            let start = DateTime::<Utc>::from_utc(date.and_hms(0, 0, 0), Utc);
            query = query
                .filter(matches::starts_at.ge(start))
                .filter(matches::starts_at.lt(start + Duration::days(1)));
        }

        if filter.open.unwrap_or(false) {
            query = query.filter(sql::<Bool>("cardinality(players) < capacity"));
        }

        let matches = query.load::<Match>(conn)?;
        Ok(matches)
    }

    /// the matches a player joined
    pub fn find_by_player(
        user_id: i64,
        include_past: bool,
        conn: &db::Conn,
    ) -> Result<Vec<Match>, ServiceError> {
        let mut query = matches::table
            .filter(matches::players.contains(vec![user_id]))
            .order(matches::starts_at)
            .into_boxed();

        if !include_past {
            query = query.filter(matches::ends_at.gt(diesel::dsl::now));
        }

        let matches = query.load::<Match>(conn)?;
        Ok(matches)
    }

    /// return the amount of matches that still have to be played
    pub fn upcoming_count(conn: &db::Conn) -> Result<i64, ServiceError> {
        let count = matches::table
            .filter(matches::ends_at.gt(diesel::dsl::now))
            .count()
            .get_result::<i64>(conn)?;

        Ok(count)
    }

    /// Adds the player to the match.
    ///
    /// The match row is locked for the duration of the transaction so
    /// concurrent joins can't overfill it.
    #[tracing::instrument(name = "match::join", skip(conn))]
    pub fn join(
        match_id: i64,
        user_id: i64,
        conn: &db::Conn,
    ) -> Result<(Match, JoinOutcome), ServiceError> {
        conn.transaction::<_, ServiceError, _>(|| {
            let mut padel_match = matches::table
                .find(match_id)
                .for_update()
                .first::<Match>(conn)?;

            let player = User::find(user_id, conn)?;

            let first_player = match padel_match.players.first() {
                Some(id) => users::table.find(*id).first::<User>(conn).optional()?,
                None => None,
            };

            let outcome = padel_match.add_player(&player, first_player.as_ref(), Utc::now())?;
            let padel_match = padel_match.save_roster(conn)?;

            debug!(
                "player {} joined match {} ({}/{})",
                user_id,
                padel_match.id,
                padel_match.players.len(),
                padel_match.capacity
            );

            Ok((padel_match, outcome))
        })
    }

    /// Removes the player from the match and records a late cancellation
    /// when the leave is penalized.
    #[tracing::instrument(name = "match::leave", skip(conn))]
    pub fn leave(
        match_id: i64,
        user_id: i64,
        conn: &db::Conn,
    ) -> Result<(Match, LeaveOutcome), ServiceError> {
        conn.transaction::<_, ServiceError, _>(|| {
            let now = Utc::now();

            let mut padel_match = matches::table
                .find(match_id)
                .for_update()
                .first::<Match>(conn)?;

            let outcome = padel_match.remove_player(user_id, now)?;
            let padel_match = padel_match.save_roster(conn)?;

            if outcome.late_cancellation {
                CancellationRecord::record(user_id, padel_match.club_id, now, conn)?;
            }

            debug!(
                "player {} left match {} ({}/{})",
                user_id,
                padel_match.id,
                padel_match.players.len(),
                padel_match.capacity
            );

            Ok((padel_match, outcome))
        })
    }

    fn save_roster(&self, conn: &db::Conn) -> Result<Match, diesel::result::Error> {
        diesel::update(matches::table.find(self.id))
            .set((
                matches::players.eq(self.players.clone()),
                matches::category.eq(self.category),
                matches::updated_at.eq(Utc::now()),
            ))
            .get_result::<Match>(conn)
    }

    pub fn update(
        id: i64,
        club_id: i64,
        update: &UpdateMatch,
        conn: &db::Conn,
    ) -> Result<Match, ServiceError> {
        let current = Match::find(id, conn)?;
        current.verify_owner(club_id)?;

        if let Some(court) = &update.court {
            validate_court(court)?;
        }

        if let Some(price) = update.price {
            if price < 0 {
                bad_request!("the price can't be negative");
            }
        }

        if let Some(starts_at) = update.starts_at {
            if starts_at <= Utc::now() {
                bad_request!("the match can't start in the past");
            }
        }

        validate_schedule(
            update.starts_at.unwrap_or(current.starts_at),
            update.ends_at.unwrap_or(current.ends_at),
        )?;

        let padel_match = diesel::update(matches::table.find(id))
            .set((update, matches::updated_at.eq(Utc::now())))
            .get_result::<Match>(conn)?;

        Ok(padel_match)
    }

    pub fn delete(id: i64, club_id: i64, conn: &db::Conn) -> Result<(), ServiceError> {
        Match::find(id, conn)?.verify_owner(club_id)?;

        diesel::delete(matches::table.find(id)).execute(conn)?;

        Ok(())
    }

    /// removes matches that ended before the given time, returns the amount deleted
    pub fn delete_ended_before(
        before: DateTime<Utc>,
        conn: &db::Conn,
    ) -> Result<usize, ServiceError> {
        let deleted = diesel::delete(matches::table.filter(matches::ends_at.lt(before)))
            .execute(conn)?;

        Ok(deleted)
    }

    pub fn verify_owner(&self, club_id: i64) -> Result<(), ServiceError> {
        if self.club_id != club_id {
            forbidden!("only the club hosting this match can change it");
        }
        Ok(())
    }
}

impl crate::validator::Validate<CreateMatch> for CreateMatch {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.starts_at <= Utc::now() {
            bad_request!("the match can't start in the past");
        }

        validate_schedule(self.starts_at, self.ends_at)?;
        validate_court(&self.court)?;

        if self.price < 0 {
            bad_request!("the price can't be negative");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;
    use std::ops::Add;

    fn create_match() -> CreateMatch {
        let starts_at = Utc::now().add(Duration::days(1));
        CreateMatch {
            starts_at,
            ends_at: starts_at.add(Duration::minutes(90)),
            court: String::from("court 1"),
            price: 2400,
        }
    }

    #[test]
    fn valid_match() {
        assert!(Validator::new(create_match()).validate().is_ok());
    }

    #[test]
    fn invalid_match_duration() {
        let mut same_times = create_match();
        same_times.ends_at = same_times.starts_at;

        let mut ends_before_start = create_match();
        ends_before_start.ends_at = ends_before_start.starts_at.add(Duration::hours(-1));

        let mut too_long = create_match();
        too_long.ends_at = too_long.starts_at.add(Duration::hours(5));

        assert!(Validator::new(same_times).validate().is_err());
        assert!(Validator::new(ends_before_start).validate().is_err());
        assert!(Validator::new(too_long).validate().is_err());
    }

    #[test]
    fn match_in_the_past() {
        let mut past = create_match();
        past.starts_at = Utc::now().add(Duration::hours(-2));
        past.ends_at = past.starts_at.add(Duration::hours(1));

        assert!(Validator::new(past).validate().is_err());
    }

    #[test]
    fn invalid_court_and_price() {
        let mut no_court = create_match();
        no_court.court = String::from("  ");
        assert!(Validator::new(no_court).validate().is_err());

        let mut negative_price = create_match();
        negative_price.price = -1;
        assert!(Validator::new(negative_price).validate().is_err());
    }

    #[test]
    fn price_defaults_to_free() {
        let new_match: CreateMatch = serde_json::from_str(
            r#"{"starts_at":"2030-02-01T18:00:00Z","ends_at":"2030-02-01T19:30:00Z","court":"1"}"#,
        )
        .unwrap();

        assert_eq!(new_match.price, 0);
    }
}
