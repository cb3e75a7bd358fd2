use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::schema::{cancellations, clubs, users};

/// leaving a full match less than this many hours before the start is penalized
pub const LATE_CANCELLATION_HOURS: i64 = 12;

/// Counts the late cancellations of a player at a club
#[derive(Debug, Serialize, Queryable, Insertable)]
#[table_name = "cancellations"]
pub struct CancellationRecord {
    pub user_id: i64,
    pub club_id: i64,
    pub total: i32,
    pub last_cancelled_at: DateTime<Utc>,
}

/// A cancellation record with the name of the player, used by clubs
#[derive(Debug, Serialize, Queryable)]
pub struct PlayerCancellations {
    pub user_id: i64,
    pub name: String,
    pub total: i32,
    pub last_cancelled_at: DateTime<Utc>,
}

/// A cancellation record with the name of the club, used by players
#[derive(Debug, Serialize, Queryable)]
pub struct ClubCancellations {
    pub club_id: i64,
    pub club_name: String,
    pub total: i32,
    pub last_cancelled_at: DateTime<Utc>,
}

/// A leave is penalized when the match was full and it starts in less than 12 hours.
/// Leaving a match that already started counts as well.
pub fn is_late_cancellation(starts_at: DateTime<Utc>, now: DateTime<Utc>, was_full: bool) -> bool {
    was_full && starts_at.signed_duration_since(now) < Duration::hours(LATE_CANCELLATION_HOURS)
}

impl CancellationRecord {
    /// increments the counter of the player at the club, or starts it at 1
    pub fn record(
        user_id: i64,
        club_id: i64,
        now: DateTime<Utc>,
        conn: &db::Conn,
    ) -> Result<CancellationRecord, ServiceError> {
        let record = CancellationRecord {
            user_id,
            club_id,
            total: 1,
            last_cancelled_at: now,
        };

        let record = diesel::insert_into(cancellations::table)
            .values(&record)
            .on_conflict((cancellations::user_id, cancellations::club_id))
            .do_update()
            .set((
                cancellations::total.eq(cancellations::total + 1),
                cancellations::last_cancelled_at.eq(now),
            ))
            .get_result::<CancellationRecord>(conn)?;

        info!(
            "player {} cancelled late at club {}, {} time(s) so far",
            user_id, club_id, record.total
        );

        Ok(record)
    }

    pub fn find_by_club(
        club_id: i64,
        conn: &db::Conn,
    ) -> Result<Vec<PlayerCancellations>, ServiceError> {
        let records = cancellations::table
            .inner_join(users::table)
            .filter(cancellations::club_id.eq(club_id))
            .select((
                cancellations::user_id,
                users::name,
                cancellations::total,
                cancellations::last_cancelled_at,
            ))
            .order(cancellations::total.desc())
            .load::<PlayerCancellations>(conn)?;

        Ok(records)
    }

    pub fn find_by_user(
        user_id: i64,
        conn: &db::Conn,
    ) -> Result<Vec<ClubCancellations>, ServiceError> {
        let records = cancellations::table
            .inner_join(clubs::table)
            .filter(cancellations::user_id.eq(user_id))
            .select((
                cancellations::club_id,
                clubs::name,
                cancellations::total,
                cancellations::last_cancelled_at,
            ))
            .load::<ClubCancellations>(conn)?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaving_a_full_match_late_is_penalized() {
        let now = Utc::now();

        assert!(is_late_cancellation(now + Duration::hours(11), now, true));
        assert!(is_late_cancellation(now + Duration::minutes(30), now, true));
        // the match already started
        assert!(is_late_cancellation(now - Duration::minutes(10), now, true));
    }

    #[test]
    fn leaving_early_is_free() {
        let now = Utc::now();

        assert!(!is_late_cancellation(now + Duration::hours(12), now, true));
        assert!(!is_late_cancellation(now + Duration::days(2), now, true));
    }

    #[test]
    fn leaving_a_match_that_was_not_full_is_free() {
        let now = Utc::now();

        assert!(!is_late_cancellation(now + Duration::hours(1), now, false));
    }
}
