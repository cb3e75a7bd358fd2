use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::events::registration;
use crate::schema::events;
use crate::users::User;
use crate::validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// players register as a pair
    Tournament,
    /// players register on their own
    OpenCourt,
}

impl EventKind {
    pub fn parse(kind: &str) -> Option<EventKind> {
        match kind {
            "TOURNAMENT" => Some(EventKind::Tournament),
            "OPEN_COURT" => Some(EventKind::OpenCourt),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Tournament => write!(f, "TOURNAMENT"),
            EventKind::OpenCourt => write!(f, "OPEN_COURT"),
        }
    }
}

/// A club-run tournament or open-court session.
#[derive(Debug, Clone, Serialize, Queryable, Identifiable)]
pub struct Event {
    pub id: i64,
    pub club_id: i64,
    pub name: String,
    pub kind: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub pairs: Vec<String>,
    pub max_pairs: i16,
    pub registered_users: Vec<i64>,
    /// price in cents
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// **POST /api/events**
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvent {
    pub name: String,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_pairs: i16,
    #[serde(default)]
    pub price: i64,
}

#[derive(Insertable)]
#[table_name = "events"]
struct NewEvent<'a> {
    club_id: i64,
    name: &'a str,
    kind: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    max_pairs: i16,
    price: i64,
}

/// **PATCH /api/events/{id}**
#[derive(Debug, Deserialize, AsChangeset)]
#[table_name = "events"]
pub struct UpdateEvent {
    pub name: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub max_pairs: Option<i16>,
    pub price: Option<i64>,
}

/// **POST /api/events/{id}/join**
///
/// Tournaments need the name of the partner, open courts ignore it.
#[derive(Debug, Default, Deserialize)]
pub struct JoinEvent {
    pub partner: Option<String>,
}

/// **POST /api/events/{id}/cancel**
///
/// Tournament registrations are cancelled by pair name,
/// open court registrations by the user in the session.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRegistration {
    pub pair: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventFilter {
    pub club_id: Option<i64>,
    pub kind: Option<EventKind>,
    /// default false, set to true to also list events that already started
    pub include_past: Option<bool>,
}

/// Who is cancelling a registration
#[derive(Debug, Clone, Copy)]
pub enum Canceller {
    Player(i64),
    Club(i64),
}

impl Event {
    pub fn create(new_event: &CreateEvent, club_id: i64, conn: &db::Conn) -> Result<Event, ServiceError> {
        let event = diesel::insert_into(events::table)
            .values(&NewEvent {
                club_id,
                name: new_event.name.trim(),
                kind: new_event.kind.to_string(),
                starts_at: new_event.starts_at,
                ends_at: new_event.ends_at,
                max_pairs: new_event.max_pairs,
                price: new_event.price,
            })
            .get_result::<Event>(conn)?;

        Ok(event)
    }

    pub fn find(id: i64, conn: &db::Conn) -> Result<Event, ServiceError> {
        let event = events::table.find(id).first::<Event>(conn)?;

        Ok(event)
    }

    pub fn find_all(filter: EventFilter, conn: &db::Conn) -> Result<Vec<Event>, ServiceError> {
        let mut query = events::table.order(events::starts_at).into_boxed();

        if !filter.include_past.unwrap_or(false) {
            query = query.filter(events::starts_at.gt(diesel::dsl::now));
        }

        if let Some(club_id) = filter.club_id {
            query = query.filter(events::club_id.eq(club_id));
        }

        if let Some(kind) = filter.kind {
            query = query.filter(events::kind.eq(kind.to_string()));
        }

        let events = query.load::<Event>(conn)?;
        Ok(events)
    }

    /// the events a player registered for
    pub fn find_by_player(user_id: i64, conn: &db::Conn) -> Result<Vec<Event>, ServiceError> {
        let events = events::table
            .filter(events::registered_users.contains(vec![user_id]))
            .filter(events::ends_at.gt(diesel::dsl::now))
            .order(events::starts_at)
            .load::<Event>(conn)?;

        Ok(events)
    }

    pub fn update(
        id: i64,
        club_id: i64,
        update: &UpdateEvent,
        conn: &db::Conn,
    ) -> Result<Event, ServiceError> {
        conn.transaction::<_, ServiceError, _>(|| {
            let current = events::table.find(id).for_update().first::<Event>(conn)?;
            current.verify_owner(club_id)?;
            current.check_update(update)?;

            let event = diesel::update(events::table.find(id))
                .set((update, events::updated_at.eq(Utc::now())))
                .get_result::<Event>(conn)?;

            Ok(event)
        })
    }

    /// rejects changes that don't fit the registrations already made
    fn check_update(&self, update: &UpdateEvent) -> Result<(), ServiceError> {
        if let Some(name) = &update.name {
            validator::name(name)?;
        }

        if let Some(max_pairs) = update.max_pairs {
            if max_pairs <= 0 {
                bad_request!("an event needs room for at least one pair");
            }
            if (max_pairs as usize) < self.pairs.len() {
                bad_request!("there are already more pairs registered than that");
            }
        }

        if let Some(price) = update.price {
            if price < 0 {
                bad_request!("the price can't be negative");
            }
        }

        let starts_at = update.starts_at.unwrap_or(self.starts_at);
        if starts_at >= update.ends_at.unwrap_or(self.ends_at) {
            bad_request!("an event has to end after it starts");
        }

        Ok(())
    }

    pub fn delete(id: i64, club_id: i64, conn: &db::Conn) -> Result<(), ServiceError> {
        Event::find(id, conn)?.verify_owner(club_id)?;

        diesel::delete(events::table.find(id)).execute(conn)?;

        Ok(())
    }

    /// removes events that ended before the given time, returns the amount deleted
    pub fn delete_ended_before(before: DateTime<Utc>, conn: &db::Conn) -> Result<usize, ServiceError> {
        let deleted =
            diesel::delete(events::table.filter(events::ends_at.lt(before))).execute(conn)?;

        Ok(deleted)
    }

    #[tracing::instrument(name = "event::join", skip(join, conn))]
    pub fn join(
        event_id: i64,
        user_id: i64,
        join: JoinEvent,
        conn: &db::Conn,
    ) -> Result<Event, ServiceError> {
        conn.transaction::<_, ServiceError, _>(|| {
            let mut event = events::table
                .find(event_id)
                .for_update()
                .first::<Event>(conn)?;

            if event.starts_at <= Utc::now() {
                bad_request!("this event has already started");
            }

            let player = User::find(user_id, conn)?;

            let pair = match event.kind() {
                Some(EventKind::Tournament) => match join.partner.as_deref() {
                    Some(partner) if !partner.trim().is_empty() => {
                        registration::pair_name(&player.name, partner)
                    }
                    _ => bad_request!("a tournament registration needs the name of your partner"),
                },
                Some(EventKind::OpenCourt) => player.name.clone(),
                None => {
                    error!("event {} has an unknown kind: {}", event.id, event.kind);
                    return Err(ServiceError::InternalServerError);
                }
            };

            event.register(user_id, pair)?;
            event.save_registrations(conn)
        })
    }

    #[tracing::instrument(name = "event::cancel", skip(cancel, conn))]
    pub fn cancel(
        event_id: i64,
        canceller: Canceller,
        cancel: CancelRegistration,
        conn: &db::Conn,
    ) -> Result<Event, ServiceError> {
        conn.transaction::<_, ServiceError, _>(|| {
            let mut event = events::table
                .find(event_id)
                .for_update()
                .first::<Event>(conn)?;

            match (event.kind(), canceller) {
                (Some(EventKind::Tournament), _) => {
                    let pair = match cancel.pair.as_deref() {
                        Some(pair) => pair,
                        None => bad_request!("name the pair you want to cancel"),
                    };

                    let allowed = match canceller {
                        Canceller::Player(user_id) => event.pair_owner(pair) == Some(user_id),
                        Canceller::Club(club_id) => event.club_id == club_id,
                    };

                    if !allowed && event.pair_owner(pair).is_some() {
                        forbidden!("you can only cancel your own registration");
                    }

                    event.cancel_pair(pair)?;
                }
                (Some(EventKind::OpenCourt), Canceller::Player(user_id)) => {
                    event.cancel_user(user_id)?;
                }
                (Some(EventKind::OpenCourt), Canceller::Club(_)) => {
                    forbidden!("open court registrations are cancelled by the player");
                }
                (None, _) => {
                    error!("event {} has an unknown kind: {}", event.id, event.kind);
                    return Err(ServiceError::InternalServerError);
                }
            }

            event.save_registrations(conn)
        })
    }

    fn save_registrations(&self, conn: &db::Conn) -> Result<Event, ServiceError> {
        let event = diesel::update(events::table.find(self.id))
            .set((
                events::pairs.eq(self.pairs.clone()),
                events::registered_users.eq(self.registered_users.clone()),
                events::updated_at.eq(Utc::now()),
            ))
            .get_result::<Event>(conn)?;

        Ok(event)
    }

    pub fn verify_owner(&self, club_id: i64) -> Result<(), ServiceError> {
        if self.club_id != club_id {
            forbidden!("only the club hosting this event can change it");
        }
        Ok(())
    }
}

impl crate::validator::Validate<CreateEvent> for CreateEvent {
    fn validate(&self) -> Result<(), ServiceError> {
        validator::name(&self.name)?;

        if self.starts_at <= Utc::now() {
            bad_request!("the event can't start in the past");
        }

        if self.ends_at <= self.starts_at {
            bad_request!("an event has to end after it starts");
        }

        if self.max_pairs <= 0 {
            bad_request!("an event needs room for at least one pair");
        }

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
    use chrono::Duration;

    fn create_event() -> CreateEvent {
        let starts_at = Utc::now() + Duration::days(10);
        CreateEvent {
            name: String::from("summer cup"),
            kind: EventKind::Tournament,
            starts_at,
            ends_at: starts_at + Duration::hours(8),
            max_pairs: 16,
            price: 3000,
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(EventKind::parse("OPEN_COURT"), Some(EventKind::OpenCourt));
        assert_eq!(EventKind::parse("tournament"), None);
        assert_eq!(EventKind::Tournament.to_string(), "TOURNAMENT");

        let kind: EventKind = serde_json::from_str("\"OPEN_COURT\"").unwrap();
        assert_eq!(kind, EventKind::OpenCourt);
    }

    #[test]
    fn valid_event() {
        assert!(Validator::new(create_event()).validate().is_ok());
    }

    #[test]
    fn invalid_events() {
        let mut no_pairs = create_event();
        no_pairs.max_pairs = 0;
        assert!(Validator::new(no_pairs).validate().is_err());

        let mut backwards = create_event();
        backwards.ends_at = backwards.starts_at - Duration::hours(1);
        assert!(Validator::new(backwards).validate().is_err());

        let mut unnamed = create_event();
        unnamed.name = String::new();
        assert!(Validator::new(unnamed).validate().is_err());
    }

    fn registered_event(pairs: &[&str], max_pairs: i16) -> Event {
        let starts_at = Utc::now() + Duration::days(3);
        Event {
            id: 1,
            club_id: 7,
            name: String::from("summer cup"),
            kind: EventKind::Tournament.to_string(),
            starts_at,
            ends_at: starts_at + Duration::hours(4),
            pairs: pairs.iter().map(|pair| pair.to_string()).collect(),
            max_pairs,
            registered_users: (1..=pairs.len() as i64).collect(),
            price: 2000,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn no_changes() -> UpdateEvent {
        UpdateEvent {
            name: None,
            starts_at: None,
            ends_at: None,
            max_pairs: None,
            price: None,
        }
    }

    #[test]
    fn updates_respect_registrations() {
        let event = registered_event(&["Ana / Bea", "Carl / Dan", "Eva / Fay"], 8);

        let mut shrink = no_changes();
        shrink.max_pairs = Some(2);
        match event.check_update(&shrink) {
            Err(ServiceError::BadRequest(_)) => {}
            other => panic!("expected a bad request, got {:?}", other),
        }

        let mut exact = no_changes();
        exact.max_pairs = Some(3);
        assert!(event.check_update(&exact).is_ok());

        let mut backwards = no_changes();
        backwards.ends_at = Some(event.starts_at - Duration::hours(1));
        assert!(event.check_update(&backwards).is_err());

        assert!(event.check_update(&no_changes()).is_ok());
    }
}
