use crate::errors::ServiceError;
use crate::events::{Event, EventKind};

/// the pair string stored for a tournament registration
pub fn pair_name(player: &str, partner: &str) -> String {
    format!("{} / {}", player.trim(), partner.trim())
}

impl Event {
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.kind)
    }

    pub fn is_full(&self) -> bool {
        self.pairs.len() >= self.max_pairs as usize
    }

    pub fn is_registered(&self, user_id: i64) -> bool {
        self.registered_users.contains(&user_id)
    }

    /// Appends the pair and the user, the two lists move in lockstep
    /// so `pairs[i]` always belongs to `registered_users[i]`.
    pub fn register(&mut self, user_id: i64, pair: String) -> Result<(), ServiceError> {
        if self.is_registered(user_id) {
            conflict!("you are already registered for this event");
        }

        if self.pairs.contains(&pair) {
            conflict!("this pair is already registered for this event");
        }

        if self.is_full() {
            bad_request!("this event is full");
        }

        self.pairs.push(pair);
        self.registered_users.push(user_id);

        Ok(())
    }

    /// removes the pair with this name, returns the user who registered it
    pub fn cancel_pair(&mut self, pair: &str) -> Result<i64, ServiceError> {
        match self.pairs.iter().position(|registered| registered == pair) {
            Some(index) => Ok(self.remove_at(index)),
            None => bad_request!("this pair is not registered for this event"),
        }
    }

    /// removes the registration of this user, returns the removed pair
    pub fn cancel_user(&mut self, user_id: i64) -> Result<String, ServiceError> {
        match self.registered_users.iter().position(|id| *id == user_id) {
            Some(index) => {
                let pair = self.pairs.remove(index);
                self.registered_users.remove(index);
                Ok(pair)
            }
            None => bad_request!("you are not registered for this event"),
        }
    }

    /// the user registering a pair is allowed to cancel it
    pub fn pair_owner(&self, pair: &str) -> Option<i64> {
        self.pairs
            .iter()
            .position(|registered| registered == pair)
            .and_then(|index| self.registered_users.get(index).copied())
    }

    fn remove_at(&mut self, index: usize) -> i64 {
        self.pairs.remove(index);
        self.registered_users.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn event(kind: EventKind, max_pairs: i16) -> Event {
        let starts_at = Utc::now() + Duration::days(7);
        Event {
            id: 1,
            club_id: 1,
            name: String::from("summer cup"),
            kind: kind.to_string(),
            starts_at,
            ends_at: starts_at + Duration::hours(8),
            pairs: vec![],
            max_pairs,
            registered_users: vec![],
            price: 0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn pair_names() {
        assert_eq!(pair_name(" Ann ", "Bob"), "Ann / Bob");
    }

    #[test]
    fn registrations_move_in_lockstep() {
        let mut event = event(EventKind::Tournament, 8);

        event.register(1, pair_name("Ann", "Bob")).unwrap();
        event.register(2, pair_name("Cid", "Dee")).unwrap();

        assert_eq!(event.pairs, vec!["Ann / Bob", "Cid / Dee"]);
        assert_eq!(event.registered_users, vec![1, 2]);
        assert_eq!(event.pair_owner("Cid / Dee"), Some(2));
    }

    #[test]
    fn full_events_are_rejected() {
        let mut event = event(EventKind::OpenCourt, 1);
        event.register(1, String::from("Ann")).unwrap();

        let result = event.register(2, String::from("Bob"));

        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
        assert_eq!(event.pairs.len(), 1);
    }

    #[test]
    fn double_registrations_are_rejected() {
        let mut event = event(EventKind::Tournament, 8);
        event.register(1, pair_name("Ann", "Bob")).unwrap();

        assert!(matches!(
            event.register(1, pair_name("Ann", "Cid")),
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            event.register(2, pair_name("Ann", "Bob")),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn cancel_tournament_pair_by_name() {
        let mut event = event(EventKind::Tournament, 8);
        event.register(1, pair_name("Ann", "Bob")).unwrap();
        event.register(2, pair_name("Cid", "Dee")).unwrap();

        let owner = event.cancel_pair("Ann / Bob").unwrap();

        assert_eq!(owner, 1);
        assert_eq!(event.pairs, vec!["Cid / Dee"]);
        assert_eq!(event.registered_users, vec![2]);
        assert!(event.cancel_pair("Ann / Bob").is_err());
    }

    #[test]
    fn cancel_open_court_by_user() {
        let mut event = event(EventKind::OpenCourt, 8);
        event.register(1, String::from("Ann")).unwrap();
        event.register(2, String::from("Bob")).unwrap();

        let pair = event.cancel_user(2).unwrap();

        assert_eq!(pair, "Bob");
        assert_eq!(event.pairs, vec!["Ann"]);
        assert_eq!(event.registered_users, vec![1]);
        assert!(event.cancel_user(2).is_err());
    }
}
