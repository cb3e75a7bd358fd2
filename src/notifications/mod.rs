//! Emails sent on match transitions and account events.
//!
//! The functions in this module only decide who gets which email, the
//! [`Mailer`] actor does the delivery once the database work committed.

mod mailer;
pub mod templates;

pub use mailer::{dispatch, Email, Mailer};

use crate::clubs::Club;
use crate::config::Config;
use crate::db;
use crate::errors::ServiceError;
use crate::matches::Match;
use crate::users::User;

/// The match just got its 4th player: the club and all players are told.
pub fn match_completed(padel_match: &Match, conn: &db::Conn) -> Result<Vec<Email>, ServiceError> {
    let club = Club::find(padel_match.club_id, conn)?;
    let players = User::find_many(&padel_match.players, conn)?;

    Ok(match_completed_emails(
        padel_match,
        &club,
        &players,
        Config::frontend_url(),
    ))
}

/// one email for the club, one for every player
pub fn match_completed_emails(
    padel_match: &Match,
    club: &Club,
    players: &[User],
    base_url: &str,
) -> Vec<Email> {
    let names: Vec<String> = players.iter().map(|player| player.name.clone()).collect();

    let mut emails = vec![templates::match_completed_club(padel_match, club, &names)];
    emails.extend(
        players
            .iter()
            .map(|player| templates::match_completed_player(&player.email, padel_match, club, base_url)),
    );

    emails
}

/// A full match lost a player: the remaining players are told, and every
/// player of the same category who isn't in the match hears about the spot.
pub fn match_reopened(
    padel_match: &Match,
    leaver_id: i64,
    conn: &db::Conn,
) -> Result<Vec<Email>, ServiceError> {
    let club = Club::find(padel_match.club_id, conn)?;
    let remaining = User::find_many(&padel_match.players, conn)?;

    let candidates = match padel_match.category {
        Some(category) => {
            let mut excluded = padel_match.players.clone();
            excluded.push(leaver_id);
            User::find_by_level_excluding(category, &excluded, conn)?
        }
        None => Vec::new(),
    };

    Ok(match_reopened_emails(
        padel_match,
        &club,
        &remaining,
        &candidates,
        leaver_id,
        Config::frontend_url(),
    ))
}

/// `player_left` for the remaining players, `spot_available` for the
/// candidates of the match category, never for the leaver or a player
/// who is still in the match
pub fn match_reopened_emails(
    padel_match: &Match,
    club: &Club,
    remaining: &[User],
    candidates: &[User],
    leaver_id: i64,
    base_url: &str,
) -> Vec<Email> {
    let mut emails: Vec<Email> = remaining
        .iter()
        .map(|player| templates::player_left(&player.email, padel_match, club, base_url))
        .collect();

    let category = match padel_match.category {
        Some(category) => category,
        None => return emails,
    };

    let spots: Vec<Email> = candidates
        .iter()
        .filter(|player| player.id != leaver_id)
        .filter(|player| !padel_match.players.contains(&player.id))
        .filter(|player| player.level == Some(category))
        .map(|player| templates::spot_available(&player.email, padel_match, club, base_url))
        .collect();

    debug!(
        "notifying {} player(s) of category {} about match {}",
        spots.len(),
        category,
        padel_match.id
    );

    emails.extend(spots);
    emails
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    const BASE_URL: &str = "https://padelhub.app";

    fn player(id: i64, level: i16) -> User {
        User {
            id,
            email: format!("player{}@mail.com", id),
            name: format!("Player {}", id),
            password: String::new(),
            phone: None,
            gender: Some(String::from("F")),
            level: Some(level),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn fixtures(players: Vec<i64>) -> (Match, Club) {
        let starts_at = Utc::now() + Duration::days(2);
        let padel_match = Match {
            id: 3,
            club_id: 1,
            starts_at,
            ends_at: starts_at + Duration::minutes(90),
            court: String::from("court 2"),
            capacity: 4,
            players,
            category: Some(5),
            price: 2400,
            created_at: Utc::now(),
            updated_at: None,
        };
        let club = Club {
            id: 1,
            email: String::from("info@padelclub.com"),
            name: String::from("Padel Club"),
            password: String::new(),
            address: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        (padel_match, club)
    }

    fn recipients(emails: &[Email], subject: &str) -> Vec<String> {
        emails
            .iter()
            .filter(|email| email.subject == subject)
            .map(|email| email.to.clone())
            .collect()
    }

    #[test]
    fn completed_match_tells_the_club_and_every_player() {
        let (padel_match, club) = fixtures(vec![1, 2, 3, 4]);
        let players: Vec<User> = (1..=4).map(|id| player(id, 5)).collect();

        let emails = match_completed_emails(&padel_match, &club, &players, BASE_URL);

        assert_eq!(emails.len(), 5);
        assert_eq!(recipients(&emails, "A match is complete"), vec!["info@padelclub.com"]);
        assert_eq!(
            recipients(&emails, "Your match is complete"),
            vec![
                "player1@mail.com",
                "player2@mail.com",
                "player3@mail.com",
                "player4@mail.com"
            ]
        );
    }

    #[test]
    fn reopened_match_tells_the_rest_and_the_category() {
        let (padel_match, club) = fixtures(vec![1, 2, 3]);
        let remaining: Vec<User> = (1..=3).map(|id| player(id, 5)).collect();
        let candidates = vec![player(4, 5), player(5, 5), player(2, 5), player(6, 3), player(7, 5)];

        let emails = match_reopened_emails(&padel_match, &club, &remaining, &candidates, 4, BASE_URL);

        assert_eq!(
            recipients(&emails, "A player left your match"),
            vec!["player1@mail.com", "player2@mail.com", "player3@mail.com"]
        );
        assert_eq!(
            recipients(&emails, "A spot opened in a match of your level"),
            vec!["player5@mail.com", "player7@mail.com"]
        );
    }

    #[test]
    fn reopened_match_without_category_has_no_spot_emails() {
        let (mut padel_match, club) = fixtures(vec![1]);
        padel_match.category = None;

        let emails =
            match_reopened_emails(&padel_match, &club, &[player(1, 5)], &[player(8, 5)], 2, BASE_URL);

        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "player1@mail.com");
    }
}
