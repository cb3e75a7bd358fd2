use chrono::{DateTime, Utc};

use crate::clubs::Club;
use crate::matches::Match;
use crate::notifications::Email;

/// escapes text before it goes into the html body
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn when(starts_at: DateTime<Utc>) -> String {
    starts_at.format("%d/%m/%Y %H:%M UTC").to_string()
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<div style=\"font-family: sans-serif\"><h2>{}</h2>{}<p>padelhub</p></div>",
        title, body
    )
}

fn match_link(base_url: &str, padel_match: &Match) -> String {
    format!("{}/matches/{}", base_url, padel_match.id)
}

/// sent to every player when the 4th player joined
pub fn match_completed_player(
    to: &str,
    padel_match: &Match,
    club: &Club,
    base_url: &str,
) -> Email {
    Email {
        to: to.to_string(),
        subject: String::from("Your match is complete"),
        html: layout(
            "Your match is complete!",
            &format!(
                "<p>The match at {} on court {} starting {} has 4 players.</p>\
                 <p><a href=\"{}\">View the match</a></p>",
                escape(&club.name),
                escape(&padel_match.court),
                when(padel_match.starts_at),
                match_link(base_url, padel_match)
            ),
        ),
    }
}

/// sent to the hosting club when the 4th player joined
pub fn match_completed_club(padel_match: &Match, club: &Club, players: &[String]) -> Email {
    Email {
        to: club.email.clone(),
        subject: String::from("A match is complete"),
        html: layout(
            "A match is complete",
            &format!(
                "<p>The match on court {} starting {} is complete.</p><p>Players: {}</p>",
                escape(&padel_match.court),
                when(padel_match.starts_at),
                players
                    .iter()
                    .map(|player| escape(player))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ),
    }
}

/// sent to the players who are still in a match that lost a player
pub fn player_left(to: &str, padel_match: &Match, club: &Club, base_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: String::from("A player left your match"),
        html: layout(
            "A player left your match",
            &format!(
                "<p>A player left the match at {} starting {}. We're looking for a replacement.</p>\
                 <p><a href=\"{}\">View the match</a></p>",
                escape(&club.name),
                when(padel_match.starts_at),
                match_link(base_url, padel_match)
            ),
        ),
    }
}

/// sent to players of the same category when a full match reopened
pub fn spot_available(to: &str, padel_match: &Match, club: &Club, base_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: String::from("A spot opened in a match of your level"),
        html: layout(
            "A spot opened up",
            &format!(
                "<p>A match at {} starting {} needs one more player of your category.</p>\
                 <p><a href=\"{}\">Join the match</a></p>",
                escape(&club.name),
                when(padel_match.starts_at),
                match_link(base_url, padel_match)
            ),
        ),
    }
}

pub fn welcome(to: &str, name: &str, base_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: String::from("Welcome to padelhub"),
        html: layout(
            &format!("Welcome {}!", escape(name)),
            &format!(
                "<p>Your account is ready. <a href=\"{}/matches\">Find a match</a></p>",
                base_url
            ),
        ),
    }
}

pub fn password_reset(to: &str, token: &str, base_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: String::from("Reset your password"),
        html: layout(
            "Reset your password",
            &format!(
                "<p><a href=\"{}/reset-password?token={}\">Choose a new password</a></p>\
                 <p>This link is valid for one hour. Ignore this email if you didn't ask for it.</p>",
                base_url,
                escape(token)
            ),
        ),
    }
}

pub fn friend_request(to: &str, requester: &str, base_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("{} sent you a friend request", requester),
        html: layout(
            "New friend request",
            &format!(
                "<p>{} wants to be your friend.</p><p><a href=\"{}/friends\">Answer the request</a></p>",
                escape(requester),
                base_url
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixtures() -> (Match, Club) {
        let starts_at = Utc.ymd(2030, 2, 1).and_hms(18, 30, 0);
        let padel_match = Match {
            id: 7,
            club_id: 1,
            starts_at,
            ends_at: starts_at + chrono::Duration::minutes(90),
            court: String::from("center court"),
            capacity: 4,
            players: vec![1, 2, 3, 4],
            category: Some(4),
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

    #[test]
    fn completed_match_emails() {
        let (padel_match, club) = fixtures();

        let email =
            match_completed_player("p@club.com", &padel_match, &club, "https://padelhub.app");
        assert_eq!(email.to, "p@club.com");
        assert!(email.html.contains("https://padelhub.app/matches/7"));
        assert!(email.html.contains("01/02/2030 18:30 UTC"));

        let players = vec![String::from("Ann"), String::from("Bob")];
        let email = match_completed_club(&padel_match, &club, &players);
        assert_eq!(email.to, "info@padelclub.com");
        assert!(email.html.contains("Ann, Bob"));
    }

    #[test]
    fn spot_available_links_to_the_match() {
        let (padel_match, club) = fixtures();

        let email = spot_available("p@club.com", &padel_match, &club, "http://localhost:3000");

        assert!(email.html.contains("http://localhost:3000/matches/7"));
        assert!(email.html.contains("Padel Club"));
    }

    #[test]
    fn reset_links_carry_the_token() {
        let email = password_reset("p@club.com", "abc123", "https://padelhub.app");

        assert!(email
            .html
            .contains("https://padelhub.app/reset-password?token=abc123"));
    }

    #[test]
    fn user_values_are_escaped() {
        let (mut padel_match, mut club) = fixtures();
        let hostile = "<img src=x onerror=alert(1)>";
        club.name = String::from(hostile);
        padel_match.court = String::from("court \"1\" & 'b'");

        let emails = vec![
            match_completed_player("p@club.com", &padel_match, &club, "https://padelhub.app"),
            match_completed_club(&padel_match, &club, &[String::from(hostile)]),
            player_left("p@club.com", &padel_match, &club, "https://padelhub.app"),
            spot_available("p@club.com", &padel_match, &club, "https://padelhub.app"),
            welcome("p@club.com", hostile, "https://padelhub.app"),
            friend_request("p@club.com", hostile, "https://padelhub.app"),
        ];

        for email in emails {
            assert!(!email.html.contains("<img"), "{}", email.html);
            assert!(email.html.contains("&lt;img src=x onerror=alert(1)&gt;"), "{}", email.html);
        }

        let email = match_completed_player("p@club.com", &padel_match, &club, "https://padelhub.app");
        assert!(email.html.contains("court &quot;1&quot; &amp; &#x27;b&#x27;"));
    }
}
