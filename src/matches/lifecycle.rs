use chrono::{DateTime, Utc};

use crate::cancellations;
use crate::errors::ServiceError;
use crate::matches::Match;
use crate::users::User;

/// a padel match is played by two pairs
pub const MATCH_CAPACITY: i16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// the player joined, there are still free spots
    Joined,
    /// the player took the last spot
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// the match was full before the player left
    pub reopened: bool,
    /// the leave was too close to the start of a full match
    pub late_cancellation: bool,
}

impl Match {
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity as usize
    }

    pub fn has_player(&self, user_id: i64) -> bool {
        self.players.contains(&user_id)
    }

    /// Applies the join rules and adds the player to the roster.
    ///
    /// `first_player` is the profile of the first player on the roster,
    /// the gender of every other player has to match theirs.
    pub fn add_player(
        &mut self,
        player: &User,
        first_player: Option<&User>,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, ServiceError> {
        if !player.can_play() {
            bad_request!("set your level and gender before joining a match");
        }

        if self.starts_at <= now {
            bad_request!("this match has already started");
        }

        if self.has_player(player.id) {
            conflict!("you already joined this match");
        }

        if self.is_full() {
            bad_request!("this match is full");
        }

        if self.players.is_empty() {
            self.category = player.level;
        } else {
            if self.category != player.level {
                forbidden!("this match is for players of another category");
            }

            if let Some(first_player) = first_player {
                if first_player.gender() != player.gender() {
                    forbidden!("this match is for players of another gender");
                }
            }
        }

        self.players.push(player.id);

        if self.is_full() {
            Ok(JoinOutcome::Completed)
        } else {
            Ok(JoinOutcome::Joined)
        }
    }

    /// Removes the player from the roster, the category is cleared
    /// once the last player left.
    pub fn remove_player(
        &mut self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<LeaveOutcome, ServiceError> {
        if !self.has_player(user_id) {
            bad_request!("you are not in this match");
        }

        let was_full = self.is_full();

        self.players.retain(|player| *player != user_id);

        if self.players.is_empty() {
            self.category = None;
        }

        Ok(LeaveOutcome {
            reopened: was_full,
            late_cancellation: cancellations::is_late_cancellation(self.starts_at, now, was_full),
        })
    }
}
