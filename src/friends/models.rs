use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::schema::{friendships, users};
use crate::users::{User, UserResponse};

/// The state shows whether the addressee accepted, declined or
/// not yet responded to a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Pending,
    Accepted,
    Declined,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            State::Pending => write!(f, "PENDING"),
            State::Accepted => write!(f, "ACCEPTED"),
            State::Declined => write!(f, "DECLINED"),
        }
    }
}

/// A friend request from one player to another.
///
/// A friendship is stored once, in the direction it was requested.
#[derive(Debug, Serialize, Queryable, Identifiable)]
#[primary_key(requester_id, addressee_id)]
pub struct Friendship {
    pub requester_id: i64,
    pub addressee_id: i64,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[table_name = "friendships"]
struct NewFriendship {
    requester_id: i64,
    addressee_id: i64,
    state: String,
}

/// **POST /api/friends/requests**
///
/// Example:
///
/// ``` shell
/// curl --location --request POST 'http://localhost:8080/api/friends/requests' \
/// --header 'Content-Type: application/json' \
/// --data-raw '{ "user_id": 2 }'
/// ```
#[derive(Debug, Deserialize)]
pub struct FriendRequest {
    pub user_id: i64,
}

/// **PATCH /api/friends/requests/{requester_id}**
#[derive(Debug, Deserialize)]
pub struct RequestAnswer {
    pub state: State,
}

/// A pending request as the addressee sees it
#[derive(Debug, Serialize, Queryable)]
pub struct PendingRequest {
    pub requester_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    /// Creates a pending request, returns the new friendship and the addressee
    pub fn request(
        requester_id: i64,
        addressee_id: i64,
        conn: &db::Conn,
    ) -> Result<(Friendship, User), ServiceError> {
        if requester_id == addressee_id {
            bad_request!("you can't befriend yourself");
        }

        let addressee = User::find(addressee_id, conn)?;

        if Friendship::find_between(requester_id, addressee_id, conn)?.is_some() {
            conflict!("a friendship with this player already exists");
        }

        let friendship = diesel::insert_into(friendships::table)
            .values(&NewFriendship {
                requester_id,
                addressee_id,
                state: State::Pending.to_string(),
            })
            .get_result::<Friendship>(conn)?;

        Ok((friendship, addressee))
    }

    /// the friendship between two players, in either direction
    pub fn find_between(
        user_id: i64,
        other_id: i64,
        conn: &db::Conn,
    ) -> Result<Option<Friendship>, ServiceError> {
        let friendship = friendships::table
            .filter(
                friendships::requester_id
                    .eq(user_id)
                    .and(friendships::addressee_id.eq(other_id))
                    .or(friendships::requester_id
                        .eq(other_id)
                        .and(friendships::addressee_id.eq(user_id))),
            )
            .first::<Friendship>(conn)
            .optional()?;

        Ok(friendship)
    }

    /// the pending requests addressed to this player
    pub fn find_pending(
        addressee_id: i64,
        conn: &db::Conn,
    ) -> Result<Vec<PendingRequest>, ServiceError> {
        let requests = friendships::table
            .inner_join(users::table.on(users::id.eq(friendships::requester_id)))
            .filter(friendships::addressee_id.eq(addressee_id))
            .filter(friendships::state.eq(State::Pending.to_string()))
            .select((friendships::requester_id, users::name, friendships::created_at))
            .order(friendships::created_at.desc())
            .load::<PendingRequest>(conn)?;

        Ok(requests)
    }

    /// the accepted friends of this player, in either direction
    pub fn find_friends(user_id: i64, conn: &db::Conn) -> Result<Vec<UserResponse>, ServiceError> {
        let friendships = friendships::table
            .filter(
                friendships::requester_id
                    .eq(user_id)
                    .or(friendships::addressee_id.eq(user_id)),
            )
            .filter(friendships::state.eq(State::Accepted.to_string()))
            .load::<Friendship>(conn)?;

        let friend_ids: Vec<i64> = friendships
            .iter()
            .map(|friendship| friendship.other(user_id))
            .collect();

        let friends = users::table
            .filter(users::id.eq_any(friend_ids))
            .select((users::id, users::name, users::gender, users::level))
            .order(users::name)
            .load::<UserResponse>(conn)?;

        Ok(friends)
    }

    /// accept or decline a pending request
    pub fn answer(
        requester_id: i64,
        addressee_id: i64,
        state: State,
        conn: &db::Conn,
    ) -> Result<Friendship, ServiceError> {
        if state == State::Pending {
            bad_request!("a friend request can only be accepted or declined");
        }

        let friendship = friendships::table
            .find((requester_id, addressee_id))
            .first::<Friendship>(conn)?;

        if friendship.state != State::Pending.to_string() {
            conflict!("this friend request has already been answered");
        }

        let friendship = diesel::update(&friendship)
            .set((
                friendships::state.eq(state.to_string()),
                friendships::updated_at.eq(Utc::now()),
            ))
            .get_result::<Friendship>(conn)?;

        Ok(friendship)
    }

    /// removes the friendship in either direction
    pub fn remove(user_id: i64, other_id: i64, conn: &db::Conn) -> Result<(), ServiceError> {
        let deleted = diesel::delete(
            friendships::table.filter(
                friendships::requester_id
                    .eq(user_id)
                    .and(friendships::addressee_id.eq(other_id))
                    .or(friendships::requester_id
                        .eq(other_id)
                        .and(friendships::addressee_id.eq(user_id))),
            ),
        )
        .execute(conn)?;

        if deleted == 0 {
            return Err(ServiceError::NotFound);
        }

        Ok(())
    }

    /// the id of the other player in this friendship
    pub fn other(&self, user_id: i64) -> i64 {
        if self.requester_id == user_id {
            self.addressee_id
        } else {
            self.requester_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friendship(state: State) -> Friendship {
        Friendship {
            requester_id: 1,
            addressee_id: 2,
            state: state.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn states_are_stored_uppercase() {
        assert_eq!(State::Accepted.to_string(), "ACCEPTED");

        let answer: RequestAnswer = serde_json::from_str(r#"{"state":"DECLINED"}"#).unwrap();
        assert_eq!(answer.state, State::Declined);
    }

    #[test]
    fn other_side_of_a_friendship() {
        let friendship = friendship(State::Accepted);

        assert_eq!(friendship.other(1), 2);
        assert_eq!(friendship.other(2), 1);
    }
}
