table! {
    articles (id) {
        id -> Int8,
        club_id -> Int8,
        code -> Varchar,
        name -> Varchar,
        category -> Nullable<Varchar>,
        quantity -> Int4,
        price -> Int8,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    cancellations (user_id, club_id) {
        user_id -> Int8,
        club_id -> Int8,
        total -> Int4,
        last_cancelled_at -> Timestamptz,
    }
}

table! {
    clubs (id) {
        id -> Int8,
        email -> Varchar,
        name -> Varchar,
        password -> Varchar,
        address -> Nullable<Varchar>,
        phone -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    events (id) {
        id -> Int8,
        club_id -> Int8,
        name -> Varchar,
        kind -> Varchar,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        pairs -> Array<Text>,
        max_pairs -> Int2,
        registered_users -> Array<Int8>,
        price -> Int8,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    friendships (requester_id, addressee_id) {
        requester_id -> Int8,
        addressee_id -> Int8,
        state -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    matches (id) {
        id -> Int8,
        club_id -> Int8,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        court -> Varchar,
        capacity -> Int2,
        players -> Array<Int8>,
        category -> Nullable<Int2>,
        price -> Int8,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    movements (id) {
        id -> Int8,
        club_id -> Int8,
        kind -> Varchar,
        amount -> Int8,
        description -> Varchar,
        occurred_on -> Date,
        created_at -> Timestamptz,
    }
}

table! {
    password_resets (token) {
        token -> Varchar,
        user_id -> Int8,
        expires_at -> Timestamptz,
    }
}

table! {
    users (id) {
        id -> Int8,
        email -> Varchar,
        name -> Varchar,
        password -> Varchar,
        phone -> Nullable<Varchar>,
        gender -> Nullable<Varchar>,
        level -> Nullable<Int2>,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

joinable!(articles -> clubs (club_id));
joinable!(cancellations -> clubs (club_id));
joinable!(cancellations -> users (user_id));
joinable!(events -> clubs (club_id));
joinable!(matches -> clubs (club_id));
joinable!(movements -> clubs (club_id));
joinable!(password_resets -> users (user_id));

allow_tables_to_appear_in_same_query!(
    articles,
    cancellations,
    clubs,
    events,
    friendships,
    matches,
    movements,
    password_resets,
    users,
);
