diesel::table! {
    board_pins (id) {
        id -> Integer,
        board_id -> Integer,
        pin_id -> Integer,
    }
}

diesel::table! {
    boards (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    forbidden_tags (id) {
        id -> Integer,
        tag -> Text,
    }
}

diesel::table! {
    pin_tags (id) {
        id -> Integer,
        pin_id -> Integer,
        name -> Text,
        slug -> Text,
    }
}

diesel::table! {
    pins (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Text,
        description -> Text,
        image -> Nullable<Text>,
        video -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    profiles (id) {
        id -> Integer,
        user_id -> Integer,
        display_name -> Text,
        bio -> Text,
        avatar -> Nullable<Text>,
    }
}

diesel::table! {
    search_history (id) {
        id -> Integer,
        user_id -> Integer,
        query -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
        email -> Text,
        password_hash -> Text,
        token -> Text,
        created_at -> Timestamp,
    }
}

diesel::joinable!(board_pins -> boards (board_id));
diesel::joinable!(board_pins -> pins (pin_id));
diesel::joinable!(boards -> users (user_id));
diesel::joinable!(pin_tags -> pins (pin_id));
diesel::joinable!(pins -> users (user_id));
diesel::joinable!(profiles -> users (user_id));
diesel::joinable!(search_history -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    board_pins,
    boards,
    forbidden_tags,
    pin_tags,
    pins,
    profiles,
    search_history,
    users,
);
