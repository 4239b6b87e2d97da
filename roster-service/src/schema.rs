diesel::table! {
    events (id) {
        id -> Int4,
        user_id -> Int4,
        event -> Text,
        scanned_at -> Timestamptz,
    }
}

diesel::table! {
    hardware (id) {
        id -> Int4,
        name -> Text,
        total_quantity -> Int4,
        available_quantity -> Int4,
    }
}

diesel::table! {
    hardware_owners (hardware_id, user_id) {
        hardware_id -> Int4,
        user_id -> Int4,
        owned_quantity -> Int4,
    }
}

diesel::table! {
    skills (id) {
        id -> Int4,
        user_id -> Int4,
        skill -> Text,
        rating -> Int4,
    }
}

diesel::table! {
    users (id) {
        id -> Int4,
        name -> Text,
        company -> Nullable<Text>,
        email -> Text,
        phone -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(events -> users (user_id));
diesel::joinable!(hardware_owners -> hardware (hardware_id));
diesel::joinable!(hardware_owners -> users (user_id));
diesel::joinable!(skills -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    events,
    hardware,
    hardware_owners,
    skills,
    users,
);
