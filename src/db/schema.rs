diesel::table! {
    videos (file_id) {
        file_id -> Text,
        platform_id -> Text,
        platform -> Text,
        media_type -> Text,
    }
}
