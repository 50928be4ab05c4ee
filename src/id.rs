use uuid::Uuid;

/// Time-ordered ids so freshly inserted rows sort by creation.
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}
