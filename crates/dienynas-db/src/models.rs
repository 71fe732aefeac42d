/// Row types mapping directly to SQLite rows. Kept separate from the
/// dienynas-types API models so the storage layer stays independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
    pub created_at: String,
}

pub struct EntryRow {
    pub id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: String,
}
