use crate::Database;
use crate::error::StoreError;
use crate::models::{EntryRow, UserRow};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};

/// Stored timestamp format: fixed-width RFC 3339 UTC, so lexicographic
/// comparison in SQL equals chronological comparison.
fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        avatar: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, name, email, password, avatar) VALUES (?1, ?2, ?3, ?4, ?5)",
            (id, name, email, password_hash, avatar),
        )
        .map_err(StoreError::from_sqlite)?;
        Ok(())
    }

    /// Owner is immutable; only name, email and the avatar filename change.
    pub fn update_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        avatar: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE users SET name = ?2, email = ?3, avatar = ?4 WHERE id = ?1",
            (id, name, email, avatar),
        )
        .map_err(StoreError::from_sqlite)?;
        Ok(())
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn user_by_name(&self, name: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "name", name))
    }

    pub fn user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn all_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, password, avatar, created_at
                 FROM users ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Sessions --

    pub fn create_session(
        &self,
        token: &str,
        user_id: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                (token, user_id, ts(created_at), ts(expires_at)),
            )?;
            Ok(())
        })
    }

    /// Resolve a session token to its user, provided the session has not
    /// expired at `now`.
    pub fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT u.id, u.name, u.email, u.password, u.avatar, u.created_at
                     FROM users u
                     JOIN sessions s ON u.id = s.user_id
                     WHERE s.token = ?1 AND s.expires_at > ?2",
                )?
                .query_row((token, ts(now)), user_from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(())
        })
    }

    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let purged = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [ts(now)])?;
            Ok(purged)
        })
    }

    // -- Entries --

    pub fn insert_entry(
        &self,
        id: &str,
        user_id: &str,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO entries (id, user_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, body, ts(created_at)),
            )?;
            Ok(())
        })
    }

    /// One page of the owner's entries, newest first. An offset past the end
    /// simply yields an empty page.
    pub fn entries_page(&self, user_id: &str, limit: u32, offset: u64) -> Result<Vec<EntryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, body, created_at FROM entries
                 WHERE user_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit, offset], entry_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_entries(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn all_entries(&self) -> Result<Vec<EntryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, body, created_at FROM entries ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], entry_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is one of our own identifiers, never caller input.
    let sql = format!(
        "SELECT id, name, email, password, avatar, created_at FROM users WHERE {column} = ?1"
    );
    let row = conn
        .prepare(&sql)?
        .query_row([value], user_from_row)
        .optional()?;
    Ok(row)
}

fn user_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        avatar: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<EntryRow, rusqlite::Error> {
    Ok(EntryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        body: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn add_user(db: &Database, id: &str, name: &str, email: &str) {
        db.create_user(id, name, email, "$argon2id$not-a-real-hash", "default.jpg")
            .unwrap();
    }

    #[test]
    fn created_user_is_retrievable_by_email() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");

        let user = db.user_by_email("jonas@example.com").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "jonas");
        assert_eq!(user.avatar, "default.jpg");
        // The store holds a hash, never the password itself.
        assert!(user.password.starts_with("$argon2id$"));
    }

    #[test]
    fn duplicate_email_is_reported_against_the_email_field() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");

        let err = db
            .create_user("u2", "petras", "jonas@example.com", "hash", "default.jpg")
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        // The rejected row must not exist under its new name either.
        assert!(db.user_by_name("petras").unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_reported_against_the_name_field() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");

        let err = db
            .create_user("u2", "jonas", "kitas@example.com", "hash", "default.jpg")
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName));
    }

    #[test]
    fn update_user_maps_duplicates_per_field() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");
        add_user(&db, "u2", "petras", "petras@example.com");

        let err = db
            .update_user("u2", "jonas", "petras@example.com", "default.jpg")
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName));

        db.update_user("u2", "petras", "petras@example.com", "abc123.png")
            .unwrap();
        assert_eq!(db.user_by_id("u2").unwrap().unwrap().avatar, "abc123.png");
    }

    #[test]
    fn session_resolves_until_expiry() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");

        let now = Utc::now();
        db.create_session("tok", "u1", now, now + Duration::days(1))
            .unwrap();

        let user = db.session_user("tok", now).unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(db.session_user("tok", now + Duration::days(2)).unwrap().is_none());
        assert!(db.session_user("unknown", now).unwrap().is_none());
    }

    #[test]
    fn deleted_session_no_longer_resolves() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");

        let now = Utc::now();
        db.create_session("tok", "u1", now, now + Duration::days(30))
            .unwrap();
        db.delete_session("tok").unwrap();

        assert!(db.session_user("tok", now).unwrap().is_none());
    }

    #[test]
    fn purge_removes_only_expired_sessions() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");

        let now = Utc::now();
        db.create_session("old", "u1", now - Duration::days(2), now - Duration::days(1))
            .unwrap();
        db.create_session("live", "u1", now, now + Duration::days(1))
            .unwrap();

        assert_eq!(db.purge_expired_sessions(now).unwrap(), 1);
        assert!(db.session_user("live", now).unwrap().is_some());
    }

    #[test]
    fn entries_list_newest_first_with_fixed_pages() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");

        let base = Utc::now();
        for i in 0..4 {
            db.insert_entry(
                &format!("e{i}"),
                "u1",
                &format!("entry {i}"),
                base + Duration::seconds(i),
            )
            .unwrap();
        }

        let first = db.entries_page("u1", 3, 0).unwrap();
        let ids: Vec<_> = first.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["e3", "e2", "e1"]);

        let second = db.entries_page("u1", 3, 3).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "e0");

        // Out-of-range pages are empty, not an error.
        assert!(db.entries_page("u1", 3, 6).unwrap().is_empty());
        assert_eq!(db.count_entries("u1").unwrap(), 4);
    }

    #[test]
    fn entries_are_scoped_to_their_owner() {
        let (_dir, db) = open_db();
        add_user(&db, "u1", "jonas", "jonas@example.com");
        add_user(&db, "u2", "petras", "petras@example.com");

        db.insert_entry("e1", "u1", "mine", Utc::now()).unwrap();

        assert_eq!(db.entries_page("u1", 3, 0).unwrap().len(), 1);
        assert!(db.entries_page("u2", 3, 0).unwrap().is_empty());
        assert_eq!(db.count_entries("u2").unwrap(), 0);
    }
}
