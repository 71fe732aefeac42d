use thiserror::Error;

/// Failures the storage layer can report per field. Anything that is not a
/// uniqueness violation on users.name/users.email stays opaque.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("name already taken")]
    DuplicateName,

    #[error("email already taken")]
    DuplicateEmail,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Concurrent duplicate writes are serialized by the UNIQUE constraints;
    /// the violated column decides which field gets reported.
    pub(crate) fn from_sqlite(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, Some(msg)) = &err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                if msg.contains("users.name") {
                    return StoreError::DuplicateName;
                }
                if msg.contains("users.email") {
                    return StoreError::DuplicateEmail;
                }
            }
        }
        StoreError::Other(err.into())
    }
}
