/// Everything a store operation can fail with.
///
/// All variants except `Internal` describe an invalid request and are
/// reported to the caller as-is; none of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("prayer request is closed")]
    ClosedRequest,

    #[error("prayer request is already closed")]
    AlreadyClosed,

    #[error("you cannot respond to your own prayer request")]
    SelfResponse,

    #[error("you are already praying for this request")]
    DuplicateResponse,

    #[error("email already in use")]
    EmailTaken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// True if `e` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
