//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the whisper-types API models so the store stays independent
//! of the wire format.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use whisper_types::models::{NotificationKind, RequestStatus, ResponseKind};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub volunteered_to_pray: bool,
    pub created_at: DateTime<Utc>,
}

/// A prayer request joined with its requester and responder count, as seen
/// by one viewer.
#[derive(Debug, Clone)]
pub struct PrayerRow {
    pub id: String,
    pub requester_user_id: String,
    pub requester_email: String,
    pub title: Option<String>,
    pub body: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub praying_count: u32,
    pub already_praying: bool,
}

#[derive(Debug, Clone)]
pub struct ResponseRow {
    pub id: String,
    pub prayer_request_id: String,
    pub from_user_id: String,
    pub from_user_email: String,
    pub kind: ResponseKind,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpdateRow {
    pub id: String,
    pub prayer_request_id: String,
    pub from_user_id: String,
    pub from_user_email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub to_user_id: String,
    pub kind: NotificationKind,
    pub prayer_request_id: String,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Request plus its responses and updates, both oldest first.
#[derive(Debug, Clone)]
pub struct PrayerDetailRow {
    pub prayer: PrayerRow,
    pub responses: Vec<ResponseRow>,
    pub updates: Vec<UpdateRow>,
}

/// Fixed-width UTC timestamp; lexical order matches chronological order.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => time_col(row, idx).map(Some),
        None => Ok(None),
    }
}

impl UserRow {
    pub(crate) const COLUMNS: &'static str =
        "id, email, password_hash, volunteered_to_pray, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            volunteered_to_pray: row.get(3)?,
            created_at: time_col(row, 4)?,
        })
    }
}

impl PrayerRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            requester_user_id: row.get(1)?,
            requester_email: row.get(2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            status: parse_col(row, 5)?,
            created_at: time_col(row, 6)?,
            closed_at: opt_time_col(row, 7)?,
            praying_count: row.get(8)?,
            already_praying: row.get(9)?,
        })
    }
}

impl ResponseRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            prayer_request_id: row.get(1)?,
            from_user_id: row.get(2)?,
            from_user_email: row.get(3)?,
            kind: parse_col(row, 4)?,
            message: row.get(5)?,
            created_at: time_col(row, 6)?,
        })
    }
}

impl UpdateRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            prayer_request_id: row.get(1)?,
            from_user_id: row.get(2)?,
            from_user_email: row.get(3)?,
            body: row.get(4)?,
            created_at: time_col(row, 5)?,
        })
    }
}

impl NotificationRow {
    pub(crate) const COLUMNS: &'static str =
        "id, to_user_id, type, prayer_request_id, text, is_read, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            to_user_id: row.get(1)?,
            kind: parse_col(row, 2)?,
            prayer_request_id: row.get(3)?,
            text: row.get(4)?,
            is_read: row.get(5)?,
            created_at: time_col(row, 6)?,
        })
    }
}
