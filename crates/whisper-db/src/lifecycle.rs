//! Prayer request lifecycle.
//!
//! Every mutating operation is a single unit of work: lock, validate, mutate,
//! then compute the notification payload from the same snapshot before
//! commit. The returned [`FanOut`] is handed to the notifier only after the
//! transaction committed, so a failed operation never notifies anyone.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};
use uuid::Uuid;
use whisper_types::models::{NotificationKind, RequestStatus, ResponseKind};

use crate::error::is_unique_violation;
use crate::models::{PrayerRow, ResponseRow, UpdateRow, parse_col, timestamp};
use crate::queries::query_prayer;
use crate::{Database, Error, Result};

/// Notification texts carry at most this many characters of user input.
pub const SUMMARY_CHARS: usize = 120;

/// Side-effect payload produced by a committed lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub kind: NotificationKind,
    pub prayer_request_id: String,
    pub text: String,
    pub actor_id: String,
    /// May contain duplicates or the actor; the notifier filters them.
    pub candidates: Vec<String>,
}

struct LockedPrayer {
    requester_user_id: String,
    status: RequestStatus,
}

fn summary(text: &str) -> String {
    text.chars().take(SUMMARY_CHARS).collect()
}

/// Trimmed input, or `None` if nothing is left.
fn clean(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl Database {
    pub fn create_prayer(
        &self,
        requester_id: &str,
        title: Option<&str>,
        body: &str,
    ) -> Result<(PrayerRow, FanOut)> {
        let body = clean(body).ok_or(Error::Validation("prayer text is required"))?;
        let title = title.and_then(clean);

        self.unit_of_work(|tx| {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO prayer_requests (id, requester_user_id, title, body, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    requester_id,
                    title,
                    body,
                    RequestStatus::Open.as_str(),
                    timestamp(Utc::now()),
                ],
            )?;

            let mut stmt =
                tx.prepare("SELECT id FROM users WHERE volunteered_to_pray = 1 AND id <> ?1")?;
            let volunteers = stmt
                .query_map([requester_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let prayer = load(tx, &id, requester_id)?;
            info!(prayer_id = %id, requester_id, "Prayer request created");

            Ok((
                prayer,
                FanOut {
                    kind: NotificationKind::NewPrayerRequest,
                    prayer_request_id: id,
                    text: format!("{}: {}", title.unwrap_or("New prayer request"), summary(body)),
                    actor_id: requester_id.to_string(),
                    candidates: volunteers,
                },
            ))
        })
    }

    pub fn close_prayer(&self, actor_id: &str, prayer_id: &str) -> Result<(PrayerRow, FanOut)> {
        self.unit_of_work(|tx| {
            let locked = lock_prayer(tx, prayer_id)?;
            if locked.requester_user_id != actor_id {
                return Err(Error::Forbidden("only the requester can close this prayer request"));
            }
            if locked.status == RequestStatus::Closed {
                return Err(Error::AlreadyClosed);
            }

            tx.execute(
                "UPDATE prayer_requests SET status = ?2, closed_at = ?3 WHERE id = ?1",
                params![prayer_id, RequestStatus::Closed.as_str(), timestamp(Utc::now())],
            )?;

            let candidates = responders(tx, prayer_id)?;
            let prayer = load(tx, prayer_id, actor_id)?;
            info!(prayer_id, responders = candidates.len(), "Prayer request closed");

            Ok((
                prayer,
                FanOut {
                    kind: NotificationKind::PrayerClosed,
                    prayer_request_id: prayer_id.to_string(),
                    text: "A prayer request you supported has been closed.".to_string(),
                    actor_id: actor_id.to_string(),
                    candidates,
                },
            ))
        })
    }

    pub fn post_update(
        &self,
        actor_id: &str,
        prayer_id: &str,
        body: &str,
    ) -> Result<(UpdateRow, FanOut)> {
        let body = clean(body).ok_or(Error::Validation("update body is required"))?;

        self.unit_of_work(|tx| {
            let locked = lock_prayer(tx, prayer_id)?;
            if locked.requester_user_id != actor_id {
                return Err(Error::Forbidden("only the requester can post updates"));
            }
            if locked.status == RequestStatus::Closed {
                return Err(Error::ClosedRequest);
            }

            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now();
            tx.execute(
                "INSERT INTO prayer_updates (id, prayer_request_id, from_user_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, prayer_id, actor_id, body, timestamp(created_at)],
            )?;

            let candidates = responders(tx, prayer_id)?;
            let update = UpdateRow {
                id,
                prayer_request_id: prayer_id.to_string(),
                from_user_id: actor_id.to_string(),
                from_user_email: email_of(tx, actor_id)?,
                body: body.to_string(),
                created_at,
            };
            debug!(prayer_id, update_id = %update.id, "Prayer update posted");

            Ok((
                update,
                FanOut {
                    kind: NotificationKind::PrayerUpdate,
                    prayer_request_id: prayer_id.to_string(),
                    text: format!("Prayer request update: {}", summary(body)),
                    actor_id: actor_id.to_string(),
                    candidates,
                },
            ))
        })
    }

    /// Record that `actor_id` is praying. A non-blank message makes it a
    /// `MESSAGE` response, otherwise it is `QUICK`.
    pub fn respond(
        &self,
        actor_id: &str,
        prayer_id: &str,
        message: Option<&str>,
    ) -> Result<(ResponseRow, FanOut)> {
        let message = message.and_then(clean);
        let kind = if message.is_some() {
            ResponseKind::Message
        } else {
            ResponseKind::Quick
        };

        self.unit_of_work(|tx| {
            let locked = lock_prayer(tx, prayer_id)?;
            // Checked before status: the owner is refused the same way whether
            // or not the request is still open.
            if locked.requester_user_id == actor_id {
                return Err(Error::SelfResponse);
            }
            if locked.status == RequestStatus::Closed {
                return Err(Error::ClosedRequest);
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM prayer_responses WHERE prayer_request_id = ?1 AND from_user_id = ?2",
                    params![prayer_id, actor_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(Error::DuplicateResponse);
            }

            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now();
            tx.execute(
                "INSERT INTO prayer_responses (id, prayer_request_id, from_user_id, response_type, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, prayer_id, actor_id, kind.as_str(), message, timestamp(created_at)],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::DuplicateResponse
                } else {
                    e.into()
                }
            })?;

            let response = ResponseRow {
                id,
                prayer_request_id: prayer_id.to_string(),
                from_user_id: actor_id.to_string(),
                from_user_email: email_of(tx, actor_id)?,
                kind,
                message: message.map(str::to_string),
                created_at,
            };
            debug!(prayer_id, response_id = %response.id, kind = %kind, "Prayer response recorded");

            let text = match message {
                Some(m) => format!("Someone is praying for you: {}", summary(m)),
                None => "Someone clicked “I am praying for you.”".to_string(),
            };

            Ok((
                response,
                FanOut {
                    kind: NotificationKind::PrayerResponse,
                    prayer_request_id: prayer_id.to_string(),
                    text,
                    actor_id: actor_id.to_string(),
                    candidates: vec![locked.requester_user_id],
                },
            ))
        })
    }
}

/// Read the request's owner and status inside the caller's IMMEDIATE
/// transaction; the write lock is already held, so neither can change
/// before commit.
fn lock_prayer(conn: &Connection, prayer_id: &str) -> Result<LockedPrayer> {
    conn.query_row(
        "SELECT requester_user_id, status FROM prayer_requests WHERE id = ?1",
        [prayer_id],
        |row| {
            Ok(LockedPrayer {
                requester_user_id: row.get(0)?,
                status: parse_col(row, 1)?,
            })
        },
    )
    .optional()?
    .ok_or(Error::NotFound("prayer request"))
}

fn responders(conn: &Connection, prayer_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT from_user_id FROM prayer_responses WHERE prayer_request_id = ?1",
    )?;
    let ids = stmt
        .query_map([prayer_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn load(conn: &Connection, prayer_id: &str, viewer_id: &str) -> Result<PrayerRow> {
    query_prayer(conn, prayer_id, viewer_id)?.ok_or(Error::NotFound("prayer request"))
}

fn email_of(conn: &Connection, user_id: &str) -> Result<String> {
    conn.query_row("SELECT email FROM users WHERE id = ?1", [user_id], |row| row.get(0))
        .optional()?
        .ok_or(Error::NotFound("user"))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;
    use crate::testing;

    fn row_count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn create_rejects_blank_body() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let err = db.create_prayer(&owner.id, Some("title"), "   \n").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(row_count(&db, "prayer_requests"), 0);
    }

    #[test]
    fn create_targets_volunteers_other_than_requester() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", true);
        let volunteer = testing::user(&db, "volunteer@example.com", true);
        testing::user(&db, "bystander@example.com", false);

        let (prayer, fan_out) = db.create_prayer(&owner.id, Some("  "), " please pray ").unwrap();
        assert_eq!(prayer.status, RequestStatus::Open);
        assert!(prayer.closed_at.is_none());
        assert_eq!(prayer.title, None);
        assert_eq!(prayer.body, "please pray");
        assert_eq!(prayer.praying_count, 0);

        assert_eq!(fan_out.kind, NotificationKind::NewPrayerRequest);
        assert_eq!(fan_out.candidates, vec![volunteer.id]);
        assert_eq!(fan_out.text, "New prayer request: please pray");
    }

    #[test]
    fn notification_text_is_truncated() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let body = "é".repeat(SUMMARY_CHARS + 30);
        let (_, fan_out) = db.create_prayer(&owner.id, Some("Long"), &body).unwrap();
        assert_eq!(fan_out.text, format!("Long: {}", "é".repeat(SUMMARY_CHARS)));
    }

    #[test]
    fn close_is_owner_only_and_terminal() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let helper = testing::user(&db, "helper@example.com", true);
        let (prayer, _) = db.create_prayer(&owner.id, None, "please pray").unwrap();
        db.respond(&helper.id, &prayer.id, None).unwrap();

        assert!(matches!(db.close_prayer(&helper.id, &prayer.id), Err(Error::Forbidden(_))));
        assert!(matches!(db.close_prayer(&owner.id, "missing"), Err(Error::NotFound(_))));

        let (closed, fan_out) = db.close_prayer(&owner.id, &prayer.id).unwrap();
        assert_eq!(closed.status, RequestStatus::Closed);
        assert!(closed.closed_at.is_some());
        assert_eq!(fan_out.kind, NotificationKind::PrayerClosed);
        assert_eq!(fan_out.candidates, vec![helper.id.clone()]);

        assert!(matches!(db.close_prayer(&owner.id, &prayer.id), Err(Error::AlreadyClosed)));
        let after = db.get_prayer_detail(&prayer.id, &owner.id).unwrap().prayer;
        assert_eq!(after.closed_at, closed.closed_at);
    }

    #[test]
    fn closed_request_rejects_every_mutation() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let helper = testing::user(&db, "helper@example.com", true);
        let (prayer, _) = db.create_prayer(&owner.id, None, "please pray").unwrap();
        db.close_prayer(&owner.id, &prayer.id).unwrap();

        assert!(matches!(
            db.post_update(&owner.id, &prayer.id, "news"),
            Err(Error::ClosedRequest)
        ));
        assert!(matches!(db.respond(&helper.id, &prayer.id, None), Err(Error::ClosedRequest)));
        assert!(matches!(db.close_prayer(&owner.id, &prayer.id), Err(Error::AlreadyClosed)));

        assert_eq!(row_count(&db, "prayer_updates"), 0);
        assert_eq!(row_count(&db, "prayer_responses"), 0);
    }

    #[test]
    fn owner_cannot_respond_even_when_closed() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let (prayer, _) = db.create_prayer(&owner.id, None, "please pray").unwrap();

        assert!(matches!(db.respond(&owner.id, &prayer.id, None), Err(Error::SelfResponse)));
        db.close_prayer(&owner.id, &prayer.id).unwrap();
        assert!(matches!(db.respond(&owner.id, &prayer.id, None), Err(Error::SelfResponse)));
    }

    #[test]
    fn respond_classifies_and_deduplicates() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let quick = testing::user(&db, "quick@example.com", false);
        let wordy = testing::user(&db, "wordy@example.com", false);
        let (prayer, _) = db.create_prayer(&owner.id, None, "please pray").unwrap();

        let (response, fan_out) = db.respond(&quick.id, &prayer.id, Some("   ")).unwrap();
        assert_eq!(response.kind, ResponseKind::Quick);
        assert_eq!(response.message, None);
        assert_eq!(fan_out.candidates, vec![owner.id.clone()]);
        assert_eq!(fan_out.text, "Someone clicked “I am praying for you.”");

        let (response, fan_out) = db.respond(&wordy.id, &prayer.id, Some(" with you ")).unwrap();
        assert_eq!(response.kind, ResponseKind::Message);
        assert_eq!(response.message.as_deref(), Some("with you"));
        assert_eq!(fan_out.text, "Someone is praying for you: with you");

        assert!(matches!(
            db.respond(&quick.id, &prayer.id, Some("again")),
            Err(Error::DuplicateResponse)
        ));
        assert_eq!(row_count(&db, "prayer_responses"), 2);
    }

    #[test]
    fn update_requires_owner_and_targets_responders() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let helper = testing::user(&db, "helper@example.com", false);
        let (prayer, _) = db.create_prayer(&owner.id, None, "please pray").unwrap();

        assert!(matches!(db.post_update(&owner.id, &prayer.id, " "), Err(Error::Validation(_))));
        assert!(matches!(
            db.post_update(&helper.id, &prayer.id, "news"),
            Err(Error::Forbidden(_))
        ));

        let (_, fan_out) = db.post_update(&owner.id, &prayer.id, "news").unwrap();
        assert!(fan_out.candidates.is_empty());

        db.respond(&helper.id, &prayer.id, None).unwrap();
        let (update, fan_out) = db.post_update(&owner.id, &prayer.id, "more news").unwrap();
        assert_eq!(update.from_user_email, "owner@example.com");
        assert_eq!(fan_out.candidates, vec![helper.id]);
        assert_eq!(fan_out.text, "Prayer request update: more news");
    }

    #[test]
    fn concurrent_duplicate_responses_admit_exactly_one() {
        let db = Arc::new(testing::open());
        let owner = testing::user(&db, "owner@example.com", false);
        let helper = testing::user(&db, "helper@example.com", false);
        let (prayer, _) = db.create_prayer(&owner.id, None, "please pray").unwrap();

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let barrier = barrier.clone();
                let helper_id = helper.id.clone();
                let prayer_id = prayer.id.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    db.respond(&helper_id, &prayer_id, None).map(|_| ())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dupes = results
            .iter()
            .filter(|r| matches!(r, Err(Error::DuplicateResponse)))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(dupes, 7);
        assert_eq!(row_count(&db, "prayer_responses"), 1);
    }
}
