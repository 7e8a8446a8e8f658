use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;
use whisper_types::models::{NotificationKind, RequestStatus};

use crate::error::is_unique_violation;
use crate::models::{
    NotificationRow, PrayerDetailRow, PrayerRow, ResponseRow, UpdateRow, UserRow, timestamp,
};
use crate::{Database, Error, Result};

/// Prayer columns in `PrayerRow` order. Callers always bind `:viewer`.
const PRAYER_SELECT: &str = "
    SELECT pr.id, pr.requester_user_id, u.email, pr.title, pr.body, pr.status,
           pr.created_at, pr.closed_at,
           (SELECT COUNT(DISTINCT r.from_user_id) FROM prayer_responses r
             WHERE r.prayer_request_id = pr.id),
           EXISTS(SELECT 1 FROM prayer_responses r
             WHERE r.prayer_request_id = pr.id AND r.from_user_id = :viewer)
    FROM prayer_requests pr
    JOIN users u ON u.id = pr.requester_user_id";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Database {
    // -- Users --

    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<UserRow> {
        let email = normalize_email(email);
        self.unit_of_work(|tx| {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, email, password_hash, timestamp(Utc::now())],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::EmailTaken
                } else {
                    e.into()
                }
            })?;
            query_user_by_id(tx, &id)?.ok_or(Error::NotFound("user"))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        let email = normalize_email(email);
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE email = ?1", UserRow::COLUMNS);
            Ok(conn
                .query_row(&sql, [&email], UserRow::from_row)
                .optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn set_volunteered_to_pray(&self, user_id: &str, volunteered: bool) -> Result<UserRow> {
        self.unit_of_work(|tx| {
            let changed = tx.execute(
                "UPDATE users SET volunteered_to_pray = ?2 WHERE id = ?1",
                params![user_id, volunteered],
            )?;
            if changed == 0 {
                return Err(Error::NotFound("user"));
            }
            query_user_by_id(tx, user_id)?.ok_or(Error::NotFound("user"))
        })
    }

    // -- Projections --

    /// Feed: open requests before closed ones, newest first within each group.
    pub fn list_prayers(&self, viewer_id: &str, include_closed: bool) -> Result<Vec<PrayerRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{PRAYER_SELECT}
                 WHERE :include_closed OR pr.status = :open
                 ORDER BY CASE WHEN pr.status = :open THEN 0 ELSE 1 END,
                          pr.created_at DESC, pr.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::named_params! {
                        ":viewer": viewer_id,
                        ":include_closed": include_closed,
                        ":open": RequestStatus::Open.as_str(),
                    },
                    PrayerRow::from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_prayer_detail(&self, prayer_id: &str, viewer_id: &str) -> Result<PrayerDetailRow> {
        self.with_conn(|conn| {
            let prayer =
                query_prayer(conn, prayer_id, viewer_id)?.ok_or(Error::NotFound("prayer request"))?;
            let responses = query_responses(conn, prayer_id)?;
            let updates = query_updates(conn, prayer_id)?;
            Ok(PrayerDetailRow {
                prayer,
                responses,
                updates,
            })
        })
    }

    // -- Notifications --

    /// Persist one notification per recipient in a single transaction.
    /// Recipients are expected to be deduplicated already.
    pub fn insert_notifications(
        &self,
        recipients: &[String],
        kind: NotificationKind,
        prayer_request_id: &str,
        text: &str,
    ) -> Result<Vec<NotificationRow>> {
        if recipients.is_empty() {
            return Ok(vec![]);
        }

        self.unit_of_work(|tx| {
            let created_at = Utc::now();
            let mut stmt = tx.prepare(
                "INSERT INTO notifications (id, to_user_id, type, prayer_request_id, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            let mut rows = Vec::with_capacity(recipients.len());
            for to_user_id in recipients {
                let id = Uuid::new_v4().to_string();
                stmt.execute(params![
                    id,
                    to_user_id,
                    kind.as_str(),
                    prayer_request_id,
                    text,
                    timestamp(created_at),
                ])?;
                rows.push(NotificationRow {
                    id,
                    to_user_id: to_user_id.clone(),
                    kind,
                    prayer_request_id: prayer_request_id.to_string(),
                    text: text.to_string(),
                    is_read: false,
                    created_at,
                });
            }
            Ok(rows)
        })
    }

    /// Newest first.
    pub fn list_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM notifications WHERE to_user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
                NotificationRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], NotificationRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks a notification read. Notifications owned by someone else are
    /// reported as missing.
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<NotificationRow> {
        self.unit_of_work(|tx| {
            let changed = tx.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND to_user_id = ?2",
                params![id, user_id],
            )?;
            if changed == 0 {
                return Err(Error::NotFound("notification"));
            }
            let sql = format!("SELECT {} FROM notifications WHERE id = ?1", NotificationRow::COLUMNS);
            Ok(tx.query_row(&sql, [id], NotificationRow::from_row)?)
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", UserRow::COLUMNS);
    Ok(conn.query_row(&sql, [id], UserRow::from_row).optional()?)
}

pub(crate) fn query_prayer(
    conn: &Connection,
    prayer_id: &str,
    viewer_id: &str,
) -> Result<Option<PrayerRow>> {
    let sql = format!("{PRAYER_SELECT} WHERE pr.id = :id");
    Ok(conn
        .query_row(
            &sql,
            rusqlite::named_params! { ":id": prayer_id, ":viewer": viewer_id },
            PrayerRow::from_row,
        )
        .optional()?)
}

fn query_responses(conn: &Connection, prayer_id: &str) -> Result<Vec<ResponseRow>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.prayer_request_id, r.from_user_id, u.email, r.response_type,
                r.message, r.created_at
         FROM prayer_responses r
         JOIN users u ON u.id = r.from_user_id
         WHERE r.prayer_request_id = ?1
         ORDER BY r.created_at ASC, r.rowid ASC",
    )?;
    let rows = stmt
        .query_map([prayer_id], ResponseRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_updates(conn: &Connection, prayer_id: &str) -> Result<Vec<UpdateRow>> {
    let mut stmt = conn.prepare(
        "SELECT pu.id, pu.prayer_request_id, pu.from_user_id, u.email, pu.body, pu.created_at
         FROM prayer_updates pu
         JOIN users u ON u.id = pu.from_user_id
         WHERE pu.prayer_request_id = ?1
         ORDER BY pu.created_at ASC, pu.rowid ASC",
    )?;
    let rows = stmt
        .query_map([prayer_id], UpdateRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::testing;

    #[test]
    fn emails_are_case_insensitive() {
        let db = testing::open();
        let user = db.create_user("  Mary@Example.COM ", "hash").unwrap();
        assert_eq!(user.email, "mary@example.com");
        assert!(!user.volunteered_to_pray);

        let found = db.get_user_by_email("MARY@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);

        let err = db.create_user("mary@example.com", "hash").unwrap_err();
        assert!(matches!(err, crate::Error::EmailTaken));
    }

    #[test]
    fn volunteer_flag_toggles() {
        let db = testing::open();
        let user = testing::user(&db, "john@example.com", false);
        let updated = db.set_volunteered_to_pray(&user.id, true).unwrap();
        assert!(updated.volunteered_to_pray);
        let updated = db.set_volunteered_to_pray(&user.id, false).unwrap();
        assert!(!updated.volunteered_to_pray);

        assert!(matches!(
            db.set_volunteered_to_pray("missing", true),
            Err(crate::Error::NotFound("user"))
        ));
    }

    #[test]
    fn feed_orders_open_first_then_newest() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);

        let (a, _) = db.create_prayer(&owner.id, None, "A").unwrap();
        let (b, _) = db.create_prayer(&owner.id, None, "B").unwrap();
        let (c, _) = db.create_prayer(&owner.id, None, "C").unwrap();
        db.close_prayer(&owner.id, &b.id).unwrap();

        let ids: Vec<String> = db
            .list_prayers(&owner.id, true)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![c.id.clone(), a.id.clone(), b.id.clone()]);

        let open_only: Vec<String> = db
            .list_prayers(&owner.id, false)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(open_only, vec![c.id, a.id]);
    }

    #[test]
    fn detail_lists_responses_and_updates_oldest_first() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let first = testing::user(&db, "first@example.com", true);
        let second = testing::user(&db, "second@example.com", true);

        let (prayer, _) = db.create_prayer(&owner.id, Some("Health"), "please pray").unwrap();
        db.respond(&first.id, &prayer.id, None).unwrap();
        db.post_update(&owner.id, &prayer.id, "feeling better").unwrap();
        db.respond(&second.id, &prayer.id, Some("with you")).unwrap();
        db.post_update(&owner.id, &prayer.id, "home now").unwrap();

        let detail = db.get_prayer_detail(&prayer.id, &second.id).unwrap();
        assert_eq!(detail.prayer.praying_count, 2);
        assert!(detail.prayer.already_praying);
        assert_eq!(detail.prayer.requester_email, "owner@example.com");

        let responders: Vec<&str> =
            detail.responses.iter().map(|r| r.from_user_email.as_str()).collect();
        assert_eq!(responders, vec!["first@example.com", "second@example.com"]);

        let bodies: Vec<&str> = detail.updates.iter().map(|u| u.body.as_str()).collect();
        assert_eq!(bodies, vec!["feeling better", "home now"]);

        let owner_view = db.get_prayer_detail(&prayer.id, &owner.id).unwrap();
        assert!(!owner_view.prayer.already_praying);
    }

    #[test]
    fn detail_of_missing_prayer_is_not_found() {
        let db = testing::open();
        let viewer = testing::user(&db, "viewer@example.com", false);
        assert!(matches!(
            db.get_prayer_detail("nope", &viewer.id),
            Err(crate::Error::NotFound("prayer request"))
        ));
    }

    #[test]
    fn notifications_are_private_and_mark_read_once() {
        let db = testing::open();
        let owner = testing::user(&db, "owner@example.com", false);
        let other = testing::user(&db, "other@example.com", false);

        let rows = db
            .insert_notifications(
                &[owner.id.clone()],
                whisper_types::models::NotificationKind::PrayerResponse,
                "some-prayer",
                "Someone is praying for you",
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        let id = rows[0].id.clone();

        assert!(matches!(
            db.mark_notification_read(&id, &other.id),
            Err(crate::Error::NotFound("notification"))
        ));

        let read = db.mark_notification_read(&id, &owner.id).unwrap();
        assert!(read.is_read);
        assert!(db.list_notifications(&other.id).unwrap().is_empty());
        assert!(db.list_notifications(&owner.id).unwrap()[0].is_read);
    }
}
