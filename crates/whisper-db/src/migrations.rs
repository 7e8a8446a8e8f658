use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash       TEXT NOT NULL,
                volunteered_to_pray INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_users_volunteers
                ON users(volunteered_to_pray);

            CREATE TABLE prayer_requests (
                id                  TEXT PRIMARY KEY,
                requester_user_id   TEXT NOT NULL REFERENCES users(id),
                title               TEXT,
                body                TEXT NOT NULL CHECK (length(trim(body)) > 0),
                status              TEXT NOT NULL DEFAULT 'OPEN' CHECK (status IN ('OPEN', 'CLOSED')),
                created_at          TEXT NOT NULL,
                closed_at           TEXT,
                CHECK ((status = 'CLOSED') = (closed_at IS NOT NULL))
            );

            CREATE INDEX idx_prayer_requests_feed
                ON prayer_requests(status, created_at);

            CREATE TABLE prayer_responses (
                id                  TEXT PRIMARY KEY,
                prayer_request_id   TEXT NOT NULL REFERENCES prayer_requests(id) ON DELETE CASCADE,
                from_user_id        TEXT NOT NULL REFERENCES users(id),
                response_type       TEXT NOT NULL CHECK (response_type IN ('QUICK', 'MESSAGE')),
                message             TEXT,
                created_at          TEXT NOT NULL,
                UNIQUE(prayer_request_id, from_user_id),
                CHECK ((response_type = 'MESSAGE') = (message IS NOT NULL))
            );

            CREATE TABLE prayer_updates (
                id                  TEXT PRIMARY KEY,
                prayer_request_id   TEXT NOT NULL REFERENCES prayer_requests(id) ON DELETE CASCADE,
                from_user_id        TEXT NOT NULL REFERENCES users(id),
                body                TEXT NOT NULL CHECK (length(trim(body)) > 0),
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_prayer_updates_request
                ON prayer_updates(prayer_request_id, created_at);

            -- prayer_request_id is a weak reference: no foreign key
            CREATE TABLE notifications (
                id                  TEXT PRIMARY KEY,
                to_user_id          TEXT NOT NULL REFERENCES users(id),
                type                TEXT NOT NULL,
                prayer_request_id   TEXT NOT NULL,
                text                TEXT NOT NULL,
                is_read             INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_recipient
                ON notifications(to_user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn closed_at_must_track_status() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES ('u1', 'a@b.c', 'x', '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO prayer_requests (id, requester_user_id, body, status, created_at)
             VALUES ('p1', 'u1', 'body', 'CLOSED', '2026-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(result.is_err());
    }
}
