//! Row → API model mapping.

use uuid::Uuid;

use whisper_db::models::{
    NotificationRow, PrayerDetailRow, PrayerRow, ResponseRow, UpdateRow, UserRow,
};
use whisper_types::api::{
    NotificationView, PrayerDetail, PrayerResponseView, PrayerSummary, PrayerUpdateView,
    UserProfile,
};

use crate::error::ApiError;

fn id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::internal(anyhow::anyhow!("corrupt {} '{}': {}", field, raw, e)))
}

pub fn user_profile(row: UserRow) -> Result<UserProfile, ApiError> {
    Ok(UserProfile {
        id: id("user id", &row.id)?,
        email: row.email,
        volunteered_to_pray: row.volunteered_to_pray,
        created_at: row.created_at,
    })
}

pub fn prayer_summary(row: PrayerRow) -> Result<PrayerSummary, ApiError> {
    Ok(PrayerSummary {
        id: id("prayer id", &row.id)?,
        requester_user_id: id("requester id", &row.requester_user_id)?,
        requester_email: row.requester_email,
        title: row.title,
        body: row.body,
        status: row.status,
        created_at: row.created_at,
        closed_at: row.closed_at,
        praying_count: row.praying_count,
        already_praying: row.already_praying,
    })
}

pub fn prayer_detail(row: PrayerDetailRow) -> Result<PrayerDetail, ApiError> {
    Ok(PrayerDetail {
        prayer: prayer_summary(row.prayer)?,
        responses: row
            .responses
            .into_iter()
            .map(prayer_response)
            .collect::<Result<_, _>>()?,
        updates: row
            .updates
            .into_iter()
            .map(prayer_update)
            .collect::<Result<_, _>>()?,
    })
}

pub fn prayer_response(row: ResponseRow) -> Result<PrayerResponseView, ApiError> {
    Ok(PrayerResponseView {
        id: id("response id", &row.id)?,
        prayer_request_id: id("prayer id", &row.prayer_request_id)?,
        from_user_id: id("responder id", &row.from_user_id)?,
        from_user_email: row.from_user_email,
        kind: row.kind,
        message: row.message,
        created_at: row.created_at,
    })
}

pub fn prayer_update(row: UpdateRow) -> Result<PrayerUpdateView, ApiError> {
    Ok(PrayerUpdateView {
        id: id("update id", &row.id)?,
        prayer_request_id: id("prayer id", &row.prayer_request_id)?,
        from_user_id: id("author id", &row.from_user_id)?,
        from_user_email: row.from_user_email,
        body: row.body,
        created_at: row.created_at,
    })
}

pub fn notification(row: NotificationRow) -> Result<NotificationView, ApiError> {
    Ok(NotificationView {
        id: id("notification id", &row.id)?,
        to_user_id: id("recipient id", &row.to_user_id)?,
        kind: row.kind,
        prayer_request_id: id("prayer id", &row.prayer_request_id)?,
        text: row.text,
        is_read: row.is_read,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;

    use super::*;

    fn user_row(id: &str) -> UserRow {
        UserRow {
            id: id.to_string(),
            email: "mary@example.com".into(),
            password_hash: String::new(),
            volunteered_to_pray: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn stored_ids_become_uuids() {
        let id = Uuid::new_v4();
        let profile = user_profile(user_row(&id.to_string())).unwrap();
        assert_eq!(profile.id, id);
        assert!(profile.volunteered_to_pray);
    }

    #[test]
    fn corrupt_stored_id_is_an_internal_error() {
        let err = user_profile(user_row("not-a-uuid")).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
