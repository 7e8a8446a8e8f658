use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NotificationKind, RequestStatus, ResponseKind};

// -- JWT Claims --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

/// Missing fields deserialize as empty strings so that they are reported as
/// validation errors rather than extractor rejections.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub volunteered_to_pray: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSettingsRequest {
    pub volunteered_to_pray: bool,
}

// -- Prayer requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePrayerRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    #[serde(default)]
    pub include_closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerSummary {
    pub id: Uuid,
    pub requester_user_id: Uuid,
    pub requester_email: String,
    pub title: Option<String>,
    pub body: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub praying_count: u32,
    pub already_praying: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerDetail {
    #[serde(flatten)]
    pub prayer: PrayerSummary,
    pub responses: Vec<PrayerResponseView>,
    pub updates: Vec<PrayerUpdateView>,
}

// -- Responses --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondRequest {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerResponseView {
    pub id: Uuid,
    pub prayer_request_id: Uuid,
    pub from_user_id: Uuid,
    pub from_user_email: String,
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Updates --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostUpdateRequest {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerUpdateView {
    pub id: Uuid,
    pub prayer_request_id: Uuid,
    pub from_user_id: Uuid,
    pub from_user_email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    pub to_user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub prayer_request_id: Uuid,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
