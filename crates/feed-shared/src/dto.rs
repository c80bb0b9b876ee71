//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to uploaded media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDto {
    pub url: String,
    pub media_type: String,
}

/// Request to create a post.
///
/// The idempotency key may also be sent as an `Idempotency-Key` header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentDto>,
    pub scheduled_for: Option<DateTime<Utc>>,
    /// `public` (default), `connections` or `private`.
    pub visibility: Option<String>,
    pub community_id: Option<String>,
    pub idempotency_key: Option<String>,
}

/// A post as seen by the requesting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: u64,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: Option<String>,
    pub attachments: Vec<AttachmentDto>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
    pub interest_count: usize,
    /// Whether the requesting user marked the post; false when anonymous.
    pub interested: bool,
}

/// Result of `POST /api/posts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub post: PostResponse,
    /// The idempotency key had already been used; nothing new was created.
    pub replayed: bool,
}

/// Query string of `GET /api/feed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedParams {
    /// `all` (default), `following`, `scheduled`, `mine` or `community:<id>`.
    pub selector: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPageResponse {
    pub posts: Vec<PostResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Body of `PUT /api/posts/{id}/interest`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetInterestRequest {
    pub interested: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestResponse {
    pub post_id: u64,
    pub interested: bool,
    pub count: usize,
    /// The change is shown but not yet confirmed; it may still be rolled back.
    pub pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
