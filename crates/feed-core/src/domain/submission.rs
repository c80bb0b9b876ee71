use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Attachment, Visibility};

/// A request to create a post. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Client-generated token; a retried request reuses it.
    pub idempotency_key: String,
    #[serde(default)]
    pub visibility: Visibility,
    pub community_id: Option<String>,
}

impl SubmissionRequest {
    pub fn text(idempotency_key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            attachments: Vec::new(),
            scheduled_for: None,
            idempotency_key: idempotency_key.into(),
            visibility: Visibility::default(),
            community_id: None,
        }
    }

    pub fn scheduled(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn in_community(mut self, community_id: impl Into<String>) -> Self {
        self.community_id = Some(community_id.into());
        self
    }

    /// Trimmed content, `None` when blank.
    pub fn body(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Hash of everything except the idempotency key, used to tell a retry
    /// from a different request that reused the key.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.body().hash(&mut hasher);
        self.attachments.hash(&mut hasher);
        self.scheduled_for.hash(&mut hasher);
        self.visibility.hash(&mut hasher);
        self.community_id.hash(&mut hasher);
        hasher.finish()
    }
}
