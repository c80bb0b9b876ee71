use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Post, PostId};
use crate::error::FeedError;

/// Which slice of the store a feed shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedSelector {
    All,
    Following,
    Scheduled,
    Mine,
    Community(String),
}

impl FeedSelector {
    /// Whether the feed walks its posts oldest-first.
    pub fn ascending(&self) -> bool {
        matches!(self, FeedSelector::Scheduled)
    }

    /// Feeds that only make sense for a signed-in user.
    pub fn requires_identity(&self) -> bool {
        matches!(
            self,
            FeedSelector::Following | FeedSelector::Scheduled | FeedSelector::Mine
        )
    }
}

impl fmt::Display for FeedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSelector::All => f.write_str("all"),
            FeedSelector::Following => f.write_str("following"),
            FeedSelector::Scheduled => f.write_str("scheduled"),
            FeedSelector::Mine => f.write_str("mine"),
            FeedSelector::Community(id) => write!(f, "community:{id}"),
        }
    }
}

impl FromStr for FeedSelector {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(FeedSelector::All),
            "following" => Ok(FeedSelector::Following),
            "scheduled" => Ok(FeedSelector::Scheduled),
            "mine" => Ok(FeedSelector::Mine),
            other => match other.strip_prefix("community:") {
                Some(id) if !id.trim().is_empty() => Ok(FeedSelector::Community(id.to_string())),
                Some(_) => Err(FeedError::validation("community selector needs an id")),
                None => Err(FeedError::validation(format!("unknown feed selector '{other}'"))),
            },
        }
    }
}

/// Position of the last post a caller has seen: its sort timestamp and id.
///
/// Pages continue strictly after this pair, so posts inserted ahead of it
/// never shift the window of a "load more" sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub at: DateTime<Utc>,
    pub id: PostId,
}

impl Cursor {
    pub fn new(at: DateTime<Utc>, id: PostId) -> Self {
        Self { at, id }
    }

    /// Whether `post` (with sort timestamp `at`) comes after the cursor in a
    /// feed walked in the given direction.
    pub fn precedes(&self, at: DateTime<Utc>, id: PostId, ascending: bool) -> bool {
        if ascending {
            (at, id) > (self.at, self.id)
        } else {
            (at, id) < (self.at, self.id)
        }
    }

    /// Opaque URL-safe form handed to callers.
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}.{}:{}",
            self.at.timestamp(),
            self.at.timestamp_subsec_nanos(),
            self.id
        );
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    pub fn decode(s: &str) -> Result<Self, FeedError> {
        let invalid = || FeedError::validation("invalid feed cursor");

        let bytes = URL_SAFE_NO_PAD.decode(s).map_err(|_| invalid())?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (stamp, id) = raw.split_once(':').ok_or_else(invalid)?;
        let (secs, nanos) = stamp.split_once('.').ok_or_else(invalid)?;

        let secs: i64 = secs.parse().map_err(|_| invalid())?;
        let nanos: u32 = nanos.parse().map_err(|_| invalid())?;
        let at = DateTime::from_timestamp(secs, nanos).ok_or_else(invalid)?;
        let id = id.parse().map_err(|_| invalid())?;

        Ok(Self { at, id })
    }
}

impl Serialize for Cursor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cursor::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// A request for one page of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub selector: FeedSelector,
    pub cursor: Option<Cursor>,
    /// Falls back to the engine's default page size when absent.
    pub page_size: Option<usize>,
}

impl FeedQuery {
    pub fn new(selector: FeedSelector) -> Self {
        Self {
            selector,
            cursor: None,
            page_size: None,
        }
    }

    pub fn after(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// One page of a feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    /// Absent on the last page.
    pub next_cursor: Option<Cursor>,
    /// Set when the store could not be read and the view is degraded.
    pub notice: Option<String>,
}
