//! Domain entities - the Post state machine and the feed queries over it.

mod feed;
mod identity;
mod post;
mod submission;

pub use feed::{Cursor, FeedPage, FeedQuery, FeedSelector};
pub use identity::Identity;
pub use post::{Attachment, Membership, NewPost, Post, PostId, PostPatch, PostStatus, Visibility};
pub use submission::SubmissionRequest;
