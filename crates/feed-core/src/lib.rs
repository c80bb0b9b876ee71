//! # Feed Core
//!
//! The domain layer of the feed engine: the Post state machine, feed queries,
//! the error taxonomy and the ports that infrastructure implements.
//! Nothing in here performs I/O.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{FeedError, StorageError};
