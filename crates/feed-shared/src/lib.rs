//! # Feed Shared
//!
//! Wire types shared between the feed server and its clients.
//! Kept free of engine dependencies so clients can compile it alone.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
