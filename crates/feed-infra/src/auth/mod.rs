//! Caller identity: bearer tokens for the server, a session slot for
//! embedded use.

#[cfg(feature = "auth")]
mod jwt;
mod session;

#[cfg(feature = "auth")]
pub use jwt::{JwtConfig, JwtTokenService};
pub use session::SessionAuth;
