//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod clock;
mod events;
mod kv;
mod reactions;
mod social;
mod store;
mod timer;

pub use auth::{AuthError, AuthProvider, TokenClaims, TokenService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{EventSink, NoopEventSink, PostEvent};
pub use kv::{KeyValueBackend, KvError};
pub use reactions::{ReactionBackend, ReactionBackendError};
pub use social::SocialGraph;
pub use store::{PostPredicate, PostQuery, PostSnapshot, PostStore, StoreHealth};
pub use timer::{TickFn, Timer, TimerError, TimerHandle, tick_fn};
