//! # Feed Engine
//!
//! The post lifecycle on top of the `feed-core` ports:
//!
//! - [`SubmissionController`] - validates new posts and enforces idempotency keys
//! - [`SchedulerReconciler`] - promotes due scheduled posts
//! - [`InteractionEngine`] - optimistic "interested" toggles with rollback
//! - [`FeedComposer`] - cursor-paginated feeds per selector
//! - [`PostService`] - one injected facade wiring the above, with start/shutdown
//!
//! Pending operations run on spawned tasks behind a bounded wait
//! (see [`pending`]), so a caller's button comes back even when the store is slow.

pub mod composer;
pub mod config;
pub mod interaction;
pub mod pending;
pub mod reconciler;
pub mod service;
pub mod submission;

pub use composer::{Feed, FeedComposer};
pub use config::EngineConfig;
pub use interaction::{InteractionEngine, InterestState};
pub use pending::{Affordance, AffordanceLease, run_bounded};
pub use reconciler::{ReconcileReport, SchedulerReconciler};
pub use service::{PostService, ServiceDeps};
pub use submission::{SubmissionController, Submitted};
