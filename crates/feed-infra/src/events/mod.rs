//! Event fan-out for live views.

mod broadcast;

pub use self::broadcast::BroadcastEventBus;
