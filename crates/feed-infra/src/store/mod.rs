//! Post store implementations.

mod persistent;

pub use persistent::{PersistentPostStore, StoreConfig};
