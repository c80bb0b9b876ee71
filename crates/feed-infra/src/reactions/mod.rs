mod simulated;

pub use simulated::{ReactionCall, SimulatedReactionBackend, SimulatedReactionConfig};
