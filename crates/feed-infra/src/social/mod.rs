mod memory;

pub use memory::InMemorySocialGraph;
