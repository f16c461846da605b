//! In-memory record storage

pub mod memory;

pub use memory::InMemoryStorage;
