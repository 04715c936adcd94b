//! lessonmark-store: in-memory storage collaborators.
//!
//! Provides `MemoryStore`, an implementation of both `ContentStore` and
//! `ProgressStore` for tests, demos, and single-process deployments.

pub mod memory;

pub use memory::MemoryStore;
