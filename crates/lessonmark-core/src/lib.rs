//! lessonmark-core: lesson scoring engine and checkpoint scheduler.
//!
//! This crate defines the grading data model, the pure validator and scoring
//! functions, the checkpoint spawn decision and question selection, and the
//! engine that ties them to the storage collaborators.

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod results;
pub mod scoring;
pub mod traits;
pub mod unlock;
pub mod validator;
