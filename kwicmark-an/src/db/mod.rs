//! Database operations for the annotation engine, one module per table

pub mod annotations;
pub mod decisions;
pub mod projects;
pub mod snippets;
pub mod users;
