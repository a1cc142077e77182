//! # Kwicmark Common Library
//!
//! Shared code for the Kwicmark annotation modules including:
//! - Database initialization and schema
//! - Domain models (Decision, Snippet, Annotation, FinalDecision)
//! - Error types
//! - Configuration loading and root folder resolution

pub mod config;
pub mod db;
pub mod error;

pub use db::models::{Annotation, Decision, FinalDecision, Project, Role, Snippet, User};
pub use error::{Error, Result};
