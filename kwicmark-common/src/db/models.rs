//! Database models

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Binary annotation decision
///
/// Stored as INTEGER 0/1 in SQLite and emitted as 0/1 (or bool) in the
/// export format; everywhere inside the core it is this enum. There is
/// no abstain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    No,
    Yes,
}

impl Decision {
    /// Convert from the stored integer representation
    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Decision::No),
            1 => Ok(Decision::Yes),
            other => Err(Error::InvalidInput(format!(
                "decision must be 0 or 1, got {}",
                other
            ))),
        }
    }

    /// Integer representation for storage and export
    pub fn as_i64(self) -> i64 {
        match self {
            Decision::No => 0,
            Decision::Yes => 1,
        }
    }

    /// Parse the command-line spelling of a decision
    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "yes" | "1" => Ok(Decision::Yes),
            "no" | "0" => Ok(Decision::No),
            other => Err(Error::InvalidInput(format!(
                "decision must be yes or no, got {}",
                other
            ))),
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Decision::Yes
        } else {
            Decision::No
        }
    }

    pub fn as_bool(self) -> bool {
        matches!(self, Decision::Yes)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::No => write!(f, "no"),
            Decision::Yes => write!(f, "yes"),
        }
    }
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Annotator,
    Superannotator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Annotator => "annotator",
            Role::Superannotator => "superannotator",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "annotator" => Ok(Role::Annotator),
            "superannotator" => Ok(Role::Superannotator),
            other => Err(Error::InvalidInput(format!("unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub instructions: Option<String>,
}

/// A unit of text with an optional highlighted span; immutable once
/// imported, ordered by id within its project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub id: i64,
    pub project_id: i64,
    pub content: String,
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: i64,
    pub snippet_id: i64,
    pub user_id: i64,
    pub decision: Decision,
    pub created_at: NaiveDateTime,
}

/// Superannotator's authoritative decision for a snippet; at most one
/// per snippet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDecision {
    pub snippet_id: i64,
    pub decision: Decision,
}
