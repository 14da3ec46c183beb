//! Identifiers for tasks and dependency edges
//!
//! ID Format:
//! - Generated task IDs: `t-{7-char-hash}` (e.g., `t-7f2b4c1`)
//! - Generated edge IDs: `d-{7-char-hash}` (e.g., `d-9d3e5f2`)
//!
//! Tasks are owned by the caller's task store, so any non-empty token without
//! whitespace is accepted as an ID. Generated IDs hash the title (or the edge
//! endpoints) with the creation timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID: expected a non-empty token without whitespace, got '{0}'")]
    InvalidTaskId(String),

    #[error("Invalid dependency ID: expected a non-empty token without whitespace, got '{0}'")]
    InvalidEdgeId(String),
}

/// Generates a 7-character hash from a seed and timestamp
fn generate_hash(seed: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", seed, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

fn is_valid_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

/// Task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Generates a new task ID from title and timestamp
    pub fn generate(title: &str, timestamp: DateTime<Utc>) -> Self {
        Self(format!("t-{}", generate_hash(title, timestamp)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !is_valid_token(s) {
            return Err(IdError::InvalidTaskId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

/// Dependency edge identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EdgeId(String);

impl EdgeId {
    /// Generates a new edge ID from its endpoints and a timestamp
    pub fn generate(predecessor: &TaskId, successor: &TaskId, timestamp: DateTime<Utc>) -> Self {
        let seed = format!("{}>{}", predecessor, successor);
        Self(format!("d-{}", generate_hash(&seed, timestamp)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EdgeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !is_valid_token(s) {
            return Err(IdError::InvalidEdgeId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for EdgeId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EdgeId> for String {
    fn from(id: EdgeId) -> Self {
        id.0
    }
}
