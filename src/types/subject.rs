use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque identity (usually a supplier id) scoping all four risk resources.
///
/// Backed by `Arc<str>` so snapshots and events can carry it cheaply.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(Arc<str>);

impl SubjectId {
    /// Build a subject id, or `None` for a blank string ("no active subject").
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Arc::from(trimmed)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
