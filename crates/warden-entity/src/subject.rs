//! Subject snapshot handed to the engine by the host environment.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point-in-time view of a connected identity.
///
/// The host builds one of these per event; the engine never reaches back
/// into the host to re-query attributes mid-decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Stable unique identity.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Remote network address, if the host knows it.
    pub ip: Option<String>,
    /// Client locale, if the host knows it.
    pub locale: Option<String>,
    /// Authorization attributes (permission tags) held by the subject.
    pub permissions: HashSet<String>,
}

impl Subject {
    /// Creates a subject with no attributes beyond identity and name.
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ip: None,
            locale: None,
            permissions: HashSet::new(),
        }
    }

    /// Whether the subject holds the given permission tag.
    ///
    /// An empty tag never matches.
    pub fn has_permission(&self, tag: &str) -> bool {
        !tag.is_empty() && self.permissions.contains(tag)
    }
}
