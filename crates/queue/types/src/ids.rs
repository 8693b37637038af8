//! Identifiers used across the queue

use serde::{Deserialize, Serialize};

/// Sequential, human-facing token number.
pub type TokenNumber = u64;

/// A service counter within a department.
pub type CounterNumber = u32;

// ── Token Identifier ─────────────────────────────────────────────────

/// Opaque unique identifier for a token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub uuid::Uuid);

impl TokenId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Department Identifier ────────────────────────────────────────────

/// Key of a department in the registry (e.g. `lab`, `pharmacy`)
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub String);

impl DepartmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DepartmentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DepartmentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_ids_are_unique() {
        assert_ne!(TokenId::generate(), TokenId::generate());
    }

    #[test]
    fn short_token_id_is_eight_chars() {
        assert_eq!(TokenId::generate().short().len(), 8);
    }

    #[test]
    fn blank_department_id() {
        assert!(DepartmentId::new("  ").is_blank());
        assert!(!DepartmentId::from("lab").is_blank());
    }

    #[test]
    fn department_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&DepartmentId::new("pharmacy")).unwrap();
        assert_eq!(json, "\"pharmacy\"");
    }
}
