//! Department catalogue entries

use crate::{CounterNumber, DepartmentId, QueueError, QueueResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A department and the counters that serve it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub counters: BTreeSet<CounterNumber>,
}

impl Department {
    pub fn new(
        id: impl Into<DepartmentId>,
        name: impl Into<String>,
        counters: impl IntoIterator<Item = CounterNumber>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            counters: counters.into_iter().collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn has_counter(&self, counter: CounterNumber) -> bool {
        self.counters.contains(&counter)
    }

    /// Label used by announcements and notifications
    pub fn destination_label(&self, counter: Option<CounterNumber>) -> String {
        match counter {
            Some(c) => format!("{} - Counter {}", self.name, c),
            None => self.name.clone(),
        }
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.id.is_blank() {
            return Err(QueueError::Config("department id must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(QueueError::Config(format!(
                "department {} has no name",
                self.id
            )));
        }
        if self.counters.is_empty() {
            return Err(QueueError::Config(format!(
                "department {} has no counters",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_ordered_and_deduplicated() {
        let dept = Department::new("lab", "Laboratory", [11, 10, 11]);
        assert_eq!(dept.counters.iter().copied().collect::<Vec<_>>(), vec![10, 11]);
        assert!(dept.has_counter(10));
        assert!(!dept.has_counter(12));
    }

    #[test]
    fn destination_label_with_and_without_counter() {
        let dept = Department::new("lab", "Laboratory", [10]);
        assert_eq!(dept.destination_label(Some(10)), "Laboratory - Counter 10");
        assert_eq!(dept.destination_label(None), "Laboratory");
    }

    #[test]
    fn validate_rejects_empty_counters() {
        let dept = Department::new("lab", "Laboratory", []);
        assert!(matches!(dept.validate(), Err(QueueError::Config(_))));
    }

    #[test]
    fn validate_rejects_blank_id() {
        let dept = Department::new(" ", "Laboratory", [1]);
        assert!(dept.validate().is_err());
        assert!(Department::new("lab", "Laboratory", [1]).validate().is_ok());
    }
}
