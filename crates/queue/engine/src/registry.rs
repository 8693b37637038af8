//! Department registry: read-mostly catalogue of departments
//!
//! Built once from configuration. The dispatch core only ever reads it;
//! editing the catalogue is the host application's concern.

use queue_types::{CounterNumber, Department, DepartmentId, QueueError, QueueResult};
use std::collections::BTreeMap;

/// Registry of departments, keyed by id
#[derive(Clone, Debug, Default)]
pub struct DepartmentRegistry {
    departments: BTreeMap<DepartmentId, Department>,
}

impl DepartmentRegistry {
    /// Build a registry, rejecting invalid entries and duplicate ids
    pub fn new(departments: impl IntoIterator<Item = Department>) -> QueueResult<Self> {
        let mut map = BTreeMap::new();
        for dept in departments {
            dept.validate()?;
            let id = dept.id.clone();
            if map.insert(id.clone(), dept).is_some() {
                return Err(QueueError::Config(format!("duplicate department id: {id}")));
            }
        }

        tracing::debug!(departments = map.len(), "Department registry built");
        Ok(Self { departments: map })
    }

    /// Get a department by id
    pub fn get(&self, id: &DepartmentId) -> QueueResult<&Department> {
        self.departments
            .get(id)
            .ok_or_else(|| QueueError::DepartmentNotFound(id.clone()))
    }

    pub fn contains(&self, id: &DepartmentId) -> bool {
        self.departments.contains_key(id)
    }

    /// Resolve a department and check that `counter` belongs to it
    pub fn counter(&self, id: &DepartmentId, counter: CounterNumber) -> QueueResult<&Department> {
        let dept = self.get(id)?;
        if !dept.has_counter(counter) {
            return Err(QueueError::CounterNotFound {
                department: id.clone(),
                counter,
            });
        }
        Ok(dept)
    }

    pub fn has_counter(&self, id: &DepartmentId, counter: CounterNumber) -> bool {
        self.departments
            .get(id)
            .is_some_and(|dept| dept.has_counter(counter))
    }

    /// "Laboratory - Counter 10", or the bare id for unknown departments
    pub fn destination_label(&self, id: &DepartmentId, counter: Option<CounterNumber>) -> String {
        match self.departments.get(id) {
            Some(dept) => dept.destination_label(counter),
            None => id.to_string(),
        }
    }

    /// List all departments, ordered by id
    pub fn list(&self) -> Vec<&Department> {
        self.departments.values().collect()
    }

    pub fn count(&self) -> usize {
        self.departments.len()
    }
}
