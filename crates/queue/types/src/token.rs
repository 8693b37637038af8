//! Tokens: a visitor's place in a department queue

use crate::{CounterNumber, DepartmentId, Priority, TokenId, TokenNumber, TokenStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Token Request ────────────────────────────────────────────────────

/// Inbound request from the intake desk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub patient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub department: DepartmentId,
    #[serde(default)]
    pub priority: Priority,
}

impl TokenRequest {
    pub fn new(
        patient_name: impl Into<String>,
        department: impl Into<DepartmentId>,
        priority: Priority,
    ) -> Self {
        Self {
            patient_name: patient_name.into(),
            patient_id: None,
            department: department.into(),
            priority,
        }
    }

    pub fn with_patient_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }
}

// ── Token ────────────────────────────────────────────────────────────

/// A single visitor's queue token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub token_number: TokenNumber,
    pub patient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub department: DepartmentId,
    pub priority: Priority,
    pub status: TokenStatus,
    pub created_at: DateTime<Utc>,
    /// Fixed at creation from the priority tier; never recomputed
    pub estimated_wait_minutes: u32,
    /// Set exactly while the token is called or serving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<CounterNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Issue a fresh waiting token
    pub fn issue(request: TokenRequest, token_number: TokenNumber, now: DateTime<Utc>) -> Self {
        Self {
            id: TokenId::generate(),
            token_number,
            patient_name: request.patient_name,
            patient_id: request.patient_id,
            department: request.department,
            estimated_wait_minutes: request.priority.estimated_wait_minutes(),
            priority: request.priority,
            status: TokenStatus::Waiting,
            created_at: now,
            counter: None,
            called_at: None,
            finished_at: None,
        }
    }

    /// Dispatch ordering key: priority tier, then token number
    pub fn dispatch_key(&self) -> (u8, TokenNumber) {
        (self.priority.rank(), self.token_number)
    }

    /// Ordering key of the "currently serving" view
    pub fn serving_key(&self) -> (u8, u8, TokenNumber) {
        (self.priority.rank(), self.status.rank(), self.token_number)
    }

    pub fn is_waiting(&self) -> bool {
        self.status == TokenStatus::Waiting
    }

    pub fn is_at_counter(&self) -> bool {
        self.status.is_at_counter()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
