//! Events published by the queue core

use crate::{CounterNumber, DepartmentId, Token, TokenId, TokenNumber, TokenStatus};
use serde::{Deserialize, Serialize};

/// Store change notifications; views re-read the store when they see one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueEvent {
    TokenCreated {
        token_id: TokenId,
        token_number: TokenNumber,
        department: DepartmentId,
    },
    StatusChanged {
        token_id: TokenId,
        token_number: TokenNumber,
        department: DepartmentId,
        from: TokenStatus,
        to: TokenStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        counter: Option<CounterNumber>,
    },
}

impl QueueEvent {
    pub fn token_id(&self) -> TokenId {
        match self {
            QueueEvent::TokenCreated { token_id, .. } => *token_id,
            QueueEvent::StatusChanged { token_id, .. } => *token_id,
        }
    }

    pub fn department(&self) -> &DepartmentId {
        match self {
            QueueEvent::TokenCreated { department, .. } => department,
            QueueEvent::StatusChanged { department, .. } => department,
        }
    }
}

/// Outbound notice for SMS, push and toast consumers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchNotice {
    pub token: Token,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub token_number: TokenNumber,
    /// e.g. "Laboratory - Counter 10"
    pub destination: String,
    /// Set when the notice comes from a recall rather than a fresh dispatch
    #[serde(default)]
    pub recall: bool,
}

impl DispatchNotice {
    pub fn new(token: Token, destination: impl Into<String>) -> Self {
        Self {
            patient_id: token.patient_id.clone(),
            patient_name: token.patient_name.clone(),
            token_number: token.token_number,
            destination: destination.into(),
            recall: false,
            token,
        }
    }

    pub fn as_recall(mut self) -> Self {
        self.recall = true;
        self
    }
}
