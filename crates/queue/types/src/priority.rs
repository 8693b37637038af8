//! Priority tiers

use crate::QueueError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Priority tier of a token, fixed at creation.
///
/// The derived ordering follows dispatch order: `Emergency < Urgent < Normal`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Emergency,
    Urgent,
    #[default]
    Normal,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Emergency, Priority::Urgent, Priority::Normal];

    /// Primary dispatch key; lower is served first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Emergency => 0,
            Priority::Urgent => 1,
            Priority::Normal => 2,
        }
    }

    /// Static wait estimate shown to the visitor when the token is issued
    pub fn estimated_wait_minutes(self) -> u32 {
        match self {
            Priority::Emergency => 0,
            Priority::Urgent => 10,
            Priority::Normal => 20,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Emergency => "emergency",
            Priority::Urgent => "urgent",
            Priority::Normal => "normal",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emergency" => Ok(Priority::Emergency),
            "urgent" => Ok(Priority::Urgent),
            "normal" => Ok(Priority::Normal),
            other => Err(QueueError::Validation(format!("unknown priority: {other}"))),
        }
    }
}
