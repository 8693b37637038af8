//! Queue projections: "currently serving" and "up next" views
//!
//! Pure recomputation over a store snapshot on every read. Nothing here
//! caches or mutates; at front-desk queue sizes a sort per read is cheap.

use std::sync::Arc;

use queue_types::{DepartmentId, Token, TokenNumber, TokenStatus};
use serde::{Deserialize, Serialize};

use crate::store::TokenStore;

/// Tokens at a counter, ordered by `(priority, called-before-serving, number)`
pub fn currently_serving<'a>(
    tokens: impl IntoIterator<Item = &'a Token>,
    department: Option<&DepartmentId>,
) -> Vec<Token> {
    let mut view: Vec<Token> = tokens
        .into_iter()
        .filter(|t| t.is_at_counter())
        .filter(|t| department.map_or(true, |d| &t.department == d))
        .cloned()
        .collect();
    view.sort_by_key(Token::serving_key);
    view
}

/// Waiting tokens in dispatch order, truncated to `limit`
pub fn up_next<'a>(
    tokens: impl IntoIterator<Item = &'a Token>,
    department: Option<&DepartmentId>,
    limit: usize,
) -> Vec<Token> {
    let mut view: Vec<Token> = tokens
        .into_iter()
        .filter(|t| t.is_waiting())
        .filter(|t| department.map_or(true, |d| &t.department == d))
        .cloned()
        .collect();
    view.sort_by_key(Token::dispatch_key);
    view.truncate(limit);
    view
}

/// Per-department counts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSummary {
    pub department: DepartmentId,
    pub waiting: usize,
    pub called: usize,
    pub serving: usize,
    pub completed: usize,
    pub no_show: usize,
    /// Token the next dispatch for this department would pick
    pub next_token_number: Option<TokenNumber>,
}

impl QueueSummary {
    pub fn from_tokens<'a>(
        department: &DepartmentId,
        tokens: impl IntoIterator<Item = &'a Token>,
    ) -> Self {
        let mut summary = QueueSummary {
            department: department.clone(),
            ..Default::default()
        };
        let mut next: Option<&Token> = None;

        for token in tokens.into_iter().filter(|t| &t.department == department) {
            match token.status {
                TokenStatus::Waiting => {
                    summary.waiting += 1;
                    if next.map_or(true, |n| token.dispatch_key() < n.dispatch_key()) {
                        next = Some(token);
                    }
                }
                TokenStatus::Called => summary.called += 1,
                TokenStatus::Serving => summary.serving += 1,
                TokenStatus::Completed => summary.completed += 1,
                TokenStatus::NoShow => summary.no_show += 1,
            }
        }

        summary.next_token_number = next.map(|t| t.token_number);
        summary
    }

    pub fn total(&self) -> usize {
        self.waiting + self.called + self.serving + self.completed + self.no_show
    }
}

/// Read-only views bound to a store
#[derive(Clone)]
pub struct QueueProjections {
    store: Arc<TokenStore>,
    preview: usize,
}

impl QueueProjections {
    pub fn new(store: Arc<TokenStore>, preview: usize) -> Self {
        Self { store, preview }
    }

    pub fn currently_serving(&self, department: Option<&DepartmentId>) -> Vec<Token> {
        currently_serving(&self.store.snapshot(), department)
    }

    pub fn up_next(&self, department: Option<&DepartmentId>) -> Vec<Token> {
        up_next(&self.store.snapshot(), department, self.preview)
    }

    pub fn summary(&self, department: &DepartmentId) -> QueueSummary {
        QueueSummary::from_tokens(department, &self.store.snapshot())
    }

    pub fn preview_size(&self) -> usize {
        self.preview
    }
}
