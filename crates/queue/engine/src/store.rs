//! Token store: the authoritative in-memory collection of tokens
//!
//! Every mutation takes the single store lock, which is what keeps token
//! numbers unique and counters exclusive without any further coordination.
//! The dispatch engine holds the same lock across selection and transition
//! through [`StoreTxn`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use queue_types::{
    CounterNumber, DepartmentId, QueueError, QueueEvent, QueueResult, Token, TokenId,
    TokenNumber, TokenRequest, TokenStatus,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::registry::DepartmentRegistry;

#[derive(Default)]
struct StoreState {
    /// Tokens in creation order
    tokens: Vec<Token>,
    /// Token id -> position in `tokens`
    index: HashMap<TokenId, usize>,
    /// (department, counter) -> token currently called or serving there
    occupancy: HashMap<(DepartmentId, CounterNumber), TokenId>,
    last_number: Option<TokenNumber>,
}

/// In-memory token store shared by intake, dispatch and projections
pub struct TokenStore {
    registry: Arc<DepartmentRegistry>,
    clock: Arc<dyn Clock>,
    token_floor: TokenNumber,
    state: Mutex<StoreState>,
    events: broadcast::Sender<QueueEvent>,
}

impl TokenStore {
    pub fn new(
        registry: Arc<DepartmentRegistry>,
        clock: Arc<dyn Clock>,
        token_floor: TokenNumber,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            registry,
            clock,
            token_floor,
            state: Mutex::new(StoreState::default()),
            events,
        }
    }

    /// Issue a new waiting token.
    ///
    /// Fails with `Validation` when the patient name is blank or the
    /// department is blank or unknown; nothing is stored in that case.
    pub fn create_token(&self, request: TokenRequest) -> QueueResult<Token> {
        let patient_name = request.patient_name.trim().to_string();
        if patient_name.is_empty() {
            return Err(QueueError::Validation("patient name is required".into()));
        }
        if request.department.is_blank() {
            return Err(QueueError::Validation("department is required".into()));
        }
        if !self.registry.contains(&request.department) {
            return Err(QueueError::Validation(format!(
                "unknown department: {}",
                request.department
            )));
        }

        let request = TokenRequest {
            patient_name,
            patient_id: request
                .patient_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            department: request.department,
            priority: request.priority,
        };

        let token = {
            let mut state = self.state.lock();
            let number = match state.last_number {
                None => self.token_floor,
                Some(last) => last.checked_add(1).ok_or_else(|| {
                    QueueError::Validation("token numbers exhausted".into())
                })?,
            };
            let token = Token::issue(request, number, self.clock.now());

            let position = state.tokens.len();
            state.index.insert(token.id, position);
            state.tokens.push(token.clone());
            state.last_number = Some(number);

            self.publish(QueueEvent::TokenCreated {
                token_id: token.id,
                token_number: token.token_number,
                department: token.department.clone(),
            });
            token
        };

        info!(
            token_number = token.token_number,
            department = %token.department,
            priority = %token.priority,
            "Token created"
        );
        Ok(token)
    }

    /// Get a token by id
    pub fn get(&self, id: &TokenId) -> QueueResult<Token> {
        let state = self.state.lock();
        state
            .index
            .get(id)
            .map(|&i| state.tokens[i].clone())
            .ok_or(QueueError::TokenNotFound(*id))
    }

    /// Snapshot of a department's tokens, optionally filtered by status.
    /// Order is unspecified.
    pub fn list_by_department(
        &self,
        department: &DepartmentId,
        status: Option<TokenStatus>,
    ) -> Vec<Token> {
        self.state
            .lock()
            .tokens
            .iter()
            .filter(|t| &t.department == department)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect()
    }

    /// Snapshot of every token in creation order
    pub fn snapshot(&self) -> Vec<Token> {
        self.state.lock().tokens.clone()
    }

    /// Token currently called to or being served at a counter
    pub fn occupant(&self, department: &DepartmentId, counter: CounterNumber) -> Option<Token> {
        let state = self.state.lock();
        state
            .occupancy
            .get(&(department.clone(), counter))
            .and_then(|id| state.index.get(id))
            .map(|&i| state.tokens[i].clone())
    }

    /// Move a token along the lifecycle; all-or-nothing.
    ///
    /// Hosts go through [`crate::DispatchEngine`]; status and counter are
    /// only written from there.
    pub(crate) fn transition(
        &self,
        id: &TokenId,
        to: TokenStatus,
        counter: Option<CounterNumber>,
    ) -> QueueResult<Token> {
        self.lock().transition(id, to, counter)
    }

    pub fn len(&self) -> usize {
        self.state.lock().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive a [`QueueEvent`] for every mutation
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        debug!("Store change subscription registered");
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Arc<DepartmentRegistry> {
        &self.registry
    }

    /// Take the store lock for a multi-step operation
    pub(crate) fn lock(&self) -> StoreTxn<'_> {
        StoreTxn {
            store: self,
            state: self.state.lock(),
        }
    }

    fn publish(&self, event: QueueEvent) {
        // No receivers is fine; views re-read on demand.
        let _ = self.events.send(event);
    }
}

/// Exclusive access to the store for the duration of one critical section
pub(crate) struct StoreTxn<'a> {
    store: &'a TokenStore,
    state: MutexGuard<'a, StoreState>,
}

impl StoreTxn<'_> {
    /// Waiting tokens of one department, in creation order
    pub(crate) fn waiting_in<'s>(
        &'s self,
        department: &'s DepartmentId,
    ) -> impl Iterator<Item = &'s Token> + 's {
        self.state
            .tokens
            .iter()
            .filter(move |t| t.is_waiting() && &t.department == department)
    }

    pub(crate) fn occupant(
        &self,
        department: &DepartmentId,
        counter: CounterNumber,
    ) -> Option<&Token> {
        self.state
            .occupancy
            .get(&(department.clone(), counter))
            .and_then(|id| self.state.index.get(id))
            .map(|&i| &self.state.tokens[i])
    }

    pub(crate) fn get(&self, id: &TokenId) -> QueueResult<&Token> {
        self.state
            .index
            .get(id)
            .map(|&i| &self.state.tokens[i])
            .ok_or(QueueError::TokenNotFound(*id))
    }

    /// Validate then apply one transition. Nothing changes on error.
    pub(crate) fn transition(
        &mut self,
        id: &TokenId,
        to: TokenStatus,
        counter: Option<CounterNumber>,
    ) -> QueueResult<Token> {
        let idx = *self
            .state
            .index
            .get(id)
            .ok_or(QueueError::TokenNotFound(*id))?;
        let current = &self.state.tokens[idx];
        let from = current.status;
        let token_number = current.token_number;
        let department = current.department.clone();
        let held_counter = current.counter;

        let illegal = |reason: String| QueueError::IllegalTransition {
            token_number,
            from,
            to,
            reason,
        };

        if !from.can_transition_to(to) {
            return Err(illegal("not permitted by the lifecycle".into()));
        }

        let next_counter = match to {
            TokenStatus::Called => {
                let c = counter.ok_or_else(|| illegal("a counter number is required".into()))?;
                self.store.registry.counter(&department, c)?;
                if let Some(other) = self.occupant(&department, c) {
                    if other.id != *id {
                        return Err(illegal(format!(
                            "counter {c} is occupied by token #{}",
                            other.token_number
                        )));
                    }
                }
                Some(c)
            }
            TokenStatus::Serving => {
                if let Some(c) = counter {
                    if held_counter != Some(c) {
                        return Err(illegal(format!(
                            "token is held at counter {}, not {c}",
                            held_counter.map_or_else(|| "none".to_string(), |h| h.to_string())
                        )));
                    }
                }
                held_counter
            }
            TokenStatus::Completed | TokenStatus::NoShow => None,
            TokenStatus::Waiting => return Err(illegal("tokens never return to waiting".into())),
        };

        // Validation passed; apply.
        let now = self.store.clock.now();
        if let Some(old) = held_counter {
            if next_counter != Some(old) {
                self.state.occupancy.remove(&(department.clone(), old));
            }
        }
        if let Some(c) = next_counter {
            self.state.occupancy.insert((department.clone(), c), *id);
        }

        let token = &mut self.state.tokens[idx];
        token.status = to;
        token.counter = next_counter;
        if to == TokenStatus::Called {
            token.called_at = Some(now);
        }
        if to.is_terminal() {
            token.finished_at = Some(now);
        }
        let updated = token.clone();

        self.store.publish(QueueEvent::StatusChanged {
            token_id: updated.id,
            token_number,
            department: department.clone(),
            from,
            to,
            counter: next_counter,
        });

        info!(
            token_number,
            department = %department,
            from = %from,
            to = %to,
            counter = ?next_counter,
            "Token transitioned"
        );
        Ok(updated)
    }
}
