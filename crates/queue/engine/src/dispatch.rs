//! Dispatch engine: picks the next token and calls it to a counter
//!
//! Selection, counter release and the `waiting → called` transition happen
//! inside one store critical section, so two counters dispatching at once
//! can never pick the same token. Announcement and notification run after
//! the lock is released and cannot fail the dispatch.

use std::sync::Arc;

use queue_types::{
    CounterNumber, DepartmentId, DispatchNotice, QueueError, QueueResult, Token, TokenId,
    TokenStatus,
};
use tracing::{info, warn};

use crate::announcement::{Announcement, AnnouncementHandle, AnnouncementSequencer};
use crate::config::CounterReleasePolicy;
use crate::notification::NotificationEmitter;
use crate::store::TokenStore;

/// Pick the next token: lowest `(priority rank, token number)`
pub fn select_next<'a>(waiting: impl IntoIterator<Item = &'a Token>) -> Option<&'a Token> {
    waiting
        .into_iter()
        .filter(|t| t.is_waiting())
        .min_by_key(|t| t.dispatch_key())
}

/// Result of a dispatch or recall
pub struct Dispatch {
    /// The token as it now stands
    pub token: Token,
    /// Previous occupant completed to free the counter, if any
    pub released: Option<Token>,
    /// Pending announcement; `None` when audio is off or unavailable
    pub announcement: Option<AnnouncementHandle>,
    /// Callbacks that accepted the notice
    pub notified: usize,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("token_number", &self.token.token_number)
            .field("status", &self.token.status)
            .field("counter", &self.token.counter)
            .field("released", &self.released.as_ref().map(|t| t.token_number))
            .field("announcing", &self.announcement.is_some())
            .field("notified", &self.notified)
            .finish()
    }
}

/// Calls tokens to counters and drives operator actions
pub struct DispatchEngine {
    store: Arc<TokenStore>,
    announcer: Arc<AnnouncementSequencer>,
    notifier: Arc<NotificationEmitter>,
    release_policy: CounterReleasePolicy,
}

impl DispatchEngine {
    pub fn new(
        store: Arc<TokenStore>,
        announcer: Arc<AnnouncementSequencer>,
        notifier: Arc<NotificationEmitter>,
        release_policy: CounterReleasePolicy,
    ) -> Self {
        Self {
            store,
            announcer,
            notifier,
            release_policy,
        }
    }

    /// Call the next waiting token of `department` to `counter`
    pub fn call_next_token(
        &self,
        department: &DepartmentId,
        counter: CounterNumber,
    ) -> QueueResult<Token> {
        self.dispatch(department, counter).map(|d| d.token)
    }

    /// [`Self::call_next_token`] with the released occupant and the
    /// announcement handle exposed
    pub fn dispatch(&self, department: &DepartmentId, counter: CounterNumber) -> QueueResult<Dispatch> {
        self.store.registry().counter(department, counter)?;

        let (token, released) = {
            let mut txn = self.store.lock();

            let next = select_next(txn.waiting_in(department))
                .map(|t| t.id)
                .ok_or_else(|| QueueError::NoWaitingToken(department.clone()))?;

            let released = match (txn.occupant(department, counter).map(|t| t.id), self.release_policy) {
                (Some(occupant), CounterReleasePolicy::CompletePrevious) => {
                    Some(txn.transition(&occupant, TokenStatus::Completed, None)?)
                }
                // The transition below rejects the occupied counter.
                (Some(_), CounterReleasePolicy::Reject) | (None, _) => None,
            };

            let token = txn.transition(&next, TokenStatus::Called, Some(counter))?;
            (token, released)
        };

        if let Some(prev) = &released {
            info!(
                token_number = prev.token_number,
                department = %department,
                counter,
                "Previous occupant completed to free counter"
            );
        }
        info!(
            token_number = token.token_number,
            department = %department,
            counter,
            priority = %token.priority,
            "Token dispatched"
        );

        let (announcement, notified) = self.announce_and_notify(&token, false);
        Ok(Dispatch {
            token,
            released,
            announcement,
            notified,
        })
    }

    /// Apply one lifecycle move directly, with the same rules as dispatch:
    /// a called token needs a free counter of its department, and nothing
    /// ever returns to waiting.
    pub fn transition(
        &self,
        id: &TokenId,
        to: TokenStatus,
        counter: Option<CounterNumber>,
    ) -> QueueResult<Token> {
        self.store.transition(id, to, counter)
    }

    /// Patient arrived at the counter
    pub fn mark_serving(&self, id: &TokenId) -> QueueResult<Token> {
        self.store.transition(id, TokenStatus::Serving, None)
    }

    /// Service finished; frees the counter
    pub fn mark_completed(&self, id: &TokenId) -> QueueResult<Token> {
        self.store.transition(id, TokenStatus::Completed, None)
    }

    /// Patient never showed up; frees the counter if one was held
    pub fn mark_no_show(&self, id: &TokenId) -> QueueResult<Token> {
        self.store.transition(id, TokenStatus::NoShow, None)
    }

    /// Announce a called or serving token again. No state change.
    pub fn recall_token(&self, id: &TokenId) -> QueueResult<Dispatch> {
        let token = self.store.get(id)?;
        if !token.is_at_counter() {
            return Err(QueueError::IllegalTransition {
                token_number: token.token_number,
                from: token.status,
                to: token.status,
                reason: "only called or serving tokens can be recalled".into(),
            });
        }

        info!(
            token_number = token.token_number,
            department = %token.department,
            counter = ?token.counter,
            "Token recalled"
        );
        let (announcement, notified) = self.announce_and_notify(&token, true);
        Ok(Dispatch {
            token,
            released: None,
            announcement,
            notified,
        })
    }

    pub fn release_policy(&self) -> CounterReleasePolicy {
        self.release_policy
    }

    fn announce_and_notify(&self, token: &Token, recall: bool) -> (Option<AnnouncementHandle>, usize) {
        let registry = self.store.registry();

        let announcement = match registry.get(&token.department) {
            Ok(dept) => self.announcer.announce(Announcement::for_token(token, dept)),
            Err(e) => {
                warn!(token_number = token.token_number, error = %e, "Cannot announce token");
                None
            }
        };

        let destination = registry.destination_label(&token.department, token.counter);
        let mut notice = DispatchNotice::new(token.clone(), destination);
        if recall {
            notice = notice.as_recall();
        }
        let notified = self.notifier.emit(&notice);

        (announcement, notified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announcement::{MockChimePlayer, MockSpeechSynthesizer};
    use crate::clock::TokioClock;
    use crate::config::AnnouncementConfig;
    use crate::registry::DepartmentRegistry;
    use chrono::Utc;
    use queue_types::{Department, Priority, TokenNumber, TokenRequest};

    fn engine(policy: CounterReleasePolicy) -> (DispatchEngine, Arc<TokenStore>) {
        let registry = DepartmentRegistry::new(vec![
            Department::new("lab", "Laboratory", [10, 11]),
            Department::new("pharmacy", "Pharmacy", [8]),
        ])
        .unwrap();
        let clock = Arc::new(TokioClock);
        let store = Arc::new(TokenStore::new(Arc::new(registry), clock.clone(), 1, 64));
        let announcer = Arc::new(AnnouncementSequencer::new(
            &AnnouncementConfig::default(),
            Arc::new(MockChimePlayer::new()),
            Arc::new(MockSpeechSynthesizer::new()),
            clock,
        ));
        let notifier = Arc::new(NotificationEmitter::new(16));
        (
            DispatchEngine::new(store.clone(), announcer, notifier, policy),
            store,
        )
    }

    fn create(store: &TokenStore, name: &str, dept: &str, priority: Priority) -> Token {
        store
            .create_token(TokenRequest::new(name, dept, priority))
            .unwrap()
    }

    fn issued(number: TokenNumber, priority: Priority) -> Token {
        Token::issue(TokenRequest::new("P", "lab", priority), number, Utc::now())
    }

    #[test]
    fn test_select_prefers_priority_then_number() {
        let tokens = vec![
            issued(5, Priority::Normal),
            issued(7, Priority::Urgent),
            issued(6, Priority::Urgent),
            issued(9, Priority::Normal),
        ];
        assert_eq!(select_next(&tokens).unwrap().token_number, 6);
    }

    #[test]
    fn test_select_skips_non_waiting() {
        let mut emergency = issued(1, Priority::Emergency);
        emergency.status = TokenStatus::Called;
        let tokens = vec![emergency, issued(2, Priority::Normal)];
        assert_eq!(select_next(&tokens).unwrap().token_number, 2);
        assert!(select_next(&Vec::<Token>::new()).is_none());
    }

    #[test]
    fn test_call_next_token() {
        let (engine, store) = engine(CounterReleasePolicy::CompletePrevious);
        create(&store, "A", "lab", Priority::Normal);
        let b = create(&store, "B", "lab", Priority::Emergency);

        let called = engine.call_next_token(&DepartmentId::new("lab"), 10).unwrap();
        assert_eq!(called.id, b.id);
        assert_eq!(called.status, TokenStatus::Called);
        assert_eq!(called.counter, Some(10));
    }

    #[test]
    fn test_empty_department() {
        let (engine, store) = engine(CounterReleasePolicy::CompletePrevious);
        create(&store, "A", "lab", Priority::Normal);

        let result = engine.call_next_token(&DepartmentId::new("pharmacy"), 8);
        assert!(matches!(result, Err(QueueError::NoWaitingToken(_))));
    }

    #[test]
    fn test_unknown_department_and_counter() {
        let (engine, store) = engine(CounterReleasePolicy::CompletePrevious);
        create(&store, "A", "lab", Priority::Normal);

        assert!(matches!(
            engine.call_next_token(&DepartmentId::new("cardiology"), 1),
            Err(QueueError::DepartmentNotFound(_))
        ));
        assert!(matches!(
            engine.call_next_token(&DepartmentId::new("lab"), 8),
            Err(QueueError::CounterNotFound { .. })
        ));
        assert_eq!(store.snapshot()[0].status, TokenStatus::Waiting);
    }

    #[test]
    fn test_complete_previous_frees_counter() {
        let (engine, store) = engine(CounterReleasePolicy::CompletePrevious);
        let a = create(&store, "A", "lab", Priority::Normal);
        let b = create(&store, "B", "lab", Priority::Normal);
        let lab = DepartmentId::new("lab");

        engine.call_next_token(&lab, 10).unwrap();
        let dispatch = engine.dispatch(&lab, 10).unwrap();

        assert_eq!(dispatch.token.id, b.id);
        let released = dispatch.released.unwrap();
        assert_eq!(released.id, a.id);
        assert_eq!(released.status, TokenStatus::Completed);
        assert_eq!(store.occupant(&lab, 10).unwrap().id, b.id);
    }

    #[test]
    fn test_reject_policy_leaves_state_untouched() {
        let (engine, store) = engine(CounterReleasePolicy::Reject);
        let a = create(&store, "A", "lab", Priority::Normal);
        let b = create(&store, "B", "lab", Priority::Normal);
        let lab = DepartmentId::new("lab");

        engine.call_next_token(&lab, 10).unwrap();
        let result = engine.call_next_token(&lab, 10);
        assert!(matches!(result, Err(QueueError::IllegalTransition { .. })));
        assert_eq!(store.get(&a.id).unwrap().status, TokenStatus::Called);
        assert_eq!(store.get(&b.id).unwrap().status, TokenStatus::Waiting);

        engine.mark_completed(&a.id).unwrap();
        assert_eq!(engine.call_next_token(&lab, 10).unwrap().id, b.id);
    }

    #[test]
    fn test_operator_actions() {
        let (engine, store) = engine(CounterReleasePolicy::CompletePrevious);
        let a = create(&store, "A", "lab", Priority::Normal);
        let lab = DepartmentId::new("lab");

        engine.call_next_token(&lab, 11).unwrap();
        assert_eq!(engine.mark_serving(&a.id).unwrap().status, TokenStatus::Serving);
        let done = engine.mark_completed(&a.id).unwrap();
        assert_eq!(done.status, TokenStatus::Completed);
        assert!(matches!(
            engine.mark_no_show(&a.id),
            Err(QueueError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_direct_transition_keeps_lifecycle_rules() {
        let (engine, store) = engine(CounterReleasePolicy::CompletePrevious);
        let a = create(&store, "A", "lab", Priority::Normal);

        let called = engine.transition(&a.id, TokenStatus::Called, Some(11)).unwrap();
        assert_eq!(called.counter, Some(11));
        assert!(matches!(
            engine.transition(&a.id, TokenStatus::Waiting, None),
            Err(QueueError::IllegalTransition { .. })
        ));
        assert_eq!(store.get(&a.id).unwrap().status, TokenStatus::Called);
    }

    #[test]
    fn test_recall_requires_counter() {
        let (engine, store) = engine(CounterReleasePolicy::CompletePrevious);
        let a = create(&store, "A", "lab", Priority::Normal);
        assert!(matches!(
            engine.recall_token(&a.id),
            Err(QueueError::IllegalTransition { .. })
        ));

        engine.call_next_token(&DepartmentId::new("lab"), 10).unwrap();
        let recall = engine.recall_token(&a.id).unwrap();
        assert_eq!(recall.token.status, TokenStatus::Called);
        assert!(recall.released.is_none());
    }

    #[test]
    fn test_dispatch_without_runtime_still_notifies() {
        let (engine, store) = engine(CounterReleasePolicy::CompletePrevious);
        create(&store, "A", "pharmacy", Priority::Urgent);
        engine.notifier.on_token_dispatched(|n| {
            assert_eq!(n.destination, "Pharmacy - Counter 8");
            Ok(())
        });

        let dispatch = engine.dispatch(&DepartmentId::new("pharmacy"), 8).unwrap();
        assert!(dispatch.announcement.is_none());
        assert_eq!(dispatch.notified, 1);
    }
}
