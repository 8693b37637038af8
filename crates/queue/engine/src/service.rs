//! `FrontDeskQueue`: the surface a front-desk application talks to
//!
//! Wires registry, store, dispatch, projections, announcements and
//! notifications from one [`QueueConfig`]. Cheap to share behind an `Arc`.

use std::sync::Arc;

use queue_types::{
    CounterNumber, Department, DepartmentId, DispatchNotice, QueueEvent, QueueResult, Token,
    TokenId, TokenRequest, TokenStatus,
};
use tokio::sync::broadcast;
use tracing::info;

use crate::announcement::{
    AnnouncementSequencer, ChimePlayer, SilentChime, SpeechSynthesizer, TracingSpeech,
};
use crate::clock::{Clock, TokioClock};
use crate::config::QueueConfig;
use crate::dispatch::{Dispatch, DispatchEngine};
use crate::notification::{NotificationEmitter, SubscriberError, SubscriptionId};
use crate::projections::{QueueProjections, QueueSummary};
use crate::registry::DepartmentRegistry;
use crate::store::TokenStore;

/// The service queue
pub struct FrontDeskQueue {
    config: QueueConfig,
    store: Arc<TokenStore>,
    engine: DispatchEngine,
    projections: QueueProjections,
    announcer: Arc<AnnouncementSequencer>,
    notifier: Arc<NotificationEmitter>,
}

impl FrontDeskQueue {
    /// Queue without audio hardware: silent chime, speech written to the log
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        Self::with_audio(config, Arc::new(SilentChime), Arc::new(TracingSpeech))
    }

    pub fn with_audio(
        config: QueueConfig,
        chime: Arc<dyn ChimePlayer>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> QueueResult<Self> {
        Self::with_clock(config, chime, speech, Arc::new(TokioClock))
    }

    pub fn with_clock(
        config: QueueConfig,
        chime: Arc<dyn ChimePlayer>,
        speech: Arc<dyn SpeechSynthesizer>,
        clock: Arc<dyn Clock>,
    ) -> QueueResult<Self> {
        config.validate()?;

        let registry = Arc::new(DepartmentRegistry::new(config.departments.clone())?);
        let store = Arc::new(TokenStore::new(
            registry.clone(),
            clock.clone(),
            config.token_number_floor,
            config.events.channel_capacity,
        ));
        let announcer = Arc::new(AnnouncementSequencer::new(
            &config.announcement,
            chime,
            speech,
            clock,
        ));
        let notifier = Arc::new(NotificationEmitter::new(config.notification.channel_capacity));
        let engine = DispatchEngine::new(
            store.clone(),
            announcer.clone(),
            notifier.clone(),
            config.dispatch.counter_release,
        );
        let projections = QueueProjections::new(store.clone(), config.up_next_preview);

        info!(
            departments = registry.count(),
            token_floor = config.token_number_floor,
            audio = config.announcement.enabled,
            "Front desk queue ready"
        );

        Ok(Self {
            config,
            store,
            engine,
            projections,
            announcer,
            notifier,
        })
    }

    // ── Intake ───────────────────────────────────────────────────────

    pub fn create_token(&self, request: TokenRequest) -> QueueResult<Token> {
        self.store.create_token(request)
    }

    // ── Dispatch and operator actions ────────────────────────────────

    pub fn call_next_token(
        &self,
        department: &DepartmentId,
        counter: CounterNumber,
    ) -> QueueResult<Token> {
        self.engine.call_next_token(department, counter)
    }

    /// Like [`Self::call_next_token`], keeping the announcement handle
    pub fn dispatch(&self, department: &DepartmentId, counter: CounterNumber) -> QueueResult<Dispatch> {
        self.engine.dispatch(department, counter)
    }

    pub fn transition(
        &self,
        id: &TokenId,
        to: TokenStatus,
        counter: Option<CounterNumber>,
    ) -> QueueResult<Token> {
        self.engine.transition(id, to, counter)
    }

    pub fn mark_serving(&self, id: &TokenId) -> QueueResult<Token> {
        self.engine.mark_serving(id)
    }

    pub fn mark_completed(&self, id: &TokenId) -> QueueResult<Token> {
        self.engine.mark_completed(id)
    }

    pub fn mark_no_show(&self, id: &TokenId) -> QueueResult<Token> {
        self.engine.mark_no_show(id)
    }

    pub fn recall_token(&self, id: &TokenId) -> QueueResult<Dispatch> {
        self.engine.recall_token(id)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn on_token_dispatched<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DispatchNotice) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.notifier.on_token_dispatched(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn subscribe_dispatches(&self) -> broadcast::Receiver<DispatchNotice> {
        self.notifier.subscribe()
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<QueueEvent> {
        self.store.subscribe()
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn currently_serving(&self, department: Option<&DepartmentId>) -> Vec<Token> {
        self.projections.currently_serving(department)
    }

    pub fn up_next(&self, department: Option<&DepartmentId>) -> Vec<Token> {
        self.projections.up_next(department)
    }

    pub fn summary(&self, department: &DepartmentId) -> QueueSummary {
        self.projections.summary(department)
    }

    pub fn get_token(&self, id: &TokenId) -> QueueResult<Token> {
        self.store.get(id)
    }

    pub fn tokens(&self, department: &DepartmentId, status: Option<TokenStatus>) -> Vec<Token> {
        self.store.list_by_department(department, status)
    }

    pub fn departments(&self) -> Vec<Department> {
        self.store.registry().list().into_iter().cloned().collect()
    }

    // ── Audio and lifecycle ──────────────────────────────────────────

    pub fn set_audio_enabled(&self, enabled: bool) {
        self.announcer.set_enabled(enabled);
    }

    pub fn audio_enabled(&self) -> bool {
        self.announcer.is_enabled()
    }

    /// Cancel pending announcements; later dispatches stay silent
    pub fn shutdown(&self) {
        self.announcer.shutdown();
        info!(tokens = self.store.len(), "Front desk queue shut down");
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Underlying store. Status changes still go through [`Self::transition`]
    /// and the operator actions.
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_types::{Priority, QueueError};

    fn queue() -> FrontDeskQueue {
        FrontDeskQueue::new(QueueConfig::default().with_token_floor(101)).unwrap()
    }

    #[test]
    fn test_end_to_end_lifecycle() {
        let queue = queue();
        let lab = DepartmentId::new("lab");
        let token = queue
            .create_token(TokenRequest::new("Jane Doe", "lab", Priority::Normal))
            .unwrap();
        assert_eq!(token.token_number, 101);
        assert_eq!(queue.up_next(Some(&lab)).len(), 1);

        queue.call_next_token(&lab, 10).unwrap();
        assert_eq!(queue.currently_serving(Some(&lab))[0].id, token.id);
        queue.mark_serving(&token.id).unwrap();
        queue.mark_completed(&token.id).unwrap();

        assert!(queue.currently_serving(None).is_empty());
        assert_eq!(queue.summary(&lab).completed, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = QueueConfig::default().with_departments(vec![]);
        assert!(matches!(FrontDeskQueue::new(config), Err(QueueError::Config(_))));
    }

    #[test]
    fn test_audio_toggle() {
        let queue = queue();
        assert!(queue.audio_enabled());
        queue.set_audio_enabled(false);
        assert!(!queue.audio_enabled());
    }

    #[test]
    fn test_dispatch_notice_and_change_events() {
        let queue = queue();
        let mut notices = queue.subscribe_dispatches();
        let mut changes = queue.subscribe_changes();

        queue
            .create_token(TokenRequest::new("Ana", "pharmacy", Priority::Urgent))
            .unwrap();
        queue.call_next_token(&DepartmentId::new("pharmacy"), 9).unwrap();

        let notice = notices.try_recv().unwrap();
        assert_eq!(notice.destination, "Pharmacy - Counter 9");
        assert!(matches!(changes.try_recv().unwrap(), QueueEvent::TokenCreated { .. }));
        assert!(matches!(changes.try_recv().unwrap(), QueueEvent::StatusChanged { .. }));
    }

    #[test]
    fn test_departments_listed() {
        let queue = queue();
        assert_eq!(queue.departments().len(), queue.config().departments.len());
    }
}
