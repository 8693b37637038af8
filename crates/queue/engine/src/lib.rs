//! Front-desk service queue engine
//!
//! Issues priority-aware tokens per department, calls the next token to a
//! counter, keeps "currently serving" and "up next" views, and announces
//! each dispatch with a chime followed by speech.
//!
//! Entry point is [`FrontDeskQueue`]; the parts are public for hosts that
//! want to wire them differently.

#![deny(unsafe_code)]

pub mod announcement;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod notification;
pub mod projections;
pub mod registry;
pub mod service;
pub mod store;
pub mod telemetry;

pub use announcement::{
    Announcement, AnnouncementError, AnnouncementHandle, AnnouncementOutcome, AnnouncementPhase,
    AnnouncementSequencer, ChimePlayer, MockChimePlayer, MockSpeechSynthesizer, SilentChime,
    SpeechSynthesizer, TracingSpeech,
};
pub use clock::{Clock, TokioClock};
pub use config::{
    AnnouncementConfig, CounterReleasePolicy, DispatchConfig, EventConfig, LoggingConfig,
    NotificationConfig, QueueConfig,
};
pub use dispatch::{select_next, Dispatch, DispatchEngine};
pub use notification::{NotificationEmitter, SubscriberError, SubscriptionId};
pub use projections::{QueueProjections, QueueSummary};
pub use registry::DepartmentRegistry;
pub use service::FrontDeskQueue;
pub use store::TokenStore;
pub use telemetry::init_tracing;

pub use queue_types::*;
