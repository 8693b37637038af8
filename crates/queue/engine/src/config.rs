//! Configuration for the service queue

use queue_types::{Department, QueueError, QueueResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Main queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number given to the first token of an empty store
    #[serde(default = "default_token_floor")]
    pub token_number_floor: u64,

    /// How many waiting tokens the "up next" view shows
    #[serde(default = "default_up_next_preview")]
    pub up_next_preview: usize,

    /// Dispatch behaviour
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Chime and speech settings
    #[serde(default)]
    pub announcement: AnnouncementConfig,

    /// Outbound dispatch notifications
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Store change events
    #[serde(default)]
    pub events: EventConfig,

    /// Department catalogue
    #[serde(default = "default_departments")]
    pub departments: Vec<Department>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            token_number_floor: default_token_floor(),
            up_next_preview: default_up_next_preview(),
            dispatch: DispatchConfig::default(),
            announcement: AnnouncementConfig::default(),
            notification: NotificationConfig::default(),
            events: EventConfig::default(),
            departments: default_departments(),
            logging: LoggingConfig::default(),
        }
    }
}

/// What happens when a counter that already holds a token is asked to call the next one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterReleasePolicy {
    /// Complete the current occupant, then call the next token
    #[default]
    CompletePrevious,
    /// Refuse the dispatch until the occupant is completed or marked no-show
    Reject,
}

/// Dispatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub counter_release: CounterReleasePolicy,
}

/// Announcement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementConfig {
    /// Audio toggle at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sound asset played on dispatch
    #[serde(default = "default_chime_asset")]
    pub chime_asset: String,

    /// Delay from chime start to speech, in milliseconds
    #[serde(default = "default_speech_delay_ms")]
    pub speech_delay_ms: u64,
}

impl AnnouncementConfig {
    pub fn speech_delay(&self) -> Duration {
        Duration::from_millis(self.speech_delay_ms)
    }
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chime_asset: default_chime_asset(),
            speech_delay_ms: default_speech_delay_ms(),
        }
    }
}

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_capacity")]
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_notification_capacity(),
        }
    }
}

/// Store event channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_event_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_event_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_token_floor() -> u64 {
    1
}

fn default_up_next_preview() -> usize {
    5
}

fn default_chime_asset() -> String {
    "token-chime.mp3".to_string()
}

fn default_speech_delay_ms() -> u64 {
    1000
}

fn default_notification_capacity() -> usize {
    256
}

fn default_event_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_departments() -> Vec<Department> {
    vec![
        Department::new("general", "General Medicine", [1, 2, 3])
            .with_description("Outpatient consultations"),
        Department::new("lab", "Laboratory", [10, 11])
            .with_description("Blood work and sample collection"),
        Department::new("pharmacy", "Pharmacy", [8, 9])
            .with_description("Prescription pickup"),
        Department::new("radiology", "Radiology", [20, 21])
            .with_description("X-ray, CT and ultrasound"),
        Department::new("emergency", "Emergency", [30])
            .with_description("Emergency intake"),
    ]
}

impl QueueConfig {
    /// Load configuration: defaults, then an optional file, then
    /// `FRONTDESK_`-prefixed environment variables (`__` between sections).
    pub fn load(path: Option<&str>) -> QueueResult<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&QueueConfig::default()).map_err(config_error)?,
        );

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FRONTDESK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: QueueConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(toml: &str) -> QueueResult<Self> {
        let config: QueueConfig = config::Config::builder()
            .add_source(config::Config::try_from(&QueueConfig::default()).map_err(config_error)?)
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject catalogues the registry could not serve
    pub fn validate(&self) -> QueueResult<()> {
        if self.departments.is_empty() {
            return Err(QueueError::Config("no departments configured".into()));
        }
        if self.up_next_preview == 0 {
            return Err(QueueError::Config("up_next_preview must be at least 1".into()));
        }
        let mut seen = HashSet::new();
        for dept in &self.departments {
            dept.validate()?;
            if !seen.insert(&dept.id) {
                return Err(QueueError::Config(format!(
                    "duplicate department id: {}",
                    dept.id
                )));
            }
        }
        Ok(())
    }

    pub fn with_departments(mut self, departments: Vec<Department>) -> Self {
        self.departments = departments;
        self
    }

    pub fn with_token_floor(mut self, floor: u64) -> Self {
        self.token_number_floor = floor;
        self
    }
}

fn config_error(e: config::ConfigError) -> QueueError {
    QueueError::Config(e.to_string())
}
