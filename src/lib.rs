//! Campaign Triggers
//!
//! A client-side evaluation engine for event-triggered campaigns in games.
//! Session configuration delivers a set of triggers; each recorded gameplay
//! event is matched against them locally, and fired triggers hand their
//! actions (game parameters or image messages) to registered handlers.
//!
//! Typical flow:
//! - build a [`TriggerRegistry`] from the session configuration
//! - on each recorded event, ask the registry for an [`EventAction`]
//! - register handlers on the action and [`run`](EventAction::run) it

pub mod config;
pub mod event;
pub mod prefs;
pub mod settings;
pub mod store;
pub mod triggers;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use event::{EventRecorder, GameEvent, ParamValue};
pub use prefs::{FilePreferences, MemoryPreferences, Preferences};
pub use settings::Settings;
pub use store::{ActionStore, ExecutionCountManager, SimpleDataStore};
pub use triggers::{
    EventAction, EventActionHandler, EventTrigger, GameParametersHandler, ImageMessage,
    ImageMessageHandler, ImageMessageResolver, TriggerRegistry,
};

/// JSON object payloads exchanged with the platform (trigger responses,
/// persisted action parameters)
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
