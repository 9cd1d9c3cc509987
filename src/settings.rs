//! Behaviour toggles shared across trigger evaluation

use std::sync::Arc;

use crate::triggers::{GameParametersHandler, ImageMessageHandler};

/// Engine-wide behaviour settings consulted by [`EventAction::run`].
///
/// Default handlers, when set, are appended after the handlers registered
/// on each action, so a host can install catch-all delivery once instead
/// of on every recorded event.
///
/// [`EventAction::run`]: crate::triggers::EventAction::run
#[derive(Default)]
pub struct Settings {
    /// When false (the default), an action run stops after the first
    /// claimed trigger. When true the remaining triggers keep being
    /// offered, with at most one image message delivered per run.
    pub multiple_actions_for_event_trigger_enabled: bool,

    /// Fallback handler for game-parameter actions
    pub default_game_parameters_handler: Option<Arc<GameParametersHandler>>,

    /// Fallback handler for image-message actions
    pub default_image_message_handler: Option<Arc<ImageMessageHandler>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }
}
