//! Per-event orchestration of trigger evaluation and action dispatch

use std::sync::Arc;

use super::handlers::EventActionHandler;
use super::trigger::{ActionKind, EventTrigger};
use crate::event::GameEvent;
use crate::settings::Settings;
use crate::store::ActionStore;

/// The evaluation run for one recorded event.
///
/// Handlers registered through [`add`](EventAction::add) are offered each
/// fired trigger in registration order, followed by any default handlers
/// from [`Settings`]; the first handler to claim a trigger ends the chain
/// for that trigger. Evaluation happens locally and is instantaneous.
pub struct EventAction {
    event: GameEvent,
    triggers: Vec<Arc<EventTrigger>>,
    store: Arc<ActionStore>,
    settings: Arc<Settings>,
    handlers: Vec<Arc<dyn EventActionHandler>>,
}

impl EventAction {
    /// Create an action over a priority-sorted trigger list
    pub fn new(
        event: GameEvent,
        triggers: Vec<Arc<EventTrigger>>,
        store: Arc<ActionStore>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            event,
            triggers,
            store,
            settings,
            handlers: Vec::new(),
        }
    }

    /// Create an action with no triggers, for events nothing listens to
    pub fn empty(event: GameEvent, store: Arc<ActionStore>, settings: Arc<Settings>) -> Self {
        Self::new(event, Vec::new(), store, settings)
    }

    /// Register a handler. Registering the same handler instance twice
    /// has no effect.
    pub fn add(&mut self, handler: Arc<dyn EventActionHandler>) -> &mut Self {
        if !self.handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            self.handlers.push(handler);
        }
        self
    }

    /// Evaluate every trigger against the event, in priority order, and
    /// dispatch fired triggers to the handlers.
    pub fn run(&self) {
        let mut handlers: Vec<Arc<dyn EventActionHandler>> = self.handlers.clone();
        if let Some(handler) = &self.settings.default_game_parameters_handler {
            handlers.push(handler.clone());
        }
        if let Some(handler) = &self.settings.default_image_message_handler {
            handlers.push(handler.clone());
        }

        let mut image_message_claimed = false;
        for trigger in &self.triggers {
            if !trigger.evaluate(&self.event) {
                continue;
            }
            // Only one image message per run; later image triggers are
            // skipped without being offered to any handler
            if image_message_claimed && trigger.action_kind() == ActionKind::ImageMessage {
                continue;
            }

            for handler in &handlers {
                if handler.handle(trigger, &self.store) {
                    if trigger.action_kind() == ActionKind::ImageMessage {
                        image_message_claimed = true;
                    }
                    if !self.settings.multiple_actions_for_event_trigger_enabled {
                        return;
                    }
                    break;
                }
            }
        }
    }
}
