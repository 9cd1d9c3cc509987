//! Handlers that consume fired triggers
//!
//! A handler claims a fired trigger when it can deliver that trigger's
//! action; a claim ends the handler chain for the trigger. Persisted
//! actions from an earlier, interrupted session take precedence over the
//! trigger's own response payload.

use std::sync::Arc;

use serde_json::Value;

use super::trigger::{ActionKind, EventTrigger};
use crate::store::ActionStore;
use crate::JsonObject;

/// Strategy for delivering one kind of fired-trigger action.
pub trait EventActionHandler: Send + Sync {
    /// The action kind this handler delivers
    fn kind(&self) -> ActionKind;

    /// Attempt to deliver the trigger's action, returning true on a claim
    fn handle(&self, trigger: &EventTrigger, store: &ActionStore) -> bool;
}

/// Delivers game-parameter actions to a callback.
///
/// Claims unconditionally once the action kind matches.
pub struct GameParametersHandler {
    callback: Box<dyn Fn(JsonObject) + Send + Sync>,
}

impl GameParametersHandler {
    pub fn new(callback: impl Fn(JsonObject) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl EventActionHandler for GameParametersHandler {
    fn kind(&self) -> ActionKind {
        ActionKind::GameParameters
    }

    fn handle(&self, trigger: &EventTrigger, store: &ActionStore) -> bool {
        if trigger.action_kind() != self.kind() {
            return false;
        }

        if let Some(persisted) = store.get(trigger.campaign_id()) {
            store.remove(trigger.campaign_id());
            (self.callback)(persisted);
        } else if let Some(parameters) = trigger
            .response()
            .get("parameters")
            .and_then(Value::as_object)
        {
            (self.callback)(parameters.clone());
        } else {
            (self.callback)(JsonObject::new());
        }

        true
    }
}

/// An image message built from a trigger response, ready for the rendering
/// layer. Construction and asset readiness live in the (excluded)
/// messaging subsystem; the engine only needs the readiness verdict.
#[derive(Debug, Clone)]
pub struct ImageMessage {
    response: JsonObject,
    ready: bool,
}

impl ImageMessage {
    pub fn new(response: JsonObject, ready: bool) -> Self {
        Self { response, ready }
    }

    /// Whether the backing asset has already been fetched
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The engagement-style response this message was built from
    pub fn response(&self) -> &JsonObject {
        &self.response
    }
}

/// Builds image messages from engagement-style responses.
///
/// Implemented by the messaging subsystem; returns `None` when the
/// response is not structurally valid as an image message.
pub trait ImageMessageResolver: Send + Sync {
    fn resolve(&self, response: &JsonObject) -> Option<ImageMessage>;
}

/// Delivers image-message actions to a callback.
///
/// Claims only when the resolver yields a valid, ready message; otherwise
/// the trigger stays unclaimed and any persisted payload is left in place
/// for a retry on a future event.
pub struct ImageMessageHandler {
    resolver: Arc<dyn ImageMessageResolver>,
    callback: Box<dyn Fn(ImageMessage) + Send + Sync>,
}

impl ImageMessageHandler {
    pub fn new(
        resolver: Arc<dyn ImageMessageResolver>,
        callback: impl Fn(ImageMessage) + Send + Sync + 'static,
    ) -> Self {
        Self {
            resolver,
            callback: Box::new(callback),
        }
    }
}

impl EventActionHandler for ImageMessageHandler {
    fn kind(&self) -> ActionKind {
        ActionKind::ImageMessage
    }

    fn handle(&self, trigger: &EventTrigger, store: &ActionStore) -> bool {
        if trigger.action_kind() != self.kind() {
            return false;
        }

        // Work on a copy so the trigger's own response stays untouched
        let mut response = trigger.response().clone();
        let persisted = store.get(trigger.campaign_id());
        if let Some(persisted) = &persisted {
            response.insert("parameters".to_string(), Value::Object(persisted.clone()));
        }

        match self.resolver.resolve(&response) {
            Some(message) if message.is_ready() => {
                if persisted.is_some() {
                    store.remove(trigger.campaign_id());
                }
                (self.callback)(message);
                true
            }
            _ => false,
        }
    }
}
