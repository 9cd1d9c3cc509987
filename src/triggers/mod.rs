//! Event-triggered campaign evaluation
//!
//! This module hosts the trigger engine: condition evaluation against
//! recorded events, campaign show conditions, per-session registries and
//! the handlers that deliver fired actions.

mod action;
mod condition;
mod handlers;
mod registry;
mod show_conditions;
mod trigger;

pub use action::EventAction;
pub use condition::EvalError;
pub use handlers::{
    EventActionHandler, GameParametersHandler, ImageMessage, ImageMessageHandler,
    ImageMessageResolver,
};
pub use registry::TriggerRegistry;
pub use show_conditions::TriggerCondition;
pub use trigger::{ActionKind, EventTrigger, TRIGGERED_ACTION_EVENT};
