//! Server-configured event triggers

use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde_json::Value;

use super::condition::{self, Token};
use super::show_conditions::{parse_show_conditions, TriggerCondition};
use crate::event::{EventRecorder, GameEvent};
use crate::store::ExecutionCountManager;
use crate::JsonObject;

/// Name of the synthetic tracking event recorded when a trigger fires
pub const TRIGGERED_ACTION_EVENT: &str = "ddnaEventTriggeredAction";

/// The kind of action a trigger delivers when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    GameParameters,
    ImageMessage,
}

impl ActionKind {
    /// Wire name of this action kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::GameParameters => "gameParameters",
            ActionKind::ImageMessage => "imageMessage",
        }
    }
}

/// One server-delivered trigger: an event name, a boolean condition over
/// event parameters, priority and fire limits, and an action payload.
///
/// Constructed once per session from the campaign configuration; only the
/// session run counter mutates afterwards.
pub struct EventTrigger {
    index: usize,
    event_name: String,
    response: JsonObject,
    priority: i64,
    limit: i64,
    tokens: Vec<Token>,
    campaign_id: i64,
    variant_id: i64,
    campaign_name: Option<String>,
    variant_name: Option<String>,
    show_conditions: Vec<TriggerCondition>,
    counts: Arc<ExecutionCountManager>,
    recorder: Arc<dyn EventRecorder>,
    /// Successful fires this session, capped by `limit`
    runs: AtomicI64,
}

impl EventTrigger {
    /// Build a trigger from one entry of the server's trigger array.
    ///
    /// Missing or mistyped fields fall back to documented defaults; a
    /// trigger is never rejected at construction time.
    pub fn from_config(
        index: usize,
        config: &Value,
        counts: Arc<ExecutionCountManager>,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        let empty = JsonObject::new();
        let config = config.as_object().unwrap_or(&empty);

        let event_name = config
            .get("eventName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let response = config
            .get("response")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let priority = config.get("priority").and_then(Value::as_i64).unwrap_or(0);
        let limit = config.get("limit").and_then(Value::as_i64).unwrap_or(-1);
        let tokens = config
            .get("condition")
            .and_then(Value::as_array)
            .map(|tokens| tokens.iter().map(Token::parse).collect())
            .unwrap_or_default();
        let campaign_id = config
            .get("campaignID")
            .and_then(Value::as_i64)
            .unwrap_or(-1);
        let variant_id = config
            .get("variantID")
            .and_then(Value::as_i64)
            .unwrap_or(-1);

        let event_params = response.get("eventParams").and_then(Value::as_object);
        let campaign_name = event_params
            .and_then(|p| p.get("responseEngagementName"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let variant_name = event_params
            .and_then(|p| p.get("responseVariantName"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let show_conditions = config
            .get("campaignExecutionConfig")
            .and_then(Value::as_object)
            .map(parse_show_conditions)
            .unwrap_or_default();

        Self {
            index,
            event_name,
            response,
            priority,
            limit,
            tokens,
            campaign_id,
            variant_id,
            campaign_name,
            variant_name,
            show_conditions,
            counts,
            recorder,
            runs: AtomicI64::new(0),
        }
    }

    /// The event name this trigger listens for
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The campaign that produced this trigger
    pub fn campaign_id(&self) -> i64 {
        self.campaign_id
    }

    /// The campaign variant that produced this trigger
    pub fn variant_id(&self) -> i64 {
        self.variant_id
    }

    /// The action payload delivered when this trigger fires
    pub fn response(&self) -> &JsonObject {
        &self.response
    }

    /// How many times this trigger has fired this session
    pub fn session_runs(&self) -> i64 {
        self.runs.load(AtomicOrdering::SeqCst)
    }

    /// What kind of action this trigger delivers: an image message when
    /// the response carries a non-empty `image` object, game parameters
    /// otherwise. Pure, no side effects.
    pub fn action_kind(&self) -> ActionKind {
        let has_image = self
            .response
            .get("image")
            .and_then(Value::as_object)
            .is_some_and(|image| !image.is_empty());
        if has_image {
            ActionKind::ImageMessage
        } else {
            ActionKind::GameParameters
        }
    }

    /// Decide whether this trigger fires for the given event.
    ///
    /// A fire requires, in order: matching event name, the condition
    /// expression evaluating to true, a show-condition (if any) being
    /// satisfied, and the session run limit not being exhausted. The
    /// variant's durable execution count is incremented on every
    /// expression match, before show-conditions are consulted, so the Nth
    /// match (not the Nth fire) is what show-conditions count.
    ///
    /// On a fire the tracking event is handed to the recorder. Malformed
    /// conditions are logged and treated as a non-match; this never
    /// panics or propagates an error.
    pub fn evaluate(&self, event: &GameEvent) -> bool {
        if event.name() != self.event_name {
            return false;
        }

        match condition::evaluate(&self.tokens, event) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                log::warn!("Condition for campaign {}: {}", self.campaign_id, err);
                return false;
            }
        }

        self.counts.increment_execution_count(self.variant_id);

        // One satisfied show-condition is enough; none configured means
        // always reached
        let mut conditions_reached = self.show_conditions.is_empty();
        let current_count = self.counts.execution_count(self.variant_id);
        for show_condition in &self.show_conditions {
            if show_condition.can_execute(current_count) {
                conditions_reached = true;
            }
        }
        if !conditions_reached {
            return false;
        }

        if self.limit != -1 && self.runs.load(AtomicOrdering::SeqCst) >= self.limit {
            return false;
        }
        let runs = self.runs.fetch_add(1, AtomicOrdering::SeqCst) + 1;

        let mut tracking = GameEvent::new(TRIGGERED_ACTION_EVENT)
            .with_param("ddnaEventTriggeredCampaignID", self.campaign_id)
            .with_param("ddnaEventTriggeredCampaignPriority", self.priority)
            .with_param("ddnaEventTriggeredVariantID", self.variant_id)
            .with_param("ddnaEventTriggeredActionType", self.action_kind().as_str())
            .with_param("ddnaEventTriggeredSessionCount", runs);
        if let Some(name) = &self.campaign_name {
            tracking = tracking.with_param("ddnaEventTriggeredCampaignName", name.clone());
        }
        if let Some(name) = &self.variant_name {
            tracking = tracking.with_param("ddnaEventTriggeredVariantName", name.clone());
        }
        self.recorder.record_event(tracking);

        true
    }
}

impl PartialEq for EventTrigger {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.index == other.index
    }
}

impl Eq for EventTrigger {}

impl PartialOrd for EventTrigger {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTrigger {
    /// Higher priority sorts first; construction order breaks ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(self.index.cmp(&other.index))
    }
}
