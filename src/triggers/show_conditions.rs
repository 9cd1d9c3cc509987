//! Campaign show-conditions: execution-count-based fire gating

use serde_json::Value;

use crate::JsonObject;

/// A policy restricting how often a matched trigger is allowed to fire,
/// judged against the variant's durable execution count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerCondition {
    /// Fires exactly once, at the given execution count
    ExecutionCount { required: i64 },

    /// Fires every `interval`-th execution, optionally capped.
    ///
    /// `limit` is the maximum execution count at which this still fires,
    /// already multiplied out from the configured repeat-unit limit;
    /// -1 means unbounded.
    ExecutionRepeat { interval: i64, limit: i64 },
}

impl TriggerCondition {
    /// Whether a trigger gated by this condition may fire at the given
    /// execution count
    pub fn can_execute(&self, current_count: i64) -> bool {
        match *self {
            TriggerCondition::ExecutionCount { required } => current_count == required,
            TriggerCondition::ExecutionRepeat { interval, limit } => {
                if interval <= 0 {
                    return false;
                }
                if limit >= 0 && current_count > limit {
                    return false;
                }
                current_count != 0 && current_count % interval == 0
            }
        }
    }

    /// Parse a single `showConditions` entry. Unrecognized shapes yield
    /// `None` and are skipped.
    pub(crate) fn parse(entry: &JsonObject) -> Option<TriggerCondition> {
        if entry.contains_key("executionsRequiredCount") {
            let required = entry
                .get("executionsRequiredCount")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            return Some(TriggerCondition::ExecutionCount { required });
        }

        if entry.contains_key("executionsRepeat") {
            let interval = entry
                .get("executionsRepeat")
                .and_then(Value::as_i64)
                .unwrap_or(1);
            let limit = entry
                .get("executionsLimit")
                .or_else(|| entry.get("executionsRepeatLimit"))
                .and_then(Value::as_i64)
                .unwrap_or(-1);
            // The configured limit counts repeat units; store it as an
            // absolute execution count
            let limit = if limit > 0 { limit * interval } else { limit };
            return Some(TriggerCondition::ExecutionRepeat { interval, limit });
        }

        None
    }
}

/// Build the show-condition list from a campaign's execution config
pub(crate) fn parse_show_conditions(execution_config: &JsonObject) -> Vec<TriggerCondition> {
    let Some(entries) = execution_config
        .get("showConditions")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(TriggerCondition::parse)
        .collect()
}
