//! Session registry of configured triggers

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::action::EventAction;
use super::trigger::EventTrigger;
use crate::event::{EventRecorder, GameEvent};
use crate::settings::Settings;
use crate::store::{ActionStore, ExecutionCountManager};

/// All triggers delivered with a session configuration, grouped by the
/// event name they listen for and sorted by priority.
///
/// Built once per session-configuration response; rebuilding on a config
/// refresh replaces the registry wholesale.
pub struct TriggerRegistry {
    triggers: HashMap<String, Vec<Arc<EventTrigger>>>,
}

impl TriggerRegistry {
    /// Build the registry from the server's `triggers` array.
    ///
    /// Trigger indices follow array order so equal priorities keep their
    /// configured ordering. Triggers flagged persistent have their
    /// parameters stored immediately so the action survives an
    /// interrupted session. Anything that is not an array yields an empty
    /// registry.
    pub fn from_config(
        config: &Value,
        counts: Arc<ExecutionCountManager>,
        recorder: Arc<dyn EventRecorder>,
        store: &ActionStore,
    ) -> Self {
        let entries = config.as_array().map(Vec::as_slice).unwrap_or_default();

        let mut triggers: HashMap<String, Vec<Arc<EventTrigger>>> = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            let trigger =
                EventTrigger::from_config(index, entry, counts.clone(), recorder.clone());

            if let Some(parameters) = trigger
                .response()
                .get("parameters")
                .and_then(Value::as_object)
            {
                let persistent = parameters
                    .get("ddnaIsPersistent")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if persistent {
                    store.put(trigger.campaign_id(), parameters);
                }
            }

            triggers
                .entry(trigger.event_name().to_string())
                .or_default()
                .push(Arc::new(trigger));
        }

        for group in triggers.values_mut() {
            group.sort_by(|a, b| (**a).cmp(b));
        }

        log::debug!(
            "Configured {} event trigger(s) across {} event name(s)",
            entries.len(),
            triggers.len()
        );

        Self { triggers }
    }

    /// An empty registry, for sessions without campaign configuration
    pub fn empty() -> Self {
        Self {
            triggers: HashMap::new(),
        }
    }

    /// The sorted triggers listening for an event name
    pub fn triggers_for(&self, event_name: &str) -> &[Arc<EventTrigger>] {
        self.triggers
            .get(event_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of configured triggers
    pub fn len(&self) -> usize {
        self.triggers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Build the action for a recorded event: its registered triggers, or
    /// an inert action when nothing listens for the event name.
    pub fn action_for(
        &self,
        event: GameEvent,
        store: Arc<ActionStore>,
        settings: Arc<Settings>,
    ) -> EventAction {
        let triggers = self.triggers_for(event.name()).to_vec();
        EventAction::new(event, triggers, store, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferences;
    use serde_json::json;
    use tempfile::tempdir;

    struct NullRecorder;
    impl EventRecorder for NullRecorder {
        fn record_event(&self, _event: GameEvent) {}
    }

    struct Fixture {
        counts: Arc<ExecutionCountManager>,
        store: ActionStore,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            Self {
                counts: Arc::new(ExecutionCountManager::new(dir.path().join("counts"))),
                store: ActionStore::new(
                    dir.path().join("actions"),
                    Arc::new(MemoryPreferences::new()),
                ),
                _dir: dir,
            }
        }

        fn registry(&self, config: Value) -> TriggerRegistry {
            TriggerRegistry::from_config(
                &config,
                self.counts.clone(),
                Arc::new(NullRecorder),
                &self.store,
            )
        }
    }

    #[test]
    fn test_groups_by_event_name() {
        let fixture = Fixture::new();
        let registry = fixture.registry(json!([
            { "eventName": "levelUp", "campaignID": 1 },
            { "eventName": "purchase", "campaignID": 2 },
            { "eventName": "levelUp", "campaignID": 3 },
        ]));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.triggers_for("levelUp").len(), 2);
        assert_eq!(registry.triggers_for("purchase").len(), 1);
        assert!(registry.triggers_for("unknown").is_empty());
    }

    #[test]
    fn test_groups_are_priority_sorted() {
        let fixture = Fixture::new();
        let registry = fixture.registry(json!([
            { "eventName": "e", "campaignID": 1, "priority": 0 },
            { "eventName": "e", "campaignID": 2, "priority": 5 },
            { "eventName": "e", "campaignID": 3, "priority": 5 },
        ]));

        let ids: Vec<i64> = registry
            .triggers_for("e")
            .iter()
            .map(|t| t.campaign_id())
            .collect();
        // Priority first, then configuration order for the tie
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_persistent_actions_are_stored() {
        let fixture = Fixture::new();
        fixture.registry(json!([
            {
                "eventName": "e",
                "campaignID": 42,
                "response": { "parameters": { "ddnaIsPersistent": true, "gold": 9 } },
            },
            {
                "eventName": "e",
                "campaignID": 43,
                "response": { "parameters": { "gold": 1 } },
            },
        ]));

        let persisted = fixture.store.get(42).unwrap();
        assert_eq!(persisted.get("gold"), Some(&json!(9)));
        assert!(fixture.store.get(43).is_none());
    }

    #[test]
    fn test_non_array_config_is_empty() {
        let fixture = Fixture::new();
        assert!(fixture.registry(json!({ "not": "an array" })).is_empty());
        assert!(TriggerRegistry::empty().is_empty());
    }
}
