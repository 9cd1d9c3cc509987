//! Game events and their parameter values

use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;

/// Format used when event parameters carry timestamps as strings
/// (e.g. "2024-03-01 12:30:00.000").
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Parse a timestamp from one of the accepted string forms.
///
/// Condition literals are produced by a server that is looser about the
/// format than recorded events are, so a few common shapes are accepted.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        EVENT_TIMESTAMP_FORMAT,
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.3f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    // Date-only values resolve to midnight
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// A single event parameter value.
///
/// Parameters are dynamically typed on the wire; this closed set covers
/// everything the condition evaluator knows how to compare.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(NaiveDateTime),
}

impl ParamValue {
    /// Name of the value's type family, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::Str(_) => "string",
            ParamValue::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
            ParamValue::Timestamp(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(value: NaiveDateTime) -> Self {
        ParamValue::Timestamp(value)
    }
}

/// A recorded game event: a name plus an ordered map of parameters.
///
/// Events are read-only once handed to trigger evaluation.
#[derive(Debug, Clone)]
pub struct GameEvent {
    name: String,
    params: IndexMap<String, ParamValue>,
}

impl GameEvent {
    /// Create a new event with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: IndexMap::new(),
        }
    }

    /// Add a parameter, replacing any previous value for the same name
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The event name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a parameter by name
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// All parameters in insertion order
    pub fn params(&self) -> &IndexMap<String, ParamValue> {
        &self.params
    }
}

/// Sink for events produced by the engine itself, such as the
/// trigger-fired tracking event. Implemented by the upload queue.
pub trait EventRecorder: Send + Sync {
    fn record_event(&self, event: GameEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = GameEvent::new("levelUp")
            .with_param("level", 5)
            .with_param("name", "Forest")
            .with_param("completed", true);

        assert_eq!(event.name(), "levelUp");
        assert_eq!(event.param("level"), Some(&ParamValue::Int(5)));
        assert_eq!(event.param("completed"), Some(&ParamValue::Bool(true)));
        assert!(event.param("missing").is_none());
    }

    #[test]
    fn test_params_keep_insertion_order() {
        let event = GameEvent::new("e")
            .with_param("z", 1)
            .with_param("a", 2)
            .with_param("m", 3);

        let keys: Vec<&str> = event.params().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01 12:30:00.250").is_some());
        assert!(parse_timestamp("2024-03-01 12:30:00").is_some());
        assert!(parse_timestamp("2024-03-01T12:30:00").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_parse_timestamp_date_only_is_midnight() {
        let parsed = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(parsed, parse_timestamp("2024-03-01 00:00:00").unwrap());
    }
}
