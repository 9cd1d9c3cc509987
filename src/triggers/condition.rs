//! Postfix condition expression evaluation
//!
//! Server-delivered trigger conditions arrive as an array of tokens in
//! postfix order. Evaluation walks the tokens once with an explicit operand
//! stack: literals and event-parameter references push values, operator
//! tokens pop two operands and push a boolean. The operator applied is
//! picked by the runtime type of the right-hand operand; any type mismatch
//! or unknown operator aborts evaluation with a structured error, which the
//! trigger collapses to "did not match" at its public boundary.

use std::fmt;

use chrono::NaiveDateTime;
use serde_json::Value;
use thiserror::Error;

use crate::event::{parse_timestamp, GameEvent, ParamValue, EVENT_TIMESTAMP_FORMAT};

/// Structured evaluation failure. Never crosses the public trigger
/// boundary; see [`EventTrigger::evaluate`](super::EventTrigger::evaluate).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{left} and {right} have mismatched types")]
    MismatchedOperands { left: String, right: String },

    #[error("failed to find operation {op} for {left} and {right}")]
    UnknownOperator {
        op: String,
        left: String,
        right: String,
    },

    #[error("failed to find {0} in event params")]
    MissingParameter(String),

    #[error("failed converting {0} to a timestamp")]
    BadTimestamp(String),

    #[error("operator applied to an incomplete operand stack")]
    StackUnderflow,

    #[error("unexpected operand {0}")]
    UnexpectedOperand(String),
}

/// One parsed condition token.
#[derive(Debug, Clone)]
pub(crate) enum Token {
    /// `"o"`: operator name, matched case-insensitively at evaluation
    Operator(String),
    /// `"p"`: event parameter reference
    Param(String),
    /// `"b"`: boolean literal
    Bool(bool),
    /// `"i"`: integer literal
    Int(i64),
    /// `"f"`: float literal
    Float(f64),
    /// `"s"`: string literal
    Str(String),
    /// `"t"`: timestamp literal, parsed lazily so a bad value only fails
    /// evaluation, not trigger construction
    Timestamp(String),
    /// Anything else is pushed through unchanged and poisons any
    /// comparison it takes part in
    Raw(Value),
}

impl Token {
    /// Parse one raw token from the condition array
    pub(crate) fn parse(value: &Value) -> Token {
        let Some(token) = value.as_object() else {
            return Token::Raw(value.clone());
        };

        if let Some(op) = token.get("o").and_then(Value::as_str) {
            return Token::Operator(op.to_string());
        }
        if let Some(param) = token.get("p").and_then(Value::as_str) {
            return Token::Param(param.to_string());
        }
        if let Some(b) = token.get("b").and_then(Value::as_bool) {
            return Token::Bool(b);
        }
        if let Some(i) = token.get("i").and_then(Value::as_i64) {
            return Token::Int(i);
        }
        if let Some(f) = token.get("f") {
            // Whole-valued floats are serialized as integers
            if let Some(f) = f.as_f64() {
                return Token::Float(f);
            }
        }
        if let Some(s) = token.get("s").and_then(Value::as_str) {
            return Token::Str(s.to_string());
        }
        if let Some(t) = token.get("t").and_then(Value::as_str) {
            return Token::Timestamp(t.to_string());
        }

        Token::Raw(value.clone())
    }
}

/// An operand on the evaluation stack
#[derive(Debug, Clone)]
enum Operand {
    Value(ParamValue),
    Raw(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{}", v),
            Operand::Raw(v) => write!(f, "{}", v),
        }
    }
}

/// Comparison and logical operators usable in conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanEq,
    LessThan,
    LessThanEq,
    EqualToIc,
    NotEqualToIc,
    Contains,
    ContainsIc,
    StartsWith,
    StartsWithIc,
    EndsWith,
    EndsWithIc,
}

impl Op {
    /// Parse an operator name, case-insensitively
    fn parse(name: &str) -> Option<Op> {
        match name.to_lowercase().as_str() {
            "and" => Some(Op::And),
            "or" => Some(Op::Or),
            "equal to" => Some(Op::EqualTo),
            "not equal to" => Some(Op::NotEqualTo),
            "greater than" => Some(Op::GreaterThan),
            "greater than eq" => Some(Op::GreaterThanEq),
            "less than" => Some(Op::LessThan),
            "less than eq" => Some(Op::LessThanEq),
            "equal to ic" => Some(Op::EqualToIc),
            "not equal to ic" => Some(Op::NotEqualToIc),
            "contains" => Some(Op::Contains),
            "contains ic" => Some(Op::ContainsIc),
            "starts with" => Some(Op::StartsWith),
            "starts with ic" => Some(Op::StartsWithIc),
            "ends with" => Some(Op::EndsWith),
            "ends with ic" => Some(Op::EndsWithIc),
            _ => None,
        }
    }
}

/// Evaluate a parsed token stream against an event's parameters.
///
/// An empty token stream is vacuously true. A non-boolean final operand
/// evaluates to false.
pub(crate) fn evaluate(tokens: &[Token], event: &GameEvent) -> Result<bool, EvalError> {
    let mut stack: Vec<Operand> = Vec::new();

    for token in tokens {
        match token {
            Token::Operator(name) => {
                // Operands were pushed left first
                let right = stack.pop().ok_or(EvalError::StackUnderflow)?;
                let left = stack.pop().ok_or(EvalError::StackUnderflow)?;
                let result = apply(name, &left, &right)?;
                stack.push(Operand::Value(ParamValue::Bool(result)));
            }
            Token::Param(name) => {
                let value = event
                    .param(name)
                    .cloned()
                    .ok_or_else(|| EvalError::MissingParameter(name.clone()))?;
                stack.push(Operand::Value(value));
            }
            Token::Bool(b) => stack.push(Operand::Value(ParamValue::Bool(*b))),
            Token::Int(i) => stack.push(Operand::Value(ParamValue::Int(*i))),
            Token::Float(f) => stack.push(Operand::Value(ParamValue::Float(*f))),
            Token::Str(s) => stack.push(Operand::Value(ParamValue::Str(s.clone()))),
            Token::Timestamp(raw) => {
                let parsed =
                    parse_timestamp(raw).ok_or_else(|| EvalError::BadTimestamp(raw.clone()))?;
                stack.push(Operand::Value(ParamValue::Timestamp(parsed)));
            }
            Token::Raw(value) => stack.push(Operand::Raw(value.clone())),
        }
    }

    Ok(match stack.pop() {
        None => true,
        Some(Operand::Value(ParamValue::Bool(b))) => b,
        Some(_) => false,
    })
}

/// Apply an operator, dispatching on the type of the right operand
fn apply(name: &str, left: &Operand, right: &Operand) -> Result<bool, EvalError> {
    let right_value = match right {
        Operand::Value(value) => value,
        Operand::Raw(_) => return Err(EvalError::UnexpectedOperand(right.to_string())),
    };

    let mismatch = || EvalError::MismatchedOperands {
        left: left.to_string(),
        right: right.to_string(),
    };
    let unknown = || EvalError::UnknownOperator {
        op: name.to_string(),
        left: left.to_string(),
        right: right.to_string(),
    };

    let left_value = match left {
        Operand::Value(value) => value,
        Operand::Raw(_) => return Err(mismatch()),
    };

    let op = Op::parse(name).ok_or_else(unknown)?;

    let result = match (left_value, right_value) {
        (ParamValue::Bool(l), ParamValue::Bool(r)) => apply_bool(op, *l, *r),
        (ParamValue::Int(l), ParamValue::Int(r)) => apply_ord(op, l, r),
        // Intentionally exact IEEE comparison, no epsilon
        (ParamValue::Float(l), ParamValue::Float(r)) => apply_ord(op, l, r),
        (ParamValue::Str(l), ParamValue::Str(r)) => apply_str(op, l, r),
        (ParamValue::Timestamp(l), ParamValue::Timestamp(r)) => apply_ord(op, l, r),
        // A string parameter compared against a timestamp literal is
        // parsed with the event timestamp format
        (ParamValue::Str(l), ParamValue::Timestamp(r)) => {
            let l = NaiveDateTime::parse_from_str(l, EVENT_TIMESTAMP_FORMAT)
                .map_err(|_| EvalError::BadTimestamp(l.clone()))?;
            apply_ord(op, &l, r)
        }
        _ => return Err(mismatch()),
    };

    result.ok_or_else(unknown)
}

fn apply_bool(op: Op, left: bool, right: bool) -> Option<bool> {
    match op {
        Op::And => Some(left && right),
        Op::Or => Some(left || right),
        Op::EqualTo => Some(left == right),
        Op::NotEqualTo => Some(left != right),
        _ => None,
    }
}

fn apply_ord<T: PartialOrd>(op: Op, left: &T, right: &T) -> Option<bool> {
    match op {
        Op::EqualTo => Some(left == right),
        Op::NotEqualTo => Some(left != right),
        Op::GreaterThan => Some(left > right),
        Op::GreaterThanEq => Some(left >= right),
        Op::LessThan => Some(left < right),
        Op::LessThanEq => Some(left <= right),
        _ => None,
    }
}

fn apply_str(op: Op, left: &str, right: &str) -> Option<bool> {
    let left_lower = left.to_lowercase();
    let right_lower = right.to_lowercase();
    match op {
        Op::EqualTo => Some(left == right),
        Op::EqualToIc => Some(left.eq_ignore_ascii_case(right)),
        Op::NotEqualTo => Some(left != right),
        Op::NotEqualToIc => Some(!left.eq_ignore_ascii_case(right)),
        Op::Contains => Some(left.contains(right)),
        Op::ContainsIc => Some(left_lower.contains(&right_lower)),
        Op::StartsWith => Some(left.starts_with(right)),
        Op::StartsWithIc => Some(left_lower.starts_with(&right_lower)),
        Op::EndsWith => Some(left.ends_with(right)),
        Op::EndsWithIc => Some(left_lower.ends_with(&right_lower)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokens(values: Vec<Value>) -> Vec<Token> {
        values.iter().map(Token::parse).collect()
    }

    fn eval(values: Vec<Value>, event: &GameEvent) -> Result<bool, EvalError> {
        evaluate(&tokens(values), event)
    }

    #[test]
    fn test_empty_condition_is_true() {
        let event = GameEvent::new("e");
        assert_eq!(eval(vec![], &event), Ok(true));
    }

    #[test]
    fn test_integer_comparisons() {
        let event = GameEvent::new("e").with_param("score", 10);

        for (op, expected) in [
            ("equal to", false),
            ("not equal to", true),
            ("greater than", true),
            ("greater than eq", true),
            ("less than", false),
            ("less than eq", false),
        ] {
            let result = eval(
                vec![json!({"p": "score"}), json!({"i": 5}), json!({"o": op})],
                &event,
            );
            assert_eq!(result, Ok(expected), "op {}", op);
        }
    }

    #[test]
    fn test_operator_names_are_case_insensitive() {
        let event = GameEvent::new("e").with_param("score", 10);
        let result = eval(
            vec![
                json!({"p": "score"}),
                json!({"i": 10}),
                json!({"o": "EQUAL TO"}),
            ],
            &event,
        );
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn test_float_exact_equality() {
        let event = GameEvent::new("e").with_param("ratio", 0.5);
        let result = eval(
            vec![
                json!({"p": "ratio"}),
                json!({"f": 0.5}),
                json!({"o": "equal to"}),
            ],
            &event,
        );
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn test_whole_valued_float_literal_coerces() {
        // The serializer emits whole floats as integers
        let event = GameEvent::new("e").with_param("ratio", 2.0);
        let result = eval(
            vec![
                json!({"p": "ratio"}),
                json!({"f": 2}),
                json!({"o": "equal to"}),
            ],
            &event,
        );
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn test_string_operators() {
        let event = GameEvent::new("e").with_param("name", "Forest Temple");

        let cases = [
            ("equal to", "Forest Temple", true),
            ("equal to ic", "forest temple", true),
            ("not equal to", "Forest Temple", false),
            ("not equal to ic", "FOREST TEMPLE", false),
            ("contains", "Temp", true),
            ("contains", "temp", false),
            ("contains ic", "temp", true),
            ("starts with", "Forest", true),
            ("starts with ic", "forest", true),
            ("ends with", "Temple", true),
            ("ends with ic", "TEMPLE", true),
        ];
        for (op, literal, expected) in cases {
            let result = eval(
                vec![
                    json!({"p": "name"}),
                    json!({"s": literal}),
                    json!({"o": op}),
                ],
                &event,
            );
            assert_eq!(result, Ok(expected), "op {} literal {}", op, literal);
        }
    }

    #[test]
    fn test_boolean_logic() {
        let event = GameEvent::new("e")
            .with_param("a", true)
            .with_param("b", false);

        let result = eval(
            vec![
                json!({"p": "a"}),
                json!({"p": "b"}),
                json!({"o": "or"}),
            ],
            &event,
        );
        assert_eq!(result, Ok(true));

        let result = eval(
            vec![
                json!({"p": "a"}),
                json!({"p": "b"}),
                json!({"o": "and"}),
            ],
            &event,
        );
        assert_eq!(result, Ok(false));
    }

    #[test]
    fn test_timestamp_literal_against_string_param() {
        let event = GameEvent::new("e").with_param("joined", "2024-01-15 00:00:00.000");

        let result = eval(
            vec![
                json!({"p": "joined"}),
                json!({"t": "2024-06-01T00:00:00"}),
                json!({"o": "less than"}),
            ],
            &event,
        );
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn test_unparsable_timestamp_literal_fails() {
        let event = GameEvent::new("e").with_param("joined", "2024-01-15 00:00:00.000");
        let result = eval(
            vec![
                json!({"p": "joined"}),
                json!({"t": "whenever"}),
                json!({"o": "less than"}),
            ],
            &event,
        );
        assert_eq!(result, Err(EvalError::BadTimestamp("whenever".to_string())));
    }

    #[test]
    fn test_unparsable_string_param_against_timestamp_fails() {
        let event = GameEvent::new("e").with_param("joined", "not a timestamp");
        let result = eval(
            vec![
                json!({"p": "joined"}),
                json!({"t": "2024-06-01T00:00:00"}),
                json!({"o": "less than"}),
            ],
            &event,
        );
        assert!(matches!(result, Err(EvalError::BadTimestamp(_))));
    }

    #[test]
    fn test_missing_parameter_fails() {
        let event = GameEvent::new("e");
        let result = eval(
            vec![
                json!({"p": "score"}),
                json!({"i": 5}),
                json!({"o": "equal to"}),
            ],
            &event,
        );
        assert_eq!(result, Err(EvalError::MissingParameter("score".to_string())));
    }

    #[test]
    fn test_mismatched_operand_types_fail() {
        let event = GameEvent::new("e").with_param("score", 10);
        let result = eval(
            vec![
                json!({"p": "score"}),
                json!({"s": "10"}),
                json!({"o": "equal to"}),
            ],
            &event,
        );
        assert!(matches!(result, Err(EvalError::MismatchedOperands { .. })));
    }

    #[test]
    fn test_unknown_operator_for_type_fails() {
        let event = GameEvent::new("e").with_param("score", 10);
        // "contains" is a string operator; the operands resolve as integers
        let result = eval(
            vec![
                json!({"p": "score"}),
                json!({"i": 1}),
                json!({"o": "contains"}),
            ],
            &event,
        );
        assert!(matches!(result, Err(EvalError::UnknownOperator { .. })));
    }

    #[test]
    fn test_operator_without_operands_underflows() {
        let event = GameEvent::new("e");
        assert_eq!(
            eval(vec![json!({"o": "and"})], &event),
            Err(EvalError::StackUnderflow)
        );
    }

    #[test]
    fn test_unrecognized_token_poisons_comparison() {
        let event = GameEvent::new("e").with_param("a", 1);
        let result = eval(
            vec![
                json!({"p": "a"}),
                json!({"x": 1}),
                json!({"o": "equal to"}),
            ],
            &event,
        );
        assert!(matches!(result, Err(EvalError::UnexpectedOperand(_))));
    }

    #[test]
    fn test_non_boolean_final_operand_is_false() {
        let event = GameEvent::new("e");
        assert_eq!(eval(vec![json!({"i": 5})], &event), Ok(false));
    }

    #[test]
    fn test_complex_expression() {
        // c == "c" AND a < 15 AND b >= 15 OR d == true
        let event = GameEvent::new("a")
            .with_param("a", 10)
            .with_param("b", 5)
            .with_param("c", "c")
            .with_param("d", true);

        let result = eval(
            vec![
                json!({"p": "c"}),
                json!({"s": "c"}),
                json!({"o": "equal to"}),
                json!({"p": "a"}),
                json!({"i": 15}),
                json!({"o": "less than"}),
                json!({"o": "and"}),
                json!({"p": "b"}),
                json!({"i": 15}),
                json!({"o": "greater than eq"}),
                json!({"o": "and"}),
                json!({"p": "d"}),
                json!({"b": true}),
                json!({"o": "equal to"}),
                json!({"o": "or"}),
            ],
            &event,
        );
        assert_eq!(result, Ok(true));
    }
}
