// SPDX-License-Identifier: MIT

//! Folding the client's state and conversation into the run input

use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::adk::action::Action;
use crate::adk::error::{CoagentError, Result};
use crate::adk::message::Message;
use crate::coagent::config::DEFAULT_ACTIONS_STATE_KEY;

/// Combines `(state, messages, actions)` into the state handed to the engine
pub type MergeStateFn = Arc<dyn Fn(&Value, &[Message], &[Action]) -> Result<Value> + Send + Sync>;

/// Default merge, attaching actions under the standard state key
pub fn default_merge_state(state: &Value, messages: &[Message], actions: &[Action]) -> Result<Value> {
    merge_state(state, messages, actions, DEFAULT_ACTIONS_STATE_KEY)
}

/// Default merge attaching the action catalog under `actions_key`
pub fn merge_state_with_key(actions_key: impl Into<String>) -> MergeStateFn {
    let actions_key = actions_key.into();
    Arc::new(move |state: &Value, messages: &[Message], actions: &[Action]| {
        merge_state(state, messages, actions, &actions_key)
    })
}

pub(crate) fn merge_state(
    state: &Value,
    messages: &[Message],
    actions: &[Action],
    actions_key: &str,
) -> Result<Value> {
    let mut merged = match state {
        Value::Object(values) => values.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(CoagentError::merge_state(format!(
                "state must be an object, got {}",
                type_name(other)
            )))
        }
    };

    let mut history = match merged.remove("messages") {
        Some(Value::Array(existing)) => existing,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(CoagentError::merge_state(format!(
                "state.messages must be an array, got {}",
                type_name(&other)
            )))
        }
    };

    let mut known: HashSet<String> = history
        .iter()
        .filter_map(|m| m.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    // The client always sends its system prompt first; the graph owns its own
    let inbound = match messages.first() {
        Some(first) if first.is_system() => &messages[1..],
        _ => messages,
    };

    for message in inbound {
        if known.insert(message.id.clone()) {
            history.push(serde_json::to_value(message)?);
        }
    }

    merged.insert("messages".to_string(), Value::Array(history));
    merged.insert(actions_key.to_string(), json!({ "actions": actions }));
    Ok(Value::Object(merged))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::action::ActionParameter;

    fn ids(state: &Value) -> Vec<&str> {
        state["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_leading_system_message_dropped() {
        let messages = vec![
            Message::system("s1", "You are helpful"),
            Message::user("m1", "Hi"),
        ];
        let merged = default_merge_state(&json!({}), &messages, &[]).unwrap();
        assert_eq!(ids(&merged), vec!["m1"]);
    }

    #[test]
    fn test_later_system_message_kept() {
        let messages = vec![Message::user("m1", "Hi"), Message::system("s1", "Be brief")];
        let merged = default_merge_state(&json!({}), &messages, &[]).unwrap();
        assert_eq!(ids(&merged), vec!["m1", "s1"]);
    }

    #[test]
    fn test_known_ids_not_appended_twice() {
        let state = json!({
            "messages": [{"id": "m1", "role": "user", "content": "Hi"}],
            "outline": "A fox"
        });
        let messages = vec![
            Message::user("m1", "Hi (edited)"),
            Message::assistant("m2", "Hello"),
        ];
        let merged = default_merge_state(&state, &messages, &[]).unwrap();
        assert_eq!(ids(&merged), vec!["m1", "m2"]);
        // Identity wins over content
        assert_eq!(merged["messages"][0]["content"], json!("Hi"));
        assert_eq!(merged["outline"], json!("A fox"));
    }

    #[test]
    fn test_duplicates_within_batch_appended_once() {
        let messages = vec![Message::user("m1", "first"), Message::user("m1", "second")];
        let merged = default_merge_state(&Value::Null, &messages, &[]).unwrap();
        assert_eq!(ids(&merged), vec!["m1"]);
        assert_eq!(merged["messages"][0]["content"], json!("first"));
    }

    #[test]
    fn test_actions_attached() {
        let action = Action::new("setBackground", "Change the page background")
            .with_parameter(ActionParameter::string("color", "CSS color"));
        let merged = default_merge_state(&json!({}), &[], &[action]).unwrap();
        assert_eq!(merged["copilotkit"]["actions"][0]["name"], json!("setBackground"));
        assert_eq!(
            merged["copilotkit"]["actions"][0]["parameters"][0]["type"],
            json!("string")
        );
    }

    #[test]
    fn test_custom_actions_key() {
        let merge = merge_state_with_key("ui");
        let merged = merge(&json!({}), &[], &[]).unwrap();
        assert_eq!(merged["ui"], json!({"actions": []}));
        assert!(merged.get("copilotkit").is_none());
    }

    #[test]
    fn test_rejects_non_object_state() {
        assert!(matches!(
            default_merge_state(&json!([1]), &[], &[]),
            Err(CoagentError::MergeState(_))
        ));
        assert!(matches!(
            default_merge_state(&json!({"messages": "oops"}), &[], &[]),
            Err(CoagentError::MergeState(_))
        ));
    }
}
