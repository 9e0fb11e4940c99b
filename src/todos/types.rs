use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recorded user intent, awaiting acknowledgement by the remote service.
///
/// Serialized with a `type` tag so the persisted log reads as
/// `{"type":"ADD","id":...,"task":...,"createdAt":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Action {
  Add {
    id: String,
    task: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
  },
  Toggle {
    id: String,
  },
  Delete {
    id: String,
  },
}

impl Action {
  /// New `Add` with a fresh ULID and the current time.
  pub fn add(task: impl Into<String>) -> Self {
    Action::Add {
      id: ulid::Ulid::new().to_string(),
      task: task.into(),
      created_at: Utc::now(),
    }
  }

  pub fn id(&self) -> &str {
    match self {
      Action::Add { id, .. } | Action::Toggle { id } | Action::Delete { id } => id,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Action::Add { .. } => "add",
      Action::Toggle { .. } => "toggle",
      Action::Delete { .. } => "delete",
    }
  }
}

/// A todo as the user sees it. Always derived, never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
  pub id: String,
  pub task: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub completed: bool,
}

impl Todo {
  #[allow(dead_code)]
  pub fn created_at_iso(&self) -> String {
    self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
  }
}

/// Authoritative remote state, keyed by todo id.
pub type Snapshot = BTreeMap<String, Todo>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_action_wire_format() {
    let action: Action = serde_json::from_str(
      r#"{"type":"ADD","id":"01J0","task":"buy milk","createdAt":"2024-05-01T10:00:00.000Z"}"#,
    )
    .unwrap();
    assert_eq!(action.id(), "01J0");
    assert_eq!(action.kind(), "add");

    let toggle = serde_json::to_value(Action::Toggle { id: "x".into() }).unwrap();
    assert_eq!(toggle, serde_json::json!({ "type": "TOGGLE", "id": "x" }));
  }

  #[test]
  fn test_add_ids_sort_by_creation() {
    let first = Action::add("a");
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = Action::add("b");
    assert!(first.id() < second.id());
  }

  #[test]
  fn test_todo_defaults_completed() {
    let todo: Todo =
      serde_json::from_str(r#"{"id":"1","task":"t","createdAt":"2024-05-01T10:00:00Z"}"#).unwrap();
    assert!(!todo.completed);
    assert_eq!(todo.created_at_iso(), "2024-05-01T10:00:00.000Z");
  }
}
