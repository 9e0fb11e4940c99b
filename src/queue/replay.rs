//! Replay of the action log over a server snapshot.

use crate::todos::types::{Action, Snapshot, Todo};

/// Compute the effective view: the snapshot with every pending action applied
/// in log order, sorted ascending by creation time.
///
/// The sort is stable, so todos created at the same instant keep their replay
/// order. `Toggle` and `Delete` on an id that is not present are no-ops, and
/// `Add` never overrides an id the server already knows.
pub fn replay(snapshot: Snapshot, actions: &[Action]) -> Vec<Todo> {
  let mut todos: Vec<Todo> = snapshot.into_values().collect();

  for action in actions {
    match action {
      Action::Add {
        id,
        task,
        created_at,
      } => {
        if !todos.iter().any(|t| &t.id == id) {
          todos.push(Todo {
            id: id.clone(),
            task: task.clone(),
            created_at: *created_at,
            completed: false,
          });
        }
      }
      Action::Toggle { id } => {
        if let Some(todo) = todos.iter_mut().find(|t| &t.id == id) {
          todo.completed = !todo.completed;
        }
      }
      Action::Delete { id } => {
        todos.retain(|t| &t.id != id);
      }
    }
  }

  todos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
  todos
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{DateTime, Utc};

  fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
  }

  fn add(id: &str, task: &str, created_at: &str) -> Action {
    Action::Add {
      id: id.to_string(),
      task: task.to_string(),
      created_at: at(created_at),
    }
  }

  fn server(id: &str, task: &str, created_at: &str, completed: bool) -> (String, Todo) {
    (
      id.to_string(),
      Todo {
        id: id.to_string(),
        task: task.to_string(),
        created_at: at(created_at),
        completed,
      },
    )
  }

  #[test]
  fn test_add_toggle_delete() {
    let snapshot = Snapshot::from([server("s1", "server", "2024-01-01T00:00:00Z", false)]);
    let actions = vec![
      add("l1", "local", "2024-01-02T00:00:00Z"),
      Action::Toggle { id: "l1".into() },
      Action::Toggle { id: "s1".into() },
      Action::Delete { id: "s1".into() },
    ];

    let todos = replay(snapshot, &actions);
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].id, "l1");
    assert!(todos[0].completed);
  }

  #[test]
  fn test_sorted_by_created_at() {
    let snapshot = Snapshot::from([
      server("a", "late", "2024-03-01T00:00:00Z", false),
      server("b", "early", "2024-01-01T00:00:00Z", true),
    ]);
    let actions = vec![add("c", "middle", "2024-02-01T00:00:00Z")];

    let tasks: Vec<_> = replay(snapshot, &actions)
      .into_iter()
      .map(|t| t.task)
      .collect();
    assert_eq!(tasks, vec!["early", "middle", "late"]);
  }

  #[test]
  fn test_equal_timestamps_keep_replay_order() {
    let actions = vec![
      add("z", "first", "2024-01-01T00:00:00Z"),
      add("a", "second", "2024-01-01T00:00:00Z"),
      add("m", "third", "2024-01-01T00:00:00Z"),
    ];

    let tasks: Vec<_> = replay(Snapshot::new(), &actions)
      .into_iter()
      .map(|t| t.task)
      .collect();
    assert_eq!(tasks, vec!["first", "second", "third"]);
  }

  #[test]
  fn test_missing_ids_are_noops() {
    let snapshot = Snapshot::from([server("s1", "kept", "2024-01-01T00:00:00Z", false)]);
    let actions = vec![
      Action::Toggle { id: "ghost".into() },
      Action::Delete { id: "ghost".into() },
    ];

    let todos = replay(snapshot.clone(), &actions);
    assert_eq!(todos, snapshot.into_values().collect::<Vec<_>>());
  }

  #[test]
  fn test_add_does_not_shadow_server_copy() {
    let snapshot = Snapshot::from([server("x", "from server", "2024-01-01T00:00:00Z", true)]);
    let actions = vec![add("x", "from log", "2024-01-01T00:00:00Z")];

    let todos = replay(snapshot, &actions);
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].task, "from server");
    assert!(todos[0].completed);
  }

  #[test]
  fn test_replay_is_deterministic() {
    let snapshot = Snapshot::from([server("s1", "a", "2024-01-01T00:00:00Z", false)]);
    let actions = vec![
      add("l1", "b", "2024-01-01T00:00:00Z"),
      Action::Toggle { id: "s1".into() },
    ];

    assert_eq!(
      replay(snapshot.clone(), &actions),
      replay(snapshot, &actions)
    );
  }
}
