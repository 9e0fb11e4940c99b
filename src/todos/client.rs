use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::types::{Action, Snapshot};
use crate::http::{Fetch, Method, Request};

/// Remote todo service as the action queue sees it.
///
/// Mutations report plain success/failure: transport errors and non-success
/// statuses are the same thing to the caller.
#[async_trait]
pub trait RemoteTodoService: Send + Sync {
  /// Fetch the full server snapshot.
  async fn list_all(&self) -> Result<Snapshot>;

  async fn create(&self, id: &str, task: &str) -> bool;

  async fn toggle(&self, id: &str) -> bool;

  async fn delete(&self, id: &str) -> bool;

  /// Deliver one action.
  async fn apply(&self, action: &Action) -> bool {
    match action {
      Action::Add { id, task, .. } => self.create(id, task).await,
      Action::Toggle { id } => self.toggle(id).await,
      Action::Delete { id } => self.delete(id).await,
    }
  }
}

#[derive(Serialize)]
struct CreateTodoBody<'a> {
  id: &'a str,
  task: &'a str,
}

/// HTTP client for the `/todos` collection resource.
#[derive(Clone)]
pub struct HttpTodoClient {
  fetcher: Arc<dyn Fetch>,
  root: String,
}

impl HttpTodoClient {
  /// `root` is the API root; requests go to `{root}/todos`.
  pub fn new(fetcher: Arc<dyn Fetch>, root: &str) -> Self {
    Self {
      fetcher,
      root: root.trim_end_matches('/').to_string(),
    }
  }

  fn collection_url(&self) -> String {
    format!("{}/todos", self.root)
  }

  /// `{root}/todos/{id}` with the id percent-encoded as one path segment.
  fn item_url(&self, id: &str) -> Result<String> {
    let mut url = url::Url::parse(&self.collection_url())
      .map_err(|e| eyre!("Invalid API url {}: {}", self.root, e))?;
    url
      .path_segments_mut()
      .map_err(|_| eyre!("API url cannot take a path: {}", self.root))?
      .push(id);
    Ok(url.into())
  }

  async fn send_to_item(&self, method: Method, id: &str) -> bool {
    match self.item_url(id) {
      Ok(url) => self.send_ok(Request::new(method, url)).await,
      Err(e) => {
        debug!(method = %method, id, "remote call not sent: {}", e);
        false
      }
    }
  }

  async fn send_ok(&self, request: Request) -> bool {
    let method = request.method.clone();
    let url = request.url.clone();

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        debug!(method = %method, url = %url, status = response.status, "remote call completed");
        response.ok()
      }
      Err(e) => {
        debug!(method = %method, url = %url, "remote call failed: {}", e);
        false
      }
    }
  }
}

#[async_trait]
impl RemoteTodoService for HttpTodoClient {
  async fn list_all(&self) -> Result<Snapshot> {
    let url = self.collection_url();
    let response = self.fetcher.fetch(Request::get(&url)).await?;

    if !response.ok() {
      return Err(eyre!(
        "Failed to list todos: status {} ({})",
        response.status,
        response.text()
      ));
    }

    response.json()
  }

  async fn create(&self, id: &str, task: &str) -> bool {
    let request = match Request::new(Method::Post, self.collection_url())
      .with_json(&CreateTodoBody { id, task })
    {
      Ok(request) => request,
      Err(_) => return false,
    };
    self.send_ok(request).await
  }

  async fn toggle(&self, id: &str) -> bool {
    self.send_to_item(Method::Patch, id).await
  }

  async fn delete(&self, id: &str) -> bool {
    self.send_to_item(Method::Delete, id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::Response;
  use std::sync::Mutex;

  struct Recorder {
    status: u16,
    body: &'static str,
    fail: bool,
    seen: Mutex<Vec<Request>>,
  }

  impl Recorder {
    fn new(status: u16, body: &'static str) -> Arc<Self> {
      Arc::new(Self {
        status,
        body,
        fail: false,
        seen: Mutex::new(Vec::new()),
      })
    }

    fn failing() -> Arc<Self> {
      Arc::new(Self {
        status: 0,
        body: "",
        fail: true,
        seen: Mutex::new(Vec::new()),
      })
    }
  }

  #[async_trait]
  impl Fetch for Recorder {
    async fn fetch(&self, request: Request) -> Result<Response> {
      self.seen.lock().unwrap().push(request);
      if self.fail {
        return Err(eyre!("offline"));
      }
      Ok(Response::new(self.status, self.body))
    }
  }

  #[tokio::test]
  async fn test_create_posts_id_and_task() {
    let recorder = Recorder::new(201, "");
    let client = HttpTodoClient::new(recorder.clone(), "http://api/");

    assert!(client.create("01J0", "buy milk").await);

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen[0].method, Method::Post);
    assert_eq!(seen[0].url, "http://api/todos");
    let body: serde_json::Value = serde_json::from_slice(seen[0].body.as_ref().unwrap()).unwrap();
    assert_eq!(body, serde_json::json!({ "id": "01J0", "task": "buy milk" }));
  }

  #[tokio::test]
  async fn test_toggle_and_delete_target_item() {
    let recorder = Recorder::new(200, "");
    let client = HttpTodoClient::new(recorder.clone(), "http://api");

    assert!(client.apply(&Action::Toggle { id: "7".into() }).await);
    assert!(client.apply(&Action::Delete { id: "7".into() }).await);

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen[0].method, Method::Patch);
    assert_eq!(seen[0].url, "http://api/todos/7");
    assert_eq!(seen[1].method, Method::Delete);
  }

  #[tokio::test]
  async fn test_item_ids_are_one_path_segment() {
    let recorder = Recorder::new(200, "");
    let client = HttpTodoClient::new(recorder.clone(), "http://api/v1");

    assert!(client.toggle("a/b?x").await);

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen[0].url, "http://api/v1/todos/a%2Fb%3Fx");
  }

  #[tokio::test]
  async fn test_failures_collapse_to_false() {
    let rejected = HttpTodoClient::new(Recorder::new(408, "Network error happened"), "http://api");
    assert!(!rejected.toggle("1").await);

    let offline = HttpTodoClient::new(Recorder::failing(), "http://api");
    assert!(!offline.delete("1").await);
    assert!(offline.list_all().await.is_err());
  }

  #[tokio::test]
  async fn test_list_all_decodes_mapping() {
    let body = r#"{"a":{"id":"a","task":"one","createdAt":"2024-05-01T10:00:00Z","completed":true}}"#;
    let client = HttpTodoClient::new(Recorder::new(200, body), "http://api");

    let snapshot = client.list_all().await.unwrap();
    assert!(snapshot["a"].completed);

    let missing = HttpTodoClient::new(Recorder::new(404, "Not found in cache"), "http://api");
    assert!(missing.list_all().await.is_err());
  }
}
