//! Transport-level request/response model and the network fetcher.
//!
//! Everything that leaves the process goes through a [`Fetch`] implementation.
//! The cache policy engine is itself a `Fetch` wrapping the network one, so the
//! todo client never knows whether a response came from the wire or the cache.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::fmt;
use std::time::Duration;

pub const CONTENT_TYPE: &str = "content-type";

/// HTTP method token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Patch,
  Delete,
  Other(String),
}

impl Method {
  /// Parse a method token, case-insensitively.
  #[allow(dead_code)]
  pub fn parse(token: &str) -> Self {
    match token.to_ascii_uppercase().as_str() {
      "GET" => Self::Get,
      "HEAD" => Self::Head,
      "POST" => Self::Post,
      "PUT" => Self::Put,
      "PATCH" => Self::Patch,
      "DELETE" => Self::Delete,
      other => Self::Other(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Get => "GET",
      Self::Head => "HEAD",
      Self::Post => "POST",
      Self::Put => "PUT",
      Self::Patch => "PATCH",
      Self::Delete => "DELETE",
      Self::Other(token) => token.as_str(),
    }
  }

  /// Only `GET` is answered from cache; every other method is mutating.
  pub fn is_read(&self) -> bool {
    matches!(self, Self::Get)
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

impl Request {
  pub fn new(method: Method, url: impl Into<String>) -> Self {
    Self {
      method,
      url: url.into(),
      headers: Vec::new(),
      body: None,
    }
  }

  pub fn get(url: impl Into<String>) -> Self {
    Self::new(Method::Get, url)
  }

  /// Attach a JSON body and the matching content type.
  pub fn with_json<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
    let body = serde_json::to_vec(value).map_err(|e| eyre!("Failed to encode body: {}", e))?;
    self
      .headers
      .push((CONTENT_TYPE.to_string(), "application/json".to_string()));
    self.body = Some(body);
    Ok(self)
  }

  /// Identity used to look the request up in the cache.
  pub fn cache_key(&self) -> String {
    format!("{} {}", self.method, self.url)
  }
}

/// Completed response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: body.into(),
    }
  }

  pub fn plain_text(status: u16, body: &str) -> Self {
    Self {
      status,
      headers: vec![(CONTENT_TYPE.to_string(), "text/plain".to_string())],
      body: body.as_bytes().to_vec(),
    }
  }

  /// 2xx status.
  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  #[allow(dead_code)]
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
    serde_json::from_slice(&self.body).map_err(|e| eyre!("Failed to decode response body: {}", e))
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// Something that can turn a request into a response.
///
/// `Err` means the request never completed (transport failure). A completed
/// response with a failing status is still `Ok`.
#[async_trait]
pub trait Fetch: Send + Sync {
  async fn fetch(&self, request: Request) -> Result<Response>;
}

/// Network fetcher backed by reqwest.
#[derive(Clone)]
pub struct ReqwestFetcher {
  client: reqwest::Client,
}

impl ReqwestFetcher {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Fetch for ReqwestFetcher {
  async fn fetch(&self, request: Request) -> Result<Response> {
    let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
      .map_err(|e| eyre!("Invalid method {}: {}", request.method, e))?;

    let mut builder = self.client.request(method, &request.url);
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = request.body {
      builder = builder.body(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("{} {} failed: {}", request.method, request.url, e))?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
      .collect();
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response body from {}: {}", request.url, e))?
      .to_vec();

    Ok(Response {
      status,
      headers,
      body,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_method_parse_is_case_insensitive() {
    assert_eq!(Method::parse("get"), Method::Get);
    assert_eq!(Method::parse("Patch"), Method::Patch);
    assert_eq!(Method::parse("purge"), Method::Other("PURGE".to_string()));
  }

  #[test]
  fn test_read_class() {
    assert!(Method::Get.is_read());
    assert!(Method::parse("get").is_read());
    assert!(!Method::Head.is_read());
    assert!(!Method::Post.is_read());
    assert!(!Method::Delete.is_read());
    assert!(!Method::Other("OPTIONS".to_string()).is_read());
  }

  #[test]
  fn test_ok_range() {
    assert!(Response::new(200, "").ok());
    assert!(Response::new(204, "").ok());
    assert!(!Response::new(304, "").ok());
    assert!(!Response::new(500, "").ok());
  }

  #[test]
  fn test_json_body_sets_content_type() {
    let request = Request::new(Method::Post, "http://localhost/todos")
      .with_json(&serde_json::json!({ "id": "a" }))
      .unwrap();
    assert_eq!(request.headers[0].1, "application/json");
    assert_eq!(request.body.as_deref(), Some(br#"{"id":"a"}"#.as_slice()));
  }
}
