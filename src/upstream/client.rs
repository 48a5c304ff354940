//! HTTP client for the order tracker with retry and re-authentication.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

use super::api_types::{unwrap_envelope, RawOrder, RawPhoto, RawStatusEvent, RawSummary};
use super::session::RemoteSession;
use super::types::{Order, OrderStatus, PhotoRef, StatusEvent, SummaryCounts};

/// One request as seen by the transport layer.
#[derive(Debug, Clone)]
pub struct TransportRequest {
  pub method: reqwest::Method,
  pub url: String,
  pub token: Option<String>,
  pub body: Option<Value>,
}

/// Status code plus parsed body. A non-JSON body comes back as `Null`.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub status: u16,
  pub body: Value,
}

/// Seam between the retry logic and the wire, so tests can script responses.
pub trait Transport: Send + Sync + 'static {
  fn send(
    &self,
    request: TransportRequest,
  ) -> impl Future<Output = ApiResult<RawResponse>> + Send;
}

/// Real transport over reqwest.
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(timeout: Duration) -> ApiResult<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(ApiError::from_transport)?;
    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  fn send(
    &self,
    request: TransportRequest,
  ) -> impl Future<Output = ApiResult<RawResponse>> + Send {
    async move {
      let mut builder = self.client.request(request.method, &request.url);
      if let Some(token) = &request.token {
        builder = builder.header("token", token);
      }
      if let Some(body) = &request.body {
        builder = builder.json(body);
      }

      let response = builder.send().await.map_err(ApiError::from_transport)?;
      let status = response.status().as_u16();
      let body = response.json::<Value>().await.unwrap_or(Value::Null);

      Ok(RawResponse { status, body })
    }
  }
}

/// Retry budget for rate-limited calls. Injectable so tests can compress the
/// delays; production uses the defaults.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_secs(5),
    }
  }
}

/// Client that attaches the session token to every call and applies the
/// retry policy:
///
/// - 429: retried with a growing delay (`base_delay * attempt`) until the
///   budget runs out.
/// - 401/403: the token is invalidated and the request retried exactly once;
///   a second auth failure is fatal.
/// - any other non-2xx, or a transport failure: fatal immediately.
pub struct RetryingClient<T: Transport> {
  transport: Arc<T>,
  session: RemoteSession<T>,
  base_url: String,
  retry: RetryConfig,
}

impl<T: Transport> Clone for RetryingClient<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      session: self.session.clone(),
      base_url: self.base_url.clone(),
      retry: self.retry,
    }
  }
}

impl<T: Transport> RetryingClient<T> {
  pub fn new(transport: Arc<T>, session: RemoteSession<T>, base_url: &str, retry: RetryConfig) -> Self {
    Self {
      transport,
      session,
      base_url: base_url.trim_end_matches('/').to_string(),
      retry,
    }
  }

  /// Perform one request under the retry policy and return the raw body.
  pub async fn request(
    &self,
    method: reqwest::Method,
    endpoint: &str,
    body: Option<Value>,
  ) -> ApiResult<Value> {
    let url = format!("{}{}", self.base_url, endpoint);
    let mut attempt = 1u32;
    let mut reauthed = false;

    loop {
      let token = self.session.authenticate().await?;
      let response = self
        .transport
        .send(TransportRequest {
          method: method.clone(),
          url: url.clone(),
          token: Some(token),
          body: body.clone(),
        })
        .await?;

      match response.status {
        status if (200..300).contains(&status) => return Ok(response.body),
        429 => {
          if attempt >= self.retry.max_attempts {
            warn!(endpoint, attempts = attempt, "rate limit retry budget exhausted");
            return Err(ApiError::RateLimited { attempts: attempt });
          }
          let delay = self.retry.base_delay * attempt;
          debug!(endpoint, attempt, ?delay, "rate limited, backing off");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        status @ (401 | 403) => {
          if reauthed {
            return Err(ApiError::Authentication {
              status,
              message: "request rejected after re-login".to_string(),
            });
          }
          debug!(endpoint, status, "token rejected, invalidating session");
          self.session.invalidate().await;
          reauthed = true;
        }
        status => {
          return Err(ApiError::Upstream {
            status,
            message: extract_message(&response.body),
          });
        }
      }
    }
  }

  pub async fn get(&self, endpoint: &str) -> ApiResult<Value> {
    self.request(reqwest::Method::GET, endpoint, None).await
  }

  /// Fetch the per-status summary counts.
  pub async fn summary(&self) -> ApiResult<SummaryCounts> {
    let body = self.get("/redis/get_summary_order").await?;
    let raw: RawSummary = serde_json::from_value(unwrap_envelope(body)).unwrap_or_default();
    Ok(raw.into())
  }

  /// Fetch the raw order list for one status.
  pub async fn orders_by_status(&self, status: OrderStatus) -> ApiResult<Vec<Order>> {
    let body = self
      .get(&format!("/order/order_list_by_status/{}", status.id()))
      .await?;
    Ok(parse_records::<RawOrder>(unwrap_envelope(body))
      .into_iter()
      .map(Order::from)
      .collect())
  }

  /// Fetch a single order by upstream id.
  pub async fn order_detail(&self, id: &str) -> ApiResult<Option<Order>> {
    let body = self.get(&format!("/order/order_detail_by_id/{}", id)).await?;
    let raw: Option<RawOrder> = serde_json::from_value(unwrap_envelope(body)).ok();
    Ok(raw.map(Order::from))
  }

  /// Fetch the status-change history of one order.
  pub async fn order_history(&self, id: &str) -> ApiResult<Vec<StatusEvent>> {
    let body = self.get(&format!("/order/order_history_by_id/{}", id)).await?;
    Ok(parse_records::<RawStatusEvent>(unwrap_envelope(body))
      .into_iter()
      .map(StatusEvent::from)
      .collect())
  }

  /// Fetch photo references attached to one order.
  pub async fn order_photos(&self, id: &str) -> ApiResult<Vec<PhotoRef>> {
    let body = self.get(&format!("/order/order_photos/{}", id)).await?;
    Ok(parse_records::<RawPhoto>(unwrap_envelope(body))
      .into_iter()
      .map(PhotoRef::from)
      .collect())
  }
}

/// Decode an array payload element by element. A malformed record is dropped
/// rather than failing the whole list.
fn parse_records<R: DeserializeOwned>(payload: Value) -> Vec<R> {
  match payload {
    Value::Array(items) => items
      .into_iter()
      .filter_map(|item| serde_json::from_value(item).ok())
      .collect(),
    _ => Vec::new(),
  }
}

fn extract_message(body: &Value) -> String {
  body
    .get("message")
    .and_then(|m| m.as_str())
    .map(String::from)
    .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
pub mod testing {
  use super::*;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  /// Transport that replays a fixed script of responses.
  pub struct ScriptedTransport {
    script: Mutex<VecDeque<ApiResult<RawResponse>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
  }

  impl ScriptedTransport {
    pub fn new(script: Vec<ApiResult<RawResponse>>) -> Self {
      Self {
        script: Mutex::new(script.into()),
        calls: AtomicUsize::new(0),
        requests: Mutex::new(Vec::new()),
      }
    }

    pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }

    /// Endpoints hit so far, in order.
    pub fn urls(&self) -> Vec<String> {
      self.requests.lock().unwrap().iter().map(|r| r.url.clone()).collect()
    }
  }

  impl Transport for ScriptedTransport {
    fn send(
      &self,
      request: TransportRequest,
    ) -> impl Future<Output = ApiResult<RawResponse>> + Send {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.requests.lock().unwrap().push(request);
      let next = self
        .script
        .lock()
        .unwrap()
        .pop_front()
        .expect("scripted transport ran out of responses");
      async move { next }
    }
  }
}
