//! Authentication token lifecycle against the order tracker.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

use super::client::{RawResponse, Transport, TransportRequest};

/// Tokens are valid for 8 hours upstream.
const TOKEN_LIFETIME_HOURS: i64 = 8;

#[derive(Debug, Clone)]
struct CachedToken {
  token: String,
  expires_at: DateTime<Utc>,
}

/// Owns the login exchange and the cached token.
///
/// `authenticate` logs in on first use and returns the cached token until it
/// expires; `invalidate` forces the next call to log in again. Consumed only
/// by the retrying client.
pub struct RemoteSession<T: Transport> {
  transport: Arc<T>,
  base_url: String,
  login: String,
  password: String,
  state: Arc<Mutex<Option<CachedToken>>>,
}

impl<T: Transport> Clone for RemoteSession<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      base_url: self.base_url.clone(),
      login: self.login.clone(),
      password: self.password.clone(),
      state: Arc::clone(&self.state),
    }
  }
}

impl<T: Transport> RemoteSession<T> {
  pub fn new(transport: Arc<T>, base_url: &str, login: &str, password: &str) -> Self {
    Self {
      transport,
      base_url: base_url.trim_end_matches('/').to_string(),
      login: login.to_string(),
      password: password.to_string(),
      state: Arc::new(Mutex::new(None)),
    }
  }

  /// Return a valid token, logging in if none is cached or it has expired.
  pub async fn authenticate(&self) -> ApiResult<String> {
    let mut state = self.state.lock().await;

    if let Some(cached) = state.as_ref() {
      if cached.expires_at > Utc::now() {
        return Ok(cached.token.clone());
      }
      debug!("cached token expired, logging in again");
    }

    let token = self.do_login().await?;
    *state = Some(CachedToken {
      token: token.clone(),
      expires_at: Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS),
    });

    Ok(token)
  }

  /// Drop the cached token so the next `authenticate` performs a fresh login.
  pub async fn invalidate(&self) {
    let mut state = self.state.lock().await;
    *state = None;
  }

  async fn do_login(&self) -> ApiResult<String> {
    let request = TransportRequest {
      method: reqwest::Method::POST,
      url: format!("{}/secure/auth_validate_login", self.base_url),
      token: None,
      body: Some(json!({ "login": self.login, "pwd": self.password })),
    };

    let RawResponse { status, body } = self.transport.send(request).await?;

    if !(200..300).contains(&status) {
      return Err(ApiError::Authentication {
        status,
        message: format!("login rejected: {}", body),
      });
    }

    let ok = body
      .get("result")
      .and_then(|v| v.as_bool())
      .unwrap_or(false);
    let token = body.get("token").and_then(|v| v.as_str());

    match (ok, token) {
      (true, Some(token)) if !token.is_empty() => Ok(token.to_string()),
      _ => Err(ApiError::Authentication {
        status,
        message: "login response carried no token".to_string(),
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::upstream::client::testing::ScriptedTransport;

  fn login_ok() -> RawResponse {
    RawResponse {
      status: 200,
      body: json!({ "result": true, "token": "tok-1" }),
    }
  }

  #[tokio::test]
  async fn caches_token_across_calls() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(login_ok())]));
    let session = RemoteSession::new(Arc::clone(&transport), "http://up", "svc", "pw");

    assert_eq!(session.authenticate().await.unwrap(), "tok-1");
    // Second call must not hit the transport again.
    assert_eq!(session.authenticate().await.unwrap(), "tok-1");
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn invalidate_forces_relogin() {
    let transport = Arc::new(ScriptedTransport::new(vec![
      Ok(login_ok()),
      Ok(RawResponse {
        status: 200,
        body: json!({ "result": true, "token": "tok-2" }),
      }),
    ]));
    let session = RemoteSession::new(Arc::clone(&transport), "http://up", "svc", "pw");

    assert_eq!(session.authenticate().await.unwrap(), "tok-1");
    session.invalidate().await;
    assert_eq!(session.authenticate().await.unwrap(), "tok-2");
    assert_eq!(transport.calls(), 2);
  }

  #[tokio::test]
  async fn failed_login_is_authentication_error() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawResponse {
      status: 401,
      body: json!({ "result": false }),
    })]));
    let session = RemoteSession::new(transport, "http://up", "svc", "bad");

    let err = session.authenticate().await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication { status: 401, .. }));
  }

  #[tokio::test]
  async fn tokenless_success_body_is_rejected() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawResponse {
      status: 200,
      body: json!({ "result": true }),
    })]));
    let session = RemoteSession::new(transport, "http://up", "svc", "pw");

    let err = session.authenticate().await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication { .. }));
  }
}
