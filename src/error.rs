//! Error taxonomy for upstream calls.
//!
//! The retry layer needs to tell rate limiting apart from auth failures and
//! plain upstream errors, so these are typed rather than stringly reported.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  /// Login or token validation failed. Not retried beyond one re-login.
  #[error("authentication failed ({status}): {message}")]
  Authentication { status: u16, message: String },

  /// Upstream returned 429 and the retry budget is exhausted.
  #[error("rate limited by upstream after {attempts} attempts")]
  RateLimited { attempts: u32 },

  /// Any other non-2xx response, or a transport failure/timeout.
  #[error("upstream error ({status}): {message}")]
  Upstream { status: u16, message: String },
}

impl ApiError {
  /// Map a transport-level failure onto the taxonomy. Timeouts and
  /// connection errors count as upstream errors (status 0) and are not
  /// retried by the client layer.
  pub fn from_transport(err: reqwest::Error) -> Self {
    let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
    let message = if err.is_timeout() {
      "request timed out".to_string()
    } else {
      err.to_string()
    };
    ApiError::Upstream { status, message }
  }

  /// True when the user-facing message should say the upstream is
  /// unreachable rather than that the range held no data.
  pub fn is_offline(&self) -> bool {
    matches!(self, ApiError::Upstream { status: 0, .. })
  }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
