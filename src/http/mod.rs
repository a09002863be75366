//! Blocking JSON-over-HTTP plumbing shared by the embedding and chat clients.
//!
//! Requests are made exactly once: a failure is classified into a
//! [`ServiceError`] and handed back to the caller, which decides how the
//! failure surfaces (retrieval or generation).

#[cfg(test)]
mod tests;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Authentication rejected (HTTP {0})")]
    Unauthorized(u16),
    #[error("Rate limited by service (HTTP 429)")]
    RateLimited,
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Request timed out")]
    Timeout,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Build an agent whose requests are bounded by `timeout` end to end
#[inline]
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Resolve `path` against a service base URL, keeping any path prefix of the base
#[inline]
pub fn endpoint(base_url: &Url, path: &str) -> Result<Url, ServiceError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ServiceError::Transport(format!("Failed to build URL for {}: {}", path, e)))
}

/// POST `body` as JSON and decode the JSON response
#[inline]
pub fn post_json<Req, Resp>(
    agent: &ureq::Agent,
    url: &Url,
    api_key: Option<&str>,
    body: &Req,
) -> Result<Resp, ServiceError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let request_json = serde_json::to_string(body)
        .map_err(|e| ServiceError::Transport(format!("Failed to serialize request: {}", e)))?;

    debug!("POST {} ({} bytes)", url, request_json.len());

    let mut request = agent
        .post(url.as_str())
        .header("Content-Type", "application/json");
    if let Some(key) = api_key {
        request = request.header("Authorization", format!("Bearer {}", key));
    }

    let response_text = request
        .send(&request_json)
        .and_then(|mut resp| resp.body_mut().read_to_string())
        .map_err(classify)?;

    serde_json::from_str(&response_text).map_err(|e| ServiceError::MalformedResponse(e.to_string()))
}

/// GET `url` and return the raw body, used for reachability checks
#[inline]
pub fn get_text(
    agent: &ureq::Agent,
    url: &Url,
    api_key: Option<&str>,
) -> Result<String, ServiceError> {
    debug!("GET {}", url);

    let mut request = agent.get(url.as_str());
    if let Some(key) = api_key {
        request = request.header("Authorization", format!("Bearer {}", key));
    }

    request
        .call()
        .and_then(|mut resp| resp.body_mut().read_to_string())
        .map_err(classify)
}

fn classify(error: ureq::Error) -> ServiceError {
    match error {
        ureq::Error::StatusCode(status) => match status {
            401 | 403 => {
                warn!("Service rejected credentials (status {})", status);
                ServiceError::Unauthorized(status)
            }
            429 => {
                warn!("Service rate limit reached");
                ServiceError::RateLimited
            }
            _ => {
                warn!("Service returned status {}", status);
                ServiceError::Status(status)
            }
        },
        ureq::Error::Timeout(_) => {
            warn!("Service request timed out");
            ServiceError::Timeout
        }
        other => {
            warn!("Transport error: {}", other);
            ServiceError::Transport(other.to_string())
        }
    }
}
