//! Shared HTTP client and response-validation helpers.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::error::FlowError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// No client-wide timeout is set: deadlines are the caller's responsibility,
/// and workflow runs routinely stream for minutes.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-2xx response to an error, preferring the structured
/// `{message, code}` body the upstream emits.
pub fn status_to_error(status: u16, body: &str) -> FlowError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => FlowError::Api {
            status,
            message: parsed.message,
            code: parsed.code,
        },
        Err(_) => FlowError::api(
            status,
            if body.is_empty() { "request failed" } else { body },
        ),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}
