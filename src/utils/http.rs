//! HTTP Client
//!
//! Async client used by the sync backend, plus JSON GET with status
//! mapping into `ImportError`.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::{ErrorCode, ImportError, ImportResult};

const USER_AGENT: &str = concat!("seed-import/", env!("CARGO_PKG_VERSION"));

/// Build a client with the given request timeout
pub fn build_client(timeout: Duration) -> ImportResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(5)
        .tcp_nodelay(true)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ImportError::network(format!("Failed to create HTTP client: {}", e)))
}

/// GET `url` and decode the JSON body
pub async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> ImportResult<T> {
    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        let code = if status.as_u16() == 408 || status.as_u16() == 504 {
            ErrorCode::Timeout
        } else {
            ErrorCode::NetworkError
        };
        return Err(ImportError::new(code, format!("HTTP {} from {}", status.as_u16(), extract_domain(url))));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ImportError::parse_error(format!("Failed to decode response: {}", e)))
}

/// Join a base URL and a path without doubling slashes
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Host part of a URL, for log lines
pub fn extract_domain(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
