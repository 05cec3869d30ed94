use once_cell::sync::Lazy;
use reqwest::{header, Client};
use std::time::Duration;

/// Broker and search calls can be slow (OAuth-backed third-party APIs),
/// model calls even more so; individual clients override per request.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Process-wide HTTP client shared by the model, broker and search clients.
///
/// `Client::clone()` only bumps an `Arc`, so every collaborator keeps its own
/// clone and adds auth headers per request.
static SHARED_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("foreman-backend/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(5)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .expect("Failed to create shared HTTP client")
});

/// Returns a reference to the global shared HTTP client.
pub fn shared_client() -> &'static Client {
    &SHARED_CLIENT
}

/// JSON content-type headers plus one credential header.
pub fn json_headers(auth_header: &'static str, auth_value: &str) -> Result<header::HeaderMap, String> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    if !auth_value.is_empty() {
        let value = header::HeaderValue::from_str(auth_value)
            .map_err(|e| format!("Invalid {} header value: {}", auth_header, e))?;
        headers.insert(auth_header, value);
    }
    Ok(headers)
}
