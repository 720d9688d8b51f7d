//! Alpaca REST adapters.
//!
//! Both adapters share one authenticated `reqwest` client; the key pair is
//! sent as `APCA-API-KEY-ID` / `APCA-API-SECRET-KEY` headers on every call.

pub mod data;
pub mod trading;

pub use data::AlpacaMarketData;
pub use trading::AlpacaBroker;

use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;

use crate::config::Credentials;

const USER_AGENT: &str = concat!("trendpilot/", env!("CARGO_PKG_VERSION"));

/// Errors building the HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("credential contains characters not allowed in a header")]
    InvalidCredential,

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Authenticated client with a 30 second timeout.
pub fn build_client(credentials: &Credentials) -> Result<reqwest::Client, ClientError> {
    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(&credentials.key_id).map_err(|_| ClientError::InvalidCredential)?;
    let mut secret =
        HeaderValue::from_str(&credentials.secret).map_err(|_| ClientError::InvalidCredential)?;
    secret.set_sensitive(true);
    headers.insert("APCA-API-KEY-ID", key);
    headers.insert("APCA-API-SECRET-KEY", secret);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Symbol as used in path segments (`BTC/USD` becomes `BTCUSD`).
pub(crate) fn path_symbol(symbol: &str) -> String {
    symbol.replace('/', "")
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
