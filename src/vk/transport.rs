//! HTTP transport used by the dispatcher.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::HttpConfig;
use crate::{Result, VkApiError};

/// Performs HTTP GET requests on behalf of the dispatcher.
///
/// Implementations return the response body on a successful status and an
/// error for connection failures or non-success statuses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Fetch `url` and return its body as text.
    async fn get(&self, url: &str) -> Result<String>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given HTTP settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| VkApiError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

/// Percent-escape ASCII control characters in `url`.
///
/// URL parsing silently strips tab, CR and LF, so line breaks in a message
/// would otherwise never reach VK.
fn escape_controls(url: &str) -> Cow<'_, str> {
    if !url.chars().any(|ch| ch.is_ascii_control()) {
        return Cow::Borrowed(url);
    }

    let mut result = String::with_capacity(url.len() + 8);
    for ch in url.chars() {
        if ch.is_ascii_control() {
            result.push_str(&format!("%{:02X}", ch as u32));
        } else {
            result.push(ch);
        }
    }
    Cow::Owned(result)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let url = escape_controls(url);
        let response = self.client.get(url.as_ref()).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(VkApiError::Http(format!("{} | {}", status, body)));
        }

        Ok(body)
    }
}
