//! Request types queued by the dispatcher.

use std::fmt;

use crate::vk::encoding::url_encode;
use crate::{Result, VkApiError};

/// Continuation invoked with the raw response body of a successful request.
///
/// Receives `None` when VK answered with an empty body.
pub type ResponseCallback = Box<dyn FnOnce(Option<String>) + Send + 'static>;

/// A VK API method call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VkMethod {
    /// `messages.send` to a single user.
    SendMessage {
        /// Recipient VK user id.
        user_id: String,
        /// Message text, unencoded.
        message: String,
    },
    /// `messages.search`, used as a connectivity probe.
    Search {
        /// Search query, unencoded.
        query: String,
        /// Maximum number of results.
        count: u32,
    },
}

impl VkMethod {
    /// Build a `messages.send` call.
    pub fn send_message(user_id: impl Into<String>, message: impl Into<String>) -> Result<Self> {
        let user_id = user_id.into();
        let message = message.into();
        if user_id.is_empty() {
            return Err(VkApiError::InvalidArgument("user_id is empty".to_string()));
        }
        if message.is_empty() {
            return Err(VkApiError::InvalidArgument("message is empty".to_string()));
        }
        Ok(VkMethod::SendMessage { user_id, message })
    }

    /// Build a `messages.search` call.
    pub fn search(query: impl Into<String>, count: u32) -> Result<Self> {
        let query = query.into();
        if query.is_empty() {
            return Err(VkApiError::InvalidArgument("query is empty".to_string()));
        }
        Ok(VkMethod::Search { query, count })
    }

    /// Method name as used in the URL path.
    pub fn name(&self) -> &'static str {
        match self {
            VkMethod::SendMessage { .. } => "messages.send",
            VkMethod::Search { .. } => "messages.search",
        }
    }

    /// Render the method path and query, e.g.
    /// `messages.send?user_id=1&message=hi%20there`.
    pub fn path(&self) -> String {
        match self {
            VkMethod::SendMessage { user_id, message } => format!(
                "{}?user_id={}&message={}",
                self.name(),
                user_id,
                url_encode(message)
            ),
            VkMethod::Search { query, count } => {
                format!("{}?count={}&q={}", self.name(), count, url_encode(query))
            }
        }
    }

    /// Recipient of the call, if it targets a user.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            VkMethod::SendMessage { user_id, .. } => Some(user_id.as_str()),
            VkMethod::Search { .. } => None,
        }
    }
}

impl fmt::Display for VkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A queued unit of work: a method call and its optional continuation.
pub struct VkRequest {
    method: VkMethod,
    on_response: Option<ResponseCallback>,
}

impl VkRequest {
    /// Create a request without a continuation.
    pub fn new(method: VkMethod) -> Self {
        Self {
            method,
            on_response: None,
        }
    }

    /// Attach the continuation run on success. Replaces any previous one.
    pub fn on_response<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Option<String>) + Send + 'static,
    {
        self.on_response = Some(Box::new(callback));
        self
    }

    /// The method this request calls.
    pub fn method(&self) -> &VkMethod {
        &self.method
    }

    /// Build the full request URL.
    pub fn url(&self, base: &str, api_version: &str, token: &str) -> String {
        format!(
            "{}/{}&v={}&access_token={}",
            base.trim_end_matches('/'),
            self.method.path(),
            api_version,
            token
        )
    }

    /// Consume the request, running its continuation with `body`.
    pub fn respond(self, body: Option<String>) {
        if let Some(callback) = self.on_response {
            callback(body);
        }
    }
}

impl fmt::Debug for VkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VkRequest")
            .field("method", &self.method)
            .field("has_callback", &self.on_response.is_some())
            .finish()
    }
}
