//! Events emitted by the dispatcher.
//!
//! Hosts observe the dispatcher by subscribing to an [`EventBus`]. Every
//! request outcome is reported here; request continuations only ever see
//! successes.

use std::fmt;

use tokio::sync::broadcast;

/// Maximum number of events buffered per subscriber.
pub const EVENT_CAPACITY: usize = 256;

/// Kind of failure reported in a [`VkErrorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection failure or non-success HTTP status.
    Network,
    /// No community token configured.
    MissingToken,
    /// VK rejected the call.
    Api,
    /// The recipient has not allowed messages from the community.
    Disallowed,
}

impl ErrorKind {
    /// Numeric code for hosts that route on a byte.
    pub fn code(&self) -> u8 {
        match self {
            ErrorKind::Network => 1,
            ErrorKind::MissingToken => 2,
            ErrorKind::Api => 3,
            ErrorKind::Disallowed => 4,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::MissingToken => "missing-token",
            ErrorKind::Api => "api",
            ErrorKind::Disallowed => "disallowed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VkErrorEvent {
    /// Failure kind.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub description: String,
    /// VK error code, for `Api` and `Disallowed`.
    pub api_code: Option<i64>,
    /// Recipient the failed request targeted, when known.
    pub user_id: Option<String>,
}

impl VkErrorEvent {
    /// Create an error event without API details.
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            api_code: None,
            user_id: None,
        }
    }

    /// Attach a VK error code.
    pub fn with_api_code(mut self, code: Option<i64>) -> Self {
        self.api_code = code;
        self
    }

    /// Attach the recipient id.
    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }
}

/// Something the dispatcher reports to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VkEvent {
    /// The startup probe succeeded.
    Connected,
    /// A message was accepted by VK.
    MessageSent {
        /// Recipient VK user id.
        user_id: String,
        /// Message text as given by the caller.
        message: String,
    },
    /// A request failed.
    Error(VkErrorEvent),
}

/// Broadcast channel carrying [`VkEvent`]s to any number of observers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VkEvent>,
}

impl EventBus {
    /// Create a new event bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Register an observer. Only events emitted after this call are received.
    ///
    /// Each observer buffers at most [`EVENT_CAPACITY`] events. An observer
    /// that falls further behind loses the oldest ones; its next `recv`
    /// returns `RecvError::Lagged(n)` with the number skipped, then resumes
    /// with the oldest event still buffered. Observers that must see every
    /// error should drain promptly and treat `Lagged` as lost reports.
    pub fn subscribe(&self) -> broadcast::Receiver<VkEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. Having no observers is not an error.
    pub fn emit(&self, event: VkEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of active observers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
