//! Test helpers for dispatcher integration tests.
//!
//! Provides a scripted, recording HTTP transport and event helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::timeout;

use vkapi::{
    Dispatcher, DispatcherSettings, EventBus, HttpTransport, Result, VkApiError, VkEvent,
};

/// Default timeout for waiting on events.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Post-request delay used by tests.
pub const TEST_POST_DELAY: Duration = Duration::from_millis(10);

/// Body VK returns for a successful call.
pub const OK_BODY: &str = r#"{"response":1}"#;

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Fail(String),
}

impl Reply {
    pub fn body(body: &str) -> Self {
        Reply::Body(body.to_string())
    }
}

/// Transport that replays scripted replies and records every URL it is asked for.
///
/// Once the script runs out it answers with [`OK_BODY`].
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
    call_times: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            call_times: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency,
        })
    }

    /// Queue a reply for the next unanswered call.
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// When each call started, in order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of concurrent `get` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.call_times.lock().unwrap().push(Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self.replies.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fail(msg)) => Err(VkApiError::Http(msg)),
            None => Ok(OK_BODY.to_string()),
        }
    }
}

/// Test settings: a token and a short post-delay.
pub fn test_settings() -> DispatcherSettings {
    DispatcherSettings::new("test-token")
        .with_api_url("https://api.vk.test/method")
        .with_post_delay(TEST_POST_DELAY)
}

/// Spawn a dispatcher with an observer registered before the probe runs.
pub fn start(
    settings: DispatcherSettings,
    transport: Arc<MockTransport>,
) -> (Dispatcher, broadcast::Receiver<VkEvent>) {
    let events = EventBus::new();
    let receiver = events.subscribe();
    let dispatcher = Dispatcher::spawn(settings, transport, events);
    (dispatcher, receiver)
}

/// Receive the next event or panic after [`DEFAULT_TIMEOUT`].
pub async fn next_event(receiver: &mut broadcast::Receiver<VkEvent>) -> VkEvent {
    timeout(DEFAULT_TIMEOUT, receiver.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Wait until `condition` holds, polling every few milliseconds.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    timeout(DEFAULT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

/// Assert that no event arrives within `wait`.
pub async fn assert_no_event(receiver: &mut broadcast::Receiver<VkEvent>, wait: Duration) {
    if let Ok(Ok(event)) = timeout(wait, receiver.recv()).await {
        panic!("unexpected event: {event:?}");
    }
}
