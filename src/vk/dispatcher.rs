//! Throttled request queue for the VK API.
//!
//! A [`Dispatcher`] owns a single background task that drains an unbounded
//! FIFO queue one request at a time, waiting a fixed delay after each one.
//! There is never more than one HTTP call in flight per dispatcher.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::VkConfig;
use crate::vk::events::{ErrorKind, EventBus, VkErrorEvent, VkEvent};
use crate::vk::request::{VkMethod, VkRequest};
use crate::vk::response::{classify, ApiError, Classification};
use crate::vk::transport::HttpTransport;
use crate::{Result, VkApiError};

/// Default delay after each request.
pub const DEFAULT_POST_DELAY: Duration = Duration::from_millis(500);

/// Settings the drain loop needs to build and throttle requests.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Community access token.
    pub token: String,
    /// Base URL of the method endpoint.
    pub api_url: String,
    /// API version sent with every request.
    pub api_version: String,
    /// Delay after each request, whatever its outcome.
    pub post_delay: Duration,
    /// Log disallowed recipients at debug level instead of warn.
    pub mute_disallowed_warning: bool,
}

impl DispatcherSettings {
    /// Settings with the given token and VK defaults for everything else.
    pub fn new(token: impl Into<String>) -> Self {
        Self::from_config(&VkConfig {
            token: token.into(),
            ..VkConfig::default()
        })
    }

    /// Build settings from the `[vk]` config section.
    pub fn from_config(config: &VkConfig) -> Self {
        Self {
            token: config.token.clone(),
            api_url: config.api_url.clone(),
            api_version: config.api_version.clone(),
            post_delay: config.post_delay(),
            mute_disallowed_warning: config.mute_disallowed_warning,
        }
    }

    /// Override the post-request delay.
    pub fn with_post_delay(mut self, delay: Duration) -> Self {
        self.post_delay = delay;
        self
    }

    /// Override the base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set whether disallowed recipients are logged quietly.
    pub fn with_mute_disallowed_warning(mut self, mute: bool) -> Self {
        self.mute_disallowed_warning = mute;
        self
    }
}

/// Queue state shared between the handle and the drain task.
#[derive(Debug, Default)]
struct QueueState {
    pending: AtomicUsize,
    busy: AtomicBool,
}

/// Decrement a queue counter, stopping at zero.
///
/// `close` resets `pending` to zero while `enqueue` may still be unwinding
/// its own increment, so a plain `fetch_sub` could wrap.
fn decrement(counter: &AtomicUsize) {
    let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
        Some(n.saturating_sub(1))
    });
}

/// Handle to a running dispatcher.
///
/// Dropping the handle stops the drain task after any in-flight request;
/// queued requests are discarded without running their continuations.
pub struct Dispatcher {
    queue: mpsc::UnboundedSender<VkRequest>,
    shutdown: watch::Sender<bool>,
    state: Arc<QueueState>,
    events: EventBus,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the drain task on the current tokio runtime.
    ///
    /// A connectivity probe (`messages.search` for `*`) is queued
    /// immediately; [`VkEvent::Connected`] is emitted when it succeeds.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(
        settings: DispatcherSettings,
        transport: Arc<dyn HttpTransport>,
        events: EventBus,
    ) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let state = Arc::new(QueueState::default());

        let drain = DrainLoop {
            settings,
            transport,
            events: events.clone(),
            state: Arc::clone(&state),
            queue: receiver,
            shutdown: shutdown_rx,
        };
        let worker = tokio::spawn(drain.run());

        let dispatcher = Self {
            queue,
            shutdown,
            state,
            events,
            worker: Some(worker),
        };
        dispatcher.connection_test();
        dispatcher
    }

    fn connection_test(&self) {
        let events = self.events.clone();
        let probe = VkRequest::new(VkMethod::Search {
            query: "*".to_string(),
            count: 1,
        })
        .on_response(move |_| {
            info!("VK API connected");
            events.emit(VkEvent::Connected);
        });

        if let Err(e) = self.enqueue(probe) {
            error!("Failed to queue VK connectivity probe: {}", e);
        }
    }

    /// Append a request to the queue.
    ///
    /// Returns [`VkApiError::Closed`] once the dispatcher has been closed.
    pub fn enqueue(&self, request: VkRequest) -> Result<()> {
        if *self.shutdown.borrow() {
            return Err(VkApiError::Closed);
        }

        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if self.queue.send(request).is_err() {
            decrement(&self.state.pending);
            return Err(VkApiError::Closed);
        }
        Ok(())
    }

    /// Queue a text message.
    ///
    /// Fails with [`VkApiError::InvalidArgument`] if either value is empty;
    /// nothing is queued in that case.
    pub fn send_text(&self, user_id: &str, message: &str) -> Result<()> {
        self.send_text_with(user_id, message, |_, _| {})
    }

    /// Queue a text message and run `callback(user_id, message)` once VK
    /// accepts it, after [`VkEvent::MessageSent`] has been emitted.
    pub fn send_text_with<F>(&self, user_id: &str, message: &str, callback: F) -> Result<()>
    where
        F: FnOnce(&str, &str) + Send + 'static,
    {
        let method = VkMethod::send_message(user_id, message)?;

        let events = self.events.clone();
        let user_id = user_id.to_string();
        let message = message.to_string();
        let request = VkRequest::new(method).on_response(move |_| {
            debug!("Message sent to VK user {}", user_id);
            events.emit(VkEvent::MessageSent {
                user_id: user_id.clone(),
                message: message.clone(),
            });
            callback(&user_id, &message);
        });

        self.enqueue(request)
    }

    /// Whether the drain task is working through the queue.
    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::SeqCst)
    }

    /// Number of requests waiting to be processed.
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    /// The event bus this dispatcher reports to.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Stop accepting requests and signal the drain task to exit.
    ///
    /// Does not wait; see [`Dispatcher::shutdown`].
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    /// Close the dispatcher and wait for the drain task to finish.
    ///
    /// An in-flight request completes normally. Queued requests are dropped
    /// without running their continuations and no further HTTP calls are made.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!("VK dispatcher task failed: {}", e);
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// The single consumer of the request queue.
struct DrainLoop {
    settings: DispatcherSettings,
    transport: Arc<dyn HttpTransport>,
    events: EventBus,
    state: Arc<QueueState>,
    queue: mpsc::UnboundedReceiver<VkRequest>,
    shutdown: watch::Receiver<bool>,
}

impl DrainLoop {
    async fn run(mut self) {
        debug!("VK dispatcher started");

        loop {
            let request = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                request = self.queue.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            decrement(&self.state.pending);
            self.state.busy.store(true, Ordering::SeqCst);

            self.process(request).await;

            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(self.settings.post_delay) => {}
            }

            if self.state.pending.load(Ordering::SeqCst) == 0 {
                self.state.busy.store(false, Ordering::SeqCst);
            }
        }

        self.state.busy.store(false, Ordering::SeqCst);
        self.queue.close();
        let mut dropped = 0usize;
        while self.queue.try_recv().is_ok() {
            dropped += 1;
        }
        self.state.pending.store(0, Ordering::SeqCst);

        if dropped > 0 {
            debug!("VK dispatcher stopped, dropped {} queued request(s)", dropped);
        } else {
            debug!("VK dispatcher stopped");
        }
    }

    async fn process(&self, request: VkRequest) {
        let method_name = request.method().name();
        let user_id = request.method().user_id().map(str::to_string);

        if self.settings.token.is_empty() {
            error!("VK community token is not configured, {} skipped", method_name);
            self.events.emit(VkEvent::Error(
                VkErrorEvent::new(ErrorKind::MissingToken, "community token is not configured")
                    .with_user_id(user_id),
            ));
            return;
        }

        let url = request.url(
            &self.settings.api_url,
            &self.settings.api_version,
            &self.settings.token,
        );

        debug!("Calling VK method {}", method_name);
        let body = match self.transport.get(&url).await {
            Ok(body) => body,
            Err(e) => {
                error!("VK request {} failed: {}", method_name, e);
                self.events.emit(VkEvent::Error(
                    VkErrorEvent::new(ErrorKind::Network, format!("Network or HTTP error: {e}"))
                        .with_user_id(user_id),
                ));
                return;
            }
        };

        if body.is_empty() {
            request.respond(None);
            return;
        }

        match classify(&body) {
            Ok(Classification::Payload) => request.respond(Some(body)),
            Ok(Classification::Error(api_error)) => self.report_api_error(api_error, user_id),
            Err(e) => {
                warn!("VK response to {} is not valid JSON: {}", method_name, e);
                request.respond(Some(body));
            }
        }
    }

    fn report_api_error(&self, api_error: ApiError, request_user_id: Option<String>) {
        let user_id = api_error.user_id.clone().or(request_user_id);
        let description = api_error
            .message
            .clone()
            .unwrap_or_else(|| "unknown VK API error".to_string());
        let code = api_error
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let who = user_id.as_deref().unwrap_or("-");

        let kind = if api_error.is_disallowed() {
            if self.settings.mute_disallowed_warning {
                debug!("vkUserId: {}; Error '{}': {}", who, code, description);
            } else {
                warn!("vkUserId: {}; Error '{}': {}", who, code, description);
            }
            ErrorKind::Disallowed
        } else {
            error!("vkUserId: {}; Error '{}': {}", who, code, description);
            ErrorKind::Api
        };

        self.events.emit(VkEvent::Error(
            VkErrorEvent::new(kind, description)
                .with_api_code(api_error.code)
                .with_user_id(user_id),
        ));
    }
}
