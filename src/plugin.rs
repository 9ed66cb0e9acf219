//! Host-facing plugin surface.
//!
//! [`VkApi`] is what the embedding server holds: it is created once when the
//! plugin loads, takes `send_text` calls from other plugins, and is unloaded
//! when the plugin goes away.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::config::{Config, VkConfig};
use crate::vk::{
    Dispatcher, DispatcherSettings, EventBus, HttpTransport, ReqwestTransport, VkEvent,
};
use crate::{Result, VkApiError};

/// The loaded VK API plugin.
pub struct VkApi {
    dispatcher: Dispatcher,
}

impl VkApi {
    /// Load the plugin with the real HTTP client.
    ///
    /// Fails if the configuration is invalid, in particular when no community
    /// token is set. Subscribe to `events` before calling this to observe the
    /// connectivity probe. Must be called from within a tokio runtime, since
    /// the dispatcher task is spawned onto it.
    pub fn init(config: &Config, events: EventBus) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&config.http)?);
        Self::with_transport(&config.vk, transport, events)
    }

    /// Load the plugin with a custom transport.
    ///
    /// Returns a [`VkApiError::Config`] error when no tokio runtime is running.
    pub fn with_transport(
        config: &VkConfig,
        transport: Arc<dyn HttpTransport>,
        events: EventBus,
    ) -> Result<Self> {
        if config.token.is_empty() {
            return Err(VkApiError::Config("community token required".to_string()));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(VkApiError::Config(
                "VK API must be loaded within a tokio runtime".to_string(),
            ));
        }

        let settings = DispatcherSettings::from_config(config);
        let dispatcher = Dispatcher::spawn(settings, transport, events);
        info!("VK API plugin loaded");
        Ok(Self { dispatcher })
    }

    /// Queue a text message to a VK user.
    ///
    /// The outcome is reported as a [`VkEvent`]; only invalid arguments or a
    /// closed dispatcher are returned here.
    pub fn send_text(&self, user_id: &str, message: &str) -> Result<()> {
        self.dispatcher.send_text(user_id, message)
    }

    /// Register an observer for plugin events.
    pub fn subscribe(&self) -> broadcast::Receiver<VkEvent> {
        self.dispatcher.events().subscribe()
    }

    /// Number of messages waiting to be sent.
    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    /// Unload the plugin. Queued messages are discarded.
    pub async fn unload(self) {
        let pending = self.dispatcher.pending();
        self.dispatcher.shutdown().await;
        info!("VK API plugin unloaded ({} queued request(s) discarded)", pending);
    }
}
