//! VK API plugin.
//!
//! Lets other plugins of a game server send VK community messages. Outbound
//! calls are queued and throttled so the VK API is never flooded, and VK
//! error payloads are reported as typed events.

pub mod config;
pub mod error;
pub mod logging;
pub mod plugin;
pub mod vk;

pub use config::Config;
pub use error::{Result, VkApiError};
pub use plugin::VkApi;
pub use vk::{
    Dispatcher, DispatcherSettings, ErrorKind, EventBus, HttpTransport, ReqwestTransport,
    VkErrorEvent, VkEvent, VkMethod, VkRequest, EVENT_CAPACITY,
};
