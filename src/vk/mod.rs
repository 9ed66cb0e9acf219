//! VK API client.
//!
//! Requests are queued on a [`Dispatcher`], sent one at a time with a fixed
//! delay between them, and their outcomes reported on an [`EventBus`].

pub mod dispatcher;
pub mod encoding;
pub mod events;
pub mod request;
pub mod response;
pub mod transport;

pub use dispatcher::{Dispatcher, DispatcherSettings, DEFAULT_POST_DELAY};
pub use encoding::url_encode;
pub use events::{ErrorKind, EventBus, VkErrorEvent, VkEvent, EVENT_CAPACITY};
pub use request::{ResponseCallback, VkMethod, VkRequest};
pub use response::{classify, ApiError, Classification, DISALLOWED_ERROR_CODE};
pub use transport::{HttpTransport, ReqwestTransport};
