//! Click queue backends.
//!
//! - [`channel_queue`] - bounded in-process channel (default)
//! - [`redis_queue`] - durable Redis list with a processing list for redelivery

pub mod channel_queue;
pub mod redis_queue;

pub use channel_queue::{ChannelClickConsumer, ChannelClickQueue, click_channel};
pub use redis_queue::{RedisClickConsumer, RedisClickQueue};
