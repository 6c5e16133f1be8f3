//! Per-session publish/subscribe.
//!
//! Publishing never blocks: each subscriber owns a bounded inbox, and an event
//! that does not fit is dropped for that subscriber only.

mod bus;
mod config;
mod types;

pub use bus::{EventBus, Inbox, Polled, Subscription, SERIALIZATION_FALLBACK};
pub use config::EventBusConfig;
pub use types::{TaskEvent, TaskEventType};
