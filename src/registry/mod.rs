//! Subscription registry for feed fan-out
//!
//! The registry tracks live subscriber handles per stream class and answers
//! "who should receive this record". Delivery itself happens in
//! [`crate::broadcast`].
//!
//! # Architecture
//!
//! ```text
//!                    Arc<SubscriptionRegistry>
//!              ┌──────────────────────────────────┐
//!              │ members:   id -> StreamClass     │
//!              │ full_feed: id -> handle          │
//!              │ new_only:  id -> handle          │
//!              │ breeds:    key -> {id -> handle} │
//!              └────────────────┬─────────────────┘
//!                               │ matching_handles(record)
//!                               ▼
//!                    Vec<Arc<SubscriberHandle>>   (snapshot, locks released)
//!                               │ try_deliver()
//!         ┌─────────────────────┼─────────────────────┐
//!         ▼                     ▼                     ▼
//!   [Subscription]        [Subscription]        [Subscription]
//!    rx.recv()             rx.recv()             rx.recv()
//! ```
//!
//! Each handle owns a bounded `mpsc` sender; the connection task owns the
//! receiver. A full or closed channel is a delivery failure and leads to
//! removal, so one slow subscriber never holds up the others.

pub mod config;
pub mod error;
pub mod handle;
pub mod store;

pub use config::RegistryConfig;
pub use error::{DeliveryError, RegistryError};
pub use handle::{
    normalize_breed, Delivery, HandleState, StreamClass, SubscriberHandle, SubscriberId,
    Subscription,
};
pub use store::{RegistryStats, SubscriptionRegistry};
