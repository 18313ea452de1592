//! Registry configuration

/// Default outbound buffer per subscriber, in deliveries
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Configuration for the subscription registry and chat relay
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each subscriber's outbound channel
    ///
    /// A subscriber whose buffer is full when a delivery arrives is
    /// considered failed and is unsubscribed.
    pub subscriber_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber buffer capacity (at least 1)
    pub fn subscriber_buffer(mut self, capacity: usize) -> Self {
        self.subscriber_buffer = capacity.max(1);
        self
    }
}
