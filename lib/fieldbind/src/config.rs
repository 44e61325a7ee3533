//! Engine configuration types.

use fieldbind_core::MultipartConfig;

/// Configuration for the binding engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum inbound body size, in bytes.
    pub max_body_size: usize,
    /// Read size for file parts of outgoing multipart bodies.
    pub multipart_chunk_size: usize,
    /// Capacity of the channel between the multipart producer and the body.
    pub multipart_channel_capacity: usize,
    /// Fixed multipart boundary; generated per request when unset.
    pub multipart_boundary: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_body_size: 32 * 1024 * 1024,
            multipart_chunk_size: 32 * 1024,
            multipart_channel_capacity: 8,
            multipart_boundary: None,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Multipart settings handed to the request builder.
    #[must_use]
    pub fn multipart(&self) -> MultipartConfig {
        MultipartConfig {
            boundary: self.multipart_boundary.clone(),
            chunk_size: self.multipart_chunk_size,
            channel_capacity: self.multipart_channel_capacity,
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    max_body_size: Option<usize>,
    multipart_chunk_size: Option<usize>,
    multipart_channel_capacity: Option<usize>,
    multipart_boundary: Option<String>,
}

impl EngineConfigBuilder {
    /// Set the maximum inbound body size.
    #[must_use]
    pub const fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = Some(bytes);
        self
    }

    /// Set the read size for file parts.
    #[must_use]
    pub const fn multipart_chunk_size(mut self, bytes: usize) -> Self {
        self.multipart_chunk_size = Some(bytes);
        self
    }

    /// Set the multipart channel capacity.
    #[must_use]
    pub const fn multipart_channel_capacity(mut self, capacity: usize) -> Self {
        self.multipart_channel_capacity = Some(capacity);
        self
    }

    /// Use a fixed multipart boundary.
    #[must_use]
    pub fn multipart_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.multipart_boundary = Some(boundary.into());
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            max_body_size: self.max_body_size.unwrap_or(defaults.max_body_size),
            multipart_chunk_size: self
                .multipart_chunk_size
                .unwrap_or(defaults.multipart_chunk_size),
            multipart_channel_capacity: self
                .multipart_channel_capacity
                .unwrap_or(defaults.multipart_channel_capacity),
            multipart_boundary: self.multipart_boundary.or(defaults.multipart_boundary),
        }
    }
}
