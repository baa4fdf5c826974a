//! Configuration builders controlling a counting run.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WordFreqError};

/// Configuration for a parallel word count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountConfig {
    /// Requested number of workers; the effective count may shrink during setup and planning.
    pub workers: usize,
    /// Maximum number of chunks launched on their own thread. Chunks past the budget run
    /// synchronously on the calling thread. `None` launches every chunk.
    pub thread_budget: Option<usize>,
    /// Capacity of the buffered reader wrapped around each input handle.
    pub read_buffer_size: usize,
}

impl CountConfig {
    /// Returns a builder initialised with [`CountConfig::default`].
    #[must_use]
    pub fn builder() -> CountBuilder {
        CountBuilder::default()
    }

    /// Validates the invariants required for counting.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(WordFreqError::InvalidConfig(
                "bad number of workers, must be greater than zero".into(),
            ));
        }
        if self.read_buffer_size == 0 {
            return Err(WordFreqError::InvalidConfig(
                "read_buffer_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            thread_budget: None,
            read_buffer_size: 64 * 1024,
        }
    }
}

/// Builder for [`CountConfig`].
#[derive(Debug, Default, Clone)]
pub struct CountBuilder {
    cfg: CountConfig,
}

impl CountBuilder {
    /// Creates a builder with [`CountConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the requested worker count.
    #[must_use]
    pub fn workers(mut self, value: usize) -> Self {
        self.cfg.workers = value;
        self
    }

    /// Caps the number of spawned threads.
    #[must_use]
    pub fn thread_budget(mut self, value: Option<usize>) -> Self {
        self.cfg.thread_budget = value;
        self
    }

    /// Sets the per-handle read buffer capacity in bytes.
    #[must_use]
    pub fn read_buffer_size(mut self, bytes: usize) -> Self {
        self.cfg.read_buffer_size = bytes;
        self
    }

    /// Finalises the builder, returning a validated [`CountConfig`].
    pub fn build(self) -> Result<CountConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}
