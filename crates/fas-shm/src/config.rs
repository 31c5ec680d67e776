//! Ring construction parameters.

use fas_core::{ResourceNames, DEFAULT_RESOURCES};

use crate::error::ShmError;
use crate::layout::MAX_CAPACITY;

/// Number of ring slots when none is configured.
pub const DEFAULT_CAPACITY: u32 = 50;

/// Everything the supervisor needs to create a ring.
///
/// Generators only need the [`ResourceNames`]: capacity is read back from
/// the region header on attach.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingConfig {
    /// Names of the region and its semaphores.
    pub names: ResourceNames,
    /// Number of slots, `1..=MAX_CAPACITY`.
    pub capacity: u32,
}

impl RingConfig {
    /// Config with the given names and the default capacity.
    pub fn new(names: ResourceNames) -> Self {
        Self {
            names,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Replace the capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Check names and capacity before any system object is created.
    pub fn validate(&self) -> Result<(), ShmError> {
        self.names
            .validate()
            .map_err(|name| ShmError::InvalidName {
                name: name.to_string(),
            })?;
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ShmError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCES)
    }
}
