//! System-visible names of the shared region and the three semaphores.
//!
//! Both roles find each other only through these names: the supervisor
//! creates objects under them and generators open the same names. A run
//! therefore collides with itself on purpose and with unrelated runs only
//! if they share a prefix.

use std::borrow::Cow;

/// The four POSIX object names used by one run.
///
/// Built once (usually as [`DEFAULT_RESOURCES`]) and passed by reference
/// to both roles; names are never recomputed per call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceNames {
    /// Shared memory object holding the ring.
    pub region: Cow<'static, str>,
    /// Binary semaphore guarding write-slot reservation.
    pub mutex: Cow<'static, str>,
    /// Counting semaphore of empty ring slots.
    pub free_slots: Cow<'static, str>,
    /// Counting semaphore of filled ring slots.
    pub used_slots: Cow<'static, str>,
}

/// Names used when no namespace is given on the command line.
pub const DEFAULT_RESOURCES: ResourceNames = ResourceNames {
    region: Cow::Borrowed("/fas_shm"),
    mutex: Cow::Borrowed("/fas_mutex"),
    free_slots: Cow::Borrowed("/fas_free"),
    used_slots: Cow::Borrowed("/fas_used"),
};

impl ResourceNames {
    /// Derive the four names from a namespace prefix.
    ///
    /// A leading `/` is optional; `with_prefix("fas")` equals
    /// [`DEFAULT_RESOURCES`].
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_start_matches('/');
        let name = |suffix: &str| Cow::Owned(format!("/{prefix}_{suffix}"));
        Self {
            region: name("shm"),
            mutex: name("mutex"),
            free_slots: name("free"),
            used_slots: name("used"),
        }
    }

    /// All names in creation order: region, mutex, free, used.
    pub fn all(&self) -> [&str; 4] {
        [
            &*self.region,
            &*self.mutex,
            &*self.free_slots,
            &*self.used_slots,
        ]
    }

    /// Check that every name is a portable POSIX IPC name: a leading `/`,
    /// no further `/`, and at most 250 bytes.
    ///
    /// Returns the first offending name.
    pub fn validate(&self) -> Result<(), &str> {
        for name in self.all() {
            let valid = name.len() > 1
                && name.len() <= 250
                && name.starts_with('/')
                && !name[1..].contains('/')
                && !name.contains('\0');
            if !valid {
                return Err(name);
            }
        }
        Ok(())
    }
}

impl Default for ResourceNames {
    fn default() -> Self {
        DEFAULT_RESOURCES
    }
}
