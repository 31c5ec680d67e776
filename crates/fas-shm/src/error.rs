//! Shared-memory and semaphore error types.

use std::error::Error;
use std::fmt;

use nix::errno::Errno;

/// Errors from creating, attaching, using or tearing down the shared
/// region and its semaphores.
///
/// An interrupted or timed-out wait is not an error; see
/// [`WaitOutcome`](crate::semaphore::WaitOutcome).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShmError {
    /// A region or semaphore with this name already exists, usually left
    /// over from a crashed run. Nothing was created or removed.
    ResourceConflict {
        /// The conflicting name.
        name: String,
    },
    /// The region or a semaphore does not exist yet: no supervisor is
    /// running under this namespace.
    NotFound {
        /// The missing name.
        name: String,
    },
    /// The OS refused to create, size or map a resource.
    AllocationFailed {
        /// Name of the resource being allocated.
        name: String,
        /// The system call that failed.
        op: &'static str,
        /// Underlying errno.
        source: Errno,
    },
    /// An existing region does not match this build's layout.
    LayoutMismatch {
        /// Region name.
        name: String,
        /// What did not match.
        reason: String,
    },
    /// A slot read from the ring has a size outside `[0, MAX_FAS_LEN]`.
    ProtocolViolation {
        /// Ring index of the corrupted slot.
        index: u32,
        /// The stored size.
        size: u32,
    },
    /// A ring index outside `[0, capacity)` was requested.
    IndexOutOfBounds {
        /// The requested index.
        index: u32,
        /// Ring capacity.
        capacity: u32,
    },
    /// A semaphore wait failed for a reason other than a signal or timeout.
    WaitFailed {
        /// Semaphore name.
        name: String,
        /// Underlying errno.
        source: Errno,
    },
    /// A semaphore post failed.
    PostFailed {
        /// Semaphore name.
        name: String,
        /// Underlying errno.
        source: Errno,
    },
    /// Reading a semaphore's current count failed.
    QueryFailed {
        /// Semaphore name.
        name: String,
        /// Underlying errno.
        source: Errno,
    },
    /// Closing, unmapping or unlinking a resource failed.
    ReleaseFailed {
        /// Resource name.
        name: String,
        /// The system call that failed.
        op: &'static str,
        /// Underlying errno.
        source: Errno,
    },
    /// A resource name is not a valid POSIX IPC name.
    InvalidName {
        /// The rejected name.
        name: String,
    },
    /// Ring capacity outside `1..=MAX_CAPACITY`.
    InvalidCapacity {
        /// The rejected capacity.
        capacity: u32,
    },
}

impl ShmError {
    /// Map an errno from an open/create call to the taxonomy: `EEXIST` is a
    /// conflict, `ENOENT` is a missing resource, anything else is an
    /// allocation failure.
    pub(crate) fn from_open(name: &str, op: &'static str, errno: Errno) -> Self {
        match errno {
            Errno::EEXIST => Self::ResourceConflict {
                name: name.to_string(),
            },
            Errno::ENOENT => Self::NotFound {
                name: name.to_string(),
            },
            source => Self::AllocationFailed {
                name: name.to_string(),
                op,
                source,
            },
        }
    }

    /// Whether this error means the resource name is already taken.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ResourceConflict { .. })
    }

    /// Whether this error means the supervisor has not created the resources.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for ShmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceConflict { name } => {
                write!(f, "'{name}' already exists (stale run?)")
            }
            Self::NotFound { name } => {
                write!(f, "'{name}' not found (is the supervisor running?)")
            }
            Self::AllocationFailed { name, op, source } => {
                write!(f, "{op} on '{name}' failed: {source}")
            }
            Self::LayoutMismatch { name, reason } => {
                write!(f, "layout mismatch on '{name}': {reason}")
            }
            Self::ProtocolViolation { index, size } => {
                write!(f, "corrupted slot {index}: size {size} out of range")
            }
            Self::IndexOutOfBounds { index, capacity } => {
                write!(f, "ring index {index} out of bounds for capacity {capacity}")
            }
            Self::WaitFailed { name, source } => {
                write!(f, "sem_wait on '{name}' failed: {source}")
            }
            Self::PostFailed { name, source } => {
                write!(f, "sem_post on '{name}' failed: {source}")
            }
            Self::QueryFailed { name, source } => {
                write!(f, "sem_getvalue on '{name}' failed: {source}")
            }
            Self::ReleaseFailed { name, op, source } => {
                write!(f, "{op} on '{name}' failed: {source}")
            }
            Self::InvalidName { name } => {
                write!(f, "'{name}' is not a valid POSIX IPC name")
            }
            Self::InvalidCapacity { capacity } => {
                write!(
                    f,
                    "ring capacity {capacity} outside 1..={}",
                    crate::layout::MAX_CAPACITY
                )
            }
        }
    }
}

impl Error for ShmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AllocationFailed { source, .. }
            | Self::WaitFailed { source, .. }
            | Self::PostFailed { source, .. }
            | Self::QueryFailed { source, .. }
            | Self::ReleaseFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
