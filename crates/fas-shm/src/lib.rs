//! Shared-memory ring buffer connecting FAS generators to the supervisor.
//!
//! Four named POSIX objects make up one ring: a shared memory region
//! holding a fixed-capacity array of [`FasSlot`](fas_core::FasSlot)s plus a
//! small header, and three named semaphores (`mutex`, `free_slots`,
//! `used_slots`). The supervisor creates and finally removes all four
//! through [`RingConsumer`]; any number of generator processes attach
//! through [`RingProducer`].
//!
//! Nearly all of the workspace's `unsafe` lives here: the mapping itself
//! and the FFI calls for named semaphores. Elsewhere it is limited to
//! installing signal handlers and unlinking test semaphores.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod error;
pub mod layout;
pub mod region;
pub mod ring;
pub mod semaphore;

pub use config::{RingConfig, DEFAULT_CAPACITY};
pub use error::ShmError;
pub use layout::MAX_CAPACITY;
pub use region::SharedRegion;
pub use ring::{PopOutcome, PushOutcome, RingConsumer, RingProducer, SlotCounts, StallRecovery};
pub use semaphore::{NamedSemaphore, SemaphoreSet, WaitOutcome};
