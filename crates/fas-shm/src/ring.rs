//! Multi-producer / single-consumer ring over the shared region.
//!
//! Protocol (all semaphores are named and process-shared):
//!
//! ```text
//! producer push                      consumer pop
//! ─────────────                      ────────────
//! wait(mutex)                        wait(used_slots)
//!   active? else -> Shutdown         slot = ring[read_index]
//!   wait(free_slots)                 read_index += 1 (mod capacity)
//!   active? else post(free_slots)    post(free_slots)
//!           -> Shutdown
//!   ring[write_index] = slot
//!   write_index += 1 (mod capacity)
//!   post(used_slots)
//! post(mutex)
//! ```
//!
//! `mutex` serialises producers so that reserving a free slot and claiming
//! `write_index` happen together. At most one producer can therefore be
//! blocked on `free_slots`; the single extra post made by
//! [`RingConsumer::begin_shutdown`] wakes it, and it hands that post on so
//! the next producer behind `mutex` is not stranded either.

use std::sync::atomic::Ordering;
use std::time::Duration;

use fas_core::{FasSlot, ResourceNames};
use nix::errno::Errno;
use nix::sys::signal;
use nix::unistd::Pid;

use crate::config::RingConfig;
use crate::error::ShmError;
use crate::region::SharedRegion;
use crate::semaphore::{SemaphoreSet, WaitOutcome};

/// Result of [`RingProducer::push`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The slot was published at this ring index.
    Committed {
        /// Ring index the slot was written to.
        index: u32,
    },
    /// The supervisor has stopped the search; nothing was written.
    Shutdown,
    /// A signal interrupted a wait; nothing was written.
    Interrupted,
}

/// Result of [`RingConsumer::pop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopOutcome {
    /// The oldest published slot.
    Slot(FasSlot),
    /// A signal interrupted the wait; nothing was consumed.
    Interrupted,
    /// The poll interval elapsed with no slot available.
    TimedOut,
}

/// Snapshot of the two counting semaphores.
///
/// While the search is active and no push or pop is mid-flight,
/// `free + used == capacity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotCounts {
    /// Current `free_slots` count.
    pub free: u32,
    /// Current `used_slots` count.
    pub used: u32,
}

/// What [`RingConsumer::recover_stalled_writer`] repaired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StallRecovery {
    /// The dead producer's process id.
    pub pid: i32,
    /// `used_slots` posts made for slots it committed but never published.
    pub republished: u32,
    /// `free_slots` posts made for slots it reserved but never filled.
    pub reclaimed: u32,
}

// ── RingProducer ──────────────────────────────────────────────────

/// Producer side of the ring, held by a generator process.
#[derive(Debug)]
pub struct RingProducer {
    region: SharedRegion,
    sems: SemaphoreSet,
    pid: i32,
}

impl RingProducer {
    /// Attach to the ring of a running supervisor.
    ///
    /// Fails with [`ShmError::NotFound`] if any of the four objects is
    /// missing. Nothing is created or unlinked.
    pub fn attach(names: &ResourceNames) -> Result<Self, ShmError> {
        names.validate().map_err(|name| ShmError::InvalidName {
            name: name.to_string(),
        })?;
        let region = SharedRegion::attach(&names.region)?;
        let sems = SemaphoreSet::attach_all(names)?;
        Ok(Self {
            region,
            sems,
            pid: std::process::id() as i32,
        })
    }

    /// Publish one slot, blocking while the ring is full.
    ///
    /// Returns [`PushOutcome::Shutdown`] without writing once the
    /// supervisor has cleared `active`, including when the clear happens
    /// while this call is blocked on a full ring.
    pub fn push(&self, slot: &FasSlot) -> Result<PushOutcome, ShmError> {
        match self.sems.mutex.wait()? {
            WaitOutcome::Acquired => {}
            WaitOutcome::Interrupted | WaitOutcome::TimedOut => {
                return Ok(PushOutcome::Interrupted)
            }
        }
        let header = self.region.header();
        header.writer_pid.store(self.pid, Ordering::Release);
        let outcome = self.push_locked(slot);
        header.writer_pid.store(0, Ordering::Release);
        self.sems.mutex.post()?;
        outcome
    }

    fn push_locked(&self, slot: &FasSlot) -> Result<PushOutcome, ShmError> {
        if !self.region.is_active() {
            return Ok(PushOutcome::Shutdown);
        }
        match self.sems.free_slots.wait()? {
            WaitOutcome::Acquired => {}
            WaitOutcome::Interrupted | WaitOutcome::TimedOut => {
                return Ok(PushOutcome::Interrupted)
            }
        }
        if !self.region.is_active() {
            // Woken by the shutdown post: pass it on to whoever queues next.
            self.sems.free_slots.post()?;
            return Ok(PushOutcome::Shutdown);
        }

        let header = self.region.header();
        let index = header.write_index.load(Ordering::Acquire);
        self.region.write_slot(index, slot)?;
        header
            .write_index
            .store((index + 1) % self.region.capacity(), Ordering::Release);
        header.committed.fetch_add(1, Ordering::AcqRel);
        self.sems.used_slots.post()?;
        Ok(PushOutcome::Committed { index })
    }

    /// Whether the supervisor is still searching.
    pub fn is_active(&self) -> bool {
        self.region.is_active()
    }

    /// Number of ring slots.
    pub fn capacity(&self) -> u32 {
        self.region.capacity()
    }

    /// Close semaphores and unmap. Never unlinks anything.
    pub fn detach(self) -> Result<(), ShmError> {
        let sems = self.sems.close_all(false);
        let region = self.region.detach();
        sems.and(region)
    }
}

// ── RingConsumer ──────────────────────────────────────────────────

/// Consumer side of the ring, held by the supervisor. Owns all four
/// system objects.
#[derive(Debug)]
pub struct RingConsumer {
    region: SharedRegion,
    sems: SemaphoreSet,
    names: ResourceNames,
    poll_interval: Option<Duration>,
}

impl RingConsumer {
    /// Create the region and the three semaphores, and mark the search
    /// active.
    ///
    /// On [`ShmError::ResourceConflict`] nothing that already existed is
    /// touched; objects created by this call before a failure are removed.
    pub fn create(config: &RingConfig) -> Result<Self, ShmError> {
        config.validate()?;
        let region = SharedRegion::create(&config.names.region, config.capacity)?;
        let sems = match SemaphoreSet::create_all(&config.names, config.capacity) {
            Ok(sems) => sems,
            Err(e) => {
                if let Err(cleanup) = region.destroy() {
                    tracing::warn!(error = %cleanup, "failed to remove region after semaphore error");
                }
                return Err(e);
            }
        };
        tracing::info!(
            region = %config.names.region,
            capacity = config.capacity,
            "ring created"
        );
        Ok(Self {
            region,
            sems,
            names: config.names.clone(),
            poll_interval: None,
        })
    }

    /// Bound every [`pop`](Self::pop) wait; `None` blocks indefinitely.
    pub fn set_poll_interval(&mut self, interval: Option<Duration>) {
        self.poll_interval = interval;
    }

    /// The names this ring was created under.
    pub fn names(&self) -> &ResourceNames {
        &self.names
    }

    /// Number of ring slots.
    pub fn capacity(&self) -> u32 {
        self.region.capacity()
    }

    /// Whether the search is still running.
    pub fn is_active(&self) -> bool {
        self.region.is_active()
    }

    /// Take the oldest published slot, waiting for one if the ring is empty.
    ///
    /// A stored size outside `[0, MAX_FAS_LEN]` is reported as
    /// [`ShmError::ProtocolViolation`].
    pub fn pop(&self) -> Result<PopOutcome, ShmError> {
        let waited = match self.poll_interval {
            Some(interval) => self.sems.used_slots.wait_timeout(interval)?,
            None => self.sems.used_slots.wait()?,
        };
        match waited {
            WaitOutcome::Acquired => {}
            WaitOutcome::Interrupted => return Ok(PopOutcome::Interrupted),
            WaitOutcome::TimedOut => return Ok(PopOutcome::TimedOut),
        }

        let header = self.region.header();
        let index = header.read_index.load(Ordering::Acquire);
        let raw = self.region.read_slot(index)?;
        let slot = raw.decode().map_err(|_| ShmError::ProtocolViolation {
            index,
            size: raw.size(),
        })?;
        header
            .read_index
            .store((index + 1) % self.region.capacity(), Ordering::Release);
        header.consumed.fetch_add(1, Ordering::AcqRel);
        self.sems.free_slots.post()?;
        Ok(PopOutcome::Slot(slot))
    }

    /// Clear `active` and post `free_slots` once so a producer blocked on a
    /// full ring wakes up and observes the shutdown.
    ///
    /// Only the first call has any effect.
    pub fn begin_shutdown(&self) -> Result<(), ShmError> {
        if !self.region.deactivate() {
            return Ok(());
        }
        self.sems.free_slots.post()?;
        tracing::debug!(region = %self.names.region, "active flag cleared");
        Ok(())
    }

    /// Snapshot of the `free_slots` and `used_slots` counts.
    pub fn slot_counts(&self) -> Result<SlotCounts, ShmError> {
        Ok(SlotCounts {
            free: self.sems.free_slots.value()?,
            used: self.sems.used_slots.value()?,
        })
    }

    /// Repair the ring if a producer died while holding `mutex`.
    ///
    /// Returns `None` if no producer is inside the critical section or that
    /// producer is still alive. Otherwise the semaphore counts are brought
    /// back in line with the committed and consumed counters, and `mutex` is
    /// released on the dead producer's behalf.
    ///
    /// A recorded pid whose process is gone while `mutex` is free is stale
    /// (the writer finished between our load and the liveness check): it is
    /// cleared and nothing else is touched.
    ///
    /// Must be called from the consumer thread between pops.
    pub fn recover_stalled_writer(&self) -> Result<Option<StallRecovery>, ShmError> {
        let header = self.region.header();
        let pid = header.writer_pid.load(Ordering::Acquire);
        if pid == 0 || !self.region.is_active() || process_alive(pid) {
            return Ok(None);
        }
        // A writer that cleared its pid after our load finished normally.
        if header
            .writer_pid
            .compare_exchange(pid, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }
        if self.sems.mutex.value()? != 0 {
            tracing::debug!(pid, "cleared stale writer pid");
            return Ok(None);
        }

        // The dead producer still holds `mutex`: no other producer can move
        // `committed` or the two counts until we post it.
        let capacity = self.region.capacity();
        let committed = header.committed.load(Ordering::Acquire);
        let consumed = header.consumed.load(Ordering::Acquire);
        let outstanding = committed.saturating_sub(consumed).min(u64::from(capacity)) as u32;
        let counts = self.slot_counts()?;

        let republished = outstanding.saturating_sub(counts.used);
        for _ in 0..republished {
            self.sems.used_slots.post()?;
        }
        let reclaimed = (capacity - outstanding).saturating_sub(counts.free);
        for _ in 0..reclaimed {
            self.sems.free_slots.post()?;
        }

        self.sems.mutex.post()?;
        tracing::warn!(
            pid,
            republished,
            reclaimed,
            "recovered ring from a producer that died mid-push"
        );
        Ok(Some(StallRecovery {
            pid,
            republished,
            reclaimed,
        }))
    }

    /// Remove all four system objects.
    ///
    /// Every object is released even if an earlier release fails; the first
    /// error is returned. Producers still attached keep working handles but
    /// nobody can attach anew.
    pub fn destroy(self) -> Result<(), ShmError> {
        let sems = self.sems.close_all(true);
        let region = self.region.destroy();
        tracing::debug!(region = %self.names.region, "ring destroyed");
        sems.and(region)
    }
}

fn process_alive(pid: i32) -> bool {
    // EPERM still means the process exists.
    !matches!(signal::kill(Pid::from_raw(pid), None), Err(Errno::ESRCH))
}

// Compile-time assertion: both ends can move to a worker thread.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<RingProducer>();
    assert::<RingConsumer>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RawSlot;
    use fas_core::MAX_FAS_LEN;
    use fas_test_utils::fixtures::slot;
    use fas_test_utils::ScopedNames;
    use std::process::Command;

    fn ring(tag: &str, capacity: u32) -> (ScopedNames, RingConsumer) {
        let names = ScopedNames::new(tag);
        let config = RingConfig::new(names.to_names()).with_capacity(capacity);
        let consumer = RingConsumer::create(&config).unwrap();
        (names, consumer)
    }

    /// Pid of a process that has already exited and been reaped.
    fn dead_pid() -> i32 {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id() as i32;
        child.wait().unwrap();
        pid
    }

    #[test]
    fn push_then_pop_in_order() {
        let (names, consumer) = ring("ring-fifo", 4);
        let producer = RingProducer::attach(&names).unwrap();
        assert_eq!(producer.capacity(), 4);

        let first = slot(&[(0, 1)]);
        let second = slot(&[(1, 2), (2, 0)]);
        assert_eq!(
            producer.push(&first).unwrap(),
            PushOutcome::Committed { index: 0 }
        );
        assert_eq!(
            producer.push(&second).unwrap(),
            PushOutcome::Committed { index: 1 }
        );
        assert_eq!(consumer.pop().unwrap(), PopOutcome::Slot(first));
        assert_eq!(consumer.pop().unwrap(), PopOutcome::Slot(second));

        producer.detach().unwrap();
        consumer.destroy().unwrap();
    }

    #[test]
    fn indices_wrap_around() {
        let (names, consumer) = ring("ring-wrap", 2);
        let producer = RingProducer::attach(&names).unwrap();
        for round in 0..5 {
            let s = slot(&[(round, round + 1)]);
            let index = round as u32 % 2;
            assert_eq!(producer.push(&s).unwrap(), PushOutcome::Committed { index });
            assert_eq!(consumer.pop().unwrap(), PopOutcome::Slot(s));
        }
    }

    #[test]
    fn counts_track_occupancy() {
        let (names, consumer) = ring("ring-counts", 3);
        let producer = RingProducer::attach(&names).unwrap();
        assert_eq!(
            consumer.slot_counts().unwrap(),
            SlotCounts { free: 3, used: 0 }
        );
        producer.push(&FasSlot::ACYCLIC).unwrap();
        assert_eq!(
            consumer.slot_counts().unwrap(),
            SlotCounts { free: 2, used: 1 }
        );
        consumer.pop().unwrap();
        assert_eq!(
            consumer.slot_counts().unwrap(),
            SlotCounts { free: 3, used: 0 }
        );
    }

    #[test]
    fn pop_times_out_when_empty() {
        let (_names, mut consumer) = ring("ring-poll", 2);
        consumer.set_poll_interval(Some(Duration::from_millis(10)));
        assert_eq!(consumer.pop().unwrap(), PopOutcome::TimedOut);
    }

    #[test]
    fn push_after_shutdown_writes_nothing() {
        let (names, consumer) = ring("ring-stopped", 2);
        let producer = RingProducer::attach(&names).unwrap();
        consumer.begin_shutdown().unwrap();
        consumer.begin_shutdown().unwrap();
        assert!(!producer.is_active());

        assert_eq!(producer.push(&slot(&[(0, 1)])).unwrap(), PushOutcome::Shutdown);
        // Exactly one shutdown post, nothing consumed by the rejected push.
        assert_eq!(
            consumer.slot_counts().unwrap(),
            SlotCounts { free: 3, used: 0 }
        );
    }

    #[test]
    fn attach_without_supervisor_fails() {
        let names = ScopedNames::new("ring-absent");
        let err = RingProducer::attach(&names).unwrap_err();
        assert!(err.is_not_found(), "got {err}");
    }

    #[test]
    fn create_with_stale_region_leaves_it_alone() {
        let names = ScopedNames::new("ring-stale");
        let stale = SharedRegion::create(&names.region, 1).unwrap();
        let config = RingConfig::new(names.to_names());
        let err = RingConsumer::create(&config).unwrap_err();
        assert!(err.is_conflict());
        // The stale region is still there and no semaphores were created.
        assert!(SharedRegion::attach(&names.region).is_ok());
        assert!(SemaphoreSet::attach_all(&names).unwrap_err().is_not_found());
        drop(stale);
    }

    #[test]
    fn corrupted_size_is_protocol_violation() {
        let (names, consumer) = ring("ring-corrupt", 2);
        let producer = RingProducer::attach(&names).unwrap();
        producer.push(&slot(&[(0, 1)])).unwrap();
        consumer
            .region
            .write_raw_slot(0, RawSlot::with_size(MAX_FAS_LEN as u32 + 3))
            .unwrap();
        assert_eq!(
            consumer.pop().unwrap_err(),
            ShmError::ProtocolViolation {
                index: 0,
                size: MAX_FAS_LEN as u32 + 3
            }
        );
    }

    #[test]
    fn no_recovery_without_stalled_writer() {
        let (_names, consumer) = ring("ring-healthy", 2);
        assert_eq!(consumer.recover_stalled_writer().unwrap(), None);

        // A live writer is left alone.
        consumer
            .region
            .header()
            .writer_pid
            .store(std::process::id() as i32, Ordering::Release);
        assert_eq!(consumer.recover_stalled_writer().unwrap(), None);
    }

    #[test]
    fn recovery_republishes_committed_slot() {
        let (_names, consumer) = ring("ring-republish", 3);
        let header = consumer.region.header();
        let s = slot(&[(4, 3)]);

        // A producer that died after committing but before posting used_slots.
        assert_eq!(consumer.sems.mutex.wait().unwrap(), WaitOutcome::Acquired);
        header.writer_pid.store(dead_pid(), Ordering::Release);
        assert_eq!(
            consumer.sems.free_slots.wait().unwrap(),
            WaitOutcome::Acquired
        );
        consumer.region.write_slot(0, &s).unwrap();
        header.write_index.store(1, Ordering::Release);
        header.committed.fetch_add(1, Ordering::AcqRel);

        let recovery = consumer.recover_stalled_writer().unwrap().unwrap();
        assert_eq!(recovery.republished, 1);
        assert_eq!(recovery.reclaimed, 0);
        assert_eq!(consumer.sems.mutex.value().unwrap(), 1);
        assert_eq!(header.writer_pid.load(Ordering::Acquire), 0);
        assert_eq!(consumer.pop().unwrap(), PopOutcome::Slot(s));
        assert_eq!(
            consumer.slot_counts().unwrap(),
            SlotCounts { free: 3, used: 0 }
        );
    }

    #[test]
    fn recovery_reclaims_reserved_slot() {
        let (_names, consumer) = ring("ring-reclaim", 3);
        let header = consumer.region.header();

        // A producer that died after reserving a free slot, before writing.
        assert_eq!(consumer.sems.mutex.wait().unwrap(), WaitOutcome::Acquired);
        header.writer_pid.store(dead_pid(), Ordering::Release);
        assert_eq!(
            consumer.sems.free_slots.wait().unwrap(),
            WaitOutcome::Acquired
        );

        let recovery = consumer.recover_stalled_writer().unwrap().unwrap();
        assert_eq!(recovery.republished, 0);
        assert_eq!(recovery.reclaimed, 1);
        assert_eq!(
            consumer.slot_counts().unwrap(),
            SlotCounts { free: 3, used: 0 }
        );
        assert_eq!(consumer.sems.mutex.value().unwrap(), 1);
    }

    #[test]
    fn stale_dead_writer_pid_leaves_mutex_alone() {
        let (names, consumer) = ring("ring-stale-pid", 2);
        let producer = RingProducer::attach(&names).unwrap();
        let header = consumer.region.header();

        // A finished writer whose pid outlived its critical section.
        producer.push(&slot(&[(0, 1)])).unwrap();
        header.writer_pid.store(dead_pid(), Ordering::Release);
        assert_eq!(consumer.sems.mutex.value().unwrap(), 1);

        assert_eq!(consumer.recover_stalled_writer().unwrap(), None);
        assert_eq!(consumer.sems.mutex.value().unwrap(), 1);
        assert_eq!(header.writer_pid.load(Ordering::Acquire), 0);
        assert_eq!(
            consumer.slot_counts().unwrap(),
            SlotCounts { free: 1, used: 1 }
        );

        // The ring still serialises writers and delivers the slot once.
        assert_eq!(consumer.pop().unwrap(), PopOutcome::Slot(slot(&[(0, 1)])));
        assert_eq!(
            producer.push(&slot(&[(1, 0)])).unwrap(),
            PushOutcome::Committed { index: 1 }
        );
        assert_eq!(consumer.sems.mutex.value().unwrap(), 1);
    }
}
