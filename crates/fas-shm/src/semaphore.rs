//! Named POSIX semaphores and the three-semaphore set guarding the ring.
//!
//! `nix` has no binding for named semaphores, so this module calls
//! `sem_open` and friends through `libc` directly. Every wait reports a
//! signal interruption as [`WaitOutcome::Interrupted`] instead of an error:
//! the caller treats it as an empty iteration.

use std::ffi::CString;
use std::ptr::NonNull;
use std::time::Duration;

use fas_core::ResourceNames;
use nix::errno::Errno;

use crate::error::ShmError;

/// Result of a semaphore wait that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The semaphore was decremented.
    Acquired,
    /// A signal handler ran while blocked; nothing was acquired.
    Interrupted,
    /// The timeout elapsed; nothing was acquired.
    TimedOut,
}

/// A named, process-shared counting semaphore.
///
/// Semaphores created with [`create`](Self::create) are unlinked on drop
/// unless they were explicitly closed first; semaphores opened with
/// [`open`](Self::open) are only closed.
pub struct NamedSemaphore {
    sem: NonNull<libc::sem_t>,
    name: String,
    open: bool,
    unlink_on_drop: bool,
}

// SAFETY: a POSIX semaphore handle is designed to be used from any thread;
// all operations on it are atomic in the kernel/libc.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a new semaphore with the given initial count.
    ///
    /// Fails with [`ShmError::ResourceConflict`] if the name already exists.
    pub fn create(name: &str, initial: u32) -> Result<Self, ShmError> {
        let c_name = c_name(name)?;
        // SAFETY: `c_name` is NUL-terminated; with O_CREAT, sem_open reads a
        // mode and an initial value from its variadic arguments, both passed
        // as unsigned int.
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        let mut sem = Self::from_raw(sem, name)?;
        sem.unlink_on_drop = true;
        Ok(sem)
    }

    /// Open an existing semaphore without touching its count.
    ///
    /// Fails with [`ShmError::NotFound`] if it does not exist.
    pub fn open(name: &str) -> Result<Self, ShmError> {
        let c_name = c_name(name)?;
        // SAFETY: `c_name` is NUL-terminated; without O_CREAT no variadic
        // arguments are read.
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        Self::from_raw(sem, name)
    }

    fn from_raw(sem: *mut libc::sem_t, name: &str) -> Result<Self, ShmError> {
        if sem == libc::SEM_FAILED {
            return Err(ShmError::from_open(name, "sem_open", Errno::last()));
        }
        let sem = NonNull::new(sem)
            .ok_or_else(|| ShmError::from_open(name, "sem_open", Errno::last()))?;
        Ok(Self {
            sem,
            name: name.to_string(),
            open: true,
            unlink_on_drop: false,
        })
    }

    /// The system-visible name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the count is positive, then decrement it.
    pub fn wait(&self) -> Result<WaitOutcome, ShmError> {
        // SAFETY: `sem` stays a valid open semaphore until close/drop.
        if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
            return Ok(WaitOutcome::Acquired);
        }
        match Errno::last() {
            Errno::EINTR => Ok(WaitOutcome::Interrupted),
            source => Err(self.wait_failed(source)),
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<WaitOutcome, ShmError> {
        let deadline = realtime_deadline(timeout).map_err(|e| self.wait_failed(e))?;
        // SAFETY: `sem` is open and `deadline` is a valid timespec.
        if unsafe { libc::sem_timedwait(self.sem.as_ptr(), &deadline) } == 0 {
            return Ok(WaitOutcome::Acquired);
        }
        match Errno::last() {
            Errno::EINTR => Ok(WaitOutcome::Interrupted),
            Errno::ETIMEDOUT => Ok(WaitOutcome::TimedOut),
            source => Err(self.wait_failed(source)),
        }
    }

    /// Increment the count, waking one waiter if any.
    pub fn post(&self) -> Result<(), ShmError> {
        // SAFETY: `sem` is open.
        if unsafe { libc::sem_post(self.sem.as_ptr()) } == 0 {
            return Ok(());
        }
        Err(ShmError::PostFailed {
            name: self.name.clone(),
            source: Errno::last(),
        })
    }

    /// Current count. Only a snapshot: other processes may change it
    /// immediately after.
    pub fn value(&self) -> Result<u32, ShmError> {
        let mut value: libc::c_int = 0;
        // SAFETY: `sem` is open and `value` is a valid out-pointer.
        if unsafe { libc::sem_getvalue(self.sem.as_ptr(), &mut value) } != 0 {
            return Err(ShmError::QueryFailed {
                name: self.name.clone(),
                source: Errno::last(),
            });
        }
        // Linux reports 0 (never negative) when there are waiters.
        Ok(value.max(0) as u32)
    }

    /// Close this handle, keeping the name in the system namespace.
    pub fn close(mut self) -> Result<(), ShmError> {
        self.unlink_on_drop = false;
        self.close_handle()
    }

    /// Close this handle and remove the name from the system namespace.
    pub fn destroy(mut self) -> Result<(), ShmError> {
        self.unlink_on_drop = false;
        let closed = self.close_handle();
        let unlinked = Self::unlink(&self.name);
        closed.and(unlinked)
    }

    /// Remove a semaphore name from the system namespace.
    pub fn unlink(name: &str) -> Result<(), ShmError> {
        let c_name = c_name(name)?;
        // SAFETY: `c_name` is NUL-terminated.
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } == 0 {
            return Ok(());
        }
        Err(ShmError::ReleaseFailed {
            name: name.to_string(),
            op: "sem_unlink",
            source: Errno::last(),
        })
    }

    fn close_handle(&mut self) -> Result<(), ShmError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        // SAFETY: `sem` is open and is not used again after this call.
        if unsafe { libc::sem_close(self.sem.as_ptr()) } == 0 {
            return Ok(());
        }
        Err(ShmError::ReleaseFailed {
            name: self.name.clone(),
            op: "sem_close",
            source: Errno::last(),
        })
    }

    fn wait_failed(&self, source: Errno) -> ShmError {
        ShmError::WaitFailed {
            name: self.name.clone(),
            source,
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        let _ = self.close_handle();
        if self.unlink_on_drop {
            let _ = Self::unlink(&self.name);
        }
    }
}

impl std::fmt::Debug for NamedSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedSemaphore")
            .field("name", &self.name)
            .field("open", &self.open)
            .finish()
    }
}

fn c_name(name: &str) -> Result<CString, ShmError> {
    CString::new(name).map_err(|_| ShmError::InvalidName {
        name: name.to_string(),
    })
}

/// Absolute `CLOCK_REALTIME` deadline `timeout` from now, as
/// `sem_timedwait` expects.
fn realtime_deadline(timeout: Duration) -> Result<libc::timespec, Errno> {
    // SAFETY: timespec is plain old data; all-zero is a valid value.
    let mut now: libc::timespec = unsafe { std::mem::zeroed() };
    // SAFETY: `now` is a valid out-pointer.
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) } != 0 {
        return Err(Errno::last());
    }
    let nanos = now.tv_nsec as u64 + u64::from(timeout.subsec_nanos());
    let secs = timeout.as_secs() + nanos / 1_000_000_000;
    now.tv_sec = now.tv_sec.saturating_add(secs as libc::time_t);
    now.tv_nsec = (nanos % 1_000_000_000) as _;
    Ok(now)
}

// ── SemaphoreSet ─────────────────────────────────────────────────

/// The three semaphores of the ring protocol.
#[derive(Debug)]
pub struct SemaphoreSet {
    /// Binary; held by a producer while it reserves and fills a slot.
    pub mutex: NamedSemaphore,
    /// Counts empty slots; producers wait, the consumer posts.
    pub free_slots: NamedSemaphore,
    /// Counts filled slots; the consumer waits, producers post.
    pub used_slots: NamedSemaphore,
}

impl SemaphoreSet {
    /// Create all three semaphores: `mutex = 1`, `free_slots = capacity`,
    /// `used_slots = 0`.
    ///
    /// If any creation fails, the ones already created here are destroyed
    /// before the error is returned. Names that already existed are never
    /// removed.
    pub fn create_all(names: &ResourceNames, capacity: u32) -> Result<Self, ShmError> {
        let mutex = NamedSemaphore::create(&names.mutex, 1)?;
        let free_slots = match NamedSemaphore::create(&names.free_slots, capacity) {
            Ok(sem) => sem,
            Err(e) => {
                discard(mutex);
                return Err(e);
            }
        };
        let used_slots = match NamedSemaphore::create(&names.used_slots, 0) {
            Ok(sem) => sem,
            Err(e) => {
                discard(free_slots);
                discard(mutex);
                return Err(e);
            }
        };
        Ok(Self {
            mutex,
            free_slots,
            used_slots,
        })
    }

    /// Open the three semaphores of a running supervisor.
    ///
    /// Already-opened handles are closed (not removed) if a later open fails.
    pub fn attach_all(names: &ResourceNames) -> Result<Self, ShmError> {
        Ok(Self {
            mutex: NamedSemaphore::open(&names.mutex)?,
            free_slots: NamedSemaphore::open(&names.free_slots)?,
            used_slots: NamedSemaphore::open(&names.used_slots)?,
        })
    }

    /// Close all three handles; with `destroy`, also remove the names.
    ///
    /// Every semaphore is released even if an earlier one fails; the first
    /// error is returned.
    pub fn close_all(self, destroy: bool) -> Result<(), ShmError> {
        let Self {
            mutex,
            free_slots,
            used_slots,
        } = self;
        let release = |sem: NamedSemaphore| {
            if destroy {
                sem.destroy()
            } else {
                sem.close()
            }
        };
        let results = [release(mutex), release(free_slots), release(used_slots)];
        results.into_iter().collect::<Result<Vec<()>, _>>().map(|_| ())
    }
}

fn discard(sem: NamedSemaphore) {
    let name = sem.name().to_string();
    if let Err(e) = sem.destroy() {
        tracing::warn!(%name, error = %e, "failed to remove semaphore after partial creation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fas_test_utils::ScopedNames;

    #[test]
    fn create_then_open_shares_count() {
        let names = ScopedNames::new("sem-share");
        let created = NamedSemaphore::create(&names.mutex, 2).unwrap();
        let opened = NamedSemaphore::open(&names.mutex).unwrap();

        assert_eq!(opened.wait().unwrap(), WaitOutcome::Acquired);
        assert_eq!(created.value().unwrap(), 1);
        created.post().unwrap();
        assert_eq!(opened.value().unwrap(), 2);

        opened.close().unwrap();
        created.destroy().unwrap();
    }

    #[test]
    fn create_conflicts_with_existing_name() {
        let names = ScopedNames::new("sem-conflict");
        let _first = NamedSemaphore::create(&names.mutex, 1).unwrap();
        let err = NamedSemaphore::create(&names.mutex, 1).unwrap_err();
        assert!(err.is_conflict(), "got {err}");
    }

    #[test]
    fn open_missing_is_not_found() {
        let names = ScopedNames::new("sem-missing");
        let err = NamedSemaphore::open(&names.used_slots).unwrap_err();
        assert!(err.is_not_found(), "got {err}");
    }

    #[test]
    fn timed_wait_times_out_on_zero_count() {
        let names = ScopedNames::new("sem-timeout");
        let sem = NamedSemaphore::create(&names.used_slots, 0).unwrap();
        let outcome = sem.wait_timeout(Duration::from_millis(20)).unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
        sem.post().unwrap();
        let outcome = sem.wait_timeout(Duration::from_millis(20)).unwrap();
        assert_eq!(outcome, WaitOutcome::Acquired);
    }

    #[test]
    fn drop_of_created_semaphore_unlinks() {
        let names = ScopedNames::new("sem-drop");
        drop(NamedSemaphore::create(&names.free_slots, 3).unwrap());
        assert!(NamedSemaphore::open(&names.free_slots)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn create_all_initial_counts() {
        let names = ScopedNames::new("sem-set");
        let set = SemaphoreSet::create_all(&names, 5).unwrap();
        assert_eq!(set.mutex.value().unwrap(), 1);
        assert_eq!(set.free_slots.value().unwrap(), 5);
        assert_eq!(set.used_slots.value().unwrap(), 0);

        let attached = SemaphoreSet::attach_all(&names).unwrap();
        assert_eq!(attached.free_slots.value().unwrap(), 5);
        attached.close_all(false).unwrap();

        set.close_all(true).unwrap();
        assert!(SemaphoreSet::attach_all(&names).unwrap_err().is_not_found());
    }

    #[test]
    fn create_all_cleans_up_on_partial_failure() {
        let names = ScopedNames::new("sem-partial");
        // Occupy the last name so the third creation fails.
        let squatter = NamedSemaphore::create(&names.used_slots, 0).unwrap();

        let err = SemaphoreSet::create_all(&names, 4).unwrap_err();
        assert!(err.is_conflict());

        // The two semaphores created before the failure are gone ...
        assert!(NamedSemaphore::open(&names.mutex).unwrap_err().is_not_found());
        assert!(NamedSemaphore::open(&names.free_slots)
            .unwrap_err()
            .is_not_found());
        // ... and the pre-existing one was left alone.
        assert!(NamedSemaphore::open(&names.used_slots).is_ok());
        squatter.destroy().unwrap();
    }
}
