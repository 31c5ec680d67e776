//! The memory-mapped POSIX shared memory object holding the ring.
//!
//! Lifecycle:
//!
//! - **Create** (supervisor): `shm_open(O_CREAT | O_EXCL | O_RDWR)` +
//!   `ftruncate` + `mmap`, then the header is written and `active` set.
//! - **Attach** (generator): `shm_open(O_RDWR)` + `fstat` + `mmap`, then the
//!   header is validated against this build's layout.
//! - **Drop**: `munmap`; the creator additionally `shm_unlink`s.

use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::os::fd::AsFd;
use std::ptr::NonNull;
use std::sync::atomic::Ordering;

use fas_core::{FasSlot, MAX_FAS_LEN};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{self, MapFlags, ProtFlags};
use nix::sys::stat::{self, Mode};
use nix::unistd;

use crate::error::ShmError;
use crate::layout::{
    region_size, slot_offset, RawSlot, RegionHeader, HEADER_SIZE, LAYOUT_VERSION, MAX_CAPACITY,
    REGION_MAGIC, SLOT_SIZE,
};

/// A mapped ring region.
///
/// The header's atomics are shared with other processes; slot bodies are
/// only touched through [`write_slot`](Self::write_slot) and
/// [`read_slot`](Self::read_slot), whose callers must hold the semaphore
/// that grants them that slot.
pub struct SharedRegion {
    name: String,
    base: NonNull<c_void>,
    len: usize,
    capacity: u32,
    owner: bool,
    mapped: bool,
    linked: bool,
}

// SAFETY: the mapping stays valid until `unmap`, which needs `&mut self`.
// Header fields mutated after creation are atomics; slot bodies are
// accessed by value under the ring semaphores.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Create, size and map a new region of `capacity` slots.
    ///
    /// Fails with [`ShmError::ResourceConflict`] if the name exists. Once the
    /// object has been created, any later failure unlinks it again.
    pub fn create(name: &str, capacity: u32) -> Result<Self, ShmError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(ShmError::InvalidCapacity { capacity });
        }
        let len = region_size(capacity);
        let fd = mman::shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(|e| ShmError::from_open(name, "shm_open", e))?;

        let failed = |op: &'static str, source: Errno| {
            let _ = mman::shm_unlink(name);
            ShmError::AllocationFailed {
                name: name.to_string(),
                op,
                source,
            }
        };

        unistd::ftruncate(&fd, len as libc::off_t).map_err(|e| failed("ftruncate", e))?;
        let base = map(&fd, len).map_err(|e| failed("mmap", e))?;

        // SAFETY: the mapping is fresh, zero-filled by ftruncate, at least
        // HEADER_SIZE bytes and page aligned. No other process can validate
        // it until `active` is published below, so plain writes are fine.
        unsafe {
            let header = base.as_ptr().cast::<RegionHeader>();
            (*header).magic = REGION_MAGIC;
            (*header).version = LAYOUT_VERSION;
            (*header).capacity = capacity;
            (*header).max_fas_len = MAX_FAS_LEN as u32;
            (*header).slot_size = SLOT_SIZE as u32;
        }

        let region = Self {
            name: name.to_string(),
            base,
            len,
            capacity,
            owner: true,
            mapped: true,
            linked: true,
        };
        region.header().active.store(1, Ordering::Release);
        tracing::debug!(name, capacity, bytes = len, "shared region created");
        Ok(region)
    }

    /// Map an existing region read-write and validate its header.
    ///
    /// Fails with [`ShmError::NotFound`] if no supervisor created it, and
    /// with [`ShmError::LayoutMismatch`] if it was created by an
    /// incompatible build.
    pub fn attach(name: &str) -> Result<Self, ShmError> {
        let fd = mman::shm_open(name, OFlag::O_RDWR, Mode::empty())
            .map_err(|e| ShmError::from_open(name, "shm_open", e))?;
        let file_size = stat::fstat(&fd)
            .map_err(|source| ShmError::AllocationFailed {
                name: name.to_string(),
                op: "fstat",
                source,
            })?
            .st_size as usize;
        if file_size < HEADER_SIZE {
            return Err(mismatch(
                name,
                format!("region is {file_size} bytes, smaller than the {HEADER_SIZE}-byte header"),
            ));
        }

        let base = map(&fd, file_size).map_err(|source| ShmError::AllocationFailed {
            name: name.to_string(),
            op: "mmap",
            source,
        })?;
        let mut region = Self {
            name: name.to_string(),
            base,
            len: file_size,
            capacity: 0,
            owner: false,
            mapped: true,
            linked: true,
        };
        // Dropping `region` on error unmaps it.
        region.capacity = region.validate_header()?;
        tracing::debug!(name, capacity = region.capacity, "shared region attached");
        Ok(region)
    }

    fn validate_header(&self) -> Result<u32, ShmError> {
        let header = self.header();
        if header.magic != REGION_MAGIC {
            return Err(mismatch(&self.name, "bad magic".into()));
        }
        if header.version != LAYOUT_VERSION {
            return Err(mismatch(
                &self.name,
                format!("layout version {} (expected {LAYOUT_VERSION})", header.version),
            ));
        }
        if header.max_fas_len != MAX_FAS_LEN as u32 || header.slot_size != SLOT_SIZE as u32 {
            return Err(mismatch(
                &self.name,
                format!(
                    "slots of {} edges / {} bytes (expected {MAX_FAS_LEN} / {SLOT_SIZE})",
                    header.max_fas_len, header.slot_size
                ),
            ));
        }
        let capacity = header.capacity;
        if capacity == 0 || capacity > MAX_CAPACITY || region_size(capacity) > self.len {
            return Err(mismatch(
                &self.name,
                format!("capacity {capacity} does not fit a {}-byte region", self.len),
            ));
        }
        Ok(capacity)
    }

    /// The shared memory object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of ring slots.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether this handle created the region and is responsible for
    /// unlinking it.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Whether the search is still running.
    pub fn is_active(&self) -> bool {
        self.header().active.load(Ordering::Acquire) != 0
    }

    /// Clear `active`. Returns whether this call changed it.
    pub(crate) fn deactivate(&self) -> bool {
        self.header().active.swap(0, Ordering::AcqRel) != 0
    }

    pub(crate) fn header(&self) -> &RegionHeader {
        // SAFETY: the mapping is at least HEADER_SIZE bytes, page aligned and
        // outlives `&self`. Non-atomic header fields are only written in
        // `create` before any reference exists.
        unsafe { self.base.cast::<RegionHeader>().as_ref() }
    }

    fn slot_ptr(&self, index: u32) -> Result<*mut RawSlot, ShmError> {
        if index >= self.capacity {
            return Err(ShmError::IndexOutOfBounds {
                index,
                capacity: self.capacity,
            });
        }
        // SAFETY: index < capacity, and the mapping covers
        // region_size(capacity) bytes.
        Ok(unsafe { self.base.as_ptr().cast::<u8>().add(slot_offset(index)) }.cast())
    }

    /// Store `slot` at ring position `index`.
    ///
    /// The caller must have acquired a free slot and hold the producer mutex.
    pub(crate) fn write_slot(&self, index: u32, slot: &FasSlot) -> Result<(), ShmError> {
        self.write_raw_slot(index, RawSlot::encode(slot))
    }

    pub(crate) fn write_raw_slot(&self, index: u32, raw: RawSlot) -> Result<(), ShmError> {
        let ptr = self.slot_ptr(index)?;
        // SAFETY: in bounds and suitably aligned (HEADER_SIZE and SLOT_SIZE
        // are multiples of 4); the ring protocol gives this writer exclusive
        // use of the slot.
        unsafe { ptr.write_volatile(raw) };
        Ok(())
    }

    /// Copy the slot at ring position `index` out of shared memory.
    ///
    /// The caller must have acquired a used slot.
    pub(crate) fn read_slot(&self, index: u32) -> Result<RawSlot, ShmError> {
        let ptr = self.slot_ptr(index)?;
        // SAFETY: in bounds and aligned; the slot was published by a
        // `used_slots` post that happened before our wait returned.
        Ok(unsafe { ptr.read_volatile() })
    }

    /// Unmap and, if this handle created the region, unlink it.
    ///
    /// Processes that still have it mapped keep a valid mapping; the name
    /// disappears immediately.
    pub fn destroy(mut self) -> Result<(), ShmError> {
        let unmapped = self.unmap();
        let unlinked = if self.owner { self.unlink() } else { Ok(()) };
        unmapped.and(unlinked)
    }

    /// Unmap without unlinking, even if this handle is the owner.
    pub fn detach(mut self) -> Result<(), ShmError> {
        self.linked = false;
        self.unmap()
    }

    fn unmap(&mut self) -> Result<(), ShmError> {
        if !self.mapped {
            return Ok(());
        }
        self.mapped = false;
        // SAFETY: `base`/`len` describe our own mapping and no reference into
        // it survives `&mut self`.
        unsafe { mman::munmap(self.base, self.len) }.map_err(|source| ShmError::ReleaseFailed {
            name: self.name.clone(),
            op: "munmap",
            source,
        })
    }

    fn unlink(&mut self) -> Result<(), ShmError> {
        if !self.linked {
            return Ok(());
        }
        self.linked = false;
        mman::shm_unlink(self.name.as_str()).map_err(|source| ShmError::ReleaseFailed {
            name: self.name.clone(),
            op: "shm_unlink",
            source,
        })
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        let _ = self.unmap();
        if self.owner {
            let _ = self.unlink();
        }
    }
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("owner", &self.owner)
            .finish()
    }
}

fn map(fd: impl AsFd, len: usize) -> Result<NonNull<c_void>, Errno> {
    let length = NonZeroUsize::new(len).ok_or(Errno::EINVAL)?;
    // SAFETY: a new shared mapping of a descriptor we hold; nothing else in
    // this process aliases it yet.
    unsafe {
        mman::mmap(
            None,
            length,
            ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
            MapFlags::MAP_SHARED,
            fd,
            0,
        )
    }
}

fn mismatch(name: &str, reason: String) -> ShmError {
    ShmError::LayoutMismatch {
        name: name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fas_core::Edge;
    use fas_test_utils::ScopedNames;

    #[test]
    fn create_initialises_header() {
        let names = ScopedNames::new("region-init");
        let region = SharedRegion::create(&names.region, 4).unwrap();
        assert!(region.is_owner());
        assert!(region.is_active());
        assert_eq!(region.capacity(), 4);
        let header = region.header();
        assert_eq!(header.write_index.load(Ordering::Relaxed), 0);
        assert_eq!(header.read_index.load(Ordering::Relaxed), 0);
        assert_eq!(header.writer_pid.load(Ordering::Relaxed), 0);
        region.destroy().unwrap();
    }

    #[test]
    fn create_twice_conflicts() {
        let names = ScopedNames::new("region-conflict");
        let _first = SharedRegion::create(&names.region, 2).unwrap();
        let err = SharedRegion::create(&names.region, 2).unwrap_err();
        assert!(err.is_conflict(), "got {err}");
    }

    #[test]
    fn zero_capacity_rejected() {
        let names = ScopedNames::new("region-zero");
        let err = SharedRegion::create(&names.region, 0).unwrap_err();
        assert_eq!(err, ShmError::InvalidCapacity { capacity: 0 });
    }

    #[test]
    fn attach_sees_owner_writes() {
        let names = ScopedNames::new("region-attach");
        let owner = SharedRegion::create(&names.region, 3).unwrap();
        let attached = SharedRegion::attach(&names.region).unwrap();
        assert!(!attached.is_owner());
        assert_eq!(attached.capacity(), 3);

        let slot = FasSlot::from_edges(&[Edge::new(4, 3), Edge::new(6, 0)]).unwrap();
        attached.write_slot(2, &slot).unwrap();
        assert_eq!(owner.read_slot(2).unwrap().decode().unwrap(), slot);

        assert!(owner.deactivate());
        assert!(!owner.deactivate());
        assert!(!attached.is_active());

        attached.detach().unwrap();
        owner.destroy().unwrap();
    }

    #[test]
    fn attach_missing_is_not_found() {
        let names = ScopedNames::new("region-missing");
        let err = SharedRegion::attach(&names.region).unwrap_err();
        assert!(err.is_not_found(), "got {err}");
    }

    #[test]
    fn attach_rejects_foreign_object() {
        let names = ScopedNames::new("region-foreign");
        let fd = mman::shm_open(
            &*names.region,
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .unwrap();
        unistd::ftruncate(&fd, 4096).unwrap();

        let err = SharedRegion::attach(&names.region).unwrap_err();
        assert!(matches!(err, ShmError::LayoutMismatch { .. }), "got {err}");
    }

    #[test]
    fn slot_access_is_bounds_checked() {
        let names = ScopedNames::new("region-bounds");
        let region = SharedRegion::create(&names.region, 2).unwrap();
        assert_eq!(
            region.read_slot(2).unwrap_err(),
            ShmError::IndexOutOfBounds {
                index: 2,
                capacity: 2
            }
        );
        assert!(region.write_slot(5, &FasSlot::ACYCLIC).is_err());
    }

    #[test]
    fn drop_of_owner_unlinks() {
        let names = ScopedNames::new("region-drop");
        drop(SharedRegion::create(&names.region, 1).unwrap());
        assert!(SharedRegion::attach(&names.region).unwrap_err().is_not_found());
    }
}
