//! Test utilities and fixtures for FAS development.
//!
//! [`ScopedNames`] gives every test its own POSIX namespace and removes
//! whatever the test left behind, so tests can run in parallel (and after
//! a crashed run) without name collisions.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::ffi::CString;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};

use fas_core::ResourceNames;
use nix::sys::mman;

static NEXT_SCOPE: AtomicU32 = AtomicU32::new(0);

/// Resource names unique to this process and call, unlinked on drop.
///
/// Derefs to [`ResourceNames`], so `&scoped` can be passed anywhere a
/// `&ResourceNames` is expected.
#[derive(Debug)]
pub struct ScopedNames {
    names: ResourceNames,
}

impl ScopedNames {
    /// Names of the form `/fast_<tag>_<pid>_<n>_{shm,mutex,free,used}`.
    pub fn new(tag: &str) -> Self {
        let n = NEXT_SCOPE.fetch_add(1, Ordering::Relaxed);
        let prefix = format!("fast_{tag}_{}_{n}", std::process::id());
        let names = ResourceNames::with_prefix(&prefix);
        cleanup(&names);
        Self { names }
    }

    /// An owned copy of the names, for configs that take them by value.
    pub fn to_names(&self) -> ResourceNames {
        self.names.clone()
    }

    /// The namespace prefix, as accepted by `--namespace`.
    pub fn prefix(&self) -> &str {
        self.names
            .region
            .trim_start_matches('/')
            .trim_end_matches("_shm")
    }
}

impl Deref for ScopedNames {
    type Target = ResourceNames;

    fn deref(&self) -> &ResourceNames {
        &self.names
    }
}

impl Drop for ScopedNames {
    fn drop(&mut self) {
        cleanup(&self.names);
    }
}

/// Unlink all four objects, ignoring names that do not exist.
pub fn cleanup(names: &ResourceNames) {
    let _ = mman::shm_unlink(&*names.region);
    for sem in [&names.mutex, &names.free_slots, &names.used_slots] {
        if let Ok(c_name) = CString::new(sem.as_bytes()) {
            sem_unlink(&c_name);
        }
    }
}

// nix has no named-semaphore wrappers.
#[allow(unsafe_code)]
fn sem_unlink(name: &CString) {
    // SAFETY: `name` is NUL-terminated and outlives the call.
    unsafe { libc::sem_unlink(name.as_ptr()) };
}
