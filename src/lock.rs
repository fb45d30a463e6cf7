// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-process mutual exclusion around the shared master-control register.
//! One advisory file lock per hardware IP; re-entrant within a process so
//! that a critical section built from several lock-guarded helper calls
//! does not self-deadlock.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::sync::Arc;

/// Directory lock files live in.
fn lock_path(canonical_ip: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/e7awg_{canonical_ip}.lock"))
}

/// Alternate prefix used by capture-side lock files.
fn capture_lock_path(canonical_ip: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/e7capture_{canonical_ip}.lock"))
}

thread_local! {
    /// Per-thread re-entrancy depth for each lock path this thread currently
    /// holds. A fresh `File`/`flock` pair is only opened when this thread's
    /// depth transitions 0 -> 1; it is released on the matching 1 -> 0.
    ///
    /// Each entry owns a dedicated open file description so that a *second*
    /// thread requesting the same path still blocks at the kernel level —
    /// sharing one fd across threads would make `flock` succeed for both,
    /// since exclusivity is scoped to the open file description, not the
    /// thread.
    static HELD: std::cell::RefCell<HashMap<PathBuf, (File, u32)>> =
        std::cell::RefCell::new(HashMap::new());
}

/// A re-entrant, file-backed mutual-exclusion handle for one hardware IP.
///
/// Cheap to clone (an `Arc` around the lock path); every clone guards the
/// same underlying file.
#[derive(Clone)]
pub struct InterProcessLock {
    path: Arc<PathBuf>,
}

/// RAII guard returned by [`InterProcessLock::acquire`]. Dropping it releases
/// one level of re-entrancy; the OS-level lock is released only when the
/// outermost guard for this thread is dropped.
pub struct LockGuard {
    path: Arc<PathBuf>,
}

impl InterProcessLock {
    /// Lock keyed on the AWG-side path convention.
    pub fn for_awg_ip(canonical_ip: &str) -> Self {
        Self {
            path: Arc::new(lock_path(canonical_ip)),
        }
    }

    /// Lock keyed on the capture-side path convention.
    pub fn for_capture_ip(canonical_ip: &str) -> Self {
        Self {
            path: Arc::new(capture_lock_path(canonical_ip)),
        }
    }

    /// Block until the lock is held (or re-entered by this thread), then
    /// return a guard that releases it on drop.
    pub fn acquire(&self) -> io::Result<LockGuard> {
        let already_held_depth = HELD.with(|held| {
            held.borrow_mut()
                .get_mut(self.path.as_ref())
                .map(|(_, depth)| {
                    *depth += 1;
                    *depth
                })
        });
        if already_held_depth.is_some() {
            return Ok(LockGuard {
                path: self.path.clone(),
            });
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.path.as_ref())?;
        // SAFETY: file stays open for the lifetime of the entry below; fd is valid.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        HELD.with(|held| {
            held.borrow_mut()
                .insert(self.path.as_ref().clone(), (file, 1));
        });
        Ok(LockGuard {
            path: self.path.clone(),
        })
    }

    /// Release all holds this thread has on the lock and delete the lock
    /// file. Other processes currently blocked on `acquire` will observe the
    /// file recreated on their next attempt.
    pub fn discard(&self) -> io::Result<()> {
        HELD.with(|held| {
            if let Some((file, _)) = held.borrow_mut().remove(self.path.as_ref()) {
                let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
                if rc != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
            Ok(())
        })?;
        match std::fs::remove_file(self.path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            let done = if let Some((_, depth)) = held.get_mut(self.path.as_ref()) {
                *depth -= 1;
                *depth == 0
            } else {
                false
            };
            if done {
                if let Some((file, _)) = held.remove(self.path.as_ref()) {
                    unsafe {
                        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentrant_acquire_within_thread_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.lock");
        let lock = InterProcessLock {
            path: Arc::new(path),
        };
        let outer = lock.acquire().unwrap();
        let inner = lock.acquire().unwrap();
        drop(inner);
        drop(outer);
    }

    #[test]
    fn discard_removes_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test2.lock");
        let lock = InterProcessLock {
            path: Arc::new(path.clone()),
        };
        let guard = lock.acquire().unwrap();
        drop(guard);
        assert!(path.exists());
        lock.discard().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn canonical_paths_use_expected_prefixes() {
        assert_eq!(
            lock_path("10.0.0.16"),
            PathBuf::from("/tmp/e7awg_10.0.0.16.lock")
        );
        assert_eq!(
            capture_lock_path("10.0.0.16"),
            PathBuf::from("/tmp/e7capture_10.0.0.16.lock")
        );
    }
}
