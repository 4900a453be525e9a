// src/connector/guard.rs

//! Defines `StartGuard`, an RAII guard for the connector's started flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds the started flag for the lifetime of one `Connector::start` run and
/// clears it on drop, whether the run returned or its future was dropped.
pub(crate) struct StartGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> StartGuard<'a> {
    /// Sets the flag, or returns `None` if it is already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
