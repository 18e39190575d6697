//! Process-scoped companion app install status.
//!
//! Resolution rules:
//! - nothing cached: check, and cache the answer unless it is `Unknown`;
//! - cached: return the cached answer without probing;
//! - the first cached answer never changes for the life of the process.
//!
//! Concurrent first resolutions may check more than once; only one answer
//! is kept.

use once_cell::sync::OnceCell;

use crate::ad_url::InstallStatus;

static PROCESS_INSTALL_STATUS: InstallStatusCache = InstallStatusCache::new();

#[derive(Debug, Default)]
pub struct InstallStatusCache {
    status: OnceCell<InstallStatus>,
}

impl InstallStatusCache {
    pub const fn new() -> Self {
        Self {
            status: OnceCell::new(),
        }
    }

    /// The cache shared by every generator in this process.
    pub fn global() -> &'static InstallStatusCache {
        &PROCESS_INSTALL_STATUS
    }

    pub fn get(&self) -> Option<InstallStatus> {
        self.status.get().copied()
    }

    pub fn resolve<F>(&self, check: F) -> InstallStatus
    where
        F: FnOnce() -> InstallStatus,
    {
        if let Some(status) = self.get() {
            return status;
        }

        match check() {
            InstallStatus::Unknown => InstallStatus::Unknown,
            status => *self.status.get_or_init(|| status),
        }
    }
}
