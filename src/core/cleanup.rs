//! Purpose: Best-effort removal of extracted library files at normal process exit.
//! Exports: `delete_on_exit`.
//! Invariants: The exit hook is registered at most once per process.
//! Notes: Abnormal termination skips the hook; Windows may refuse to delete a loaded DLL.
use std::path::PathBuf;
use std::sync::{Mutex, Once};

static PENDING: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
static HOOK: Once = Once::new();

pub fn delete_on_exit(path: impl Into<PathBuf>) {
    HOOK.call_once(|| {
        // SAFETY: `run_exit_cleanup` is a plain `extern "C"` fn with no captured state.
        let rc = unsafe { libc::atexit(run_exit_cleanup) };
        if rc != 0 {
            tracing::warn!("failed to register exit cleanup hook");
        }
    });
    let mut pending = PENDING.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    pending.push(path.into());
}

#[cfg(test)]
pub(crate) fn pending_paths() -> Vec<PathBuf> {
    PENDING
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

extern "C" fn run_exit_cleanup() {
    let paths = match PENDING.lock() {
        Ok(mut guard) => std::mem::take(&mut *guard),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
}
