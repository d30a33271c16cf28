//! Purpose: Native-interop shim: once-only shared-library resolution and exactly-once handle release.
//! Exports: `api` (resolver, handles, config, errors).
//! Role: Library backing the `partition-link` diagnostic CLI and embedding applications.
//! Invariants: Native calls are sequenced after the library is loaded.
//! Invariants: Every native resource has exactly one release path.
pub mod api;
mod core;
