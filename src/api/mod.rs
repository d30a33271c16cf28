//! Purpose: Public Rust API boundary for the native-interop shim.
//! Exports: Resolver, handle, config, platform, bundle, and error types plus handle variants.
//! Role: Additive-only surface; internal modules stay private.
//! Invariants: This module is the only public path to `core`.

mod database;
mod report;

pub use crate::core::bundle::{DirBundle, MemoryBundle, ResourceBundle};
pub use crate::core::cleanup::delete_on_exit;
pub use crate::core::config::{
    DEFAULT_BASE_NAME, ENV_BASE_NAME, ENV_LIBRARY_PATH, ENV_OS_NAME, ENV_RESOURCE_DIR,
    LoaderConfig,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::handle::{HandleKind, NativeHandle, ResourceId};
pub use crate::core::linker::{LoadOrigin, LoadedLibrary, Linker, SystemLinker, search_path_file_name};
pub use crate::core::platform::Platform;
pub use crate::core::resolver::{
    AttemptOutcome, LibraryResolver, LibraryState, LoadAttempt, ensure_loaded, process_resolver,
};
pub use database::{Database, DatabaseHandle};
pub use report::{PlatformReport, ResolveReport};
