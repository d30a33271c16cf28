//! Purpose: Dynamic-linker seam and the loaded-library record.
//! Exports: `Linker`, `SystemLinker`, `LoadedLibrary`, `LoadOrigin`, `search_path_file_name`.
//! Role: Keeps `libloading` behind one trait so the resolver can be driven by test linkers.
//! Invariants: A `LoadedLibrary` is never unloaded while symbols copied out of it are in use.
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::error::{Error, ErrorKind};

pub trait Linker: Send + Sync {
    type Library: Send + Sync + 'static;

    /// Opens a library. A bare file name defers to the platform linker's own search path.
    fn open(&self, path: &Path) -> Result<Self::Library, Error>;
}

/// Platform linker (`dlopen` / `LoadLibraryExW`) via `libloading`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemLinker;

impl Linker for SystemLinker {
    type Library = libloading::Library;

    fn open(&self, path: &Path) -> Result<Self::Library, Error> {
        // SAFETY: loading runs the library's initializers; the native artifact is trusted
        // the same way any linked dependency is.
        unsafe { libloading::Library::new(path) }.map_err(|err| {
            Error::new(ErrorKind::LibraryLoad)
                .with_message("platform linker rejected library")
                .with_path(path)
                .with_source(err)
        })
    }
}

/// Platform file name for a logical library name (`lib<name>.so`, `<name>.dll`, ...).
pub fn search_path_file_name(name: &str) -> OsString {
    libloading::library_filename(name)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadOrigin {
    SearchPath,
    EmbeddedResource,
}

impl LoadOrigin {
    pub fn label(self) -> &'static str {
        match self {
            LoadOrigin::SearchPath => "search-path",
            LoadOrigin::EmbeddedResource => "embedded-resource",
        }
    }
}

impl fmt::Display for LoadOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct LoadedLibrary<L> {
    library: L,
    origin: LoadOrigin,
    path: PathBuf,
}

impl<L> LoadedLibrary<L> {
    pub(crate) fn new(library: L, origin: LoadOrigin, path: PathBuf) -> Self {
        Self {
            library,
            origin,
            path,
        }
    }

    pub fn origin(&self) -> LoadOrigin {
        self.origin
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn library(&self) -> &L {
        &self.library
    }
}

impl<L> fmt::Debug for LoadedLibrary<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedLibrary")
            .field("origin", &self.origin)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LoadedLibrary<libloading::Library> {
    /// Looks up an exported symbol and copies it out (typically a fn pointer).
    ///
    /// # Safety
    ///
    /// `T` must match the symbol's real type, and the returned value must not be used
    /// after this library is dropped. The process-wide library is never dropped.
    pub unsafe fn symbol<T: Copy>(&self, name: &str) -> Result<T, Error> {
        let symbol = unsafe { self.library.get::<T>(name.as_bytes()) }.map_err(|err| {
            Error::new(ErrorKind::SymbolNotFound)
                .with_message(format!("missing export `{name}`"))
                .with_path(&self.path)
                .with_source(err)
        })?;
        Ok(*symbol)
    }
}
