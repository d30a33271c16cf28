//! Purpose: Locate and load the native library exactly once.
//! Exports: `LibraryResolver`, `LibraryState`, `LoadAttempt`, `AttemptOutcome`, `ensure_loaded`.
//! Role: Strategy chain (search path, then embedded resource) behind double-checked locking.
//! Invariants: Strategies run at most once per resolver; the settled outcome never changes.
//! Invariants: A failed load is replayed to every later caller as `LibraryLoad`; never retried.
//! Invariants: The settled fast path takes no lock.
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, OnceLock};

use serde::Serialize;

use crate::core::bundle::{DirBundle, MemoryBundle, ResourceBundle};
use crate::core::cleanup;
use crate::core::config::{ENV_LIBRARY_PATH, LoaderConfig};
use crate::core::error::{Error, ErrorKind};
use crate::core::linker::{LoadOrigin, LoadedLibrary, Linker, SystemLinker, search_path_file_name};

static PROCESS: LazyLock<LibraryResolver> =
    LazyLock::new(|| LibraryResolver::from_config(LoaderConfig::from_env()));

/// Loads the process-wide native library (configured from the environment) once.
pub fn ensure_loaded() -> Result<Arc<LoadedLibrary<libloading::Library>>, Error> {
    PROCESS.ensure_loaded()
}

pub fn process_resolver() -> &'static LibraryResolver {
    &PROCESS
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Loaded,
    Skipped,
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoadAttempt {
    pub strategy: LoadOrigin,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl LoadAttempt {
    fn loaded(strategy: LoadOrigin, path: &Path) -> Self {
        Self {
            strategy,
            outcome: AttemptOutcome::Loaded,
            path: Some(path.to_path_buf()),
            detail: None,
        }
    }

    fn skipped(strategy: LoadOrigin, detail: String) -> Self {
        Self {
            strategy,
            outcome: AttemptOutcome::Skipped,
            path: None,
            detail: Some(detail),
        }
    }

    fn failed(strategy: LoadOrigin, err: &Error) -> Self {
        Self {
            strategy,
            outcome: AttemptOutcome::Failed,
            path: err.path().map(Path::to_path_buf),
            detail: Some(describe(err)),
        }
    }

    fn summary(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}: {detail}", self.strategy),
            None => format!("{}: {:?}", self.strategy, self.outcome),
        }
    }
}

pub enum LibraryState<L> {
    NotLoaded,
    Loaded(Arc<LoadedLibrary<L>>),
    FailedPermanently(Error),
}

impl<L> LibraryState<L> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LibraryState::Loaded(_))
    }
}

struct Failure {
    message: String,
    hint: String,
    cause: Arc<Error>,
}

impl Failure {
    fn to_error(&self) -> Error {
        Error::new(ErrorKind::LibraryLoad)
            .with_message(self.message.clone())
            .with_hint(self.hint.clone())
            .with_source(Arc::clone(&self.cause))
    }
}

struct Settled<L> {
    outcome: Result<Arc<LoadedLibrary<L>>, Failure>,
    attempts: Vec<LoadAttempt>,
}

impl<L> Settled<L> {
    fn result(&self) -> Result<Arc<LoadedLibrary<L>>, Error> {
        match &self.outcome {
            Ok(library) => Ok(Arc::clone(library)),
            Err(failure) => Err(failure.to_error()),
        }
    }
}

pub struct LibraryResolver<K: Linker = SystemLinker> {
    config: LoaderConfig,
    linker: K,
    bundle: Box<dyn ResourceBundle>,
    settled: OnceLock<Settled<K::Library>>,
    load_lock: Mutex<()>,
}

impl LibraryResolver<SystemLinker> {
    /// System linker with a directory bundle at `config.resource_dir()`.
    pub fn from_config(config: LoaderConfig) -> Self {
        let bundle: Box<dyn ResourceBundle> = match config.resource_dir() {
            Some(dir) => Box::new(DirBundle::new(dir)),
            None => Box::new(MemoryBundle::new()),
        };
        Self::new(config, SystemLinker).with_boxed_bundle(bundle)
    }
}

impl<K: Linker> LibraryResolver<K> {
    pub fn new(config: LoaderConfig, linker: K) -> Self {
        Self {
            config,
            linker,
            bundle: Box::new(MemoryBundle::new()),
            settled: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn with_bundle(self, bundle: impl ResourceBundle + 'static) -> Self {
        self.with_boxed_bundle(Box::new(bundle))
    }

    fn with_boxed_bundle(mut self, bundle: Box<dyn ResourceBundle>) -> Self {
        self.bundle = bundle;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn ensure_loaded(&self) -> Result<Arc<LoadedLibrary<K::Library>>, Error> {
        if let Some(settled) = self.settled.get() {
            return settled.result();
        }

        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another caller may have settled the state while we waited.
        if let Some(settled) = self.settled.get() {
            return settled.result();
        }
        self.settled.get_or_init(|| self.load()).result()
    }

    pub fn state(&self) -> LibraryState<K::Library> {
        match self.settled.get() {
            None => LibraryState::NotLoaded,
            Some(Settled {
                outcome: Ok(library),
                ..
            }) => LibraryState::Loaded(Arc::clone(library)),
            Some(Settled {
                outcome: Err(failure),
                ..
            }) => LibraryState::FailedPermanently(failure.to_error()),
        }
    }

    /// Loaded library, without triggering a load.
    pub fn library(&self) -> Option<Arc<LoadedLibrary<K::Library>>> {
        match self.settled.get() {
            Some(Settled {
                outcome: Ok(library),
                ..
            }) => Some(Arc::clone(library)),
            _ => None,
        }
    }

    /// Strategy attempts of the settled load; empty before the first load.
    pub fn attempts(&self) -> &[LoadAttempt] {
        self.settled
            .get()
            .map(|settled| settled.attempts.as_slice())
            .unwrap_or(&[])
    }

    fn load(&self) -> Settled<K::Library> {
        let base_name = self.config.base_name();
        let mut attempts = Vec::with_capacity(2);

        let mut last_cause = match self.load_from_search_path() {
            Ok(library) => {
                attempts.push(LoadAttempt::loaded(LoadOrigin::SearchPath, library.path()));
                return self.settle_loaded(library, attempts);
            }
            Err(err) => {
                tracing::debug!(library = base_name, error = %describe(&err), "search path load failed");
                attempts.push(LoadAttempt::failed(LoadOrigin::SearchPath, &err));
                err
            }
        };

        match self.load_from_bundle() {
            Ok(Some(library)) => {
                attempts.push(LoadAttempt::loaded(
                    LoadOrigin::EmbeddedResource,
                    library.path(),
                ));
                return self.settle_loaded(library, attempts);
            }
            Ok(None) => {
                let key = self.config.resource_key();
                tracing::debug!(library = base_name, key = %key, "no bundled library");
                attempts.push(LoadAttempt::skipped(
                    LoadOrigin::EmbeddedResource,
                    format!("not bundled at {}", self.bundle.locate(&key)),
                ));
            }
            Err(err) => {
                tracing::debug!(library = base_name, error = %describe(&err), "embedded resource load failed");
                attempts.push(LoadAttempt::failed(LoadOrigin::EmbeddedResource, &err));
                last_cause = err;
            }
        }

        let summary: Vec<String> = attempts.iter().map(LoadAttempt::summary).collect();
        let failure = Failure {
            message: format!(
                "native library `{base_name}` could not be loaded ({})",
                summary.join("; ")
            ),
            hint: format!(
                "Add the library directory to {ENV_LIBRARY_PATH} or bundle `{}` with the application.",
                self.config.resource_key()
            ),
            cause: Arc::new(last_cause),
        };
        tracing::warn!(library = base_name, "{}", failure.message);
        Settled {
            outcome: Err(failure),
            attempts,
        }
    }

    fn settle_loaded(
        &self,
        library: LoadedLibrary<K::Library>,
        attempts: Vec<LoadAttempt>,
    ) -> Settled<K::Library> {
        tracing::info!(
            library = self.config.base_name(),
            origin = %library.origin(),
            path = %library.path().display(),
            "native library loaded"
        );
        Settled {
            outcome: Ok(Arc::new(library)),
            attempts,
        }
    }

    /// Explicit library dirs first, then the linker's default search path.
    fn load_from_search_path(&self) -> Result<LoadedLibrary<K::Library>, Error> {
        let file_name = PathBuf::from(search_path_file_name(self.config.base_name()));
        let candidates = self
            .config
            .library_dirs()
            .iter()
            .map(|dir| dir.join(&file_name))
            .chain(std::iter::once(file_name.clone()));

        let mut last_err = None;
        for candidate in candidates {
            match self.linker.open(&candidate) {
                Ok(library) => {
                    return Ok(LoadedLibrary::new(library, LoadOrigin::SearchPath, candidate));
                }
                Err(err) => {
                    tracing::trace!(candidate = %candidate.display(), error = %err, "candidate rejected");
                    last_err = Some(err);
                }
            }
        }

        let err = Error::new(ErrorKind::LibraryLoad).with_message(format!(
            "`{}` not found on the library search path",
            file_name.display()
        ));
        Err(match last_err {
            Some(cause) => err.with_source(cause),
            None => err,
        })
    }

    /// `Ok(None)` when the bundle has no library for this platform.
    fn load_from_bundle(&self) -> Result<Option<LoadedLibrary<K::Library>>, Error> {
        let key = self.config.resource_key();
        let reader = self.bundle.open(&key).map_err(|err| {
            extraction_error(format!("failed to open bundled `{key}`"), err)
        })?;
        let Some(mut reader) = reader else {
            return Ok(None);
        };

        let mut temp = tempfile::Builder::new()
            .prefix(self.config.temp_prefix())
            .suffix(self.config.platform().suffix())
            .tempfile()
            .map_err(|err| extraction_error("failed to create temp file".to_string(), err))?;
        copy_resource(&mut reader, temp.as_file_mut()).map_err(|err| {
            extraction_error(format!("failed to extract `{key}`"), err).with_path(temp.path())
        })?;

        // Close our handle before the linker opens the file; Windows refuses otherwise.
        let path = temp.into_temp_path().keep().map_err(|err| {
            extraction_error("failed to persist extracted library".to_string(), err.error)
                .with_path(err.path.to_path_buf())
        })?;
        let path = std::path::absolute(&path).unwrap_or(path);
        cleanup::delete_on_exit(&path);
        tracing::debug!(key = %key, path = %path.display(), "extracted bundled library");

        let library = self.linker.open(&path).map_err(|err| {
            Error::new(ErrorKind::ResourceExtraction)
                .with_message(format!("extracted `{key}` failed to load"))
                .with_path(&path)
                .with_source(err)
        })?;
        Ok(Some(LoadedLibrary::new(
            library,
            LoadOrigin::EmbeddedResource,
            path,
        )))
    }
}

fn copy_resource(reader: &mut dyn io::Read, file: &mut File) -> io::Result<u64> {
    let copied = io::copy(reader, file)?;
    file.sync_all()?;
    Ok(copied)
}

fn extraction_error(message: String, err: io::Error) -> Error {
    Error::new(ErrorKind::ResourceExtraction)
        .with_message(message)
        .with_source(err)
}

fn describe(err: &Error) -> String {
    let mut parts = vec![err.message().unwrap_or("error").to_string()];
    parts.extend(err.causes());
    parts.join(": ")
}
