//! Purpose: Loader configuration (library name, search dirs, bundle dir, OS override).
//! Exports: `LoaderConfig`, env var names.
//! Role: Single source for resolver inputs shared by the process-wide resolver and the CLI.
//! Invariants: Environment values only override defaults; flags override environment (CLI).
use std::ffi::OsString;
use std::path::PathBuf;

use crate::core::platform::Platform;

pub const DEFAULT_BASE_NAME: &str = "libpartition_link_java";

pub const ENV_BASE_NAME: &str = "PARTITION_LINK_BASE_NAME";
pub const ENV_LIBRARY_PATH: &str = "PARTITION_LINK_LIBRARY_PATH";
pub const ENV_RESOURCE_DIR: &str = "PARTITION_LINK_RESOURCE_DIR";
pub const ENV_OS_NAME: &str = "PARTITION_LINK_OS_NAME";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoaderConfig {
    base_name: String,
    library_dirs: Vec<PathBuf>,
    resource_dir: Option<PathBuf>,
    os_name: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_NAME)
    }
}

impl LoaderConfig {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            library_dirs: Vec::new(),
            resource_dir: None,
            os_name: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let mut config = match non_empty(ENV_BASE_NAME) {
            Some(name) => Self::new(name.to_string_lossy().into_owned()),
            None => Self::default(),
        };
        if let Some(paths) = non_empty(ENV_LIBRARY_PATH) {
            config.library_dirs = std::env::split_paths(&paths)
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect();
        }
        config.resource_dir = non_empty(ENV_RESOURCE_DIR).map(PathBuf::from);
        config.os_name = non_empty(ENV_OS_NAME).map(|name| name.to_string_lossy().into_owned());
        config
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dirs.push(dir.into());
        self
    }

    pub fn with_library_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.library_dirs = dirs.into_iter().collect();
        self
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }

    pub fn with_os_name(mut self, os_name: impl Into<String>) -> Self {
        self.os_name = Some(os_name.into());
        self
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn library_dirs(&self) -> &[PathBuf] {
        &self.library_dirs
    }

    /// OS name used for suffix selection; the running target when not overridden.
    pub fn os_name(&self) -> &str {
        self.os_name.as_deref().unwrap_or(std::env::consts::OS)
    }

    pub fn platform(&self) -> Platform {
        Platform::from_os_name(self.os_name())
    }

    pub fn resource_key(&self) -> String {
        self.platform().resource_key(&self.base_name)
    }

    /// Configured bundle directory, or `resources/` next to the running executable.
    pub fn resource_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.resource_dir {
            return Some(dir.clone());
        }
        let exe = std::env::current_exe().ok()?;
        exe.parent().map(|dir| dir.join("resources"))
    }

    /// Temp-file prefix: the base name up to its first `.`.
    pub(crate) fn temp_prefix(&self) -> &str {
        match self.base_name.split_once('.') {
            Some((head, _)) if !head.is_empty() => head,
            _ => &self.base_name,
        }
    }
}
