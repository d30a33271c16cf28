//! Purpose: Bundled resource namespace read by the embedded-resource strategy.
//! Exports: `ResourceBundle`, `DirBundle`, `MemoryBundle`.
//! Invariants: `Ok(None)` means "not bundled"; only real read failures are errors.
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

pub trait ResourceBundle: Send + Sync + fmt::Debug {
    fn open(&self, key: &str) -> io::Result<Option<Box<dyn Read>>>;

    /// Where a key would live, for diagnostics.
    fn locate(&self, key: &str) -> String;
}

/// Resources stored as plain files under a root directory.
#[derive(Clone, Debug)]
pub struct DirBundle {
    root: PathBuf,
}

impl DirBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceBundle for DirBundle {
    fn open(&self, key: &str) -> io::Result<Option<Box<dyn Read>>> {
        if key.is_empty() || key.contains(['/', '\\']) {
            return Ok(None);
        }
        match File::open(self.root.join(key)) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn locate(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}

/// Resources compiled into the binary, typically with `include_bytes!`.
#[derive(Clone, Default)]
pub struct MemoryBundle {
    entries: HashMap<String, &'static [u8]>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, key: impl Into<String>, bytes: &'static [u8]) -> Self {
        self.entries.insert(key.into(), bytes);
        self
    }
}

impl fmt::Debug for MemoryBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("MemoryBundle").field("keys", &keys).finish()
    }
}

impl ResourceBundle for MemoryBundle {
    fn open(&self, key: &str) -> io::Result<Option<Box<dyn Read>>> {
        Ok(self
            .entries
            .get(key)
            .map(|bytes| Box::new(Cursor::new(*bytes)) as Box<dyn Read>))
    }

    fn locate(&self, key: &str) -> String {
        format!("memory:{key}")
    }
}
