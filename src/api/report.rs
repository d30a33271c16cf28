//! Purpose: JSON-facing snapshots of platform naming and resolver outcomes.
//! Exports: `PlatformReport`, `ResolveReport`.
//! Role: Shared by the CLI and embedders that want to log how the library was found.
//! Invariants: Field names are additive-only once published.
use std::path::PathBuf;

use serde::Serialize;

use crate::core::config::LoaderConfig;
use crate::core::linker::{LoadOrigin, Linker};
use crate::core::platform::Platform;
use crate::core::resolver::{LibraryResolver, LibraryState, LoadAttempt};

#[derive(Clone, Debug, Serialize)]
pub struct PlatformReport {
    pub platform: Platform,
    pub os_name: String,
    pub base_name: String,
    pub suffix: &'static str,
    pub resource_key: String,
}

impl PlatformReport {
    pub fn from_config(config: &LoaderConfig) -> Self {
        let platform = config.platform();
        Self {
            platform,
            os_name: config.os_name().to_string(),
            base_name: config.base_name().to_string(),
            suffix: platform.suffix(),
            resource_key: config.resource_key(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ResolveReport {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<LoadOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub attempts: Vec<LoadAttempt>,
}

impl ResolveReport {
    /// Snapshot of a resolver's current state; does not trigger a load.
    pub fn from_resolver<K: Linker>(resolver: &LibraryResolver<K>) -> Self {
        let (origin, path) = match resolver.state() {
            LibraryState::Loaded(library) => {
                (Some(library.origin()), Some(library.path().to_path_buf()))
            }
            LibraryState::NotLoaded | LibraryState::FailedPermanently(_) => (None, None),
        };
        Self {
            loaded: origin.is_some(),
            origin,
            path,
            attempts: resolver.attempts().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PlatformReport, ResolveReport};
    use crate::core::config::LoaderConfig;
    use crate::core::error::{Error, ErrorKind};
    use crate::core::linker::Linker;
    use crate::core::resolver::LibraryResolver;
    use serde_json::json;
    use std::path::Path;

    struct RefusingLinker;

    impl Linker for RefusingLinker {
        type Library = ();

        fn open(&self, path: &Path) -> Result<(), Error> {
            Err(Error::new(ErrorKind::LibraryLoad)
                .with_message("refused")
                .with_path(path))
        }
    }

    #[test]
    fn platform_report_for_windows() {
        let config = LoaderConfig::new("foo").with_os_name("Windows 10");
        let value = serde_json::to_value(PlatformReport::from_config(&config)).expect("json");
        assert_eq!(value["platform"], json!("windows"));
        assert_eq!(value["suffix"], json!(".dll"));
        assert_eq!(value["resource_key"], json!("foo.dll"));
        assert_eq!(value["os_name"], json!("Windows 10"));
    }

    #[test]
    fn resolve_report_lists_failed_attempts() {
        let resolver = LibraryResolver::new(LoaderConfig::new("foo").with_os_name("Linux"), RefusingLinker);
        let before = serde_json::to_value(ResolveReport::from_resolver(&resolver)).expect("json");
        assert_eq!(before["loaded"], json!(false));
        assert_eq!(before["attempts"], json!([]));

        assert!(resolver.ensure_loaded().is_err());
        let after = serde_json::to_value(ResolveReport::from_resolver(&resolver)).expect("json");
        assert_eq!(after["loaded"], json!(false));
        assert!(after.get("origin").is_none());
        assert_eq!(after["attempts"][0]["strategy"], json!("search-path"));
        assert_eq!(after["attempts"][0]["outcome"], json!("failed"));
        assert_eq!(after["attempts"][1]["strategy"], json!("embedded-resource"));
        assert_eq!(after["attempts"][1]["outcome"], json!("skipped"));
    }
}
