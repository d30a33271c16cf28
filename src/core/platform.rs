//! Purpose: Map an OS name to a shared-library suffix and bundle lookup key.
//! Exports: `Platform`.
//! Invariants: Matching is a case-insensitive prefix test on the OS name, not an enumeration.
//! Invariants: Resource keys are exactly `<base><suffix>`.
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Apple,
    Windows,
    Other,
}

impl Platform {
    pub fn from_os_name(os_name: &str) -> Self {
        let os = os_name.trim_start().to_ascii_lowercase();
        if os.starts_with("mac") {
            Platform::Apple
        } else if os.starts_with("windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    /// Platform of the running binary (`macos`, `windows`, `linux`, ...).
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Platform::Apple => ".dylib",
            Platform::Windows => ".dll",
            Platform::Other => ".so",
        }
    }

    pub fn resource_key(self, base_name: &str) -> String {
        format!("{base_name}{}", self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::Platform;

    #[test]
    fn resource_key_follows_os_prefix() {
        assert_eq!(Platform::from_os_name("Windows 10").resource_key("foo"), "foo.dll");
        assert_eq!(Platform::from_os_name("Mac OS X").resource_key("foo"), "foo.dylib");
        assert_eq!(Platform::from_os_name("Linux").resource_key("foo"), "foo.so");
    }

    #[test]
    fn prefix_match_ignores_case_and_version() {
        assert_eq!(Platform::from_os_name("WINDOWS SERVER 2022"), Platform::Windows);
        assert_eq!(Platform::from_os_name("macos"), Platform::Apple);
        assert_eq!(Platform::from_os_name("FreeBSD"), Platform::Other);
        assert_eq!(Platform::from_os_name(""), Platform::Other);
        // Prefix only: a name merely containing "mac" is not Apple.
        assert_eq!(Platform::from_os_name("Linux-mac-compat"), Platform::Other);
    }

    #[test]
    fn current_platform_matches_target() {
        let expected = if cfg!(target_os = "macos") {
            Platform::Apple
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        };
        assert_eq!(Platform::current(), expected);
    }
}
