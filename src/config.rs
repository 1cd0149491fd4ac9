//! Configuration for opening the native library.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the library to load.
pub const LIBRARY_ENV: &str = "CLIBRS_LIBRARY";

/// Environment variable that disables the layout check when set to `1`/`true`.
pub const SKIP_LAYOUT_ENV: &str = "CLIBRS_SKIP_LAYOUT_CHECK";

/// Where the native symbols come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibrarySource {
    /// Symbols linked into the current binary.
    Linked,
    /// A shared object at an explicit path.
    Path(PathBuf),
    /// A bare library name (`clibrs` -> `libclibrs.so`), resolved over the
    /// search paths.
    Name(String),
}

impl LibrarySource {
    /// Interpret a user-supplied value as a path or a bare name.
    pub fn parse(value: &str) -> Self {
        let path = Path::new(value);
        let has_separator = value.contains(std::path::MAIN_SEPARATOR) || value.contains('/');
        if has_separator || path.extension().is_some() {
            LibrarySource::Path(path.to_path_buf())
        } else {
            LibrarySource::Name(value.to_string())
        }
    }
}

/// Configuration for [`crate::bridge::Clib::open`].
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Library to bind against.
    pub source: LibrarySource,
    /// Directories searched for [`LibrarySource::Name`], in order.
    pub search_paths: Vec<PathBuf>,
    /// Compare the library's struct layouts against ours on open.
    pub verify_layout: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source: LibrarySource::Linked,
            search_paths: default_search_paths(),
            verify_layout: true,
        }
    }
}

impl BridgeConfig {
    /// Configuration for a specific library source.
    pub fn with_source(source: LibrarySource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Build a configuration from `CLIBRS_LIBRARY` and
    /// `CLIBRS_SKIP_LAYOUT_CHECK`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var(LIBRARY_ENV) {
            if !value.trim().is_empty() {
                config.source = LibrarySource::parse(value.trim());
            }
        }
        if let Ok(value) = env::var(SKIP_LAYOUT_ENV) {
            config.verify_layout = !matches!(value.trim(), "1" | "true" | "yes");
        }
        config
    }

    /// Resolve a bare library name to an existing file over the search paths.
    pub fn resolve_name(&self, name: &str) -> Option<PathBuf> {
        let file_name = platform_lib_name(name);
        self.search_paths
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.exists())
    }
}

/// Get the platform-specific library filename.
pub fn platform_lib_name(name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        format!("{}.dll", name)
    }
    #[cfg(target_os = "macos")]
    {
        format!("lib{}.dylib", name)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        format!("lib{}.so", name)
    }
}

/// Current directory first, then the directory of the running executable.
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        paths.push(cwd);
    }
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            paths.push(dir.to_path_buf());
        }
    }
    paths
}
