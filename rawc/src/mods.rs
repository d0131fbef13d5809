//! The external-collaborator boundary (§9): a mod descriptor pre-filled by
//! whatever loads `mod_info.txt` files and orders mods, which this core
//! takes as opaque input.

use smol_str::SmolStr;
use std::path::PathBuf;

/// One mod contributing objects and edits to the compile.
///
/// The GUI mod picker / `mod_info.txt` parser are out of scope for this
/// core; callers (e.g. `rawc-cli::discovery`) are expected to build these.
#[derive(Debug, Clone)]
pub struct ModDescriptor {
    pub name: SmolStr,
    pub version: SmolStr,
    /// The mod's root directory; object files are read from `path/objects/`.
    pub path: PathBuf,
    /// File names (not paths) under `path/objects/`, in the order this mod
    /// lists them before the file sorter reorders them by header.
    pub file_names: Vec<String>,
}

impl ModDescriptor {
    pub fn new(
        name: impl Into<SmolStr>,
        version: impl Into<SmolStr>,
        path: impl Into<PathBuf>,
        file_names: Vec<String>,
    ) -> Self {
        Self { name: name.into(), version: version.into(), path: path.into(), file_names }
    }

    /// The directory object files are actually read from.
    pub fn objects_dir(&self) -> PathBuf {
        self.path.join("objects")
    }
}
