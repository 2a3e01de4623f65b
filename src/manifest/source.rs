//! Manifest sources and entry path resolution

use crate::error::{IoResultExt, Result};
use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::{Component, Path, PathBuf};

/// Where a manifest is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// Standard input
    Stdin,
    /// A manifest file on disk
    File(PathBuf),
}

impl ManifestSource {
    /// Interpret a command-line argument; `-` selects stdin
    pub fn from_arg(arg: impl AsRef<Path>) -> Self {
        let arg = arg.as_ref();
        if arg.as_os_str() == OsStr::new("-") {
            Self::Stdin
        } else {
            Self::File(arg.to_path_buf())
        }
    }

    /// Directory that relative entry paths are resolved against
    pub fn base_dir(&self) -> PathBuf {
        match self {
            Self::Stdin => PathBuf::from("."),
            Self::File(path) => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    /// Name used in messages
    pub fn label(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    /// Open the manifest for buffered reading
    pub fn open(&self) -> Result<Box<dyn BufRead>> {
        match self {
            Self::Stdin => Ok(Box::new(BufReader::new(std::io::stdin()))),
            Self::File(path) => {
                let file = std::fs::File::open(path).with_path(path)?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Resolve a manifest entry path against the manifest's directory.
///
/// Absolute paths are kept; relative paths are joined to `base`. The result
/// is cleaned lexically.
pub fn resolve_entry_path(entry_path: &str, base: &Path) -> PathBuf {
    let entry = Path::new(entry_path);
    if entry.is_absolute() {
        clean_path(entry)
    } else {
        clean_path(&base.join(entry))
    }
}

/// Lexically normalize a path: drop `.` components and fold `name/..` pairs.
///
/// `..` at the start of a relative path is kept; `..` directly under the root
/// is dropped. An empty result becomes `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}
