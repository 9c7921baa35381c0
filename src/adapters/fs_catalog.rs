//! Filesystem catalog: resolves, reads and lists data files under a root
//! directory with traversal protection.

use crate::domain::error::TradestatsError;
use crate::ports::catalog_port::CatalogPort;
use crate::ports::dataset_source::DatasetSource;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Joins `requested` onto `root` and returns the fully resolved path.
///
/// Fails with `PathEscape` when the resolved path (symlinks followed) is not
/// inside the resolved root, and with `NotFound` when the target does not
/// exist but would lie inside the root. A missing target is placed by
/// resolving its deepest existing ancestor, so `..` after a symlink is judged
/// the same way whether or not the final file exists.
pub fn resolve_path(root: &Path, requested: &str) -> Result<PathBuf, TradestatsError> {
    let escape = || TradestatsError::PathEscape {
        requested: requested.to_string(),
    };

    let relative = Path::new(requested);
    if relative
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(escape());
    }

    let canonical_root = root.canonicalize()?;
    let joined = canonical_root.join(relative);

    match joined.canonicalize() {
        Ok(resolved) if resolved.starts_with(&canonical_root) => Ok(resolved),
        Ok(_) => Err(escape()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if resolve_missing(&joined).is_some_and(|p| p.starts_with(&canonical_root)) {
                Err(TradestatsError::NotFound {
                    path: requested.to_string(),
                })
            } else {
                Err(escape())
            }
        }
        Err(e) => Err(TradestatsError::Io(e)),
    }
}

/// Where a missing target would live: the deepest existing ancestor,
/// canonicalized so symlinks are followed, with the remaining components
/// applied lexically.
fn resolve_missing(joined: &Path) -> Option<PathBuf> {
    for ancestor in joined.ancestors().skip(1) {
        let Ok(mut resolved) = ancestor.canonicalize() else {
            continue;
        };
        let tail = joined.strip_prefix(ancestor).ok()?;
        for component in tail.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir => {
                    if !resolved.pop() {
                        return None;
                    }
                }
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        return Some(resolved);
    }
    None
}

fn matches_extension(name: &str, extension: &str) -> bool {
    extension.is_empty() || name.to_lowercase().ends_with(&extension.to_lowercase())
}

/// Relative, `/`-separated paths of files under `root` whose name ends with
/// `extension` (case-insensitive). Sorted. Symlinked directories are not
/// descended into.
pub fn list_files(
    root: &Path,
    extension: &str,
    recursive: bool,
) -> Result<Vec<String>, TradestatsError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
                continue;
            }

            let is_file = file_type.is_file()
                || (file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_file()));
            let name = entry.file_name();
            if !is_file || !matches_extension(&name.to_string_lossy(), extension) {
                continue;
            }

            if let Ok(rel) = path.strip_prefix(root) {
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                found.push(parts.join("/"));
            }
        }
    }

    found.sort();
    Ok(found)
}

pub struct FsCatalog {
    root: PathBuf,
    extension: String,
}

impl FsCatalog {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            extension: ".csv".to_string(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CatalogPort for FsCatalog {
    fn get_file(&self, relative_path: &str) -> Result<Vec<u8>, TradestatsError> {
        let path = resolve_path(&self.root, relative_path)?;
        if !path.is_file() {
            return Err(TradestatsError::NotFound {
                path: relative_path.to_string(),
            });
        }
        Ok(fs::read(path)?)
    }

    fn exists(&self, relative_path: &str) -> bool {
        resolve_path(&self.root, relative_path).is_ok_and(|p| p.is_file())
    }

    fn list_files(&self) -> Result<Vec<String>, TradestatsError> {
        list_files(&self.root, &self.extension, true)
    }

    fn list_folder(&self, folder: &str) -> Result<Vec<String>, TradestatsError> {
        let dir = resolve_path(&self.root, folder)?;
        if !dir.is_dir() {
            return Err(TradestatsError::NotFound {
                path: folder.to_string(),
            });
        }
        list_files(&dir, &self.extension, false)
    }
}

impl DatasetSource for FsCatalog {
    fn list_files(&self) -> Result<Vec<String>, TradestatsError> {
        CatalogPort::list_files(self)
    }

    fn fetch(&self, relative_path: &str) -> Result<Vec<u8>, TradestatsError> {
        self.get_file(relative_path)
    }
}
