// ── Local JSON storage ──
//
// A key is a path of segments under the storage root; the last segment
// names a `<segment>.json` file. Directories are created 0700 and files
// 0600 since records hold private keys. Writes go to a temporary file
// that is renamed into place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::CoreError;

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_path(&self, prefix: &[&str]) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(prefix);
        path
    }

    // Names may contain dots, so the extension is appended rather than set.
    fn file_path(&self, key: &[&str]) -> PathBuf {
        match key.split_last() {
            Some((last, prefix)) => self.dir_path(prefix).join(format!("{last}.{EXTENSION}")),
            None => self.root.join(format!(".{EXTENSION}")),
        }
    }

    /// Record names stored directly under `prefix`, sorted. A missing
    /// directory lists as empty.
    pub fn list(&self, prefix: &[&str]) -> Result<Vec<String>, CoreError> {
        self.read_dir(prefix, |entry| {
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != EXTENSION) {
                return None;
            }
            path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
        })
    }

    /// Sub-directories directly under `prefix`, sorted.
    pub fn list_dirs(&self, prefix: &[&str]) -> Result<Vec<String>, CoreError> {
        self.read_dir(prefix, |entry| {
            entry
                .path()
                .is_dir()
                .then(|| entry.file_name().to_string_lossy().into_owned())
        })
    }

    fn read_dir<F>(&self, prefix: &[&str], pick: F) -> Result<Vec<String>, CoreError>
    where
        F: Fn(&fs::DirEntry) -> Option<String>,
    {
        let dir = self.dir_path(prefix);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence(&dir, &e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| persistence(&dir, &e))?;
            if let Some(name) = pick(&entry) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read and decode a record; `None` when it does not exist.
    pub fn load<T: DeserializeOwned>(&self, key: &[&str]) -> Result<Option<T>, CoreError> {
        let path = self.file_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence(&path, &e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| persistence(&path, &e))
    }

    /// Encode and write a record, replacing any previous version.
    pub fn save<T: Serialize>(&self, key: &[&str], value: &T) -> Result<(), CoreError> {
        let path = self.file_path(key);
        let mut data = serde_json::to_vec_pretty(value).map_err(|e| persistence(&path, &e))?;
        data.push(b'\n');

        if let Some(parent) = path.parent() {
            create_private_dir(parent).map_err(|e| persistence(parent, &e))?;
        }

        let tmp = path.with_extension("json.tmp");
        write_private_file(&tmp, &data).map_err(|e| persistence(&tmp, &e))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            persistence(&path, &e)
        })?;
        trace!(path = %path.display(), "record saved");
        Ok(())
    }

    /// Remove a record; `false` when there was nothing to remove.
    pub fn delete(&self, key: &[&str]) -> Result<bool, CoreError> {
        let path = self.file_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(persistence(&path, &e)),
        }
    }
}

fn persistence(path: &Path, err: &dyn std::fmt::Display) -> CoreError {
    CoreError::Persistence {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn write_private_file(path: &Path, data: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}
