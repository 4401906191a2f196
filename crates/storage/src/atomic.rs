// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file publication (write temp, validate, rename).
//!
//! A crash at any point leaves either the old content or the new content at
//! the destination, never a mix. For JSON targets the temp bytes are parsed
//! back before the rename, so a serialization bug can never publish garbage.

use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("failed to serialize value for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to publish {path}: written bytes are not valid JSON: {source}")]
    Validate {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialize `value` as pretty JSON and publish it atomically at `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AtomicWriteError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| AtomicWriteError::Serialize {
        path: path.to_owned(),
        source,
    })?;
    write_bytes(path, &bytes, true)
}

/// Publish raw bytes atomically at `path`.
///
/// With `validate_json` set, the bytes written to the temp file are read
/// back and must parse as JSON before the rename happens.
pub fn write_bytes(path: &Path, bytes: &[u8], validate_json: bool) -> Result<(), AtomicWriteError> {
    let io_err = |source| AtomicWriteError::Io { path: path.to_owned(), source };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = tmp_path(path);
    let write_result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    })();
    if let Err(source) = write_result {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(source));
    }

    if validate_json {
        let on_disk = match fs::read(&tmp) {
            Ok(b) => b,
            Err(source) => {
                let _ = fs::remove_file(&tmp);
                return Err(io_err(source));
            }
        };
        if let Err(source) = serde_json::from_slice::<serde::de::IgnoredAny>(&on_disk) {
            let _ = fs::remove_file(&tmp);
            return Err(AtomicWriteError::Validate { path: path.to_owned(), source });
        }
    }

    fs::rename(&tmp, path).map_err(io_err)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_owned()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
