// SPDX-License-Identifier: AGPL-3.0-or-later
//! File formats: `.dsg` grid containers, the tabular CSV dataset, and
//! plain-text reports. Every writer replaces its target atomically.

pub mod dsg;
pub mod table;

use std::path::Path;

use crate::error::{Error, Result};

/// Write a text file atomically (temp file + rename), creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns `Err` on I/O failure.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    std::fs::write(&tmp, content).map_err(|e| Error::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn text_writer_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/report.txt");
        write_text_atomic(&path, "first").unwrap();
        write_text_atomic(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}
