// src/results/writer.rs

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::Result;
use crate::results::{ResultNode, to_xml_string};

/// Fixed name of the result document written in direct mode.
pub const RESULT_FILE_NAME: &str = "TestResult.xml";

/// Location of the result document under `work_dir`.
pub fn result_file_path(work_dir: &Path) -> PathBuf {
    work_dir.join(RESULT_FILE_NAME)
}

/// Persist `node` at `path`, all or nothing.
///
/// The document is fully serialised in memory, written to a temporary file
/// beside `path`, and renamed over it. A failure at any step leaves an
/// existing document at `path` untouched.
pub fn write_result_file(node: &ResultNode, path: &Path) -> Result<()> {
    let xml = to_xml_string(node)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(xml.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = xml.len(), "result document written");
    Ok(())
}
