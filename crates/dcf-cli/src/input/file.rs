use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use dcf_core::DcfError;

/// Read a JSON file as a generic serde_json::Value.
///
/// Read failures are I/O errors; unparseable contents are reported as a
/// `DcfError::SerializationError` so callers can treat them as bad input.
pub fn read_json_value(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| {
        DcfError::SerializationError(format!("Failed to parse '{}': {}", canonical.display(), e))
    })?;
    Ok(value)
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
