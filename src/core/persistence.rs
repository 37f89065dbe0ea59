//! Parameters and template files on disk.
//!
//! Output is pretty-printed JSON with four-space indentation and is written
//! atomically (temp file + rename).

use super::types::{ParametersStore, ResourceDocument};
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::Path;

/// Serialize with four-space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

/// Write a file atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, contents).map_err(|e| Error::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Load the parameters mapping.
///
/// A missing, unreadable or invalid file yields an empty mapping; only a
/// debug log records why.
pub fn load_parameters(path: &Path) -> ParametersStore {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no parameters, using empty mapping");
            return ParametersStore::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(params) => params,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "invalid parameters, using empty mapping");
            ParametersStore::new()
        }
    }
}

pub fn save_parameters(path: &Path, parameters: &ParametersStore) -> Result<()> {
    write_atomic(path, &to_pretty_json(parameters)?)
}

/// Write the template and return the text written.
pub fn write_template(path: &Path, document: &ResourceDocument) -> Result<String> {
    let json = to_pretty_json(document)?;
    write_atomic(path, &json)?;
    Ok(json)
}

/// Read a JSON file without assuming its shape.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Read a written template back.
pub fn read_template(path: &Path) -> Result<ResourceDocument> {
    Ok(serde_json::from_value(read_json(path)?)?)
}
