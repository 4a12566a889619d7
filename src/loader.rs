//! File loading with the two-tier failure taxonomy.
//!
//! A missing file signals an unprovisioned environment and maps to
//! [`ComplianceError::MissingFile`] (a skip for the calling suite). A file
//! that exists but does not parse is a defect under version control and maps
//! to [`ComplianceError::ParseError`] (a hard failure).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use hcl_edit::structure::Body;
use tracing::debug;

use crate::document::Document;
use crate::error::ComplianceError;
use crate::manifest::Manifest;
use crate::script::ScriptText;
use crate::tfvars::TfVars;

/// Load and parse one `.tf` file.
pub fn load_document(path: impl AsRef<Path>) -> Result<Document, ComplianceError> {
    let path = path.as_ref();
    let text = read_file(path)?;
    parse_named(&path.display().to_string(), &text)
}

/// Parse HCL text that is already in memory.
pub fn parse_document(text: &str) -> Result<Document, ComplianceError> {
    parse_named("<inline>", text)
}

/// Load a `terraform.tfvars` file into a flat variable mapping.
pub fn load_tfvars(path: impl AsRef<Path>) -> Result<TfVars, ComplianceError> {
    let document = load_document(path)?;
    Ok(TfVars::from_document(&document))
}

/// Load a shell script as opaque text for substring checks.
pub fn load_script(path: impl AsRef<Path>) -> Result<ScriptText, ComplianceError> {
    let path = path.as_ref();
    let text = read_file(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ScriptText::new(name, text))
}

/// Load a JSON deployment manifest.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<Manifest, ComplianceError> {
    let path = path.as_ref();
    let text = read_file(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Manifest::from_json(name, &text)
}

fn parse_named(path: &str, text: &str) -> Result<Document, ComplianceError> {
    let body = Body::from_str(text).map_err(|e| ComplianceError::ParseError {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    let document = Document::from_body(&body);
    debug!(
        event = "Load",
        phase = "Parsed",
        path = path,
        groups = document.groups().len(),
        attrs = document.attrs().len()
    );
    Ok(document)
}

fn read_file(path: &Path) -> Result<String, ComplianceError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ComplianceError::MissingFile(path.to_path_buf()),
        _ => ComplianceError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        },
    })
}
