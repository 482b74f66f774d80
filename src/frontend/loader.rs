//! Loading of serialized syntax trees
//!
//! The concrete-syntax parser is an external collaborator; it hands the
//! front end one JSON document per compilation unit, each decoding to a
//! `SourceFile`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::frontend::ast::SourceFile;
use crate::passes::Project;

/// Read one serialized compilation unit.
pub fn load_unit(path: &Path) -> Result<SourceFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read unit file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to decode syntax tree in {}", path.display()))
}

/// Read a whole project, one unit per file, keeping file order.
pub fn load_project(paths: &[PathBuf]) -> Result<Project> {
    let mut project = Project::new();
    for path in paths {
        project.push(load_unit(path)?);
    }
    Ok(project)
}
