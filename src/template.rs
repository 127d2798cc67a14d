use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::ScenarioId;
use crate::error::ShakeError;
use crate::workspace::walk_dir;

/// Literal marker in the template database file name.
pub const TEMPLATE_MARKER: &str = "Template_Shakemap";

/// Copies the whole template tree to `target_dir`, which must not exist yet.
/// A failed copy leaves whatever was written so far.
pub fn instantiate_template(
    template_dir: &Utf8Path,
    target_dir: &Utf8Path,
) -> Result<Vec<Utf8PathBuf>, ShakeError> {
    if !template_dir.as_std_path().is_dir() {
        return Err(ShakeError::template_copy(
            template_dir,
            "template directory not found",
        ));
    }
    if target_dir.as_std_path().exists() {
        return Err(ShakeError::template_copy(target_dir, "target already exists"));
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ShakeError::template_copy(parent, err))?;
    }
    fs::create_dir(target_dir.as_std_path())
        .map_err(|err| ShakeError::template_copy(target_dir, err))?;

    let entries = walk_dir(template_dir.as_std_path())
        .map_err(|err| ShakeError::template_copy(template_dir, err))?;
    let mut copied = Vec::new();
    for entry in entries {
        let entry = Utf8PathBuf::from_path_buf(entry).map_err(|path| {
            ShakeError::template_copy(template_dir, format!("non-utf8 path {}", path.display()))
        })?;
        let relative = entry
            .strip_prefix(template_dir)
            .map_err(|err| ShakeError::template_copy(&entry, err))?
            .to_path_buf();
        let target = target_dir.join(&relative);
        if entry.as_std_path().is_dir() {
            fs::create_dir_all(target.as_std_path())
                .map_err(|err| ShakeError::template_copy(&target, err))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent.as_std_path())
                    .map_err(|err| ShakeError::template_copy(parent, err))?;
            }
            fs::copy(entry.as_std_path(), target.as_std_path())
                .map_err(|err| ShakeError::template_copy(&target, err))?;
            copied.push(relative);
        }
    }
    copied.sort();
    Ok(copied)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedDatabase {
    pub from: Utf8PathBuf,
    pub to: Utf8PathBuf,
}

/// Renames every database file directly inside `target_dir` whose name
/// carries the template marker. No match is not an error.
pub fn rename_database(
    target_dir: &Utf8Path,
    scenario: &ScenarioId,
    extension: &str,
) -> Result<Vec<RenamedDatabase>, ShakeError> {
    let entries = fs::read_dir(target_dir.as_std_path())
        .map_err(|err| ShakeError::rename(target_dir, err))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| ShakeError::rename(target_dir, err))?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let is_database = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if is_database && file_name.contains(TEMPLATE_MARKER) && path.as_std_path().is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    let mut renamed = Vec::new();
    for from in candidates {
        let Some(file_name) = from.file_name() else {
            continue;
        };
        let to = target_dir.join(file_name.replace(TEMPLATE_MARKER, scenario.as_str()));
        if to.as_std_path().exists() {
            return Err(ShakeError::rename(&to, "destination already exists"));
        }
        fs::rename(from.as_std_path(), to.as_std_path())
            .map_err(|err| ShakeError::rename(&from, err))?;
        tracing::info!(from = %from, to = %to, "renamed database");
        renamed.push(RenamedDatabase { from, to });
    }
    Ok(renamed)
}
