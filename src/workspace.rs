use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::ScenarioId;
use crate::error::ShakeError;

pub const SHAPE_DIR: &str = "shape";
pub const DATA_DIR: &str = "Data";
pub const MANIFEST_FILE: &str = "conversion.json";

/// Output tree of one conversion, rooted at `output_root/<scenario id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    output_root: Utf8PathBuf,
    scenario: ScenarioId,
}

impl Workspace {
    pub fn new(output_root: impl Into<Utf8PathBuf>, scenario: ScenarioId) -> Self {
        Self {
            output_root: output_root.into(),
            scenario,
        }
    }

    pub fn output_root(&self) -> &Utf8Path {
        &self.output_root
    }

    pub fn scenario(&self) -> &ScenarioId {
        &self.scenario
    }

    pub fn root(&self) -> Utf8PathBuf {
        self.output_root.join(self.scenario.as_str())
    }

    pub fn shape_dir(&self) -> Utf8PathBuf {
        self.root().join(SHAPE_DIR)
    }

    pub fn data_dir(&self) -> Utf8PathBuf {
        self.root().join(DATA_DIR)
    }

    pub fn database_path(&self, extension: &str) -> Utf8PathBuf {
        self.data_dir()
            .join(format!("{}.{extension}", self.scenario.as_str()))
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root().join(MANIFEST_FILE)
    }

    pub fn write_manifest(&self, manifest: &Manifest) -> Result<Utf8PathBuf, ShakeError> {
        let path = self.manifest_path();
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(manifest)
            .map_err(|err| ShakeError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| ShakeError::Filesystem(format!("write {tmp_path}: {err}")))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| ShakeError::Filesystem(format!("write {path}: {err}")))?;
        Ok(path)
    }

    pub fn read_manifest(&self) -> Result<Manifest, ShakeError> {
        let path = self.manifest_path();
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ShakeError::Filesystem(format!("read {path}: {err}")))?;
        serde_json::from_str(&content).map_err(|err| ShakeError::Filesystem(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub scenario_name: String,
    pub scenario_id: String,
    pub archive: String,
    pub layers: Vec<ManifestLayer>,
    pub databases: Vec<String>,
    pub converted_at: String,
    pub tool: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestLayer {
    pub layer: String,
    pub path: String,
    pub feature_count: usize,
    pub epsg: u32,
}

pub(crate) fn walk_dir(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        for entry in fs::read_dir(&path)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}
