use std::collections::BTreeSet;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use zip::ZipArchive;

use crate::domain::GroundMotionLayer;
use crate::error::ShakeError;

/// Sidecar extensions a usable shapefile-set must carry.
pub const REQUIRED_SIDECARS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedSet {
    pub root: Utf8PathBuf,
    pub files: Vec<Utf8PathBuf>,
}

/// Unpacks every member of `zip_path` below `target_dir`, keeping relative
/// paths. Members written before a failure are left in place.
pub fn extract_zip(zip_path: &Utf8Path, target_dir: &Utf8Path) -> Result<ExtractedSet, ShakeError> {
    let file = fs::File::open(zip_path.as_std_path())
        .map_err(|err| ShakeError::extraction(zip_path, format!("open zip: {err}")))?;
    let mut archive = ZipArchive::new(file).map_err(|err| ShakeError::extraction(zip_path, err))?;

    fs::create_dir_all(target_dir.as_std_path())
        .map_err(|err| ShakeError::extraction(target_dir, err))?;

    let mut files = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| ShakeError::extraction(zip_path, err))?;
        let relative = entry
            .enclosed_name()
            .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
            .ok_or_else(|| {
                ShakeError::extraction(
                    zip_path,
                    format!("unsafe or non-utf8 member name: {}", entry.name()),
                )
            })?;
        let entry_path = target_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(entry_path.as_std_path())
                .map_err(|err| ShakeError::extraction(&entry_path, err))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| ShakeError::extraction(parent, err))?;
        }
        let mut outfile = fs::File::create(entry_path.as_std_path())
            .map_err(|err| ShakeError::extraction(&entry_path, err))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| ShakeError::extraction(&entry_path, err))?;
        tracing::debug!(member = %relative, "extracted");
        files.push(relative);
    }

    Ok(ExtractedSet {
        root: target_dir.to_path_buf(),
        files,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub archive: Utf8PathBuf,
    pub members: Vec<String>,
    pub layers: Vec<LayerCompleteness>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerCompleteness {
    pub layer: GroundMotionLayer,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl LayerCompleteness {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Decompresses every member without writing anything and reports which
/// recognized layers carry a full shapefile-set.
pub fn inspect_zip(zip_path: &Utf8Path) -> Result<ArchiveReport, ShakeError> {
    let file = fs::File::open(zip_path.as_std_path())
        .map_err(|err| ShakeError::extraction(zip_path, format!("open zip: {err}")))?;
    let mut archive = ZipArchive::new(file).map_err(|err| ShakeError::extraction(zip_path, err))?;

    let mut members = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| ShakeError::extraction(zip_path, err))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        io::copy(&mut entry, &mut io::sink())
            .map_err(|err| ShakeError::extraction(zip_path, format!("{name}: {err}")))?;
        members.push(name);
    }

    let file_names = members
        .iter()
        .map(|name| {
            Utf8Path::new(name)
                .file_name()
                .unwrap_or(name.as_str())
                .to_string()
        })
        .collect::<BTreeSet<_>>();

    let layers = GroundMotionLayer::ALL
        .into_iter()
        .filter_map(|layer| {
            let (present, missing): (Vec<_>, Vec<_>) = REQUIRED_SIDECARS
                .iter()
                .map(|ext| format!("{}.{ext}", layer.as_str()))
                .partition(|name| file_names.contains(name));
            (!present.is_empty()).then_some(LayerCompleteness {
                layer,
                present,
                missing,
            })
        })
        .collect();

    Ok(ArchiveReport {
        archive: zip_path.to_path_buf(),
        members,
        layers,
    })
}
