use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::{GroundMotionLayer, TargetCrs};
use crate::error::ShakeError;
use crate::geometry::GeometryEngine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReprojectedLayer {
    pub layer: GroundMotionLayer,
    pub source: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub feature_count: usize,
    pub geometry_type: String,
    pub epsg: u32,
}

/// Reprojects every recognized ground-motion layer found directly in
/// `layers_dir`, writing `<base><suffix>.shp` next to the original.
/// Unrecognized layers are skipped.
pub fn reproject_layers<E: GeometryEngine + ?Sized>(
    engine: &E,
    layers_dir: &Utf8Path,
    target: &TargetCrs,
) -> Result<Vec<ReprojectedLayer>, ShakeError> {
    let mut reprojected = Vec::new();
    for layer_file in engine.list_layers(layers_dir)? {
        let Some(layer) = GroundMotionLayer::from_base_name(&layer_file.base_name) else {
            tracing::debug!(layer = %layer_file.base_name, "not a ground-motion layer, left as is");
            continue;
        };

        let source = engine.read_projection(&layer_file)?;
        let output = layers_dir.join(format!(
            "{}.shp",
            target.output_base_name(&layer_file.base_name)
        ));
        let summary = engine.reproject(&layer_file, &source, target, &output)?;
        tracing::info!(
            layer = %layer,
            from = %source.name,
            to = %target.authority_code(),
            features = summary.feature_count,
            "reprojected"
        );

        reprojected.push(ReprojectedLayer {
            layer,
            source: layer_file.path,
            output,
            feature_count: summary.feature_count,
            geometry_type: summary.geometry_type,
            epsg: target.epsg,
        });
    }
    Ok(reprojected)
}
