use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use shapefile::{Multipoint, Point, Polygon, PolygonRing, Polyline, Shape, ShapeType};

use crate::crs::{CoordinateTransform, CrsError, Projection};
use crate::domain::TargetCrs;
use crate::error::ShakeError;

/// A shapefile-set on disk, addressed through its `.shp` member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerFile {
    pub base_name: String,
    pub path: Utf8PathBuf,
}

impl LayerFile {
    pub fn from_path(path: Utf8PathBuf) -> Option<Self> {
        let base_name = path.file_stem()?.to_string();
        Some(Self { base_name, path })
    }

    pub fn sidecar(&self, extension: &str) -> Utf8PathBuf {
        self.path.with_extension(extension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSummary {
    pub feature_count: usize,
    pub geometry_type: String,
}

/// File-format and projection operations the pipeline needs, so the
/// conversion can run against an in-memory engine in tests.
pub trait GeometryEngine {
    fn list_layers(&self, dir: &Utf8Path) -> Result<Vec<LayerFile>, ShakeError>;

    fn read_projection(&self, layer: &LayerFile) -> Result<Projection, ShakeError>;

    /// Writes a copy of `layer` in `target` at `output` (a `.shp` path).
    fn reproject(
        &self,
        layer: &LayerFile,
        source: &Projection,
        target: &TargetCrs,
        output: &Utf8Path,
    ) -> Result<LayerSummary, ShakeError>;
}

/// Sidecars produced for every written layer.
const OUTPUT_EXTENSIONS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileEngine;

impl ShapefileEngine {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryEngine for ShapefileEngine {
    fn list_layers(&self, dir: &Utf8Path) -> Result<Vec<LayerFile>, ShakeError> {
        let entries =
            fs::read_dir(dir.as_std_path()).map_err(|err| ShakeError::reprojection(dir, err))?;
        let mut layers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| ShakeError::reprojection(dir, err))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                tracing::warn!(path = %entry.path().display(), "skipping non-utf8 file name");
                continue;
            };
            let is_shp = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("shp"))
                .unwrap_or(false);
            if !is_shp || !path.as_std_path().is_file() {
                continue;
            }
            if let Some(layer) = LayerFile::from_path(path) {
                layers.push(layer);
            }
        }
        layers.sort_by(|a, b| a.base_name.cmp(&b.base_name));
        Ok(layers)
    }

    fn read_projection(&self, layer: &LayerFile) -> Result<Projection, ShakeError> {
        let prj = ["prj", "PRJ"]
            .into_iter()
            .map(|ext| layer.sidecar(ext))
            .find(|path| path.as_std_path().is_file())
            .ok_or_else(|| {
                ShakeError::reprojection(&layer.path, "missing projection sidecar (.prj)")
            })?;
        let wkt = fs::read_to_string(prj.as_std_path())
            .map_err(|err| ShakeError::reprojection(&prj, err))?;
        Projection::parse(&wkt).map_err(|err| ShakeError::reprojection(&prj, err))
    }

    fn reproject(
        &self,
        layer: &LayerFile,
        source: &Projection,
        target: &TargetCrs,
        output: &Utf8Path,
    ) -> Result<LayerSummary, ShakeError> {
        let fail = |cause: String| ShakeError::reprojection(&layer.path, cause);

        let transform =
            CoordinateTransform::new(source, target).map_err(|err| fail(err.to_string()))?;

        let mut reader = shapefile::Reader::from_path(layer.path.as_std_path())
            .map_err(|err| fail(format!("read: {err}")))?;
        let shape_type = reader.header().shape_type;
        if !is_supported(shape_type) {
            return Err(fail(format!("unsupported geometry type {shape_type:?}")));
        }

        let mut features = Vec::new();
        for item in reader.iter_shapes_and_records() {
            let (shape, record) = item.map_err(|err| fail(format!("read: {err}")))?;
            let shape = transform_shape(&transform, shape).map_err(|err| fail(err.to_string()))?;
            features.push((shape, record));
        }
        let table_info = reader.into_table_info();

        let parent = output
            .parent()
            .ok_or_else(|| ShakeError::reprojection(output, "output has no parent directory"))?;
        let file_stem = output
            .file_stem()
            .ok_or_else(|| ShakeError::reprojection(output, "output has no file name"))?;
        let staging = tempfile::Builder::new()
            .prefix(".shakemap-reproject")
            .tempdir_in(parent.as_std_path())
            .map_err(|err| ShakeError::reprojection(output, err))?;
        let staging_dir = Utf8PathBuf::from_path_buf(staging.path().to_path_buf())
            .map_err(|_| ShakeError::reprojection(output, "non-utf8 staging directory"))?;
        let staged = staging_dir.join(format!("{file_stem}.shp"));

        {
            let mut writer =
                shapefile::Writer::from_path_with_info(staged.as_std_path(), table_info)
                    .map_err(|err| ShakeError::reprojection(output, format!("write: {err}")))?;
            for (shape, record) in &features {
                let written = match shape {
                    Shape::Point(point) => writer.write_shape_and_record(point, record),
                    Shape::Multipoint(points) => writer.write_shape_and_record(points, record),
                    Shape::Polyline(line) => writer.write_shape_and_record(line, record),
                    Shape::Polygon(polygon) => writer.write_shape_and_record(polygon, record),
                    other => {
                        return Err(ShakeError::reprojection(
                            output,
                            format!("unsupported geometry type {:?}", other.shapetype()),
                        ));
                    }
                };
                written.map_err(|err| ShakeError::reprojection(output, format!("write: {err}")))?;
            }
        }
        fs::write(staged.with_extension("prj").as_std_path(), target.esri_wkt)
            .map_err(|err| ShakeError::reprojection(output, err))?;

        for extension in OUTPUT_EXTENSIONS {
            let from = staged.with_extension(extension);
            let to = output.with_extension(extension);
            fs::rename(from.as_std_path(), to.as_std_path())
                .map_err(|err| ShakeError::reprojection(&to, err))?;
        }

        Ok(LayerSummary {
            feature_count: features.len(),
            geometry_type: format!("{shape_type:?}"),
        })
    }
}

fn is_supported(shape_type: ShapeType) -> bool {
    matches!(
        shape_type,
        ShapeType::Point | ShapeType::Multipoint | ShapeType::Polyline | ShapeType::Polygon
    )
}

fn transform_point(transform: &CoordinateTransform, point: &Point) -> Result<Point, CrsError> {
    let (x, y) = transform.convert(point.x, point.y)?;
    Ok(Point::new(x, y))
}

fn transform_points(
    transform: &CoordinateTransform,
    points: &[Point],
) -> Result<Vec<Point>, CrsError> {
    points
        .iter()
        .map(|point| transform_point(transform, point))
        .collect()
}

pub(crate) fn transform_shape(
    transform: &CoordinateTransform,
    shape: Shape,
) -> Result<Shape, CrsError> {
    match shape {
        Shape::Point(point) => Ok(Shape::Point(transform_point(transform, &point)?)),
        Shape::Multipoint(points) => Ok(Shape::Multipoint(Multipoint::new(transform_points(
            transform,
            points.points(),
        )?))),
        Shape::Polyline(line) => {
            let parts = line
                .parts()
                .iter()
                .map(|part| transform_points(transform, part))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Shape::Polyline(Polyline::with_parts(parts)))
        }
        Shape::Polygon(polygon) => {
            let rings = polygon
                .rings()
                .iter()
                .map(|ring| {
                    let points = transform_points(transform, ring.points())?;
                    Ok(match ring {
                        PolygonRing::Outer(_) => PolygonRing::Outer(points),
                        PolygonRing::Inner(_) => PolygonRing::Inner(points),
                    })
                })
                .collect::<Result<Vec<_>, CrsError>>()?;
            Ok(Shape::Polygon(Polygon::with_rings(rings)))
        }
        other => Err(CrsError::Transform(format!(
            "unsupported geometry type {:?}",
            other.shapetype()
        ))),
    }
}
