mod common;

use std::fs;

use assert_matches::assert_matches;
use camino::Utf8Path;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::record::EsriShape;
use shapefile::{Multipoint, Point, Polygon, PolygonRing, Polyline, Shape};

use shakemap_hazus::domain::{GroundMotionLayer, TargetCrs};
use shakemap_hazus::error::ShakeError;
use shakemap_hazus::geometry::{GeometryEngine, ShapefileEngine};
use shakemap_hazus::reproject::reproject_layers;

use common::{WGS84_WKT, utf8_tempdir, write_point_layer};

#[cfg(not(feature = "proj-transforms"))]
const UTM_WKT: &str = r#"PROJCS["WGS_1984_UTM_Zone_11N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-117.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

#[test]
fn lists_layers_sorted_by_base_name() {
    let (_temp, root) = utf8_tempdir();
    write_point_layer(&root, "psa10", 1, Some(WGS84_WKT));
    write_point_layer(&root, "pga", 1, Some(WGS84_WKT));
    fs::write(root.join("grid.xml").as_std_path(), b"<xml/>").unwrap();

    let layers = ShapefileEngine::new().list_layers(&root).unwrap();
    let names = layers
        .iter()
        .map(|layer| layer.base_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["pga", "psa10"]);
}

#[test]
fn polygon_contours_keep_rings_and_attributes() {
    let (_temp, root) = utf8_tempdir();
    let builder =
        TableWriterBuilder::new().add_numeric_field(FieldName::try_from("PARAMVALUE").unwrap(), 10, 2);
    let mut writer =
        shapefile::Writer::from_path(root.join("psa03.shp").as_std_path(), builder).unwrap();
    let ring = vec![
        Point::new(-116.0, 32.0),
        Point::new(-116.0, 33.0),
        Point::new(-115.0, 33.0),
        Point::new(-115.0, 32.0),
        Point::new(-116.0, 32.0),
    ];
    let polygon = Polygon::new(PolygonRing::Outer(ring.clone()));
    let mut record = Record::default();
    record.insert("PARAMVALUE".to_string(), FieldValue::Numeric(Some(12.5)));
    writer.write_shape_and_record(&polygon, &record).unwrap();
    drop(writer);
    fs::write(root.join("psa03.prj").as_std_path(), WGS84_WKT).unwrap();

    let layers = reproject_layers(&ShapefileEngine::new(), &root, &TargetCrs::NAD83).unwrap();

    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].layer, GroundMotionLayer::Psa03);
    assert_eq!(layers[0].feature_count, 1);
    assert_eq!(layers[0].geometry_type, "Polygon");

    let mut reader = shapefile::Reader::from_path(root.join("psa03_GCS_NAD83.shp").as_std_path()).unwrap();
    let features = reader
        .iter_shapes_and_records()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(features.len(), 1);
    let (Shape::Polygon(written), record) = &features[0] else {
        panic!("expected a polygon");
    };
    assert_eq!(written.rings().len(), 1);
    assert_eq!(written.rings()[0].points().len(), ring.len());
    assert_eq!(record.get("PARAMVALUE"), Some(&FieldValue::Numeric(Some(12.5))));
}

fn write_single_shape<S: EsriShape>(dir: &Utf8Path, base: &str, shape: &S) {
    let builder =
        TableWriterBuilder::new().add_numeric_field(FieldName::try_from("GRID").unwrap(), 6, 0);
    let mut writer =
        shapefile::Writer::from_path(dir.join(format!("{base}.shp")).as_std_path(), builder)
            .unwrap();
    let mut record = Record::default();
    record.insert("GRID".to_string(), FieldValue::Numeric(Some(7.0)));
    writer.write_shape_and_record(shape, &record).unwrap();
    drop(writer);
    fs::write(dir.join(format!("{base}.prj")).as_std_path(), WGS84_WKT).unwrap();
}

fn read_single_shape(path: &Utf8Path) -> (Shape, Record) {
    let mut reader = shapefile::Reader::from_path(path.as_std_path()).unwrap();
    let mut features = reader
        .iter_shapes_and_records()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(features.len(), 1);
    features.remove(0)
}

#[test]
fn multipoint_layer_keeps_every_point() {
    let (_temp, root) = utf8_tempdir();
    let points = vec![
        Point::new(-117.25, 34.0),
        Point::new(-117.0, 34.125),
        Point::new(-116.75, 34.25),
    ];
    write_single_shape(&root, "pgv", &Multipoint::new(points.clone()));

    let layers = reproject_layers(&ShapefileEngine::new(), &root, &TargetCrs::NAD83).unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].layer, GroundMotionLayer::Pgv);
    assert_eq!(layers[0].geometry_type, "Multipoint");

    let (shape, record) = read_single_shape(&root.join("pgv_GCS_NAD83.shp"));
    let Shape::Multipoint(written) = &shape else {
        panic!("expected a multipoint, got {shape}");
    };
    assert_eq!(written.points().len(), points.len());
    for (written, original) in written.points().iter().zip(&points) {
        assert!((written.x - original.x).abs() < 1e-9);
        assert!((written.y - original.y).abs() < 1e-9);
    }
    assert_eq!(record.get("GRID"), Some(&FieldValue::Numeric(Some(7.0))));
}

#[test]
fn polyline_layer_keeps_parts() {
    let (_temp, root) = utf8_tempdir();
    let parts = vec![
        vec![Point::new(-118.0, 33.5), Point::new(-117.5, 33.75)],
        vec![
            Point::new(-117.0, 34.0),
            Point::new(-116.5, 34.25),
            Point::new(-116.0, 34.5),
        ],
    ];
    write_single_shape(&root, "psa10", &Polyline::with_parts(parts.clone()));

    let layers = reproject_layers(&ShapefileEngine::new(), &root, &TargetCrs::NAD83).unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].layer, GroundMotionLayer::Psa10);
    assert_eq!(layers[0].geometry_type, "Polyline");

    let (shape, _record) = read_single_shape(&root.join("psa10_GCS_NAD83.shp"));
    let Shape::Polyline(written) = &shape else {
        panic!("expected a polyline, got {shape}");
    };
    assert_eq!(written.parts().len(), 2);
    for (written, original) in written.parts().iter().zip(&parts) {
        assert_eq!(written.len(), original.len());
        for (a, b) in written.iter().zip(original) {
            assert!((a.x - b.x).abs() < 1e-9);
            assert!((a.y - b.y).abs() < 1e-9);
        }
    }
}

#[test]
fn unrecognized_layers_produce_nothing() {
    let (_temp, root) = utf8_tempdir();
    write_point_layer(&root, "mi", 2, Some(WGS84_WKT));
    write_point_layer(&root, "Pga", 2, None);

    let layers = reproject_layers(&ShapefileEngine::new(), &root, &TargetCrs::NAD83).unwrap();

    assert!(layers.is_empty());
    assert!(!root.join("mi_GCS_NAD83.shp").as_std_path().exists());
    assert!(!root.join("Pga_GCS_NAD83.shp").as_std_path().exists());
}

#[cfg(not(feature = "proj-transforms"))]
#[test]
fn projected_source_needs_proj() {
    let (_temp, root) = utf8_tempdir();
    write_point_layer(&root, "pgv", 2, Some(UTM_WKT));

    let err = reproject_layers(&ShapefileEngine::new(), &root, &TargetCrs::NAD83).unwrap_err();
    assert_matches!(err, ShakeError::Reprojection { .. });
    assert!(!root.join("pgv_GCS_NAD83.shp").as_std_path().exists());
}

#[test]
fn unreadable_projection_is_an_error() {
    let (_temp, root) = utf8_tempdir();
    write_point_layer(&root, "pga", 2, Some("not a crs"));

    let err = reproject_layers(&ShapefileEngine::new(), &root, &TargetCrs::NAD83).unwrap_err();
    assert_matches!(err, ShakeError::Reprojection { .. });
}
