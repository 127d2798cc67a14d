#![allow(dead_code)]

use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::Point;
use zip::write::SimpleFileOptions;

pub const WGS84_WKT: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

pub fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

pub fn station_points(count: usize) -> Vec<(Point, String, f64)> {
    (0..count)
        .map(|i| {
            let point = Point::new(-115.5 + i as f64 * 0.125, 32.25 + i as f64 * 0.0625);
            (point, format!("ST{i:02}"), i as f64 * 0.5)
        })
        .collect()
}

/// Writes `<dir>/<base>.shp/.shx/.dbf` with point features and, when
/// `prj` is given, a `.prj` sidecar.
pub fn write_point_layer(dir: &Utf8Path, base: &str, count: usize, prj: Option<&str>) {
    fs::create_dir_all(dir.as_std_path()).unwrap();
    let builder = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("STATION").unwrap(), 16)
        .add_numeric_field(FieldName::try_from("VALUE").unwrap(), 12, 4);
    let path = dir.join(format!("{base}.shp"));
    let mut writer = shapefile::Writer::from_path(path.as_std_path(), builder).unwrap();
    for (point, station, value) in station_points(count) {
        let mut record = Record::default();
        record.insert("STATION".to_string(), FieldValue::Character(Some(station)));
        record.insert("VALUE".to_string(), FieldValue::Numeric(Some(value)));
        writer.write_shape_and_record(&point, &record).unwrap();
    }
    drop(writer);
    if let Some(wkt) = prj {
        fs::write(dir.join(format!("{base}.prj")).as_std_path(), wkt).unwrap();
    }
}

/// Zips every file directly inside `dir` under its bare file name.
pub fn zip_dir(dir: &Utf8Path, zip_path: &Utf8Path) -> usize {
    let mut names = fs::read_dir(dir.as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    names.sort();

    let file = fs::File::create(zip_path.as_std_path()).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for path in &names {
        let name = path.file_name().unwrap().to_str().unwrap();
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(&fs::read(path).unwrap()).unwrap();
    }
    writer.finish().unwrap();
    names.len()
}

pub fn write_zip(zip_path: &Utf8Path, members: &[(&str, &str)]) {
    let file = fs::File::create(zip_path.as_std_path()).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, content) in members {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// A template tree: the marked database, an unrelated file and a subfolder.
pub fn write_template(dir: &Utf8Path) {
    fs::create_dir_all(dir.join("Support").as_std_path()).unwrap();
    fs::write(dir.join("Template_Shakemap.mdb").as_std_path(), b"empty hazus database").unwrap();
    fs::write(dir.join("ReadMe.txt").as_std_path(), b"import into HAZUS").unwrap();
    fs::write(dir.join("Support/fields.csv").as_std_path(), b"pga,pgv,psa03,psa10").unwrap();
}

/// Relative file paths and sizes below `root`, sorted.
pub fn tree(root: &Utf8Path) -> Vec<(String, u64)> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(dir.as_std_path()).unwrap() {
            let path = Utf8PathBuf::from_path_buf(entry.unwrap().path()).unwrap();
            if path.as_std_path().is_dir() {
                stack.push(path);
            } else {
                let size = fs::metadata(path.as_std_path()).unwrap().len();
                let relative = path.strip_prefix(root).unwrap().to_string();
                items.push((relative, size));
            }
        }
    }
    items.sort();
    items
}
