//! Projection metadata and coordinate transforms.
//!
//! Layers carry their CRS as ESRI/OGC WKT in the `.prj` sidecar. The
//! built-in transform covers geographic systems whose datum EPSG treats as
//! coincident with NAD83 (the WGS 84 to NAD83 operation PROJ picks by
//! default is a null shift). Any other source CRS needs the
//! `proj-transforms` feature.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::domain::TargetCrs;

static ROOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*([A-Z]+)\s*\[\s*"([^"]*)""#).expect("root keyword pattern")
});
static DATUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"DATUM\s*\[\s*"([^"]*)""#).expect("datum pattern"));
static ENSEMBLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bENSEMBLE\s*\[\s*"([^"]*)""#).expect("ensemble pattern"));
static PRIMEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"PRIMEM\s*\[\s*"([^"]*)"\s*,\s*([-+0-9.eE]+)"#).expect("prime meridian pattern")
});
static UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:ANGLEUNIT|UNIT)\s*\[\s*"([^"]*)"\s*,\s*([-+0-9.eE]+)"#).expect("unit pattern")
});

const DEGREE_IN_RADIANS: f64 = 0.017_453_292_519_943_3;

/// Datum names (normalized) that share NAD83's coordinates at the accuracy
/// of EPSG's default WGS 84 / NAD83 operation.
const NAD83_COMPATIBLE_DATUMS: &[&str] = &[
    "DWGS1984",
    "WGS1984",
    "WGS84",
    "WORLDGEODETICSYSTEM1984",
    "WORLDGEODETICSYSTEM1984ENSEMBLE",
    "DNORTHAMERICAN1983",
    "NORTHAMERICAN1983",
    "NORTHAMERICANDATUM1983",
    "NAD83",
];

#[derive(Debug, Error)]
pub enum CrsError {
    #[error("projection metadata is empty")]
    Empty,
    #[error("unrecognized projection metadata: {0}")]
    Unrecognized(String),
    #[error("unsupported source CRS {name}: {reason}")]
    Unsupported { name: String, reason: String },
    #[error("coordinate transform failed: {0}")]
    Transform(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    Geographic,
    Projected,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub wkt: String,
    pub kind: CrsKind,
    pub name: String,
    pub datum: Option<String>,
    pub prime_meridian: Option<(String, f64)>,
    pub angular_unit: Option<(String, f64)>,
}

impl Projection {
    pub fn parse(wkt: &str) -> Result<Self, CrsError> {
        let wkt = wkt.trim();
        if wkt.is_empty() {
            return Err(CrsError::Empty);
        }

        let root = ROOT_RE
            .captures(wkt)
            .ok_or_else(|| CrsError::Unrecognized(truncate(wkt)))?;
        let kind = match &root[1] {
            "GEOGCS" | "GEOGCRS" | "GEOGRAPHICCRS" => CrsKind::Geographic,
            "PROJCS" | "PROJCRS" | "PROJECTEDCRS" => CrsKind::Projected,
            "GEOCCS" | "GEODCRS" | "GEODETICCRS" | "COMPD_CS" | "COMPOUNDCRS" => CrsKind::Other,
            other => return Err(CrsError::Unrecognized(other.to_string())),
        };

        // WKT2:2019 names a datum ensemble instead of a single datum.
        let datum = DATUM_RE
            .captures(wkt)
            .or_else(|| ENSEMBLE_RE.captures(wkt))
            .map(|caps| caps[1].to_string());
        let prime_meridian = PRIMEM_RE.captures(wkt).and_then(|caps| {
            caps[2]
                .parse::<f64>()
                .ok()
                .map(|value| (caps[1].to_string(), value))
        });
        // For a geographic root the first unit outside the ellipsoid
        // (LENGTHUNIT) is the angular one.
        let angular_unit = UNIT_RE.captures(wkt).and_then(|caps| {
            caps[2]
                .parse::<f64>()
                .ok()
                .map(|value| (caps[1].to_string(), value))
        });

        Ok(Self {
            wkt: wkt.to_string(),
            kind,
            name: root[2].to_string(),
            datum,
            prime_meridian,
            angular_unit,
        })
    }

    pub fn is_nad83_compatible_geographic(&self) -> Result<(), String> {
        if self.kind != CrsKind::Geographic {
            return Err("not a geographic coordinate system".to_string());
        }
        let datum = self
            .datum
            .as_deref()
            .ok_or_else(|| "no datum definition".to_string())?;
        if !NAD83_COMPATIBLE_DATUMS.contains(&normalize(datum).as_str()) {
            return Err(format!("datum {datum} has no built-in shift to NAD83"));
        }
        if let Some((name, offset)) = &self.prime_meridian
            && *offset != 0.0
        {
            return Err(format!("prime meridian {name} is not Greenwich"));
        }
        if let Some((name, factor)) = &self.angular_unit
            && (factor - DEGREE_IN_RADIANS).abs() > 1e-12
        {
            return Err(format!("angular unit {name} is not degrees"));
        }
        Ok(())
    }
}

enum TransformKind {
    PassThrough,
    #[cfg(feature = "proj-transforms")]
    Proj(proj::Proj),
}

pub struct CoordinateTransform {
    kind: TransformKind,
}

impl CoordinateTransform {
    #[cfg(not(feature = "proj-transforms"))]
    pub fn new(source: &Projection, target: &TargetCrs) -> Result<Self, CrsError> {
        source
            .is_nad83_compatible_geographic()
            .map_err(|reason| CrsError::Unsupported {
                name: source.name.clone(),
                reason: format!(
                    "{reason} (build with proj-transforms for {})",
                    target.authority_code()
                ),
            })?;
        Ok(Self {
            kind: TransformKind::PassThrough,
        })
    }

    #[cfg(feature = "proj-transforms")]
    pub fn new(source: &Projection, target: &TargetCrs) -> Result<Self, CrsError> {
        if source.is_nad83_compatible_geographic().is_ok() {
            return Ok(Self {
                kind: TransformKind::PassThrough,
            });
        }
        let transformer = proj::Proj::new_known_crs(&source.wkt, &target.authority_code(), None)
            .map_err(|err| CrsError::Unsupported {
                name: source.name.clone(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            kind: TransformKind::Proj(transformer),
        })
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self.kind, TransformKind::PassThrough)
    }

    /// Converts one coordinate in (x = longitude/easting, y = latitude/northing) order.
    pub fn convert(&self, x: f64, y: f64) -> Result<(f64, f64), CrsError> {
        match &self.kind {
            TransformKind::PassThrough => {
                if !x.is_finite() || !y.is_finite() {
                    return Err(CrsError::Transform(format!("non-finite coordinate ({x}, {y})")));
                }
                Ok((x, y))
            }
            #[cfg(feature = "proj-transforms")]
            TransformKind::Proj(transformer) => transformer
                .convert((x, y))
                .map_err(|err| CrsError::Transform(err.to_string())),
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

fn truncate(wkt: &str) -> String {
    wkt.chars().take(40).collect()
}
