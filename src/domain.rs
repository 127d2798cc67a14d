use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShakeError;

/// Display name of a scenario as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioName(String);

impl ScenarioName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn identifier(&self) -> ScenarioId {
        ScenarioId::derive(&self.0)
    }
}

impl fmt::Display for ScenarioName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScenarioName {
    type Err = ShakeError;

    // The identifier becomes a directory and file name, so anything that
    // would escape `output_root` is rejected here.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let is_blank = value.trim().is_empty();
        let has_separator = value.contains(['/', '\\']);
        let is_relative_marker = matches!(value.trim(), "." | "..");
        if is_blank || has_separator || is_relative_marker || value.contains('\0') {
            return Err(ShakeError::InvalidScenario(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// Path-safe form of a scenario name: every space replaced by an underscore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioId(String);

impl ScenarioId {
    pub fn derive(name: &str) -> Self {
        Self(name.replace(' ', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four ShakeMap layers that get reprojected. Anything else in the
/// archive is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroundMotionLayer {
    Pga,
    Pgv,
    Psa03,
    Psa10,
}

impl GroundMotionLayer {
    pub const ALL: [GroundMotionLayer; 4] = [
        GroundMotionLayer::Pga,
        GroundMotionLayer::Pgv,
        GroundMotionLayer::Psa03,
        GroundMotionLayer::Psa10,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GroundMotionLayer::Pga => "pga",
            GroundMotionLayer::Pgv => "pgv",
            GroundMotionLayer::Psa03 => "psa03",
            GroundMotionLayer::Psa10 => "psa10",
        }
    }

    /// Exact, case-sensitive match on a shapefile base name.
    pub fn from_base_name(base_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|layer| layer.as_str() == base_name)
    }

    pub fn description(self) -> &'static str {
        match self {
            GroundMotionLayer::Pga => "peak ground acceleration",
            GroundMotionLayer::Pgv => "peak ground velocity",
            GroundMotionLayer::Psa03 => "0.3 s spectral acceleration",
            GroundMotionLayer::Psa10 => "1.0 s spectral acceleration",
        }
    }
}

impl fmt::Display for GroundMotionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ESRI WKT written to the `.prj` sidecar of every reprojected layer.
pub const NAD83_ESRI_WKT: &str = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCrs {
    pub epsg: u32,
    pub name: &'static str,
    pub suffix: &'static str,
    pub esri_wkt: &'static str,
}

impl TargetCrs {
    pub const NAD83: TargetCrs = TargetCrs {
        epsg: 4269,
        name: "GCS_North_American_1983",
        suffix: "_GCS_NAD83",
        esri_wkt: NAD83_ESRI_WKT,
    };

    pub fn authority_code(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }

    pub fn output_base_name(&self, base_name: &str) -> String {
        format!("{base_name}{}", self.suffix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Extract,
    Reproject,
    CopyTemplate,
    Rename,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Extract => "extract",
            Step::Reproject => "reproject",
            Step::CopyTemplate => "copy_template",
            Step::Rename => "rename",
        }
    }

    /// State entered once this step succeeds.
    pub fn completed_state(self) -> PipelineState {
        match self {
            Step::Extract => PipelineState::Extracted,
            Step::Reproject => PipelineState::Reprojected,
            Step::CopyTemplate => PipelineState::TemplateCopied,
            Step::Rename => PipelineState::Renamed,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Extracted,
    Reprojected,
    TemplateCopied,
    Renamed,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Idle => "idle",
            PipelineState::Extracted => "extracted",
            PipelineState::Reprojected => "reprojected",
            PipelineState::TemplateCopied => "template_copied",
            PipelineState::Renamed => "renamed",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        write!(f, "{label}")
    }
}
