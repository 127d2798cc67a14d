use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::domain::{PipelineState, ScenarioId, ScenarioName, Step, TargetCrs};
use crate::error::ShakeError;
use crate::fs_util::{self, ExtractedSet};
use crate::geometry::GeometryEngine;
use crate::reproject::{self, ReprojectedLayer};
use crate::template::{self, RenamedDatabase};
use crate::workspace::{Manifest, ManifestLayer, Workspace};

/// The three caller inputs of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub archive: Utf8PathBuf,
    pub output_root: Utf8PathBuf,
    pub scenario: ScenarioName,
}

impl ConversionRequest {
    pub fn new(
        archive: impl Into<Utf8PathBuf>,
        output_root: impl Into<Utf8PathBuf>,
        scenario_name: &str,
    ) -> Result<Self, ShakeError> {
        Ok(Self {
            archive: archive.into(),
            output_root: output_root.into(),
            scenario: scenario_name.parse()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub template_dir: Utf8PathBuf,
    pub database_extension: String,
    pub target: TargetCrs,
}

impl PipelineSettings {
    pub fn new(template_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            database_extension: crate::config::DEFAULT_DATABASE_EXTENSION.to_string(),
            target: TargetCrs::NAD83,
        }
    }
}

impl From<&ResolvedConfig> for PipelineSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            template_dir: config.template_dir.clone(),
            database_extension: config.database_extension.clone(),
            target: TargetCrs::NAD83,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Serialize)]
pub struct StepFailure {
    pub step: Step,
    pub kind: String,
    pub path: Option<Utf8PathBuf>,
    pub message: String,
    #[serde(skip)]
    pub error: ShakeError,
}

#[derive(Debug, Serialize)]
pub struct ConversionResult {
    pub state: PipelineState,
    pub scenario_name: String,
    pub scenario_id: ScenarioId,
    pub archive: Utf8PathBuf,
    pub workspace: Utf8PathBuf,
    pub completed_steps: Vec<Step>,
    pub extracted_files: Vec<Utf8PathBuf>,
    pub layers: Vec<ReprojectedLayer>,
    pub template_files: Vec<Utf8PathBuf>,
    pub databases: Vec<RenamedDatabase>,
    pub failure: Option<StepFailure>,
}

impl ConversionResult {
    fn idle(request: &ConversionRequest, workspace: &Workspace) -> Self {
        Self {
            state: PipelineState::Idle,
            scenario_name: request.scenario.as_str().to_string(),
            scenario_id: workspace.scenario().clone(),
            archive: request.archive.clone(),
            workspace: workspace.root(),
            completed_steps: Vec::new(),
            extracted_files: Vec::new(),
            layers: Vec::new(),
            template_files: Vec::new(),
            databases: Vec::new(),
            failure: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == PipelineState::Done
    }

    pub fn failed_step(&self) -> Option<Step> {
        self.failure.as_ref().map(|failure| failure.step)
    }

    /// Hands back the error of a failed run, or the result of a finished one.
    pub fn into_outcome(mut self) -> Result<Self, ShakeError> {
        match self.failure.take() {
            Some(failure) => Err(failure.error),
            None => Ok(self),
        }
    }

    pub fn manifest(&self, converted_at: String) -> Manifest {
        Manifest {
            scenario_name: self.scenario_name.clone(),
            scenario_id: self.scenario_id.to_string(),
            archive: self.archive.to_string(),
            layers: self
                .layers
                .iter()
                .map(|layer| ManifestLayer {
                    layer: layer.layer.to_string(),
                    path: layer.output.to_string(),
                    feature_count: layer.feature_count,
                    epsg: layer.epsg,
                })
                .collect(),
            databases: self
                .databases
                .iter()
                .map(|db| db.to.to_string())
                .collect(),
            converted_at,
            tool: format!("shakemap-hazus/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    // Runs one step; on error the result becomes `Failed` and `None` is returned.
    fn step<T>(
        &mut self,
        step: Step,
        sink: &dyn ProgressSink,
        started: Instant,
        action: impl FnOnce() -> Result<T, ShakeError>,
    ) -> Option<T> {
        debug_assert!(!self.state.is_terminal());
        sink.event(ProgressEvent {
            message: format!("phase={step}; starting"),
            elapsed: Some(started.elapsed()),
        });
        match action() {
            Ok(value) => {
                self.state = step.completed_state();
                self.completed_steps.push(step);
                tracing::debug!(%step, state = %self.state, "step complete");
                Some(value)
            }
            Err(error) => {
                tracing::warn!(%step, error = %error, "conversion failed");
                sink.event(ProgressEvent {
                    message: format!("phase={step}; failed: {error}"),
                    elapsed: Some(started.elapsed()),
                });
                self.state = PipelineState::Failed;
                self.failure = Some(StepFailure {
                    step,
                    kind: error.kind().to_string(),
                    path: error.path().cloned(),
                    message: error.to_string(),
                    error,
                });
                None
            }
        }
    }
}

/// Runs extract, reproject, copy-template and rename strictly in order,
/// stopping at the first failure. Completed steps are never rolled back.
pub struct ConversionPipeline<E: GeometryEngine> {
    engine: E,
    settings: PipelineSettings,
}

impl<E: GeometryEngine> ConversionPipeline<E> {
    pub fn new(engine: E, settings: PipelineSettings) -> Self {
        Self { engine, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn convert_paths(
        &self,
        archive: &Utf8Path,
        output_root: &Utf8Path,
        scenario_name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<ConversionResult, ShakeError> {
        let request = ConversionRequest::new(archive, output_root, scenario_name)?;
        Ok(self.convert(&request, sink))
    }

    pub fn convert(
        &self,
        request: &ConversionRequest,
        sink: &dyn ProgressSink,
    ) -> ConversionResult {
        let started = Instant::now();
        let workspace = Workspace::new(request.output_root.clone(), request.scenario.identifier());
        let mut result = ConversionResult::idle(request, &workspace);
        tracing::info!(
            scenario = %request.scenario,
            id = %workspace.scenario(),
            archive = %request.archive,
            "starting conversion"
        );

        let shape_dir = workspace.shape_dir();
        let Some(extracted) = result.step(Step::Extract, sink, started, || {
            fs_util::extract_zip(&request.archive, &shape_dir)
        }) else {
            return result;
        };
        let ExtractedSet { files, .. } = extracted;
        sink.event(ProgressEvent {
            message: format!("phase=extract; {} files in {shape_dir}", files.len()),
            elapsed: Some(started.elapsed()),
        });
        result.extracted_files = files;

        let target = self.settings.target;
        let Some(layers) = result.step(Step::Reproject, sink, started, || {
            reproject::reproject_layers(&self.engine, &shape_dir, &target)
        }) else {
            return result;
        };
        for layer in &layers {
            sink.event(ProgressEvent {
                message: format!(
                    "phase=reproject; {} -> {} ({} features)",
                    layer.layer, layer.output, layer.feature_count
                ),
                elapsed: Some(started.elapsed()),
            });
        }
        result.layers = layers;

        let data_dir = workspace.data_dir();
        let Some(template_files) = result.step(Step::CopyTemplate, sink, started, || {
            template::instantiate_template(&self.settings.template_dir, &data_dir)
        }) else {
            return result;
        };
        result.template_files = template_files;

        let Some(databases) = result.step(Step::Rename, sink, started, || {
            template::rename_database(
                &data_dir,
                workspace.scenario(),
                &self.settings.database_extension,
            )
        }) else {
            return result;
        };
        if databases.is_empty() {
            tracing::warn!(dir = %data_dir, "no template database found to rename");
        }
        result.databases = databases;

        result.state = PipelineState::Done;
        sink.event(ProgressEvent {
            message: format!("phase=done; scenario {} ready", workspace.scenario()),
            elapsed: Some(started.elapsed()),
        });
        tracing::info!(workspace = %workspace.root(), "conversion done");
        result
    }
}
