use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use shakemap_hazus::config::{ConfigLoader, ConfigOverrides};
use shakemap_hazus::error::ShakeError;
use shakemap_hazus::fs_util;
use shakemap_hazus::geometry::ShapefileEngine;
use shakemap_hazus::output::{JsonOutput, OutputMode, TerminalOutput};
use shakemap_hazus::pipeline::{ConversionPipeline, ConversionRequest, PipelineSettings};
use shakemap_hazus::workspace::Workspace;

#[derive(Parser)]
#[command(name = "shakemap-hazus")]
#[command(about = "Convert a ShakeMap shape.zip (peak ground motions) into a HAZUS scenario database")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Extract, reproject and package a shake.zip for one scenario")]
    Convert(ConvertArgs),
    #[command(about = "List archive members and check the ground-motion layers")]
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ConvertArgs {
    #[arg(long)]
    archive: Utf8PathBuf,

    #[arg(long)]
    scenario: String,

    #[arg(long)]
    output_root: Option<Utf8PathBuf>,

    #[arg(long)]
    template_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct InspectArgs {
    archive: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ShakeError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ShakeError) -> u8 {
    match error {
        ShakeError::InvalidScenario(_)
        | ShakeError::MissingOutputRoot
        | ShakeError::ConfigRead(_)
        | ShakeError::ConfigParse(_) => 2,
        ShakeError::Extraction { .. }
        | ShakeError::Reprojection { .. }
        | ShakeError::TemplateCopy { .. }
        | ShakeError::Rename { .. } => 3,
        ShakeError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Convert(args) => run_convert(args, output_mode),
        Commands::Inspect(args) => run_inspect(args, output_mode),
    }
}

fn run_convert(args: ConvertArgs, output_mode: OutputMode) -> miette::Result<()> {
    let ConvertArgs {
        archive,
        scenario,
        output_root,
        template_dir,
        config,
    } = args;

    let resolved = ConfigLoader::resolve(
        config.as_deref(),
        ConfigOverrides {
            template_dir,
            output_root,
        },
    )?;
    let output_root = resolved.require_output_root()?.to_path_buf();
    let request = ConversionRequest::new(archive, output_root.clone(), &scenario)?;
    let pipeline = ConversionPipeline::new(ShapefileEngine::new(), PipelineSettings::from(&resolved));

    let result = match output_mode {
        OutputMode::NonInteractive => {
            let result = pipeline.convert(&request, &JsonOutput);
            JsonOutput::print_conversion(&result).into_diagnostic()?;
            result
        }
        OutputMode::Interactive => {
            let result = pipeline.convert(&request, &TerminalOutput);
            TerminalOutput::print_conversion(&result);
            result
        }
    };

    let result = result.into_outcome()?;
    let workspace = Workspace::new(output_root, result.scenario_id.clone());
    let manifest = result.manifest(chrono::Utc::now().to_rfc3339());
    let path = workspace.write_manifest(&manifest)?;
    tracing::info!(manifest = %path, "wrote conversion manifest");
    Ok(())
}

fn run_inspect(args: InspectArgs, output_mode: OutputMode) -> miette::Result<()> {
    let report = fs_util::inspect_zip(&args.archive)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_inspect(&report).into_diagnostic()?,
        OutputMode::Interactive => TerminalOutput::print_inspect(&report),
    }
    Ok(())
}
