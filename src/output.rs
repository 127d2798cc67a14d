use std::io::{self, Write};

use serde::Serialize;

use crate::fs_util::ArchiveReport;
use crate::pipeline::{ConversionResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_conversion(result: &ConversionResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_inspect(report: &ArchiveReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable progress on stderr, summaries on stdout.
pub struct TerminalOutput;

impl ProgressSink for TerminalOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("[{:>6.2}s] {}", elapsed.as_secs_f64(), event.message),
            None => eprintln!("{}", event.message),
        }
    }
}

impl TerminalOutput {
    pub fn print_conversion(result: &ConversionResult) {
        let green = "\x1b[32m";
        let yellow = "\x1b[33m";
        let cyan = "\x1b[36m";
        let red = "\x1b[31m";
        let reset = "\x1b[0m";

        println!(
            "{cyan}ShakeMap -> HAZUS: {} ({}){reset}",
            result.scenario_name, result.scenario_id
        );
        for layer in &result.layers {
            println!(
                "{green}  {} -> {} ({} features, EPSG:{}){reset}",
                layer.layer, layer.output, layer.feature_count, layer.epsg
            );
        }
        for db in &result.databases {
            println!("{green}  database: {}{reset}", db.to);
        }
        if result.is_done() && result.layers.is_empty() {
            println!("{yellow}  no ground-motion layers (pga, pgv, psa03, psa10) found{reset}");
        }

        match &result.failure {
            Some(failure) => println!(
                "{red}Failed at {}: {}{reset}",
                failure.step, failure.message
            ),
            None => println!("{green}Done: {}{reset}", result.workspace),
        }
    }

    pub fn print_inspect(report: &ArchiveReport) {
        println!("{}: {} members", report.archive, report.members.len());
        for layer in &report.layers {
            if layer.is_complete() {
                println!("  {} ({}): complete", layer.layer, layer.layer.description());
            } else {
                println!(
                    "  {} ({}): missing {}",
                    layer.layer,
                    layer.layer.description(),
                    layer.missing.join(", ")
                );
            }
        }
        if report.layers.is_empty() {
            println!("  no ground-motion layers found");
        }
    }
}
