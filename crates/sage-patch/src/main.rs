//! `extract-patch`: writes the assets shared by every map under a root
//! directory into `<root>/<name>.manifest`.
//!
//! Exit codes: `0` success, `-1` missing root argument, `-2` root not found,
//! `-3` any processing error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sage_patch::prelude::*;

#[derive(Parser)]
#[command(name = "extract-patch")]
#[command(about = "Extract the assets common to all maps into a patch manifest", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory whose subdirectories each hold one map package.
    root: Option<PathBuf>,

    /// Base name of the produced manifest and asset directory.
    #[arg(long, default_value = "patch")]
    name: String,

    /// Write the discard journal and commit outcome as JSON to this file.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn exit_code(code: i32) -> ExitCode {
    // Negative statuses wrap to their low byte, as the OS reports them.
    ExitCode::from(code as u8)
}

fn extract(root: &Path, cli: &Cli) -> anyhow::Result<()> {
    let config = PatchConfig {
        patch_name: cli.name.clone(),
        ..Default::default()
    };
    let report = FilterRun::new(root, config)
        .execute()
        .with_context(|| format!("extracting patch from '{}'", root.display()))?;

    match report.outcome.summary() {
        Some(summary) => println!(
            "wrote {} assets to {}",
            summary.asset_count,
            summary.manifest_path.display()
        ),
        None => println!("no assets are common to all maps"),
    }

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing report '{}'", path.display()))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let Some(root) = cli.root.clone() else {
        println!("usage: extract-patch <root>");
        return exit_code(-1);
    };
    if !root.is_dir() {
        println!("path not found: {}", root.display());
        return exit_code(-2);
    }

    match extract(&root, &cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("error: {err:#}");
            exit_code(-3)
        }
    }
}
