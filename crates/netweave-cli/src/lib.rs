//! CLI logic for the Netweave network compiler.
//!
//! Reads a drawing, compiles it (or assembles it, for a super-network) and
//! writes the resolved network model as TOML.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{fs, io, path::Path};

use log::{info, warn};

use netweave::{CompiledModel, NetweaveError, NetworkCompiler, source::FsDrawingSource};

/// Run the Netweave CLI application
///
/// Sub-network drawings referenced by a super-network are resolved relative
/// to the directory of the input file.
///
/// # Errors
///
/// Returns `NetweaveError` for:
/// - File I/O errors
/// - Configuration or shape-library loading errors
/// - Malformed documents
/// - Compilation and assembly errors
pub fn run(args: &Args) -> Result<(), NetweaveError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing drawing"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let library_path = args
        .library
        .as_deref()
        .map(Path::new)
        .or_else(|| app_config.library().path());
    let library = config::load_library(library_path)?;

    let text = fs::read_to_string(&args.input)?;
    let base_dir = Path::new(&args.input)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let source = FsDrawingSource::new(base_dir);

    let compiler = NetworkCompiler::new(app_config, &library);
    let (_, model) = compiler.build_source(&text, &source)?;

    let output = match &model {
        CompiledModel::Sub(compiled) => {
            let report = &compiled.report;
            info!(
                nodes = compiled.network.node_count(),
                links = compiled.network.links.len(),
                pruned_grounds = report.pruned_grounds,
                reconciled_fields = report.reconciliation.change_count();
                "Sub-network compiled"
            );
            toml::to_string_pretty(&compiled.network)
        }
        CompiledModel::Super(assembled) => {
            let report = &assembled.report;
            info!(
                nodes = assembled.network.node_count,
                instances = assembled.network.subnets.len(),
                super_ports = assembled.network.super_ports.len(),
                refreshed = report.refreshed.len(),
                reused = report.reused.len(),
                duplicate_interfaces = report.duplicate_interfaces;
                "Super-network assembled"
            );
            if report.orphaned_super_ports > 0 {
                warn!(
                    count = report.orphaned_super_ports;
                    "Orphaned super-ports were discarded"
                );
            }
            toml::to_string_pretty(&assembled.network)
        }
    }
    .map_err(io::Error::other)?;

    fs::write(&args.output, output)?;

    info!(output_file = args.output; "Network model written successfully");

    Ok(())
}
