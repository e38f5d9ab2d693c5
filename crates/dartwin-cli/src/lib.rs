//! CLI logic for the DarTwin tool.
//!
//! Reads a DarTwin document (or a model JSON file), runs it through the
//! pipeline and writes the requested stage as JSON.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, Emit, StageArg};

use std::{
    fs,
    io::{self, Write},
};

use log::{info, warn};

use dartwin::{DarTwinBuilder, DartwinError, interchange, model::DarTwinModel};

use error_adapter::diagnostics_to_reportables;

/// Run the DarTwin CLI application
///
/// This function processes the input file through the DarTwin pipeline
/// and writes the resulting JSON to the output file or standard output.
/// Skipped input is reported as warnings and does not fail the run.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `DartwinError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Model JSON that fails validation (with `--from-json`)
pub fn run(args: &Args) -> Result<(), DartwinError> {
    info!(
        input_path = args.input,
        emit:? = args.emit;
        "Processing document"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let source = fs::read_to_string(&args.input)?;
    let builder = DarTwinBuilder::new(app_config);

    let model = read_model(&builder, &source, args.from_json)?;
    let json = emit(&builder, &model, args)?;

    match &args.output {
        Some(path) => {
            fs::write(path, json)?;
            info!(output_file = path; "Output written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}

fn read_model(
    builder: &DarTwinBuilder,
    source: &str,
    from_json: bool,
) -> Result<DarTwinModel, DartwinError> {
    if from_json {
        return builder.model_from_json(source);
    }

    let parsed = builder.parse(source);
    report_diagnostics(&parsed.diagnostics, source);
    Ok(parsed.model)
}

fn emit(builder: &DarTwinBuilder, model: &DarTwinModel, args: &Args) -> Result<String, DartwinError> {
    if args.emit == Emit::Model {
        return Ok(interchange::model_to_json(model)?);
    }

    let built = match args.stage {
        Some(stage) => builder.build_stage(model, stage.into()),
        None => builder.build_graph(model),
    };

    let json = match args.emit {
        Emit::Graph => interchange::graph_to_json(&built.graph)?,
        _ => builder.layout(&built.graph).to_json()?,
    };
    Ok(json)
}

/// Render parser diagnostics through miette and log them as warnings.
fn report_diagnostics(diagnostics: &[dartwin_parser::error::Diagnostic], source: &str) {
    if diagnostics.is_empty() {
        return;
    }

    let reporter = miette::GraphicalReportHandler::new();
    for reportable in diagnostics_to_reportables(diagnostics, source) {
        let mut writer = String::new();
        match reporter.render_report(&mut writer, &reportable) {
            Ok(()) => warn!("{writer}"),
            Err(_) => warn!(diagnostic:% = reportable; "Could not render diagnostic"),
        }
    }
}
