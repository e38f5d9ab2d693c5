//! Command-line argument definitions for the DarTwin CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, what the pipeline
//! emits, configuration file selection, and logging verbosity.

use clap::{Parser, ValueEnum};

use dartwin::model::Stage;

/// Pipeline output to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    /// The parsed model, in its JSON interchange form
    Model,
    /// The built node/edge graph
    Graph,
    /// The laid out graph
    Layout,
}

/// Transformation stage to build instead of the top-level declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StageArg {
    Before,
    Core,
    After,
}

impl From<StageArg> for Stage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Before => Stage::Before,
            StageArg::Core => Stage::Core,
            StageArg::After => Stage::After,
        }
    }
}

/// Command-line arguments for the DarTwin tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input DarTwin file
    #[arg(help = "Path to the input file")]
    pub input: String,

    /// Path to the output JSON file; standard output when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// What to write
    #[arg(long, value_enum, default_value_t = Emit::Layout)]
    pub emit: Emit,

    /// Build one stage of the transformation section
    #[arg(long, value_enum)]
    pub stage: Option<StageArg>,

    /// Read the input as model JSON instead of DarTwin source
    #[arg(long)]
    pub from_json: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["dartwin", "plant.dtw"]);
        assert_eq!(args.input, "plant.dtw");
        assert_eq!(args.output, None);
        assert_eq!(args.emit, Emit::Layout);
        assert_eq!(args.stage, None);
        assert!(!args.from_json);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_all_options() {
        let args = Args::parse_from([
            "dartwin",
            "model.json",
            "-o",
            "out.json",
            "--emit",
            "graph",
            "--stage",
            "after",
            "--from-json",
            "-c",
            "config.toml",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.output.as_deref(), Some("out.json"));
        assert_eq!(args.emit, Emit::Graph);
        assert_eq!(args.stage.map(Stage::from), Some(Stage::After));
        assert!(args.from_json);
        assert_eq!(args.config.as_deref(), Some("config.toml"));
    }

    #[test]
    fn test_unknown_emit_is_rejected() {
        assert!(Args::try_parse_from(["dartwin", "in.dtw", "--emit", "svg"]).is_err());
    }
}
