//! DarTwin - Graph building and layout for DarTwin architecture diagrams.
//!
//! Reads documents of the DarTwin language, builds a typed node/edge graph
//! from them and lays that graph out with a fixed template, ready for any
//! external renderer. The whole pipeline is pure: the same input and
//! configuration always give the same output.

pub mod config;

mod error;
pub mod layout;
pub mod structure;

pub use dartwin_core::{geometry, graph, identifier, interchange, model};
pub use dartwin_parser::ParseOutcome;

pub use error::DartwinError;

use log::{debug, info, trace};

use dartwin_core::{
    graph::Graph,
    model::{DarTwinModel, Stage},
};

use config::AppConfig;
use layout::{Engine, PositionedGraph};
use structure::BuildOutcome;

/// Builder for running DarTwin documents through the pipeline.
///
/// Each stage is exposed on its own so callers can stop at the model, the
/// graph or the positioned graph.
///
/// # Examples
///
/// ```
/// use dartwin::{DarTwinBuilder, config::AppConfig};
///
/// let source = r#"
///     #root Factory {
///         #system Plant {
///             #digitaltwin Monitor { port sensor_in; }
///             part Motor { port sensor_in; }
///             connect Motor.sensor_in to Monitor.sensor_in;
///         }
///     }
/// "#;
///
/// let builder = DarTwinBuilder::new(AppConfig::default());
///
/// let parsed = builder.parse(source);
/// let built = builder.build_graph(&parsed.model);
/// let positioned = builder.layout(&built.graph);
///
/// assert_eq!(positioned.nodes().len(), 6);
/// assert_eq!(positioned.edges().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct DarTwinBuilder {
    config: AppConfig,
}

impl DarTwinBuilder {
    /// Create a new builder with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration including layout and port settings
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse source text into a model. Never fails; skipped input is
    /// reported in [`ParseOutcome::diagnostics`].
    pub fn parse(&self, source: &str) -> ParseOutcome {
        info!("Parsing document");
        let outcome = dartwin_parser::parse_with_diagnostics(source);
        debug!(diagnostics = outcome.diagnostics.len(); "Document parsed");
        outcome
    }

    /// Read a model from its JSON interchange form.
    ///
    /// # Errors
    ///
    /// Returns [`DartwinError::Interchange`] if the text is not JSON or does
    /// not have the shape of a model.
    ///
    /// # Examples
    ///
    /// ```
    /// use dartwin::DarTwinBuilder;
    ///
    /// let builder = DarTwinBuilder::default();
    /// let model = builder
    ///     .model_from_json(r#"{"$type":"DarTwinModel","name":"R","systems":[],"goals":[],"allocations":[]}"#)
    ///     .unwrap();
    /// assert_eq!(model.name, "R");
    ///
    /// assert!(builder.model_from_json(r#"{"name":"R"}"#).is_err());
    /// ```
    pub fn model_from_json(&self, text: &str) -> Result<DarTwinModel, DartwinError> {
        info!("Reading model JSON");
        let model = interchange::model_from_json(text)?;
        trace!(model:?; "Model read");
        Ok(model)
    }

    /// Build the graph of the model's top-level declarations.
    pub fn build_graph(&self, model: &DarTwinModel) -> BuildOutcome {
        structure::build(model)
    }

    /// Build the graph of one slice of the model's transformation section.
    pub fn build_stage(&self, model: &DarTwinModel, stage: Stage) -> BuildOutcome {
        structure::build_stage(model, stage)
    }

    /// Lay out a graph with the configured template.
    pub fn layout(&self, graph: &Graph) -> PositionedGraph {
        let engine = Engine::new(self.config.layout(), self.config.ports());
        engine.layout(graph)
    }
}
