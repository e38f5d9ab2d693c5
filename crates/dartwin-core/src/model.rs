//! DarTwin model types.
//!
//! The model is the parser's output and speaks the vocabulary of the language
//! itself: systems own digital twins, original (physical) twins and the
//! connections between their ports; goals are allocated to digital twins. No
//! rendering concern leaks into these types.
//!
//! # Pipeline Position
//!
//! ```text
//! Source Text
//!     ↓ lexer + parser (dartwin-parser)
//! Model (these types)
//!     ↓ graph builder (dartwin)
//! Graph
//!     ↓ layout (dartwin)
//! Positioned Graph
//! ```
//!
//! Every type serializes to the camelCase interchange shape checked by
//! [`crate::interchange::validate_model`].

use serde::{Deserialize, Serialize};

/// Literal discriminant carried in the `$type` field of a serialized model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    #[default]
    DarTwinModel,
}

impl ModelType {
    /// The string written into the `$type` field.
    pub const TAG: &'static str = "DarTwinModel";
}

/// A complete DarTwin document.
///
/// Holds everything declared inside the single `#root` block, in source
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DarTwinModel {
    #[serde(rename = "$type")]
    model_type: ModelType,
    pub name: String,
    pub systems: Vec<TwinSystem>,
    pub goals: Vec<Goal>,
    pub allocations: Vec<Allocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans: Option<DarTrans>,
}

impl DarTwinModel {
    /// Creates an empty model with the given root name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the model discriminant.
    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    /// Returns `true` if the model declares nothing at all.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
            && self.goals.is_empty()
            && self.allocations.is_empty()
            && self.trans.is_none()
    }

    /// Returns the transformation slice for `stage`, if declared.
    pub fn stage(&self, stage: Stage) -> Option<&DarTransSlice> {
        self.trans.as_ref().and_then(|trans| trans.slice(stage))
    }
}

/// A system grouping digital twins, their physical counterparts and the
/// wiring between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TwinSystem {
    pub name: String,
    pub digital_twins: Vec<DigitalTwin>,
    pub original_twins: Vec<OriginalTwin>,
    pub connections: Vec<Connection>,
}

impl TwinSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The virtual counterpart of a physical part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DigitalTwin {
    pub name: String,
    pub ports: Vec<String>,
}

/// The physical part a digital twin mirrors, declared with `part`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OriginalTwin {
    pub name: String,
    pub ports: Vec<String>,
}

/// A wire between two ports.
///
/// `from` and `to` are dotted references exactly as written in the source,
/// for example `Controller.speed` or `Plant.Motor.speed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A named objective, optionally documented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Goal {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// Assignment of a goal to a digital twin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Allocation {
    pub goal: String,
    pub target: String,
}

/// The optional `#transform` section: an architecture change expressed as
/// before/core/after slices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DarTrans {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<DarTransSlice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<DarTransSlice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<DarTransSlice>,
}

impl DarTrans {
    /// Returns the slice declared for `stage`.
    pub fn slice(&self, stage: Stage) -> Option<&DarTransSlice> {
        match stage {
            Stage::Before => self.before.as_ref(),
            Stage::Core => self.core.as_ref(),
            Stage::After => self.after.as_ref(),
        }
    }

    /// Returns a mutable handle to the slot for `stage`.
    pub fn slot_mut(&mut self, stage: Stage) -> &mut Option<DarTransSlice> {
        match stage {
            Stage::Before => &mut self.before,
            Stage::Core => &mut self.core,
            Stage::After => &mut self.after,
        }
    }
}

/// A partial model. Any list left out of the source stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DarTransSlice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systems: Option<Vec<TwinSystem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<Goal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocations: Option<Vec<Allocation>>,
}

impl DarTransSlice {
    pub fn systems(&self) -> &[TwinSystem] {
        self.systems.as_deref().unwrap_or_default()
    }

    pub fn goals(&self) -> &[Goal] {
        self.goals.as_deref().unwrap_or_default()
    }

    pub fn allocations(&self) -> &[Allocation] {
        self.allocations.as_deref().unwrap_or_default()
    }
}

/// One of the three stages of a transformation section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Before,
    Core,
    After,
}

impl Stage {
    /// All stages in document order.
    pub const ALL: [Stage; 3] = [Stage::Before, Stage::Core, Stage::After];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Before => "before",
            Stage::Core => "core",
            Stage::After => "after",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Stage::Before),
            "core" => Ok(Stage::Core),
            "after" => Ok(Stage::After),
            other => Err(format!("unknown transformation stage `{other}`")),
        }
    }
}
