//! JSON interchange for models and graphs.
//!
//! Externally supplied JSON goes through a structural validator before it is
//! deserialized. The validator accepts exactly the shape produced by
//! serializing [`DarTwinModel`] or [`Graph`] and reports the first field that
//! does not fit, as a JSON path such as `systems[0].digitalTwins[1].ports[2]`.
//! It never panics and never repairs anything.
//!
//! # Example
//!
//! ```
//! # use dartwin_core::interchange::{is_model, validate_model};
//! let value = serde_json::json!({
//!     "$type": "DarTwinModel",
//!     "name": "Factory",
//!     "systems": [],
//!     "goals": [],
//!     "allocations": [],
//! });
//! assert!(is_model(&value));
//!
//! let broken = serde_json::json!({ "$type": "DarTwinModel", "name": 3 });
//! let err = validate_model(&broken).unwrap_err();
//! assert_eq!(err.path(), "name");
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use log::debug;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    graph::Graph,
    identifier::normalize_segment,
    model::{DarTwinModel, ModelType},
};

/// Why a field failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// A required field is absent.
    Missing,
    /// The field holds a value of the wrong JSON type.
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    /// The field is not part of the shape.
    UnexpectedField,
    /// The `$type` or `type` discriminant holds an unknown value.
    WrongDiscriminant(String),
    /// A name that must be non-empty is empty.
    EmptyName,
    /// An id is declared twice.
    DuplicateId(String),
    /// An edge or parent reference names no node.
    DanglingReference(String),
    /// Following `parentId` from this node leads back to a node already seen.
    ParentCycle(String),
    /// A name derives the same id as a differently spelled sibling.
    AmbiguousName { name: String, earlier: String },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Missing => write!(f, "missing required field"),
            Reason::WrongType { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Reason::UnexpectedField => write!(f, "unexpected field"),
            Reason::WrongDiscriminant(found) => write!(f, "unknown discriminant `{found}`"),
            Reason::EmptyName => write!(f, "name must not be empty"),
            Reason::DuplicateId(id) => write!(f, "duplicate id `{id}`"),
            Reason::DanglingReference(id) => write!(f, "dangling reference `{id}`"),
            Reason::ParentCycle(id) => write!(f, "parent chain of `{id}` forms a cycle"),
            Reason::AmbiguousName { name, earlier } => {
                write!(f, "`{name}` derives the same id as `{earlier}`")
            }
        }
    }
}

/// The first structural mismatch found in a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid field `{path}`: {reason}")]
pub struct ValidationError {
    path: String,
    reason: Reason,
}

impl ValidationError {
    fn new(path: impl Into<String>, reason: Reason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }

    /// JSON path of the failing field. Empty for the document itself.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reason(&self) -> &Reason {
        &self.reason
    }
}

/// Errors from reading or writing interchange JSON.
#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

type Check = Result<(), ValidationError>;

/// Validates a model document.
///
/// Besides shape, checks that sibling names which derive the same id are
/// spelled identically, so `keep cool` and `keep_cool` cannot both be goals.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered, in document order.
pub fn validate_model(value: &Value) -> Check {
    let object = expect_object(value, "")?;
    allow_fields(
        object,
        "",
        &["$type", "name", "systems", "goals", "allocations", "trans"],
    )?;

    let tag = require_string(object, "", "$type")?;
    if tag != ModelType::TAG {
        return Err(ValidationError::new(
            "$type",
            Reason::WrongDiscriminant(tag.to_string()),
        ));
    }
    require_string(object, "", "name")?;
    require_array(object, "", "systems", check_system)?;
    require_array(object, "", "goals", check_goal)?;
    require_array(object, "", "allocations", check_allocation)?;

    if let Some(trans) = optional(object, "trans") {
        check_trans(trans, "trans")?;
    }

    // Shapes are known to be valid past this point.
    check_derived_ids(object, "")?;
    if let Some(Value::Object(trans)) = optional(object, "trans") {
        for stage in ["before", "core", "after"] {
            if let Some(Value::Object(slice)) = optional(trans, stage) {
                check_derived_ids(slice, &format!("trans.{stage}"))?;
            }
        }
    }
    Ok(())
}

/// Returns `true` if `value` is a well-formed model document.
pub fn is_model(value: &Value) -> bool {
    validate_model(value).is_ok()
}

/// Validates and deserializes a model from JSON text.
///
/// # Errors
///
/// Returns [`InterchangeError::Json`] for text that is not JSON and
/// [`InterchangeError::Invalid`] for JSON of the wrong shape.
pub fn model_from_json(text: &str) -> Result<DarTwinModel, InterchangeError> {
    let value: Value = serde_json::from_str(text)?;
    model_from_value(value)
}

/// Validates and deserializes a model from an already parsed JSON value.
///
/// # Errors
///
/// See [`model_from_json`].
pub fn model_from_value(value: Value) -> Result<DarTwinModel, InterchangeError> {
    if let Err(err) = validate_model(&value) {
        debug!(path = err.path(), reason:% = err.reason(); "Rejected model JSON");
        return Err(err.into());
    }
    Ok(serde_json::from_value(value)?)
}

/// Serializes a model as pretty-printed JSON.
///
/// # Errors
///
/// Only fails if serialization itself fails, which the model types never do.
pub fn model_to_json(model: &DarTwinModel) -> Result<String, InterchangeError> {
    Ok(serde_json::to_string_pretty(model)?)
}

/// Validates a graph document.
///
/// Besides shape, checks that node ids are unique, that every `parentId`,
/// `source` and `target` names an existing node and that parent chains end at
/// a node without a parent.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate_graph(value: &Value) -> Check {
    let object = expect_object(value, "")?;
    allow_fields(object, "", &["nodes", "edges"])?;
    require_array(object, "", "nodes", check_node)?;
    require_array(object, "", "edges", check_edge)?;

    // Shapes are known to be valid past this point.
    let nodes = array_items(object, "nodes");
    let edges = array_items(object, "edges");

    let mut ids = HashSet::new();
    for (index, node) in nodes.iter().enumerate() {
        let id = string_field(node, "id");
        if !ids.insert(id) {
            return Err(ValidationError::new(
                format!("nodes[{index}].id"),
                Reason::DuplicateId(id.to_string()),
            ));
        }
    }
    for (index, node) in nodes.iter().enumerate() {
        if let Some(Value::String(parent)) = node.get("parentId") {
            if !ids.contains(parent.as_str()) {
                return Err(ValidationError::new(
                    format!("nodes[{index}].parentId"),
                    Reason::DanglingReference(parent.clone()),
                ));
            }
        }
    }
    check_parent_chains(nodes)?;
    for (index, edge) in edges.iter().enumerate() {
        for field in ["source", "target"] {
            let id = string_field(edge, field);
            if !ids.contains(id) {
                return Err(ValidationError::new(
                    format!("edges[{index}].{field}"),
                    Reason::DanglingReference(id.to_string()),
                ));
            }
        }
    }
    Ok(())
}

/// Checks every group of siblings that share an id prefix: systems, the
/// digital and original twins of each system, the ports of each twin, goals.
fn check_derived_ids(object: &Map<String, Value>, path: &str) -> Check {
    let systems_path = join(path, "systems");
    let systems = array_items(object, "systems");
    check_unambiguous(named(systems, &systems_path))?;
    for (index, system) in systems.iter().enumerate() {
        for kind in ["digitalTwins", "originalTwins"] {
            let twins_path = format!("{systems_path}[{index}].{kind}");
            let twins = value_items(system, kind);
            check_unambiguous(named(twins, &twins_path))?;
            for (twin_index, twin) in twins.iter().enumerate() {
                let ports = value_items(twin, "ports").iter().enumerate().map(|(port_index, port)| {
                    (
                        format!("{twins_path}[{twin_index}].ports[{port_index}]"),
                        port.as_str().unwrap_or_default(),
                    )
                });
                check_unambiguous(ports)?;
            }
        }
    }
    check_unambiguous(named(array_items(object, "goals"), &join(path, "goals")))
}

/// Pairs the path of every `name` field with its text.
fn named<'v>(items: &'v [Value], path: &str) -> Vec<(String, &'v str)> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| (format!("{path}[{index}].name"), string_field(item, "name")))
        .collect()
}

/// Rejects the first name whose id segment matches an earlier sibling with
/// different spelling. Exact repeats are left to the graph builder.
fn check_unambiguous<'v>(names: impl IntoIterator<Item = (String, &'v str)>) -> Check {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (path, name) in names {
        let segment = normalize_segment(name);
        match seen.get(&segment) {
            Some(&earlier) if earlier != name => {
                return Err(ValidationError::new(
                    path,
                    Reason::AmbiguousName {
                        name: name.to_string(),
                        earlier: earlier.to_string(),
                    },
                ));
            }
            Some(_) => {}
            None => {
                seen.insert(segment, name);
            }
        }
    }
    Ok(())
}

/// Rejects the first node whose parent chain loops. Parents are known to exist.
fn check_parent_chains(nodes: &[Value]) -> Check {
    let parents: HashMap<&str, &str> = nodes
        .iter()
        .filter_map(|node| match node.get("parentId") {
            Some(Value::String(parent)) => Some((string_field(node, "id"), parent.as_str())),
            _ => None,
        })
        .collect();

    for (index, node) in nodes.iter().enumerate() {
        let id = string_field(node, "id");
        let mut seen = HashSet::from([id]);
        let mut current = id;
        while let Some(&parent) = parents.get(current) {
            if !seen.insert(parent) {
                return Err(ValidationError::new(
                    format!("nodes[{index}].parentId"),
                    Reason::ParentCycle(id.to_string()),
                ));
            }
            current = parent;
        }
    }
    Ok(())
}

/// Validates and deserializes a graph from JSON text.
///
/// # Errors
///
/// See [`model_from_json`].
pub fn graph_from_json(text: &str) -> Result<Graph, InterchangeError> {
    let value: Value = serde_json::from_str(text)?;
    if let Err(err) = validate_graph(&value) {
        debug!(path = err.path(), reason:% = err.reason(); "Rejected graph JSON");
        return Err(err.into());
    }
    Ok(serde_json::from_value(value)?)
}

/// Serializes a graph as pretty-printed JSON.
///
/// # Errors
///
/// Only fails if serialization itself fails.
pub fn graph_to_json(graph: &Graph) -> Result<String, InterchangeError> {
    Ok(serde_json::to_string_pretty(graph)?)
}

fn check_system(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(
        object,
        path,
        &["name", "digitalTwins", "originalTwins", "connections"],
    )?;
    require_name(object, path)?;
    require_array(object, path, "digitalTwins", check_twin)?;
    require_array(object, path, "originalTwins", check_twin)?;
    require_array(object, path, "connections", check_connection)
}

fn check_twin(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(object, path, &["name", "ports"])?;
    require_name(object, path)?;
    require_array(object, path, "ports", |port, port_path| {
        expect_string(port, port_path).map(|_| ())
    })
}

fn check_connection(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(object, path, &["from", "to", "name"])?;
    require_string(object, path, "from")?;
    require_string(object, path, "to")?;
    optional_string(object, path, "name")
}

fn check_goal(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(object, path, &["name", "doc"])?;
    require_name(object, path)?;
    optional_string(object, path, "doc")
}

fn check_allocation(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(object, path, &["goal", "target"])?;
    require_string(object, path, "goal")?;
    require_string(object, path, "target").map(|_| ())
}

fn check_trans(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(object, path, &["before", "core", "after"])?;
    for stage in ["before", "core", "after"] {
        if let Some(slice) = optional(object, stage) {
            check_slice(slice, &join(path, stage))?;
        }
    }
    Ok(())
}

fn check_slice(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(object, path, &["systems", "goals", "allocations"])?;
    if optional(object, "systems").is_some() {
        require_array(object, path, "systems", check_system)?;
    }
    if optional(object, "goals").is_some() {
        require_array(object, path, "goals", check_goal)?;
    }
    if optional(object, "allocations").is_some() {
        require_array(object, path, "allocations", check_allocation)?;
    }
    Ok(())
}

const NODE_TYPES: [&str; 6] = [
    "root",
    "system",
    "digitalTwin",
    "originalTwin",
    "port",
    "goal",
];

fn check_node(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(object, path, &["id", "type", "label", "parentId", "doc"])?;
    require_non_empty(object, path, "id")?;
    let kind = require_string(object, path, "type")?;
    if !NODE_TYPES.contains(&kind) {
        return Err(ValidationError::new(
            join(path, "type"),
            Reason::WrongDiscriminant(kind.to_string()),
        ));
    }
    require_string(object, path, "label")?;
    optional_string(object, path, "parentId")?;
    if kind != "goal" && object.contains_key("doc") {
        return Err(ValidationError::new(
            join(path, "doc"),
            Reason::UnexpectedField,
        ));
    }
    optional_string(object, path, "doc")
}

fn check_edge(value: &Value, path: &str) -> Check {
    let object = expect_object(value, path)?;
    allow_fields(object, path, &["id", "type", "source", "target", "label"])?;
    require_non_empty(object, path, "id")?;
    let kind = require_string(object, path, "type")?;
    if !matches!(kind, "connection" | "allocation") {
        return Err(ValidationError::new(
            join(path, "type"),
            Reason::WrongDiscriminant(kind.to_string()),
        ));
    }
    require_string(object, path, "source")?;
    require_string(object, path, "target")?;
    optional_string(object, path, "label")
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| {
        ValidationError::new(
            path,
            Reason::WrongType {
                expected: "object",
                found: type_name(value),
            },
        )
    })
}

fn expect_string<'v>(value: &'v Value, path: &str) -> Result<&'v str, ValidationError> {
    value.as_str().ok_or_else(|| {
        ValidationError::new(
            path,
            Reason::WrongType {
                expected: "string",
                found: type_name(value),
            },
        )
    })
}

fn allow_fields(object: &Map<String, Value>, path: &str, allowed: &[&str]) -> Check {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ValidationError::new(join(path, key), Reason::UnexpectedField)),
        None => Ok(()),
    }
}

/// A present, non-null optional field.
fn optional<'v>(object: &'v Map<String, Value>, field: &str) -> Option<&'v Value> {
    object.get(field).filter(|value| !value.is_null())
}

fn require_string<'v>(
    object: &'v Map<String, Value>,
    path: &str,
    field: &str,
) -> Result<&'v str, ValidationError> {
    let field_path = join(path, field);
    let value = object
        .get(field)
        .ok_or_else(|| ValidationError::new(field_path.clone(), Reason::Missing))?;
    expect_string(value, &field_path)
}

fn require_non_empty(object: &Map<String, Value>, path: &str, field: &str) -> Check {
    if require_string(object, path, field)?.trim().is_empty() {
        return Err(ValidationError::new(join(path, field), Reason::EmptyName));
    }
    Ok(())
}

fn require_name(object: &Map<String, Value>, path: &str) -> Check {
    require_non_empty(object, path, "name")
}

fn optional_string(object: &Map<String, Value>, path: &str, field: &str) -> Check {
    match optional(object, field) {
        Some(value) => expect_string(value, &join(path, field)).map(|_| ()),
        None => Ok(()),
    }
}

fn require_array<F>(object: &Map<String, Value>, path: &str, field: &str, check_item: F) -> Check
where
    F: Fn(&Value, &str) -> Check,
{
    let field_path = join(path, field);
    let value = object
        .get(field)
        .ok_or_else(|| ValidationError::new(field_path.clone(), Reason::Missing))?;
    let items = value.as_array().ok_or_else(|| {
        ValidationError::new(
            field_path.clone(),
            Reason::WrongType {
                expected: "array",
                found: type_name(value),
            },
        )
    })?;
    for (index, item) in items.iter().enumerate() {
        check_item(item, &format!("{field_path}[{index}]"))?;
    }
    Ok(())
}

fn array_items<'v>(object: &'v Map<String, Value>, field: &str) -> &'v [Value] {
    object
        .get(field)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn value_items<'v>(value: &'v Value, field: &str) -> &'v [Value] {
    value
        .get(field)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn string_field<'v>(value: &'v Value, field: &str) -> &'v str {
    value.get(field).and_then(Value::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{Connection, DigitalTwin, Goal, TwinSystem};

    fn valid_model() -> Value {
        json!({
            "$type": "DarTwinModel",
            "name": "Factory",
            "systems": [{
                "name": "Plant",
                "digitalTwins": [{ "name": "Controller", "ports": ["speed", "torque"] }],
                "originalTwins": [{ "name": "Motor", "ports": ["speed"] }],
                "connections": [{ "from": "Motor.speed", "to": "Controller.speed", "name": "c1" }]
            }],
            "goals": [{ "name": "Safety", "doc": "Never overheat" }],
            "allocations": [{ "goal": "Safety", "target": "Plant.Controller" }],
            "trans": { "core": { "goals": [{ "name": "Speed" }] } }
        })
    }

    #[test]
    fn test_accepts_well_formed_model() {
        assert_eq!(validate_model(&valid_model()), Ok(()));
    }

    #[test]
    fn test_rejects_wrong_discriminant() {
        let mut value = valid_model();
        value["$type"] = json!("SomethingElse");
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "$type");
        assert_eq!(
            err.reason(),
            &Reason::WrongDiscriminant("SomethingElse".to_string())
        );
    }

    #[test]
    fn test_reports_missing_field() {
        let mut value = valid_model();
        value.as_object_mut().unwrap().remove("goals");
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "goals");
        assert_eq!(err.reason(), &Reason::Missing);
    }

    #[test]
    fn test_reports_nested_path() {
        let mut value = valid_model();
        value["systems"][0]["digitalTwins"][0]["ports"][1] = json!(7);
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "systems[0].digitalTwins[0].ports[1]");
        assert_eq!(
            err.reason(),
            &Reason::WrongType {
                expected: "string",
                found: "number"
            }
        );
    }

    #[test]
    fn test_rejects_unexpected_field() {
        let mut value = valid_model();
        value["systems"][0]["colour"] = json!("red");
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "systems[0].colour");
        assert_eq!(err.reason(), &Reason::UnexpectedField);
    }

    #[test]
    fn test_rejects_non_object_in_list() {
        let mut value = valid_model();
        value["allocations"] = json!(["Safety -> Controller"]);
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "allocations[0]");
    }

    #[test]
    fn test_rejects_empty_goal_name() {
        let mut value = valid_model();
        value["goals"][0]["name"] = json!("  ");
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "goals[0].name");
        assert_eq!(err.reason(), &Reason::EmptyName);
    }

    #[test]
    fn test_rejects_names_deriving_the_same_id() {
        let mut value = valid_model();
        value["goals"] = json!([{ "name": "keep cool" }, { "name": "keep_cool" }]);
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "goals[1].name");
        assert_eq!(
            err.reason(),
            &Reason::AmbiguousName {
                name: "keep_cool".to_string(),
                earlier: "keep cool".to_string()
            }
        );

        let mut value = valid_model();
        value["systems"][0]["digitalTwins"][0]["ports"] = json!(["speed", " speed"]);
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "systems[0].digitalTwins[0].ports[1]");
    }

    #[test]
    fn test_accepts_separator_in_names() {
        let mut value = valid_model();
        value["systems"] = json!([
            { "name": "A", "digitalTwins": [{ "name": "B::X", "ports": [] }],
              "originalTwins": [], "connections": [] },
            { "name": "A::B", "digitalTwins": [{ "name": "X", "ports": [] }],
              "originalTwins": [], "connections": [] }
        ]);
        value["allocations"] = json!([]);
        assert_eq!(validate_model(&value), Ok(()));
    }

    #[test]
    fn test_repeated_names_are_left_to_the_builder() {
        let mut value = valid_model();
        value["systems"][0]["digitalTwins"][0]["ports"] = json!(["speed", "speed"]);
        assert_eq!(validate_model(&value), Ok(()));
    }

    #[test]
    fn test_rejects_non_object_document() {
        assert!(!is_model(&json!([1, 2, 3])));
        assert!(!is_model(&Value::Null));
    }

    #[test]
    fn test_validates_transformation_slices() {
        let mut value = valid_model();
        value["trans"]["after"] = json!({ "systems": "none" });
        let err = validate_model(&value).unwrap_err();
        assert_eq!(err.path(), "trans.after.systems");
    }

    #[test]
    fn test_model_json_roundtrip() {
        let mut model = DarTwinModel::new("Factory");
        let mut system = TwinSystem::new("Plant");
        system.digital_twins.push(DigitalTwin {
            name: "Controller".to_string(),
            ports: vec!["speed".to_string()],
        });
        system.connections.push(Connection {
            from: "Plant.Motor.speed".to_string(),
            to: "Controller.speed".to_string(),
            name: None,
        });
        model.systems.push(system);
        model.goals.push(Goal {
            name: "Safety".to_string(),
            doc: Some("Never overheat".to_string()),
        });

        let text = model_to_json(&model).unwrap();
        assert!(is_model(&serde_json::from_str(&text).unwrap()));
        assert_eq!(model_from_json(&text).unwrap(), model);
    }

    #[test]
    fn test_model_from_json_reports_malformed_text() {
        let err = model_from_json("{ not json").unwrap_err();
        assert!(matches!(err, InterchangeError::Json(_)));

        let err = model_from_json("{}").unwrap_err();
        assert!(matches!(err, InterchangeError::Invalid(_)));
    }

    fn valid_graph() -> Value {
        json!({
            "nodes": [
                { "id": "root", "type": "root", "label": "Factory" },
                { "id": "goal::Safety", "type": "goal", "label": "Safety", "parentId": "root", "doc": "x" },
                { "id": "system::Plant", "type": "system", "label": "Plant", "parentId": "root" },
                { "id": "dt::Plant::C", "type": "digitalTwin", "label": "C", "parentId": "system::Plant" }
            ],
            "edges": [
                { "id": "alloc::goal::Safety->dt::Plant::C", "type": "allocation",
                  "source": "goal::Safety", "target": "dt::Plant::C", "label": "allocate" }
            ]
        })
    }

    #[test]
    fn test_accepts_well_formed_graph() {
        assert_eq!(validate_graph(&valid_graph()), Ok(()));
        let graph = graph_from_json(&valid_graph().to_string()).unwrap();
        assert_eq!(graph.nodes().len(), 4);
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_rejects_dangling_edge() {
        let mut value = valid_graph();
        value["edges"][0]["target"] = json!("dt::Plant::Missing");
        let err = validate_graph(&value).unwrap_err();
        assert_eq!(err.path(), "edges[0].target");
        assert_eq!(
            err.reason(),
            &Reason::DanglingReference("dt::Plant::Missing".to_string())
        );
    }

    #[test]
    fn test_rejects_duplicate_node_id() {
        let mut value = valid_graph();
        value["nodes"][2]["id"] = json!("goal::Safety");
        let err = validate_graph(&value).unwrap_err();
        assert_eq!(err.path(), "nodes[2].id");
    }

    #[test]
    fn test_rejects_doc_on_non_goal() {
        let mut value = valid_graph();
        value["nodes"][2]["doc"] = json!("systems have no docs");
        let err = validate_graph(&value).unwrap_err();
        assert_eq!(err.path(), "nodes[2].doc");
    }

    #[test]
    fn test_rejects_self_parent() {
        let mut value = valid_graph();
        value["nodes"][2]["parentId"] = json!("system::Plant");
        let err = validate_graph(&value).unwrap_err();
        assert_eq!(err.path(), "nodes[2].parentId");
        assert_eq!(
            err.reason(),
            &Reason::ParentCycle("system::Plant".to_string())
        );
    }

    #[test]
    fn test_rejects_parent_cycle() {
        let mut value = valid_graph();
        value["nodes"][2]["parentId"] = json!("dt::Plant::C");
        let err = validate_graph(&value).unwrap_err();
        assert_eq!(err.path(), "nodes[2].parentId");
        assert!(graph_from_json(&value.to_string()).is_err());
    }

    #[test]
    fn test_rejects_unknown_node_type() {
        let mut value = valid_graph();
        value["nodes"][0]["type"] = json!("cloud");
        let err = validate_graph(&value).unwrap_err();
        assert_eq!(err.path(), "nodes[0].type");
    }
}
