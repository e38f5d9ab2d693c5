//! Port role classification and ordering.

use std::cmp::Ordering;

use serde::Serialize;

use crate::config::PortConfig;

/// The role of a port, deciding the side of its owner it is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PortRole {
    /// Left side.
    Sensor,
    /// Right side.
    Actuator,
    /// Bottom side.
    Unclassified,
}

impl PortRole {
    pub const ALL: [PortRole; 3] = [PortRole::Sensor, PortRole::Actuator, PortRole::Unclassified];
}

/// Classifies and orders ports according to a [`PortConfig`].
#[derive(Debug, Clone)]
pub struct PortClassifier {
    sensor_patterns: Vec<String>,
    actuator_patterns: Vec<String>,
    actuator_order: Vec<String>,
}

impl PortClassifier {
    pub fn new(config: &PortConfig) -> Self {
        let lowercase = |patterns: &[String]| -> Vec<String> {
            patterns
                .iter()
                .map(|pattern| pattern.to_lowercase())
                .filter(|pattern| !pattern.is_empty())
                .collect()
        };
        Self {
            sensor_patterns: lowercase(config.sensor_patterns()),
            actuator_patterns: lowercase(config.actuator_patterns()),
            actuator_order: config.actuator_order().to_vec(),
        }
    }

    /// Returns the role of a port called `name`. Sensor patterns win over
    /// actuator patterns.
    ///
    /// ```
    /// # use dartwin::{config::PortConfig, layout::{PortClassifier, PortRole}};
    /// let classifier = PortClassifier::new(&PortConfig::default());
    /// assert_eq!(classifier.classify("sensor_input"), PortRole::Sensor);
    /// assert_eq!(classifier.classify("Actuator_Output_X"), PortRole::Actuator);
    /// assert_eq!(classifier.classify("power"), PortRole::Unclassified);
    /// ```
    pub fn classify(&self, name: &str) -> PortRole {
        let name = name.to_lowercase();
        let matches = |patterns: &[String]| patterns.iter().any(|p| name.contains(p.as_str()));

        if matches(&self.sensor_patterns) {
            PortRole::Sensor
        } else if matches(&self.actuator_patterns) {
            PortRole::Actuator
        } else {
            PortRole::Unclassified
        }
    }

    /// Orders two ports of the same role.
    ///
    /// Actuators listed in the canonical order come first, in list order.
    /// Everything else is ordered by label, then by id.
    pub fn compare(&self, role: PortRole, a: (&str, &str), b: (&str, &str)) -> Ordering {
        let rank = |label: &str| -> Option<usize> {
            if role != PortRole::Actuator {
                return None;
            }
            self.actuator_order.iter().position(|known| known == label)
        };

        let (label_a, id_a) = a;
        let (label_b, id_b) = b;
        match (rank(label_a), rank(label_b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => label_a.cmp(label_b).then_with(|| id_a.cmp(id_b)),
        }
    }
}
