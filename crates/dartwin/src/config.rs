//! Configuration types for DarTwin graph layout.
//!
//! This module provides configuration structures that control how graphs are
//! laid out and how ports are classified. All types implement
//! [`serde::Deserialize`] and fall back to defaults for every missing field,
//! so a configuration file only needs to list what it changes.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level application configuration combining layout and port settings.
//! - [`LayoutConfig`] - Sizes and spacings of the template layout.
//! - [`PortConfig`] - Name patterns that decide a port's role.
//!
//! # Example
//!
//! ```
//! # use dartwin::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.ports().sensor_patterns(), ["sensor", "input"]);
//! ```

use serde::Deserialize;

use dartwin_core::geometry::Size;

use crate::DartwinError;

/// Top-level application configuration combining layout and port settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout configuration section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Port classification section.
    #[serde(default)]
    ports: PortConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the specified layout and port configurations.
    pub fn new(layout: LayoutConfig, ports: PortConfig) -> Self {
        Self { layout, ports }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the port classification configuration.
    pub fn ports(&self) -> &PortConfig {
        &self.ports
    }

    /// Checks that every size is usable by the layout engine.
    ///
    /// # Errors
    ///
    /// Returns [`DartwinError::Config`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), DartwinError> {
        self.layout.validate()
    }
}

/// Sizes and spacings used by the template layout, in canvas units.
///
/// Every node box is described by its top-left corner and its size.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Space left around the whole drawing.
    pub padding: f32,
    pub goal_width: f32,
    pub goal_height: f32,
    /// Horizontal distance between the left edges of neighbouring goals.
    pub goal_pitch: f32,
    /// Vertical gap between the goal row and the system row.
    pub row_gap: f32,
    pub system_width: f32,
    pub system_height: f32,
    /// Horizontal gap between neighbouring systems.
    pub system_spacing: f32,
    pub twin_width: f32,
    pub twin_height: f32,
    /// Horizontal gap between digital twins of one system.
    pub twin_spacing: f32,
    /// Minimum distance between a digital twin and its system's boundary.
    pub twin_margin: f32,
    /// Side length of a port square.
    pub port_size: f32,
    /// Grid pitch for nodes that no placement rule covers.
    pub fallback_cell_width: f32,
    pub fallback_cell_height: f32,
    pub fallback_node_width: f32,
    pub fallback_node_height: f32,
    pub fallback_columns: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 40.0,
            goal_width: 160.0,
            goal_height: 60.0,
            goal_pitch: 200.0,
            row_gap: 80.0,
            system_width: 640.0,
            system_height: 360.0,
            system_spacing: 80.0,
            twin_width: 200.0,
            twin_height: 120.0,
            twin_spacing: 40.0,
            twin_margin: 60.0,
            port_size: 16.0,
            fallback_cell_width: 140.0,
            fallback_cell_height: 90.0,
            fallback_node_width: 120.0,
            fallback_node_height: 60.0,
            fallback_columns: 4,
        }
    }
}

impl LayoutConfig {
    pub fn goal_size(&self) -> Size {
        Size::new(self.goal_width, self.goal_height)
    }

    pub fn system_size(&self) -> Size {
        Size::new(self.system_width, self.system_height)
    }

    pub fn twin_size(&self) -> Size {
        Size::new(self.twin_width, self.twin_height)
    }

    pub fn port_size(&self) -> Size {
        Size::square(self.port_size)
    }

    pub fn fallback_node_size(&self) -> Size {
        Size::new(self.fallback_node_width, self.fallback_node_height)
    }

    fn validate(&self) -> Result<(), DartwinError> {
        let lengths = [
            ("padding", self.padding),
            ("goal_width", self.goal_width),
            ("goal_height", self.goal_height),
            ("goal_pitch", self.goal_pitch),
            ("row_gap", self.row_gap),
            ("system_width", self.system_width),
            ("system_height", self.system_height),
            ("system_spacing", self.system_spacing),
            ("twin_width", self.twin_width),
            ("twin_height", self.twin_height),
            ("twin_spacing", self.twin_spacing),
            ("twin_margin", self.twin_margin),
            ("port_size", self.port_size),
            ("fallback_cell_width", self.fallback_cell_width),
            ("fallback_cell_height", self.fallback_cell_height),
            ("fallback_node_width", self.fallback_node_width),
            ("fallback_node_height", self.fallback_node_height),
        ];
        if let Some((name, value)) = lengths
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(DartwinError::Config(format!(
                "layout.{name} must be a finite, non-negative number, got {value}"
            )));
        }
        if self.fallback_columns == 0 {
            return Err(DartwinError::Config(
                "layout.fallback_columns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Name patterns deciding whether a port is sensor-like or actuator-like.
///
/// Patterns are matched case-insensitively as substrings of the port name.
/// Sensor patterns are checked first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    sensor_patterns: Vec<String>,
    actuator_patterns: Vec<String>,
    /// Known actuator names, placed first and in this order.
    actuator_order: Vec<String>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            sensor_patterns: vec!["sensor".to_string(), "input".to_string()],
            actuator_patterns: vec!["actuator".to_string(), "output".to_string()],
            actuator_order: Vec::new(),
        }
    }
}

impl PortConfig {
    /// Creates a new [`PortConfig`].
    ///
    /// # Arguments
    ///
    /// * `sensor_patterns` - Substrings marking a port as sensor-like.
    /// * `actuator_patterns` - Substrings marking a port as actuator-like.
    /// * `actuator_order` - Canonical order for known actuator port names.
    pub fn new(
        sensor_patterns: Vec<String>,
        actuator_patterns: Vec<String>,
        actuator_order: Vec<String>,
    ) -> Self {
        Self {
            sensor_patterns,
            actuator_patterns,
            actuator_order,
        }
    }

    pub fn sensor_patterns(&self) -> &[String] {
        &self.sensor_patterns
    }

    pub fn actuator_patterns(&self) -> &[String] {
        &self.actuator_patterns
    }

    pub fn actuator_order(&self) -> &[String] {
        &self.actuator_order
    }
}
