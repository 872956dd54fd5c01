use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TreeError};
use crate::layout::LayoutConfig;
use crate::tree::FlowDirection;

const PADDING: f32 = 20.0;
const PANEL_WIDTH: f32 = 448.0;
const PANEL_GAP: f32 = 16.0;

/// Rendering options, loadable from a TOML or YAML file. Every field falls
/// back to the built-in look when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub node_width: f32,
    pub node_height: f32,
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub direction: FlowDirection,
    /// Margin around the whole image
    pub padding: f32,
    /// Width of the detail panel (28rem)
    pub panel_width: f32,
    /// Gap between diagram and detail panel
    pub panel_gap: f32,
    /// Node label size; the theme's label size applies when unset
    pub font_size: Option<f32>,
    pub minimap: bool,
    pub background_grid: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let layout = LayoutConfig::default();
        Self {
            node_width: layout.node_width,
            node_height: layout.node_height,
            node_spacing: layout.node_spacing,
            rank_spacing: layout.rank_spacing,
            direction: FlowDirection::TopDown,
            padding: PADDING,
            panel_width: PANEL_WIDTH,
            panel_gap: PANEL_GAP,
            font_size: None,
            minimap: false,
            background_grid: true,
        }
    }
}

impl RenderConfig {
    pub fn layout(&self) -> LayoutConfig {
        LayoutConfig {
            node_width: self.node_width,
            node_height: self.node_height,
            node_spacing: self.node_spacing,
            rank_spacing: self.rank_spacing,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TreeError::Settings(e.to_string()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| TreeError::Settings(e.to_string()))
    }

    /// Load from a file; `.yaml`/`.yml` are read as YAML, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TreeError::Settings(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let config = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_toml(&content)?
        };
        config.check()?;
        debug!(path = %path.display(), ?config, "loaded render config");
        Ok(config)
    }

    /// Reject sizes the layout cannot work with.
    pub fn check(&self) -> Result<()> {
        let sizes = [
            ("node_width", self.node_width),
            ("node_height", self.node_height),
            ("panel_width", self.panel_width),
        ];
        for (name, value) in sizes {
            if !value.is_finite() || value <= 0.0 {
                return Err(TreeError::Settings(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        let gaps = [
            ("node_spacing", self.node_spacing),
            ("rank_spacing", self.rank_spacing),
            ("padding", self.padding),
            ("panel_gap", self.panel_gap),
        ];
        for (name, value) in gaps {
            if !value.is_finite() || value < 0.0 {
                return Err(TreeError::Settings(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        if let Some(size) = self.font_size
            && (!size.is_finite() || size <= 0.0)
        {
            return Err(TreeError::Settings(format!(
                "font_size must be a positive number, got {}",
                size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_box_size() {
        let config = RenderConfig::default();
        assert_eq!(config.node_width, 220.0);
        assert_eq!(config.node_height, 90.0);
        assert_eq!(config.direction, FlowDirection::TopDown);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RenderConfig::from_toml("direction = \"LR\"\nminimap = true\n")
            .expect("toml");
        assert_eq!(config.direction, FlowDirection::LeftRight);
        assert!(config.minimap);
        assert_eq!(config.panel_width, PANEL_WIDTH);
    }

    #[test]
    fn yaml_is_accepted() {
        let config = RenderConfig::from_yaml("node_width: 180\nbackground_grid: false\n")
            .expect("yaml");
        assert_eq!(config.node_width, 180.0);
        assert!(!config.background_grid);
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        let config = RenderConfig {
            node_height: 0.0,
            ..RenderConfig::default()
        };
        assert!(config.check().is_err());
    }
}
