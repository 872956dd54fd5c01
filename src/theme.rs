use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};

const SLATE_BACKGROUND: &str = "#f8fafc";
const SLATE_TEXT: &str = "#1e293b";
const SLATE_ACCENT: &str = "#6366f1";
const SLATE_EDGE: &str = "#b1b1b7";
const SLATE_PANEL_BG: &str = "#ffffff";
const SLATE_PANEL_BORDER: &str = "#d1d5db";
const SLATE_GRID: &str = "#aaaaaa";

/// Alacritty files shipped with the binary. `slate` is built from the
/// constants above, not from a file.
const BUILTIN_THEMES: &[(&str, &str)] = &[
    ("github_dark", include_str!("../themes/github_dark.toml")),
    ("github_light", include_str!("../themes/github_light.toml")),
    ("solarized_light", include_str!("../themes/solarized_light.toml")),
];

const FONT_SIZE_LABEL: f32 = 14.0;
const FONT_SIZE_EDGE_LABEL: f32 = 12.0;
const FONT_SIZE_TITLE: f32 = 18.0;
const FONT_SIZE_FORMULA: f32 = 20.0;
const FONT_SIZE_BODY: f32 = 14.0;
const LINE_HEIGHT: f32 = 1.45;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_text")]
    pub text_color: String,
    /// Selection outline and highlighted path
    #[serde(default = "default_accent")]
    pub accent_color: String,
    #[serde(default = "default_edge")]
    pub edge_color: String,
    #[serde(default = "default_panel_bg")]
    pub panel_bg_color: String,
    #[serde(default = "default_panel_border")]
    pub panel_border_color: String,
    #[serde(default = "default_grid")]
    pub grid_color: String,

    #[serde(default = "default_font_size_label")]
    pub font_size_label: f32,
    #[serde(default = "default_font_size_edge_label")]
    pub font_size_edge_label: f32,
    #[serde(default = "default_font_size_title")]
    pub font_size_title: f32,
    #[serde(default = "default_font_size_formula")]
    pub font_size_formula: f32,
    #[serde(default = "default_font_size_body")]
    pub font_size_body: f32,
    #[serde(default = "default_line_height")]
    pub line_height: f32,
}

fn default_background() -> String {
    SLATE_BACKGROUND.to_string()
}
fn default_text() -> String {
    SLATE_TEXT.to_string()
}
fn default_accent() -> String {
    SLATE_ACCENT.to_string()
}
fn default_edge() -> String {
    SLATE_EDGE.to_string()
}
fn default_panel_bg() -> String {
    SLATE_PANEL_BG.to_string()
}
fn default_panel_border() -> String {
    SLATE_PANEL_BORDER.to_string()
}
fn default_grid() -> String {
    SLATE_GRID.to_string()
}
fn default_font_size_label() -> f32 {
    FONT_SIZE_LABEL
}
fn default_font_size_edge_label() -> f32 {
    FONT_SIZE_EDGE_LABEL
}
fn default_font_size_title() -> f32 {
    FONT_SIZE_TITLE
}
fn default_font_size_formula() -> f32 {
    FONT_SIZE_FORMULA
}
fn default_font_size_body() -> f32 {
    FONT_SIZE_BODY
}
fn default_line_height() -> f32 {
    LINE_HEIGHT
}

impl Default for Theme {
    fn default() -> Self {
        Self::slate()
    }
}

#[derive(Debug, Deserialize)]
struct AlacrittyColors {
    primary: AlacrittyPrimary,
    normal: AlacrittyNormal,
}

#[derive(Debug, Deserialize)]
struct AlacrittyPrimary {
    background: String,
    foreground: String,
}

#[derive(Debug, Deserialize)]
struct AlacrittyNormal {
    black: String,
    blue: String,
    white: String,
}

#[derive(Debug, Deserialize)]
struct AlacrittyTheme {
    colors: AlacrittyColors,
}

impl Theme {
    /// The light slate look of the original web view
    pub fn slate() -> Self {
        Theme {
            background_color: SLATE_BACKGROUND.to_string(),
            text_color: SLATE_TEXT.to_string(),
            accent_color: SLATE_ACCENT.to_string(),
            edge_color: SLATE_EDGE.to_string(),
            panel_bg_color: SLATE_PANEL_BG.to_string(),
            panel_border_color: SLATE_PANEL_BORDER.to_string(),
            grid_color: SLATE_GRID.to_string(),

            font_size_label: FONT_SIZE_LABEL,
            font_size_edge_label: FONT_SIZE_EDGE_LABEL,
            font_size_title: FONT_SIZE_TITLE,
            font_size_formula: FONT_SIZE_FORMULA,
            font_size_body: FONT_SIZE_BODY,
            line_height: LINE_HEIGHT,
        }
    }

    pub fn from_builtin(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        if normalized == "slate" {
            return Ok(Self::slate());
        }
        let content = BUILTIN_THEMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                TreeError::Theme(format!(
                    "Unknown built-in theme '{}'. Available: {}",
                    name,
                    Self::list_builtins().join(", ")
                ))
            })?;
        Self::from_alacritty_toml(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        std::iter::once("slate")
            .chain(BUILTIN_THEMES.iter().map(|(n, _)| *n))
            .collect()
    }

    pub fn from_alacritty_yaml(content: &str) -> Result<Self> {
        let alacritty: AlacrittyTheme = serde_yaml::from_str(content)
            .map_err(|e| TreeError::Theme(format!("Failed to parse Alacritty YAML: {}", e)))?;
        Ok(Self::from_alacritty_theme(alacritty))
    }

    pub fn from_alacritty_toml(content: &str) -> Result<Self> {
        let alacritty: AlacrittyTheme = toml::from_str(content)
            .map_err(|e| TreeError::Theme(format!("Failed to parse Alacritty TOML: {}", e)))?;
        Ok(Self::from_alacritty_theme(alacritty))
    }

    /// Resolve `--theme`: an existing file (TOML first, then YAML) or the
    /// name of a built-in theme.
    pub fn load(spec: &str) -> Result<Self> {
        let path = std::path::Path::new(spec);
        if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            if let Ok(theme) = Self::from_alacritty_toml(&content) {
                return Ok(theme);
            }
            return Self::from_alacritty_yaml(&content).map_err(|_| {
                TreeError::Theme(format!(
                    "Failed to parse theme file {} as TOML or YAML",
                    path.display()
                ))
            });
        }
        Self::from_builtin(spec)
    }

    fn from_alacritty_theme(alacritty: AlacrittyTheme) -> Self {
        let colors = alacritty.colors;

        Theme {
            background_color: colors.primary.background,
            text_color: colors.primary.foreground,
            accent_color: colors.normal.blue,
            edge_color: colors.normal.white.clone(),
            panel_bg_color: colors.normal.black,
            panel_border_color: colors.normal.white.clone(),
            grid_color: colors.normal.white,

            font_size_label: FONT_SIZE_LABEL,
            font_size_edge_label: FONT_SIZE_EDGE_LABEL,
            font_size_title: FONT_SIZE_TITLE,
            font_size_formula: FONT_SIZE_FORMULA,
            font_size_body: FONT_SIZE_BODY,
            line_height: LINE_HEIGHT,
        }
    }
}
