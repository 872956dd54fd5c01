use std::path::Path;

use resvg::usvg;
use serde::Serialize;
use tiny_skia::{Pixmap, Transform};
use tracing::{debug, info};

use crate::error::{Result, TreeError};
use crate::layout::{BBox, Layout};
use crate::tree::{Edge, FlowDirection, Node, NodeId};
use crate::view::DiagramView;

/// Output file kind, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Pdf,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            _ => Err(TreeError::UnsupportedFormat(ext)),
        }
    }
}

/// Write a rendered SVG document to `path` in the format its extension
/// names. JSON is not an image format and is refused here.
pub fn write_image(path: &Path, svg: &str, png_scale: f32) -> Result<()> {
    let bytes = match OutputFormat::from_path(path)? {
        OutputFormat::Svg => svg.as_bytes().to_vec(),
        OutputFormat::Png => svg_to_png(svg, png_scale)?,
        OutputFormat::Pdf => svg_to_pdf(svg)?,
        OutputFormat::Json => return Err(TreeError::UnsupportedFormat("json".to_string())),
    };
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), "image written");
    Ok(())
}

/// Family names picked as generic `sans-serif`/`serif`/`monospace` fallbacks
#[derive(Debug, Default, PartialEq)]
struct FallbackFamilies {
    sans: Option<String>,
    serif: Option<String>,
    mono: Option<String>,
}

fn pick_fallbacks<'a>(families: impl IntoIterator<Item = &'a str>) -> FallbackFamilies {
    let mut sans: Option<&str> = None;
    let mut serif: Option<&str> = None;
    let mut mono: Option<&str> = None;
    let mut first: Option<&str> = None;

    for family in families {
        first.get_or_insert(family);
        let lower = family.to_ascii_lowercase();
        if sans.is_none() && lower.contains("sans") {
            sans = Some(family);
        }
        if serif.is_none() && lower.contains("serif") {
            serif = Some(family);
        }
        if mono.is_none() && (lower.contains("mono") || lower.contains("code")) {
            mono = Some(family);
        }
    }

    FallbackFamilies {
        sans: sans.or(first).map(str::to_string),
        serif: serif.or(first).map(str::to_string),
        mono: mono.or(sans).or(first).map(str::to_string),
    }
}

fn load_fonts_dir_if_present(load: impl FnOnce(&Path)) {
    let local_fonts = Path::new("fonts");
    if local_fonts.is_dir() {
        load(local_fonts);
    }
}

pub fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(TreeError::Render(format!("Invalid --png-scale value: {}", scale)));
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();
        load_fonts_dir_if_present(|dir| fontdb.load_fonts_dir(dir));

        let fallbacks = pick_fallbacks(
            fontdb
                .faces()
                .flat_map(|face| face.families.iter().map(|(f, _)| f.as_str())),
        );
        if let Some(family) = fallbacks.sans.as_deref() {
            fontdb.set_sans_serif_family(family);
        }
        if let Some(family) = fallbacks.serif.as_deref() {
            fontdb.set_serif_family(family);
        }
        if let Some(family) = fallbacks.mono.as_deref() {
            fontdb.set_monospace_family(family);
        }
    }

    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| TreeError::Render(format!("Failed to parse SVG: {}", e)))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| TreeError::Render(format!("Failed to create {}x{} pixmap", width, height)))?;

    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    debug!(width, height, "rasterised");

    pixmap
        .encode_png()
        .map_err(|e| TreeError::Render(format!("Failed to encode PNG: {}", e)))
}

pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>> {
    use svg2pdf::usvg::fontdb;

    let mut fontdb = fontdb::Database::new();
    fontdb.load_system_fonts();
    load_fonts_dir_if_present(|dir| fontdb.load_fonts_dir(dir));

    let fallbacks = pick_fallbacks(
        fontdb
            .faces()
            .flat_map(|face| face.families.iter().map(|(f, _)| f.as_str())),
    );
    if let Some(family) = fallbacks.sans.as_deref() {
        fontdb.set_sans_serif_family(family);
    }
    if let Some(family) = fallbacks.serif.as_deref() {
        fontdb.set_serif_family(family);
    }
    if let Some(family) = fallbacks.mono.as_deref() {
        fontdb.set_monospace_family(family);
    }

    let mut opts = svg2pdf::usvg::Options::default();
    opts.fontdb = std::sync::Arc::new(fontdb);

    let tree = svg2pdf::usvg::Tree::from_str(svg, &opts)
        .map_err(|e| TreeError::Render(format!("Failed to parse SVG: {}", e)))?;

    // Text as paths, so the PDF never depends on embedded fonts
    let mut options = svg2pdf::ConversionOptions::default();
    options.embed_text = false;

    svg2pdf::to_pdf(&tree, options, svg2pdf::PageOptions::default())
        .map_err(|e| TreeError::Render(format!("Failed to convert SVG to PDF: {}", e)))
}

/// Laid-out tree as written by `export-json`
#[derive(Debug, Serialize)]
pub struct TreeExport<'a> {
    pub direction: FlowDirection,
    pub bounds: BBox,
    pub nodes: Vec<NodeExport<'a>>,
    pub edges: Vec<EdgeExport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct NodeExport<'a> {
    #[serde(flatten)]
    pub node: &'a Node,
    pub rank: Option<usize>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeExport<'a> {
    #[serde(flatten)]
    pub edge: &'a Edge,
    #[serde(skip_serializing_if = "is_straight")]
    pub waypoints: &'a [(f32, f32)],
}

fn is_straight(waypoints: &&[(f32, f32)]) -> bool {
    waypoints.is_empty()
}

impl<'a> TreeExport<'a> {
    pub fn new(view: &'a DiagramView) -> Self {
        let layout: &'a Layout = view.layout();
        let rank = |id: &NodeId| layout.ranks.get(id).copied();
        Self {
            direction: layout.direction,
            bounds: layout.bounds,
            nodes: view
                .tree()
                .nodes
                .iter()
                .map(|node| NodeExport {
                    node,
                    rank: rank(&node.id),
                    width: layout.node_width,
                    height: layout.node_height,
                })
                .collect(),
            edges: view
                .tree()
                .edges
                .iter()
                .map(|edge| EdgeExport {
                    edge,
                    waypoints: layout
                        .waypoints
                        .get(&edge.id)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]),
                })
                .collect(),
        }
    }
}

pub fn export_json(view: &DiagramView) -> Result<String> {
    Ok(serde_json::to_string_pretty(&TreeExport::new(view))?)
}
