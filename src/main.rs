use std::io;
use std::path::PathBuf;

use clap::{ArgAction, Args, Command, CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use valuation_tree::config::RenderConfig;
use valuation_tree::export::{export_json, write_image};
use valuation_tree::fonts::CosmicTextMeasure;
use valuation_tree::render::{render_panel_only, render_view};
use valuation_tree::theme::Theme;
use valuation_tree::tree::{Category, DecisionTree, FlowDirection, ancestors, path_to};
use valuation_tree::view::{ClickOutcome, DetailPanel, DiagramView};
use valuation_tree::{Result, TreeError};

/// Pick a business valuation method by walking a decision tree
#[derive(Parser, Debug)]
#[command(name = "valuation-tree")]
#[command(version)]
#[command(about = "Render the valuation-method decision tree to SVG, PNG or PDF", long_about = None)]
struct Cli {
    /// Turn debugging information on (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    debug: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that draws something
#[derive(Args, Debug, Default)]
struct StyleArgs {
    /// Built-in theme name or Alacritty theme file (TOML or YAML)
    #[arg(short, long, value_name = "THEME")]
    theme: Option<String>,

    /// Render settings file (TOML or YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Flow direction: TB, BT, LR or RL
    #[arg(long, value_name = "DIR")]
    direction: Option<FlowDirection>,

    /// Margin around the image in pixels
    #[arg(long)]
    padding: Option<f32>,

    /// Raster scale multiplier for PNG output (e.g. 2.0 for sharper output)
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the diagram, with the detail panel when a model is selected
    Render {
        /// Output file path (extension determines format: .svg, .png or .pdf)
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Model node to select
        #[arg(long, value_name = "ID")]
        select: Option<String>,

        /// Outline the path from the start node to the selection
        #[arg(long, requires = "select")]
        highlight_path: bool,

        /// Draw a minimap under the diagram
        #[arg(long)]
        minimap: bool,

        #[command(flatten)]
        style: StyleArgs,
    },
    /// Show the formula and notes of one model
    Inspect {
        /// Model node id
        id: String,

        /// Render the panel to this file instead of printing it
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,
    },
    /// Questions and answers leading to a node
    Path {
        /// Node id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List questions and models
    List,
    /// Write the laid-out tree as JSON
    ExportJson {
        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Flow direction: TB, BT, LR or RL
        #[arg(long, value_name = "DIR")]
        direction: Option<FlowDirection>,
    },
    /// Generate shell completions
    Completions {
        /// Shell type
        shell: Shell,
    },
}

fn print_completions<G: Generator>(generator: G, cmd: &mut Command) {
    generate(generator, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

fn main() {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return;
    }

    setup_logging(cli.debug);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    debug!(?level, "logging initialised");
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Render {
            output,
            select,
            highlight_path,
            minimap,
            style,
        } => {
            let mut config = load_config(&style)?;
            config.minimap |= minimap;
            let theme = load_theme(&style)?;
            let mut view = build_view(&config)?;
            if let Some(id) = select.as_deref() {
                select_model(&mut view, id)?;
            }

            let mut measure = CosmicTextMeasure::new();
            let rendered = render_view(&view, &theme, &config, highlight_path, &mut measure);
            write_image(&output, &rendered.svg, style.png_scale)?;
            eprintln!("Saved to: {}", output.display());
        }
        Commands::Inspect { id, output, style } => {
            let config = load_config(&style)?;
            let mut view = build_view(&config)?;
            let panel = select_model(&mut view, &id)?;
            match output {
                Some(path) => {
                    let theme = load_theme(&style)?;
                    let mut measure = CosmicTextMeasure::new();
                    let rendered = render_panel_only(&panel, &theme, &config, &mut measure);
                    write_image(&path, &rendered.svg, style.png_scale)?;
                    eprintln!("Saved to: {}", path.display());
                }
                None => print_panel(&panel),
            }
        }
        Commands::Path { id, json } => {
            let tree = DecisionTree::builtin()?;
            print_path(&tree, &id, json)?;
        }
        Commands::List => {
            let tree = DecisionTree::builtin()?;
            print_list(&tree);
        }
        Commands::ExportJson { output, direction } => {
            let config = RenderConfig {
                direction: direction.unwrap_or_default(),
                ..RenderConfig::default()
            };
            let view = build_view(&config)?;
            let json = export_json(&view)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("Saved to: {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

/// Settings file first, then command-line overrides.
fn load_config(style: &StyleArgs) -> Result<RenderConfig> {
    let mut config = match style.config.as_deref() {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if let Some(direction) = style.direction {
        config.direction = direction;
    }
    if let Some(padding) = style.padding {
        config.padding = padding;
    }
    config.check()?;
    Ok(config)
}

fn load_theme(style: &StyleArgs) -> Result<Theme> {
    match style.theme.as_deref() {
        Some(spec) => Theme::load(spec),
        None => Ok(Theme::default()),
    }
}

fn build_view(config: &RenderConfig) -> Result<DiagramView> {
    let tree = DecisionTree::builtin()?;
    DiagramView::new(tree, config.direction, &config.layout())
}

/// Select `id` like a click would, but refuse ids that are not models
/// instead of silently clearing.
fn select_model(view: &mut DiagramView, id: &str) -> Result<DetailPanel> {
    let node = view
        .tree()
        .node(id)
        .ok_or_else(|| TreeError::UnknownNode(id.to_string()))?;
    if node.model_info().is_none() {
        return Err(TreeError::NotAModel(id.to_string()));
    }
    match view.click(Some(id)) {
        ClickOutcome::Selected(panel) => {
            info!(node = %id, "selected");
            Ok(panel)
        }
        ClickOutcome::Cleared => Err(TreeError::NotAModel(id.to_string())),
    }
}

fn print_panel(panel: &DetailPanel) {
    println!("{} [{}]", panel.label, panel.category);
    println!();
    println!("  {}", panel.formula);
    println!();
    println!("{}", panel.description);
}

#[derive(Serialize)]
struct PathReport<'a> {
    target: &'a str,
    nodes: Vec<String>,
    edges: Vec<String>,
}

fn print_path(tree: &DecisionTree, id: &str, json: bool) -> Result<()> {
    if tree.node(id).is_none() {
        return Err(TreeError::UnknownNode(id.to_string()));
    }
    let nodes = path_to(id, &tree.nodes, &tree.edges);
    let connected = ancestors(id, &tree.nodes, &tree.edges);
    // Declaration order keeps the output stable
    let edges: Vec<String> = tree
        .edges
        .iter()
        .filter(|e| connected.contains_edge(&e.id))
        .map(|e| e.id.clone())
        .collect();

    if json {
        let report = PathReport {
            target: id,
            nodes,
            edges,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (step, node_id) in nodes.iter().enumerate() {
        let Some(node) = tree.node(node_id) else {
            continue;
        };
        let answer = nodes
            .get(step + 1)
            .and_then(|next| tree.outgoing(node_id).find(|e| &e.target == next))
            .map(|e| e.label.as_str())
            .filter(|label| !label.is_empty());
        let label = node.label.replace('\n', " ");
        match answer {
            Some(answer) => println!("{:>2}. {} -> {}", step + 1, label, answer),
            None => println!("{:>2}. {}", step + 1, label),
        }
    }
    println!("edges: {}", edges.join(", "));
    Ok(())
}

fn print_list(tree: &DecisionTree) {
    println!("Questions");
    for node in tree.questions() {
        println!("  {:<12} {}", node.id, node.label.replace('\n', " "));
    }
    for category in Category::ALL {
        println!();
        println!("{}", category.title());
        for node in tree.models().filter(|n| n.category() == Some(category)) {
            println!("  {:<12} {}", node.id, node.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_flags_parse() {
        let cli = Cli::try_parse_from([
            "valuation-tree",
            "-dd",
            "render",
            "-o",
            "out.png",
            "--select",
            "dcf",
            "--highlight-path",
            "--direction",
            "LR",
        ])
        .expect("parses");
        assert_eq!(cli.debug, 2);
        let Commands::Render { select, style, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(select.as_deref(), Some("dcf"));
        assert_eq!(style.direction, Some(FlowDirection::LeftRight));
    }

    #[test]
    fn highlight_requires_selection() {
        assert!(
            Cli::try_parse_from(["valuation-tree", "render", "-o", "x.svg", "--highlight-path"])
                .is_err()
        );
    }

    #[test]
    fn select_model_rejects_questions_and_unknown_ids() {
        let mut view = build_view(&RenderConfig::default()).expect("view");
        assert!(matches!(
            select_model(&mut view, "q1"),
            Err(TreeError::NotAModel(_))
        ));
        assert!(matches!(
            select_model(&mut view, "nope"),
            Err(TreeError::UnknownNode(_))
        ));
        let panel = select_model(&mut view, "option").expect("model");
        assert_eq!(panel.category, Category::Option);
    }

    #[test]
    fn flags_override_config_file_values() {
        let style = StyleArgs {
            direction: Some(FlowDirection::RightLeft),
            padding: Some(5.0),
            ..StyleArgs::default()
        };
        let config = load_config(&style).expect("config");
        assert_eq!(config.direction, FlowDirection::RightLeft);
        assert_eq!(config.padding, 5.0);
    }
}
