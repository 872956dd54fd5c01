use thiserror::Error;

/// Problems with the static tree definition. Content is compiled in and
/// trusted, so any of these is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),

    #[error("duplicate edge id: {0}")]
    DuplicateEdgeId(String),

    #[error("edge {edge} references unknown node {endpoint}")]
    DanglingEdge { edge: String, endpoint: String },

    #[error("tree has no start node")]
    MissingStart,

    #[error("tree has more than one start node: {0:?}")]
    MultipleStarts(Vec<String>),

    #[error("cycle detected through node {node}")]
    Cycle { node: String },

    #[error("node {node} is not reachable from the start node")]
    Unreachable { node: String },

    #[error("nodes {from} and {to} are already connected")]
    DuplicateConnection { from: String, to: String },
}

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("invalid tree definition: {0}")]
    Config(#[from] ConfigError),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("node {0} is not a valuation model")]
    NotAModel(String),

    #[error("LaTeX error: {0}")]
    Math(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("theme error: {0}")]
    Theme(String),

    #[error("configuration file error: {0}")]
    Settings(String),

    #[error("unsupported output format: .{0} (use .svg, .png, .pdf or .json)")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TreeError>;
