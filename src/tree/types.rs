use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type NodeId = String;
pub type EdgeId = String;

/// Valuation approach a model node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Income,
    Market,
    Asset,
    Option,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Income,
        Category::Market,
        Category::Asset,
        Category::Option,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Income => "income",
            Category::Market => "market",
            Category::Asset => "asset",
            Category::Option => "option",
        }
    }

    /// Heading used when listing models by approach
    pub fn title(&self) -> &'static str {
        match self {
            Category::Income => "Income approach",
            Category::Market => "Market approach",
            Category::Asset => "Asset approach",
            Category::Option => "Option / hybrid",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload carried only by leaf (model) nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub category: Category,
    /// LaTeX source of the headline formula
    pub formula: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Question,
    Model(ModelInfo),
}

/// Top-left corner of a node box in diagram coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub selected: bool,
}

impl Node {
    pub fn start(id: &str, label: &str) -> Self {
        Self::with_kind(id, label, NodeKind::Start)
    }

    pub fn question(id: &str, label: &str) -> Self {
        Self::with_kind(id, label, NodeKind::Question)
    }

    pub fn model(
        id: &str,
        label: &str,
        category: Category,
        formula: &str,
        description: String,
    ) -> Self {
        Self::with_kind(
            id,
            label,
            NodeKind::Model(ModelInfo {
                category,
                formula: formula.to_string(),
                description,
            }),
        )
    }

    fn with_kind(id: &str, label: &str, kind: NodeKind) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            position: Position::default(),
            selected: false,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, NodeKind::Start)
    }

    pub fn is_question(&self) -> bool {
        matches!(self.kind, NodeKind::Question)
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        match &self.kind {
            NodeKind::Model(info) => Some(info),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<Category> {
        self.model_info().map(|info| info.category)
    }
}

/// Answer attached to an edge leaving a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Branch {
    Yes,
    No,
    #[default]
    #[serde(rename = "")]
    Unlabeled,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Yes => "Yes",
            Branch::No => "No",
            Branch::Unlabeled => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub label: Branch,
    /// Drawn with a moving dash and a heavier stroke
    #[serde(default)]
    pub animated: bool,
}

impl Edge {
    pub fn new(id: &str, source: &str, target: &str, label: Branch) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            label,
            animated: false,
        }
    }

    pub fn animated(mut self) -> Self {
        self.animated = true;
        self
    }
}

/// Direction of flow in the laid-out diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowDirection {
    #[default]
    #[serde(rename = "TB", alias = "TD")]
    TopDown,
    #[serde(rename = "BT")]
    BottomUp,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl FlowDirection {
    pub fn is_vertical(&self) -> bool {
        matches!(self, FlowDirection::TopDown | FlowDirection::BottomUp)
    }
}

impl FromStr for FlowDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TB" | "TD" => Ok(FlowDirection::TopDown),
            "BT" => Ok(FlowDirection::BottomUp),
            "LR" => Ok(FlowDirection::LeftRight),
            "RL" => Ok(FlowDirection::RightLeft),
            other => Err(format!(
                "unknown direction '{}' (expected TB, BT, LR or RL)",
                other
            )),
        }
    }
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowDirection::TopDown => "TB",
            FlowDirection::BottomUp => "BT",
            FlowDirection::LeftRight => "LR",
            FlowDirection::RightLeft => "RL",
        };
        f.write_str(s)
    }
}

/// A complete decision tree: nodes in declaration order plus directed edges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn start(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.is_start())
    }

    pub fn models(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.model_info().is_some())
    }

    pub fn questions(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_question())
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }
}
