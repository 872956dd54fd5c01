use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ConfigError, Result, TreeError};
use crate::layout::{Layout, LayoutConfig, layout};
use crate::tree::{
    Branch, Category, Connected, DecisionTree, Edge, EdgeId, FlowDirection, NodeId, ancestors,
};

/// What the detail panel shows for a selected model node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailPanel {
    pub node_id: NodeId,
    pub category: Category,
    pub label: String,
    pub formula: String,
    pub description: String,
}

/// Effect of a click on the view
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// A model node was clicked and is now the only selected node
    Selected(DetailPanel),
    /// Selection cleared and the panel hidden
    Cleared,
}

/// One rendered diagram: owns its tree state, the layout computed for it,
/// and the current selection.
#[derive(Debug, Clone)]
pub struct DiagramView {
    tree: DecisionTree,
    layout: Layout,
    panel: Option<DetailPanel>,
}

impl DiagramView {
    /// Lay out `tree` and wrap it in a view with nothing selected.
    pub fn new(
        mut tree: DecisionTree,
        direction: FlowDirection,
        config: &LayoutConfig,
    ) -> Result<Self> {
        let layout = layout(&mut tree.nodes, &tree.edges, direction, config)?;
        Ok(Self {
            tree,
            layout,
            panel: None,
        })
    }

    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn detail_panel(&self) -> Option<&DetailPanel> {
        self.panel.as_ref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.tree
            .nodes
            .iter()
            .find(|n| n.selected)
            .map(|n| n.id.as_str())
    }

    /// Handle a click on `node_id`, or on empty canvas when `None`.
    ///
    /// Model nodes become the sole selection and open the detail panel.
    /// Anything else (question, start, unknown id, canvas) clears the
    /// selection and hides the panel.
    pub fn click(&mut self, node_id: Option<&str>) -> ClickOutcome {
        let panel = node_id
            .and_then(|id| self.tree.node(id))
            .and_then(|node| {
                node.model_info().map(|info| DetailPanel {
                    node_id: node.id.clone(),
                    category: info.category,
                    label: node.label.clone(),
                    formula: info.formula.clone(),
                    description: info.description.clone(),
                })
            });

        let chosen = panel.as_ref().map(|p| p.node_id.as_str());
        for node in &mut self.tree.nodes {
            node.selected = Some(node.id.as_str()) == chosen;
        }

        match panel {
            Some(panel) => {
                debug!(node = %panel.node_id, "model selected");
                self.panel = Some(panel.clone());
                ClickOutcome::Selected(panel)
            }
            None => {
                debug!(clicked = ?node_id, "selection cleared");
                self.panel = None;
                ClickOutcome::Cleared
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.click(None);
    }

    /// Ancestors of the selected node; empty when nothing is selected.
    pub fn ancestors_of_selection(&self) -> Connected {
        match self.selected() {
            Some(id) => ancestors(id, &self.tree.nodes, &self.tree.edges),
            None => Connected::default(),
        }
    }

    /// Add an unlabeled edge between two existing nodes, as a drag-to-connect
    /// gesture would. Node positions are left as they are.
    pub fn connect(&mut self, source: &str, target: &str) -> Result<EdgeId> {
        for endpoint in [source, target] {
            if self.tree.node(endpoint).is_none() {
                return Err(TreeError::UnknownNode(endpoint.to_string()));
            }
        }
        if self
            .tree
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
        {
            return Err(ConfigError::DuplicateConnection {
                from: source.to_string(),
                to: target.to_string(),
            }
            .into());
        }

        let mut id = format!("edge-{}-{}", source, target);
        let mut suffix = 1;
        while self.tree.edge(&id).is_some() {
            suffix += 1;
            id = format!("edge-{}-{}-{}", source, target, suffix);
        }
        self.tree
            .edges
            .push(Edge::new(&id, source, target, Branch::Unlabeled));
        info!(edge = %id, "connection added");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> DiagramView {
        DiagramView::new(
            DecisionTree::builtin().expect("builtin"),
            FlowDirection::TopDown,
            &LayoutConfig::default(),
        )
        .expect("view")
    }

    #[test]
    fn clicking_model_selects_only_it() {
        let mut v = view();
        let outcome = v.click(Some("dcf"));
        let ClickOutcome::Selected(panel) = outcome else {
            panic!("expected a panel");
        };
        assert_eq!(panel.category, Category::Income);
        assert_eq!(panel.label, "Discounted Cash‑Flow");
        assert!(panel.formula.contains("CF_t"));
        assert_eq!(v.selected(), Some("dcf"));
        assert_eq!(v.tree().nodes.iter().filter(|n| n.selected).count(), 1);
    }

    #[test]
    fn second_model_click_moves_selection() {
        let mut v = view();
        v.click(Some("dcf"));
        v.click(Some("market"));
        assert_eq!(v.selected(), Some("market"));
        assert_eq!(v.detail_panel().map(|p| p.category), Some(Category::Market));
        assert_eq!(v.tree().nodes.iter().filter(|n| n.selected).count(), 1);
    }

    #[test]
    fn clicking_question_or_canvas_clears() {
        let mut v = view();
        v.click(Some("lbo"));
        assert_eq!(v.click(Some("q3")), ClickOutcome::Cleared);
        assert!(v.detail_panel().is_none());
        assert!(v.selected().is_none());

        v.click(Some("lbo"));
        assert_eq!(v.click(None), ClickOutcome::Cleared);
        assert!(v.tree().nodes.iter().all(|n| !n.selected));

        v.click(Some("lbo"));
        assert_eq!(v.click(Some("does-not-exist")), ClickOutcome::Cleared);
    }

    #[test]
    fn ancestors_follow_selection() {
        let mut v = view();
        assert!(v.ancestors_of_selection().is_empty());
        v.click(Some("ccf"));
        let found = v.ancestors_of_selection();
        assert!(found.contains_node("start"));
        assert!(found.contains_edge("e4"));
        assert!(!found.contains_node("q2"));
    }

    #[test]
    fn connect_adds_unlabeled_edge() {
        let mut v = view();
        let id = v.connect("q6", "market").expect("connect");
        let edge = v.tree().edge(&id).expect("edge present");
        assert_eq!(edge.label, Branch::Unlabeled);
        assert!(matches!(
            v.connect("q6", "market"),
            Err(TreeError::Config(ConfigError::DuplicateConnection { .. }))
        ));
        assert!(matches!(
            v.connect("q6", "nowhere"),
            Err(TreeError::UnknownNode(_))
        ));
    }
}
