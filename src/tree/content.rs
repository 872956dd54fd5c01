//! Built-in valuation decision tree: the questions, the valuation models
//! reached through them, and the yes/no edges wiring them together.

use super::types::{Branch, Category, DecisionTree, Edge, Node};

fn bullet(text: &str) -> String {
    format!("• {}", text)
}

/// Assemble a model description: variable glossary, usage notes, caveats.
fn describe(terms: &[&str], usage: &[&str], caveats: &[&str]) -> String {
    let mut parts: Vec<String> = terms.iter().map(|t| bullet(t)).collect();
    parts.push("\nHow to use:\n".to_string());
    parts.extend(usage.iter().map(|t| bullet(t)));
    parts.push("\nBe careful:\n".to_string());
    parts.extend(caveats.iter().map(|t| bullet(t)));
    parts.join("\n")
}

fn questions() -> Vec<Node> {
    vec![
        Node::start("start", "Start"),
        Node::question("q1", "Mature with\nstable cash flows?"),
        Node::question("q1a", "Intangible-heavy\nor multi-segment?"),
        Node::question("q2", "Reliable multi-year\nprojections?"),
        Node::question("q3", "Early-stage,\nhigh growth?"),
        Node::question("q4", "Asset-rich or\ndistressed?"),
        Node::question("q4a", "Cease vs\ncontinue ops?"),
        Node::question("q4b", "Cheaper to\nre-build?"),
        Node::question("q5", "Good market\ncomparables?"),
        Node::question("q6", "PE LBO\nscenario?"),
    ]
}

fn income_models() -> Vec<Node> {
    vec![
        Node::model(
            "ccf",
            "Capitalized Cash-Flow",
            Category::Income,
            r"V = \frac{CF_1}{k-g}",
            describe(
                &[
                    "V = value of the business (equity or enterprise)",
                    "CF₁ = next-period normalized cash flow",
                    "k = discount rate / required return",
                    "g = perpetual growth rate",
                ],
                &[
                    "Pick steady-state CF₁ (often forecast year 1)",
                    "Estimate k via WACC or build‑up",
                    "Choose g reflecting long‑run inflation + real growth",
                ],
                &["Very sensitive when g ≈ k", "Assumes constant growth forever"],
            ),
        ),
        Node::model(
            "residual",
            "Residual / Excess Earnings",
            Category::Income,
            r"V = BV_0 + \sum_{t=1}^{n} \frac{NI_t - k\,BV_{t-1}}{(1+k)^t}",
            describe(
                &[
                    "BV₀ = opening book equity",
                    "NI_t = net income in year t",
                    "k = cost of equity",
                ],
                &[
                    "Project NI and book value by segment",
                    "Add PV of economic profit to BV₀",
                ],
                &[
                    "Needs clean accrual accounting",
                    "Sensitive to cost‑of‑capital estimate",
                ],
            ),
        ),
        Node::model(
            "dcf",
            "Discounted Cash‑Flow",
            Category::Income,
            r"V = \sum_{t=1}^{n} \frac{CF_t}{(1+k)^t} + \frac{CF_{n+1}}{(k-g)(1+k)^n}",
            describe(
                &[
                    "CF_t = free cash flow in year t",
                    "k = discount rate (WACC)",
                    "g = perpetual growth",
                ],
                &[
                    "Model 3‑10 years of explicit CF",
                    "Compute terminal value with Gordon‑growth",
                    "Discount all CF to today",
                ],
                &[
                    "Forecast errors propagate",
                    "Terminal assumptions often >50 % of value",
                ],
            ),
        ),
        Node::model(
            "vc",
            "VC / First‑Chicago",
            Category::Income,
            r"V = \frac{\sum p_i\,Exit_i}{(1+IRR)^T}",
            describe(
                &[
                    "p_i = probability of scenario i",
                    "Exit_i = equity value at exit",
                    "IRR = target venture return",
                    "T = years to exit (5‑7)",
                ],
                &[
                    "Define pessimistic / base / optimistic exits",
                    "Discount to PV at target IRR",
                ],
                &[
                    "Ignores interim dilution",
                    "Highly sensitive to exit multiple",
                ],
            ),
        ),
    ]
}

fn asset_models() -> Vec<Node> {
    vec![
        Node::model(
            "asset",
            "Adjusted Net Asset Value",
            Category::Asset,
            r"V = \sum FMV_{assets} - \sum FMV_{liabilities}",
            describe(
                &[
                    "FMV_{assets} = fair‑value of each asset",
                    "FMV_{liabilities} = fair‑value of debts",
                ],
                &[
                    "Revalue PP&E, intangibles, WC",
                    "Subtract market‑value of debt",
                ],
                &[
                    "Time‑consuming asset appraisals",
                    "Ignores going‑concern synergies",
                ],
            ),
        ),
        Node::model(
            "replace",
            "Replacement Cost",
            Category::Asset,
            r"V \approx \sum ReplacementCost_i - AccumDeppr",
            describe(
                &[
                    "ReplacementCost_i = cost to rebuild asset i",
                    "AccumDeppr = economic depreciation",
                ],
                &[
                    "Useful for regulated utilities & IP",
                    "Acts as ceiling to value",
                ],
                &["May exceed earning power", "Tech obsolescence risk"],
            ),
        ),
        Node::model(
            "liquidation",
            "Liquidation Value",
            Category::Asset,
            r"V = (\sum QuickSale_i - Liabilities)e^{-rT}",
            describe(
                &[
                    "QuickSale_i = forced‑sale proceeds",
                    "Liabilities = senior obligations",
                    "r = discount for holding period",
                    "T = months until sale",
                ],
                &["Floor value in distress", "Collateral coverage tests"],
                &[
                    "Subjective illiquidity discounts",
                    "Often far below going‑concern value",
                ],
            ),
        ),
    ]
}

fn market_and_option_models() -> Vec<Node> {
    vec![
        Node::model(
            "market",
            "Market Multiples",
            Category::Market,
            r"V = Multiple \times Metric",
            describe(
                &[
                    "Metric = EBITDA, EBIT, revenue",
                    "Multiple = peer median multiple",
                ],
                &[
                    "Pick peer set similar in size, growth, risk",
                    "Apply control premium / illiquidity discount",
                ],
                &[
                    "Sparse comps can mislead",
                    "Need forward multiples if growth differs",
                ],
            ),
        ),
        Node::model(
            "lbo",
            "LBO Back‑Solve",
            Category::Option,
            r"Solve\;P:\;IRR_{equity}=Target",
            describe(
                &["P = max purchase price", "IRR_{equity} = equity IRR"],
                &[
                    "Model debt schedule, exit multiple",
                    "Back‑solve P where IRR hits 20‑30 %",
                ],
                &[
                    "Leverage & exit assumptions dominate",
                    "Not a standalone fair value",
                ],
            ),
        ),
        Node::model(
            "option",
            "Real Options",
            Category::Option,
            r"V = S\,N(d_1) - Ke^{-rT}N(d_2)",
            describe(
                &[
                    "S = PV of underlying asset",
                    "K = investment cost (exercise price)",
                    "r = risk‑free rate",
                    "T = time to decision",
                ],
                &[
                    "Value expand / defer / abandon options",
                    "Use binomial or Monte‑Carlo for complex paths",
                ],
                &[
                    "Volatility input hard to estimate",
                    "Complex models can obscure key drivers",
                ],
            ),
        ),
    ]
}

fn edges() -> Vec<Edge> {
    use Branch::{No, Unlabeled, Yes};

    vec![
        Edge::new("e0", "start", "q1", Unlabeled).animated(),
        Edge::new("e1", "q1", "q1a", Yes),
        Edge::new("e2", "q1", "q2", No),
        Edge::new("e3", "q1a", "residual", Yes),
        Edge::new("e4", "q1a", "ccf", No),
        Edge::new("e5", "q2", "dcf", Yes),
        Edge::new("e6", "q2", "q3", No),
        Edge::new("e7", "q3", "vc", Yes),
        Edge::new("e8", "q3", "q4", No),
        Edge::new("e9", "q4", "q4a", Yes),
        Edge::new("e10", "q4", "q5", No),
        Edge::new("e11", "q4a", "liquidation", No),
        Edge::new("e12", "q4a", "q4b", Yes),
        Edge::new("e13", "q4b", "replace", Yes),
        Edge::new("e14", "q4b", "asset", No),
        Edge::new("e15", "q5", "market", Yes),
        Edge::new("e16", "q5", "q6", No),
        Edge::new("e17", "q6", "lbo", Yes),
        Edge::new("e18", "q6", "option", No),
    ]
}

/// The built-in valuation decision tree, unvalidated and not yet laid out.
pub fn valuation_tree() -> DecisionTree {
    let mut nodes = questions();
    nodes.extend(income_models());
    nodes.extend(asset_models());
    nodes.extend(market_and_option_models());
    DecisionTree::new(nodes, edges())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_counts() {
        let tree = valuation_tree();
        assert_eq!(tree.nodes.len(), 20);
        assert_eq!(tree.edges.len(), 19);
        assert_eq!(tree.models().count(), 10);
        assert_eq!(tree.questions().count(), 9);
    }

    #[test]
    fn description_sections_are_separated_by_blank_lines() {
        let text = describe(&["a"], &["b"], &["c"]);
        assert_eq!(text, "• a\n\nHow to use:\n\n• b\n\nBe careful:\n\n• c");
    }

    #[test]
    fn models_have_one_way_in_and_start_has_none() {
        let tree = valuation_tree();
        for model in tree.models() {
            assert_eq!(tree.incoming(&model.id).count(), 1, "{}", model.id);
            assert_eq!(tree.outgoing(&model.id).count(), 0, "{}", model.id);
        }
        let start = tree.start().expect("start node");
        assert_eq!(tree.incoming(&start.id).count(), 0);
    }

    #[test]
    fn only_the_start_edge_is_animated() {
        let tree = valuation_tree();
        let animated: Vec<&str> = tree
            .edges
            .iter()
            .filter(|e| e.animated)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(animated, vec!["e0"]);
    }
}
