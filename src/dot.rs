//! CFG to DOT (Graphviz) conversion.
//!
//! The generated graph follows these conventions:
//! - every node is labelled with its id and statement text
//! - entry and exit are drawn with a separate shape
//! - dead nodes are filled with a configurable color
//! - edges carry their kind as a label (`T`/`F` for `if` branches, the case
//!   value for switch cases)
//!
//! # Examples
//!
//! ```
//! use dataflow_rs::cfg::Cfg;
//! use dataflow_rs::deadcode::DeadCodeDetection;
//! use dataflow_rs::ir::{Exp, Ir, StmtKind};
//! use dataflow_rs::types::Type;
//!
//! let mut ir = Ir::new();
//! let x = ir.new_var("x", Type::Int);
//! ir.assign(x, Exp::IntLiteral(1));
//! ir.push(StmtKind::Return(None));
//!
//! let cfg = Cfg::build(&ir).unwrap();
//! let dead = DeadCodeDetection::analyze(&ir).unwrap();
//! let dot = cfg.to_dot(&dead).unwrap();
//! // Render with: dot -Tpng cfg.dot -o cfg.png
//! assert!(dot.starts_with("digraph cfg {"));
//! ```

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::cfg::{Cfg, EdgeKind};

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for statement nodes (default: "box")
    pub node_shape: &'static str,
    /// Shape for the entry and exit nodes (default: "ellipse")
    pub boundary_shape: &'static str,
    /// Fill color for dead nodes (default: "lightgray")
    pub dead_color: &'static str,
    /// Style for edges that are always taken (default: "solid")
    pub unconditional_edge_style: &'static str,
    /// Style for branch and switch edges (default: "dashed")
    pub conditional_edge_style: &'static str,
    /// Whether to put statement text into node labels (default: true)
    pub show_statements: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "box",
            boundary_shape: "ellipse",
            dead_color: "lightgray",
            unconditional_edge_style: "solid",
            conditional_edge_style: "dashed",
            show_statements: true,
        }
    }
}

impl DotConfig {
    pub fn with_dead_color(mut self, dead_color: &'static str) -> Self {
        self.dead_color = dead_color;
        self
    }

    pub fn with_show_statements(mut self, show_statements: bool) -> Self {
        self.show_statements = show_statements;
        self
    }
}

impl Cfg<'_> {
    /// Converts the CFG to DOT format, highlighting the `dead` nodes.
    pub fn to_dot(&self, dead: &BTreeSet<usize>) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(dead, &DotConfig::default())
    }

    /// Converts the CFG to DOT format with custom configuration.
    ///
    /// ```
    /// use std::collections::BTreeSet;
    ///
    /// use dataflow_rs::cfg::Cfg;
    /// use dataflow_rs::dot::DotConfig;
    /// use dataflow_rs::ir::Ir;
    ///
    /// let ir = Ir::new();
    /// let cfg = Cfg::build(&ir).unwrap();
    /// let config = DotConfig {
    ///     node_shape: "ellipse",
    ///     ..DotConfig::default()
    /// };
    /// let dot = cfg.to_dot_with_config(&BTreeSet::new(), &config).unwrap();
    /// assert!(dot.contains("entry"));
    /// ```
    pub fn to_dot_with_config(&self, dead: &BTreeSet<usize>, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph cfg {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        for node in self.nodes() {
            let text = if self.is_entry(node) {
                "entry".to_string()
            } else if self.is_exit(node) {
                "exit".to_string()
            } else if config.show_statements {
                format!("[{}] {}", node, self.stmt(node))
            } else {
                format!("[{}]", node)
            };

            let mut attrs = format!("label=\"{}\"", escape(&text));
            if self.is_entry(node) || self.is_exit(node) {
                write!(attrs, ", shape={}", config.boundary_shape)?;
            }
            if dead.contains(&node) {
                write!(attrs, ", style=filled, fillcolor={}", config.dead_color)?;
            }
            writeln!(dot, "{} [{}];", node, attrs)?;
        }

        for node in self.nodes() {
            for edge in self.out_edges(node) {
                let style = if edge.kind.is_unconditional() {
                    config.unconditional_edge_style
                } else {
                    config.conditional_edge_style
                };
                write!(dot, "{} -> {} [style={}", edge.source, edge.target, style)?;
                match edge.kind {
                    EdgeKind::IfTrue => write!(dot, ", label=\"T\"")?,
                    EdgeKind::IfFalse => write!(dot, ", label=\"F\"")?,
                    EdgeKind::SwitchCase(value) => write!(dot, ", label=\"{}\"", value)?,
                    EdgeKind::SwitchDefault => write!(dot, ", label=\"default\"")?,
                    _ => {}
                }
                writeln!(dot, "];")?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::ir::{BinaryOp, Exp, Ir, StmtKind};
    use crate::types::Type;

    fn branchy_ir() -> Ir {
        // 0: if (p < q) goto 2
        // 1: return p
        // 2: switch (p) { case 7: goto 1; default: goto 1 }
        let mut ir = Ir::new();
        let p = ir.new_param("p", Type::Int);
        let q = ir.new_param("q", Type::Int);
        ir.push(StmtKind::If {
            cond: Exp::binary(BinaryOp::Lt, p, q),
            target: 2,
        });
        ir.push(StmtKind::Return(Some(p)));
        ir.push(StmtKind::Switch {
            var: p,
            cases: vec![(7, 1)],
            default: 1,
        });
        ir
    }

    #[test]
    fn test_to_dot_basic() {
        let ir = branchy_ir();
        let cfg = Cfg::build(&ir).unwrap();
        let dot = cfg.to_dot(&BTreeSet::new()).unwrap();

        assert!(dot.starts_with("digraph cfg {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("3 [label=\"entry\", shape=ellipse];"));
        assert!(dot.contains("4 [label=\"exit\", shape=ellipse];"));
        assert!(dot.contains("0 -> 2 [style=dashed, label=\"T\"];"));
        assert!(dot.contains("0 -> 1 [style=dashed, label=\"F\"];"));
        assert!(dot.contains("2 -> 1 [style=dashed, label=\"7\"];"));
        assert!(dot.contains("2 -> 1 [style=dashed, label=\"default\"];"));
        assert!(dot.contains("1 -> 4 [style=solid];"));
        assert!(!dot.contains("filled"));
    }

    #[test]
    fn test_to_dot_marks_dead_nodes() {
        let ir = branchy_ir();
        let cfg = Cfg::build(&ir).unwrap();
        let dead = BTreeSet::from([2]);
        let config = DotConfig::default().with_dead_color("red").with_show_statements(false);
        let dot = cfg.to_dot_with_config(&dead, &config).unwrap();

        assert!(dot.contains("2 [label=\"[2]\", style=filled, fillcolor=red];"));
        assert!(dot.contains("0 [label=\"[0]\"];"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a \"b\" \\c"), "a \\\"b\\\" \\\\c");
    }
}
