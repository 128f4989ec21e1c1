//! Dependency graph construction and cycle detection.
//!
//! Nodes register into an explicit `Graph` value (one per synthesis run —
//! no process-wide state). Edges are derived, never stored: node A depends
//! on node B whenever an input of A references an output of B, or A lists
//! B in `depends_on`. Cycle detection is a depth-first traversal tracking
//! the active recursion stack.

use super::error::SynthError;
use super::types::{OutputValue, TopologyConfig, Value};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A registered resource node. Immutable once added to a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique id within the graph
    pub id: String,

    /// Resource kind (opaque tag)
    pub kind: String,

    /// Input fields in declaration order
    pub inputs: IndexMap<String, Value>,

    /// Output fields in declaration order
    pub outputs: IndexMap<String, OutputValue>,

    /// Ordering-only dependencies
    pub depends_on: Vec<String>,
}

/// The declared topology: nodes in declaration order plus export
/// declarations. Built incrementally, frozen once synthesis runs.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    name: String,
    nodes: IndexMap<String, Node>,
    exports: IndexMap<String, Value>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            exports: IndexMap::new(),
        }
    }

    /// Build a graph from a parsed topology config.
    pub fn from_config(config: &TopologyConfig) -> Result<Self, SynthError> {
        let mut graph = Self::new(config.name.clone());

        for (id, decl) in &config.nodes {
            let mut outputs = IndexMap::new();
            for (field, out) in &decl.outputs {
                let value = match (&out.value, out.deferred) {
                    (None, true) => OutputValue::Deferred,
                    (Some(v), false) => OutputValue::Literal(v.clone()),
                    _ => {
                        return Err(SynthError::InvalidOutput {
                            node: id.clone(),
                            output: field.clone(),
                        })
                    }
                };
                outputs.insert(field.clone(), value);
            }

            graph.add_node(Node {
                id: id.clone(),
                kind: decl.kind.clone(),
                inputs: decl.inputs.clone(),
                outputs,
                depends_on: decl.depends_on.clone(),
            })?;
        }

        for (name, value) in &config.exports {
            graph.export(name.clone(), value.clone())?;
        }

        Ok(graph)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a node. Fails if the id is already taken.
    pub fn add_node(&mut self, node: Node) -> Result<(), SynthError> {
        if self.nodes.contains_key(&node.id) {
            return Err(SynthError::DuplicateNode { node: node.id });
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Register a named export. Fails if the name is already taken.
    pub fn export(&mut self, name: impl Into<String>, value: Value) -> Result<(), SynthError> {
        let name = name.into();
        if self.exports.contains_key(&name) {
            return Err(SynthError::DuplicateExport { name });
        }
        self.exports.insert(name, value);
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn exports(&self) -> &IndexMap<String, Value> {
        &self.exports
    }

    /// Node ids this node depends on: reference targets in input order,
    /// then explicit `depends_on`, deduplicated.
    pub fn dependencies_of(&self, node: &Node) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for value in node.inputs.values() {
            if let Some(target) = value.referenced_node() {
                if !deps.iter().any(|d| d == target) {
                    deps.push(target.to_string());
                }
            }
        }
        for dep in &node.depends_on {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        deps
    }

    /// Derived edge list: (dependent, dependency) pairs in declaration order.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        for node in self.nodes.values() {
            for dep in self.dependencies_of(node) {
                edges.push((node.id.clone(), dep));
            }
        }
        edges
    }

    /// Detect a dependency cycle. Returns the full node-id path with the
    /// entry node repeated at the end, e.g. `[a, b, c, a]`.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }

        fn visit(
            graph: &Graph,
            id: &str,
            marks: &mut HashMap<String, Mark>,
            stack: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            match marks.get(id) {
                Some(Mark::Done) => return None,
                Some(Mark::Active) => {
                    let start = stack.iter().position(|s| s == id).unwrap_or(0);
                    let mut path: Vec<String> = stack[start..].to_vec();
                    path.push(id.to_string());
                    return Some(path);
                }
                None => {}
            }

            marks.insert(id.to_string(), Mark::Active);
            stack.push(id.to_string());

            if let Some(node) = graph.node(id) {
                for dep in graph.dependencies_of(node) {
                    if let Some(cycle) = visit(graph, &dep, marks, stack) {
                        return Some(cycle);
                    }
                }
            }

            stack.pop();
            marks.insert(id.to_string(), Mark::Done);
            None
        }

        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        for id in self.nodes.keys() {
            if let Some(cycle) = visit(self, id, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_topology;

    fn bare_node(id: &str, kind: &str) -> Node {
        Node {
            id: id.to_string(),
            kind: kind.to_string(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            depends_on: vec![],
        }
    }

    fn node_referencing(id: &str, deps: &[(&str, &str)]) -> Node {
        let mut inputs = IndexMap::new();
        for (i, (node, output)) in deps.iter().enumerate() {
            inputs.insert(format!("in{}", i), Value::reference(node, output));
        }
        Node {
            inputs,
            ..bare_node(id, "test")
        }
    }

    #[test]
    fn test_add_node_duplicate() {
        let mut graph = Graph::new("test");
        graph.add_node(bare_node("instance", "sql-instance")).unwrap();
        let err = graph
            .add_node(bare_node("instance", "container-service"))
            .unwrap_err();
        assert!(matches!(err, SynthError::DuplicateNode { node } if node == "instance"));
    }

    #[test]
    fn test_export_duplicate() {
        let mut graph = Graph::new("test");
        graph
            .export("cluster-name", Value::literal("alpha"))
            .unwrap();
        let err = graph
            .export("cluster-name", Value::literal("beta"))
            .unwrap_err();
        assert!(matches!(err, SynthError::DuplicateExport { name } if name == "cluster-name"));
    }

    #[test]
    fn test_edges_derived_from_references() {
        let mut graph = Graph::new("test");
        graph.add_node(bare_node("vpc", "network")).unwrap();
        graph
            .add_node(node_referencing("database", &[("vpc", "id")]))
            .unwrap();
        graph
            .add_node(node_referencing("service", &[("database", "endpoint"), ("vpc", "id")]))
            .unwrap();

        let edges = graph.edges();
        assert_eq!(
            edges,
            vec![
                ("database".to_string(), "vpc".to_string()),
                ("service".to_string(), "database".to_string()),
                ("service".to_string(), "vpc".to_string()),
            ]
        );
    }

    #[test]
    fn test_edges_include_depends_on() {
        let mut graph = Graph::new("test");
        graph.add_node(bare_node("cluster", "container-cluster")).unwrap();
        let mut svc = bare_node("service", "container-service");
        svc.depends_on = vec!["cluster".to_string()];
        graph.add_node(svc).unwrap();

        assert_eq!(
            graph.edges(),
            vec![("service".to_string(), "cluster".to_string())]
        );
    }

    #[test]
    fn test_dependencies_deduplicated() {
        let mut graph = Graph::new("test");
        graph.add_node(bare_node("vpc", "network")).unwrap();
        let mut node = node_referencing("alb", &[("vpc", "id"), ("vpc", "cidr")]);
        node.depends_on = vec!["vpc".to_string()];
        graph.add_node(node).unwrap();

        let deps = graph.dependencies_of(graph.node("alb").unwrap());
        assert_eq!(deps, vec!["vpc"]);
    }

    #[test]
    fn test_no_cycle_in_dag() {
        let mut graph = Graph::new("test");
        graph.add_node(bare_node("a", "t")).unwrap();
        graph.add_node(node_referencing("b", &[("a", "x")])).unwrap();
        graph
            .add_node(node_referencing("c", &[("a", "x"), ("b", "y")]))
            .unwrap();
        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn test_two_node_cycle() {
        let mut graph = Graph::new("test");
        graph.add_node(node_referencing("a", &[("b", "x")])).unwrap();
        graph.add_node(node_referencing("b", &[("a", "y")])).unwrap();
        let path = graph.detect_cycle().unwrap();
        assert_eq!(path, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_three_node_cycle_reports_full_path() {
        let mut graph = Graph::new("test");
        graph.add_node(node_referencing("a", &[("b", "x")])).unwrap();
        graph.add_node(node_referencing("b", &[("c", "x")])).unwrap();
        graph.add_node(node_referencing("c", &[("a", "x")])).unwrap();
        let path = graph.detect_cycle().unwrap();
        assert_eq!(path, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut graph = Graph::new("test");
        graph.add_node(node_referencing("a", &[("a", "x")])).unwrap();
        let path = graph.detect_cycle().unwrap();
        assert_eq!(path, vec!["a", "a"]);
    }

    #[test]
    fn test_cycle_below_an_acyclic_entry() {
        // entry -> b <-> c; the cycle does not pass through the entry node
        let mut graph = Graph::new("test");
        graph.add_node(node_referencing("entry", &[("b", "x")])).unwrap();
        graph.add_node(node_referencing("b", &[("c", "x")])).unwrap();
        graph.add_node(node_referencing("c", &[("b", "x")])).unwrap();
        let path = graph.detect_cycle().unwrap();
        assert_eq!(path, vec!["b", "c", "b"]);
    }

    #[test]
    fn test_unknown_reference_target_is_not_a_cycle() {
        let mut graph = Graph::new("test");
        graph
            .add_node(node_referencing("a", &[("ghost", "x")]))
            .unwrap();
        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn test_from_config() {
        let yaml = r#"
version: "1.0"
name: demo
nodes:
  vpc:
    kind: network
    outputs:
      id: { value: vpc-123 }
  database:
    kind: sql-instance
    inputs:
      network: { ref: vpc.id }
    outputs:
      password: { deferred: true }
exports:
  db-password: { ref: database.password }
"#;
        let config = parse_topology(yaml).unwrap();
        let graph = Graph::from_config(&config).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.name(), "demo");
        assert_eq!(
            graph.node("vpc").unwrap().outputs["id"],
            OutputValue::Literal(serde_yaml_ng::Value::String("vpc-123".into()))
        );
        assert_eq!(
            graph.node("database").unwrap().outputs["password"],
            OutputValue::Deferred
        );
        assert_eq!(graph.exports().len(), 1);
    }

    #[test]
    fn test_from_config_rejects_output_without_value_or_deferred() {
        let yaml = r#"
version: "1.0"
name: demo
nodes:
  database:
    kind: sql-instance
    outputs:
      endpoint: {}
"#;
        let config = parse_topology(yaml).unwrap();
        let err = Graph::from_config(&config).unwrap_err();
        assert!(
            matches!(err, SynthError::InvalidOutput { ref node, ref output }
                if node == "database" && output == "endpoint")
        );
    }

    #[test]
    fn test_from_config_rejects_output_with_both() {
        let yaml = r#"
version: "1.0"
name: demo
nodes:
  database:
    kind: sql-instance
    outputs:
      endpoint: { value: x, deferred: true }
"#;
        let config = parse_topology(yaml).unwrap();
        assert!(Graph::from_config(&config).is_err());
    }
}
