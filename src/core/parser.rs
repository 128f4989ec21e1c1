//! Topology file parsing and validation.
//!
//! Parses tejer.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - Node ids must be usable in references (no '.' or '/')
//! - References and lookups must be well-formed and target declared
//!   nodes/outputs
//! - Output declarations carry a value or `deferred: true`, never both
//! - depends_on references must exist

use super::error::SynthError;
use super::types::{TopologyConfig, Value};
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a tejer.yaml file from disk.
pub fn parse_topology_file(path: &Path) -> Result<TopologyConfig, SynthError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SynthError::Parse(format!("failed to read {}: {}", path.display(), e)))?;
    parse_topology(&content)
}

/// Parse a tejer.yaml from a string.
pub fn parse_topology(yaml: &str) -> Result<TopologyConfig, SynthError> {
    serde_yaml_ng::from_str(yaml).map_err(|e| SynthError::Parse(format!("YAML parse error: {}", e)))
}

/// Validate a parsed topology. Returns a list of errors (empty = valid).
pub fn validate_topology(config: &TopologyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ValidationError { message });

    if config.version != "1.0" {
        push(format!(
            "version must be \"1.0\", got \"{}\"",
            config.version
        ));
    }

    if config.name.is_empty() {
        push("name must not be empty".to_string());
    }

    for (id, decl) in &config.nodes {
        if id.contains('.') || id.contains('/') {
            push(format!("node id '{}' must not contain '.' or '/'", id));
        }

        if decl.kind.is_empty() {
            push(format!("node '{}' has an empty kind", id));
        }

        for (field, out) in &decl.outputs {
            match (&out.value, out.deferred) {
                (Some(_), true) => push(format!(
                    "node '{}' output '{}' declares both a value and deferred: true",
                    id, field
                )),
                (None, false) => push(format!(
                    "node '{}' output '{}' needs a value or deferred: true",
                    id, field
                )),
                _ => {}
            }
        }

        for (field, value) in &decl.inputs {
            check_value(config, value, &format!("node '{}' input '{}'", id, field), &mut push);
            if value.referenced_node() == Some(id.as_str()) {
                push(format!("node '{}' input '{}' references itself", id, field));
            }
        }

        for dep in &decl.depends_on {
            if !config.nodes.contains_key(dep) {
                push(format!(
                    "node '{}' depends on unknown node '{}'",
                    id, dep
                ));
            }
            if dep == id {
                push(format!("node '{}' depends on itself", id));
            }
        }
    }

    for (name, value) in &config.exports {
        check_value(config, value, &format!("export '{}'", name), &mut push);
    }

    errors
}

/// Check a single declared value: references must be well-formed and target
/// a declared output; lookups must be well-formed (inventory contents are a
/// synthesis-time concern).
fn check_value(
    config: &TopologyConfig,
    value: &Value,
    at: &str,
    push: &mut impl FnMut(String),
) {
    match value {
        Value::Reference { target } => match target.split_once('.') {
            Some((node, output)) if !node.is_empty() && !output.is_empty() => {
                match config.nodes.get(node) {
                    Some(decl) => {
                        if !decl.outputs.contains_key(output) {
                            push(format!(
                                "{} references undeclared output '{}' of node '{}'",
                                at, output, node
                            ));
                        }
                    }
                    None => push(format!("{} references unknown node '{}'", at, node)),
                }
            }
            _ => push(format!(
                "{} has malformed reference '{}' (expected 'node.output')",
                at, target
            )),
        },
        Value::Lookup { lookup } => match lookup.split_once('/') {
            Some((catalog, key)) if !catalog.is_empty() && !key.is_empty() => {}
            _ => push(format!(
                "{} has malformed lookup '{}' (expected 'catalog/key')",
                at, lookup
            )),
        },
        Value::Literal(_) => {}
    }
}
