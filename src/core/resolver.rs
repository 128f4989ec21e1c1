//! Value resolution against a graph and an external inventory.
//!
//! Literals pass through unchanged. References resolve to another node's
//! output — a literal when the output is known at synthesis time, a
//! `${node.output}` placeholder when the output is deferred to deployment.
//! Lookups are delegated to the `LookupProvider`; a failed lookup is an
//! error, a deferred output is not.
//!
//! Resolution is referentially transparent: the same value against an
//! unchanged graph always resolves to the same result.

use super::error::SynthError;
use super::graph::Graph;
use super::types::{OutputValue, ResolvedValue, Value};
use crate::lookup::LookupProvider;

/// Resolves declared values against a frozen graph.
pub struct Resolver<'a> {
    graph: &'a Graph,
    lookups: &'a dyn LookupProvider,
}

impl<'a> Resolver<'a> {
    pub fn new(graph: &'a Graph, lookups: &'a dyn LookupProvider) -> Self {
        Self { graph, lookups }
    }

    /// Resolve a single declared value.
    pub fn resolve(&self, value: &Value) -> Result<ResolvedValue, SynthError> {
        match value {
            Value::Literal(v) => Ok(ResolvedValue::Literal(v.clone())),
            Value::Reference { target } => {
                let (node_id, output) = split_reference(target)?;
                let node = self.graph.node(node_id).ok_or_else(|| SynthError::UnknownNode {
                    node: node_id.to_string(),
                })?;
                match node.outputs.get(output) {
                    Some(OutputValue::Literal(v)) => Ok(ResolvedValue::Literal(v.clone())),
                    Some(OutputValue::Deferred) => Ok(ResolvedValue::Deferred {
                        placeholder: deferred_placeholder(node_id, output),
                    }),
                    None => Err(SynthError::UnknownOutput {
                        node: node_id.to_string(),
                        output: output.to_string(),
                    }),
                }
            }
            Value::Lookup { lookup } => {
                let (catalog, key) = split_lookup(lookup)?;
                let v = self.lookups.lookup(catalog, key)?;
                Ok(ResolvedValue::Literal(v))
            }
        }
    }
}

/// Placeholder token for an output only known after provisioning.
pub fn deferred_placeholder(node: &str, output: &str) -> String {
    format!("${{{}.{}}}", node, output)
}

/// Split a `node.output` reference target. Fails on missing or empty parts.
pub fn split_reference(target: &str) -> Result<(&str, &str), SynthError> {
    match target.split_once('.') {
        Some((node, output)) if !node.is_empty() && !output.is_empty() => Ok((node, output)),
        _ => Err(SynthError::MalformedReference {
            target: target.to_string(),
        }),
    }
}

/// Split a `catalog/key` lookup target. Fails on missing or empty parts.
pub fn split_lookup(target: &str) -> Result<(&str, &str), SynthError> {
    match target.split_once('/') {
        Some((catalog, key)) if !catalog.is_empty() && !key.is_empty() => Ok((catalog, key)),
        _ => Err(SynthError::MalformedLookup {
            target: target.to_string(),
        }),
    }
}
