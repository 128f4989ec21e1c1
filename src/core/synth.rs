//! Synthesis — topological ordering and plan emission.
//!
//! Runs once over a frozen graph: cycle detection first, then Kahn's
//! algorithm with declaration order as the tie-break, then per-node input
//! resolution. A node enters the plan only once every input resolves to a
//! literal or a legal deferred placeholder. Synthesis either completes or
//! fails atomically — callers never see a partial plan.

use super::error::SynthError;
use super::graph::Graph;
use super::resolver::{deferred_placeholder, Resolver};
use super::types::{OutputValue, Plan, PlannedResource, ResolvedValue};
use crate::lookup::LookupProvider;
use crate::trace::hasher;
use indexmap::IndexMap;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Synthesize a plan from a declared graph.
///
/// Deterministic: identical declarations produce identical plans,
/// fingerprints included.
pub fn synthesize(graph: &Graph, lookups: &dyn LookupProvider) -> Result<Plan, SynthError> {
    if let Some(path) = graph.detect_cycle() {
        return Err(SynthError::Cycle { path });
    }

    let order = topological_order(graph)?;
    let resolver = Resolver::new(graph, lookups);

    let mut resources = Vec::with_capacity(order.len());
    for id in &order {
        let node = match graph.node(id) {
            Some(n) => n,
            None => continue,
        };

        let mut inputs = IndexMap::new();
        for (field, value) in &node.inputs {
            let resolved = resolver
                .resolve(value)
                .map_err(|e| SynthError::at_input(id, field, e))?;
            inputs.insert(field.clone(), resolved);
        }

        let mut outputs = IndexMap::new();
        for (field, out) in &node.outputs {
            let resolved = match out {
                OutputValue::Literal(v) => ResolvedValue::Literal(v.clone()),
                OutputValue::Deferred => ResolvedValue::Deferred {
                    placeholder: deferred_placeholder(id, field),
                },
            };
            outputs.insert(field.clone(), resolved);
        }

        resources.push(PlannedResource {
            id: id.clone(),
            kind: node.kind.clone(),
            after: graph.dependencies_of(node),
            inputs,
            outputs,
        });
    }

    let mut exports = IndexMap::new();
    for (name, value) in graph.exports() {
        let resolved = resolver
            .resolve(value)
            .map_err(|e| SynthError::at_export(name, e))?;
        exports.insert(name.clone(), resolved);
    }

    let fingerprint = plan_fingerprint(&resources, &exports)?;

    Ok(Plan {
        name: graph.name().to_string(),
        resources,
        exports,
        fingerprint,
    })
}

/// Compute the execution order via Kahn's algorithm.
///
/// Nodes become ready when all their in-graph dependencies are placed;
/// among ready nodes the earliest-declared wins, which makes the order
/// reproducible across runs for identical declarations.
pub fn topological_order(graph: &Graph) -> Result<Vec<String>, SynthError> {
    let ids: Vec<&str> = graph.node_ids().collect();
    let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut in_degree = vec![0usize; ids.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];

    for (i, node) in graph.nodes().enumerate() {
        for dep in &node.depends_on {
            if graph.node(dep).is_none() {
                return Err(SynthError::UnknownDependency {
                    node: node.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        for dep in graph.dependencies_of(node) {
            // Unknown reference targets surface as UnknownNode during
            // resolution; they contribute no ordering constraint here.
            if let Some(&j) = index.get(dep.as_str()) {
                dependents[j].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(ids.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(ids[i].to_string());
        for &dep_idx in &dependents[i] {
            in_degree[dep_idx] -= 1;
            if in_degree[dep_idx] == 0 {
                ready.push(Reverse(dep_idx));
            }
        }
    }

    if order.len() != ids.len() {
        let path = graph.detect_cycle().unwrap_or_else(|| {
            ids.iter()
                .filter(|id| !order.iter().any(|o| o == *id))
                .map(|id| id.to_string())
                .collect()
        });
        return Err(SynthError::Cycle { path });
    }

    Ok(order)
}

/// BLAKE3 fingerprint over the serialized plan body.
fn plan_fingerprint(
    resources: &[PlannedResource],
    exports: &IndexMap<String, ResolvedValue>,
) -> Result<String, SynthError> {
    let resources_body = serde_yaml_ng::to_string(resources)
        .map_err(|e| SynthError::Parse(format!("plan serialize error: {}", e)))?;
    let exports_body = serde_yaml_ng::to_string(exports)
        .map_err(|e| SynthError::Parse(format!("plan serialize error: {}", e)))?;
    Ok(hasher::hash_string(&format!(
        "{}\0{}",
        resources_body, exports_body
    )))
}
