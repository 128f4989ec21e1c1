//! Topology schema and plan types.
//!
//! Defines the YAML schema for topology files (nodes, inputs, outputs,
//! exports, policy) and the plan emitted by synthesis. All types derive
//! Serialize/Deserialize for YAML/JSON roundtripping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level tejer.yaml
// ============================================================================

/// Root configuration — the declared topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable topology name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Node declarations (order-preserving; declaration order is the
    /// deterministic tie-break during synthesis)
    pub nodes: IndexMap<String, NodeDecl>,

    /// Named exports published by the plan
    #[serde(default)]
    pub exports: IndexMap<String, Value>,

    /// Synthesis policy
    #[serde(default)]
    pub policy: Policy,
}

// ============================================================================
// Nodes
// ============================================================================

/// A declared resource node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDecl {
    /// Resource kind (opaque tag, e.g. "network", "sql-instance")
    pub kind: String,

    /// Input fields — literals, references, or lookups
    #[serde(default)]
    pub inputs: IndexMap<String, Value>,

    /// Output fields — synthesis-time literals or deployment-time deferreds
    #[serde(default)]
    pub outputs: IndexMap<String, OutputDecl>,

    /// Ordering-only edges, in addition to edges implied by references
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// An input value — `{ ref: "node.output" }` and `{ lookup: "catalog/key" }`
/// are recognized forms; anything else is a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Reference {
        #[serde(rename = "ref")]
        target: String,
    },
    Lookup {
        lookup: String,
    },
    Literal(serde_yaml_ng::Value),
}

impl Value {
    /// A literal value.
    pub fn literal(v: impl Into<serde_yaml_ng::Value>) -> Self {
        Self::Literal(v.into())
    }

    /// A reference to another node's output.
    pub fn reference(node: &str, output: &str) -> Self {
        Self::Reference {
            target: format!("{}.{}", node, output),
        }
    }

    /// An external inventory lookup.
    pub fn lookup(catalog: &str, key: &str) -> Self {
        Self::Lookup {
            lookup: format!("{}/{}", catalog, key),
        }
    }

    /// The node id this value references, if it is a reference.
    /// Malformed targets are reported at resolution time; the part before
    /// the first '.' is enough for edge derivation.
    pub fn referenced_node(&self) -> Option<&str> {
        match self {
            Self::Reference { target } => target.split('.').next(),
            _ => None,
        }
    }
}

/// An output declaration: a synthesis-time `value`, or `deferred: true` for
/// values only known after provisioning (generated credentials, allocated
/// endpoints).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDecl {
    #[serde(default)]
    pub value: Option<serde_yaml_ng::Value>,

    #[serde(default)]
    pub deferred: bool,
}

/// Runtime form of an output, after declaration checks.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Literal(serde_yaml_ng::Value),
    Deferred,
}

// ============================================================================
// Policy
// ============================================================================

/// Synthesis policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Append provenance events on every synthesis
    #[serde(default = "default_true")]
    pub trace: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self { trace: true }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Plan
// ============================================================================

/// A resolved value in the plan — either known at synthesis time or a
/// deferred placeholder the provisioning engine fills in later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedValue {
    Literal(serde_yaml_ng::Value),
    Deferred { placeholder: String },
}

impl ResolvedValue {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{}", yaml_value_to_string(v)),
            Self::Deferred { placeholder } => write!(f, "{} (deferred)", placeholder),
        }
    }
}

/// A single resource definition in the plan, with resolved fields and the
/// nodes it must be provisioned after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedResource {
    pub id: String,
    pub kind: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,

    #[serde(default)]
    pub inputs: IndexMap<String, ResolvedValue>,

    #[serde(default)]
    pub outputs: IndexMap<String, ResolvedValue>,
}

/// Ordered result of synthesis, ready for an external provisioning engine.
/// Derived output — recomputed each synthesis, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Topology name
    pub name: String,

    /// Resources in execution order (each after everything it references)
    pub resources: Vec<PlannedResource>,

    /// Export table (name → resolved value, deferreds preserved)
    pub exports: IndexMap<String, ResolvedValue>,

    /// BLAKE3 fingerprint of the plan body
    pub fingerprint: String,
}

impl Plan {
    /// Count of deferred values across resource inputs and exports.
    pub fn deferred_count(&self) -> usize {
        let in_resources: usize = self
            .resources
            .iter()
            .map(|r| r.inputs.values().filter(|v| v.is_deferred()).count())
            .sum();
        let in_exports = self.exports.values().filter(|v| v.is_deferred()).count();
        in_resources + in_exports
    }
}

// ============================================================================
// Provenance events
// ============================================================================

/// Synthesis event for the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SynthEvent {
    SynthStarted {
        run_id: String,
        topology: String,
        tejer_version: String,
    },
    SynthCompleted {
        run_id: String,
        resources: u32,
        deferred_values: u32,
        fingerprint: String,
        duration_seconds: f64,
    },
    SynthFailed {
        run_id: String,
        error: String,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: SynthEvent,
}

// ============================================================================
// Display helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for human-readable output.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// Tests
// ============================================================================
