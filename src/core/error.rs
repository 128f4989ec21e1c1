//! Synthesis error types.
//!
//! Every error aborts the synthesis run — a malformed graph cannot become
//! valid by retrying. Variants carry the offending node ids and field names
//! so the declaration can be fixed.

use thiserror::Error;

/// Fatal synthesis-time error.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("duplicate node '{node}'")]
    DuplicateNode { node: String },

    #[error("reference to unknown node '{node}'")]
    UnknownNode { node: String },

    #[error("node '{node}' has no output '{output}'")]
    UnknownOutput { node: String, output: String },

    #[error("node '{node}' depends on unknown node '{dependency}'")]
    UnknownDependency { node: String, dependency: String },

    #[error("malformed reference '{target}' (expected 'node.output')")]
    MalformedReference { target: String },

    #[error("malformed lookup '{target}' (expected 'catalog/key')")]
    MalformedLookup { target: String },

    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("duplicate export '{name}'")]
    DuplicateExport { name: String },

    #[error("output '{output}' of node '{node}' must declare a value or deferred: true")]
    InvalidOutput { node: String, output: String },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Resolution failure annotated with the input that triggered it.
    #[error("node '{node}', input '{input}': {source}")]
    Input {
        node: String,
        input: String,
        #[source]
        source: Box<SynthError>,
    },

    /// Resolution failure annotated with the export that triggered it.
    #[error("export '{name}': {source}")]
    Export {
        name: String,
        #[source]
        source: Box<SynthError>,
    },

    #[error("{0}")]
    Parse(String),
}

impl SynthError {
    /// Wrap a resolution error with the node input it occurred at.
    pub fn at_input(node: &str, input: &str, source: SynthError) -> Self {
        Self::Input {
            node: node.to_string(),
            input: input.to_string(),
            source: Box::new(source),
        }
    }

    /// Wrap a resolution error with the export name it occurred at.
    pub fn at_export(name: &str, source: SynthError) -> Self {
        Self::Export {
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

/// External inventory query failure. Propagated, never retried.
#[derive(Error, Debug, Clone)]
#[error("lookup '{catalog}/{key}' failed: {reason}")]
pub struct LookupError {
    pub catalog: String,
    pub key: String,
    pub reason: String,
}
