//! CLI subcommands — init, validate, graph, synth, exports, history.

use crate::core::{graph::Graph, parser, synth, types};
use crate::lookup::StaticInventory;
use crate::trace::eventlog;
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new tejer project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate tejer.yaml without synthesizing
    Validate {
        /// Path to tejer.yaml
        #[arg(short, long, default_value = "tejer.yaml")]
        file: PathBuf,
    },

    /// Show derived edges and execution order
    Graph {
        /// Path to tejer.yaml
        #[arg(short, long, default_value = "tejer.yaml")]
        file: PathBuf,
    },

    /// Synthesize the deployment plan
    Synth {
        /// Path to tejer.yaml
        #[arg(short, long, default_value = "tejer.yaml")]
        file: PathBuf,

        /// Inventory file for external lookups
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Plan output format
        #[arg(long, value_enum, default_value_t = PlanFormat::Yaml)]
        format: PlanFormat,

        /// State directory for trace events
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Synthesize and print the export table
    Exports {
        /// Path to tejer.yaml
        #[arg(short, long, default_value = "tejer.yaml")]
        file: PathBuf,

        /// Inventory file for external lookups
        #[arg(short, long)]
        inventory: Option<PathBuf>,
    },

    /// Show synthesis runs from the event log
    History {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },
}

/// Plan serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Yaml,
    Json,
}

impl std::fmt::Display for PlanFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Graph { file } => cmd_graph(&file),
        Commands::Synth {
            file,
            inventory,
            out,
            format,
            state_dir,
        } => cmd_synth(&file, inventory.as_deref(), out.as_deref(), format, &state_dir),
        Commands::Exports { file, inventory } => cmd_exports(&file, inventory.as_deref()),
        Commands::History { state_dir } => cmd_history(&state_dir),
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("tejer.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;

    let template = r#"version: "1.0"
name: my-stack
description: "Managed by tejer"

policy:
  trace: true

nodes: {}

exports: {}
"#;
    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized tejer project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_topology_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_topology(&config);

    if errors.is_empty() {
        println!(
            "OK: {} ({} nodes, {} exports)",
            config.name,
            config.nodes.len(),
            config.exports.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse and validate a topology file, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<types::TopologyConfig, String> {
    let config = parser::parse_topology_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_topology(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

/// Load the inventory file, or an empty static inventory when none given.
fn load_inventory(path: Option<&Path>) -> Result<StaticInventory, String> {
    match path {
        Some(p) => StaticInventory::from_file(p).map_err(|e| e.to_string()),
        None => Ok(StaticInventory::default()),
    }
}

fn cmd_graph(file: &Path) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let graph = Graph::from_config(&config).map_err(|e| e.to_string())?;
    let order = synth::topological_order(&graph).map_err(|e| e.to_string())?;

    println!("Topology: {} ({} nodes)", graph.name(), graph.len());
    println!();

    let edges = graph.edges();
    if edges.is_empty() {
        println!("No edges.");
    } else {
        println!("Edges:");
        for (from, to) in &edges {
            println!("  {} -> {}", from, to);
        }
    }

    println!();
    println!("Execution order:");
    for (i, id) in order.iter().enumerate() {
        println!("  {}. {}", i + 1, id);
    }
    Ok(())
}

fn cmd_synth(
    file: &Path,
    inventory_path: Option<&Path>,
    out: Option<&Path>,
    format: PlanFormat,
    state_dir: &Path,
) -> Result<(), String> {
    let start = Instant::now();
    let config = parse_and_validate(file)?;
    let graph = Graph::from_config(&config).map_err(|e| e.to_string())?;
    let inventory = load_inventory(inventory_path)?;

    let run_id = eventlog::generate_run_id();
    if config.policy.trace {
        let _ = eventlog::append_event(
            state_dir,
            types::SynthEvent::SynthStarted {
                run_id: run_id.clone(),
                topology: config.name.clone(),
                tejer_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        );
    }

    let plan = match synth::synthesize(&graph, &inventory) {
        Ok(plan) => plan,
        Err(e) => {
            if config.policy.trace {
                let _ = eventlog::append_event(
                    state_dir,
                    types::SynthEvent::SynthFailed {
                        run_id,
                        error: e.to_string(),
                    },
                );
            }
            return Err(e.to_string());
        }
    };

    if config.policy.trace {
        let _ = eventlog::append_event(
            state_dir,
            types::SynthEvent::SynthCompleted {
                run_id,
                resources: u32::try_from(plan.resources.len()).unwrap_or(u32::MAX),
                deferred_values: u32::try_from(plan.deferred_count()).unwrap_or(u32::MAX),
                fingerprint: plan.fingerprint.clone(),
                duration_seconds: start.elapsed().as_secs_f64(),
            },
        );
    }

    let rendered = render_plan(&plan, format)?;
    match out {
        Some(path) => {
            std::fs::write(path, rendered)
                .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
            println!(
                "Plan: {} resources, {} deferred value(s), {}",
                plan.resources.len(),
                plan.deferred_count(),
                plan.fingerprint
            );
            println!("Wrote {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn render_plan(plan: &types::Plan, format: PlanFormat) -> Result<String, String> {
    match format {
        PlanFormat::Yaml => {
            serde_yaml_ng::to_string(plan).map_err(|e| format!("serialize error: {}", e))
        }
        PlanFormat::Json => {
            serde_json::to_string_pretty(plan).map_err(|e| format!("serialize error: {}", e))
        }
    }
}

fn cmd_exports(file: &Path, inventory_path: Option<&Path>) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let graph = Graph::from_config(&config).map_err(|e| e.to_string())?;
    let inventory = load_inventory(inventory_path)?;
    let plan = synth::synthesize(&graph, &inventory).map_err(|e| e.to_string())?;

    if plan.exports.is_empty() {
        println!("No exports declared.");
        return Ok(());
    }

    for (name, value) in &plan.exports {
        println!("{} = {}", name, value);
    }
    Ok(())
}

fn cmd_history(state_dir: &Path) -> Result<(), String> {
    let events = eventlog::read_events(state_dir)?;
    if events.is_empty() {
        println!("No synthesis runs recorded. Run `tejer synth` first.");
        return Ok(());
    }

    for te in &events {
        match &te.event {
            types::SynthEvent::SynthStarted {
                run_id, topology, ..
            } => {
                println!("{} {} started ({})", te.ts, run_id, topology);
            }
            types::SynthEvent::SynthCompleted {
                run_id,
                resources,
                deferred_values,
                fingerprint,
                duration_seconds,
            } => {
                println!(
                    "{} {} completed: {} resources, {} deferred, {} ({:.2}s)",
                    te.ts, run_id, resources, deferred_values, fingerprint, duration_seconds
                );
            }
            types::SynthEvent::SynthFailed { run_id, error } => {
                println!("{} {} FAILED: {}", te.ts, run_id, error);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPOLOGY: &str = r#"
version: "1.0"
name: cli-test
policy:
  trace: false
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
      endpoint: { value: "db.internal:5432" }
      password: { deferred: true }
exports:
  db-endpoint: { ref: database.endpoint }
  db-password: { ref: database.password }
"#;

    fn write_topology(dir: &Path) -> PathBuf {
        let path = dir.join("tejer.yaml");
        std::fs::write(&path, TOPOLOGY).unwrap();
        path
    }

    #[test]
    fn test_init() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("test-project");
        std::fs::create_dir_all(&sub).unwrap();
        cmd_init(&sub).unwrap();
        assert!(sub.join("tejer.yaml").exists());
        assert!(sub.join("state").is_dir());
    }

    #[test]
    fn test_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tejer.yaml"), "exists").unwrap();
        let result = cmd_init(dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_init_template_validates() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        cmd_validate(&dir.path().join("tejer.yaml")).unwrap();
    }

    #[test]
    fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_topology(dir.path());
        cmd_validate(&path).unwrap();
    }

    #[test]
    fn test_validate_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tejer.yaml");
        std::fs::write(
            &path,
            r#"
version: "1.0"
name: broken
nodes:
  service:
    kind: t
    inputs:
      endpoint: { ref: ghost.endpoint }
"#,
        )
        .unwrap();
        let err = cmd_validate(&path).unwrap_err();
        assert!(err.contains("validation error"));
    }

    #[test]
    fn test_graph_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_topology(dir.path());
        cmd_graph(&path).unwrap();
    }

    #[test]
    fn test_synth_writes_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_topology(dir.path());
        let out = dir.path().join("plan.yaml");
        let state_dir = dir.path().join("state");

        cmd_synth(&path, None, Some(&out), PlanFormat::Yaml, &state_dir).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        let plan: types::Plan = serde_yaml_ng::from_str(&content).unwrap();
        assert_eq!(plan.name, "cli-test");
        assert_eq!(plan.resources.len(), 2);
        assert!(plan.exports["db-password"].is_deferred());

        // trace disabled in this topology — no event log
        assert!(!state_dir.join("events.jsonl").exists());
    }

    #[test]
    fn test_synth_json_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_topology(dir.path());
        let out = dir.path().join("plan.json");
        let state_dir = dir.path().join("state");

        cmd_synth(&path, None, Some(&out), PlanFormat::Json, &state_dir).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        let plan: types::Plan = serde_json::from_str(&content).unwrap();
        assert_eq!(plan.resources.len(), 2);
    }

    #[test]
    fn test_synth_traces_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tejer.yaml");
        std::fs::write(&path, TOPOLOGY.replace("trace: false", "trace: true")).unwrap();
        let out = dir.path().join("plan.yaml");
        let state_dir = dir.path().join("state");

        cmd_synth(&path, None, Some(&out), PlanFormat::Yaml, &state_dir).unwrap();

        let events = eventlog::read_events(&state_dir).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1].event,
            types::SynthEvent::SynthCompleted { resources: 2, .. }
        ));

        cmd_history(&state_dir).unwrap();
    }

    #[test]
    fn test_synth_failure_is_traced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tejer.yaml");
        // cycle passes static validation, fails synthesis
        std::fs::write(
            &path,
            r#"
version: "1.0"
name: cyclic
nodes:
  a:
    kind: t
    inputs:
      x: { ref: b.out }
    outputs:
      out: { value: 1 }
  b:
    kind: t
    inputs:
      x: { ref: a.out }
    outputs:
      out: { value: 2 }
"#,
        )
        .unwrap();
        let state_dir = dir.path().join("state");

        let err = cmd_synth(&path, None, None, PlanFormat::Yaml, &state_dir).unwrap_err();
        assert!(err.contains("dependency cycle"));

        let events = eventlog::read_events(&state_dir).unwrap();
        assert!(matches!(
            events.last().unwrap().event,
            types::SynthEvent::SynthFailed { .. }
        ));
    }

    #[test]
    fn test_synth_with_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tejer.yaml");
        std::fs::write(
            &path,
            r#"
version: "1.0"
name: looked-up
policy:
  trace: false
nodes:
  vpc:
    kind: network
    inputs:
      id: { lookup: networks/prod }
"#,
        )
        .unwrap();
        let inv = dir.path().join("inventory.yaml");
        std::fs::write(&inv, "networks:\n  prod: vpc-0a1b2c\n").unwrap();
        let out = dir.path().join("plan.yaml");

        cmd_synth(
            &path,
            Some(&inv),
            Some(&out),
            PlanFormat::Yaml,
            &dir.path().join("state"),
        )
        .unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("vpc-0a1b2c"));
    }

    #[test]
    fn test_exports_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_topology(dir.path());
        cmd_exports(&path, None).unwrap();
    }

    #[test]
    fn test_history_empty() {
        let dir = tempfile::tempdir().unwrap();
        cmd_history(dir.path()).unwrap();
    }

    #[test]
    fn test_demo_topology_synthesizes() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let topology = root.join("demos/sonarqube.yaml");
        let inventory = root.join("demos/inventory.yaml");
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plan.yaml");

        cmd_synth(
            &topology,
            Some(&inventory),
            Some(&out),
            PlanFormat::Yaml,
            &dir.path().join("state"),
        )
        .unwrap();

        let plan: types::Plan =
            serde_yaml_ng::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(plan.name, "sonarqube-fargate");
        assert_eq!(plan.resources.len(), 13);
        assert!(plan.exports["alb-listener-arn"].is_deferred());
        assert_eq!(
            plan.exports["cluster-name"],
            types::ResolvedValue::Literal(serde_yaml_ng::Value::String(
                "sonarqube-ecs-cluster".into()
            ))
        );

        // the task definition is wired to the database's deferred credentials
        let task = plan
            .resources
            .iter()
            .find(|r| r.id == "task-definition")
            .unwrap();
        assert!(task.inputs["db-password"].is_deferred());
        assert!(task.after.contains(&"database".to_string()));
    }
}
