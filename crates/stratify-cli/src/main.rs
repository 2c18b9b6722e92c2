//! Stratify - trading strategy interpretation CLI
//!
//! The `stratify` command runs the interpretation core over blueprint
//! documents and prints the result as pretty JSON.
//!
//! ## Commands
//!
//! - `interpret`: full pipeline (graph, connections, validation, confidence)
//! - `graph`: dependency graph and dependency report only
//! - `validate`: validation score only

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use stratify_core::obs::InterpretSpan;
use stratify_core::{
    Blueprint, DependencyGraph, DependencyGraphBuilder, DependencyReport, IdentityNodeMapper,
    InterpretOptions, InterpretRequest, InterpretationResult, StaticBlueprintGenerator,
    StrategyComponent, StrategyFlow, StrategyInterpreter, ValidationResult,
};

#[derive(Parser)]
#[command(name = "stratify")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trading strategy interpretation core", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Options document (TOML)
    #[arg(long, global = true, env = "STRATIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Treat missing risk management as a critical error
    #[arg(long, global = true)]
    strict: bool,

    /// Write the result here instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full interpretation pipeline over a blueprint
    Interpret {
        /// Blueprint document (JSON object or component array)
        input: PathBuf,

        /// Prompt recorded with the request
        #[arg(long, default_value = "")]
        prompt: String,

        /// Explicit flows document (JSON array)
        #[arg(long)]
        flows: Option<PathBuf>,
    },

    /// Build the dependency graph only
    Graph {
        /// Blueprint document (JSON object or component array)
        input: PathBuf,
    },

    /// Score a blueprint without synthesizing connections
    Validate {
        /// Blueprint document (JSON object or component array)
        input: PathBuf,

        /// Explicit flows document (JSON array)
        #[arg(long)]
        flows: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct GraphOutput {
    graph: DependencyGraph,
    warnings: Vec<String>,
    report: DependencyReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    stratify_core::init_tracing(cli.json_logs, level);

    let options = load_options(cli.config.as_deref(), cli.strict)?;
    let output = cli.output.as_deref();

    match cli.command {
        Commands::Interpret {
            input,
            prompt,
            flows,
        } => {
            let result = cmd_interpret(&input, &prompt, flows.as_deref(), options).await?;
            write_json(&result, output)
        }
        Commands::Graph { input } => write_json(&cmd_graph(&input, &options)?, output),
        Commands::Validate { input, flows } => {
            write_json(&cmd_validate(&input, flows.as_deref(), &options)?, output)
        }
    }
}

fn load_options(path: Option<&Path>, strict: bool) -> Result<InterpretOptions> {
    let options = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file {}", path.display()))?;
            InterpretOptions::from_toml_str(&content)
                .with_context(|| format!("Failed to parse options file {}", path.display()))?
        }
        None => InterpretOptions::default(),
    };
    Ok(if strict {
        options.with_strict_mode(true)
    } else {
        options
    })
}

/// Read a blueprint object, or a bare component array.
fn load_blueprint(path: &Path) -> Result<Blueprint> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read blueprint {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    if value.is_array() {
        let components: Vec<StrategyComponent> = serde_json::from_value(value)
            .with_context(|| format!("Invalid component list in {}", path.display()))?;
        return Ok(Blueprint {
            components,
            confidence: 1.0,
            ..Blueprint::default()
        });
    }
    serde_json::from_value(value)
        .with_context(|| format!("Invalid blueprint in {}", path.display()))
}

fn load_flows(path: &Path) -> Result<Vec<StrategyFlow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read flows {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid flows in {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_interpret(
    input: &Path,
    prompt: &str,
    flows: Option<&Path>,
    options: InterpretOptions,
) -> Result<InterpretationResult> {
    let blueprint = load_blueprint(input)?;
    let mut request = InterpretRequest::new(prompt);
    if let Some(path) = flows {
        request = request.with_flows(load_flows(path)?);
    }

    let interpreter = StrategyInterpreter::new(
        Arc::new(StaticBlueprintGenerator::new(blueprint)),
        Arc::new(IdentityNodeMapper::default()),
        options,
    );
    let result = interpreter.interpret(&request).await.with_context(|| {
        format!("Interpretation of {} failed", input.display())
    })?;
    info!(
        run_id = %result.run_id,
        score = result.validation.score,
        valid = result.validation.is_valid,
        "Interpretation complete"
    );
    Ok(result)
}

fn graph_builder(options: &InterpretOptions) -> DependencyGraphBuilder {
    DependencyGraphBuilder::default()
        .with_max_level_iterations(options.max_level_iterations)
        .with_candidate_weights(options.candidates.clone())
}

fn cmd_graph(input: &Path, options: &InterpretOptions) -> Result<GraphOutput> {
    let _span = InterpretSpan::enter(&input.display().to_string());
    let blueprint = load_blueprint(input)?;
    let builder = graph_builder(options);
    let build = builder
        .build(&blueprint.components)
        .context("Failed to build dependency graph")?;
    let report = builder.validate(&build.graph);
    Ok(GraphOutput {
        graph: build.graph,
        warnings: build.warnings,
        report,
    })
}

/// Flows for scoring: the explicit document, the blueprint's own flows, or
/// one flow per dependency edge.
fn cmd_validate(
    input: &Path,
    flows: Option<&Path>,
    options: &InterpretOptions,
) -> Result<ValidationResult> {
    let _span = InterpretSpan::enter(&input.display().to_string());
    let blueprint = load_blueprint(input)?;
    let flows = match (flows, &blueprint.flows) {
        (Some(path), _) => load_flows(path)?,
        (None, Some(flows)) => flows.clone(),
        (None, None) => {
            let build = graph_builder(options)
                .build(&blueprint.components)
                .context("Failed to build dependency graph")?;
            build
                .graph
                .edges
                .iter()
                .enumerate()
                .map(|(i, e)| StrategyFlow {
                    id: format!("edge-{i}"),
                    source: e.from.clone(),
                    target: e.to.clone(),
                    kind: Some(e.kind.connection_kind()),
                })
                .collect()
        }
    };

    let engine = stratify_core::ValidationEngine::new(
        stratify_core::CompatibilityMatrix::standard(),
        options.validation_options(),
    );
    Ok(engine.score(&blueprint.components, &flows, blueprint.risk_profile.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUEPRINT: &str = r#"{
        "name": "rsi reversal",
        "confidence": 0.9,
        "components": [
            {"id": "d1", "type": "data-source", "subtype": "ohlcv", "label": "BTC candles",
             "parameters": {"symbol": "BTCUSD"}},
            {"id": "i1", "type": "indicator", "subtype": "rsi", "label": "RSI 14",
             "parameters": {"period": 14}},
            {"id": "c1", "type": "condition", "subtype": "entry_oversold", "label": "RSI below 30"},
            {"id": "a1", "type": "action", "subtype": "buy", "label": "Market buy"},
            {"id": "r1", "type": "risk", "subtype": "stop_loss", "label": "2% stop",
             "parameters": {"stop_loss_percent": 2.0}}
        ]
    }"#;

    fn write_blueprint(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("blueprint.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_interpret_writes_result_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_blueprint(&dir, BLUEPRINT);
        let result = cmd_interpret(&input, "rsi", None, InterpretOptions::default())
            .await
            .unwrap();
        assert_eq!(result.graph.execution_order, vec!["d1", "i1", "c1", "a1", "r1"]);

        let out = dir.path().join("result.json");
        write_json(&result, Some(&out)).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["connections"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_interpret_reports_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_blueprint(
            &dir,
            r#"[
                {"id": "X", "type": "indicator", "subtype": "a", "dependencies": ["Y"]},
                {"id": "Y", "type": "indicator", "subtype": "b", "dependencies": ["X"]}
            ]"#,
        );
        let err = cmd_interpret(&input, "", None, InterpretOptions::default())
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("dependency cycle detected"), "{msg}");
    }

    #[test]
    fn test_graph_command_accepts_component_array() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_blueprint(
            &dir,
            r#"[{"id": "d1", "type": "data-source", "subtype": "ohlcv"},
                {"id": "i1", "type": "indicator", "subtype": "sma"}]"#,
        );
        let out = cmd_graph(&input, &InterpretOptions::default()).unwrap();
        assert_eq!(out.graph.execution_order, vec!["d1", "i1"]);
        assert!(out.report.missing.is_empty());
    }

    #[test]
    fn test_graph_command_reports_demo_cycle() {
        let input =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/mutual_dependency.json");
        let out = cmd_graph(&input, &InterpretOptions::default()).unwrap();
        assert!(out.graph.has_cycles);
        assert_eq!(out.graph.cycles[0], vec!["X", "Y", "X"]);
        assert!(out.graph.execution_order.is_empty());
    }

    #[test]
    fn test_validate_strict_without_risk_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_blueprint(
            &dir,
            r#"[{"id": "d1", "type": "data-source", "subtype": "ohlcv",
                 "parameters": {"symbol": "ES"}},
                {"id": "a1", "type": "action", "subtype": "buy"}]"#,
        );
        let strict = load_options(None, true).unwrap();
        let result = cmd_validate(&input, None, &strict).unwrap();
        assert!(!result.is_valid);

        let lenient = cmd_validate(&input, None, &InterpretOptions::default()).unwrap();
        assert!(lenient.is_valid);
    }

    #[test]
    fn test_options_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "max_connections_per_node = 2\n").unwrap();
        let options = load_options(Some(&path), false).unwrap();
        assert_eq!(options.max_connections_per_node, 2);
        assert!(!options.strict_mode);
    }

    #[test]
    fn test_missing_input_has_context() {
        let err = load_blueprint(Path::new("/nonexistent/blueprint.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read blueprint"));
    }
}
