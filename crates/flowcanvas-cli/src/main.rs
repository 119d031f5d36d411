//! `flowcanvas`: plan, lay out, validate or simulate a workflow graph stored as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use flowcanvas_core::runtime::ProgressCallback;
use flowcanvas_core::{
    Direction, ExecutionRequest, LayoutOptions, WorkerConfig, WorkerHandle, WorkflowGraph,
    WorkflowWorker, build_execution_plan, init_observability,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Workflow graph tooling: execution planning, layered layout and simulated runs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the execution batches
    Plan {
        /// Graph JSON file holding `nodes` and `edges`
        graph: PathBuf,
    },
    /// Print the graph with recomputed node positions
    Layout {
        graph: PathBuf,
        /// Rank direction: TB, BT, LR or RL
        #[arg(long, default_value = "TB")]
        direction: Direction,
        /// Keep each node's current x and only apply the computed y
        #[arg(long)]
        preserve_x: bool,
    },
    /// Check for start/end nodes and cycles
    Validate { graph: PathBuf },
    /// Run the simulated execution and print the result
    Execute {
        graph: PathBuf,
        #[arg(long, default_value = "cli")]
        workflow_id: String,
        /// JSON object seeded into the results store
        #[arg(long)]
        inputs: Option<String>,
    },
}

fn load_graph(path: &Path) -> CliResult<WorkflowGraph> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let graph = serde_json::from_str(&raw)
        .map_err(|e| format!("invalid graph JSON in {}: {e}", path.display()))?;
    Ok(graph)
}

fn parse_inputs(raw: Option<&str>) -> CliResult<Map<String, Value>> {
    match raw {
        None => Ok(Map::new()),
        Some(text) => match serde_json::from_str(text)? {
            Value::Object(map) => Ok(map),
            other => Err(format!("--inputs must be a JSON object, got {other}").into()),
        },
    }
}

fn print_json(value: &impl Serialize) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Plan { graph } => {
            let graph = load_graph(&graph)?;
            match build_execution_plan(&graph.nodes, &graph.edges) {
                Ok(plan) => {
                    print_json(&plan)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("{e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Layout {
            graph,
            direction,
            preserve_x,
        } => {
            let graph = load_graph(&graph)?;
            let worker = WorkerHandle::spawn(WorkflowWorker::new(WorkerConfig::from_env()));
            let options = LayoutOptions::new(direction).preserve_x(preserve_x);
            let laid_out = worker
                .compute_layout(graph.nodes, graph.edges, options)
                .await?;
            print_json(&laid_out)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { graph } => {
            let graph = load_graph(&graph)?;
            let worker = WorkerHandle::spawn(WorkflowWorker::new(WorkerConfig::from_env()));
            let report = worker.validate_workflow(graph.nodes, graph.edges).await?;
            print_json(&report)?;
            Ok(exit_code(report.valid))
        }
        Command::Execute {
            graph,
            workflow_id,
            inputs,
        } => {
            let graph = load_graph(&graph)?;
            let inputs = parse_inputs(inputs.as_deref())?;
            let worker = WorkerHandle::spawn(WorkflowWorker::new(WorkerConfig::from_env()));
            let progress: ProgressCallback = Arc::new(|event| {
                info!(
                    node_id = %event.node_id,
                    status = ?event.status,
                    progress = event.progress,
                    "node finished"
                );
            });
            worker.set_progress_callback(Some(progress)).await?;
            let request =
                ExecutionRequest::new(workflow_id, graph.nodes, graph.edges).with_inputs(inputs);
            let result = worker.execute_workflow(request).await?;
            print_json(&result)?;
            Ok(exit_code(result.is_completed()))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_observability();
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
