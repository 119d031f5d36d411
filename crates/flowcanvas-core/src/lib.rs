pub mod cache;
pub mod config;
pub mod expression;
pub mod handler;
pub mod layout;
pub mod model;
pub mod observability;
pub mod planner;
pub mod runtime;
pub mod validation;
pub mod worker;

// Host-facing API: graph types, the planner and layout entry points, and the worker.
pub use config::WorkerConfig;
pub use handler::{HandlerRegistry, NodeHandler};
pub use layout::{Direction, LayoutOptions, LayoutResult, compute_layout};
pub use model::{Edge, Node, NodeType, WorkflowGraph};
pub use observability::init_observability;
pub use planner::{ExecutionPlan, PlanError, build_execution_plan};
pub use runtime::{ExecutionRequest, ExecutionResult, ExecutionStatus, ProgressEvent};
pub use validation::{ValidationReport, validate_workflow};
pub use worker::{WorkerError, WorkerHandle, WorkflowWorker};
