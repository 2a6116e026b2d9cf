//! Deployment steps: argument assembly and the teardown/build/run planner.

pub mod commands;
pub mod orchestrator;
mod types;

pub use commands::{EngineArgs, ip_for_subnet, is_ipv4, run_args};
pub use orchestrator::DeploymentPlanner;
pub use types::{DeployError, DeployReport, DeployResult, DeployStep, TeardownSummary};
