pub mod config;
pub mod core;
/// Native module contains implementations of core traits
/// that spawn toolchain processes directly on the host.
pub mod native;
pub mod stubs;

pub use crate::config::{Config, ConfigError};
pub use crate::core::domain::{ExecutionOutcome, ExecutionRequest, FailureKind, Language};
pub use crate::core::orchestrator::CodeExecutor;
pub use crate::core::pipeline::dispatching::ExecutionQueue;
pub use crate::core::registry::LanguageRegistry;
