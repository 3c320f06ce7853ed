pub mod classifier;
pub mod domain;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod traits;
pub mod workspace;
