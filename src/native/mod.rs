pub mod compiler;
pub mod process;
pub mod runner;
