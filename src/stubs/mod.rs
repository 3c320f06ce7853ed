//! Canned compiler and runner with a configurable delay, for wiring a
//! service without toolchains or for exercising concurrency.
pub mod compiler;
pub mod runner;
