pub mod dispatching;
