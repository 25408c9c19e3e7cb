// The binary in main.rs is a thin CLI over this library; integration tests
// and criterion benchmarks import the same modules via `examace::*`.

pub mod app;
pub mod bank;
pub mod config;
pub mod engine;
pub mod event;
pub mod generator;
pub mod logging;
pub mod quiz;
pub mod remote;
pub mod session;
pub mod store;
pub mod ui;
