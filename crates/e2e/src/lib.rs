//! Example smoke tests
//!
//! Runs every example script and notebook, renders what each one produced in
//! a headless browser and fails when the page did not load cleanly:
//! - Builds the example catalog from the configured directories
//! - Starts the visualization server when server examples are selected
//! - Runs each example with development resources and no browser
//! - Reads the renderer's JSON report for console output, failed resources
//!   and page errors
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Catalog::build()  ->  Selection::filter()                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  suite::run()                                               │
//! │    ├── ServerManager::start(required_servers) -> pool       │
//! │    ├── run_suite(examples, pool, ExampleRunner)             │
//! │    │     ├── skip when the example's server is not live     │
//! │    │     ├── ExampleRunner::run_script()  (file, server)    │
//! │    │     └── RenderCheck::invoke() -> RenderReport          │
//! │    └── pool.shutdown()                                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteStatus::from_counters() -> exit code                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod output;
pub mod render;
pub mod runner;
pub mod selection;
pub mod server;
pub mod suite;

pub use catalog::{Catalog, Example, ExampleKind};
pub use config::RunnerConfig;
pub use error::{RunnerError, RunnerResult};
pub use selection::Selection;
pub use suite::{SuiteReport, SuiteStatus};
