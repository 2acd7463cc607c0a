//! Runner configuration

use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, Example};
use crate::error::RunnerResult;
use crate::render::RenderConfig;
use crate::runner::ExampleEnv;
use crate::selection::Selection;
use crate::server::ServerConfig;

/// Everything a run needs besides the selection patterns
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Root the catalog directories are resolved against
    pub base_dir: PathBuf,

    pub catalog: Catalog,

    /// Interpreter examples are run with
    pub interpreter: String,

    pub env: ExampleEnv,

    pub server: ServerConfig,

    pub render: RenderConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::for_base_dir("examples")
    }
}

impl RunnerConfig {
    /// Default layout rooted at `base_dir`, with the renderer script inside it
    pub fn for_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            render: RenderConfig {
                script: base_dir.join("test.js"),
                ..Default::default()
            },
            base_dir,
            catalog: Catalog::default(),
            interpreter: "python".to_string(),
            env: ExampleEnv::default(),
            server: ServerConfig::default(),
        }
    }

    /// Use `interpreter` for the examples and for the server dependency probe
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        let interpreter = interpreter.into();
        if let Some(program) = self.server.probe.first_mut() {
            *program = interpreter.clone();
        }
        self.interpreter = interpreter;
        self
    }

    /// Replace the built-in directory layout with one read from YAML
    pub fn with_catalog_file(mut self, path: &Path) -> RunnerResult<Self> {
        self.catalog = Catalog::from_file(path)?;
        Ok(self)
    }

    /// The catalog narrowed down to `selection`, in catalog order
    pub fn selected_examples(&self, selection: &Selection) -> RunnerResult<Vec<Example>> {
        let examples = self.catalog.build(&self.base_dir)?;
        Ok(selection.filter(&self.base_dir, examples))
    }
}
