//! Runs one example and checks its rendered output

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::{Example, ExampleKind};
use crate::error::{RunnerError, RunnerResult};
use crate::output;
use crate::render::{RenderCheck, Verdict};

/// Result of running a single example
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not run, e.g. its server was not available
    Skipped,
    /// The example process exited with an error
    FailedToStart,
    /// The example ran but its page did not render cleanly
    FailedRender,
    Passed,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// Executes examples. The suite only ever calls this for examples whose
/// server is live; an executor may still decline with [`Outcome::Skipped`].
#[async_trait]
pub trait ExampleExecutor {
    async fn execute(&self, example: &Example) -> RunnerResult<Outcome>;
}

/// Environment every example process is started with
#[derive(Debug, Clone)]
pub struct ExampleEnv {
    /// Development resources and pretty-printed output
    pub dev: bool,
}

impl Default for ExampleEnv {
    fn default() -> Self {
        Self { dev: true }
    }
}

impl ExampleEnv {
    pub fn vars(&self) -> Vec<(&'static str, &'static str)> {
        let mut vars = vec![
            ("BOKEH_RESOURCES", if self.dev { "relative-dev" } else { "relative" }),
            ("BOKEH_BROWSER", "none"),
        ];
        if self.dev {
            vars.push(("BOKEH_PRETTY", "yes"));
        }
        vars
    }
}

/// Runs examples with an interpreter and checks them with the renderer
pub struct ExampleRunner {
    interpreter: String,
    env: ExampleEnv,
    render: RenderCheck,
    interrupt: CancellationToken,
}

impl ExampleRunner {
    pub fn new(
        interpreter: impl Into<String>,
        env: ExampleEnv,
        render: RenderCheck,
        interrupt: CancellationToken,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            env,
            render,
            interrupt,
        }
    }

    /// Run the example's script to completion in its own directory.
    pub async fn run_script(&self, example: &Example) -> RunnerResult<ExitStatus> {
        let file_name = example
            .path
            .file_name()
            .ok_or_else(|| RunnerError::ExampleSpawn {
                path: example.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            })?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(file_name)
            .current_dir(example.dir())
            .stdin(Stdio::null());
        for (key, value) in self.env.vars() {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| RunnerError::ExampleSpawn {
            path: example.path.clone(),
            source,
        })?;
        debug!("Started {} (pid: {:?})", example.path.display(), child.id());

        self.wait(&mut child).await
    }

    /// Wait for `child`, killing it if the run is interrupted first
    async fn wait(&self, child: &mut Child) -> RunnerResult<ExitStatus> {
        let finished = tokio::select! {
            status = child.wait() => Some(status),
            _ = self.interrupt.cancelled() => None,
        };

        match finished {
            Some(status) => Ok(status?),
            None => {
                info!("Killing pid {:?}", child.id());
                let _ = child.kill().await;
                Err(RunnerError::Interrupted)
            }
        }
    }

    /// Render the example's output and print what the renderer reported
    pub async fn check_render(&self, example: &Example) -> RunnerResult<Outcome> {
        let url = self.render.artifact_url(example)?;
        let screenshot = RenderCheck::screenshot_path(example);

        let report = match self.render.invoke(example.kind, &url, &screenshot).await {
            Ok(report) => report,
            Err(RunnerError::ReportParse(reason)) => {
                output::detail(&format!("unreadable render report: {}", reason));
                return Ok(Outcome::FailedRender);
            }
            Err(e) => return Err(e),
        };

        if self.render.config().verbose && report.verdict() != Verdict::LoadFailed {
            for line in report.console_lines() {
                output::detail(&line);
            }
        }

        match report.verdict() {
            Verdict::Passed => Ok(Outcome::Passed),
            Verdict::LoadFailed => {
                output::detail(&format!("could not load {}", url));
                Ok(Outcome::FailedRender)
            }
            Verdict::PageErrors { resources, errors } => {
                output::detail(&format!(
                    "{} resource error(s), {} page error(s)",
                    resources, errors
                ));
                for line in report.problem_lines() {
                    output::detail(&line);
                }
                Ok(Outcome::FailedRender)
            }
        }
    }
}

#[async_trait]
impl ExampleExecutor for ExampleRunner {
    async fn execute(&self, example: &Example) -> RunnerResult<Outcome> {
        match example.kind {
            ExampleKind::File | ExampleKind::Server => {
                let status = self.run_script(example).await?;
                if !status.success() {
                    output::detail(&format!("exited with {}", status));
                    return Ok(Outcome::FailedToStart);
                }
            }
            ExampleKind::Notebook => {}
        }

        self.check_render(example).await
    }
}
