//! Headless render check - drives the external renderer and reads its JSON report

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::catalog::{Example, ExampleKind};
use crate::error::{RunnerError, RunnerResult};

/// Whether the renderer managed to open the page at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Ok,
    Fail,
    #[serde(other)]
    Unknown,
}

/// A `console.log` style message emitted by the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub msg: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
}

impl ConsoleMessage {
    pub fn render(&self) -> String {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => format!("{}:{}: {}", source, line, self.msg),
            _ => self.msg.clone(),
        }
    }
}

/// A resource the page failed to load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceFailure {
    pub url: String,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default, rename = "statusText")]
    pub status_text: Option<String>,
}

impl ResourceFailure {
    pub fn render(&self) -> String {
        let status = self
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "Resource error:: {} ({}: {})",
            self.url,
            status,
            self.status_text.as_deref().unwrap_or("")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFrame {
    pub file: String,
    #[serde(default)]
    pub line: Option<u64>,
}

/// An uncaught error raised by the page's scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageError {
    pub msg: String,
    #[serde(default)]
    pub trace: Vec<TraceFrame>,
}

impl PageError {
    /// The error line followed by one line per stack frame
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![format!("Page error:: {}", self.msg)];
        lines.extend(self.trace.iter().map(|frame| match frame.line {
            Some(line) => format!("  {}:{}", frame.file, line),
            None => format!("  {}", frame.file),
        }));
        lines
    }
}

/// The renderer's report for one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderReport {
    pub status: LoadStatus,
    #[serde(default)]
    pub messages: Vec<ConsoleMessage>,
    #[serde(default)]
    pub resources: Vec<ResourceFailure>,
    #[serde(default)]
    pub errors: Vec<PageError>,
}

/// Classification of a render report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// The page could not be loaded at all
    LoadFailed,
    /// The page loaded but reported broken resources or script errors
    PageErrors { resources: usize, errors: usize },
}

impl RenderReport {
    pub fn from_json(json: &str) -> RunnerResult<Self> {
        serde_json::from_str(json).map_err(|e| RunnerError::ReportParse(e.to_string()))
    }

    pub fn verdict(&self) -> Verdict {
        if self.status == LoadStatus::Fail {
            return Verdict::LoadFailed;
        }
        if self.resources.is_empty() && self.errors.is_empty() {
            Verdict::Passed
        } else {
            Verdict::PageErrors {
                resources: self.resources.len(),
                errors: self.errors.len(),
            }
        }
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.messages.iter().map(ConsoleMessage::render).collect()
    }

    /// Resource failures first, then page errors with their stack frames
    pub fn problem_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.resources.iter().map(ResourceFailure::render).collect();
        for error in &self.errors {
            lines.extend(error.render());
        }
        lines
    }
}

/// Invokes the renderer for examples
#[derive(Debug, Clone)]
pub struct RenderCheck {
    config: RenderConfig,
    interrupt: CancellationToken,
}

impl RenderCheck {
    pub fn new(config: RenderConfig, interrupt: CancellationToken) -> Self {
        Self { config, interrupt }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// URL the rendered output of `example` is served from
    pub fn artifact_url(&self, example: &Example) -> RunnerResult<String> {
        let stem = example.stem();
        let url = match example.kind {
            ExampleKind::File => {
                let html = absolute(example.dir())?.join(format!("{}.html", stem));
                format!("file://{}", html.display())
            }
            ExampleKind::Server => format!(
                "http://localhost:{}/bokeh/doc/{}/show",
                self.config.bokeh_port, stem
            ),
            ExampleKind::Notebook => format!(
                "http://localhost:{}/notebooks/{}.ipynb",
                self.config.ipython_port, stem
            ),
        };
        Ok(url)
    }

    /// Where the renderer saves its screenshot of `example`
    pub fn screenshot_path(example: &Example) -> PathBuf {
        example.dir().join(format!("{}.png", example.stem()))
    }

    /// Render `url` and parse the report.
    ///
    /// Failing to start the renderer is fatal; output that is not a report
    /// is returned as [`RunnerError::ReportParse`].
    pub async fn invoke(
        &self,
        kind: ExampleKind,
        url: &str,
        screenshot: &Path,
    ) -> RunnerResult<RenderReport> {
        debug!("Rendering {} ({})", url, kind);

        let mut child = Command::new(&self.config.program)
            .arg(&self.config.script)
            .arg(kind.as_str())
            .arg(url)
            .arg(screenshot)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RunnerError::RendererSpawn {
                program: self.config.program.clone(),
                source,
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ReportParse("renderer stdout was not captured".into()))?;
        let mut output = Vec::new();

        let finished = tokio::select! {
            res = async {
                stdout.read_to_end(&mut output).await?;
                child.wait().await
            } => Some(res),
            _ = self.interrupt.cancelled() => None,
        };

        let status = match finished {
            Some(status) => status?,
            None => {
                let _ = child.kill().await;
                return Err(RunnerError::Interrupted);
            }
        };
        debug!("Renderer exited with {}", status);

        RenderReport::from_json(String::from_utf8_lossy(&output).trim())
    }
}

fn absolute(path: &Path) -> RunnerResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Renderer executable
    pub program: String,

    /// Script passed as the renderer's first argument
    pub script: PathBuf,

    pub bokeh_port: u16,

    pub ipython_port: u16,

    /// Print every console message of the page
    pub verbose: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            program: "phantomjs".to_string(),
            script: PathBuf::from("examples/test.js"),
            bokeh_port: 5006,
            ipython_port: 8888,
            verbose: false,
        }
    }
}
