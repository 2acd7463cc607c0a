//! Auxiliary servers - spawning, readiness polling and teardown

use std::fmt;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{RunnerError, RunnerResult};

/// The auxiliary servers some examples depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServerKind {
    /// Serves documents pushed by server examples
    Visualization,
    /// Serves notebook examples
    Notebook,
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerKind::Visualization => f.write_str("bokeh-server"),
            ServerKind::Notebook => f.write_str("ipython notebook"),
        }
    }
}

/// Liveness and teardown of the servers a run was started with
pub trait ServerPool {
    /// Whether a server of this kind was started and is still running
    fn is_live(&mut self, kind: ServerKind) -> bool;

    /// Stop every started server. Calling it again is a no-op.
    fn shutdown(&mut self);
}

/// Handle to a running server process
pub struct ServerHandle {
    child: Child,
    pub kind: ServerKind,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn the visualization server and wait until it answers its ping endpoint
    pub async fn spawn(config: &ServerConfig) -> RunnerResult<Self> {
        info!("Spawning {} on port {}", config.program, config.port);

        let child = Command::new(&config.program)
            .args(&config.args)
            .arg(format!("--port={}", config.port))
            .arg(format!("--backend={}", config.backend))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                RunnerError::ServerStartup(format!("Failed to spawn {}: {}", config.program, e))
            })?;

        let mut handle = ServerHandle {
            child,
            kind: ServerKind::Visualization,
            port: config.port,
        };

        // On error the handle is dropped here, which stops the process.
        config.health_check().wait(Some(&mut handle.child)).await?;

        info!("{} is ready on port {}", handle.kind, handle.port);
        Ok(handle)
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn is_live(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Stop the server: SIGTERM first, then kill whatever is left
    pub fn stop(&mut self) -> RunnerResult<()> {
        if !self.is_live() {
            debug!("{} (pid: {}) already exited", self.kind, self.pid());
            return Ok(());
        }

        info!("Stopping {} (pid: {})", self.kind, self.pid());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                let deadline = Instant::now() + STOP_GRACE_PERIOD;
                while Instant::now() < deadline {
                    if !self.is_live() {
                        return Ok(());
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }

        let _ = self.child.kill();
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

const STOP_GRACE_PERIOD: Duration = Duration::from_millis(500);

const MAX_REQUEST_TIME: Duration = Duration::from_secs(2);

/// Polls an HTTP endpoint until it answers with a success status
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub url: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl HealthCheck {
    /// Wait until the endpoint is ready.
    ///
    /// When `child` is given, its early exit fails the wait immediately.
    pub async fn wait(&self, mut child: Option<&mut Child>) -> RunnerResult<()> {
        let client = reqwest::Client::builder().build()?;

        let deadline = Instant::now() + self.timeout;
        let mut attempts = 0;

        loop {
            attempts += 1;

            if let Some(child) = child.as_mut() {
                if let Some(status) = child.try_wait()? {
                    return Err(RunnerError::ServerStartup(format!(
                        "process exited with {} before answering {}",
                        status, self.url
                    )));
                }
            }

            // A request never outlives the deadline
            let remaining = deadline.saturating_duration_since(Instant::now());
            let request = client
                .get(&self.url)
                .timeout(remaining.min(MAX_REQUEST_TIME).max(Duration::from_millis(1)));

            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("{} ready after {} attempt(s)", self.url, attempts);
                    return Ok(());
                }
                Ok(resp) => {
                    debug!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() && !e.is_timeout() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(RunnerError::ServerHealthCheck {
                    url: self.url.clone(),
                    timeout: self.timeout,
                    attempts,
                });
            }

            sleep(self.interval).await;
        }
    }
}

/// Configuration for the visualization server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server executable
    pub program: String,

    /// Arguments placed before `--port` and `--backend`
    pub args: Vec<String>,

    /// Storage backend passed as `--backend`
    pub backend: String,

    pub port: u16,

    /// Path answered once the server is ready
    pub ping_path: String,

    /// Command that succeeds only when the server's runtime is installed
    pub probe: Vec<String>,

    pub poll_interval: Duration,

    pub startup_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            program: "bokeh-server".to_string(),
            args: Vec::new(),
            backend: "memory".to_string(),
            port: 5006,
            ping_path: "/bokeh/ping".to_string(),
            probe: vec![
                "python".to_string(),
                "-c".to_string(),
                "import bokeh.server".to_string(),
            ],
            poll_interval: Duration::from_millis(10),
            startup_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn health_check(&self) -> HealthCheck {
        HealthCheck {
            url: format!("http://localhost:{}{}", self.port, self.ping_path),
            interval: self.poll_interval,
            timeout: self.startup_timeout,
        }
    }
}

/// Run the dependency probe; an empty probe always succeeds
pub async fn dependency_available(probe: &[String]) -> bool {
    let Some((program, args)) = probe.split_first() else {
        return true;
    };

    let status = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    matches!(status, Ok(status) if status.success())
}

/// Owns the auxiliary servers for the duration of a run
#[derive(Default)]
pub struct ServerManager {
    visualization: Option<ServerHandle>,
    notebook: Option<ServerHandle>,
}

impl ServerManager {
    /// Start the servers of the given kinds.
    ///
    /// A kind whose runtime dependency is missing is left unstarted. A server
    /// that is spawned but never becomes ready is a fatal error.
    pub async fn start(needs: &[ServerKind], config: &ServerConfig) -> RunnerResult<Self> {
        let mut manager = Self::default();

        if needs.contains(&ServerKind::Visualization) {
            if dependency_available(&config.probe).await {
                manager.visualization = Some(ServerHandle::spawn(config).await?);
            } else {
                warn!(
                    "{} is not available ({}), server examples will be skipped",
                    ServerKind::Visualization,
                    config.probe.join(" ")
                );
            }
        }

        if needs.contains(&ServerKind::Notebook) {
            manager.notebook = start_notebook();
        }

        Ok(manager)
    }

    pub fn handle(&self, kind: ServerKind) -> Option<&ServerHandle> {
        match kind {
            ServerKind::Visualization => self.visualization.as_ref(),
            ServerKind::Notebook => self.notebook.as_ref(),
        }
    }
}

/// Notebook examples need a running notebook server, which this runner does
/// not manage; they are always skipped.
fn start_notebook() -> Option<ServerHandle> {
    info!("{} support is not available, notebook examples will be skipped", ServerKind::Notebook);
    None
}

impl ServerPool for ServerManager {
    fn is_live(&mut self, kind: ServerKind) -> bool {
        let slot = match kind {
            ServerKind::Visualization => &mut self.visualization,
            ServerKind::Notebook => &mut self.notebook,
        };
        slot.as_mut().is_some_and(ServerHandle::is_live)
    }

    fn shutdown(&mut self) {
        for slot in [&mut self.visualization, &mut self.notebook] {
            if let Some(mut handle) = slot.take() {
                if let Err(e) = handle.stop() {
                    warn!("Failed to stop {}: {}", handle.kind, e);
                }
            }
        }
    }
}

impl Drop for ServerManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
