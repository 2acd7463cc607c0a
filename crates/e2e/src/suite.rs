//! Runs the selected examples and turns their outcomes into an exit status

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::catalog::Example;
use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::output;
use crate::render::RenderCheck;
use crate::runner::{ExampleExecutor, ExampleRunner, Outcome};
use crate::server::{ServerKind, ServerManager, ServerPool};

/// Running totals for a suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub discovered: usize,
    pub run: usize,
    pub passed: usize,
}

/// Overall result of a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteStatus {
    AllPassed,
    /// Nothing failed, but some examples were skipped or never reached
    NotAllRun,
    Failures,
}

impl SuiteStatus {
    pub fn from_counters(counters: &Counters) -> Self {
        if counters.passed < counters.run {
            SuiteStatus::Failures
        } else if counters.run < counters.discovered {
            SuiteStatus::NotAllRun
        } else {
            SuiteStatus::AllPassed
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            SuiteStatus::AllPassed | SuiteStatus::NotAllRun => 0,
            SuiteStatus::Failures => 1,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SuiteStatus::AllPassed => "ALL TESTS PASS",
            SuiteStatus::NotAllRun => "NOT ALL EXAMPLES WERE RUN",
            SuiteStatus::Failures => "FIX FAILURES AND TRY AGAIN",
        }
    }

    pub fn print(&self) {
        match self {
            SuiteStatus::AllPassed => output::ok(self.message()),
            SuiteStatus::NotAllRun => output::warn(self.message()),
            SuiteStatus::Failures => output::fail(self.message()),
        }
    }
}

/// What a finished (or interrupted) suite produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteReport {
    pub counters: Counters,
    pub interrupted: bool,
}

impl SuiteReport {
    pub fn status(&self) -> SuiteStatus {
        SuiteStatus::from_counters(&self.counters)
    }
}

/// Servers needed by at least one of `examples`, in start order
pub fn required_servers(examples: &[Example]) -> Vec<ServerKind> {
    let mut kinds: Vec<ServerKind> = examples
        .iter()
        .filter_map(|example| example.kind.required_server())
        .collect();
    kinds.sort();
    kinds.dedup();
    kinds
}

/// Start the servers `examples` need, run them all and tear the servers down
pub async fn run(
    config: &RunnerConfig,
    examples: &[Example],
    interrupt: &CancellationToken,
) -> RunnerResult<SuiteReport> {
    let needs = required_servers(examples);
    let mut servers = ServerManager::start(&needs, &config.server).await?;

    let render = RenderCheck::new(config.render.clone(), interrupt.clone());
    let runner = ExampleRunner::new(
        config.interpreter.clone(),
        config.env.clone(),
        render,
        interrupt.clone(),
    );

    run_suite(examples, &mut servers, &runner, interrupt).await
}

/// Run every example once, then shut the servers in `pool` down.
///
/// Teardown happens whether the loop finishes, is interrupted, or stops on a
/// fatal error.
pub async fn run_suite<P, E>(
    examples: &[Example],
    pool: &mut P,
    executor: &E,
    interrupt: &CancellationToken,
) -> RunnerResult<SuiteReport>
where
    P: ServerPool + ?Sized,
    E: ExampleExecutor + ?Sized,
{
    let result = run_examples(examples, pool, executor, interrupt).await;
    pool.shutdown();
    result
}

async fn run_examples<P, E>(
    examples: &[Example],
    pool: &mut P,
    executor: &E,
    interrupt: &CancellationToken,
) -> RunnerResult<SuiteReport>
where
    P: ServerPool + ?Sized,
    E: ExampleExecutor + ?Sized,
{
    let mut counters = Counters {
        discovered: examples.len(),
        ..Default::default()
    };

    for example in examples {
        if interrupt.is_cancelled() {
            output::warn("INTERRUPTED");
            return Ok(SuiteReport {
                counters,
                interrupted: true,
            });
        }

        let start = Instant::now();
        let outcome = match example.kind.required_server() {
            Some(server) if !pool.is_live(server) => {
                output::warn(&format!(
                    "{} skipped: {} is not running",
                    example.path.display(),
                    server
                ));
                Outcome::Skipped
            }
            _ => {
                output::info(&format!("{} ({})", example.path.display(), example.kind));
                match executor.execute(example).await {
                    Ok(outcome) => outcome,
                    Err(RunnerError::Interrupted) => {
                        // The example was started, so it counts as run but not passed.
                        counters.run += 1;
                        output::warn("INTERRUPTED");
                        return Ok(SuiteReport {
                            counters,
                            interrupted: true,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let elapsed_ms = start.elapsed().as_millis();
        match outcome {
            Outcome::Skipped => debug!("Skipped {}", example.path.display()),
            Outcome::Passed => {
                counters.run += 1;
                counters.passed += 1;
                output::ok(&format!("{} ({} ms)", example.path.display(), elapsed_ms));
            }
            Outcome::FailedToStart | Outcome::FailedRender => {
                counters.run += 1;
                output::fail(&format!("{} ({} ms)", example.path.display(), elapsed_ms));
            }
        }
    }

    debug!("Suite finished: {:?}", counters);
    Ok(SuiteReport {
        counters,
        interrupted: false,
    })
}
