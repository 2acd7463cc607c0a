//! examples-e2e - run the examples and check that each one renders cleanly

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use examples_e2e::output;
use examples_e2e::{suite, RunnerConfig, Selection};

#[derive(Parser, Debug)]
#[command(name = "examples-e2e")]
#[command(author, version, about = "Run the examples and check that each one renders cleanly")]
struct Args {
    /// Only run examples whose path contains, or glob-matches, one of these patterns
    patterns: Vec<String>,

    /// Port of the visualization server
    #[arg(long, default_value_t = 5006)]
    bokeh_port: u16,

    /// Port of the notebook server
    #[arg(long, default_value_t = 8888)]
    ipython_port: u16,

    /// Headless renderer executable
    #[arg(long, default_value = "phantomjs")]
    phantomjs: String,

    /// Print the console messages of every rendered page
    #[arg(short, long)]
    verbose: bool,

    /// Use release resources instead of development ones
    #[arg(long)]
    no_dev: bool,

    /// Directory holding the examples and the renderer script
    #[arg(long, default_value = "examples")]
    base_dir: PathBuf,

    /// YAML file replacing the built-in example directory layout
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Interpreter the examples are run with
    #[arg(long, default_value = "python")]
    python: String,

    /// Print the selected examples and exit
    #[arg(long)]
    list: bool,

    /// How long to wait for the visualization server to answer
    #[arg(long, default_value_t = 5000)]
    server_timeout_ms: u64,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level(args.verbose))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let code = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt.block_on(async_main(args)),
        Err(e) => {
            output::fail(&format!("Failed to create tokio runtime: {}", e));
            1
        }
    };

    std::process::exit(code);
}

async fn async_main(args: Args) -> i32 {
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            output::fail(&format!("{:#}", e));
            1
        }
    }
}

/// Default filter when `RUST_LOG` is unset
fn log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

fn build_config(args: &Args) -> anyhow::Result<RunnerConfig> {
    let mut config = RunnerConfig::for_base_dir(&args.base_dir).with_interpreter(&args.python);

    if let Some(path) = &args.catalog {
        config = config
            .with_catalog_file(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?;
    }

    config.env.dev = !args.no_dev;
    config.server.port = args.bokeh_port;
    config.server.startup_timeout = Duration::from_millis(args.server_timeout_ms);
    config.render.program = args.phantomjs.clone();
    config.render.bokeh_port = args.bokeh_port;
    config.render.ipython_port = args.ipython_port;
    config.render.verbose = args.verbose;

    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<i32> {
    let config = build_config(&args)?;
    let selection = Selection::new(args.patterns.iter().cloned());

    let examples = config
        .selected_examples(&selection)
        .context("failed to enumerate examples")?;
    debug!("{} example(s) selected", examples.len());

    if args.list {
        for example in &examples {
            println!("{:<8} {}", example.kind.as_str(), example.path.display());
        }
        return Ok(0);
    }

    let interrupt = CancellationToken::new();
    tokio::spawn({
        let interrupt = interrupt.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        }
    });

    let report = suite::run(&config, &examples, &interrupt).await?;

    let counters = report.counters;
    output::info(&format!(
        "{} discovered, {} run, {} passed",
        counters.discovered, counters.run, counters.passed
    ));
    let status = report.status();
    status.print();

    Ok(status.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["examples-e2e"]);
        let config = build_config(&args).unwrap();

        assert!(args.patterns.is_empty());
        assert!(config.env.dev);
        assert!(!config.render.verbose);
        assert_eq!(config.server.port, 5006);
        assert_eq!(config.render.ipython_port, 8888);
        assert_eq!(config.render.program, "phantomjs");
        assert_eq!(config.server.startup_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "examples-e2e",
            "glyph",
            "*/line*.py",
            "--bokeh-port",
            "7000",
            "--ipython-port",
            "9999",
            "--phantomjs",
            "/opt/phantomjs",
            "--verbose",
            "--no-dev",
            "--python",
            "python3",
        ]);
        let config = build_config(&args).unwrap();

        assert_eq!(args.patterns, vec!["glyph", "*/line*.py"]);
        assert!(!config.env.dev);
        assert!(config.render.verbose);
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.render.bokeh_port, 7000);
        assert_eq!(config.render.ipython_port, 9999);
        assert_eq!(config.render.program, "/opt/phantomjs");
        assert_eq!(config.interpreter, "python3");
    }

    #[test]
    fn test_log_level_follows_verbose() {
        let quiet = Args::parse_from(["examples-e2e"]);
        assert_eq!(log_level(quiet.verbose), "warn");

        let verbose = Args::parse_from(["examples-e2e", "-v"]);
        assert_eq!(log_level(verbose.verbose), "debug");
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        let args = Args::parse_from(["examples-e2e", "--catalog", "/nonexistent/catalog.yaml"]);
        assert!(build_config(&args).is_err());
    }
}
