//! Whole runs over a temporary example tree

#![cfg(unix)]

mod common;

use std::path::Path;

use examples_e2e::catalog::{Catalog, ExampleDir};
use examples_e2e::runner::ExampleEnv;
use examples_e2e::server::ServerConfig;
use examples_e2e::suite::{self, Counters};
use examples_e2e::{ExampleKind, RunnerConfig, Selection, SuiteStatus};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// glyphs: two passing scripts, one failing, one excluded and one helper;
/// server and notebook directories with one example each.
fn example_tree(base: &Path) {
    common::write(&base.join("glyphs/circle.py"), "exit 0\n");
    common::write(&base.join("glyphs/glyph2.py"), "exit 0\n");
    common::write(&base.join("glyphs/broken.py"), "exit 1\n");
    common::write(&base.join("glyphs/line_animate.py"), "sleep 30\n");
    common::write(&base.join("glyphs/_helpers.py"), "exit 1\n");
    common::write(&base.join("server/line.py"), "exit 0\n");
    common::write(&base.join("notebook/scatter.ipynb"), "{}");
}

fn config(base: &Path, report: &str) -> RunnerConfig {
    let mut config = RunnerConfig::for_base_dir(base);
    config.catalog = Catalog {
        dirs: vec![
            ExampleDir::new("glyphs", ExampleKind::File).exclude(&["line_animate.py"]),
            ExampleDir::new("server", ExampleKind::Server),
            ExampleDir::new("notebook", ExampleKind::Notebook),
        ],
    };
    config.interpreter = "sh".to_string();
    config.env = ExampleEnv { dev: true };
    config.server = ServerConfig {
        // The server's runtime is never available here
        probe: vec!["false".to_string()],
        ..Default::default()
    };
    config.render = common::fake_renderer(base, report);
    config
}

#[test]
fn listing_applies_excludes_and_selection() {
    let tmp = TempDir::new().unwrap();
    example_tree(tmp.path());
    let config = config(tmp.path(), common::CLEAN_REPORT);

    let all = config.selected_examples(&Selection::default()).unwrap();
    let names: Vec<String> = all.iter().map(|e| e.stem()).collect();
    assert_eq!(names, vec!["broken", "circle", "glyph2", "line", "scatter"]);

    let picked = config.selected_examples(&Selection::new(["glyph2"])).unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].stem(), "glyph2");
}

#[test]
fn patterns_match_paths_under_the_base_dir() {
    let tmp = TempDir::new().unwrap();
    example_tree(tmp.path());
    let config = config(tmp.path(), common::CLEAN_REPORT);

    let glyphs = config.selected_examples(&Selection::new(["glyphs/*.py"])).unwrap();
    let names: Vec<String> = glyphs.iter().map(|e| e.stem()).collect();
    assert_eq!(names, vec!["broken", "circle", "glyph2"]);
    assert!(glyphs.iter().all(|e| e.path.starts_with(tmp.path())));

    let notebooks = config.selected_examples(&Selection::new(["notebook/*"])).unwrap();
    assert_eq!(notebooks.len(), 1);
    assert_eq!(notebooks[0].kind, ExampleKind::Notebook);
}

#[tokio::test]
async fn failures_and_skips_are_counted() {
    let tmp = TempDir::new().unwrap();
    example_tree(tmp.path());
    let config = config(tmp.path(), common::CLEAN_REPORT);
    let examples = config.selected_examples(&Selection::default()).unwrap();

    let report = suite::run(&config, &examples, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.counters, Counters { discovered: 5, run: 3, passed: 2 });
    assert_eq!(report.status(), SuiteStatus::Failures);
    assert_eq!(report.status().exit_code(), 1);
}

#[tokio::test]
async fn skipped_server_examples_only_warn() {
    let tmp = TempDir::new().unwrap();
    example_tree(tmp.path());
    let config = config(tmp.path(), common::CLEAN_REPORT);
    let selection = Selection::new(["circle", "glyph2", "server/*"]);
    let examples = config.selected_examples(&selection).unwrap();

    let report = suite::run(&config, &examples, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.counters, Counters { discovered: 3, run: 2, passed: 2 });
    assert_eq!(report.status(), SuiteStatus::NotAllRun);
    assert_eq!(report.status().exit_code(), 0);
}

#[tokio::test]
async fn clean_file_examples_all_pass() {
    let tmp = TempDir::new().unwrap();
    example_tree(tmp.path());
    let config = config(tmp.path(), common::CLEAN_REPORT);
    let examples = config
        .selected_examples(&Selection::new(["circle", "glyph2"]))
        .unwrap();

    let report = suite::run(&config, &examples, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.counters, Counters { discovered: 2, run: 2, passed: 2 });
    assert_eq!(report.status(), SuiteStatus::AllPassed);
}

#[tokio::test]
async fn interrupted_run_stops_early() {
    let tmp = TempDir::new().unwrap();
    example_tree(tmp.path());
    let config = config(tmp.path(), common::CLEAN_REPORT);
    let examples = config.selected_examples(&Selection::default()).unwrap();

    let interrupt = CancellationToken::new();
    interrupt.cancel();
    let report = suite::run(&config, &examples, &interrupt).await.unwrap();

    assert!(report.interrupted);
    assert_eq!(report.counters, Counters { discovered: 5, run: 0, passed: 0 });
    assert_eq!(report.status(), SuiteStatus::NotAllRun);
}
