//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use examples_e2e::render::RenderConfig;

/// Write a file, creating parent directories
pub fn write(path: &Path, body: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
    path.to_path_buf()
}

/// Renderer stand-in: `sh <script> <kind> <url> <png>` printing `report`
pub fn fake_renderer(dir: &Path, report: &str) -> RenderConfig {
    let script = write(
        &dir.join("renderer.sh"),
        &format!("cat <<'REPORT'\n{}\nREPORT\n", report),
    );
    RenderConfig {
        program: "sh".to_string(),
        script,
        ..Default::default()
    }
}

/// Renderer stand-in that echoes its arguments back as console messages
pub fn echo_renderer(dir: &Path) -> RenderConfig {
    let script = write(
        &dir.join("echo.sh"),
        r#"printf '{"status":"ok","messages":[{"msg":"%s"},{"msg":"%s"},{"msg":"%s"}]}' "$1" "$2" "$3"
"#,
    );
    RenderConfig {
        program: "sh".to_string(),
        script,
        ..Default::default()
    }
}

pub const CLEAN_REPORT: &str = r#"{"status": "ok", "messages": [], "resources": [], "errors": []}"#;

pub const BROKEN_REPORT: &str = r#"{"status": "ok", "resources": [],
  "errors": [{"msg": "ReferenceError: Bokeh is not defined", "trace": [{"file": "glyph2.html", "line": 4}]}]}"#;
