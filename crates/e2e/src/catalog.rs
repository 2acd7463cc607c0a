//! Example catalog - which scripts and notebooks exist and how each one runs

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RunnerError, RunnerResult};
use crate::server::ServerKind;

/// Files starting with this prefix are helpers, never examples.
pub const RESERVED_PREFIX: &str = "_";

/// How an example is executed and where its rendered output lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleKind {
    /// Standalone script that writes a sibling HTML file
    File,
    /// Script that pushes a document to the visualization server
    Server,
    /// Notebook viewed through the notebook server
    Notebook,
}

impl ExampleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExampleKind::File => "file",
            ExampleKind::Server => "server",
            ExampleKind::Notebook => "notebook",
        }
    }

    /// File extension (without the dot) of examples of this kind
    pub fn extension(&self) -> &'static str {
        match self {
            ExampleKind::File | ExampleKind::Server => "py",
            ExampleKind::Notebook => "ipynb",
        }
    }

    /// The auxiliary server an example of this kind cannot run without
    pub fn required_server(&self) -> Option<ServerKind> {
        match self {
            ExampleKind::File => None,
            ExampleKind::Server => Some(ServerKind::Visualization),
            ExampleKind::Notebook => Some(ServerKind::Notebook),
        }
    }
}

impl fmt::Display for ExampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single runnable example
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub path: PathBuf,
    pub kind: ExampleKind,
}

impl Example {
    pub fn new(path: impl Into<PathBuf>, kind: ExampleKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// File name without extension, e.g. `glyph2` for `glyphs/glyph2.py`
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory the example is run from
    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// One configured source directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleDir {
    /// Directory path, relative to the base directory
    pub path: PathBuf,

    pub kind: ExampleKind,

    /// When set, only these names are considered and the directory is not listed
    #[serde(default)]
    pub include: Option<Vec<String>>,

    /// Names that are never run
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ExampleDir {
    pub fn new(path: impl Into<PathBuf>, kind: ExampleKind) -> Self {
        Self {
            path: path.into(),
            kind,
            include: None,
            exclude: Vec::new(),
        }
    }

    pub fn exclude(mut self, names: &[&str]) -> Self {
        self.exclude = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn include(mut self, names: &[&str]) -> Self {
        self.include = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    fn accepts(&self, name: &str) -> bool {
        !name.starts_with(RESERVED_PREFIX)
            && Path::new(name)
                .extension()
                .map(|ext| ext == self.kind.extension())
                .unwrap_or(false)
            && !self.exclude.iter().any(|excluded| excluded == name)
    }

    /// Collect the examples of this directory under `base_dir`
    pub fn examples(&self, base_dir: &Path) -> RunnerResult<Vec<Example>> {
        let root = base_dir.join(&self.path);

        let names = match &self.include {
            Some(include) => include.clone(),
            None => list_names(&root)?,
        };

        Ok(names
            .into_iter()
            .filter(|name| self.accepts(name))
            .map(|name| Example::new(root.join(name), self.kind))
            .collect())
    }
}

/// Sorted names of the non-directory entries directly inside `dir`
fn list_names(dir: &Path) -> RunnerResult<Vec<String>> {
    let mut names = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| RunnerError::Catalog {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        if entry.file_type().is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    Ok(names)
}

/// The configured layout of example directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub dirs: Vec<ExampleDir>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            dirs: vec![
                ExampleDir::new("glyphs", ExampleKind::File)
                    .exclude(&["line_animate.py", "choropleth.py"]),
                ExampleDir::new("plotting/file", ExampleKind::File).exclude(&["image_rgba.py"]),
                ExampleDir::new("plotting/server", ExampleKind::Server)
                    .exclude(&["remote_image.py", "serversource.py"]),
                ExampleDir::new("plotting/notebook", ExampleKind::Notebook),
                ExampleDir::new("charts", ExampleKind::File),
            ],
        }
    }
}

impl Catalog {
    /// Parse a catalog layout from YAML
    pub fn from_yaml(yaml: &str) -> RunnerResult<Self> {
        serde_yaml::from_str(yaml).map_err(RunnerError::from)
    }

    /// Parse a catalog layout from a YAML file
    pub fn from_file(path: &Path) -> RunnerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Enumerate every example, in configured directory order.
    ///
    /// A directory that cannot be listed aborts the whole build.
    pub fn build(&self, base_dir: &Path) -> RunnerResult<Vec<Example>> {
        let mut examples = Vec::new();
        for dir in &self.dirs {
            let found = dir.examples(base_dir)?;
            debug!("{} {} example(s) in {}", found.len(), dir.kind, dir.path.display());
            examples.extend(found);
        }
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), "").unwrap();
        }
    }

    fn names(examples: &[Example]) -> Vec<String> {
        examples
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_listing_filters_prefix_extension_and_excludes() {
        let tmp = TempDir::new().unwrap();
        touch(
            &tmp.path().join("glyphs"),
            &["b.py", "a.py", "_helper.py", "data.csv", "skip.py", "nb.ipynb"],
        );
        fs::create_dir_all(tmp.path().join("glyphs/sub.py")).unwrap();

        let dir = ExampleDir::new("glyphs", ExampleKind::File).exclude(&["skip.py"]);
        let examples = dir.examples(tmp.path()).unwrap();

        assert_eq!(names(&examples), vec!["a.py", "b.py"]);
        assert!(examples.iter().all(|e| e.kind == ExampleKind::File));
    }

    #[test]
    fn test_notebook_dir_keeps_only_notebooks() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("nb"), &["one.ipynb", "two.py"]);

        let dir = ExampleDir::new("nb", ExampleKind::Notebook);
        let examples = dir.examples(tmp.path()).unwrap();

        assert_eq!(names(&examples), vec!["one.ipynb"]);
        assert_eq!(examples[0].kind, ExampleKind::Notebook);
    }

    #[test]
    fn test_include_set_replaces_listing() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("server"), &["a.py", "b.py", "c.py"]);

        let dir = ExampleDir::new("server", ExampleKind::Server)
            .include(&["c.py", "a.py", "excluded.py"])
            .exclude(&["excluded.py"]);
        let examples = dir.examples(tmp.path()).unwrap();

        assert_eq!(names(&examples), vec!["c.py", "a.py"]);
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog {
            dirs: vec![ExampleDir::new("nope", ExampleKind::File)],
        };

        let err = catalog.build(tmp.path()).unwrap_err();
        assert!(matches!(err, RunnerError::Catalog { .. }));
    }

    #[test]
    fn test_build_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("x"), &["z.py", "m.py", "a.py"]);
        touch(&tmp.path().join("y"), &["k.py"]);

        let catalog = Catalog {
            dirs: vec![
                ExampleDir::new("y", ExampleKind::Server),
                ExampleDir::new("x", ExampleKind::File),
            ],
        };

        let first = catalog.build(tmp.path()).unwrap();
        let second = catalog.build(tmp.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["k.py", "a.py", "m.py", "z.py"]);
    }

    #[test]
    fn test_parse_catalog_yaml() {
        let yaml = r#"
dirs:
  - path: glyphs
    kind: file
    exclude: [line_animate.py]
  - path: plotting/server
    kind: server
    include: [line.py]
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.dirs.len(), 2);
        assert_eq!(catalog.dirs[0].exclude, vec!["line_animate.py"]);
        assert_eq!(catalog.dirs[1].kind, ExampleKind::Server);
        assert_eq!(catalog.dirs[1].include.as_deref(), Some(&["line.py".to_string()][..]));
    }

    #[test]
    fn test_example_stem_and_dir() {
        let example = Example::new("examples/glyphs/glyph2.py", ExampleKind::File);
        assert_eq!(example.stem(), "glyph2");
        assert_eq!(example.dir(), Path::new("examples/glyphs"));

        let bare = Example::new("glyph2.py", ExampleKind::File);
        assert_eq!(bare.dir(), Path::new("."));
    }
}
