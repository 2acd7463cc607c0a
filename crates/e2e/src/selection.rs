//! Selecting examples by name fragment or glob

use std::path::Path;

use glob::Pattern;
use tracing::debug;

use crate::catalog::Example;

/// User-supplied selection patterns. Empty selects everything.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    patterns: Vec<(String, Option<Pattern>)>,
}

impl Selection {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(Into::into)
            .map(|raw: String| {
                // Not every fragment is valid glob syntax; those still match as substrings.
                let glob = match Pattern::new(&raw) {
                    Ok(glob) => Some(glob),
                    Err(e) => {
                        debug!("'{}' is not a glob ({}), matching as text only", raw, e);
                        None
                    }
                };
                (raw, glob)
            })
            .collect();

        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_selected(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }

        let name = path.to_string_lossy();
        self.patterns.iter().any(|(raw, glob)| {
            name.contains(raw.as_str()) || glob.as_ref().is_some_and(|g| g.matches(&name))
        })
    }

    /// Keep the selected examples, preserving catalog order.
    ///
    /// Patterns are matched against each path relative to `base_dir`, so
    /// `glyphs/*.py` selects `<base_dir>/glyphs/glyph2.py`.
    pub fn filter(&self, base_dir: &Path, examples: Vec<Example>) -> Vec<Example> {
        examples
            .into_iter()
            .filter(|example| {
                let name = example.path.strip_prefix(base_dir).unwrap_or(&example.path);
                self.is_selected(name)
            })
            .collect()
    }
}
