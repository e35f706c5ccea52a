//! Glob pattern resolution over a directory tree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use sift_indexer::{PathResolver, ResolveOptions};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{FsError, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolves glob patterns relative to a base directory.
///
/// Matches are tested against the path relative to `base_dir` with `/`
/// separators, so `*.md` matches top-level files only and `**/*.md` matches
/// at any depth. Output is sorted and capped at `max_results`.
#[derive(Debug, Clone)]
pub struct GlobResolver {
    default_ignores: Vec<String>,
}

impl GlobResolver {
    /// Create a resolver with the default ignore patterns.
    pub fn new() -> Self {
        Self {
            default_ignores: default_ignores(),
        }
    }

    /// Create a resolver that only honors caller ignore patterns.
    pub fn without_default_ignores() -> Self {
        Self {
            default_ignores: Vec::new(),
        }
    }

    /// Resolve `pattern` synchronously.
    pub fn resolve_blocking(&self, pattern: &str, options: &ResolveOptions) -> Result<Vec<String>> {
        let matcher = compile(pattern)?;
        let ignores = self
            .default_ignores
            .iter()
            .chain(&options.ignore_patterns)
            .map(String::as_str)
            .map(compile)
            .collect::<Result<Vec<_>>>()?;

        let base = PathBuf::from(&options.base_dir);
        if !base.is_dir() {
            return Err(FsError::DirectoryNotFound(options.base_dir.clone()));
        }

        let mut matches = Vec::new();
        for entry in WalkDir::new(&base) {
            let Ok(entry) = entry else {
                continue;
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_path(&base, entry.path()) else {
                continue;
            };
            if !matcher.matches_with(&relative, MATCH_OPTIONS) {
                continue;
            }
            if ignores.iter().any(|p| p.matches_with(&relative, MATCH_OPTIONS)) {
                continue;
            }
            matches.push(entry.path().to_string_lossy().into_owned());
        }

        matches.sort();
        if matches.len() > options.max_results {
            info!(
                "Pattern '{pattern}' matched {} files, keeping first {}",
                matches.len(),
                options.max_results
            );
            matches.truncate(options.max_results);
        }
        debug!("Resolved '{pattern}' to {} files", matches.len());
        Ok(matches)
    }
}

impl Default for GlobResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PathResolver for GlobResolver {
    async fn resolve(&self, pattern: &str, options: &ResolveOptions) -> anyhow::Result<Vec<String>> {
        let resolver = self.clone();
        let pattern = pattern.to_string();
        let options = options.clone();
        let paths = tokio::task::spawn_blocking(move || resolver.resolve_blocking(&pattern, &options))
            .await
            .map_err(|e| FsError::Walk(e.to_string()))??;
        Ok(paths)
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| FsError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// `path` relative to `base`, `/`-separated.
fn relative_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

fn default_ignores() -> Vec<String> {
    vec![
        // Version control
        "**/.git/**".to_string(),
        "**/.svn/**".to_string(),
        "**/.hg/**".to_string(),
        // Dependencies
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/vendor/**".to_string(),
        "**/.venv/**".to_string(),
        // Build artifacts
        "**/build/**".to_string(),
        "**/dist/**".to_string(),
        // System files
        "**/.DS_Store".to_string(),
        "**/*.swp".to_string(),
    ]
}
