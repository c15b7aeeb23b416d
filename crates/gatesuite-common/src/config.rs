//! Project layout configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{BUILD_DIR, CANONICAL_COMPOSE, ENV_FILE_NAME, EXAMPLE_COMPOSE_DIR, ROOT_MARKERS};

/// Resolved locations of the files the suite reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Project root directory.
    pub root: PathBuf,
    /// Canonical compose document.
    pub canonical_compose: PathBuf,
    /// Directory of the static example compose templates.
    pub example_dir: PathBuf,
    /// Default output directory for generated artifacts.
    pub build_dir: PathBuf,
    /// Optional root `.env` used as a literal override.
    pub env_file: PathBuf,
}

impl SuiteConfig {
    /// Builds the layout for a known project root.
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            canonical_compose: root.join(CANONICAL_COMPOSE),
            example_dir: root.join(EXAMPLE_COMPOSE_DIR),
            build_dir: root.join(BUILD_DIR),
            env_file: root.join(ENV_FILE_NAME),
            root,
        }
    }

    /// Walks up from `start` to the first directory containing every
    /// root marker, falling back to `start` itself.
    #[must_use]
    pub fn discover(start: &Path) -> Self {
        let root = start
            .ancestors()
            .find(|dir| ROOT_MARKERS.iter().all(|m| dir.join(m).is_dir()))
            .unwrap_or(start);
        Self::at(root)
    }

    /// Resolves an output directory argument against the project root.
    #[must_use]
    pub fn out_dir(&self, arg: &str) -> PathBuf {
        let trimmed = arg.trim();
        if trimmed.is_empty() {
            self.build_dir.clone()
        } else {
            self.root.join(trimmed)
        }
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::at(".")
    }
}
