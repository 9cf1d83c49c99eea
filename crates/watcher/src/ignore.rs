//! Ignore pattern management for the watcher
//!
//! Supports multiple sources of ignore patterns:
//! 1. Configured exclude patterns (also handed to the sync tool unchanged)
//! 2. .syncignore patterns in the watched root (optional, events only)
//! 3. Built-in editor temp-file filter (optional, events only)
//!
//! Ignored paths never reach the event journal, so churn on them cannot
//! trigger a flush.

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-root ignore file
pub const SYNCIGNORE_FILE: &str = ".syncignore";

/// Ignore rule set for one watched root
pub struct IgnoreRules {
    /// Watched root directory
    root: PathBuf,

    /// Compiled exclude patterns from configuration
    excludes: Option<Gitignore>,

    /// Patterns from .syncignore (optional)
    syncignore: Option<Gitignore>,

    /// Configuration
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for a watched root
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            excludes: None,
            syncignore: None,
            config,
        };

        rules.reload()?;
        Ok(rules)
    }

    /// Rebuild the compiled matchers
    ///
    /// Picks up changes to .syncignore on disk. On error the current
    /// matchers are left in place.
    pub fn reload(&mut self) -> Result<()> {
        let excludes = if self.config.exclude.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(&self.root);
            for pattern in &self.config.exclude {
                builder
                    .add_line(None, pattern)
                    .with_context(|| format!("Invalid exclude pattern: {}", pattern))?;
            }
            Some(builder.build().context("Failed to compile exclude patterns")?)
        };

        let mut syncignore = None;
        if self.config.use_syncignore {
            let path = self.root.join(SYNCIGNORE_FILE);
            if path.exists() {
                let mut builder = GitignoreBuilder::new(&self.root);
                if let Some(err) = builder.add(&path) {
                    return Err(err).with_context(|| format!("Failed to read {}", path.display()));
                }
                syncignore = Some(builder.build()?);
            }
        }

        self.excludes = excludes;
        self.syncignore = syncignore;
        Ok(())
    }

    /// Check if a root-relative path should be ignored
    pub fn should_ignore(&self, relative: &Path) -> bool {
        self.should_ignore_entry(relative, None)
    }

    /// Like `should_ignore`, with the entry type when the event carries it.
    ///
    /// Without a hint the filesystem is asked. A path that no longer exists
    /// is matched both as a file and as a directory, so a directory-only
    /// pattern still covers a deleted directory.
    pub fn should_ignore_entry(&self, relative: &Path, is_dir: Option<bool>) -> bool {
        if relative.as_os_str().is_empty() {
            return false;
        }

        if self.config.ignore_editor_temp && is_editor_temp(relative) {
            return true;
        }

        let is_dir = is_dir.or_else(|| {
            std::fs::symlink_metadata(self.root.join(relative))
                .ok()
                .map(|meta| meta.is_dir())
        });

        match is_dir {
            Some(is_dir) => self.matches(relative, is_dir),
            None => self.matches(relative, false) || self.matches(relative, true),
        }
    }

    fn matches(&self, relative: &Path, is_dir: bool) -> bool {
        [&self.excludes, &self.syncignore]
            .into_iter()
            .flatten()
            .any(|rules| rules.matched_path_or_any_parents(relative, is_dir).is_ignore())
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        [
            self.excludes.is_some(),
            self.syncignore.is_some(),
            self.config.ignore_editor_temp,
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }
}

/// Check if a path is an editor temporary / OS metadata file
///
/// Covers: Vim, Emacs, MacOS/Windows system files
fn is_editor_temp(path: &Path) -> bool {
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    // Vim swap files
    if [".swp", ".swo", ".swn", ".swx"]
        .iter()
        .any(|ext| filename.ends_with(ext))
    {
        return true;
    }

    // Vim 4913 probe file
    if filename == "4913" {
        return true;
    }

    // Backup files (~)
    if filename.ends_with('~') {
        return true;
    }

    // Emacs auto-save (#*#) and lock files (.#*)
    if (filename.len() > 1 && filename.starts_with('#') && filename.ends_with('#'))
        || filename.starts_with(".#")
    {
        return true;
    }

    // MacOS / Windows system files
    filename == ".DS_Store"
        || filename.starts_with("._")
        || filename == "Thumbs.db"
        || filename == "desktop.ini"
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Exclude patterns (gitignore syntax), also passed to the sync tool
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Honour .syncignore in the watched root (default: true)
    #[serde(default = "default_true")]
    pub use_syncignore: bool,

    /// Drop editor swap/backup files (default: true)
    #[serde(default = "default_true")]
    pub ignore_editor_temp: bool,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            exclude: vec![],
            use_syncignore: true,
            ignore_editor_temp: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_builtin(exclude: &[&str]) -> IgnoreConfig {
        IgnoreConfig {
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            use_syncignore: false,
            ignore_editor_temp: false,
        }
    }

    #[test]
    fn test_editor_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let rules = IgnoreRules::load(temp_dir.path(), IgnoreConfig::default()).unwrap();

        assert!(rules.should_ignore(Path::new("src/.main.rs.swp")));
        assert!(rules.should_ignore(Path::new("notes.txt~")));
        assert!(rules.should_ignore(Path::new("docs/#draft.md#")));
        assert!(rules.should_ignore(Path::new("docs/.#draft.md")));
        assert!(rules.should_ignore(Path::new("photos/.DS_Store")));

        assert!(!rules.should_ignore(Path::new("src/main.rs")));
        assert!(!rules.should_ignore(Path::new("README.md")));
    }

    #[test]
    fn test_root_itself_never_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let rules = IgnoreRules::load(temp_dir.path(), no_builtin(&["*"])).unwrap();
        assert!(!rules.should_ignore(Path::new("")));
    }

    #[test]
    fn test_exclude_patterns() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir_all(temp_dir.path().join("build"))?;

        let rules = IgnoreRules::load(temp_dir.path(), no_builtin(&["*.log", "build/"]))?;

        assert!(rules.should_ignore(Path::new("debug.log")));
        assert!(rules.should_ignore(Path::new("sub/trace.log")));
        assert!(rules.should_ignore(Path::new("build")));
        assert!(rules.should_ignore(Path::new("build/output.txt")));

        assert!(!rules.should_ignore(Path::new("src/main.rs")));

        Ok(())
    }

    #[test]
    fn test_deleted_directory_still_excluded() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let rules = IgnoreRules::load(temp_dir.path(), no_builtin(&["build/", "out/"]))?;

        // Neither exists on disk any more
        assert!(rules.should_ignore(Path::new("build")));
        assert!(rules.should_ignore(Path::new("sub/out")));
        assert!(rules.should_ignore_entry(Path::new("build"), Some(true)));

        // An event that says "file" is not caught by a directory-only pattern
        assert!(!rules.should_ignore_entry(Path::new("build"), Some(false)));
        assert!(!rules.should_ignore(Path::new("builder")));

        Ok(())
    }

    #[test]
    fn test_syncignore_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(SYNCIGNORE_FILE), "*.tmp\ncache/\n")?;
        fs::create_dir_all(temp_dir.path().join("cache"))?;

        let config = IgnoreConfig {
            use_syncignore: true,
            ..no_builtin(&[])
        };
        let rules = IgnoreRules::load(temp_dir.path(), config)?;

        assert!(rules.should_ignore(Path::new("file.tmp")));
        assert!(rules.should_ignore(Path::new("cache/blob")));
        assert!(!rules.should_ignore(Path::new("file.txt")));

        Ok(())
    }

    #[test]
    fn test_syncignore_disabled() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(SYNCIGNORE_FILE), "*.tmp\n")?;

        let rules = IgnoreRules::load(temp_dir.path(), no_builtin(&[]))?;
        assert!(!rules.should_ignore(Path::new("file.tmp")));

        Ok(())
    }

    #[test]
    fn test_reload_picks_up_syncignore() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = IgnoreConfig {
            use_syncignore: true,
            ..no_builtin(&[])
        };
        let mut rules = IgnoreRules::load(temp_dir.path(), config)?;
        assert!(!rules.should_ignore(Path::new("a.bak")));

        fs::write(temp_dir.path().join(SYNCIGNORE_FILE), "*.bak\n")?;
        rules.reload()?;

        assert!(rules.should_ignore(Path::new("a.bak")));
        Ok(())
    }

    #[test]
    fn test_active_sources_count() {
        let temp_dir = TempDir::new().unwrap();

        let rules = IgnoreRules::load(temp_dir.path(), IgnoreConfig::default()).unwrap();
        assert_eq!(rules.active_sources(), 1); // editor temp only

        let rules = IgnoreRules::load(temp_dir.path(), no_builtin(&["*.tmp"])).unwrap();
        assert_eq!(rules.active_sources(), 1); // excludes only

        let rules = IgnoreRules::load(temp_dir.path(), no_builtin(&[])).unwrap();
        assert_eq!(rules.active_sources(), 0);
    }
}
