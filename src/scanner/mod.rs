//! File scanner for discovering and filtering source files.
//!
//! The scanner decides which files of a project are worth sending to the
//! analysis engine, respecting configured extensions, excludes and size limits.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["rs", "py", "js"])
    pub extensions: Vec<String>,
    /// Directory or file names to exclude (e.g., ["node_modules", "target"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum number of files returned by a full scan
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let config = crate::config::ScannerConfig::default();
        Self::from(&config)
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
        }
    }
}

/// Scanned file information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path relative to the project root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// File scanner for discovering source files.
pub struct FileScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl FileScanner {
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan for all matching files, sorted by path.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded_entry(e));

        for entry in walker {
            if let Some(max) = self.config.max_files {
                if files.len() >= max {
                    debug!("Reached max_files limit ({})", max);
                    break;
                }
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let rel_path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();

            files.push(ScannedFile {
                path: rel_path,
                size,
            });
        }

        Ok(files)
    }

    /// Check if a single file matches scan criteria.
    ///
    /// Relative paths are resolved against the project root. Any excluded
    /// component along the path rejects the file.
    pub fn matches(&self, path: &Path) -> bool {
        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let rel = full_path.strip_prefix(&self.root).unwrap_or(&full_path);
        let excluded = rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .any(|name| self.is_excluded(name));
        if excluded {
            return false;
        }

        let ext = full_path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !self.config.extensions.iter().any(|e| e == ext) {
            return false;
        }

        match fs::metadata(&full_path) {
            Ok(metadata) => metadata.is_file() && metadata.len() <= self.config.max_file_size,
            Err(_) => false,
        }
    }

    fn is_excluded_entry(&self, entry: &DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .map(|name| self.is_excluded(name))
            .unwrap_or(false)
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden files, but not "." or ".." path components
        if name.starts_with('.') && name != "." && name != ".." {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("core/src")).unwrap();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("core/src/lib.rs"), "pub fn f() {}").unwrap();
        fs::write(root.join("core/README.md"), "# core").unwrap();
        fs::write(root.join("main.py"), "print('hi')").unwrap();
        fs::write(root.join("target/debug/gen.rs"), "fn x() {}").unwrap();
        fs::write(root.join(".git/hook.py"), "").unwrap();
        dir
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = fixture();
        let scanner = FileScanner::new(dir.path().to_path_buf(), ScanConfig::default());

        let paths: Vec<PathBuf> = scanner.scan().unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("core/src/lib.rs"), PathBuf::from("main.py")]
        );
    }

    #[test]
    fn test_scan_respects_max_files() {
        let dir = fixture();
        let config = ScanConfig {
            max_files: Some(1),
            ..ScanConfig::default()
        };
        let scanner = FileScanner::new(dir.path().to_path_buf(), config);

        assert_eq!(scanner.scan().unwrap().len(), 1);

        let config = ScanConfig {
            max_files: Some(0),
            ..ScanConfig::default()
        };
        let scanner = FileScanner::new(dir.path().to_path_buf(), config);
        assert!(scanner.scan().unwrap().is_empty());
    }

    #[test]
    fn test_matches_single_file() {
        let dir = fixture();
        let scanner = FileScanner::new(dir.path().to_path_buf(), ScanConfig::default());

        assert!(scanner.matches(Path::new("core/src/lib.rs")));
        assert!(!scanner.matches(Path::new("core/README.md")));
        assert!(!scanner.matches(Path::new("target/debug/gen.rs")));
        assert!(!scanner.matches(Path::new("missing.rs")));
    }

    #[test]
    fn test_matches_respects_size_limit() {
        let dir = fixture();
        fs::write(dir.path().join("big.rs"), "x".repeat(64)).unwrap();
        let config = ScanConfig {
            max_file_size: 16,
            ..ScanConfig::default()
        };
        let scanner = FileScanner::new(dir.path().to_path_buf(), config);

        assert!(!scanner.matches(Path::new("big.rs")));
        assert!(scanner.matches(Path::new("main.py")));
    }
}
