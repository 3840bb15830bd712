use anyhow::{bail, Result};
use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Finds table description files under a manifest directory.
///
/// Walks the directory recursively and collects every `.yml`/`.yaml` file, skipping
/// hidden directories (those starting with `.`). Files come back sorted by path so a
/// run sees the same tables in the same order every time.
///
/// # Example
///
/// ```no_run
/// use openapi_bake::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./app/tables"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} table files", result.files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan
pub struct ScanResult {
    /// Paths of all discovered YAML files
    pub files: Vec<PathBuf>,
    /// Warning messages for entries that could not be read
    pub warnings: Vec<String>,
}

impl ScanResult {
    /// The discovered files, or an error if any entry could not be read
    pub fn into_files(self) -> Result<Vec<PathBuf>> {
        if !self.warnings.is_empty() {
            bail!("{}", self.warnings.join("; "));
        }
        Ok(self.files)
    }
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all YAML files.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.path() == self.root_path || !e.file_name().to_string_lossy().starts_with('.'))
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let is_yaml = matches!(
                        path.extension().and_then(|s| s.to_str()),
                        Some("yml") | Some("yaml")
                    );
                    if path.is_file() && is_yaml {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult { files, warnings })
    }
}
