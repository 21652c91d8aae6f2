use std::fs;
use std::path::{Path, PathBuf};

use super::Capture;
use crate::constants::METADATA_FILE_NAME;
use crate::error::{PeakFinderError, Result};

/// Supplier of parsed captures in a stable order
///
/// Implementations skip captures that fail to parse; an `Err` means the
/// source as a whole is unusable (e.g. the directory does not exist).
pub trait CaptureSource {
    fn list_captures(&self) -> Result<Vec<Capture>>;
}

/// Captures stored one per text file in a dataset directory
pub struct DirectorySource {
    dir: PathBuf,
    pattern: String,
}

impl DirectorySource {
    /// Create a source for files matching `pattern` (`*` and `?` wildcards)
    pub fn new<P: AsRef<Path>>(dir: P, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            pattern: pattern.into(),
        }
    }

    /// Matching file paths sorted by file name
    pub fn matching_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| PeakFinderError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| {
                        name != METADATA_FILE_NAME && wildcard_match(&self.pattern, name)
                    })
            })
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

impl CaptureSource for DirectorySource {
    fn list_captures(&self) -> Result<Vec<Capture>> {
        let files = self.matching_files()?;
        log::info!(
            "Found {} files matching '{}' in {}",
            files.len(),
            self.pattern,
            self.dir.display()
        );

        let mut captures = Vec::with_capacity(files.len());
        for path in &files {
            match Capture::from_file(path) {
                Ok(capture) => captures.push(capture),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(captures)
    }
}

pub fn default_pattern(dir: &Path) -> String {
    match dir.file_name().and_then(|n| n.to_str()) {
        Some(name) => format!("{}_*.txt", name),
        None => "*.txt".to_string(),
    }
}

/// Shell-style match supporting `*` (any run) and `?` (one character)
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_ni = 0;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ni = ni;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_ni += 1;
            ni = star_ni;
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*.txt", "a.txt"));
        assert!(wildcard_match("SiPM_*.txt", "SiPM_0001.txt"));
        assert!(!wildcard_match("SiPM_*.txt", "Other_0001.txt"));
        assert!(wildcard_match("wf_??.txt", "wf_01.txt"));
        assert!(!wildcard_match("wf_??.txt", "wf_001.txt"));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("*.txt", "a.csv"));
    }

    #[test]
    fn test_default_pattern_uses_dir_name() {
        assert_eq!(
            default_pattern(Path::new("/data/SiPM4_LN2_DCR1")),
            "SiPM4_LN2_DCR1_*.txt"
        );
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let source = DirectorySource::new("/nonexistent/peakfinder/dataset", "*.txt");
        assert!(matches!(
            source.list_captures(),
            Err(PeakFinderError::Io { .. })
        ));
    }
}
