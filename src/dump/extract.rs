use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const LOGS_PREFIXES: &[&str] = &["logs/", "logs\\"];
const BUGS_PREFIXES: &[&str] = &["bugs/", "bugs\\"];

/// Diagnostic files a dump may carry next to its tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Log,
    BugReport,
}

impl Artifact {
    /// Classify an archive entry name, `None` for anything that is not a
    /// log or bug report.
    pub fn classify(entry_name: &str) -> Option<Self> {
        if LOGS_PREFIXES.iter().any(|p| entry_name.starts_with(p)) {
            Some(Artifact::Log)
        } else if BUGS_PREFIXES.iter().any(|p| entry_name.starts_with(p)) {
            Some(Artifact::BugReport)
        } else {
            None
        }
    }
}

/// Directory that receives the artifacts of one load, created on first use.
pub struct ArtifactDir {
    path: PathBuf,
}

impl ArtifactDir {
    pub fn new(base: &Path) -> Self {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        Self {
            path: base.join(format!("import_{}", stamp)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy one entry into the directory, keeping only its file name.
    pub fn extract<R: Read>(&self, entry_name: &str, reader: &mut R) -> Result<PathBuf> {
        let file_name = entry_name
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .with_context(|| format!("Archive entry {:?} has no file name", entry_name))?;

        fs::create_dir_all(&self.path)
            .with_context(|| format!("Failed to create directory: {:?}", self.path))?;

        let dest_path = self.path.join(file_name);
        let mut dest_file = File::create(&dest_path)
            .with_context(|| format!("Failed to create file: {:?}", dest_path))?;
        io::copy(reader, &mut dest_file)
            .with_context(|| format!("Failed to extract: {}", entry_name))?;

        Ok(dest_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_classify() {
        assert_eq!(Artifact::classify("logs/fllweb.log"), Some(Artifact::Log));
        assert_eq!(Artifact::classify("logs\\fllweb.log"), Some(Artifact::Log));
        assert_eq!(Artifact::classify("bugs/2020.zip"), Some(Artifact::BugReport));
        assert_eq!(Artifact::classify("Teams.csv"), None);
    }

    #[test]
    fn test_extract_keeps_file_name_only() {
        let base = TempDir::new().unwrap();
        let dir = ArtifactDir::new(base.path());
        assert!(!dir.path().exists());

        let written = dir
            .extract("logs\\nested/app.log", &mut "hello".as_bytes())
            .unwrap();
        assert_eq!(written, dir.path().join("app.log"));
        assert_eq!(fs::read_to_string(written).unwrap(), "hello");
        assert!(dir
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("import_"));
    }
}
