use std::path::{Path, PathBuf};

use crate::{
    error::AppError,
    ini::{self, IniRecord},
};

/// Npm user config file shared with the npm client
///
/// Nothing is cached: every read goes back to disk, since npm and the user
/// may edit the file between two invocations.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    path: PathBuf,
}

impl SharedConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SharedConfig { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current content, an empty record when the file is missing
    pub fn read(&self) -> Result<IniRecord, AppError> {
        if !self.path.exists() {
            return Ok(IniRecord::new());
        }
        ini::read_file(&self.path)
    }

    /// Replaces the whole file with `record`
    pub fn write(&self, record: &IniRecord) -> Result<(), AppError> {
        ini::write_file(&self.path, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ini::IniValue;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let shared = SharedConfig::new(dir.path().join(".npmrc"));
        assert!(shared.read().unwrap().is_empty());
    }

    #[test]
    fn every_read_sees_external_edits() {
        let dir = tempfile::TempDir::new().unwrap();
        let shared = SharedConfig::new(dir.path().join(".npmrc"));

        let mut record = IniRecord::new();
        record.insert("registry".to_string(), IniValue::from("http://a/"));
        shared.write(&record).unwrap();
        assert_eq!(shared.read().unwrap(), record);

        std::fs::write(shared.path(), "registry = http://b/\n").unwrap();
        assert_eq!(shared.read().unwrap()["registry"].as_str(), Some("http://b/"));
    }
}
