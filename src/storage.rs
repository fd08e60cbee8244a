use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    error::AppError,
    ini::{self, IniRecord},
    profile::ProfileConfig,
};

/// Name of the profile created on first run, which can never be removed
pub const DEFAULT_PROFILE: &str = "default";

/// Extension of profile files inside the data directory
const PROFILE_EXTENSION: &str = "ini";

/// Directory of named registry configurations, one ini file per name
#[derive(Debug, Clone)]
pub struct ProfileStore {
    data_dir: PathBuf,
}

impl ProfileStore {
    /// Opens the store, creating it with a `default` profile on first use
    ///
    /// # Arguments
    /// * `data_dir` - Directory holding the profile files
    /// * `default_factory` - Builds the `default` profile; only called when
    ///   the directory did not exist yet
    pub fn init<F>(data_dir: impl Into<PathBuf>, default_factory: F) -> Result<Self, AppError>
    where
        F: FnOnce() -> Result<ProfileConfig, AppError>,
    {
        let store = ProfileStore {
            data_dir: data_dir.into(),
        };

        if store.data_dir.exists() {
            return Ok(store);
        }

        info!(path = %store.data_dir.display(), "running for the first time");
        let config = default_factory()?;
        config.validate()?;

        match fs::create_dir_all(&store.data_dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(AppError::Init {
                    path: store.data_dir.clone(),
                    source,
                });
            }
        }

        // a directory without `default.ini` would never be bootstrapped again
        if let Err(err) = store.store(DEFAULT_PROFILE, &config.to_record()) {
            let _ = fs::remove_dir_all(&store.data_dir);
            return Err(err);
        }
        info!(registry = ?config.registry(), "added \"default\" registry");

        Ok(store)
    }

    /// Directory holding the profile files
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Names of all stored profiles, sorted
    pub fn list_names(&self) -> Result<Vec<String>, AppError> {
        let mut names: Vec<String> = fs::read_dir(&self.data_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension()? != PROFILE_EXTENSION {
                    return None;
                }
                path.file_stem()?.to_str().map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Loads the raw record of a named profile
    pub fn load(&self, name: &str) -> Result<IniRecord, AppError> {
        check_name(name)?;
        match ini::read_file(&self.ini_path_for(name)) {
            Err(AppError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                Err(AppError::NotFound(name.to_string()))
            }
            result => result,
        }
    }

    /// Loads a named profile as a filtered config
    pub fn load_config(&self, name: &str) -> Result<ProfileConfig, AppError> {
        Ok(ProfileConfig::from_record(&self.load(name)?))
    }

    /// Creates or overwrites a named profile
    pub fn store(&self, name: &str, record: &IniRecord) -> Result<(), AppError> {
        check_name(name)?;
        ini::write_file(&self.ini_path_for(name), record)
    }

    /// Deletes a named profile together with its cache directory
    pub fn remove(&self, name: &str) -> Result<(), AppError> {
        if name == DEFAULT_PROFILE {
            return Err(AppError::Protected(name.to_string()));
        }
        check_name(name)?;

        match fs::remove_file(self.ini_path_for(name)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        let cache_path = self.cache_path_for(name);
        if cache_path.is_dir() {
            fs::remove_dir_all(&cache_path)?;
            debug!(path = %cache_path.display(), "removed cache directory");
        }
        Ok(())
    }

    /// Path of the ini file holding a named profile
    pub fn ini_path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.{PROFILE_EXTENSION}"))
    }

    /// Npm cache directory dedicated to a named profile
    pub fn cache_path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.cache"))
    }
}

/// Rejects names that would resolve outside the data directory
///
/// Used by every operation touching the file system, so profile files and
/// cache directories always stay directly inside the store.
pub fn check_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(AppError::Validation(format!("Invalid registry name \"{name}\"")));
    }
    Ok(())
}
