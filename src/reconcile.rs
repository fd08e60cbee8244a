//! Synchronization between the npm user config and stored profiles.
//!
//! The profile currently in use is never recorded anywhere. It is found by
//! matching the `registry` URL of the npm user config against every stored
//! profile, so edits made by npm or by hand between two runs are picked up.

use tracing::{debug, info};

use crate::{
    error::AppError,
    ini::{IniRecord, IniValue},
    profile::{DEFAULT_REGISTRY_URL, Field, ProfileConfig},
    shared::SharedConfig,
    storage::ProfileStore,
};

/// Key of the npm cache directory in the npm user config
const CACHE_KEY: &str = "cache";

/// Result of carrying npm user config edits back into the matching profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The named profile matched and was rewritten with new values
    Updated(String),
    /// The named profile matched and already had the same values
    Unchanged(String),
    /// No stored profile uses this registry URL; nothing was written
    UnknownRegistry(String),
}

impl SyncOutcome {
    /// Name of the profile that was rewritten, if any
    pub fn updated_profile(&self) -> Option<&str> {
        match self {
            SyncOutcome::Updated(name) => Some(name),
            _ => None,
        }
    }
}

/// Outcome of switching the npm user config to a profile
#[derive(Debug, Clone)]
pub struct Activation {
    pub name: String,
    pub registry_url: String,
    /// Settings now written to the npm user config
    pub config: ProfileConfig,
    /// What happened to the previously active profile
    pub sync: SyncOutcome,
}

/// Keeps the npm user config and the profile store consistent
pub struct ReconciliationEngine<'a> {
    store: &'a ProfileStore,
    shared: &'a SharedConfig,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(store: &'a ProfileStore, shared: &'a SharedConfig) -> Self {
        ReconciliationEngine { store, shared }
    }

    /// Finds the first stored profile (by name order) using `url`
    ///
    /// Returns the profile name together with its raw record.
    pub fn find_by_registry(&self, url: &str) -> Result<Option<(String, IniRecord)>, AppError> {
        for name in self.store.list_names()? {
            let record = self.store.load(&name)?;
            if ProfileConfig::from_record(&record).registry() == Some(url) {
                return Ok(Some((name, record)));
            }
        }
        Ok(None)
    }

    /// Name of the profile matching the npm user config, if any
    pub fn current(&self) -> Result<Option<String>, AppError> {
        let shared = self.shared.read()?;
        let url = registry_of(&shared);
        Ok(self.find_by_registry(url)?.map(|(name, _)| name))
    }

    /// Copies tracked settings from the npm user config into the matching profile
    pub fn sync_from_shared(&self) -> Result<SyncOutcome, AppError> {
        let shared = self.shared.read()?;
        let url = registry_of(&shared);

        let Some((name, mut record)) = self.find_by_registry(url)? else {
            info!(registry = url, "discarding npmrc configuration of an unknown registry");
            return Ok(SyncOutcome::UnknownRegistry(url.to_string()));
        };

        let old = ProfileConfig::from_record(&record);
        let mut updated = old.clone();
        updated.update_from(&shared);

        let changed = old.diff(&updated);
        if changed.is_empty() {
            debug!(profile = %name, "profile already matches npmrc");
            return Ok(SyncOutcome::Unchanged(name));
        }

        info!(profile = %name, fields = ?changed, "updating profile with config from npmrc");
        updated.apply_to(&mut record);
        self.store.store(&name, &record)?;
        Ok(SyncOutcome::Updated(name))
    }

    /// Switches the npm user config to the named profile
    ///
    /// Pending edits of the previously active profile are saved first. An
    /// unknown or invalid target is rejected before anything is written.
    pub fn activate(&self, name: &str) -> Result<Activation, AppError> {
        self.store.load_config(name)?.validate()?;

        let sync = self.sync_from_shared()?;

        // reload: the sync may have just rewritten this very profile
        let config = self.store.load_config(name)?;
        let registry_url = config.registry().unwrap_or(DEFAULT_REGISTRY_URL).to_string();

        let mut next = self.shared.read()?;
        config.apply_to(&mut next);
        let cache_path = self.store.cache_path_for(name);
        next.insert(
            CACHE_KEY.to_string(),
            IniValue::Str(cache_path.to_string_lossy().into_owned()),
        );
        self.shared.write(&next)?;
        info!(profile = name, registry = %registry_url, "switched npmrc");

        Ok(Activation {
            name: name.to_string(),
            registry_url,
            config,
            sync,
        })
    }
}

fn registry_of(shared: &IniRecord) -> &str {
    shared
        .get(Field::Registry.key())
        .and_then(IniValue::as_str)
        .filter(|url| !url.is_empty())
        .unwrap_or(DEFAULT_REGISTRY_URL)
}
