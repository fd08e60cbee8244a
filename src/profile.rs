use std::{collections::BTreeSet, path::Path};

use serde::Serialize;

use crate::{
    error::AppError,
    ini::{self, IniRecord, IniValue},
};

/// Registry used when neither a profile nor the npm user config names one
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org/";

/// Npm config keys carried between profiles and the npm user config
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Registry,
    Username,
    Email,
    Proxy,
    HttpsProxy,
    LocalAddress,
    StrictSsl,
    AlwaysAuth,
    Auth,
    Password,
}

impl Field {
    /// Every tracked field
    pub const ALL: [Field; 10] = [
        Field::Registry,
        Field::Username,
        Field::Email,
        Field::Proxy,
        Field::HttpsProxy,
        Field::LocalAddress,
        Field::StrictSsl,
        Field::AlwaysAuth,
        Field::Auth,
        Field::Password,
    ];

    /// Key used for this field in ini files
    pub fn key(self) -> &'static str {
        match self {
            Field::Registry => "registry",
            Field::Username => "username",
            Field::Email => "email",
            Field::Proxy => "proxy",
            Field::HttpsProxy => "https-proxy",
            Field::LocalAddress => "local-address",
            Field::StrictSsl => "strict-ssl",
            Field::AlwaysAuth => "always-auth",
            Field::Auth => "_auth",
            Field::Password => "_password",
        }
    }

    fn is_flag(self) -> bool {
        matches!(self, Field::StrictSsl | Field::AlwaysAuth)
    }

    fn accepts(self, value: &IniValue) -> bool {
        if self.is_flag() {
            value.as_bool().is_some()
        } else {
            value.as_str().is_some()
        }
    }
}

/// Tracked settings of one named registry configuration
///
/// Every field is optional: `None` means the key is absent, which matters
/// when the profile is applied to the npm user config (absent keys are
/// removed there).
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(rename = "https-proxy", skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    #[serde(rename = "local-address", skip_serializing_if = "Option::is_none")]
    pub local_address: Option<String>,
    #[serde(rename = "strict-ssl", skip_serializing_if = "Option::is_none")]
    pub strict_ssl: Option<bool>,
    #[serde(rename = "always-auth", skip_serializing_if = "Option::is_none")]
    pub always_auth: Option<bool>,
    /// Pre-encoded `_auth` token
    #[serde(skip)]
    pub auth: Option<String>,
    /// `_password` written by `npm login`
    #[serde(skip)]
    pub password: Option<String>,
}

impl ProfileConfig {
    /// Builds a config from a raw record, keeping only tracked fields
    ///
    /// Values of the wrong kind (e.g. `strict-ssl = maybe`) are dropped.
    pub fn from_record(record: &IniRecord) -> Self {
        let mut config = ProfileConfig::default();
        for field in Field::ALL {
            config.set(field, record.get(field.key()));
        }
        config
    }

    /// Builds the default profile from the user's existing npm settings
    ///
    /// # Arguments
    /// * `user_defaults` - Contents of the npm user config; its tracked
    ///   fields override the built-in registry URL
    pub fn create_default(user_defaults: &IniRecord) -> Result<Self, AppError> {
        let mut base = IniRecord::new();
        base.insert(
            Field::Registry.key().to_string(),
            IniValue::from(DEFAULT_REGISTRY_URL),
        );
        base.extend(user_defaults.iter().map(|(k, v)| (k.clone(), v.clone())));

        let config = ProfileConfig::from_record(&base);
        config.validate()?;
        Ok(config)
    }

    /// Builds the default profile from an npm user config file, if it exists
    pub fn default_from_user_config(npmrc_path: &Path) -> Result<Self, AppError> {
        let user_defaults = if npmrc_path.exists() {
            ini::read_file(npmrc_path)?
        } else {
            IniRecord::new()
        };
        ProfileConfig::create_default(&user_defaults)
    }

    /// Registry URL, if set
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// Checks that the profile names a registry
    pub fn validate(&self) -> Result<(), AppError> {
        match self.registry() {
            Some(url) if !url.trim().is_empty() => Ok(()),
            _ => Err(AppError::Validation(
                "registry configuration must have a \"registry\" URL".to_string(),
            )),
        }
    }

    /// Keys of fields whose value or presence differs between two configs
    pub fn diff(&self, other: &ProfileConfig) -> BTreeSet<&'static str> {
        Field::ALL
            .into_iter()
            .filter(|field| self.get(*field) != other.get(*field))
            .map(Field::key)
            .collect()
    }

    /// Writes this config onto a record
    ///
    /// Present fields are set, absent tracked fields are removed from the
    /// record. Untracked keys of the record are left alone.
    pub fn apply_to(&self, target: &mut IniRecord) {
        for field in Field::ALL {
            match self.get(field) {
                Some(value) => {
                    target.insert(field.key().to_string(), value);
                }
                None => {
                    target.remove(field.key());
                }
            }
        }
    }

    /// Overlays tracked fields present in `source` onto this config
    ///
    /// Fields missing from `source` keep their current value.
    pub fn update_from(&mut self, source: &IniRecord) {
        for field in Field::ALL {
            if let Some(value) = source.get(field.key()).filter(|v| field.accepts(v)) {
                self.set(field, Some(value));
            }
        }
    }

    /// Tracked fields as a standalone record
    pub fn to_record(&self) -> IniRecord {
        let mut record = IniRecord::new();
        self.apply_to(&mut record);
        record
    }

    /// Whether the registry requires authentication for every request
    pub fn requires_login(&self) -> bool {
        self.always_auth == Some(true)
    }

    /// Whether the config carries credentials usable for publishing
    pub fn has_auth_credentials(&self) -> bool {
        self.auth.is_some() || (self.username.is_some() && self.password.is_some())
    }

    fn get(&self, field: Field) -> Option<IniValue> {
        let text = |value: &Option<String>| value.clone().map(IniValue::Str);
        match field {
            Field::Registry => text(&self.registry),
            Field::Username => text(&self.username),
            Field::Email => text(&self.email),
            Field::Proxy => text(&self.proxy),
            Field::HttpsProxy => text(&self.https_proxy),
            Field::LocalAddress => text(&self.local_address),
            Field::StrictSsl => self.strict_ssl.map(IniValue::Bool),
            Field::AlwaysAuth => self.always_auth.map(IniValue::Bool),
            Field::Auth => text(&self.auth),
            Field::Password => text(&self.password),
        }
    }

    fn set(&mut self, field: Field, value: Option<&IniValue>) {
        let text = || value.and_then(IniValue::as_str).map(str::to_string);
        let flag = || value.and_then(IniValue::as_bool);
        match field {
            Field::Registry => self.registry = text(),
            Field::Username => self.username = text(),
            Field::Email => self.email = text(),
            Field::Proxy => self.proxy = text(),
            Field::HttpsProxy => self.https_proxy = text(),
            Field::LocalAddress => self.local_address = text(),
            Field::StrictSsl => self.strict_ssl = flag(),
            Field::AlwaysAuth => self.always_auth = flag(),
            Field::Auth => self.auth = text(),
            Field::Password => self.password = text(),
        }
    }
}
