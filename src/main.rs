mod cli;
mod error;
mod ini;
mod npm;
mod profile;
mod reconcile;
mod shared;
mod storage;
mod validation;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Cli, Commands, usage_exit_code},
    error::AppError,
    ini::IniValue,
    profile::ProfileConfig,
    reconcile::{ReconciliationEngine, SyncOutcome},
    shared::SharedConfig,
    storage::ProfileStore,
    validation::{
        prompt_confirm, prompt_until_valid, validate_optional_email, validate_optional_url,
        validate_profile_name, validate_registry_url,
    },
};

/// Data directory in user's home directory
const DATA_DIR_NAME: &str = ".regus";
/// Npm user config in user's home directory
const NPMRC_FILE_NAME: &str = ".npmrc";
/// Name used in hints printed to the user
const BIN_NAME: &str = env!("CARGO_PKG_NAME");

/// Entry of `list --json`
#[derive(Serialize, Debug)]
struct ListedRegistry {
    name: String,
    active: bool,
    authenticated: bool,
    #[serde(flatten)]
    config: ProfileConfig,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_exit_code(&err));
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let npmrc_path: PathBuf = match cli.npmrc {
        Some(path) => path,
        None => home_path(NPMRC_FILE_NAME)?,
    };
    let data_dir: PathBuf = match cli.data_dir {
        Some(path) => path,
        None => home_path(DATA_DIR_NAME)?,
    };

    let store = open_store(&data_dir, &npmrc_path)?;
    let shared = SharedConfig::new(npmrc_path);

    match cli.command.unwrap_or(Commands::List { json: false }) {
        Commands::List { json } => list_registries(&store, &shared, json),
        Commands::Add { name, url } => add_registry(&store, &shared, &name, url.as_deref()),
        Commands::Use { name } => use_registry(&store, &shared, &name),
        Commands::Remove { name } => remove_registry(&store, &name),
        Commands::Current => show_current_registry(&store, &shared),
    }
}

/// Gets the path of a file in the user's home directory
fn home_path(file_name: &str) -> Result<PathBuf, AppError> {
    let home_dir: PathBuf = dirs::home_dir().ok_or_else(|| {
        AppError::Validation("failed to find the home directory".to_string())
    })?;
    Ok(home_dir.join(file_name))
}

/// Opens the profile store, bootstrapping it from the npm user config on first run
fn open_store(data_dir: &Path, npmrc_path: &Path) -> Result<ProfileStore, AppError> {
    let first_run = !data_dir.exists();
    let store = ProfileStore::init(data_dir, || ProfileConfig::default_from_user_config(npmrc_path))?;

    if first_run {
        let default = store.load_config(storage::DEFAULT_PROFILE)?;
        println!("{}", "Running for the first time.".yellow());
        println!("Created {}", store.data_dir().display());
        println!(
            "Added \"{}\" registry ({})",
            storage::DEFAULT_PROFILE,
            default.registry().unwrap_or_default()
        );
    }

    Ok(store)
}

/// Prints all registry configurations, flagging the one npm currently uses
fn list_registries(store: &ProfileStore, shared: &SharedConfig, json: bool) -> Result<(), AppError> {
    let current: Option<String> = ReconciliationEngine::new(store, shared).current()?;

    let mut registries: Vec<ListedRegistry> = Vec::new();
    for name in store.list_names()? {
        let config = store.load_config(&name)?;
        registries.push(ListedRegistry {
            active: current.as_deref() == Some(name.as_str()),
            authenticated: config.has_auth_credentials(),
            name,
            config,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&registries)?);
        return Ok(());
    }

    println!("{}", "Available configurations:".blue());
    for registry in &registries {
        let marker = if registry.active { "*" } else { " " };
        let line = format!(
            " {marker} {} ({})",
            registry.name,
            registry.config.registry().unwrap_or_default()
        );
        if registry.active {
            println!("{}", line.green());
        } else {
            println!("{line}");
        }
    }
    println!();
    println!("Run `{BIN_NAME} use <name>` to switch to a different registry.");
    Ok(())
}

/// Prompts for the settings of a new registry configuration and stores it
fn add_registry(
    store: &ProfileStore,
    shared: &SharedConfig,
    name: &str,
    url: Option<&str>,
) -> Result<(), AppError> {
    validate_profile_name(name, &store.list_names()?)?;
    let defaults = ProfileConfig::from_record(&shared.read()?);

    println!("{} \"{}\"", "Adding a new configuration".blue(), name);

    let registry = prompt_until_valid("Registry URL:", url, validate_registry_url)?;
    let proxy = prompt_until_valid(
        "HTTP proxy:",
        defaults.proxy.as_deref(),
        validate_optional_url,
    )?;
    let https_proxy = prompt_until_valid(
        "HTTPS proxy:",
        defaults.https_proxy.as_deref(),
        validate_optional_url,
    )?;
    let username = prompt_until_valid("User name:", defaults.username.as_deref(), |_| Ok(()))?;
    let email = prompt_until_valid(
        "Email:",
        defaults.email.as_deref(),
        validate_optional_email,
    )?;
    let always_auth = prompt_confirm("Always authenticate?", true)?;
    let strict_ssl = prompt_confirm("Check validity of server SSL certificates?", true)?;

    let config = ProfileConfig {
        registry: Some(registry),
        username: non_empty(username),
        email: non_empty(email),
        proxy: non_empty(proxy),
        https_proxy: non_empty(https_proxy),
        strict_ssl: Some(strict_ssl),
        always_auth: Some(always_auth),
        ..Default::default()
    };

    let mut record = config.to_record();
    record.insert(
        "cache".to_string(),
        IniValue::Str(store.cache_path_for(name).to_string_lossy().into_owned()),
    );
    store.store(name, &record)?;

    println!("{} \"{}\" was created.", "Configuration".green(), name);
    println!("Run `{BIN_NAME} use \"{name}\"` to let the npm client use this registry.");
    Ok(())
}

/// Switches the npm user config to a registry configuration
fn use_registry(store: &ProfileStore, shared: &SharedConfig, name: &str) -> Result<(), AppError> {
    let activation = ReconciliationEngine::new(store, shared).activate(name)?;

    if let Some(updated) = activation.sync.updated_profile() {
        println!("Updating \"{updated}\" with config from npmrc.");
    }
    if let SyncOutcome::UnknownRegistry(url) = &activation.sync {
        println!(
            "{} {}",
            "Discarding npmrc configuration of an unknown registry".yellow(),
            url
        );
    }

    println!(
        "{} \"{}\" ({}).",
        "Using the registry".green(),
        activation.name,
        activation.registry_url
    );

    if activation.config.requires_login() {
        println!("The registry requires authentication for all requests.");
        println!("Running `npm login` to setup credentials.");
        npm::spawn_login(Some(shared.path()))?;
    }

    Ok(())
}

/// Removes a registry configuration and its npm cache
fn remove_registry(store: &ProfileStore, name: &str) -> Result<(), AppError> {
    store.remove(name)?;
    println!("{} \"{}\" was removed.", "The registry".green(), name);
    Ok(())
}

/// Displays the registry configuration npm currently uses
fn show_current_registry(store: &ProfileStore, shared: &SharedConfig) -> Result<(), AppError> {
    match ReconciliationEngine::new(store, shared).current()? {
        Some(name) => {
            let config = store.load_config(&name)?;
            println!(
                "{} {} ({})",
                "current registry:".blue(),
                name,
                config.registry().unwrap_or_default()
            );
        }
        None => println!(
            "{}",
            "npmrc uses a registry with no stored configuration".yellow()
        ),
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_answers_are_omitted() {
        assert_eq!(non_empty(String::new()), None);
        assert_eq!(non_empty("http://proxy".to_string()).as_deref(), Some("http://proxy"));
    }

    #[test]
    fn open_store_bootstraps_default_from_npmrc() {
        let dir = tempfile::TempDir::new().unwrap();
        let npmrc = dir.path().join(".npmrc");
        std::fs::write(&npmrc, "registry = http://mirror/\nemail = me@example.com\n").unwrap();

        let store = open_store(&dir.path().join("data"), &npmrc).unwrap();

        let default = store.load_config(storage::DEFAULT_PROFILE).unwrap();
        assert_eq!(default.registry(), Some("http://mirror/"));
        assert_eq!(default.email.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn listed_registry_serializes_flat() {
        let listed = ListedRegistry {
            name: "custom".to_string(),
            active: true,
            authenticated: true,
            config: ProfileConfig {
                registry: Some("http://r/".to_string()),
                strict_ssl: Some(false),
                password: Some("secret".to_string()),
                ..Default::default()
            },
        };

        let value = serde_json::to_value(&listed).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "custom",
                "active": true,
                "authenticated": true,
                "registry": "http://r/",
                "strict-ssl": false,
            })
        );
    }

    #[test]
    fn remove_reports_protected_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_store(&dir.path().join("data"), &dir.path().join(".npmrc")).unwrap();
        let err = remove_registry(&store, "default").unwrap_err();
        assert_eq!(err.to_string(), "The default registry cannot be removed.");
        assert_eq!(err.exit_code(), 1);
    }
}
