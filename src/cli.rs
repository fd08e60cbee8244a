use std::path::PathBuf;

use clap::{Parser, Subcommand, error::ErrorKind};

/// CLI arguments parser using `clap`
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Directory holding the registry configurations [default: ~/.regus]
    #[arg(long, global = true, env = "REGUS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Npm user config switched between registries [default: ~/.npmrc]
    #[arg(long, global = true, env = "REGUS_NPMRC")]
    pub npmrc: Option<PathBuf>,

    /// Subcommand chosen to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prints registry configurations (default)
    List {
        /// Print configurations as JSON
        #[arg(long)]
        json: bool,
    },
    /// Creates a new registry configuration
    Add {
        /// Unique name of the configuration
        name: String,
        /// Registry URL offered as default
        url: Option<String>,
    },
    /// Modifies the npm user config to use a different registry
    Use {
        /// Name of the configuration to switch to
        name: String,
    },
    /// Removes a registry configuration
    Remove {
        /// Name of the configuration to remove
        name: String,
    },
    /// Displays the configuration matching the npm user config
    Current,
}

/// Process exit code for a command line that could not be parsed
///
/// Help and version output are successful runs, every usage error exits with 1
/// like any other failed command.
pub fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_command_is_allowed() {
        let cli = Cli::try_parse_from(["regus"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn add_takes_an_optional_url() {
        let cli = Cli::try_parse_from(["regus", "add", "custom"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Add { url: None, .. })));

        let cli = Cli::try_parse_from(["regus", "add", "custom", "http://r/"]).unwrap();
        match cli.command {
            Some(Commands::Add { name, url }) => {
                assert_eq!(name, "custom");
                assert_eq!(url.as_deref(), Some("http://r/"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn use_requires_a_name() {
        assert!(Cli::try_parse_from(["regus", "use"]).is_err());
    }

    #[test]
    fn paths_are_accepted_after_the_subcommand() {
        let cli =
            Cli::try_parse_from(["regus", "use", "custom", "--npmrc", "/tmp/npmrc"]).unwrap();
        assert_eq!(cli.npmrc, Some(PathBuf::from("/tmp/npmrc")));
    }

    #[test]
    fn usage_errors_exit_with_one() {
        let err = Cli::try_parse_from(["regus", "use"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);

        let err = Cli::try_parse_from(["regus", "--no-such-flag"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);
    }

    #[test]
    fn help_and_version_exit_successfully() {
        let err = Cli::try_parse_from(["regus", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 0);

        let err = Cli::try_parse_from(["regus", "--version"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 0);
    }
}
