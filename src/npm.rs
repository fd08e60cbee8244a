use std::{
    path::Path,
    process::{Command, ExitStatus},
};

use tracing::debug;

use crate::error::AppError;

/// Npm executable, `npm.cmd` on Windows
const NPM_PROGRAM: &str = if cfg!(windows) { "npm.cmd" } else { "npm" };

/// Builds the `npm login` command
///
/// # Arguments
/// * `userconfig` - Npm user config the credentials are written to; npm's
///   own default (`~/.npmrc`) is used when `None`
pub fn login_command(userconfig: Option<&Path>) -> Command {
    let mut command = Command::new(NPM_PROGRAM);
    if let Some(path) = userconfig {
        command.arg("--userconfig").arg(path);
    }
    command.arg("login");
    command
}

/// Runs `npm login` interactively, sharing this process's terminal
pub fn spawn_login(userconfig: Option<&Path>) -> Result<(), AppError> {
    let mut command = login_command(userconfig);
    debug!(?command, "spawning npm login");

    let status: ExitStatus = command
        .status()
        .map_err(|err| AppError::NpmCommand(format!("cannot run `npm login`: {err}")))?;

    if !status.success() {
        return Err(AppError::NpmCommand(format!("`npm login` exited with {status}")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_targets_the_given_userconfig() {
        let command = login_command(Some(Path::new("/data/custom.ini")));
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["--userconfig", "/data/custom.ini", "login"]);
        assert_eq!(command.get_program(), NPM_PROGRAM);
    }

    #[test]
    fn login_without_userconfig_uses_npm_default() {
        let command = login_command(None);
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["login"]);
    }
}
