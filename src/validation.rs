use colored::Colorize;
use inquire::{Confirm, Text};
use validator::{ValidateEmail, ValidateUrl};

use crate::{error::AppError, storage::check_name};

/// Maximum length for a profile name
const MAX_NAME_LENGTH: usize = 30;
/// Maximum length for a registry or proxy URL
const MAX_URL_LENGTH: usize = 2048;
/// Maximum length for an email address
const MAX_EMAIL_LENGTH: usize = 100;

/// Prompts user for input until valid input is provided
///
/// # Arguments
/// * `prompt_message` - Question shown to the user
/// * `default` - Value used when the user just presses enter
/// * `input_validation` - Check applied to every answer
pub fn prompt_until_valid<F>(
    prompt_message: &str,
    default: Option<&str>,
    input_validation: F,
) -> Result<String, AppError>
where
    F: Fn(&str) -> Result<(), AppError>,
{
    loop {
        let mut text = Text::new(prompt_message);
        if let Some(value) = default {
            text = text.with_default(value);
        }
        let input: String = text.prompt()?.trim().to_string();
        match input_validation(&input) {
            Ok(_) => break Ok(input),
            Err(AppError::Validation(msg)) => println!("{}", msg.red()),
            Err(e) => return Err(e),
        }
    }
}

/// Asks a yes/no question
pub fn prompt_confirm(prompt_message: &str, default: bool) -> Result<bool, AppError> {
    Ok(Confirm::new(prompt_message).with_default(default).prompt()?)
}

/// Validates a new profile name
pub fn validate_profile_name(name: &str, existing_names: &[String]) -> Result<(), AppError> {
    if name.is_empty() {
        Err(AppError::Validation("Missing a required parameter: registry name.".to_string()))
    } else if name.len() > MAX_NAME_LENGTH {
        Err(AppError::Validation(format!(
            "Name too long (max {MAX_NAME_LENGTH} characters)"
        )))
    } else if name.contains(char::is_whitespace) {
        Err(AppError::Validation(format!("Invalid registry name \"{name}\"")))
    } else if let Err(err) = check_name(name) {
        Err(err)
    } else if existing_names.iter().any(|existing| existing == name) {
        Err(AppError::Validation(format!("Registry \"{name}\" already exists")))
    } else {
        Ok(())
    }
}

/// Validates a registry URL
pub fn validate_registry_url(url: &str) -> Result<(), AppError> {
    if url.is_empty() {
        Err(AppError::Validation("Registry URL cannot be empty".to_string()))
    } else {
        validate_http_url(url)
    }
}

/// Validates an optional proxy URL, empty meaning "not set"
pub fn validate_optional_url(url: &str) -> Result<(), AppError> {
    if url.is_empty() {
        Ok(())
    } else {
        validate_http_url(url)
    }
}

/// Validates an optional email address, empty meaning "not set"
pub fn validate_optional_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() {
        Ok(())
    } else if email.len() > MAX_EMAIL_LENGTH {
        Err(AppError::Validation(format!(
            "Email too long (max {MAX_EMAIL_LENGTH} characters)"
        )))
    } else if !email.validate_email() {
        Err(AppError::Validation("Invalid email format".to_string()))
    } else {
        Ok(())
    }
}

fn validate_http_url(url: &str) -> Result<(), AppError> {
    if url.len() > MAX_URL_LENGTH {
        Err(AppError::Validation(format!(
            "URL too long (max {MAX_URL_LENGTH} characters)"
        )))
    } else if !(url.starts_with("http://") || url.starts_with("https://")) || !url.validate_url() {
        Err(AppError::Validation(format!("Invalid URL \"{url}\"")))
    } else {
        Ok(())
    }
}
