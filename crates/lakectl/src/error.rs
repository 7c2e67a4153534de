//! Error types for lakectl
//!
//! CLI-level wrapper around the core errors, with cargo-style suggestions
//! rendered to stderr.

use colored::Colorize;
use lakectl_core::{ClassifiedError, ConfigError, DispatchError};
use thiserror::Error;

/// Main error type for the lakectl application
#[derive(Error, Debug)]
pub enum LakectlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown operation '{name}'")]
    UnknownOperation { name: String },

    #[error("{0}")]
    Operation(ClassifiedError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("File error for '{path}': {message}")]
    FileError { path: String, message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for lakectl operations
pub type Result<T> = std::result::Result<T, LakectlError>;

impl From<DispatchError> for LakectlError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownOperation(name) => LakectlError::UnknownOperation { name },
            DispatchError::Operation(e) => LakectlError::Operation(e),
        }
    }
}

impl LakectlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            LakectlError::UnknownOperation { .. } => vec![
                "List available operations: lakectl ops".to_string(),
                "Check the operation name spelling".to_string(),
            ],
            LakectlError::Operation(e) => {
                let mut tips: Vec<String> = e.kind.hint().map(str::to_string).into_iter().collect();
                if e.retries_exhausted {
                    tips.push(
                        "Raise the retry budget with --retry-attempts or the profile's [resilience] table"
                            .to_string(),
                    );
                }
                tips
            }
            LakectlError::Config(inner) => match inner {
                ConfigError::ProfileNotFound { .. } => vec![
                    "List available profiles: lakectl profile list".to_string(),
                    "Create a profile: lakectl profile set <name> --host <url> --token <token>"
                        .to_string(),
                ],
                ConfigError::MissingWorkspaceHost { .. } | ConfigError::MissingToken { .. } => vec![
                    "Set LAKEHOUSE_HOST and LAKEHOUSE_TOKEN, or configure a profile:"
                        .to_string(),
                    "    lakectl profile set <name> --host <url> --token <token>".to_string(),
                ],
                ConfigError::MissingAccountSettings { .. } => vec![
                    "Account operations need LAKEHOUSE_ACCOUNT_HOST and LAKEHOUSE_ACCOUNT_ID,"
                        .to_string(),
                    "or --account-host/--account-id on the profile".to_string(),
                ],
                _ => vec![],
            },
            LakectlError::InvalidInput { .. } => vec![
                "Pass inline JSON: lakectl call <op> --data '{\"key\": \"value\"}'".to_string(),
                "Or a file: lakectl call <op> --data @args.json".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Render the error with its suggestions, cargo-style.
    pub fn display_with_suggestions(&self) -> String {
        let mut out = format!("{}{}{}", "error".red().bold(), ": ".bold(), self);
        let tips = self.suggestions();
        if !tips.is_empty() {
            out.push_str(&format!("\n\n  {}{}", "tip".yellow().bold(), ":".bold()));
            for tip in tips {
                out.push_str(&format!("\n      {tip}"));
            }
        }
        out
    }
}
