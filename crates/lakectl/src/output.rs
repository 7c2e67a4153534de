//! Output rendering for command results.

use crate::cli::OutputFormat;
use crate::error::{LakectlError, Result};
use serde_json::Value;

pub fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let rendered = serde_json::to_string_pretty(value).map_err(|e| {
                LakectlError::OutputError {
                    message: e.to_string(),
                }
            })?;
            println!("{rendered}");
        }
        OutputFormat::Yaml => {
            let rendered =
                serde_yaml::to_string(value).map_err(|e| LakectlError::OutputError {
                    message: e.to_string(),
                })?;
            print!("{rendered}");
        }
    }
    Ok(())
}
