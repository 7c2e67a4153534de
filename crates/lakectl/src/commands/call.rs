//! `lakectl call`: dispatch one operation through the router.

use crate::cli::OutputFormat;
use crate::error::{LakectlError, Result};
use crate::output;
use lakectl_core::Router;
use serde_json::Value;
use tracing::debug;

pub async fn run(
    router: &Router,
    operation: &str,
    data: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let args = parse_data(data)?;
    debug!(operation, "dispatching from CLI");
    let result = router.dispatch(operation, args).await?;
    output::print_value(&result, format)
}

/// Operation arguments: absent, inline JSON, or `@file`.
fn parse_data(data: Option<&str>) -> Result<Value> {
    let Some(data) = data else {
        return Ok(Value::Null);
    };
    let raw = if let Some(path) = data.strip_prefix('@') {
        std::fs::read_to_string(path).map_err(|e| LakectlError::FileError {
            path: path.to_string(),
            message: e.to_string(),
        })?
    } else {
        data.to_string()
    };
    serde_json::from_str(&raw).map_err(|e| LakectlError::InvalidInput {
        message: format!("arguments are not valid JSON: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn absent_data_is_null() {
        assert_eq!(parse_data(None).unwrap(), Value::Null);
    }

    #[test]
    fn inline_json_parses() {
        assert_eq!(
            parse_data(Some(r#"{"job_id": 42}"#)).unwrap(),
            json!({"job_id": 42})
        );
    }

    #[test]
    fn at_prefix_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cluster_id": "c-1"}}"#).unwrap();
        let arg = format!("@{}", file.path().display());
        assert_eq!(
            parse_data(Some(&arg)).unwrap(),
            json!({"cluster_id": "c-1"})
        );
    }

    #[test]
    fn malformed_json_is_invalid_input() {
        let err = parse_data(Some("{nope")).unwrap_err();
        assert!(matches!(err, LakectlError::InvalidInput { .. }));
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let err = parse_data(Some("@/does/not/exist.json")).unwrap_err();
        assert!(matches!(err, LakectlError::FileError { .. }));
    }
}
