//! `lakectl ops`: list the operation catalog.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output;
use lakectl_core::Router;
use serde_json::json;

pub fn run(router: &Router, format: OutputFormat) -> Result<()> {
    let ops: Vec<_> = router
        .operations()
        .into_iter()
        .map(|(name, scope)| json!({ "operation": name, "scope": scope }))
        .collect();
    output::print_value(&json!({ "operations": ops, "count": ops.len() }), format)
}
