//! Assembly of chunked query results into one logical row set.
//!
//! The statement API returns large results in numbered chunks: the initial
//! response carries chunk 0 plus an authoritative `total_chunk_count`, and
//! the remaining chunks are fetched individually. Assembly is all-or-nothing;
//! a chunk fetch that fails through its retry budget discards everything
//! gathered so far.

use crate::error::ClassifiedError;
use crate::retry::{RetryPolicy, run_with_retry};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// The initial statement response, already parsed: first-chunk rows plus the
/// backend's declared chunk count and truncation flag.
#[derive(Debug, Clone, Default)]
pub struct ChunkedResponse {
    pub rows: Vec<Value>,
    /// Authoritative. The initial rows are chunk 0; further chunks are
    /// `1..total_chunk_count`. Individual chunk responses never extend this.
    pub total_chunk_count: u64,
    /// Set when the backend itself truncated the result server-side.
    pub truncated: bool,
}

/// A fully assembled result.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Assembled {
    pub rows: Vec<Value>,
    pub row_count: usize,
    /// True when the backend truncated the result or a caller `row_limit`
    /// dropped rows here.
    pub truncated: bool,
}

/// Fetch chunks `1..total_chunk_count` in ascending order and append them to
/// the initial rows, retrying each fetch under `policy`.
///
/// When `total_chunk_count <= 1` no fetch is issued. A `row_limit` caps the
/// assembled result to exactly that many rows and marks it truncated.
pub async fn assemble<F, Fut, E>(
    policy: &RetryPolicy,
    op_name: &str,
    initial: ChunkedResponse,
    mut fetch_chunk: F,
    row_limit: Option<usize>,
) -> Result<Assembled, ClassifiedError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Vec<Value>, E>>,
    E: Into<ClassifiedError>,
{
    let mut rows = initial.rows;
    let mut truncated = initial.truncated;

    if initial.total_chunk_count > 1 {
        debug!(
            operation = op_name,
            chunks = initial.total_chunk_count,
            "assembling multi-chunk result"
        );
        for index in 1..initial.total_chunk_count {
            let page = run_with_retry(policy, op_name, || fetch_chunk(index)).await?;
            rows.extend(page);
        }
    }

    if let Some(limit) = row_limit
        && rows.len() > limit
    {
        rows.truncate(limit);
        truncated = true;
    }

    Ok(Assembled {
        row_count: rows.len(),
        truncated,
        rows,
    })
}
