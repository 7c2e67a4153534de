//! SQL statement execution with chunked result assembly.

use crate::batch::run_batch;
use crate::chunks::{ChunkedResponse, assemble};
use crate::client::WorkspaceClient;
use crate::error::ClassifiedError;
use crate::registry::Scope;
use crate::retry::{RetryPolicy, run_with_retry};
use crate::router::{CallContext, HandlerResult, RouterBuilder, parse_args};
use serde::Deserialize;
use serde_json::{Value, json};

pub fn register(builder: RouterBuilder) -> RouterBuilder {
    builder
        .operation("execute-statement", Scope::Workspace, execute_statement)
        .operation("get-statement", Scope::Workspace, get_statement)
        .operation("cancel-statement", Scope::Workspace, cancel_statement)
        .operation(
            "execute-statements-batch",
            Scope::Workspace,
            execute_statements_batch,
        )
}

#[derive(Debug, Deserialize)]
struct ExecuteStatementInput {
    warehouse_id: String,
    statement: String,
    #[serde(default)]
    catalog: Option<String>,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default = "default_wait_timeout")]
    wait_timeout: String,
    #[serde(default)]
    row_limit: Option<usize>,
}

fn default_wait_timeout() -> String {
    "10s".to_string()
}

fn statement_body(
    warehouse_id: &str,
    statement: &str,
    catalog: Option<&str>,
    schema: Option<&str>,
    wait_timeout: &str,
) -> Value {
    let mut body = json!({
        "warehouse_id": warehouse_id,
        "statement": statement,
        "wait_timeout": wait_timeout,
    });
    if let Some(catalog) = catalog {
        body["catalog"] = json!(catalog);
    }
    if let Some(schema) = schema {
        body["schema"] = json!(schema);
    }
    body
}

async fn execute_statement(ctx: CallContext, args: Value) -> HandlerResult {
    let input: ExecuteStatementInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let body = statement_body(
        &input.warehouse_id,
        &input.statement,
        input.catalog.as_deref(),
        input.schema.as_deref(),
        &input.wait_timeout,
    );
    let response = run_with_retry(&ctx.retry, "execute-statement", || {
        client.post("/api/2.0/sql/statements", &body)
    })
    .await?;
    assemble_statement(client, &ctx.retry, "execute-statement", response, input.row_limit).await
}

#[derive(Debug, Deserialize)]
struct GetStatementInput {
    statement_id: String,
    #[serde(default)]
    row_limit: Option<usize>,
}

async fn get_statement(ctx: CallContext, args: Value) -> HandlerResult {
    let input: GetStatementInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let path = format!("/api/2.0/sql/statements/{}", input.statement_id);
    let response =
        run_with_retry(&ctx.retry, "get-statement", || client.get(&path)).await?;
    assemble_statement(client, &ctx.retry, "get-statement", response, input.row_limit).await
}

#[derive(Debug, Deserialize)]
struct StatementIdInput {
    statement_id: String,
}

async fn cancel_statement(ctx: CallContext, args: Value) -> HandlerResult {
    let input: StatementIdInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let path = format!("/api/2.0/sql/statements/{}/cancel", input.statement_id);
    run_with_retry(&ctx.retry, "cancel-statement", || {
        client.post(&path, &Value::Null)
    })
    .await?;
    Ok(json!({ "statement_id": input.statement_id, "status": "cancelled" }))
}

#[derive(Debug, Deserialize)]
struct ExecuteStatementsBatchInput {
    warehouse_id: String,
    statements: Vec<String>,
    #[serde(default)]
    catalog: Option<String>,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default = "default_wait_timeout")]
    wait_timeout: String,
    #[serde(default)]
    row_limit: Option<usize>,
    /// Statements are often order-dependent, so the batch runs sequentially
    /// unless the caller raises this. Capped by the profile's pool size.
    #[serde(default = "default_statement_workers")]
    max_workers: usize,
}

fn default_statement_workers() -> usize {
    1
}

async fn execute_statements_batch(ctx: CallContext, args: Value) -> HandlerResult {
    let input: ExecuteStatementsBatchInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let retry = ctx.retry;
    let pool = input.max_workers.min(ctx.max_workers).max(1);
    let row_limit = input.row_limit;

    let statements = input.statements;
    let keys: Vec<usize> = (0..statements.len()).collect();
    let report = run_batch(keys, pool, |index| {
        let body = statement_body(
            &input.warehouse_id,
            &statements[index],
            input.catalog.as_deref(),
            input.schema.as_deref(),
            &input.wait_timeout,
        );
        async move {
            let response = run_with_retry(&retry, "execute-statements-batch", || {
                client.post("/api/2.0/sql/statements", &body)
            })
            .await?;
            assemble_statement(client, &retry, "execute-statements-batch", response, row_limit)
                .await
        }
    })
    .await;
    Ok(serde_json::to_value(report).unwrap_or(Value::Null))
}

/// Pull the execution result out of a statement response, fetching and
/// appending any further chunks, then reshape into the reported form.
async fn assemble_statement(
    client: &WorkspaceClient,
    retry: &RetryPolicy,
    op_name: &str,
    response: Value,
    row_limit: Option<usize>,
) -> HandlerResult {
    let statement_id = response["statement_id"].as_str().unwrap_or_default().to_string();
    let status = response["status"]["state"].clone();

    let mut out = json!({
        "statement_id": statement_id,
        "status": status,
    });

    // Pending or async executions carry no result yet.
    if response.get("result").is_none_or(Value::is_null) {
        return Ok(out);
    }

    let initial = ChunkedResponse {
        rows: response["result"]["data_array"]
            .as_array()
            .cloned()
            .unwrap_or_default(),
        total_chunk_count: response["manifest"]["total_chunk_count"]
            .as_u64()
            .unwrap_or(1),
        truncated: response["result"]["truncated"].as_bool().unwrap_or(false),
    };
    let total_chunk_count = initial.total_chunk_count;

    let assembled = assemble(
        retry,
        op_name,
        initial,
        |chunk_index| {
            let path = format!(
                "/api/2.0/sql/statements/{statement_id}/result/chunks/{chunk_index}"
            );
            async move {
                let chunk = client.get(&path).await.map_err(ClassifiedError::from)?;
                Ok::<_, ClassifiedError>(
                    chunk["data_array"].as_array().cloned().unwrap_or_default(),
                )
            }
        },
        row_limit,
    )
    .await?;

    out["result"] = json!({
        "row_count": assembled.row_count,
        "data_array": assembled.rows,
        "truncated": assembled.truncated,
    });
    if let Some(manifest) = response.get("manifest") {
        out["manifest"] = json!({
            "schema": manifest.get("schema").cloned().unwrap_or(Value::Null),
            "total_row_count": manifest.get("total_row_count").cloned().unwrap_or(Value::Null),
            "total_chunk_count": total_chunk_count,
            "chunks_fetched": total_chunk_count.max(1),
        });
    }
    Ok(out)
}
