//! Workspace object tree operations.

use crate::retry::run_with_retry;
use crate::registry::Scope;
use crate::router::{CallContext, HandlerResult, RouterBuilder, parse_args};
use serde::Deserialize;
use serde_json::{Value, json};

pub fn register(builder: RouterBuilder) -> RouterBuilder {
    builder
        .operation("list-workspace-objects", Scope::Workspace, list_objects)
        .operation(
            "get-workspace-object-status",
            Scope::Workspace,
            get_object_status,
        )
        .operation("delete-workspace-object", Scope::Workspace, delete_object)
        .operation("mkdirs", Scope::Workspace, mkdirs)
}

#[derive(Debug, Deserialize)]
struct PathInput {
    path: String,
}

async fn list_objects(ctx: CallContext, args: Value) -> HandlerResult {
    let input: PathInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let query = [("path", input.path)];
    run_with_retry(&ctx.retry, "list-workspace-objects", || {
        client.get_query("/api/2.0/workspace/list", &query)
    })
    .await
}

async fn get_object_status(ctx: CallContext, args: Value) -> HandlerResult {
    let input: PathInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let query = [("path", input.path)];
    run_with_retry(&ctx.retry, "get-workspace-object-status", || {
        client.get_query("/api/2.0/workspace/get-status", &query)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct DeleteObjectInput {
    path: String,
    #[serde(default)]
    recursive: bool,
}

async fn delete_object(ctx: CallContext, args: Value) -> HandlerResult {
    let input: DeleteObjectInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let body = json!({ "path": input.path, "recursive": input.recursive });
    run_with_retry(&ctx.retry, "delete-workspace-object", || {
        client.post("/api/2.0/workspace/delete", &body)
    })
    .await?;
    Ok(json!({ "path": input.path, "status": "deleted" }))
}

async fn mkdirs(ctx: CallContext, args: Value) -> HandlerResult {
    let input: PathInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let body = json!({ "path": input.path });
    run_with_retry(&ctx.retry, "mkdirs", || {
        client.post("/api/2.0/workspace/mkdirs", &body)
    })
    .await?;
    Ok(json!({ "path": input.path, "status": "created" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_defaults_to_non_recursive() {
        let input: DeleteObjectInput = parse_args(json!({"path": "/tmp/x"})).unwrap();
        assert!(!input.recursive);
    }
}
