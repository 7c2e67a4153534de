//! Account-console operations: workspace provisioning and IAM reads.

use crate::retry::run_with_retry;
use crate::registry::Scope;
use crate::router::{CallContext, HandlerResult, RouterBuilder, parse_args};
use serde::Deserialize;
use serde_json::Value;

pub fn register(builder: RouterBuilder) -> RouterBuilder {
    builder
        .operation("list-account-workspaces", Scope::Account, list_workspaces)
        .operation("get-account-workspace", Scope::Account, get_workspace)
        .operation("list-account-users", Scope::Account, list_users)
        .operation("get-account-user", Scope::Account, get_user)
        .operation("list-account-groups", Scope::Account, list_groups)
        .operation(
            "list-account-service-principals",
            Scope::Account,
            list_service_principals,
        )
        .operation("list-account-metastores", Scope::Account, list_metastores)
}

async fn account_get(ctx: &CallContext, op_name: &str, path: &str) -> HandlerResult {
    let client = ctx.client.account()?;
    run_with_retry(&ctx.retry, op_name, || client.get(path)).await
}

async fn list_workspaces(ctx: CallContext, _args: Value) -> HandlerResult {
    account_get(&ctx, "list-account-workspaces", "/workspaces").await
}

#[derive(Debug, Deserialize)]
struct WorkspaceIdInput {
    workspace_id: u64,
}

async fn get_workspace(ctx: CallContext, args: Value) -> HandlerResult {
    let input: WorkspaceIdInput = parse_args(args)?;
    let path = format!("/workspaces/{}", input.workspace_id);
    account_get(&ctx, "get-account-workspace", &path).await
}

async fn list_users(ctx: CallContext, _args: Value) -> HandlerResult {
    account_get(&ctx, "list-account-users", "/scim/v2/Users").await
}

#[derive(Debug, Deserialize)]
struct UserIdInput {
    user_id: String,
}

async fn get_user(ctx: CallContext, args: Value) -> HandlerResult {
    let input: UserIdInput = parse_args(args)?;
    let path = format!("/scim/v2/Users/{}", input.user_id);
    account_get(&ctx, "get-account-user", &path).await
}

async fn list_groups(ctx: CallContext, _args: Value) -> HandlerResult {
    account_get(&ctx, "list-account-groups", "/scim/v2/Groups").await
}

async fn list_service_principals(ctx: CallContext, _args: Value) -> HandlerResult {
    account_get(
        &ctx,
        "list-account-service-principals",
        "/scim/v2/ServicePrincipals",
    )
    .await
}

async fn list_metastores(ctx: CallContext, _args: Value) -> HandlerResult {
    account_get(&ctx, "list-account-metastores", "/metastores").await
}
