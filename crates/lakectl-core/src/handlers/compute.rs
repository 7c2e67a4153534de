//! Cluster operations.

use crate::batch::run_batch;
use crate::retry::run_with_retry;
use crate::router::{CallContext, HandlerResult, RouterBuilder, parse_args};
use crate::registry::Scope;
use serde::Deserialize;
use serde_json::{Value, json};

const MAX_PAGE_SIZE: u32 = 1000;

pub fn register(builder: RouterBuilder) -> RouterBuilder {
    builder
        .operation("list-clusters", Scope::Workspace, list_clusters)
        .operation("get-cluster", Scope::Workspace, get_cluster)
        .operation("create-cluster", Scope::Workspace, create_cluster)
        .operation("start-cluster", Scope::Workspace, start_cluster)
        .operation("terminate-cluster", Scope::Workspace, terminate_cluster)
        .operation("delete-cluster", Scope::Workspace, delete_cluster)
        .operation("get-clusters-batch", Scope::Workspace, get_clusters_batch)
        .operation("delete-clusters-batch", Scope::Workspace, delete_clusters_batch)
}

#[derive(Debug, Deserialize)]
struct ListClustersInput {
    #[serde(default = "default_page_size")]
    page_size: u32,
}

fn default_page_size() -> u32 {
    100
}

async fn list_clusters(ctx: CallContext, args: Value) -> HandlerResult {
    let input: ListClustersInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let query = [("page_size", input.page_size.min(MAX_PAGE_SIZE).to_string())];
    run_with_retry(&ctx.retry, "list-clusters", || {
        client.get_query("/api/2.0/clusters/list", &query)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct ClusterIdInput {
    cluster_id: String,
}

async fn get_cluster(ctx: CallContext, args: Value) -> HandlerResult {
    let input: ClusterIdInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let query = [("cluster_id", input.cluster_id)];
    run_with_retry(&ctx.retry, "get-cluster", || {
        client.get_query("/api/2.0/clusters/get", &query)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct CreateClusterInput {
    cluster_name: String,
    spark_version: String,
    node_type_id: String,
    #[serde(default)]
    num_workers: Option<u32>,
    #[serde(default)]
    autoscale: Option<Value>,
}

async fn create_cluster(ctx: CallContext, args: Value) -> HandlerResult {
    let input: CreateClusterInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let mut body = json!({
        "cluster_name": input.cluster_name,
        "spark_version": input.spark_version,
        "node_type_id": input.node_type_id,
    });
    if let Some(n) = input.num_workers {
        body["num_workers"] = json!(n);
    }
    if let Some(autoscale) = input.autoscale {
        body["autoscale"] = autoscale;
    }
    run_with_retry(&ctx.retry, "create-cluster", || {
        client.post("/api/2.0/clusters/create", &body)
    })
    .await
}

async fn start_cluster(ctx: CallContext, args: Value) -> HandlerResult {
    cluster_action(ctx, args, "start-cluster", "/api/2.0/clusters/start").await
}

async fn terminate_cluster(ctx: CallContext, args: Value) -> HandlerResult {
    cluster_action(ctx, args, "terminate-cluster", "/api/2.0/clusters/terminate").await
}

async fn delete_cluster(ctx: CallContext, args: Value) -> HandlerResult {
    cluster_action(ctx, args, "delete-cluster", "/api/2.0/clusters/delete").await
}

async fn cluster_action(
    ctx: CallContext,
    args: Value,
    op_name: &str,
    path: &str,
) -> HandlerResult {
    let input: ClusterIdInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let body = json!({ "cluster_id": input.cluster_id });
    run_with_retry(&ctx.retry, op_name, || client.post(path, &body)).await?;
    Ok(json!({ "cluster_id": input.cluster_id, "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct ClusterIdsInput {
    cluster_ids: Vec<String>,
}

async fn get_clusters_batch(ctx: CallContext, args: Value) -> HandlerResult {
    let input: ClusterIdsInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let retry = ctx.retry;
    let report = run_batch(input.cluster_ids, ctx.max_workers, |id| async move {
        let query = [("cluster_id", id)];
        run_with_retry(&retry, "get-clusters-batch", || {
            client.get_query("/api/2.0/clusters/get", &query)
        })
        .await
    })
    .await;
    Ok(serde_json::to_value(report).unwrap_or(Value::Null))
}

async fn delete_clusters_batch(ctx: CallContext, args: Value) -> HandlerResult {
    let input: ClusterIdsInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let retry = ctx.retry;
    let report = run_batch(input.cluster_ids, ctx.max_workers, |id| async move {
        let body = json!({ "cluster_id": id });
        run_with_retry(&retry, "delete-clusters-batch", || {
            client.post("/api/2.0/clusters/delete", &body)
        })
        .await?;
        Ok(json!({ "deleted": true }))
    })
    .await;
    Ok(serde_json::to_value(report).unwrap_or(Value::Null))
}
