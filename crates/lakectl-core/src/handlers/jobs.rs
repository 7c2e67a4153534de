//! Job operations, including triggered runs with wait-for-completion.

use crate::batch::run_batch;
use crate::error::{ClassifiedError, ErrorKind};
use crate::registry::Scope;
use crate::retry::run_with_retry;
use crate::router::{CallContext, HandlerResult, RouterBuilder, parse_args};
use crate::wait::{PollState, WaitOptions, wait_for_terminal};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Run lifecycle states after which polling stops.
const TERMINAL_STATES: &[&str] = &["TERMINATED", "SKIPPED", "INTERNAL_ERROR"];

pub fn register(builder: RouterBuilder) -> RouterBuilder {
    builder
        .operation("list-jobs", Scope::Workspace, list_jobs)
        .operation("get-job", Scope::Workspace, get_job)
        .operation("run-job", Scope::Workspace, run_job)
        .operation("get-run", Scope::Workspace, get_run)
        .operation("cancel-run", Scope::Workspace, cancel_run)
        .operation("delete-job", Scope::Workspace, delete_job)
        .operation("get-jobs-batch", Scope::Workspace, get_jobs_batch)
        .operation("delete-jobs-batch", Scope::Workspace, delete_jobs_batch)
}

#[derive(Debug, Deserialize)]
struct ListJobsInput {
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    name: Option<String>,
}

async fn list_jobs(ctx: CallContext, args: Value) -> HandlerResult {
    let input: ListJobsInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let mut query = Vec::new();
    if let Some(limit) = input.limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(name) = &input.name {
        query.push(("name", name.clone()));
    }
    run_with_retry(&ctx.retry, "list-jobs", || {
        client.get_query("/api/2.0/jobs/list", &query)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct JobIdInput {
    job_id: u64,
}

async fn get_job(ctx: CallContext, args: Value) -> HandlerResult {
    let input: JobIdInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let query = [("job_id", input.job_id.to_string())];
    run_with_retry(&ctx.retry, "get-job", || {
        client.get_query("/api/2.0/jobs/get", &query)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct RunJobInput {
    job_id: u64,
    #[serde(default)]
    params: Option<Value>,
    /// Poll the run to a terminal state before returning.
    #[serde(default = "default_wait")]
    wait: bool,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    poll_interval_secs: u64,
}

fn default_wait() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_poll_interval_secs() -> u64 {
    10
}

async fn run_job(ctx: CallContext, args: Value) -> HandlerResult {
    let input: RunJobInput = parse_args(args)?;
    let client = ctx.client.workspace()?;

    let mut body = json!({ "job_id": input.job_id });
    if let Some(params) = input.params {
        body["params"] = params;
    }
    // Only the trigger is retried as a unit; polling reads retry
    // individually below.
    let triggered = run_with_retry(&ctx.retry, "run-job", || {
        client.post("/api/2.0/jobs/run-now", &body)
    })
    .await?;

    let run_id = triggered["run_id"].as_u64().ok_or_else(|| {
        ClassifiedError::new(ErrorKind::Unknown, "run trigger response carried no run_id")
    })?;

    if !input.wait {
        return Ok(triggered);
    }

    let options = WaitOptions {
        timeout: Duration::from_secs(input.timeout_secs),
        interval: Duration::from_secs(input.poll_interval_secs),
    };
    let query = [("run_id", run_id.to_string())];
    wait_for_terminal(&ctx.retry, "run-job", options, || async {
        let run = client
            .get_query("/api/2.0/jobs/runs/get", &query)
            .await
            .map_err(ClassifiedError::from)?;
        let state = run["state"]["life_cycle_state"]
            .as_str()
            .unwrap_or("UNKNOWN")
            .to_string();
        if TERMINAL_STATES.contains(&state.as_str()) {
            Ok(PollState::Terminal(run))
        } else {
            Ok(PollState::Running(state))
        }
    })
    .await
}

#[derive(Debug, Deserialize)]
struct RunIdInput {
    run_id: u64,
}

async fn get_run(ctx: CallContext, args: Value) -> HandlerResult {
    let input: RunIdInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let query = [("run_id", input.run_id.to_string())];
    run_with_retry(&ctx.retry, "get-run", || {
        client.get_query("/api/2.0/jobs/runs/get", &query)
    })
    .await
}

async fn cancel_run(ctx: CallContext, args: Value) -> HandlerResult {
    let input: RunIdInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let body = json!({ "run_id": input.run_id });
    run_with_retry(&ctx.retry, "cancel-run", || {
        client.post("/api/2.0/jobs/runs/cancel", &body)
    })
    .await?;
    Ok(json!({ "run_id": input.run_id, "status": "cancelled" }))
}

async fn delete_job(ctx: CallContext, args: Value) -> HandlerResult {
    let input: JobIdInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let body = json!({ "job_id": input.job_id });
    run_with_retry(&ctx.retry, "delete-job", || {
        client.post("/api/2.0/jobs/delete", &body)
    })
    .await?;
    Ok(json!({ "job_id": input.job_id, "status": "deleted" }))
}

#[derive(Debug, Deserialize)]
struct JobIdsInput {
    job_ids: Vec<u64>,
}

async fn get_jobs_batch(ctx: CallContext, args: Value) -> HandlerResult {
    let input: JobIdsInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let retry = ctx.retry;
    let report = run_batch(input.job_ids, ctx.max_workers, |job_id| async move {
        let query = [("job_id", job_id.to_string())];
        run_with_retry(&retry, "get-jobs-batch", || {
            client.get_query("/api/2.0/jobs/get", &query)
        })
        .await
    })
    .await;
    Ok(serde_json::to_value(report).unwrap_or(Value::Null))
}

async fn delete_jobs_batch(ctx: CallContext, args: Value) -> HandlerResult {
    let input: JobIdsInput = parse_args(args)?;
    let client = ctx.client.workspace()?;
    let retry = ctx.retry;
    let report = run_batch(input.job_ids, ctx.max_workers, |job_id| async move {
        let body = json!({ "job_id": job_id });
        run_with_retry(&retry, "delete-jobs-batch", || {
            client.post("/api/2.0/jobs/delete", &body)
        })
        .await?;
        Ok(json!({ "deleted": true }))
    })
    .await;
    Ok(serde_json::to_value(report).unwrap_or(Value::Null))
}
