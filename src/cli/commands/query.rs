//! Single-build queries: resolve, build, parent, nvr, package, record, task

use super::QueryContext;
use crate::cli::args::{BuildArgs, RecordArgs, TaskArgs};
use crate::config::Config;
use crate::error::LineageResult;
use crate::types::{BuildRecord, Identifier, TaskId};
use crate::ui::{self, UiContext};

/// Print the build id an id or NVR resolves to
pub async fn resolve(args: BuildArgs, config: &Config) -> LineageResult<()> {
    let ident = Identifier::from(args.build.as_str());
    let ctx = QueryContext::open(config).await?;
    let id = ctx.run(|r| r.resolve_build_id(&ident)).await?;
    println!("{}", id);
    Ok(())
}

/// Print the cached or fetched build record
pub async fn build(args: BuildArgs, config: &Config) -> LineageResult<()> {
    let ident = Identifier::from(args.build.as_str());
    let ctx = QueryContext::open(config).await?;
    let record = ctx.run(|r| r.get_build_record(&ident)).await?;
    print_record(&record);
    Ok(())
}

pub async fn parent(args: BuildArgs, config: &Config) -> LineageResult<()> {
    let ident = Identifier::from(args.build.as_str());
    let ctx = QueryContext::open(config).await?;

    match ctx.run(|r| r.get_parent_build_id(&ident)).await? {
        Some(parent) => println!("{}", parent),
        None => ui::step_info(
            &UiContext::detect(),
            &format!("{} is a base image", args.build),
        ),
    }
    Ok(())
}

pub async fn nvr(args: BuildArgs, config: &Config) -> LineageResult<()> {
    let ident = Identifier::from(args.build.as_str());
    let ctx = QueryContext::open(config).await?;
    println!("{}", ctx.run(|r| r.get_nvr(&ident)).await?);
    Ok(())
}

pub async fn package(args: BuildArgs, config: &Config) -> LineageResult<()> {
    let ident = Identifier::from(args.build.as_str());
    let ctx = QueryContext::open(config).await?;
    println!("{}", ctx.run(|r| r.get_package_name(&ident)).await?);
    Ok(())
}

/// Print a build joined with its parent and task pullspecs as JSON
pub async fn record(args: RecordArgs, config: &Config) -> LineageResult<()> {
    let ident = Identifier::from(args.build.as_str());
    let ctx = QueryContext::open(config).await?;
    let record = ctx
        .run(|r| r.get_container_record(&ident, args.task_info))
        .await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Print a task result as JSON
pub async fn task(args: TaskArgs, config: &Config) -> LineageResult<()> {
    let task_id = TaskId(args.task_id);
    let ctx = QueryContext::open(config).await?;
    let result = ctx
        .run(|r| r.get_task_result_with(task_id, !args.strict))
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_record(record: &BuildRecord) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, record.nvr.as_str());

    let parent = record
        .parent_build_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());
    let task = record
        .build_task_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());

    ui::key_value(&ctx, "build id", &record.build_id.to_string());
    ui::key_value(&ctx, "package", &record.package_name);
    ui::key_value(&ctx, "parent", &parent);
    ui::key_value(&ctx, "task", &task);
    for pullspec in &record.pullspecs {
        ui::key_value(&ctx, "pullspec", pullspec);
    }
    for tag in &record.tags {
        ui::key_value(&ctx, "tag", tag);
    }
}
