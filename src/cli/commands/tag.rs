//! Tag command - list or resolve the builds of a tag

use super::QueryContext;
use crate::cli::args::{OutputFormat, TagArgs};
use crate::config::Config;
use crate::error::LineageResult;
use crate::resolve::ContainersByPackage;
use crate::types::{Nvr, TagQuery};
use crate::ui::{self, UiContext};
use console::style;
use std::collections::BTreeSet;

/// Execute the tag command
pub async fn execute(args: TagArgs, config: &Config) -> LineageResult<()> {
    let query = TagQuery {
        latest: args.latest,
        inherit: args.inherit,
        ..TagQuery::default()
    };
    let ctx = QueryContext::open(config).await?;

    if args.records {
        let containers = ctx
            .run(|r| r.tag_containers(&args.tag, &query, args.task_info))
            .await?;
        return print_records(&args.tag, &containers, args.format);
    }

    match args.batch {
        Some(ref batch) => {
            let matching = ctx
                .run(|r| r.matching_batch(&args.tag, &query, batch))
                .await?;
            print_batch(&args.tag, batch, &matching, args.format)
        }
        None => {
            let nvrs = ctx
                .run(|r| r.list_tag_containers(&args.tag, &query))
                .await?;
            print_nvrs(&args.tag, &nvrs, args.format)
        }
    }
}

fn print_nvrs(tag: &str, nvrs: &BTreeSet<Nvr>, format: OutputFormat) -> LineageResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(nvrs)?),
        OutputFormat::Plain => nvrs.iter().for_each(|nvr| println!("{}", nvr)),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            if nvrs.is_empty() {
                ui::step_info(&ctx, &format!("No container builds in {}", tag));
                return Ok(());
            }
            ui::intro(&ctx, &format!("Containers in {}", tag));
            for nvr in nvrs {
                println!("  {}", nvr);
            }
            println!();
            println!("{} container build(s)", nvrs.len());
        }
    }
    Ok(())
}

fn print_batch(
    tag: &str,
    batch: &str,
    matching: &ContainersByPackage,
    format: OutputFormat,
) -> LineageResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(matching)?),
        OutputFormat::Plain => {
            for record in matching.values().flat_map(|builds| builds.values()) {
                println!("{}", record.nvr);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            if matching.is_empty() {
                ui::step_info(&ctx, &format!("No builds in {} match {}", tag, batch));
                return Ok(());
            }
            ui::intro(&ctx, &format!("Batch {} in {}", batch, tag));

            println!(
                "{:<35} {:<12} {:<45}",
                style("PACKAGE").bold(),
                style("BUILD").bold(),
                style("NVR").bold()
            );
            println!("{}", "-".repeat(92));
            for (package, builds) in matching {
                for (id, record) in builds {
                    println!("{:<35} {:<12} {:<45}", package, id, record.nvr);
                }
            }
        }
    }
    Ok(())
}

fn print_records(
    tag: &str,
    containers: &ContainersByPackage,
    format: OutputFormat,
) -> LineageResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(containers)?),
        OutputFormat::Plain => {
            for record in containers.values().flat_map(|builds| builds.values()) {
                match record.parent_build_id {
                    Some(parent) => println!("{} {}", record.nvr, parent),
                    None => println!("{} -", record.nvr),
                }
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            if containers.is_empty() {
                ui::step_info(&ctx, &format!("No builds in {}", tag));
                return Ok(());
            }
            ui::intro(&ctx, &format!("Builds in {}", tag));

            println!(
                "{:<35} {:<12} {:<45} {:<12}",
                style("PACKAGE").bold(),
                style("BUILD").bold(),
                style("NVR").bold(),
                style("PARENT").bold()
            );
            println!("{}", "-".repeat(105));
            for (package, builds) in containers {
                for (id, record) in builds {
                    let parent = record
                        .parent_build_id
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("{:<35} {:<12} {:<45} {:<12}", package, id, record.nvr, parent);
                }
            }
        }
    }
    Ok(())
}
