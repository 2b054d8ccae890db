//! Tree command - walk parent pointers from seed builds

use super::QueryContext;
use crate::cli::args::{OutputFormat, TreeArgs};
use crate::config::Config;
use crate::error::{LineageError, LineageResult};
use crate::lineage::{base_images, BuildTree, LineageWalker};
use crate::resolve::ResolutionService;
use crate::types::{BuildId, Identifier, Nvr};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct TreeEdge {
    build_id: BuildId,
    nvr: Nvr,
    parent_build_id: Option<BuildId>,
}

/// Execute the tree command
pub async fn execute(args: TreeArgs, config: &Config) -> LineageResult<()> {
    let seeds: Vec<Identifier> = args
        .builds
        .iter()
        .map(|b| Identifier::from(b.as_str()))
        .collect();
    let ctx = QueryContext::open(config).await?;

    let (tree, nvrs) = ctx
        .run(|resolver| async move {
            let tree = LineageWalker::new(resolver).build_tree(seeds).await?;
            let nvrs = nvrs_of(resolver, &tree).await?;
            Ok::<_, LineageError>((tree, nvrs))
        })
        .await?;

    match args.format {
        OutputFormat::Table => print_table(&tree, &nvrs),
        OutputFormat::Json => print_json(&tree, &nvrs)?,
        OutputFormat::Plain => print_plain(&tree),
    }
    Ok(())
}

async fn nvrs_of(
    resolver: &ResolutionService,
    tree: &BuildTree,
) -> LineageResult<BTreeMap<BuildId, Nvr>> {
    let mut nvrs = BTreeMap::new();
    for id in tree.keys() {
        nvrs.insert(*id, resolver.get_nvr(&(*id).into()).await?);
    }
    Ok(nvrs)
}

fn nvr_or_id(nvrs: &BTreeMap<BuildId, Nvr>, id: BuildId) -> String {
    nvrs.get(&id)
        .map(|nvr| nvr.to_string())
        .unwrap_or_else(|| id.to_string())
}

fn print_table(tree: &BuildTree, nvrs: &BTreeMap<BuildId, Nvr>) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Image tree");

    println!(
        "{:<12} {:<45} {:<45}",
        style("BUILD").bold(),
        style("NVR").bold(),
        style("PARENT").bold()
    );
    println!("{}", "-".repeat(102));

    for (id, parent) in tree {
        let parent = match parent {
            Some(parent) => nvr_or_id(nvrs, *parent),
            None => style("(base image)").dim().to_string(),
        };
        println!("{:<12} {:<45} {:<45}", id, nvr_or_id(nvrs, *id), parent);
    }

    println!();
    println!(
        "{} build(s), {} base image(s)",
        tree.len(),
        base_images(tree).len()
    );
}

fn print_json(tree: &BuildTree, nvrs: &BTreeMap<BuildId, Nvr>) -> LineageResult<()> {
    let edges: Vec<TreeEdge> = tree
        .iter()
        .map(|(id, parent)| TreeEdge {
            build_id: *id,
            nvr: nvrs
                .get(id)
                .cloned()
                .unwrap_or_else(|| Nvr(id.to_string())),
            parent_build_id: *parent,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&edges)?);
    Ok(())
}

/// One `build parent` pair per line; base images show `-` as parent
fn print_plain(tree: &BuildTree) {
    for (id, parent) in tree {
        match parent {
            Some(parent) => println!("{} {}", id, parent),
            None => println!("{} -", id),
        }
    }
}
