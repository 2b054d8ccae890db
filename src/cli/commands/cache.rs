//! Cache command - inspect or clear the persisted caches

use crate::cache::CacheStore;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::LineageResult;
use crate::index::{names, CacheStats, IndexSet};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> LineageResult<()> {
    let store = CacheStore::new(config.cache.dir());

    match args.action {
        CacheAction::Stats { format } => show_stats(&store, config, format).await,
        CacheAction::Path => {
            println!("{}", store.dir().display());
            Ok(())
        }
        CacheAction::Clear => clear(&store).await,
    }
}

async fn show_stats(store: &CacheStore, config: &Config, format: OutputFormat) -> LineageResult<()> {
    let mut indices = IndexSet::new(config.cache.index_settings());
    indices.load(store).await;
    let stats = indices.stats();

    match format {
        OutputFormat::Table => print_stats_table(store, &stats),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Plain => {
            for s in &stats {
                println!("{} {}", s.name, s.entries);
            }
        }
    }
    Ok(())
}

fn print_stats_table(store: &CacheStore, stats: &[CacheStats]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Caches");
    ui::key_value(&ctx, "directory", &store.dir().display().to_string());
    println!();

    println!(
        "{:<28} {:>10} {:>10}",
        style("CACHE").bold(),
        style("ENTRIES").bold(),
        style("CAPACITY").bold()
    );
    println!("{}", "-".repeat(50));
    for s in stats {
        println!("{:<28} {:>10} {:>10}", s.name, s.entries, s.capacity);
    }
}

async fn clear(store: &CacheStore) -> LineageResult<()> {
    let ctx = UiContext::detect();
    let removed = store.remove(&names::ALL).await?;

    if removed == 0 {
        ui::step_info(&ctx, "No cache files to remove");
    } else {
        ui::step_ok_detail(
            &ctx,
            &format!("Removed {} cache file(s)", removed),
            &store.dir().display().to_string(),
        );
    }
    Ok(())
}
