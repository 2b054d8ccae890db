//! CLI command implementations

mod cache;
mod config;
mod context;
mod query;
mod tag;
mod tree;

pub use cache::execute as cache;
pub use config::execute as config;
pub use context::QueryContext;
pub use query::{build, nvr, package, parent, record, resolve, task};
pub use tag::execute as tag;
pub use tree::execute as tree;
