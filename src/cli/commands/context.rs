//! Shared setup for commands that query builds

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::{LineageError, LineageResult};
use crate::index::IndexSet;
use crate::resolve::ResolutionService;
use crate::service::SnapshotService;
use std::future::Future;
use tracing::{debug, warn};

/// A resolver over the persisted caches, saved back when the command ends
pub struct QueryContext {
    resolver: ResolutionService,
    store: CacheStore,
}

impl QueryContext {
    /// Open the configured source and load the caches from disk
    pub async fn open(config: &Config) -> LineageResult<Self> {
        let snapshot = config.source.snapshot.as_ref().ok_or(LineageError::NoSource)?;
        let service = SnapshotService::from_file(snapshot).await?;

        let store = CacheStore::new(config.cache.dir());
        let mut indices = IndexSet::new(config.cache.index_settings());
        let restored = indices.load(&store).await;
        debug!("Restored {} caches from {}", restored, store.dir().display());

        Ok(Self {
            resolver: ResolutionService::new(Box::new(service), indices),
            store,
        })
    }

    /// Run a query, then persist whatever the caches learned
    ///
    /// The caches are saved even when the query fails. A save failure is
    /// only reported when the query itself succeeded.
    pub async fn run<'a, T, F, Fut>(&'a self, query: F) -> LineageResult<T>
    where
        F: FnOnce(&'a ResolutionService) -> Fut,
        Fut: Future<Output = LineageResult<T>>,
    {
        let outcome = query(&self.resolver).await;
        let saved = self.resolver.save(&self.store).await;

        match (outcome, saved) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(save_err)) => {
                warn!("Failed to save caches: {}", save_err);
                Err(e)
            }
        }
    }
}
