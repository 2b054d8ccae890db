//! Parent-pointer walks over resolved builds
//!
//! A container image build points at the build of its base image. Walking
//! those pointers from a set of seeds yields the image tree.

use crate::error::{LineageError, LineageResult};
use crate::resolve::ResolutionService;
use crate::types::{BuildId, Identifier};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Edges `build -> parent` of an image tree; base images map to `None`
pub type BuildTree = BTreeMap<BuildId, Option<BuildId>>;

/// Walks parent pointers through a [`ResolutionService`]
pub struct LineageWalker<'a> {
    resolver: &'a ResolutionService,
}

impl<'a> LineageWalker<'a> {
    pub fn new(resolver: &'a ResolutionService) -> Self {
        Self { resolver }
    }

    /// Build the tree reachable from `seeds` through parent pointers
    ///
    /// Seeds and discovered parents go on a LIFO worklist. Each parent is
    /// queued only the first time it is seen, so shared ancestors are
    /// resolved once and the walk terminates. A parent chain that leads
    /// back to the build being visited is reported as `LineageCycle`.
    pub async fn build_tree<I>(&self, seeds: I) -> LineageResult<BuildTree>
    where
        I: IntoIterator<Item = Identifier>,
    {
        let mut worklist: Vec<Identifier> = seeds.into_iter().collect();
        let mut queued: HashSet<BuildId> = HashSet::new();
        let mut tree = BuildTree::new();

        while let Some(ident) = worklist.pop() {
            let build_id = self.resolver.resolve_build_id(&ident).await?;
            let parent = self.resolver.get_parent_build_id(&build_id.into()).await?;
            queued.insert(build_id);
            tree.insert(build_id, parent);

            let Some(parent_id) = parent else {
                continue;
            };
            if leads_back(&tree, parent_id, build_id) {
                return Err(LineageError::LineageCycle {
                    build_id: build_id.0,
                });
            }
            if queued.insert(parent_id) {
                worklist.push(parent_id.into());
            }
        }

        debug!("Resolved image tree with {} builds", tree.len());
        Ok(tree)
    }

    /// The build followed by each of its ancestors, ending at a base image
    pub async fn ancestors(&self, ident: &Identifier) -> LineageResult<Vec<BuildId>> {
        let mut current = self.resolver.resolve_build_id(ident).await?;
        let mut seen = HashSet::from([current]);
        let mut chain = vec![current];

        while let Some(parent) = self.resolver.get_parent_build_id(&current.into()).await? {
            if !seen.insert(parent) {
                return Err(LineageError::LineageCycle {
                    build_id: current.0,
                });
            }
            chain.push(parent);
            current = parent;
        }

        Ok(chain)
    }
}

/// Whether following known edges up from `start` reaches `target`
fn leads_back(tree: &BuildTree, start: BuildId, target: BuildId) -> bool {
    let mut current = start;
    for _ in 0..=tree.len() {
        if current == target {
            return true;
        }
        match tree.get(&current) {
            Some(Some(parent)) => current = *parent,
            _ => return false,
        }
    }
    false
}

/// Builds in `tree` that have no parent
pub fn base_images(tree: &BuildTree) -> Vec<BuildId> {
    tree.iter()
        .filter(|(_, parent)| parent.is_none())
        .map(|(id, _)| *id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexSet;
    use crate::service::testing::{build, two_level_snapshot, Calls, CountingService};
    use crate::service::Snapshot;
    use std::sync::Arc;

    fn resolver(snapshot: Snapshot) -> (ResolutionService, Arc<Calls>) {
        let (service, calls) = CountingService::new(snapshot);
        (
            ResolutionService::new(Box::new(service), IndexSet::default()),
            calls,
        )
    }

    #[tokio::test]
    async fn two_level_tree() {
        let (resolver, _) = resolver(two_level_snapshot());
        let walker = LineageWalker::new(&resolver);

        let tree = walker
            .build_tree([Identifier::from("foo-container-1.0-1")])
            .await
            .unwrap();

        let expected = BuildTree::from([(BuildId(100), Some(BuildId(50))), (BuildId(50), None)]);
        assert_eq!(tree, expected);
        assert_eq!(base_images(&tree), vec![BuildId(50)]);
    }

    #[tokio::test]
    async fn shared_ancestors_are_resolved_once() {
        let mut snapshot = two_level_snapshot();
        snapshot.builds.push(build(200, "bar-container-2.0-1", Some(50), None));
        snapshot.builds.push(build(300, "baz-container-3.0-1", Some(200), None));
        let (resolver, calls) = resolver(snapshot);
        let walker = LineageWalker::new(&resolver);

        let tree = walker
            .build_tree([
                Identifier::from("foo-container-1.0-1"),
                Identifier::from("baz-container-3.0-1"),
                Identifier::from("bar-container-2.0-1"),
            ])
            .await
            .unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree[&BuildId(300)], Some(BuildId(200)));
        assert_eq!(tree[&BuildId(200)], Some(BuildId(50)));
        assert_eq!(calls.builds(), 4);
    }

    #[tokio::test]
    async fn empty_seed_set_gives_empty_tree() {
        let (resolver, calls) = resolver(two_level_snapshot());
        let tree = LineageWalker::new(&resolver)
            .build_tree(Vec::new())
            .await
            .unwrap();

        assert!(tree.is_empty());
        assert_eq!(calls.builds(), 0);
    }

    #[tokio::test]
    async fn cycle_is_an_error() {
        let snapshot = Snapshot {
            builds: vec![
                build(1, "a-container-1-1", Some(2), None),
                build(2, "b-container-1-1", Some(1), None),
            ],
            ..Snapshot::default()
        };
        let (resolver, _) = resolver(snapshot);
        let walker = LineageWalker::new(&resolver);

        let err = walker
            .build_tree([Identifier::from("1")])
            .await
            .unwrap_err();
        assert!(matches!(err, LineageError::LineageCycle { .. }));

        let err = walker.ancestors(&Identifier::from("1")).await.unwrap_err();
        assert!(matches!(err, LineageError::LineageCycle { .. }));
    }

    #[tokio::test]
    async fn self_parent_is_a_cycle() {
        let snapshot = Snapshot {
            builds: vec![build(9, "loop-container-1-1", Some(9), None)],
            ..Snapshot::default()
        };
        let (resolver, _) = resolver(snapshot);

        let err = LineageWalker::new(&resolver)
            .build_tree([Identifier::from("9")])
            .await
            .unwrap_err();
        assert!(matches!(err, LineageError::LineageCycle { build_id: 9 }));
    }

    #[tokio::test]
    async fn ancestors_end_at_base_image() {
        let mut snapshot = two_level_snapshot();
        snapshot.builds.push(build(300, "baz-container-3.0-1", Some(100), None));
        let (resolver, _) = resolver(snapshot);

        let chain = LineageWalker::new(&resolver)
            .ancestors(&Identifier::from("baz-container-3.0-1"))
            .await
            .unwrap();
        assert_eq!(chain, vec![BuildId(300), BuildId(100), BuildId(50)]);
    }

    #[tokio::test]
    async fn missing_parent_build_propagates() {
        let snapshot = Snapshot {
            builds: vec![build(5, "orphan-container-1-1", Some(4), None)],
            ..Snapshot::default()
        };
        let (resolver, _) = resolver(snapshot);

        let err = LineageWalker::new(&resolver)
            .build_tree([Identifier::from("orphan-container-1-1")])
            .await
            .unwrap_err();
        assert!(matches!(err, LineageError::BuildNotFound(ref id) if id == "4"));
    }
}
