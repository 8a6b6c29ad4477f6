use crate::{Fragment, MergeError};
use std::collections::HashMap;
use std::path::PathBuf;
use tilefuse_common::{Containment, ExtentBox};

/// Policy for the assembly walk's misorder edge case.
///
/// The sort of [`containment_sort`] runs over a partial order, so a later
/// element can turn out to dominate its immediate predecessor (for example
/// with degenerate extents). The walk cannot place such an element with only
/// local information; this policy decides what happens to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MisorderPolicy {
    /// Keep the misordered fragment reachable as an extra forest root.
    #[default]
    PromoteRoot,
    /// Preserve the historical behavior: the fragment is attached nowhere
    /// and becomes unreachable, along with any children already attached
    /// beneath it. Its extent file is still consumed.
    Drop,
}

/// A fragment positioned in the containment forest, owning its children in
/// attachment order.
#[derive(Debug)]
pub struct HierarchyNode {
    pub fragment: Fragment,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Number of nodes in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(HierarchyNode::subtree_len)
            .sum::<usize>()
    }
}

/// Result of hierarchy assembly.
#[derive(Debug)]
pub struct Forest {
    /// Top-level roots in promotion order. Mutually incomparable top-level
    /// fragments legally produce more than one.
    pub roots: Vec<HierarchyNode>,
    /// Extent-sample files consumed during assembly, awaiting the cleanup
    /// pass.
    pub consumed: Vec<PathBuf>,
    /// Fragments directly discarded under [`MisorderPolicy::Drop`]. Children
    /// attached beneath a discarded fragment afterwards are orphaned but not
    /// counted here; derive the total loss from [`Forest::node_count`].
    pub dropped: usize,
}

impl Forest {
    /// Number of fragments reachable from the forest roots.
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(HierarchyNode::subtree_len).sum()
    }
}

/// Sort fragments by containment rank and fold them into a forest.
pub fn build_hierarchy(mut fragments: Vec<Fragment>, policy: MisorderPolicy) -> Forest {
    containment_sort(&mut fragments);
    link_forest(fragments, policy)
}

/// Order fragments ascending by containment rank, most-nested first.
///
/// Selection sort is deliberate: the containment relation is not total, so a
/// general comparison sort is not guaranteed to converge to the same
/// ordering. The candidate minimum is replaced by any later element it
/// dominates, or by an incomparable later element with strictly smaller
/// taxicab size; ties keep the earlier element.
pub fn containment_sort(fragments: &mut [Fragment]) {
    for i in 0..fragments.len() {
        let mut min = i;
        for j in (i + 1)..fragments.len() {
            match compare_extents(&fragments[min], &fragments[j]) {
                Containment::Dominates => min = j,
                Containment::Incomparable => {
                    if taxicab(&fragments[j]) < taxicab(&fragments[min]) {
                        min = j;
                    }
                }
                Containment::Dominated => {}
            }
        }
        if i != min {
            fragments.swap(i, min);
        }
    }
}

/// Fold a containment-sorted sequence into a forest, consuming per-fragment
/// extent data as each fragment is positioned.
///
/// The last (largest) fragment seeds the forest. Walking toward the
/// smallest, each fragment `j` is compared against its larger neighbor `i`:
/// when `i` dominates `j`, `j` nests under the last processed node; when the
/// pair is incomparable, `j` goes beside it, under the last node that
/// received a direct child, or becomes a new root if none has; when `j`
/// dominates `i`, the ordering invariant is violated and `policy` applies.
/// The cursors live here, never on nodes.
pub fn link_forest(mut fragments: Vec<Fragment>, policy: MisorderPolicy) -> Forest {
    let count = fragments.len();
    if count == 0 {
        return Forest {
            roots: Vec::new(),
            consumed: Vec::new(),
            dropped: 0,
        };
    }

    // Attachment lists per sorted index. Children always carry a smaller
    // index than the node they attach under, since targets are taken from
    // already-walked positions.
    let mut attached: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut root_indices = vec![count - 1];
    let mut dropped = 0usize;
    let mut parent: Option<usize> = None;
    let mut current = count - 1;

    for i in (1..count).rev() {
        let j = i - 1;
        match compare_extents(&fragments[i], &fragments[j]) {
            Containment::Dominates => {
                attached[current].push(j);
                parent = Some(current);
            }
            Containment::Incomparable => match parent {
                Some(p) => attached[p].push(j),
                None => root_indices.push(j),
            },
            Containment::Dominated => {
                tracing::warn!(
                    content = %fragments[j].content_url,
                    ?policy,
                    "fragment dominates its sorted predecessor"
                );
                match policy {
                    MisorderPolicy::PromoteRoot => root_indices.push(j),
                    MisorderPolicy::Drop => dropped += 1,
                }
            }
        }
        current = j;
    }

    // Mark every fragment consumed, placed or dropped; the actual file
    // deletions happen later in a separate cleanup pass.
    let mut consumed = Vec::new();
    for fragment in &mut fragments {
        fragment.extent = None;
        if let Some(path) = fragment.aux_path.take() {
            consumed.push(path);
        }
    }

    // Ascending over the sorted indices materializes every subtree before
    // its parent needs it. Nodes never claimed by a parent or a root slot
    // are the fragments the policy discarded.
    let mut built: HashMap<usize, HierarchyNode> = HashMap::with_capacity(count);
    for (index, fragment) in fragments.into_iter().enumerate() {
        let children = attached[index]
            .iter()
            .filter_map(|child| built.remove(child))
            .collect();
        built.insert(index, HierarchyNode { fragment, children });
    }
    let roots = root_indices
        .into_iter()
        .filter_map(|index| built.remove(&index))
        .collect();

    Forest {
        roots,
        consumed,
        dropped,
    }
}

/// Delete extent-sample files consumed by hierarchy assembly.
///
/// Deletion is a point of no return: the first failure aborts the batch and
/// nothing is retried or rolled back.
pub fn delete_consumed(paths: &[PathBuf]) -> Result<(), MergeError> {
    for path in paths {
        std::fs::remove_file(path).map_err(|source| MergeError::Cleanup {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "deleted consumed extent file");
    }
    Ok(())
}

/// Containment verdict between two fragments' extents. A fragment without
/// an extent box is incomparable to everything.
fn compare_extents(a: &Fragment, b: &Fragment) -> Containment {
    match (&a.extent, &b.extent) {
        (Some(a), Some(b)) => a.containment(b),
        _ => Containment::Incomparable,
    }
}

/// Tie-break size for incomparable fragments. Extent-less fragments rank
/// smallest, so they surface early and never claim children.
fn taxicab(fragment: &Fragment) -> f64 {
    fragment.extent.as_ref().map_or(0.0, ExtentBox::taxicab_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use std::path::Path;
    use tilefuse_common::Region;

    fn fragment(name: &str, extent: Option<ExtentBox>) -> Fragment {
        Fragment {
            region: Region::from_array([0.0, 0.0, 1.0, 1.0, 0.0, 10.0]),
            extent,
            geometric_error: 10.0,
            content_url: format!("{name}/model.b3dm"),
            source_path: Path::new(name).join("tileset.json"),
            aux_path: extent.map(|_| Path::new(name).join("model_batchTable.json")),
        }
    }

    fn cube(min: f64, max: f64) -> ExtentBox {
        ExtentBox::new(DVec3::splat(min), DVec3::splat(max))
    }

    fn names(nodes: &[HierarchyNode]) -> Vec<&str> {
        nodes
            .iter()
            .map(|n| n.fragment.content_url.split('/').next().unwrap())
            .collect()
    }

    #[test]
    fn nested_pair_sorts_inner_first_and_nests() {
        let inner = fragment("a", Some(ExtentBox::new(DVec3::ZERO, DVec3::ONE)));
        let outer = fragment("b", Some(cube(-1.0, 2.0)));
        let mut fragments = vec![outer, inner];
        containment_sort(&mut fragments);
        assert_eq!(fragments[0].content_url, "a/model.b3dm");
        assert_eq!(fragments[1].content_url, "b/model.b3dm");

        let forest = link_forest(fragments, MisorderPolicy::default());
        assert_eq!(forest.roots.len(), 1);
        assert_eq!(names(&forest.roots), ["b"]);
        assert_eq!(names(&forest.roots[0].children), ["a"]);
        assert_eq!(forest.dropped, 0);
    }

    #[test]
    fn identical_boxes_become_two_roots() {
        let fragments = vec![
            fragment("a", Some(cube(0.0, 1.0))),
            fragment("b", Some(cube(0.0, 1.0))),
        ];
        let forest = build_hierarchy(fragments, MisorderPolicy::default());
        assert_eq!(forest.roots.len(), 2);
    }

    #[test]
    fn mutually_overlapping_fragments_become_three_roots() {
        let shift = |offset: f64| {
            ExtentBox::new(
                DVec3::new(offset, 0.0, 0.0),
                DVec3::new(offset + 2.0, 1.0, 1.0),
            )
        };
        let fragments = vec![
            fragment("a", Some(shift(0.0))),
            fragment("b", Some(shift(1.0))),
            fragment("c", Some(shift(2.0))),
        ];
        let forest = build_hierarchy(fragments, MisorderPolicy::default());
        assert_eq!(forest.roots.len(), 3);
        assert_eq!(forest.node_count(), 3);
    }

    #[test]
    fn chain_of_nested_boxes_nests_transitively() {
        let fragments = vec![
            fragment("mid", Some(cube(-1.0, 2.0))),
            fragment("in", Some(cube(0.0, 1.0))),
            fragment("out", Some(cube(-2.0, 3.0))),
        ];
        let forest = build_hierarchy(fragments, MisorderPolicy::default());
        assert_eq!(names(&forest.roots), ["out"]);
        let mid = &forest.roots[0].children;
        assert_eq!(names(mid), ["mid"]);
        assert_eq!(names(&mid[0].children), ["in"]);
    }

    #[test]
    fn incomparable_nested_pair_become_siblings() {
        // Two disjoint small boxes inside one large box.
        let left = ExtentBox::new(DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 1.0, 1.0));
        let right = ExtentBox::new(DVec3::new(2.0, 0.0, 0.0), DVec3::new(3.0, 1.0, 1.0));
        let fragments = vec![
            fragment("p", Some(cube(-1.0, 4.0))),
            fragment("l", Some(left)),
            fragment("r", Some(right)),
        ];
        let forest = build_hierarchy(fragments, MisorderPolicy::default());
        assert_eq!(names(&forest.roots), ["p"]);
        assert_eq!(forest.roots[0].children.len(), 2);
        assert_eq!(forest.node_count(), 3);
    }

    #[test]
    fn smaller_taxicab_size_sorts_first_among_incomparable() {
        let small = ExtentBox::new(DVec3::ZERO, DVec3::new(1.0, 1.0, 1.0));
        let large = ExtentBox::new(DVec3::new(5.0, 0.0, 0.0), DVec3::new(9.0, 4.0, 4.0));
        let mut fragments = vec![fragment("large", Some(large)), fragment("small", Some(small))];
        containment_sort(&mut fragments);
        assert_eq!(fragments[0].content_url, "small/model.b3dm");
    }

    #[test]
    fn equal_sizes_preserve_input_order() {
        let a = ExtentBox::new(DVec3::ZERO, DVec3::ONE);
        let b = ExtentBox::new(DVec3::new(5.0, 0.0, 0.0), DVec3::new(6.0, 1.0, 1.0));
        let mut fragments = vec![fragment("first", Some(a)), fragment("second", Some(b))];
        containment_sort(&mut fragments);
        assert_eq!(fragments[0].content_url, "first/model.b3dm");
        assert_eq!(fragments[1].content_url, "second/model.b3dm");
    }

    #[test]
    fn extent_less_fragments_sort_first_and_stay_leaves() {
        let fragments = vec![
            fragment("big", Some(cube(-2.0, 3.0))),
            fragment("plain", None),
            fragment("in", Some(cube(0.0, 1.0))),
        ];
        let forest = build_hierarchy(fragments, MisorderPolicy::default());
        assert_eq!(names(&forest.roots), ["big"]);
        // Both the nested box and the extent-less fragment end up under the
        // big box: "in" nests directly, "plain" attaches as its sibling.
        assert_eq!(forest.roots[0].children.len(), 2);
        assert!(forest.roots[0].children.iter().all(|c| c.children.is_empty()));
    }

    #[test]
    fn misordered_fragment_is_promoted_to_root_by_default() {
        // Bypass the sort: the larger box sits before the smaller one, so
        // the walk sees the predecessor dominating its successor.
        let fragments = vec![
            fragment("outer", Some(cube(-1.0, 2.0))),
            fragment("inner", Some(cube(0.0, 1.0))),
        ];
        let forest = link_forest(fragments, MisorderPolicy::PromoteRoot);
        assert_eq!(forest.roots.len(), 2);
        assert_eq!(names(&forest.roots), ["inner", "outer"]);
        assert_eq!(forest.dropped, 0);
    }

    #[test]
    fn misordered_fragment_is_lost_under_drop_policy() {
        let fragments = vec![
            fragment("outer", Some(cube(-1.0, 2.0))),
            fragment("inner", Some(cube(0.0, 1.0))),
        ];
        let forest = link_forest(fragments, MisorderPolicy::Drop);
        assert_eq!(names(&forest.roots), ["inner"]);
        assert_eq!(forest.dropped, 1);
        // The lost fragment's extent file is still consumed.
        assert_eq!(forest.consumed.len(), 2);
    }

    #[test]
    fn children_attached_beneath_a_dropped_fragment_are_orphaned() {
        // Bypass the sort: after "outer" is dropped the cursor still targets
        // it, so "tiny" attaches under the dropped node and is lost too.
        let fragments = vec![
            fragment("tiny", Some(cube(0.0, 0.5))),
            fragment("outer", Some(cube(-1.0, 2.0))),
            fragment("inner", Some(cube(0.0, 1.0))),
        ];
        let forest = link_forest(fragments, MisorderPolicy::Drop);
        assert_eq!(names(&forest.roots), ["inner"]);
        assert_eq!(forest.dropped, 1);
        assert_eq!(forest.node_count(), 1);
    }

    #[test]
    fn single_fragment_is_the_sole_root() {
        let forest = build_hierarchy(
            vec![fragment("only", Some(cube(0.0, 1.0)))],
            MisorderPolicy::default(),
        );
        assert_eq!(names(&forest.roots), ["only"]);
        assert!(forest.roots[0].children.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        let forest = build_hierarchy(Vec::new(), MisorderPolicy::default());
        assert!(forest.roots.is_empty());
        assert!(forest.consumed.is_empty());
    }

    #[test]
    fn every_fragment_is_consumed_exactly_once() {
        let fragments = vec![
            fragment("a", Some(cube(0.0, 1.0))),
            fragment("b", Some(cube(-1.0, 2.0))),
            fragment("c", Some(cube(-2.0, 3.0))),
        ];
        let forest = build_hierarchy(fragments, MisorderPolicy::default());
        assert_eq!(forest.consumed.len(), 3);
        // Consumption stripped the extent and aux references off the tree.
        fn check(node: &HierarchyNode) {
            assert!(node.fragment.extent.is_none());
            assert!(node.fragment.aux_path.is_none());
            node.children.iter().for_each(check);
        }
        forest.roots.iter().for_each(check);
    }

    #[test]
    fn promote_policy_keeps_every_fragment_in_the_forest() {
        let fragments = vec![
            fragment("a", Some(cube(0.0, 1.0))),
            fragment("b", Some(cube(0.0, 1.0))),
            fragment("c", Some(cube(-1.0, 2.0))),
            fragment("d", None),
            fragment(
                "e",
                Some(ExtentBox::new(
                    DVec3::new(4.0, 0.0, 0.0),
                    DVec3::new(5.0, 1.0, 1.0),
                )),
            ),
        ];
        let total = fragments.len();
        let forest = build_hierarchy(fragments, MisorderPolicy::PromoteRoot);
        assert_eq!(forest.node_count(), total);
        assert_eq!(forest.dropped, 0);
    }

    #[test]
    fn delete_consumed_removes_files_and_fails_on_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("model_batchTable.json");
        std::fs::write(&present, "{}").unwrap();
        delete_consumed(&[present.clone()]).unwrap();
        assert!(!present.exists());

        let err = delete_consumed(&[dir.path().join("gone_batchTable.json")]).unwrap_err();
        assert!(matches!(err, MergeError::Cleanup { .. }));
    }
}
