//! Reconstruction of reply threads from a flat list of comments.
//!
//! The [`Forest`] is an arena: every comment lives in a single `Vec` in input
//! order, and parent/child relationships are stored as indices into that
//! `Vec`. Nothing in this module recurses, so arbitrarily deep reply chains
//! are safe to build, walk, and nest.

use std::{collections::HashMap, fmt};

use petgraph::{algo::kosaraju_scc, graphmap::DiGraphMap};
use serde::Serialize;
use tracing::instrument;

use crate::domain::{
    collapse::CollapsedSet,
    comment::{Comment, CommentId},
};

/// A comment together with the arena indices of its parent and replies.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    comment: Comment,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// The reply structure of one post's comments.
///
/// Built from scratch by [`Forest::build`] every time the flat collection
/// changes. A forest is never modified after construction.
///
/// Roots are comments without a parent, comments whose parent is not part of
/// the input (orphans), and comments whose ancestry loops back onto
/// themselves (cycle members). Every input comment appears exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    /// One slot per input comment, in input order.
    slots: Vec<Slot>,

    /// Lookup from comment id to slot. Repeated ids resolve to the first slot.
    index: HashMap<CommentId, usize>,

    /// Root slots, in input order.
    roots: Vec<usize>,

    /// Slots whose declared parent was not found in the input.
    orphans: Vec<usize>,

    /// Slots promoted to roots because their ancestry formed a cycle.
    cycle_promotions: Vec<usize>,
}

impl Forest {
    /// Builds the reply forest for a flat collection of comments.
    ///
    /// Children keep the relative order they had in `comments`, and so do
    /// the roots. The input is typically sorted by creation time, but the
    /// result is well-formed for any order.
    ///
    /// This never fails: unresolvable parents and cyclic parent chains are
    /// both resolved by promoting the affected comments to roots.
    #[must_use]
    #[instrument(level = "debug", skip_all, fields(comments = comments.len()))]
    pub fn build(comments: &[Comment]) -> Self {
        let mut index = HashMap::with_capacity(comments.len());
        for (slot, comment) in comments.iter().enumerate() {
            index.entry(comment.id).or_insert(slot);
        }

        let mut parents: Vec<Option<usize>> = comments
            .iter()
            .map(|comment| {
                comment
                    .parent_comment_id
                    .and_then(|parent| index.get(&parent).copied())
            })
            .collect();

        let orphans: Vec<usize> = comments
            .iter()
            .zip(&parents)
            .enumerate()
            .filter(|(_, (comment, parent))| comment.is_reply() && parent.is_none())
            .map(|(slot, _)| slot)
            .collect();

        let cycle_promotions = cycle_members(&parents);
        for &slot in &cycle_promotions {
            tracing::debug!(
                id = %comments[slot].id,
                "comment is part of a reply cycle, promoting to root"
            );
            parents[slot] = None;
        }

        let mut slots: Vec<Slot> = comments
            .iter()
            .zip(parents)
            .map(|(comment, parent)| Slot {
                comment: comment.clone(),
                parent,
                children: Vec::new(),
            })
            .collect();

        let mut roots = Vec::new();
        for slot in 0..slots.len() {
            match slots[slot].parent {
                Some(parent) => slots[parent].children.push(slot),
                None => roots.push(slot),
            }
        }

        Self {
            slots,
            index,
            roots,
            orphans,
            cycle_promotions,
        }
    }

    /// The number of comments in the forest, roots and replies alike.
    ///
    /// Always equal to the length of the input.
    #[must_use]
    pub fn total_comments(&self) -> usize {
        self.slots.len()
    }

    /// The number of top-level comments.
    #[must_use]
    pub fn root_comments(&self) -> usize {
        self.roots.len()
    }

    /// Whether the forest holds no comments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The top-level comments, in input order.
    pub fn roots(&self) -> impl ExactSizeIterator<Item = CommentNode<'_>> + '_ {
        self.roots.iter().map(|&slot| self.node(slot))
    }

    /// Every comment in input order, regardless of its position in the tree.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = CommentNode<'_>> + '_ {
        (0..self.slots.len()).map(|slot| self.node(slot))
    }

    /// Looks up a comment by id.
    #[must_use]
    pub fn get(&self, id: CommentId) -> Option<CommentNode<'_>> {
        self.index.get(&id).map(|&slot| self.node(slot))
    }

    /// Comments whose declared parent was not part of the input.
    pub fn orphans(&self) -> impl ExactSizeIterator<Item = CommentNode<'_>> + '_ {
        self.orphans.iter().map(|&slot| self.node(slot))
    }

    /// Comments promoted to roots to break a cycle in their parent chain.
    pub fn cycle_promotions(&self) -> impl ExactSizeIterator<Item = CommentNode<'_>> + '_ {
        self.cycle_promotions.iter().map(|&slot| self.node(slot))
    }

    /// Depth-first, pre-order walk over every thread.
    ///
    /// Threads are visited in root order and replies in input order.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self, self.roots.iter().rev().copied())
    }

    /// Depth-first walk over a single thread, starting at `id`.
    ///
    /// Depths are relative to `id`, which is reported at depth zero.
    #[must_use]
    pub fn walk_from(&self, id: CommentId) -> Walk<'_> {
        Walk::new(self, self.index.get(&id).copied())
    }

    /// Builds owned nested trees, one per root, suitable for serialization.
    #[must_use]
    pub fn to_nested(&self) -> Vec<CommentTree> {
        // Pre-order puts every parent before its descendants, so filling the
        // table in reverse always finds the children already built.
        let order: Vec<usize> = self.walk().map(|(_, node)| node.slot).collect();
        let mut built: Vec<Option<CommentTree>> = vec![None; self.slots.len()];

        for &slot in order.iter().rev() {
            let entry = &self.slots[slot];
            let children = entry
                .children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[slot] = Some(CommentTree {
                comment: entry.comment.clone(),
                children,
            });
        }

        self.roots
            .iter()
            .filter_map(|&slot| built[slot].take())
            .collect()
    }

    const fn node(&self, slot: usize) -> CommentNode<'_> {
        CommentNode { forest: self, slot }
    }
}

/// Finds every slot whose parent chain leads back to itself.
///
/// Each slot has at most one parent, so the cycles are exactly the strongly
/// connected components with more than one member, plus self-loops. Slots that
/// merely hang off a cycle are not members.
fn cycle_members(parents: &[Option<usize>]) -> Vec<usize> {
    let mut graph = DiGraphMap::<usize, ()>::with_capacity(parents.len(), parents.len());
    for (child, parent) in parents.iter().enumerate() {
        graph.add_node(child);
        if let Some(parent) = parent {
            graph.add_edge(child, *parent, ());
        }
    }

    let mut members = Vec::new();
    for component in kosaraju_scc(&graph) {
        if component.len() > 1 {
            members.extend(component);
            continue;
        }

        let Some(&slot) = component.first() else {
            continue;
        };

        if graph.contains_edge(slot, slot) {
            members.push(slot);
        }
    }

    members.sort_unstable();
    members
}

/// A borrowed view of one comment and its place in the [`Forest`].
#[derive(Clone, Copy)]
pub struct CommentNode<'a> {
    forest: &'a Forest,
    slot: usize,
}

impl<'a> CommentNode<'a> {
    /// The underlying comment record.
    #[must_use]
    pub fn comment(&self) -> &'a Comment {
        &self.forest.slots[self.slot].comment
    }

    /// The comment's id.
    #[must_use]
    pub fn id(&self) -> CommentId {
        self.comment().id
    }

    /// The node this comment is attached to, or `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.forest.slots[self.slot]
            .parent
            .map(|slot| self.forest.node(slot))
    }

    /// Direct replies, in input order.
    pub fn children(self) -> impl ExactSizeIterator<Item = CommentNode<'a>> + 'a {
        let forest = self.forest;
        forest.slots[self.slot]
            .children
            .iter()
            .map(move |&slot| forest.node(slot))
    }

    /// The number of direct replies. Nested replies are not counted.
    #[must_use]
    pub fn reply_count(&self) -> usize {
        self.forest.slots[self.slot].children.len()
    }

    /// Whether this comment is top-level in the forest.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.forest.slots[self.slot].parent.is_none()
    }

    /// The size of the thread rooted here, including this comment.
    #[must_use]
    pub fn thread_size(&self) -> usize {
        Walk::new(self.forest, [self.slot]).count()
    }
}

impl PartialEq for CommentNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.forest, other.forest) && self.slot == other.slot
    }
}

impl Eq for CommentNode<'_> {}

impl fmt::Debug for CommentNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentNode")
            .field("id", &self.id())
            .field(
                "children",
                &self.children().map(|child| child.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Iterative depth-first traversal of a [`Forest`], yielding each node with
/// its depth (roots are at depth zero).
///
/// Replies of collapsed comments and nodes deeper than the depth limit are
/// skipped, but the collapsed comment itself is still yielded.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    forest: &'a Forest,
    stack: Vec<(usize, usize)>,
    collapsed: Option<&'a CollapsedSet>,
    max_depth: Option<usize>,
}

impl<'a> Walk<'a> {
    fn new(forest: &'a Forest, starts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            forest,
            stack: starts.into_iter().map(|slot| (slot, 0)).collect(),
            collapsed: None,
            max_depth: None,
        }
    }

    /// Skips the replies of every comment in `collapsed`.
    #[must_use]
    pub fn collapsed(mut self, collapsed: &'a CollapsedSet) -> Self {
        self.collapsed = Some(collapsed);
        self
    }

    /// Stops descending below `depth`. Zero yields the starting nodes only.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, CommentNode<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (slot, depth) = self.stack.pop()?;
        let entry = &self.forest.slots[slot];

        let within_depth = self.max_depth.is_none_or(|max| depth < max);
        let expanded = self
            .collapsed
            .is_none_or(|collapsed| !collapsed.contains(entry.comment.id));

        if within_depth && expanded {
            self.stack
                .extend(entry.children.iter().rev().map(|&child| (child, depth + 1)));
        }

        Some((depth, self.forest.node(slot)))
    }
}

/// An owned comment with its replies nested inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentTree {
    /// The comment itself.
    #[serde(flatten)]
    pub comment: Comment,
    /// Direct replies, in input order.
    pub children: Vec<CommentTree>,
}

impl CommentTree {
    /// The number of direct replies.
    #[must_use]
    pub fn reply_count(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    use super::*;
    use crate::domain::comment::{PostId, UserId};

    fn comment(id: u64, parent: Option<u64>) -> Comment {
        let base: DateTime<Utc> = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Comment {
            id: CommentId::new(id),
            post_id: PostId::new(1),
            parent_comment_id: parent.map(CommentId::new),
            content: format!("comment {id}"),
            user_id: UserId::new("user"),
            author: "author".to_string(),
            created_at: base + Duration::seconds(i64::try_from(id).unwrap()),
        }
    }

    fn comments(pairs: &[(u64, Option<u64>)]) -> Vec<Comment> {
        pairs.iter().map(|&(id, parent)| comment(id, parent)).collect()
    }

    fn ids<'a>(nodes: impl Iterator<Item = CommentNode<'a>>) -> Vec<u64> {
        nodes.map(|node| node.id().get()).collect()
    }

    fn children_of(forest: &Forest, id: u64) -> Vec<u64> {
        ids(forest.get(CommentId::new(id)).unwrap().children())
    }

    /// Comments with unique ids in shuffled order. Parents are absent,
    /// dangling, or any id in the input, which includes self-references and
    /// longer cycles.
    fn arb_comments() -> impl Strategy<Value = Vec<Comment>> {
        (0_u64..150)
            .prop_flat_map(|len| {
                prop::collection::vec(
                    prop_oneof![
                        1 => Just(None::<u64>),
                        1 => (len + 1..len + 20).prop_map(Some),
                        4 => (1..=len.max(1)).prop_map(Some),
                    ],
                    usize::try_from(len).unwrap(),
                )
            })
            .prop_map(|parents| {
                (1_u64..)
                    .zip(parents)
                    .map(|(id, parent)| comment(id, parent))
                    .collect::<Vec<_>>()
            })
            .prop_shuffle()
    }

    /// Ids whose ancestor walk comes back to themselves, found by following
    /// parent links with a visited set.
    fn ancestor_walk_cycles(input: &[Comment]) -> HashSet<u64> {
        let parent_of: HashMap<u64, u64> = input
            .iter()
            .filter_map(|c| c.parent_comment_id.map(|p| (c.id.get(), p.get())))
            .collect();

        input
            .iter()
            .map(|c| c.id.get())
            .filter(|&start| {
                let mut visited = HashSet::new();
                let mut current = start;
                while let Some(&parent) = parent_of.get(&current) {
                    if parent == start {
                        return true;
                    }
                    if !visited.insert(parent) {
                        return false;
                    }
                    current = parent;
                }
                false
            })
            .collect()
    }

    fn forest_ids(forest: &Forest) -> Vec<u64> {
        forest.walk().map(|(_, node)| node.id().get()).collect()
    }

    #[test]
    fn builds_nested_threads() {
        let forest = Forest::build(&comments(&[
            (1, None),
            (2, Some(1)),
            (3, Some(1)),
            (4, Some(2)),
        ]));

        assert_eq!(ids(forest.roots()), vec![1]);
        assert_eq!(children_of(&forest, 1), vec![2, 3]);
        assert_eq!(children_of(&forest, 2), vec![4]);
        assert!(children_of(&forest, 3).is_empty());

        assert_eq!(forest.total_comments(), 4);
        assert_eq!(forest.root_comments(), 1);
        assert_eq!(forest.get(CommentId::new(1)).unwrap().reply_count(), 2);
        assert_eq!(forest.get(CommentId::new(2)).unwrap().reply_count(), 1);
    }

    #[test]
    fn missing_parent_is_promoted_to_root() {
        let forest = Forest::build(&comments(&[(5, Some(999))]));

        assert_eq!(ids(forest.roots()), vec![5]);
        assert_eq!(forest.root_comments(), 1);
        assert_eq!(ids(forest.orphans()), vec![5]);
        assert_eq!(forest.cycle_promotions().len(), 0);
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        let forest = Forest::build(&[]);

        assert!(forest.is_empty());
        assert_eq!(forest.total_comments(), 0);
        assert_eq!(forest.root_comments(), 0);
        assert_eq!(forest.walk().count(), 0);
        assert!(forest.to_nested().is_empty());
    }

    #[test]
    fn independent_threads_stay_separate() {
        let forest = Forest::build(&comments(&[
            (1, None),
            (2, Some(1)),
            (3, None),
            (4, Some(3)),
        ]));

        assert_eq!(ids(forest.roots()), vec![1, 3]);
        assert_eq!(children_of(&forest, 1), vec![2]);
        assert_eq!(children_of(&forest, 3), vec![4]);
    }

    #[test]
    fn self_reference_is_promoted_to_root() {
        let forest = Forest::build(&comments(&[(1, Some(1))]));

        assert_eq!(ids(forest.roots()), vec![1]);
        assert!(children_of(&forest, 1).is_empty());
        assert_eq!(ids(forest.cycle_promotions()), vec![1]);
        assert_eq!(forest.orphans().len(), 0);
    }

    #[test]
    fn longer_cycle_members_are_promoted_but_branches_stay_attached() {
        // 1 -> 2 -> 3 -> 1 is a cycle; 4 replies to 2 and 5 replies to 4.
        let forest = Forest::build(&comments(&[
            (1, Some(3)),
            (2, Some(1)),
            (3, Some(2)),
            (4, Some(2)),
            (5, Some(4)),
        ]));

        assert_eq!(ids(forest.roots()), vec![1, 2, 3]);
        assert_eq!(ids(forest.cycle_promotions()), vec![1, 2, 3]);
        assert_eq!(children_of(&forest, 2), vec![4]);
        assert_eq!(children_of(&forest, 4), vec![5]);
        assert_eq!(forest_ids(&forest), vec![1, 2, 4, 5, 3]);
    }

    #[test]
    fn children_keep_input_order_not_timestamp_order() {
        let mut input = comments(&[(1, None), (3, Some(1)), (2, Some(1))]);
        // Give the later input entry an earlier timestamp.
        input[2].created_at = input[0].created_at;

        let forest = Forest::build(&input);
        assert_eq!(children_of(&forest, 1), vec![3, 2]);
    }

    #[test]
    fn reply_listed_before_its_parent_still_attaches() {
        let forest = Forest::build(&comments(&[(2, Some(1)), (1, None)]));

        assert_eq!(ids(forest.roots()), vec![1]);
        assert_eq!(children_of(&forest, 1), vec![2]);
        assert_eq!(forest.orphans().len(), 0);
    }

    #[test]
    fn repeated_ids_keep_every_record_and_resolve_to_first() {
        let mut input = comments(&[(1, None), (1, None), (2, Some(1))]);
        input[1].content = "duplicate".to_string();

        let forest = Forest::build(&input);

        assert_eq!(forest.total_comments(), 3);
        assert_eq!(forest.root_comments(), 2);
        assert_eq!(forest.get(CommentId::new(1)).unwrap().reply_count(), 1);
        assert_eq!(forest.walk().count(), 3);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let depth = 100_000;
        let input: Vec<_> = (1..=depth)
            .map(|id| comment(id, (id > 1).then(|| id - 1)))
            .collect();

        let forest = Forest::build(&input);

        assert_eq!(forest.root_comments(), 1);
        let (max_depth, last) = forest.walk().last().unwrap();
        assert_eq!(max_depth, usize::try_from(depth).unwrap() - 1);
        assert_eq!(last.id().get(), depth);
        assert_eq!(forest.roots().next().unwrap().thread_size(), 100_000);

        let nested = forest.to_nested();
        assert_eq!(nested.len(), 1);
        // Unwind the nesting by hand so dropping it does not recurse either.
        let mut stack = nested;
        while let Some(mut tree) = stack.pop() {
            stack.append(&mut tree.children);
        }
    }

    #[test]
    fn walk_respects_collapsed_and_depth_limit() {
        let forest = Forest::build(&comments(&[
            (1, None),
            (2, Some(1)),
            (3, Some(2)),
            (4, None),
            (5, Some(4)),
        ]));

        let mut collapsed = CollapsedSet::default();
        collapsed.collapse(CommentId::new(2));
        let visible: Vec<_> = forest
            .walk()
            .collapsed(&collapsed)
            .map(|(depth, node)| (depth, node.id().get()))
            .collect();
        assert_eq!(visible, vec![(0, 1), (1, 2), (0, 4), (1, 5)]);

        let shallow: Vec<_> = forest.walk().max_depth(0).map(|(_, n)| n.id().get()).collect();
        assert_eq!(shallow, vec![1, 4]);

        let thread: Vec<_> = forest
            .walk_from(CommentId::new(2))
            .map(|(depth, node)| (depth, node.id().get()))
            .collect();
        assert_eq!(thread, vec![(0, 2), (1, 3)]);
    }

    #[test]
    fn nested_trees_mirror_the_arena() {
        let input = comments(&[(1, None), (2, Some(1)), (3, Some(1)), (4, Some(2))]);
        let nested = Forest::build(&input).to_nested();

        assert_eq!(nested.len(), 1);
        let root = &nested[0];
        assert_eq!(root.comment, input[0]);
        assert_eq!(root.reply_count(), 2);
        assert_eq!(root.children[0].comment.id, CommentId::new(2));
        assert_eq!(root.children[0].children[0].comment.id, CommentId::new(4));
        assert_eq!(root.children[1].comment.id, CommentId::new(3));
        assert!(root.children[1].children.is_empty());
    }

    #[test]
    fn node_parent_links_back() {
        let forest = Forest::build(&comments(&[(1, None), (2, Some(1))]));
        let reply = forest.get(CommentId::new(2)).unwrap();

        assert!(!reply.is_root());
        assert_eq!(reply.parent().unwrap().id(), CommentId::new(1));
        assert!(reply.parent().unwrap().parent().is_none());
        assert_eq!(forest.get(CommentId::new(9)), None);
    }

    #[test]
    fn ancestor_walk_finds_self_reference_and_longer_cycles() {
        let input = comments(&[
            (1, Some(1)),
            (2, Some(3)),
            (3, Some(2)),
            (4, Some(2)),
            (5, Some(9)),
        ]);
        assert_eq!(ancestor_walk_cycles(&input), HashSet::from([1, 2, 3]));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]
        #[test]
        fn arbitrary_inputs_hold_every_invariant(input in arb_comments()) {
            let forest = Forest::build(&input);
            let input_ids: HashSet<u64> = input.iter().map(|c| c.id.get()).collect();
            let expected_cycles = ancestor_walk_cycles(&input);

            // Coverage and no duplication.
            let walked = forest_ids(&forest);
            prop_assert_eq!(walked.len(), input.len());
            let walked_ids: HashSet<u64> = walked.iter().copied().collect();
            prop_assert_eq!(&walked_ids, &input_ids);

            // Cycle members are exactly those whose ancestry loops back.
            let promoted: HashSet<u64> = forest.cycle_promotions().map(|n| n.id().get()).collect();
            prop_assert_eq!(&promoted, &expected_cycles);

            // Root classification.
            for node in forest.iter() {
                let parent = node.comment().parent_comment_id.map(CommentId::get);
                let resolvable = parent.is_some_and(|p| input_ids.contains(&p));
                let in_cycle = expected_cycles.contains(&node.id().get());
                prop_assert_eq!(node.is_root(), !resolvable || in_cycle, "{:?}", node);
                if let Some(parent_node) = node.parent() {
                    prop_assert_eq!(Some(parent_node.id().get()), parent);
                }
            }

            // Children preserve input order.
            let position: HashMap<u64, usize> = input
                .iter()
                .enumerate()
                .map(|(i, c)| (c.id.get(), i))
                .collect();
            for node in forest.iter() {
                let order: Vec<usize> =
                    node.children().map(|c| position[&c.id().get()]).collect();
                prop_assert!(order.windows(2).all(|w| w[0] < w[1]));
            }

            // Determinism.
            prop_assert_eq!(Forest::build(&input), forest.clone());
            prop_assert_eq!(Forest::build(&input).to_nested(), forest.to_nested());
        }
    }
}
