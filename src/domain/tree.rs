//! Tree construction and traversal over flat parent-linked records.
//!
//! Records are indexed into a generational arena with parent/children links.
//! The owned `Node` forest handed back to callers is built from that index
//! bottom-up, so the caller's input slice is never annotated or mutated.
//! Every walk uses an explicit stack; depth of the input hierarchy does not
//! grow the call stack.

use std::collections::{HashMap, HashSet};

use generational_arena::{Arena, Index};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::record::Record;

/// What to do when two records share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the first record with a given id, drop later ones with a warning.
    #[default]
    FirstWins,
    /// Fail with `DomainError::DuplicateId`.
    Reject,
}

/// A record together with its ordered children (input order).
///
/// `Drop`, `Clone` and `PartialEq` walk the tree with an explicit stack, so
/// arbitrarily deep trees are safe to drop, copy and compare. The derived
/// `Debug` output is recursive; do not format trees deeper than a few
/// thousand levels.
#[derive(Debug)]
pub struct Node<R> {
    pub record: R,
    pub children: Vec<Node<R>>,
}

impl<R> Drop for Node<R> {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

impl<R: Clone> Clone for Node<R> {
    fn clone(&self) -> Self {
        let mut copies = fold_forest(std::slice::from_ref(self), |record, children| Node {
            record: record.clone(),
            children,
        });
        match copies.pop() {
            Some(copy) => copy,
            None => Node::new(self.record.clone()),
        }
    }
}

impl<R: PartialEq> PartialEq for Node<R> {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((lhs, rhs)) = stack.pop() {
            if lhs.record != rhs.record || lhs.children.len() != rhs.children.len() {
                return false;
            }
            stack.extend(lhs.children.iter().zip(&rhs.children));
        }
        true
    }
}

impl<R> Node<R> {
    pub fn new(record: R) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    /// Pre-order iterator: node first, then its children left to right.
    pub fn iter(&self) -> NodeIter<'_, R> {
        NodeIter { stack: vec![self] }
    }

    /// Number of levels below and including this node.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            for child in &node.children {
                stack.push((child, depth + 1));
            }
        }
        max_depth
    }

    /// Records of all nodes without children, in pre-order.
    pub fn leaves(&self) -> Vec<&R> {
        self.iter()
            .filter(|node| node.children.is_empty())
            .map(|node| &node.record)
            .collect()
    }
}

pub struct NodeIter<'a, R> {
    stack: Vec<&'a Node<R>>,
}

impl<'a, R> Iterator for NodeIter<'a, R> {
    type Item = &'a Node<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// Deepest path over all trees of a forest; 0 for an empty forest.
pub fn forest_depth<R>(forest: &[Node<R>]) -> usize {
    forest.iter().map(Node::depth).max().unwrap_or(0)
}

/// Bottom-up fold of every tree in `forest`: `f` receives a record and the
/// already-folded values of its children, in order.
pub fn fold_forest<R, T, F>(forest: &[Node<R>], mut f: F) -> Vec<T>
where
    F: FnMut(&R, Vec<T>) -> T,
{
    let mut out = Vec::with_capacity(forest.len());
    for tree in forest {
        // (node, next child to descend into, folded children so far)
        let mut stack: Vec<(&Node<R>, usize, Vec<T>)> = vec![(tree, 0, Vec::new())];
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if let Some(child) = node.children.get(top.1) {
                top.1 += 1;
                stack.push((child, 0, Vec::with_capacity(child.children.len())));
                continue;
            }
            if let Some((node, _, children)) = stack.pop() {
                let value = f(&node.record, children);
                match stack.last_mut() {
                    Some(parent) => parent.2.push(value),
                    None => out.push(value),
                }
            }
        }
    }
    out
}

/// Arena slot for one indexed record.
#[derive(Debug)]
struct IndexedNode<R> {
    record: R,
    parent: Option<Index>,
    children: Vec<Index>,
}

/// Index over a snapshot of flat records.
///
/// With a sentinel root, records pointing at the sentinel are top level and
/// records pointing at an unknown id are orphans. Without one, every record
/// whose parent is unknown is top level.
#[derive(Debug)]
pub struct TreeIndex<R: Record> {
    arena: Arena<IndexedNode<R>>,
    by_id: HashMap<R::Key, Index>,
    /// Kept records in input order
    order: Vec<Index>,
    roots: Vec<Index>,
    orphans: Vec<Index>,
}

impl<R: Record + Clone> TreeIndex<R> {
    #[instrument(level = "debug", skip(records), fields(records = records.len()))]
    pub fn build(
        records: &[R],
        root: Option<&R::Key>,
        policy: DuplicatePolicy,
    ) -> DomainResult<Self> {
        let mut arena = Arena::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());

        for record in records {
            let id = record.id();
            if by_id.contains_key(&id) {
                match policy {
                    DuplicatePolicy::Reject => return Err(DomainError::duplicate(&id)),
                    DuplicatePolicy::FirstWins => {
                        warn!("duplicate record id {}, keeping first occurrence", id);
                        continue;
                    }
                }
            }
            let idx = arena.insert(IndexedNode {
                record: record.clone(),
                parent: None,
                children: Vec::new(),
            });
            by_id.insert(id, idx);
            order.push(idx);
        }

        let mut index = Self {
            arena,
            by_id,
            order,
            roots: Vec::new(),
            orphans: Vec::new(),
        };
        index.link(root);
        debug!(
            "indexed {} records: {} top level, {} orphans",
            index.order.len(),
            index.roots.len(),
            index.orphans.len()
        );
        Ok(index)
    }

    /// Attach every record to its parent. Iterating in input order keeps
    /// children in input order.
    fn link(&mut self, root: Option<&R::Key>) {
        for pos in 0..self.order.len() {
            let idx = self.order[pos];
            let parent_key = self.arena[idx].record.parent_id();

            if root == Some(&parent_key) {
                self.roots.push(idx);
                continue;
            }
            match self.by_id.get(&parent_key).copied() {
                Some(parent_idx) => {
                    self.arena[idx].parent = Some(parent_idx);
                    self.arena[parent_idx].children.push(idx);
                }
                None if root.is_some() => {
                    debug!(
                        "orphan record {}: parent {} not found",
                        self.arena[idx].record.id(),
                        parent_key
                    );
                    self.orphans.push(idx);
                }
                None => self.roots.push(idx),
            }
        }
    }

    /// Forest of owned nodes hanging off the top level.
    ///
    /// Fails on any cycle in the parent relation, reachable or not.
    #[instrument(level = "debug", skip(self))]
    pub fn to_forest(&self) -> DomainResult<Vec<Node<R>>> {
        self.ensure_acyclic()?;

        let mut built: HashMap<Index, Node<R>> = HashMap::new();
        for (idx, slot) in self.iter_postorder() {
            let children = slot
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(
                idx,
                Node {
                    record: slot.record.clone(),
                    children,
                },
            );
        }

        Ok(self
            .roots
            .iter()
            .filter_map(|root| built.remove(root))
            .collect())
    }

    /// Records from the immediate parent of `id` up to the top level,
    /// nearest first. Unknown ids yield an empty path.
    #[instrument(level = "debug", skip(self))]
    pub fn ancestors(&self, id: &R::Key) -> DomainResult<Vec<&R>> {
        let Some(&start) = self.by_id.get(id) else {
            debug!("ancestors: unknown id {}", id);
            return Ok(Vec::new());
        };

        let mut seen = HashSet::from([start]);
        let mut path = Vec::new();
        let mut current = self.arena[start].parent;

        while let Some(idx) = current {
            if !seen.insert(idx) {
                return Err(DomainError::cyclic(self.arena[idx].record.id()));
            }
            path.push(&self.arena[idx].record);
            current = self.arena[idx].parent;
        }
        Ok(path)
    }

    /// Every record reachable through child links from `id`, depth-first
    /// pre-order with siblings in input order. Unknown ids and leaves yield
    /// an empty set.
    #[instrument(level = "debug", skip(self))]
    pub fn descendants(&self, id: &R::Key) -> DomainResult<Vec<&R>> {
        let Some(&start) = self.by_id.get(id) else {
            debug!("descendants: unknown id {}", id);
            return Ok(Vec::new());
        };

        let mut seen = HashSet::from([start]);
        let mut result = Vec::new();
        let mut stack: Vec<Index> = self.arena[start].children.iter().rev().copied().collect();

        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                return Err(DomainError::cyclic(self.arena[idx].record.id()));
            }
            let slot = &self.arena[idx];
            result.push(&slot.record);
            stack.extend(slot.children.iter().rev().copied());
        }
        Ok(result)
    }

    pub fn get(&self, id: &R::Key) -> Option<&R> {
        self.by_id.get(id).map(|&idx| &self.arena[idx].record)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Top-level records in input order.
    pub fn roots(&self) -> Vec<&R> {
        self.roots.iter().map(|&idx| &self.arena[idx].record).collect()
    }

    /// Records whose parent is neither the sentinel nor a known id.
    pub fn orphans(&self) -> Vec<&R> {
        self.orphans.iter().map(|&idx| &self.arena[idx].record).collect()
    }

    /// Fails with the id of the first record found on a parent cycle.
    pub fn ensure_acyclic(&self) -> DomainResult<()> {
        match self.find_cycle() {
            Some(idx) => Err(DomainError::cyclic(self.arena[idx].record.id())),
            None => Ok(()),
        }
    }

    /// Walk each record's parent chain once; a chain that re-enters itself is a cycle.
    fn find_cycle(&self) -> Option<Index> {
        let mut done: HashSet<Index> = HashSet::with_capacity(self.order.len());

        for &start in &self.order {
            let mut on_path = HashSet::new();
            let mut current = Some(start);
            while let Some(idx) = current {
                if done.contains(&idx) {
                    break;
                }
                if !on_path.insert(idx) {
                    return Some(idx);
                }
                current = self.arena[idx].parent;
            }
            done.extend(on_path);
        }
        None
    }

    fn iter_postorder(&self) -> PostOrderIterator<'_, R> {
        PostOrderIterator::new(self)
    }
}

struct PostOrderIterator<'a, R: Record> {
    index: &'a TreeIndex<R>,
    stack: Vec<(Index, bool)>,
}

impl<'a, R: Record> PostOrderIterator<'a, R> {
    fn new(index: &'a TreeIndex<R>) -> Self {
        let stack = index.roots.iter().rev().map(|&idx| (idx, false)).collect();
        Self { index, stack }
    }
}

impl<'a, R: Record> Iterator for PostOrderIterator<'a, R> {
    type Item = (Index, &'a IndexedNode<R>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((idx, visited)) = self.stack.pop() {
            if let Some(slot) = self.index.arena.get(idx) {
                if !visited {
                    self.stack.push((idx, true));
                    for &child in slot.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((idx, slot));
                }
            }
        }
        None
    }
}

/// Build the forest of records hanging off `root`.
///
/// Children keep their input order. Duplicate ids follow `policy`; cycles
/// anywhere in the parent relation fail with `CyclicReference`.
pub fn build_tree<R: Record + Clone>(
    records: &[R],
    root: &R::Key,
    policy: DuplicatePolicy,
) -> DomainResult<Vec<Node<R>>> {
    TreeIndex::build(records, Some(root), policy)?.to_forest()
}

/// Visit every node of `forest` exactly once, pre-order, roots first.
pub fn for_each_node<R, F>(forest: &[Node<R>], mut visitor: F)
where
    F: FnMut(&Node<R>),
{
    for tree in forest {
        tree.iter().for_each(&mut visitor);
    }
}

/// Ancestors of `target` from its immediate parent up to (excluding) `root`.
///
/// An unknown `target` yields an empty path. A target that is its own
/// transitive ancestor fails with `CyclicReference`.
pub fn ancestor_path<R: Record + Clone>(
    target: &R::Key,
    records: &[R],
    root: &R::Key,
) -> DomainResult<Vec<R>> {
    let index = TreeIndex::build(records, Some(root), DuplicatePolicy::FirstWins)?;
    Ok(index.ancestors(target)?.into_iter().cloned().collect())
}

/// All records transitively below `id`, parent before its children.
///
/// Leaves and unknown ids yield an empty set.
pub fn descendant_set<R: Record + Clone>(id: &R::Key, records: &[R]) -> DomainResult<Vec<R>> {
    let index = TreeIndex::build(records, None, DuplicatePolicy::FirstWins)?;
    Ok(index.descendants(id)?.into_iter().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<R: Record<Key = i64>>(records: &[R]) -> Vec<i64> {
        records.iter().map(Record::id).collect()
    }

    #[test]
    fn given_self_parented_record_when_building_then_cycle_detected() {
        let records = vec![(1_i64, 0_i64), (2, 2)];
        let err = build_tree(&records, &0, DuplicatePolicy::FirstWins).unwrap_err();
        assert_eq!(err, DomainError::cyclic(2));
    }

    #[test]
    fn given_cycle_when_tracing_unrelated_branch_then_succeeds() {
        // 1 <- 2 is fine, 3 <-> 4 is a cycle elsewhere
        let records = vec![(1_i64, 0_i64), (2, 1), (3, 4), (4, 3)];
        let path = ancestor_path(&2, &records, &0).unwrap();
        assert_eq!(ids(&path), vec![1]);
    }

    #[test]
    fn given_orphan_when_indexing_then_reported_and_excluded() {
        let records = vec![(1_i64, 0_i64), (2, 42)];
        let index = TreeIndex::build(&records, Some(&0), DuplicatePolicy::FirstWins).unwrap();
        assert_eq!(index.orphans(), vec![&(2, 42)]);
        assert_eq!(index.to_forest().unwrap().len(), 1);
    }

    #[test]
    fn given_no_sentinel_when_indexing_then_unknown_parents_are_top_level() {
        let records = vec![(1_i64, 0_i64), (2, 1), (3, 99)];
        let index = TreeIndex::build(&records, None, DuplicatePolicy::FirstWins).unwrap();
        assert_eq!(index.roots(), vec![&(1, 0), &(3, 99)]);
        assert!(index.orphans().is_empty());
    }

    #[test]
    fn given_nested_tree_when_measuring_then_depth_and_leaves_match() {
        let records = vec![(1_i64, 0_i64), (2, 1), (3, 2), (4, 1)];
        let forest = build_tree(&records, &0, DuplicatePolicy::FirstWins).unwrap();
        assert_eq!(forest_depth(&forest), 3);
        assert_eq!(forest[0].leaves(), vec![&(3, 2), &(4, 1)]);
        assert_eq!(forest_depth::<(i64, i64)>(&[]), 0);
    }

    #[test]
    fn given_forest_when_folding_then_children_folded_before_parent() {
        let records = vec![(1_i64, 0_i64), (2, 1), (3, 2), (4, 1), (5, 0)];
        let forest = build_tree(&records, &0, DuplicatePolicy::FirstWins).unwrap();
        let rendered = fold_forest(&forest, |record, children: Vec<String>| {
            if children.is_empty() {
                record.0.to_string()
            } else {
                format!("{}({})", record.0, children.join(","))
            }
        });
        assert_eq!(rendered, vec!["1(2(3),4)".to_string(), "5".to_string()]);
    }

    #[test]
    fn given_node_when_cloning_then_equal_and_differs_after_change() {
        let records = vec![(1_i64, 0_i64), (2, 1), (3, 2), (4, 1)];
        let forest = build_tree(&records, &0, DuplicatePolicy::FirstWins).unwrap();

        let mut copy = forest[0].clone();
        assert_eq!(copy, forest[0]);

        copy.children[0].children.clear();
        assert_ne!(copy, forest[0]);
    }
}
