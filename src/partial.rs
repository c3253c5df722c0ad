//! Partial trees and history reduction.
//!
//! A partial tree carries only the nodes needed to authenticate some
//! target subtree; everything off the path is a [`Node::Stub`] holding
//! just its root. Partials from the same full tree can be merged, and a
//! sequence of historical roots can be reduced to the entries where a
//! target actually changed.

use crate::error::SszError;
use crate::gindex::{self, Gindex};
use crate::node::Node;
use alloc::rc::Rc;
use alloc::vec::Vec;
use alloy_primitives::B256;

/// Reassembles a proof branch into a partial tree: the target leaf and
/// its path are concrete, every sibling is a stub. The result has the
/// same root as the tree the proof was built from. `branch` is ordered
/// leaf to root, as produced by [`crate::proof::build_proof`].
pub fn branch_to_partial(
    leaf: B256,
    branch: &[B256],
    gindex: Gindex,
) -> Result<Rc<Node>, SszError> {
    if gindex == 0 {
        return Err(SszError::InvalidGindex { gindex });
    }
    let depth = gindex::depth(gindex);
    if branch.len() != depth {
        return Err(SszError::InvalidLength {
            expected: depth,
            got: branch.len(),
        });
    }
    let index = gindex::subtree_index(gindex);
    let mut node = Node::leaf(leaf);
    for (i, sibling) in branch.iter().enumerate() {
        node = if index >> i & 1 == 1 {
            Node::internal(Node::stub(*sibling), node)
        } else {
            Node::internal(node, Node::stub(*sibling))
        };
    }
    Ok(node)
}

/// Merges two trees with the same root, preferring concrete nodes over
/// stubs at every position. Two partials proving different subtrees of
/// one tree merge into a partial proving both.
pub fn merge(a: &Rc<Node>, b: &Rc<Node>) -> Result<Rc<Node>, SszError> {
    if a.root() != b.root() {
        return Err(SszError::InconsistentRoots {
            left: a.root(),
            right: b.root(),
        });
    }
    Ok(merge_consistent(a, b))
}

fn merge_consistent(a: &Rc<Node>, b: &Rc<Node>) -> Rc<Node> {
    match (&**a, &**b) {
        (Node::Stub(_), _) => b.clone(),
        (_, Node::Stub(_)) => a.clone(),
        (
            Node::Internal {
                left: al,
                right: ar,
                ..
            },
            Node::Internal {
                left: bl,
                right: br,
                ..
            },
        ) => Node::internal(merge_consistent(al, bl), merge_consistent(ar, br)),
        _ => a.clone(),
    }
}

/// Reduces a history of tree states to the entries where the subtree at
/// `target` changed. Each state is a key paired with its root node; the
/// result pairs the key of each change with the target's root at that
/// point, keeping the first key of every run of equal values.
///
/// Descends one level at a time, collapsing consecutive states whose
/// child toward the target agrees, so states that only differ off the
/// target path drop out early and their subtrees are never visited.
pub fn get_target_history<K: Clone>(
    history: &[(K, Rc<Node>)],
    target: Gindex,
) -> Result<Vec<(K, B256)>, SszError> {
    if target == 0 {
        return Err(SszError::InvalidGindex { gindex: target });
    }
    let mut current: Vec<(K, Rc<Node>)> = Vec::new();
    for (key, node) in history {
        if current.last().is_none_or(|(_, prev)| prev.root() != node.root()) {
            current.push((key.clone(), node.clone()));
        }
    }
    for step_right in gindex::bit_iter(target) {
        let mut next: Vec<(K, Rc<Node>)> = Vec::new();
        for (key, node) in current {
            let child = node.child(step_right)?;
            if next.last().is_none_or(|(_, prev)| prev.root() != child.root()) {
                next.push((key, child));
            }
        }
        current = next;
    }
    Ok(current
        .into_iter()
        .map(|(key, node)| (key, node.root()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::gindex::{PathSegment, get_generalized_index};
    use crate::node::get_node;
    use crate::proof::build_proof;
    use crate::tree::value_to_node;
    use crate::value::Value;
    use alloc::vec;

    fn state(slot: u64, balance: u64) -> (Rc<TypeDescriptor>, Rc<Node>) {
        let desc = TypeDescriptor::container(&[
            ("slot", TypeDescriptor::uint64()),
            ("balances", TypeDescriptor::vector(TypeDescriptor::uint256(), 4)),
        ]);
        let value = Value::Container(vec![
            Value::U64(slot),
            Value::Vector(vec![
                Value::U64(balance),
                Value::U64(20),
                Value::U64(30),
                Value::U64(40),
            ]),
        ]);
        let node = value_to_node(&value, &desc).expect("can build tree");
        (desc, node)
    }

    #[test]
    fn test_branch_to_partial_matches_root() {
        let (desc, node) = state(1, 10);
        let g = get_generalized_index(
            &desc,
            &[PathSegment::Field("balances"), PathSegment::Index(0)],
        )
        .expect("valid path");
        let branch = build_proof(&node, g).expect("can prove");
        let leaf = get_node(&node, g).expect("resolvable").root();

        let partial = branch_to_partial(leaf, &branch, g).expect("well formed");
        assert_eq!(partial.root(), node.root());
        assert_eq!(get_node(&partial, g).expect("on the path").root(), leaf);

        // Off-path subtrees are stubs: their root is known but they
        // cannot be descended into.
        let slot_g = get_generalized_index(&desc, &[PathSegment::Field("slot")])
            .expect("valid path");
        assert_eq!(
            get_node(&partial, slot_g)
                .expect("sibling root is known")
                .root(),
            get_node(&node, slot_g).expect("resolvable").root()
        );
        assert_eq!(
            get_node(&partial, gindex::left(g)),
            Err(SszError::NavigationPastLeaf)
        );
    }

    #[test]
    fn test_branch_to_partial_rejects_bad_shape() {
        assert_eq!(
            branch_to_partial(B256::ZERO, &[], 0),
            Err(SszError::InvalidGindex { gindex: 0 })
        );
        assert_eq!(
            branch_to_partial(B256::ZERO, &[B256::ZERO], 4),
            Err(SszError::InvalidLength {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_merge_combines_two_partials() {
        let (desc, node) = state(1, 10);
        let slot_g = get_generalized_index(&desc, &[PathSegment::Field("slot")])
            .expect("valid path");
        let bal_g = get_generalized_index(
            &desc,
            &[PathSegment::Field("balances"), PathSegment::Index(2)],
        )
        .expect("valid path");

        let a = branch_to_partial(
            get_node(&node, slot_g).expect("resolvable").root(),
            &build_proof(&node, slot_g).expect("can prove"),
            slot_g,
        )
        .expect("well formed");
        let b = branch_to_partial(
            get_node(&node, bal_g).expect("resolvable").root(),
            &build_proof(&node, bal_g).expect("can prove"),
            bal_g,
        )
        .expect("well formed");

        // Neither partial can answer the other's query on its own.
        assert_eq!(get_node(&a, bal_g), Err(SszError::UnresolvedSubtree));

        let merged = merge(&a, &b).expect("consistent");
        assert_eq!(merged.root(), node.root());
        for g in [slot_g, bal_g] {
            assert_eq!(
                get_node(&merged, g).expect("resolvable").root(),
                get_node(&node, g).expect("resolvable").root()
            );
        }

        // Merge is symmetric and idempotent on the resolvable set.
        let swapped = merge(&b, &a).expect("consistent");
        assert_eq!(swapped.root(), merged.root());
        assert!(get_node(&swapped, slot_g).is_ok());
        let again = merge(&merged, &merged).expect("consistent");
        assert_eq!(again.root(), merged.root());
    }

    #[test]
    fn test_merge_rejects_different_roots() {
        let (_, a) = state(1, 10);
        let (_, b) = state(2, 10);
        assert_eq!(
            merge(&a, &b),
            Err(SszError::InconsistentRoots {
                left: a.root(),
                right: b.root(),
            })
        );
    }

    #[test]
    fn test_merge_with_full_tree_resolves_everything() {
        let (desc, node) = state(1, 10);
        let slot_g = get_generalized_index(&desc, &[PathSegment::Field("slot")])
            .expect("valid path");
        let partial = branch_to_partial(
            get_node(&node, slot_g).expect("resolvable").root(),
            &build_proof(&node, slot_g).expect("can prove"),
            slot_g,
        )
        .expect("well formed");

        let merged = merge(&partial, &node).expect("consistent");
        let bal_g = get_generalized_index(
            &desc,
            &[PathSegment::Field("balances"), PathSegment::Index(3)],
        )
        .expect("valid path");
        assert!(get_node(&merged, bal_g).is_ok());
    }

    #[test]
    fn test_target_history_keeps_first_of_each_run() {
        // The tracked balance changes at entries 0, 2 and 4; entry 1
        // repeats it and entry 3 only touches an unrelated field.
        let states = [
            (0u64, state(1, 10).1),
            (1, state(2, 10).1),
            (2, state(3, 11).1),
            (3, state(4, 11).1),
            (4, state(5, 12).1),
        ];
        let (desc, _) = state(0, 0);
        let g = get_generalized_index(
            &desc,
            &[PathSegment::Field("balances"), PathSegment::Index(0)],
        )
        .expect("valid path");

        let history = get_target_history(&states, g).expect("resolvable");
        let keys: Vec<u64> = history.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, [0, 2, 4]);

        for ((_, root), balance) in history.iter().zip([10u64, 11, 12]) {
            let mut chunk = [0u8; 32];
            chunk[..8].copy_from_slice(&balance.to_le_bytes());
            assert_eq!(*root, B256::from(chunk));
        }
    }

    #[test]
    fn test_target_history_collapses_identical_states() {
        let node = state(1, 10).1;
        let states = [(0u64, node.clone()), (1, node.clone()), (2, node)];
        let history = get_target_history(&states, 1).expect("resolvable");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].0, 0);
    }

    #[test]
    fn test_target_history_works_over_partials() {
        // A proof branch is enough history material: only the path
        // toward the target is ever descended.
        let (desc, node) = state(1, 10);
        let g = get_generalized_index(
            &desc,
            &[PathSegment::Field("balances"), PathSegment::Index(0)],
        )
        .expect("valid path");
        let partial = branch_to_partial(
            get_node(&node, g).expect("resolvable").root(),
            &build_proof(&node, g).expect("can prove"),
            g,
        )
        .expect("well formed");

        let (_, next) = state(1, 33);
        let states = [(0u64, partial), (1, next.clone())];
        let history = get_target_history(&states, g).expect("resolvable");
        assert_eq!(history.len(), 2);
        assert_eq!(
            history[1].1,
            get_node(&next, g).expect("resolvable").root()
        );
    }
}
