//! Merkle proof construction and verification.
//!
//! A proof for a generalized index is the list of sibling roots along
//! the path from the target back up to the tree root, ordered leaf to
//! root. Verification folds the branch back together and compares the
//! reconstructed root.

use crate::error::SszError;
use crate::gindex::{self, Gindex};
use crate::merkleization::hash_concat;
use crate::node::Node;
use alloc::rc::Rc;
use alloc::vec::Vec;
use alloy_primitives::B256;

/// Collects the sibling roots proving the subtree at `gindex` against
/// the root of `node`, ordered from the target's sibling up to the
/// root's child. Every node on the path must be resolvable.
pub fn build_proof(node: &Rc<Node>, gindex: Gindex) -> Result<Vec<B256>, SszError> {
    if gindex == 0 {
        return Err(SszError::InvalidGindex { gindex });
    }
    let mut branch = Vec::with_capacity(gindex::depth(gindex));
    let mut current = node.clone();
    for step_right in gindex::bit_iter(gindex) {
        let sibling = current.child(!step_right)?;
        branch.push(sibling.root());
        current = current.child(step_right)?;
    }
    branch.reverse();
    Ok(branch)
}

/// Checks that `leaf` sits at position `index` of depth `depth` under
/// `root`, using the sibling roots in `branch` ordered leaf to root.
pub fn is_valid_merkle_branch(
    leaf: &B256,
    branch: &[B256],
    depth: usize,
    index: Gindex,
    root: &B256,
) -> bool {
    if branch.len() != depth {
        return false;
    }
    let mut value = *leaf;
    for (i, sibling) in branch.iter().enumerate() {
        value = if index >> i & 1 == 1 {
            hash_concat(sibling, &value)
        } else {
            hash_concat(&value, sibling)
        };
    }
    value == *root
}

/// Verifies a proof produced by [`build_proof`] for `gindex`.
pub fn verify_proof(leaf: &B256, branch: &[B256], gindex: Gindex, root: &B256) -> bool {
    gindex != 0
        && is_valid_merkle_branch(
            leaf,
            branch,
            gindex::depth(gindex),
            gindex::subtree_index(gindex),
            root,
        )
}
