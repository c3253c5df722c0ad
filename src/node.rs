//! Immutable binary-tree backing for merkleized values.
//!
//! Nodes are reference-counted and never mutated: every write builds a
//! new node graph that shares untouched subtrees with its predecessor.
//! A node's root is memoized in a write-once cell the first time it is
//! computed.

use crate::error::SszError;
use crate::gindex::{self, Gindex};
use crate::merkleization::hash_concat;
use alloc::rc::Rc;
use alloc::vec::Vec;
use alloy_primitives::B256;
use core::cell::OnceCell;
use core::fmt;

/// Capability for resolving the children of a node from its root hash,
/// e.g. a remote-state fetcher or an on-disk store. Injected into
/// [`Node::virtual_node`]; the core never retries a failed fetch.
pub trait VirtualSource {
    fn get_left(&self, root: &B256) -> Result<Rc<Node>, SszError>;
    fn get_right(&self, root: &B256) -> Result<Rc<Node>, SszError>;
    fn is_leaf(&self, root: &B256) -> Result<bool, SszError>;
}

/// A node whose children are fetched on demand from a
/// [`VirtualSource`], keyed by this node's own root. Resolved children
/// and the leaf flag are cached after the first fetch.
pub struct VirtualNode {
    root: B256,
    source: Rc<dyn VirtualSource>,
    left: OnceCell<Rc<Node>>,
    right: OnceCell<Rc<Node>>,
    leaf: OnceCell<bool>,
}

impl PartialEq for VirtualNode {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl fmt::Debug for VirtualNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualNode").field("root", &self.root).finish()
    }
}

/// A binary tree node: a 32-byte leaf chunk, an internal pair, an
/// unresolved gap with a known root (proof branches), or a lazily
/// fetched virtual subtree.
#[derive(Debug, PartialEq)]
pub enum Node {
    Leaf(B256),
    Internal {
        left: Rc<Node>,
        right: Rc<Node>,
        root: OnceCell<B256>,
    },
    Stub(B256),
    Virtual(VirtualNode),
}

impl Node {
    pub fn leaf(chunk: B256) -> Rc<Self> {
        Rc::new(Self::Leaf(chunk))
    }

    pub fn internal(left: Rc<Node>, right: Rc<Node>) -> Rc<Self> {
        Rc::new(Self::Internal {
            left,
            right,
            root: OnceCell::new(),
        })
    }

    pub fn stub(root: B256) -> Rc<Self> {
        Rc::new(Self::Stub(root))
    }

    pub fn virtual_node(root: B256, source: Rc<dyn VirtualSource>) -> Rc<Self> {
        Rc::new(Self::Virtual(VirtualNode {
            root,
            source,
            left: OnceCell::new(),
            right: OnceCell::new(),
            leaf: OnceCell::new(),
        }))
    }

    /// The all-zero subtree of the given depth.
    pub fn zero(depth: usize) -> Rc<Self> {
        let mut node = Self::leaf(B256::ZERO);
        for _ in 0..depth {
            node = Self::internal(node.clone(), node);
        }
        node
    }

    /// The 32-byte Merkle root of this node, memoized per instance.
    pub fn root(&self) -> B256 {
        match self {
            Self::Leaf(chunk) => *chunk,
            Self::Internal { left, right, root } => {
                *root.get_or_init(|| hash_concat(&left.root(), &right.root()))
            }
            Self::Stub(root) => *root,
            Self::Virtual(v) => v.root,
        }
    }

    /// Whether this node is a leaf. Fails on unresolved stubs; for
    /// virtual nodes the answer is fetched once and cached.
    pub fn is_leaf(&self) -> Result<bool, SszError> {
        match self {
            Self::Leaf(_) => Ok(true),
            Self::Internal { .. } => Ok(false),
            Self::Stub(_) => Err(SszError::UnresolvedSubtree),
            Self::Virtual(v) => {
                if let Some(&leaf) = v.leaf.get() {
                    return Ok(leaf);
                }
                let leaf = v.source.is_leaf(&v.root)?;
                Ok(*v.leaf.get_or_init(|| leaf))
            }
        }
    }

    pub fn left(&self) -> Result<Rc<Node>, SszError> {
        match self {
            Self::Leaf(_) => Err(SszError::NavigationPastLeaf),
            Self::Internal { left, .. } => Ok(left.clone()),
            Self::Stub(_) => Err(SszError::UnresolvedSubtree),
            Self::Virtual(v) => {
                if self.is_leaf()? {
                    return Err(SszError::NavigationPastLeaf);
                }
                if let Some(left) = v.left.get() {
                    return Ok(left.clone());
                }
                let left = v.source.get_left(&v.root)?;
                Ok(v.left.get_or_init(|| left).clone())
            }
        }
    }

    pub fn right(&self) -> Result<Rc<Node>, SszError> {
        match self {
            Self::Leaf(_) => Err(SszError::NavigationPastLeaf),
            Self::Internal { right, .. } => Ok(right.clone()),
            Self::Stub(_) => Err(SszError::UnresolvedSubtree),
            Self::Virtual(v) => {
                if self.is_leaf()? {
                    return Err(SszError::NavigationPastLeaf);
                }
                if let Some(right) = v.right.get() {
                    return Ok(right.clone());
                }
                let right = v.source.get_right(&v.root)?;
                Ok(v.right.get_or_init(|| right).clone())
            }
        }
    }

    pub fn child(&self, step_right: bool) -> Result<Rc<Node>, SszError> {
        if step_right { self.right() } else { self.left() }
    }
}

/// Navigates from `node` to the descendant at `gindex`.
pub fn get_node(node: &Rc<Node>, gindex: Gindex) -> Result<Rc<Node>, SszError> {
    if gindex == 0 {
        return Err(SszError::InvalidGindex { gindex });
    }
    let mut current = node.clone();
    for step_right in gindex::bit_iter(gindex) {
        current = current.child(step_right)?;
    }
    Ok(current)
}

/// Returns a new root with `new_subtree` substituted at `gindex`,
/// sharing every untouched subtree with the input. The pure form of a
/// "set at path" operation.
pub fn replace_subtree(
    node: &Rc<Node>,
    gindex: Gindex,
    new_subtree: Rc<Node>,
) -> Result<Rc<Node>, SszError> {
    if gindex == 0 {
        return Err(SszError::InvalidGindex { gindex });
    }
    let bits: Vec<bool> = gindex::bit_iter(gindex).collect();
    rebuild(node, &bits, new_subtree)
}

fn rebuild(node: &Rc<Node>, bits: &[bool], new_subtree: Rc<Node>) -> Result<Rc<Node>, SszError> {
    let Some((&step_right, rest)) = bits.split_first() else {
        return Ok(new_subtree);
    };
    let left = node.left()?;
    let right = node.right()?;
    Ok(if step_right {
        Node::internal(left, rebuild(&right, rest, new_subtree)?)
    } else {
        Node::internal(rebuild(&left, rest, new_subtree)?, right)
    })
}
