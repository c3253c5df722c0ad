//! Generalized-index arithmetic.
//!
//! A generalized index encodes a root-to-node path in binary: the root
//! is 1, stepping to the left child doubles the index and stepping to
//! the right child doubles and adds one. `floor(log2(g))` is therefore
//! the depth of the node below the root.

use crate::descriptor::TypeDescriptor;
use crate::error::SszError;
use alloc::rc::Rc;
use alloc::string::{String, ToString};

pub type Gindex = u64;

/// The tree root.
pub const ROOT_GINDEX: Gindex = 1;

pub const fn left(g: Gindex) -> Gindex {
    2 * g
}

pub const fn right(g: Gindex) -> Gindex {
    2 * g + 1
}

pub const fn parent(g: Gindex) -> Gindex {
    g / 2
}

pub const fn sibling(g: Gindex) -> Gindex {
    g ^ 1
}

pub const fn is_root(g: Gindex) -> bool {
    g == 1
}

/// Path length from the root: `floor(log2(g))`.
pub const fn depth(g: Gindex) -> usize {
    (63 - g.leading_zeros()) as usize
}

/// The largest power of two <= g: the nearest depth-aligned ancestor
/// index, used when walking a value one level at a time.
pub const fn anchor(g: Gindex) -> Gindex {
    1 << depth(g)
}

/// Position of the node within its depth level.
pub const fn subtree_index(g: Gindex) -> Gindex {
    g % anchor(g)
}

/// Gindex of chunk `chunk_index` in a content tree of depth `depth`.
pub const fn to_gindex(chunk_index: usize, depth: usize) -> Gindex {
    (1 << depth) + chunk_index as Gindex
}

/// Composes a path through a nested structure: strips `inner`'s leading
/// one bit and appends its remaining path bits onto `outer`.
pub const fn concat(outer: Gindex, inner: Gindex) -> Gindex {
    outer * anchor(inner) + subtree_index(inner)
}

/// Left/right decisions from the root to `g`, most significant bit
/// first, skipping the leading one bit. `true` means step right.
pub fn bit_iter(g: Gindex) -> impl Iterator<Item = bool> {
    (0..depth(g)).rev().map(move |i| g >> i & 1 == 1)
}

/// A path segment into a composite type: a container field by name or
/// an element by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Field(&'a str),
    Index(usize),
}

impl PathSegment<'_> {
    fn describe(&self) -> String {
        match self {
            Self::Field(name) => String::from(*name),
            Self::Index(i) => i.to_string(),
        }
    }
}

/// Local gindex of one path segment within `desc`, together with the
/// descriptor of the reached child. For packed shapes the gindex points
/// at the chunk holding the element.
pub(crate) fn child_gindex(
    desc: &TypeDescriptor,
    segment: PathSegment<'_>,
) -> Result<(Gindex, Rc<TypeDescriptor>), SszError> {
    if desc.is_basic() {
        return Err(SszError::NavigationPastLeaf);
    }
    match desc {
        TypeDescriptor::Container { fields } => {
            let index = match segment {
                PathSegment::Field(name) => {
                    desc.field_index(name).ok_or_else(|| SszError::UnknownField {
                        name: String::from(name),
                    })?
                }
                PathSegment::Index(i) => i,
            };
            if index >= fields.len() {
                return Err(SszError::IndexOutOfBounds {
                    index,
                    len: fields.len(),
                });
            }
            let depth = desc.tree_depth().expect("containers have a depth");
            Ok((to_gindex(index, depth), fields[index].1.clone()))
        }
        TypeDescriptor::StableContainer { fields, .. } => {
            let index = match segment {
                PathSegment::Field(name) => {
                    desc.field_index(name).ok_or_else(|| SszError::UnknownField {
                        name: String::from(name),
                    })?
                }
                PathSegment::Index(i) => i,
            };
            if index >= fields.len() {
                return Err(SszError::IndexOutOfBounds {
                    index,
                    len: fields.len(),
                });
            }
            let depth = desc.tree_depth().expect("stable containers have a depth");
            // One extra level for the active-field bitvector mix-in.
            Ok((to_gindex(index, depth + 1), fields[index].1.clone()))
        }
        TypeDescriptor::Vector { element, length } => {
            let index = expect_index(segment)?;
            element_gindex(desc, index, *length, element.clone())
        }
        TypeDescriptor::List { element, limit } => {
            let index = expect_index(segment)?;
            element_gindex(desc, index, *limit, element.clone())
        }
        TypeDescriptor::Bitvector { length } => {
            let index = expect_index(segment)?;
            element_gindex(desc, index, *length, Rc::new(TypeDescriptor::Boolean))
        }
        TypeDescriptor::Bitlist { limit } => {
            let index = expect_index(segment)?;
            element_gindex(desc, index, *limit, Rc::new(TypeDescriptor::Boolean))
        }
        TypeDescriptor::ByteVector { length } => {
            let index = expect_index(segment)?;
            element_gindex(desc, index, *length, TypeDescriptor::uint8())
        }
        TypeDescriptor::ByteList { limit } => {
            let index = expect_index(segment)?;
            element_gindex(desc, index, *limit, TypeDescriptor::uint8())
        }
        _ => Err(SszError::InvalidPath {
            segment: segment.describe(),
        }),
    }
}

fn expect_index(segment: PathSegment<'_>) -> Result<usize, SszError> {
    match segment {
        PathSegment::Index(i) => Ok(i),
        PathSegment::Field(_) => Err(SszError::InvalidPath {
            segment: segment.describe(),
        }),
    }
}

fn element_gindex(
    desc: &TypeDescriptor,
    index: usize,
    capacity: usize,
    element: Rc<TypeDescriptor>,
) -> Result<(Gindex, Rc<TypeDescriptor>), SszError> {
    if index >= capacity {
        return Err(SszError::IndexOutOfBounds {
            index,
            len: capacity,
        });
    }
    let chunk_index = match desc.elements_per_chunk() {
        Some(per_chunk) => index / per_chunk,
        None => index,
    };
    let depth = desc.tree_depth().expect("sized sequences have a depth");
    // Mixed-in shapes carry the content tree under gindex 2.
    let depth = if desc.has_mixin() { depth + 1 } else { depth };
    Ok((to_gindex(chunk_index, depth), element))
}

/// Resolves a field/index path against `desc` to a generalized index.
pub fn get_generalized_index(
    desc: &TypeDescriptor,
    path: &[PathSegment<'_>],
) -> Result<Gindex, SszError> {
    let mut gindex = ROOT_GINDEX;
    let mut current = Rc::new(desc.clone());
    for segment in path {
        let (local, child) = child_gindex(&current, *segment)?;
        gindex = concat(gindex, local);
        current = child;
    }
    Ok(gindex)
}
