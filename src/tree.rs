//! Building backing trees from values and reading values back out.
//!
//! The structural tree produced here hashes to exactly the flat
//! [`crate::merkleization::hash_tree_root`]: length and selector
//! mix-ins become explicit internal nodes whose right child is the
//! little-endian length/selector chunk.

use crate::codec;
use crate::constants::{BITS_PER_BYTE, BITS_PER_CHUNK, BYTES_PER_CHUNK};
use crate::descriptor::TypeDescriptor;
use crate::error::SszError;
use crate::gindex::to_gindex;
use crate::merkleization::{log2_ceil, pack, pack_bits};
use crate::node::{Node, get_node};
use crate::value::Value;
use alloc::rc::Rc;
use alloc::vec::Vec;
use alloy_primitives::B256;

fn uint_leaf(n: u64) -> Rc<Node> {
    let mut chunk = [0u8; BYTES_PER_CHUNK];
    chunk[..8].copy_from_slice(&n.to_le_bytes());
    Node::leaf(B256::from(chunk))
}

fn chunk_leaves(chunks: Vec<[u8; BYTES_PER_CHUNK]>) -> Vec<Rc<Node>> {
    chunks.into_iter().map(|c| Node::leaf(B256::from(c))).collect()
}

/// Builds a balanced subtree of the given depth over `nodes`, padding
/// unfilled positions with zero subtrees.
fn build_subtree(nodes: &[Rc<Node>], depth: usize) -> Rc<Node> {
    if depth == 0 {
        return nodes
            .first()
            .cloned()
            .unwrap_or_else(|| Node::leaf(B256::ZERO));
    }
    if nodes.is_empty() {
        return Node::zero(depth);
    }
    let split = 1usize << (depth - 1);
    let left = build_subtree(&nodes[..nodes.len().min(split)], depth - 1);
    let right = if nodes.len() > split {
        build_subtree(&nodes[split..], depth - 1)
    } else {
        Node::zero(depth - 1)
    };
    Node::internal(left, right)
}

/// Progressive content tree: the balanced group of `base` positions on
/// the right, the remainder recursing on the left, zero when empty.
fn build_progressive(nodes: &[Rc<Node>], base: usize) -> Rc<Node> {
    if nodes.is_empty() {
        return Node::leaf(B256::ZERO);
    }
    let take = nodes.len().min(base);
    let right = build_subtree(&nodes[..take], log2_ceil(base));
    let left = build_progressive(&nodes[take..], base * 4);
    Node::internal(left, right)
}

fn element_nodes(elems: &[Value], element: &TypeDescriptor) -> Result<Vec<Rc<Node>>, SszError> {
    if element.is_basic() {
        let mut bytes = Vec::new();
        for elem in elems {
            bytes.extend(elem.basic_le_bytes().expect("coerced basic element"));
        }
        Ok(chunk_leaves(pack(&bytes)))
    } else {
        elems.iter().map(|e| value_to_node(e, element)).collect()
    }
}

/// Builds the Merkle backing tree of `value` as described by `desc`.
pub fn value_to_node(value: &Value, desc: &TypeDescriptor) -> Result<Rc<Node>, SszError> {
    let value = value.coerce(desc)?;
    let depth = desc.tree_depth();
    match (desc, &value) {
        (TypeDescriptor::Boolean | TypeDescriptor::Uint { .. }, v) => {
            let bytes = v.basic_le_bytes().expect("coerced basic value");
            let mut chunk = [0u8; BYTES_PER_CHUNK];
            chunk[..bytes.len()].copy_from_slice(&bytes);
            Ok(Node::leaf(B256::from(chunk)))
        }
        (TypeDescriptor::Bitvector { .. }, Value::Bits(bits)) => Ok(build_subtree(
            &chunk_leaves(pack_bits(bits)),
            depth.expect("bitvectors have a depth"),
        )),
        (TypeDescriptor::Bitlist { .. }, Value::Bits(bits)) => {
            let content = build_subtree(
                &chunk_leaves(pack_bits(bits)),
                depth.expect("bitlists have a depth"),
            );
            Ok(Node::internal(content, uint_leaf(bits.len() as u64)))
        }
        (TypeDescriptor::ByteVector { .. }, Value::Bytes(bytes)) => Ok(build_subtree(
            &chunk_leaves(pack(bytes)),
            depth.expect("byte vectors have a depth"),
        )),
        (TypeDescriptor::ByteList { .. }, Value::Bytes(bytes)) => {
            let content = build_subtree(
                &chunk_leaves(pack(bytes)),
                depth.expect("byte lists have a depth"),
            );
            Ok(Node::internal(content, uint_leaf(bytes.len() as u64)))
        }
        (TypeDescriptor::Vector { element, .. }, Value::Vector(elems)) => Ok(build_subtree(
            &element_nodes(elems, element)?,
            depth.expect("vectors have a depth"),
        )),
        (TypeDescriptor::List { element, .. }, Value::List(elems)) => {
            let content = build_subtree(
                &element_nodes(elems, element)?,
                depth.expect("lists have a depth"),
            );
            Ok(Node::internal(content, uint_leaf(elems.len() as u64)))
        }
        (TypeDescriptor::ProgressiveList { element }, Value::List(elems)) => {
            let content = build_progressive(&element_nodes(elems, element)?, 1);
            Ok(Node::internal(content, uint_leaf(elems.len() as u64)))
        }
        (TypeDescriptor::Container { fields }, Value::Container(values)) => {
            let nodes = values
                .iter()
                .zip(fields.iter())
                .map(|(v, (_, f))| value_to_node(v, f))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(build_subtree(&nodes, depth.expect("containers have a depth")))
        }
        (TypeDescriptor::StableContainer { fields, capacity }, Value::Stable(values)) => {
            let mut nodes = Vec::with_capacity(fields.len());
            let mut active = alloc::vec![false; *capacity];
            for (i, (v, (_, f))) in values.iter().zip(fields.iter()).enumerate() {
                match v {
                    Some(v) => {
                        nodes.push(value_to_node(v, f)?);
                        active[i] = true;
                    }
                    None => nodes.push(Node::leaf(B256::ZERO)),
                }
            }
            let content = build_subtree(&nodes, depth.expect("stable containers have a depth"));
            let bits = build_subtree(
                &chunk_leaves(pack_bits(&active)),
                log2_ceil(capacity.div_ceil(BITS_PER_CHUNK).max(1)),
            );
            Ok(Node::internal(content, bits))
        }
        (TypeDescriptor::Union { variants }, Value::Union { selector, value }) => {
            let content = match value {
                None => Node::leaf(B256::ZERO),
                Some(inner) => {
                    let variant = variants[*selector as usize]
                        .as_ref()
                        .expect("coerced union value");
                    value_to_node(inner, variant)?
                }
            };
            Ok(Node::internal(content, uint_leaf(*selector as u64)))
        }
        _ => unreachable!("coerce returns a value matching the descriptor"),
    }
}

/// Reads the mixed-in length of a list-shaped backing tree.
pub fn mixed_in_length(node: &Rc<Node>) -> Result<usize, SszError> {
    let leaf = node.right()?.root();
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&leaf.as_slice()[..8]);
    Ok(u64::from_le_bytes(len_bytes) as usize)
}

/// Reads `count` contiguous chunks out of a content subtree of the
/// given depth.
fn read_chunks(content: &Rc<Node>, depth: usize, count: usize) -> Result<Vec<u8>, SszError> {
    let mut bytes = Vec::with_capacity(count * BYTES_PER_CHUNK);
    for j in 0..count {
        let chunk = get_node(content, to_gindex(j, depth))?.root();
        bytes.extend_from_slice(chunk.as_slice());
    }
    Ok(bytes)
}

fn bits_from_bytes(bytes: &[u8], bit_len: usize) -> Vec<bool> {
    (0..bit_len)
        .map(|i| bytes[i / BITS_PER_BYTE] >> (i % BITS_PER_BYTE) & 1 == 1)
        .collect()
}

/// Reads elements out of a balanced content subtree.
fn read_elements(
    content: &Rc<Node>,
    depth: usize,
    count: usize,
    element: &TypeDescriptor,
) -> Result<Vec<Value>, SszError> {
    if let Some(size) = element.fixed_size().filter(|_| element.is_basic()) {
        let chunks = (count * size).div_ceil(BYTES_PER_CHUNK);
        let bytes = read_chunks(content, depth, chunks)?;
        return (0..count)
            .map(|i| codec::decode(&bytes[i * size..(i + 1) * size], element))
            .collect();
    }
    (0..count)
        .map(|i| node_to_value(&get_node(content, to_gindex(i, depth))?, element))
        .collect()
}

/// Progressive counterpart of [`read_elements`]: walks the growing
/// subtree groups until `count` elements have been read.
fn read_progressive(
    content: &Rc<Node>,
    count: usize,
    element: &TypeDescriptor,
) -> Result<Vec<Value>, SszError> {
    // Packed basic elements are grouped chunk-wise, composites
    // element-wise.
    if let Some(size) = element.fixed_size().filter(|_| element.is_basic()) {
        let mut bytes = Vec::with_capacity(count * size);
        let mut node = content.clone();
        let mut base = 1usize;
        let mut remaining = (count * size).div_ceil(BYTES_PER_CHUNK);
        while remaining > 0 {
            let take = remaining.min(base);
            bytes.extend(read_chunks(&node.right()?, log2_ceil(base), take)?);
            remaining -= take;
            node = node.left()?;
            base *= 4;
        }
        return (0..count)
            .map(|i| codec::decode(&bytes[i * size..(i + 1) * size], element))
            .collect();
    }

    let mut out = Vec::with_capacity(count);
    let mut node = content.clone();
    let mut base = 1usize;
    let mut remaining = count;
    while remaining > 0 {
        let take = remaining.min(base);
        let group = node.right()?;
        out.extend(read_elements(&group, log2_ceil(base), take, element)?);
        remaining -= take;
        node = node.left()?;
        base *= 4;
    }
    Ok(out)
}

/// Reconstructs the value held by a backing tree. The inverse of
/// [`value_to_node`] for every concrete (or resolvable) tree.
pub fn node_to_value(node: &Rc<Node>, desc: &TypeDescriptor) -> Result<Value, SszError> {
    match desc {
        TypeDescriptor::Boolean => codec::decode(&node.root().as_slice()[..1], desc),
        TypeDescriptor::Uint { bytes } => codec::decode(&node.root().as_slice()[..*bytes], desc),
        TypeDescriptor::Bitvector { length } => {
            let depth = desc.tree_depth().expect("bitvectors have a depth");
            let bytes = read_chunks(node, depth, desc.chunk_count())?;
            Ok(Value::Bits(bits_from_bytes(&bytes, *length)))
        }
        TypeDescriptor::Bitlist { limit } => {
            let len = mixed_in_length(node)?;
            if len > *limit {
                return Err(SszError::ExceedsLimit {
                    limit: *limit,
                    got: len,
                });
            }
            let depth = desc.tree_depth().expect("bitlists have a depth");
            let content = node.left()?;
            let bytes = read_chunks(&content, depth, len.div_ceil(BITS_PER_CHUNK).max(1))?;
            Ok(Value::Bits(bits_from_bytes(&bytes, len)))
        }
        TypeDescriptor::ByteVector { length } => {
            let depth = desc.tree_depth().expect("byte vectors have a depth");
            let mut bytes = read_chunks(node, depth, desc.chunk_count())?;
            bytes.truncate(*length);
            Ok(Value::Bytes(bytes))
        }
        TypeDescriptor::ByteList { limit } => {
            let len = mixed_in_length(node)?;
            if len > *limit {
                return Err(SszError::ExceedsLimit {
                    limit: *limit,
                    got: len,
                });
            }
            let depth = desc.tree_depth().expect("byte lists have a depth");
            let content = node.left()?;
            let mut bytes = read_chunks(&content, depth, len.div_ceil(BYTES_PER_CHUNK).max(1))?;
            bytes.truncate(len);
            Ok(Value::Bytes(bytes))
        }
        TypeDescriptor::Vector { element, length } => {
            let depth = desc.tree_depth().expect("vectors have a depth");
            Ok(Value::Vector(read_elements(node, depth, *length, element)?))
        }
        TypeDescriptor::List { element, limit } => {
            let len = mixed_in_length(node)?;
            if len > *limit {
                return Err(SszError::ExceedsLimit {
                    limit: *limit,
                    got: len,
                });
            }
            let depth = desc.tree_depth().expect("lists have a depth");
            let content = node.left()?;
            Ok(Value::List(read_elements(&content, depth, len, element)?))
        }
        TypeDescriptor::ProgressiveList { element } => {
            let len = mixed_in_length(node)?;
            let content = node.left()?;
            Ok(Value::List(read_progressive(&content, len, element)?))
        }
        TypeDescriptor::Container { fields } => {
            let depth = desc.tree_depth().expect("containers have a depth");
            let values = fields
                .iter()
                .enumerate()
                .map(|(i, (_, f))| node_to_value(&get_node(node, to_gindex(i, depth))?, f))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Container(values))
        }
        TypeDescriptor::StableContainer { fields, capacity } => {
            let depth = desc.tree_depth().expect("stable containers have a depth");
            let bits_node = node.right()?;
            let bits_chunks = capacity.div_ceil(BITS_PER_CHUNK).max(1);
            let bits_bytes = read_chunks(&bits_node, log2_ceil(bits_chunks), bits_chunks)?;
            let active = bits_from_bytes(&bits_bytes, *capacity);
            if active[fields.len()..].iter().any(|&b| b) {
                return Err(SszError::InvalidBitvector);
            }
            let content = node.left()?;
            let values = fields
                .iter()
                .enumerate()
                .map(|(i, (_, f))| {
                    if active[i] {
                        node_to_value(&get_node(&content, to_gindex(i, depth))?, f).map(Some)
                    } else {
                        Ok(None)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Stable(values))
        }
        TypeDescriptor::Union { variants } => {
            let selector_chunk = node.right()?.root();
            let selector = selector_chunk[0];
            let variant = variants
                .get(selector as usize)
                .ok_or_else(|| SszError::InvalidSelector {
                    reason: alloc::string::String::from("Unknown selector"),
                    selector: selector as usize,
                })?;
            match variant {
                None => Ok(Value::Union {
                    selector,
                    value: None,
                }),
                Some(variant) => Ok(Value::Union {
                    selector,
                    value: Some(alloc::boxed::Box::new(node_to_value(
                        &node.left()?,
                        variant,
                    )?)),
                }),
            }
        }
    }
}
