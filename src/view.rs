//! Typed views over backing trees.
//!
//! A [`View`] binds a [`TypeDescriptor`] to a [`Node`] and navigates it
//! without ever mutating shared state: reads walk gindices derived from
//! the descriptor, writes rebuild the spine of the tree through
//! [`replace_subtree`] and hand back a new view.

use crate::codec;
use crate::constants::{BITS_PER_BYTE, BITS_PER_CHUNK};
use crate::descriptor::TypeDescriptor;
use crate::error::SszError;
use crate::gindex::{self, Gindex, PathSegment, child_gindex, to_gindex};
use crate::node::{Node, get_node, replace_subtree};
use crate::tree::{mixed_in_length, node_to_value, value_to_node};
use crate::value::Value;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use alloy_primitives::B256;

/// A typed window onto a backing tree. Cloning is cheap; the backing is
/// shared and immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    descriptor: Rc<TypeDescriptor>,
    backing: Rc<Node>,
}

impl View {
    /// Builds a view over a freshly constructed backing tree.
    pub fn new(descriptor: Rc<TypeDescriptor>, value: &Value) -> Result<Self, SszError> {
        let backing = value_to_node(value, &descriptor)?;
        Ok(Self {
            descriptor,
            backing,
        })
    }

    /// Binds a descriptor to an existing backing, e.g. a proof-backed
    /// partial tree or a virtual node rooted at a known hash.
    pub fn from_node(descriptor: Rc<TypeDescriptor>, backing: Rc<Node>) -> Self {
        Self {
            descriptor,
            backing,
        }
    }

    /// Deserializes bytes and builds the backing tree.
    pub fn decode(data: &[u8], descriptor: Rc<TypeDescriptor>) -> Result<Self, SszError> {
        let value = codec::decode(data, &descriptor)?;
        Self::new(descriptor, &value)
    }

    pub fn descriptor(&self) -> &Rc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn backing(&self) -> &Rc<Node> {
        &self.backing
    }

    pub fn hash_tree_root(&self) -> B256 {
        self.backing.root()
    }

    /// Materializes the value held by the backing tree.
    pub fn to_value(&self) -> Result<Value, SszError> {
        node_to_value(&self.backing, &self.descriptor)
    }

    /// Serializes the value held by the backing tree.
    pub fn encode(&self) -> Result<Vec<u8>, SszError> {
        codec::encode(&self.to_value()?, &self.descriptor)
    }

    /// Current element count: the mixed-in length for list shapes, the
    /// declared length or field count otherwise.
    pub fn len(&self) -> Result<usize, SszError> {
        match &*self.descriptor {
            TypeDescriptor::List { .. }
            | TypeDescriptor::Bitlist { .. }
            | TypeDescriptor::ByteList { .. }
            | TypeDescriptor::ProgressiveList { .. } => mixed_in_length(&self.backing),
            desc => desc.declared_length().ok_or(SszError::NavigationPastLeaf),
        }
    }

    pub fn is_empty(&self) -> Result<bool, SszError> {
        Ok(self.len()? == 0)
    }

    fn check_bounds(&self, index: usize) -> Result<(), SszError> {
        let len = self.len()?;
        if index >= len {
            return Err(SszError::IndexOutOfBounds { index, len });
        }
        Ok(())
    }

    /// Child view of the composite element at `index`. Packed shapes
    /// hold multiple elements per chunk and have no per-element
    /// subtree; use [`View::get`] for those.
    pub fn element(&self, index: usize) -> Result<View, SszError> {
        if self.descriptor.is_packed() {
            return Err(SszError::NavigationPastLeaf);
        }
        self.check_bounds(index)?;
        let (local, child) = child_gindex(&self.descriptor, PathSegment::Index(index))?;
        Ok(View {
            descriptor: child,
            backing: get_node(&self.backing, local)?,
        })
    }

    /// Child view of the named container field.
    pub fn field(&self, name: &str) -> Result<View, SszError> {
        let (local, child) = child_gindex(&self.descriptor, PathSegment::Field(name))?;
        Ok(View {
            descriptor: child,
            backing: get_node(&self.backing, local)?,
        })
    }

    /// Child view at a pre-resolved generalized index, e.g. one
    /// obtained from [`gindex::get_generalized_index`].
    pub fn at_gindex(&self, g: Gindex, descriptor: Rc<TypeDescriptor>) -> Result<View, SszError> {
        Ok(View {
            descriptor,
            backing: get_node(&self.backing, g)?,
        })
    }

    /// Reads the element at `index` as a value. Packed elements are
    /// sliced out of their chunk; composite elements are materialized
    /// from their subtree.
    pub fn get(&self, index: usize) -> Result<Value, SszError> {
        self.check_bounds(index)?;
        let (local, element) = child_gindex(&self.descriptor, PathSegment::Index(index))?;
        let node = get_node(&self.backing, local)?;
        match self.descriptor.elements_per_chunk() {
            Some(per_chunk) => {
                let chunk = node.root();
                if per_chunk == BITS_PER_CHUNK {
                    let bit = index % BITS_PER_CHUNK;
                    Ok(Value::Bool(
                        chunk[bit / BITS_PER_BYTE] >> (bit % BITS_PER_BYTE) & 1 == 1,
                    ))
                } else {
                    let size = element.fixed_size().expect("packed elements are fixed");
                    let offset = index % per_chunk * size;
                    codec::decode(&chunk.as_slice()[offset..offset + size], &element)
                }
            }
            None => node_to_value(&node, &element),
        }
    }

    /// Returns a new view with element `index` replaced by `value`,
    /// structurally sharing everything else with `self`. The value is
    /// coerced to the element type first.
    pub fn set(&self, index: usize, value: &Value) -> Result<View, SszError> {
        self.check_bounds(index)?;
        // Stable container writes also maintain the active-field bit.
        if let TypeDescriptor::StableContainer { fields, .. } = &*self.descriptor {
            return self.with_field(&fields[index].0, value);
        }
        let (local, element) = child_gindex(&self.descriptor, PathSegment::Index(index))?;
        let value = value.coerce(&element)?;
        let new_backing = match self.descriptor.elements_per_chunk() {
            Some(per_chunk) => {
                // Read the chunk, splice the element in place, write
                // the chunk back through the same gindex.
                let chunk = get_node(&self.backing, local)?.root();
                let mut bytes = chunk.0;
                if per_chunk == BITS_PER_CHUNK {
                    let Value::Bool(bit) = value else {
                        unreachable!("coerced to boolean")
                    };
                    let at = index % BITS_PER_CHUNK;
                    if bit {
                        bytes[at / BITS_PER_BYTE] |= 1 << (at % BITS_PER_BYTE);
                    } else {
                        bytes[at / BITS_PER_BYTE] &= !(1 << (at % BITS_PER_BYTE));
                    }
                } else {
                    let le = value.basic_le_bytes().expect("packed elements are basic");
                    let offset = index % per_chunk * le.len();
                    bytes[offset..offset + le.len()].copy_from_slice(&le);
                }
                replace_subtree(&self.backing, local, Node::leaf(B256::from(bytes)))?
            }
            None => replace_subtree(&self.backing, local, value_to_node(&value, &element)?)?,
        };
        Ok(View {
            descriptor: self.descriptor.clone(),
            backing: new_backing,
        })
    }

    /// Returns a new view with the named field replaced. For stable
    /// containers an inactive field becomes active and its bit is set
    /// in the mixed-in bitvector.
    pub fn with_field(&self, name: &str, value: &Value) -> Result<View, SszError> {
        let index = self
            .descriptor
            .field_index(name)
            .ok_or_else(|| SszError::UnknownField {
                name: String::from(name),
            })?;
        let (local, field) = child_gindex(&self.descriptor, PathSegment::Field(name))?;
        let value = value.coerce(&field)?;
        let mut backing = replace_subtree(&self.backing, local, value_to_node(&value, &field)?)?;

        if let TypeDescriptor::StableContainer { .. } = &*self.descriptor {
            // Bitvector chunk holding this field's active bit.
            let bits_root = gindex::right(gindex::ROOT_GINDEX);
            let bits_depth = crate::merkleization::log2_ceil(
                self.descriptor.chunk_count().div_ceil(BITS_PER_CHUNK).max(1),
            );
            let chunk_gindex =
                gindex::concat(bits_root, to_gindex(index / BITS_PER_CHUNK, bits_depth));
            let mut chunk = get_node(&backing, chunk_gindex)?.root().0;
            let at = index % BITS_PER_CHUNK;
            chunk[at / BITS_PER_BYTE] |= 1 << (at % BITS_PER_BYTE);
            backing = replace_subtree(&backing, chunk_gindex, Node::leaf(B256::from(chunk)))?;
        }

        Ok(View {
            descriptor: self.descriptor.clone(),
            backing,
        })
    }
}
