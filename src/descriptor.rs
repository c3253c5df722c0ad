//! Type descriptors for every ssz shape.
//!
//! A [`TypeDescriptor`] is built once per distinct type and carries
//! everything the codec and merkleization need: fixed/variable sizing,
//! chunk packing behavior, tree depth and child descriptors. Values are
//! never probed for their shape at runtime.

use crate::constants::{BITS_PER_BYTE, BITS_PER_CHUNK, BYTES_PER_CHUNK};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

/// Closed set of ssz shapes, one variant per distinct kind of type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// `boolean`, one byte on the wire.
    Boolean,
    /// Unsigned integer of 1, 2, 4, 8, 16 or 32 bytes, little-endian.
    Uint { bytes: usize },
    /// `Vector[element, length]`, fixed element count.
    Vector {
        element: Rc<TypeDescriptor>,
        length: usize,
    },
    /// `List[element, limit]`, growable up to `limit` elements.
    List {
        element: Rc<TypeDescriptor>,
        limit: usize,
    },
    /// `Bitvector[length]`.
    Bitvector { length: usize },
    /// `Bitlist[limit]`.
    Bitlist { limit: usize },
    /// `Vector[uint8, length]` specialization holding raw bytes.
    ByteVector { length: usize },
    /// `List[uint8, limit]` specialization holding raw bytes.
    ByteList { limit: usize },
    /// Heterogeneous container with named, ordered fields.
    Container {
        fields: Vec<(String, Rc<TypeDescriptor>)>,
    },
    /// `StableContainer[capacity]` with optional fields (EIP-7495).
    StableContainer {
        fields: Vec<(String, Rc<TypeDescriptor>)>,
        capacity: usize,
    },
    /// Tagged union; variant 0 may be `None`.
    Union {
        variants: Vec<Option<Rc<TypeDescriptor>>>,
    },
    /// `ProgressiveList[element]` (EIP-7916), no declared limit.
    ProgressiveList { element: Rc<TypeDescriptor> },
}

impl TypeDescriptor {
    /// Returns true for basic (single-value, fixed-width) types.
    pub fn is_basic(&self) -> bool {
        matches!(self, Self::Boolean | Self::Uint { .. })
    }

    /// Returns true if elements pack multiple-per-chunk.
    pub fn is_packed(&self) -> bool {
        match self {
            Self::Bitvector { .. }
            | Self::Bitlist { .. }
            | Self::ByteVector { .. }
            | Self::ByteList { .. } => true,
            Self::Vector { element, .. }
            | Self::List { element, .. }
            | Self::ProgressiveList { element } => element.is_basic(),
            _ => false,
        }
    }

    /// If fixed-size, returns the serialized size in bytes.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Boolean => Some(1),
            Self::Uint { bytes } => Some(*bytes),
            Self::Bitvector { length } => Some(length.div_ceil(BITS_PER_BYTE)),
            Self::ByteVector { length } => Some(*length),
            Self::Vector { element, length } => element.fixed_size().map(|s| s * length),
            Self::Container { fields } => fields
                .iter()
                .map(|(_, f)| f.fixed_size())
                .sum::<Option<usize>>(),
            _ => None,
        }
    }

    /// Returns true if the serialized form has a fixed length.
    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// Number of chunks the content tree is padded to. This depends
    /// only on the descriptor (declared limits), never on a value.
    pub fn chunk_count(&self) -> usize {
        match self {
            Self::Boolean | Self::Uint { .. } => 1,
            Self::Bitvector { length } => length.div_ceil(BITS_PER_CHUNK).max(1),
            Self::Bitlist { limit } => limit.div_ceil(BITS_PER_CHUNK).max(1),
            Self::ByteVector { length } => length.div_ceil(BYTES_PER_CHUNK).max(1),
            Self::ByteList { limit } => limit.div_ceil(BYTES_PER_CHUNK).max(1),
            Self::Vector { element, length } => match element.fixed_size() {
                Some(s) if element.is_basic() => (length * s).div_ceil(BYTES_PER_CHUNK).max(1),
                _ => (*length).max(1),
            },
            Self::List { element, limit } => match element.fixed_size() {
                Some(s) if element.is_basic() => (limit * s).div_ceil(BYTES_PER_CHUNK).max(1),
                _ => (*limit).max(1),
            },
            Self::Container { fields } => fields.len().max(1),
            Self::StableContainer { capacity, .. } => (*capacity).max(1),
            Self::Union { .. } => 1,
            // Progressive lists have no fixed chunk layout.
            Self::ProgressiveList { .. } => 0,
        }
    }

    /// Depth of the content tree: `ceil(log2(chunk_count))`, 0 for a
    /// single-chunk value. The length/selector mix-in level of lists,
    /// bitlists, stable containers and unions is not counted here.
    /// `None` for progressive lists, whose depth is unbounded.
    pub fn tree_depth(&self) -> Option<usize> {
        match self {
            Self::ProgressiveList { .. } => None,
            _ => Some(crate::merkleization::log2_ceil(self.chunk_count())),
        }
    }

    /// Returns true if the content root gets a mix-in node on top
    /// (length for lists/bitlists, selector for unions, active-field
    /// bits for stable containers).
    pub fn has_mixin(&self) -> bool {
        matches!(
            self,
            Self::List { .. }
                | Self::Bitlist { .. }
                | Self::ByteList { .. }
                | Self::StableContainer { .. }
                | Self::Union { .. }
                | Self::ProgressiveList { .. }
        )
    }

    /// For packed shapes, the number of elements stored per chunk.
    pub fn elements_per_chunk(&self) -> Option<usize> {
        match self {
            Self::Bitvector { .. } | Self::Bitlist { .. } => Some(BITS_PER_CHUNK),
            Self::ByteVector { .. } | Self::ByteList { .. } => Some(BYTES_PER_CHUNK),
            Self::Vector { element, .. }
            | Self::List { element, .. }
            | Self::ProgressiveList { element }
                if element.is_basic() =>
            {
                element.fixed_size().map(|s| BYTES_PER_CHUNK / s)
            }
            _ => None,
        }
    }

    /// Declared element capacity: the fixed length of vectors and
    /// bitvectors, or the limit of lists and bitlists.
    pub fn declared_length(&self) -> Option<usize> {
        match self {
            Self::Vector { length, .. }
            | Self::Bitvector { length }
            | Self::ByteVector { length } => Some(*length),
            Self::List { limit, .. } | Self::Bitlist { limit } | Self::ByteList { limit } => {
                Some(*limit)
            }
            Self::Container { fields } => Some(fields.len()),
            Self::StableContainer { fields, .. } => Some(fields.len()),
            _ => None,
        }
    }

    /// Resolves a field name to its position for (stable) containers.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        match self {
            Self::Container { fields } | Self::StableContainer { fields, .. } => {
                fields.iter().position(|(n, _)| n == name)
            }
            _ => None,
        }
    }

    /// Child descriptor for element/field position `i`.
    pub fn child(&self, i: usize) -> Option<Rc<TypeDescriptor>> {
        match self {
            Self::Vector { element, .. }
            | Self::List { element, .. }
            | Self::ProgressiveList { element } => Some(element.clone()),
            Self::Container { fields } | Self::StableContainer { fields, .. } => {
                fields.get(i).map(|(_, f)| f.clone())
            }
            _ => None,
        }
    }
}

/// Shorthand constructors used throughout the tests and by consumers
/// declaring their schemas.
impl TypeDescriptor {
    pub fn uint8() -> Rc<Self> {
        Rc::new(Self::Uint { bytes: 1 })
    }

    pub fn uint16() -> Rc<Self> {
        Rc::new(Self::Uint { bytes: 2 })
    }

    pub fn uint32() -> Rc<Self> {
        Rc::new(Self::Uint { bytes: 4 })
    }

    pub fn uint64() -> Rc<Self> {
        Rc::new(Self::Uint { bytes: 8 })
    }

    pub fn uint256() -> Rc<Self> {
        Rc::new(Self::Uint { bytes: 32 })
    }

    pub fn boolean() -> Rc<Self> {
        Rc::new(Self::Boolean)
    }

    pub fn vector(element: Rc<Self>, length: usize) -> Rc<Self> {
        Rc::new(Self::Vector { element, length })
    }

    pub fn list(element: Rc<Self>, limit: usize) -> Rc<Self> {
        Rc::new(Self::List { element, limit })
    }

    pub fn byte_vector(length: usize) -> Rc<Self> {
        Rc::new(Self::ByteVector { length })
    }

    pub fn byte_list(limit: usize) -> Rc<Self> {
        Rc::new(Self::ByteList { limit })
    }

    pub fn bitvector(length: usize) -> Rc<Self> {
        Rc::new(Self::Bitvector { length })
    }

    pub fn bitlist(limit: usize) -> Rc<Self> {
        Rc::new(Self::Bitlist { limit })
    }

    pub fn container(fields: &[(&str, Rc<Self>)]) -> Rc<Self> {
        Rc::new(Self::Container {
            fields: fields
                .iter()
                .map(|(n, f)| (String::from(*n), f.clone()))
                .collect(),
        })
    }

    pub fn stable_container(fields: &[(&str, Rc<Self>)], capacity: usize) -> Rc<Self> {
        Rc::new(Self::StableContainer {
            fields: fields
                .iter()
                .map(|(n, f)| (String::from(*n), f.clone()))
                .collect(),
            capacity,
        })
    }

    pub fn union(variants: &[Option<Rc<Self>>]) -> Rc<Self> {
        Rc::new(Self::Union {
            variants: variants.to_vec(),
        })
    }

    pub fn progressive_list(element: Rc<Self>) -> Rc<Self> {
        Rc::new(Self::ProgressiveList { element })
    }
}
