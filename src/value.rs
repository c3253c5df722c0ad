//! Runtime values for every descriptor shape.

use crate::constants::BYTES;
use crate::descriptor::TypeDescriptor;
use crate::error::SszError;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use alloy_primitives::U256;

/// A typed ssz value. The shape a value is allowed to take is dictated
/// by the [`TypeDescriptor`] it is used with; [`Value::coerce`] checks
/// and normalizes that pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    U256(U256),
    /// Bitvector or bitlist contents.
    Bits(Vec<bool>),
    /// Byte-vector or byte-list contents.
    Bytes(Vec<u8>),
    /// Fixed-length vector of elements.
    Vector(Vec<Value>),
    /// Growable list of elements (also progressive lists).
    List(Vec<Value>),
    /// Container field values in declared order.
    Container(Vec<Value>),
    /// Stable container field values, `None` for inactive fields.
    Stable(Vec<Option<Value>>),
    /// Union value; `value` is `None` only for a none-variant.
    Union {
        selector: u8,
        value: Option<Box<Value>>,
    },
}

impl Value {
    /// Short kind name, used in coercion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::U8(_) => "uint8",
            Self::U16(_) => "uint16",
            Self::U32(_) => "uint32",
            Self::U64(_) => "uint64",
            Self::U128(_) => "uint128",
            Self::U256(_) => "uint256",
            Self::Bits(_) => "bits",
            Self::Bytes(_) => "bytes",
            Self::Vector(_) => "vector",
            Self::List(_) => "list",
            Self::Container(_) => "container",
            Self::Stable(_) => "stable container",
            Self::Union { .. } => "union",
        }
    }

    fn mismatch(&self, desc: &TypeDescriptor) -> SszError {
        SszError::TypeMismatch {
            expected: descriptor_kind(desc),
            got: String::from(self.kind()),
        }
    }

    /// Widens the value to a `U256` if it is an unsigned integer.
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::U8(v) => Some(U256::from(*v)),
            Self::U16(v) => Some(U256::from(*v)),
            Self::U32(v) => Some(U256::from(*v)),
            Self::U64(v) => Some(U256::from(*v)),
            Self::U128(v) => Some(U256::from(*v)),
            Self::U256(v) => Some(*v),
            _ => None,
        }
    }

    /// Little-endian wire bytes for basic values, `None` otherwise.
    pub fn basic_le_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Bool(b) => Some(alloc::vec![u8::from(*b)]),
            Self::U8(v) => Some(v.to_le_bytes().to_vec()),
            Self::U16(v) => Some(v.to_le_bytes().to_vec()),
            Self::U32(v) => Some(v.to_le_bytes().to_vec()),
            Self::U64(v) => Some(v.to_le_bytes().to_vec()),
            Self::U128(v) => Some(v.to_le_bytes().to_vec()),
            Self::U256(v) => Some(v.to_le_bytes::<BYTES>().to_vec()),
            _ => None,
        }
    }

    /// Checks the value against `desc`, converting where a lossless
    /// conversion exists (e.g. a `uint8` value into a `uint64` slot).
    /// Fails with [`SszError::TypeMismatch`] when no conversion exists
    /// and with length errors when element counts are off.
    pub fn coerce(&self, desc: &TypeDescriptor) -> Result<Value, SszError> {
        match desc {
            TypeDescriptor::Boolean => match self {
                Self::Bool(b) => Ok(Self::Bool(*b)),
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::Uint { bytes } => {
                let wide = self.as_uint().ok_or_else(|| self.mismatch(desc))?;
                if *bytes < 32 && wide.bit_len() > bytes * 8 {
                    return Err(self.mismatch(desc));
                }
                Ok(match bytes {
                    1 => Self::U8(wide.to::<u8>()),
                    2 => Self::U16(wide.to::<u16>()),
                    4 => Self::U32(wide.to::<u32>()),
                    8 => Self::U64(wide.to::<u64>()),
                    16 => Self::U128(wide.to::<u128>()),
                    _ => Self::U256(wide),
                })
            }
            TypeDescriptor::Bitvector { length } => match self {
                Self::Bits(bits) if bits.len() == *length => Ok(self.clone()),
                Self::Bits(bits) => Err(SszError::InvalidLength {
                    expected: *length,
                    got: bits.len(),
                }),
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::Bitlist { limit } => match self {
                Self::Bits(bits) if bits.len() <= *limit => Ok(self.clone()),
                Self::Bits(bits) => Err(SszError::ExceedsLimit {
                    limit: *limit,
                    got: bits.len(),
                }),
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::ByteVector { length } => match self {
                Self::Bytes(bytes) if bytes.len() == *length => Ok(self.clone()),
                Self::Bytes(bytes) => Err(SszError::InvalidLength {
                    expected: *length,
                    got: bytes.len(),
                }),
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::ByteList { limit } => match self {
                Self::Bytes(bytes) if bytes.len() <= *limit => Ok(self.clone()),
                Self::Bytes(bytes) => Err(SszError::ExceedsLimit {
                    limit: *limit,
                    got: bytes.len(),
                }),
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::Vector { element, length } => match self {
                Self::Vector(elems) | Self::List(elems) => {
                    if elems.len() != *length {
                        return Err(SszError::InvalidLength {
                            expected: *length,
                            got: elems.len(),
                        });
                    }
                    let elems = elems
                        .iter()
                        .map(|e| e.coerce(element))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Self::Vector(elems))
                }
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::List { element, limit } => match self {
                Self::Vector(elems) | Self::List(elems) => {
                    if elems.len() > *limit {
                        return Err(SszError::ExceedsLimit {
                            limit: *limit,
                            got: elems.len(),
                        });
                    }
                    let elems = elems
                        .iter()
                        .map(|e| e.coerce(element))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Self::List(elems))
                }
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::ProgressiveList { element } => match self {
                Self::Vector(elems) | Self::List(elems) => {
                    let elems = elems
                        .iter()
                        .map(|e| e.coerce(element))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Self::List(elems))
                }
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::Container { fields } => match self {
                Self::Container(values) => {
                    if values.len() != fields.len() {
                        return Err(SszError::InvalidLength {
                            expected: fields.len(),
                            got: values.len(),
                        });
                    }
                    let values = values
                        .iter()
                        .zip(fields.iter())
                        .map(|(v, (_, f))| v.coerce(f))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Self::Container(values))
                }
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::StableContainer { fields, capacity } => match self {
                Self::Stable(values) => {
                    if values.len() != fields.len() || fields.len() > *capacity {
                        return Err(SszError::InvalidLength {
                            expected: fields.len(),
                            got: values.len(),
                        });
                    }
                    let values = values
                        .iter()
                        .zip(fields.iter())
                        .map(|(v, (_, f))| v.as_ref().map(|v| v.coerce(f)).transpose())
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Self::Stable(values))
                }
                _ => Err(self.mismatch(desc)),
            },
            TypeDescriptor::Union { variants } => match self {
                Self::Union { selector, value } => {
                    let variant = variants.get(*selector as usize).ok_or_else(|| {
                        SszError::InvalidSelector {
                            reason: String::from("Unknown selector"),
                            selector: *selector as usize,
                        }
                    })?;
                    match (variant, value) {
                        (None, None) => Ok(self.clone()),
                        (Some(v), Some(inner)) => Ok(Self::Union {
                            selector: *selector,
                            value: Some(Box::new(inner.coerce(v)?)),
                        }),
                        _ => Err(self.mismatch(desc)),
                    }
                }
                _ => Err(self.mismatch(desc)),
            },
        }
    }
}

fn descriptor_kind(desc: &TypeDescriptor) -> String {
    String::from(match desc {
        TypeDescriptor::Boolean => "bool",
        TypeDescriptor::Uint { .. } => "uint",
        TypeDescriptor::Bitvector { .. } => "bitvector",
        TypeDescriptor::Bitlist { .. } => "bitlist",
        TypeDescriptor::ByteVector { .. } => "byte vector",
        TypeDescriptor::ByteList { .. } => "byte list",
        TypeDescriptor::Vector { .. } => "vector",
        TypeDescriptor::List { .. } => "list",
        TypeDescriptor::Container { .. } => "container",
        TypeDescriptor::StableContainer { .. } => "stable container",
        TypeDescriptor::Union { .. } => "union",
        TypeDescriptor::ProgressiveList { .. } => "progressive list",
    })
}
