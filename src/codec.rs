//! Serialization and deserialization of values against a descriptor.
//!
//! Fixed-size parts are emitted in declared order; variable-size parts
//! go behind a table of 4-byte little-endian offsets into the trailing
//! section. Decoding rejects every malformed layout with a specific
//! [`SszError`] and never produces a partially decoded value.

use crate::constants::{BITS_PER_BYTE, BYTES_PER_LENGTH_OFFSET, MAX_UNION_SELECTOR};
use crate::descriptor::TypeDescriptor;
use crate::error::SszError;
use crate::value::Value;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use alloy_primitives::U256;

/// Serializes `value` as described by `desc`.
pub fn encode(value: &Value, desc: &TypeDescriptor) -> Result<Vec<u8>, SszError> {
    let value = value.coerce(desc)?;
    let mut buffer = Vec::new();
    encode_into(&value, desc, &mut buffer)?;
    Ok(buffer)
}

fn encode_into(value: &Value, desc: &TypeDescriptor, buffer: &mut Vec<u8>) -> Result<(), SszError> {
    match (desc, value) {
        (TypeDescriptor::Boolean | TypeDescriptor::Uint { .. }, v) => {
            buffer.extend(v.basic_le_bytes().expect("coerced basic value"));
            Ok(())
        }
        (TypeDescriptor::Bitvector { length }, Value::Bits(bits)) => {
            buffer.extend(bits_to_bytes(bits, length.div_ceil(BITS_PER_BYTE)));
            Ok(())
        }
        (TypeDescriptor::Bitlist { .. }, Value::Bits(bits)) => {
            let mut bytes = bits_to_bytes(bits, bits.len() / BITS_PER_BYTE + 1);
            // Delimiter bit marks the logical end of the list.
            bytes[bits.len() / BITS_PER_BYTE] |= 1 << (bits.len() % BITS_PER_BYTE);
            buffer.extend(bytes);
            Ok(())
        }
        (
            TypeDescriptor::ByteVector { .. } | TypeDescriptor::ByteList { .. },
            Value::Bytes(bytes),
        ) => {
            buffer.extend(bytes);
            Ok(())
        }
        (
            TypeDescriptor::Vector { element, .. }
            | TypeDescriptor::List { element, .. }
            | TypeDescriptor::ProgressiveList { element },
            Value::Vector(elems) | Value::List(elems),
        ) => encode_sequence(elems, element, buffer),
        (TypeDescriptor::Container { fields }, Value::Container(values)) => {
            let parts = values
                .iter()
                .zip(fields.iter())
                .map(|(v, (_, f))| {
                    let mut part = Vec::new();
                    encode_into(v, f, &mut part)?;
                    Ok((part, f.is_fixed_size()))
                })
                .collect::<Result<Vec<_>, SszError>>()?;
            encode_parts(&parts, buffer)
        }
        (TypeDescriptor::StableContainer { fields, capacity }, Value::Stable(values)) => {
            let mut active = alloc::vec![false; *capacity];
            for (i, v) in values.iter().enumerate() {
                active[i] = v.is_some();
            }
            buffer.extend(bits_to_bytes(&active, capacity.div_ceil(BITS_PER_BYTE)));

            let parts = values
                .iter()
                .zip(fields.iter())
                .filter_map(|(v, (_, f))| v.as_ref().map(|v| (v, f)))
                .map(|(v, f)| {
                    let mut part = Vec::new();
                    encode_into(v, f, &mut part)?;
                    Ok((part, f.is_fixed_size()))
                })
                .collect::<Result<Vec<_>, SszError>>()?;
            encode_parts(&parts, buffer)
        }
        (TypeDescriptor::Union { variants }, Value::Union { selector, value }) => {
            buffer.push(*selector);
            if let Some(inner) = value {
                let variant = variants[*selector as usize]
                    .as_ref()
                    .expect("coerced union value");
                encode_into(inner, variant, buffer)?;
            }
            Ok(())
        }
        _ => unreachable!("coerce returns a value matching the descriptor"),
    }
}

/// Serializes a homogeneous element sequence: direct concatenation for
/// fixed-size elements, offset table otherwise.
fn encode_sequence(
    elems: &[Value],
    element: &TypeDescriptor,
    buffer: &mut Vec<u8>,
) -> Result<(), SszError> {
    if element.is_fixed_size() {
        for elem in elems {
            encode_into(elem, element, buffer)?;
        }
        return Ok(());
    }

    let mut parts = Vec::with_capacity(elems.len());
    let mut offset = elems.len() * BYTES_PER_LENGTH_OFFSET;
    for elem in elems {
        let mut part = Vec::new();
        encode_into(elem, element, &mut part)?;
        parts.push(part);
    }
    for part in &parts {
        buffer.extend((offset as u32).to_le_bytes());
        offset += part.len();
    }
    for part in parts {
        buffer.extend(part);
    }
    Ok(())
}

/// Serializes pre-encoded parts: fixed parts inline, variable parts as
/// offsets followed by the trailing section.
fn encode_parts(parts: &[(Vec<u8>, bool)], buffer: &mut Vec<u8>) -> Result<(), SszError> {
    let fixed_len: usize = parts
        .iter()
        .map(|(part, fixed)| if *fixed { part.len() } else { BYTES_PER_LENGTH_OFFSET })
        .sum();

    let mut offset = fixed_len;
    for (part, fixed) in parts {
        if *fixed {
            buffer.extend(part);
        } else {
            buffer.extend((offset as u32).to_le_bytes());
            offset += part.len();
        }
    }
    for (part, fixed) in parts {
        if !fixed {
            buffer.extend(part);
        }
    }
    Ok(())
}

fn bits_to_bytes(bits: &[bool], byte_len: usize) -> Vec<u8> {
    let mut bytes = alloc::vec![0u8; byte_len];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / BITS_PER_BYTE] |= 1 << (i % BITS_PER_BYTE);
        }
    }
    bytes
}

/// Parses `data` into a value of the shape described by `desc`.
pub fn decode(data: &[u8], desc: &TypeDescriptor) -> Result<Value, SszError> {
    match desc {
        TypeDescriptor::Boolean => {
            if data.len() != 1 {
                return Err(SszError::InvalidLength {
                    expected: 1,
                    got: data.len(),
                });
            }
            match data[0] {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                _ => Err(SszError::InvalidBooleanByte),
            }
        }
        TypeDescriptor::Uint { bytes } => {
            if data.len() != *bytes {
                return Err(SszError::InvalidLength {
                    expected: *bytes,
                    got: data.len(),
                });
            }
            Ok(decode_uint(data))
        }
        TypeDescriptor::Bitvector { length } => {
            let expected = length.div_ceil(BITS_PER_BYTE);
            if data.len() != expected {
                return Err(SszError::InvalidLength {
                    expected,
                    got: data.len(),
                });
            }
            let bits = bytes_to_bits(data, *length);
            // Padding bits past the declared length must be zero.
            for i in *length..data.len() * BITS_PER_BYTE {
                if data[i / BITS_PER_BYTE] >> (i % BITS_PER_BYTE) & 1 != 0 {
                    return Err(SszError::InvalidBitvector);
                }
            }
            Ok(Value::Bits(bits))
        }
        TypeDescriptor::Bitlist { limit } => {
            let last = *data.last().ok_or(SszError::ExpectedDelimiterBit)?;
            if last == 0 {
                return Err(SszError::ExpectedDelimiterBit);
            }
            let delimiter = 7 - last.leading_zeros() as usize;
            let bit_len = (data.len() - 1) * BITS_PER_BYTE + delimiter;
            if bit_len > *limit {
                return Err(SszError::ExceedsLimit {
                    limit: *limit,
                    got: bit_len,
                });
            }
            Ok(Value::Bits(bytes_to_bits(data, bit_len)))
        }
        TypeDescriptor::ByteVector { length } => {
            if data.len() != *length {
                return Err(SszError::InvalidLength {
                    expected: *length,
                    got: data.len(),
                });
            }
            Ok(Value::Bytes(data.to_vec()))
        }
        TypeDescriptor::ByteList { limit } => {
            if data.len() > *limit {
                return Err(SszError::ExceedsLimit {
                    limit: *limit,
                    got: data.len(),
                });
            }
            Ok(Value::Bytes(data.to_vec()))
        }
        TypeDescriptor::Vector { element, length } => {
            let elems = decode_sequence(data, element, Some(*length), None)?;
            Ok(Value::Vector(elems))
        }
        TypeDescriptor::List { element, limit } => {
            let elems = decode_sequence(data, element, None, Some(*limit))?;
            Ok(Value::List(elems))
        }
        TypeDescriptor::ProgressiveList { element } => {
            let elems = decode_sequence(data, element, None, None)?;
            Ok(Value::List(elems))
        }
        TypeDescriptor::Container { fields } => {
            let field_descs: Vec<_> = fields.iter().map(|(_, f)| f.clone()).collect();
            let values = decode_fields(data, &field_descs)?;
            Ok(Value::Container(values))
        }
        TypeDescriptor::StableContainer { fields, capacity } => {
            let prefix = capacity.div_ceil(BITS_PER_BYTE);
            if data.len() < prefix {
                return Err(SszError::ExpectedFurtherInput);
            }
            let active = bytes_to_bits(&data[..prefix], *capacity);
            if active[fields.len()..].iter().any(|&b| b) {
                return Err(SszError::InvalidBitvector);
            }
            for i in *capacity..prefix * BITS_PER_BYTE {
                if data[i / BITS_PER_BYTE] >> (i % BITS_PER_BYTE) & 1 != 0 {
                    return Err(SszError::InvalidBitvector);
                }
            }

            let active_descs: Vec<_> = fields
                .iter()
                .zip(active.iter())
                .filter(|&(_, &a)| a)
                .map(|((_, f), _)| f.clone())
                .collect();
            let mut decoded = decode_fields(&data[prefix..], &active_descs)?.into_iter();
            let values = active
                .iter()
                .take(fields.len())
                .map(|&a| if a { decoded.next() } else { None })
                .collect();
            Ok(Value::Stable(values))
        }
        TypeDescriptor::Union { variants } => {
            let selector = *data.first().ok_or(SszError::ExpectedFurtherInput)?;
            let payload = &data[1..];
            if selector > MAX_UNION_SELECTOR {
                return Err(SszError::InvalidSelector {
                    reason: String::from("Selector above 127 is reserved"),
                    selector: selector as usize,
                });
            }
            let variant = variants
                .get(selector as usize)
                .ok_or_else(|| SszError::InvalidSelector {
                    reason: String::from("Unknown selector"),
                    selector: selector as usize,
                })?;
            match variant {
                None => {
                    if !payload.is_empty() {
                        return Err(SszError::InvalidLength {
                            expected: 0,
                            got: payload.len(),
                        });
                    }
                    Ok(Value::Union {
                        selector,
                        value: None,
                    })
                }
                Some(variant) => Ok(Value::Union {
                    selector,
                    value: Some(Box::new(decode(payload, variant)?)),
                }),
            }
        }
    }
}

fn decode_uint(data: &[u8]) -> Value {
    match data.len() {
        1 => Value::U8(data[0]),
        2 => Value::U16(u16::from_le_bytes(data.try_into().expect("checked length"))),
        4 => Value::U32(u32::from_le_bytes(data.try_into().expect("checked length"))),
        8 => Value::U64(u64::from_le_bytes(data.try_into().expect("checked length"))),
        16 => Value::U128(u128::from_le_bytes(data.try_into().expect("checked length"))),
        _ => Value::U256(U256::from_le_slice(data)),
    }
}

fn bytes_to_bits(data: &[u8], bit_len: usize) -> Vec<bool> {
    (0..bit_len)
        .map(|i| data[i / BITS_PER_BYTE] >> (i % BITS_PER_BYTE) & 1 == 1)
        .collect()
}

/// Decodes a homogeneous element sequence. `count` pins the element
/// count for vectors; `limit` caps it for lists.
fn decode_sequence(
    data: &[u8],
    element: &TypeDescriptor,
    count: Option<usize>,
    limit: Option<usize>,
) -> Result<Vec<Value>, SszError> {
    if let Some(elem_size) = element.fixed_size().filter(|&s| s > 0) {
        if data.len() % elem_size != 0 {
            return Err(SszError::InvalidLength {
                expected: data.len().next_multiple_of(elem_size),
                got: data.len(),
            });
        }
        let got = data.len() / elem_size;
        if let Some(count) = count {
            if got != count {
                return Err(SszError::InvalidLength {
                    expected: count * elem_size,
                    got: data.len(),
                });
            }
        }
        if let Some(limit) = limit {
            if got > limit {
                return Err(SszError::ExceedsLimit { limit, got });
            }
        }
        return (0..got)
            .map(|i| decode(&data[i * elem_size..(i + 1) * elem_size], element))
            .collect();
    }

    // Variable-size elements sit behind an offset table.
    if data.is_empty() {
        return match count {
            Some(0) | None => Ok(Vec::new()),
            Some(count) => Err(SszError::InvalidLength {
                expected: count * BYTES_PER_LENGTH_OFFSET,
                got: 0,
            }),
        };
    }

    let first = read_offset(data, 0)?;
    if first % BYTES_PER_LENGTH_OFFSET != 0 || first == 0 {
        return Err(SszError::OffsetOutOfBounds {
            offset: first,
            len: data.len(),
        });
    }
    let got = first / BYTES_PER_LENGTH_OFFSET;
    if let Some(count) = count {
        if got != count {
            return Err(SszError::InvalidLength {
                expected: count,
                got,
            });
        }
    }
    if let Some(limit) = limit {
        if got > limit {
            return Err(SszError::ExceedsLimit { limit, got });
        }
    }

    let offsets = read_offsets(data, got, first)?;
    offsets
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = offsets.get(i + 1).copied().unwrap_or(data.len());
            decode(&data[start..end], element)
        })
        .collect()
}

/// Decodes an ordered field sequence: fixed fields inline, variable
/// fields behind offsets.
fn decode_fields(
    data: &[u8],
    fields: &[alloc::rc::Rc<TypeDescriptor>],
) -> Result<Vec<Value>, SszError> {
    let fixed_len: usize = fields
        .iter()
        .map(|f| f.fixed_size().unwrap_or(BYTES_PER_LENGTH_OFFSET))
        .sum();
    if data.len() < fixed_len {
        return Err(SszError::ExpectedFurtherInput);
    }

    // First pass: slice out fixed parts and collect the offset table.
    let mut cursor = 0;
    let mut offsets = Vec::new();
    let mut layout = Vec::with_capacity(fields.len());
    for field in fields {
        match field.fixed_size() {
            Some(size) => {
                layout.push(Some(cursor..cursor + size));
                cursor += size;
            }
            None => {
                let offset = read_offset(data, cursor)?;
                if offsets.is_empty() && offset != fixed_len {
                    return Err(SszError::OffsetOutOfBounds {
                        offset,
                        len: data.len(),
                    });
                }
                offsets.push(offset);
                layout.push(None);
                cursor += BYTES_PER_LENGTH_OFFSET;
            }
        }
    }
    validate_offsets(&offsets, data.len())?;
    if offsets.is_empty() && data.len() != fixed_len {
        return Err(SszError::InvalidLength {
            expected: fixed_len,
            got: data.len(),
        });
    }

    // Second pass: decode each field from its slice.
    let mut variable_index = 0;
    fields
        .iter()
        .zip(layout)
        .map(|(field, range)| match range {
            Some(range) => decode(&data[range], field),
            None => {
                let start = offsets[variable_index];
                let end = offsets
                    .get(variable_index + 1)
                    .copied()
                    .unwrap_or(data.len());
                variable_index += 1;
                decode(&data[start..end], field)
            }
        })
        .collect()
}

fn read_offset(data: &[u8], at: usize) -> Result<usize, SszError> {
    let bytes = data
        .get(at..at + BYTES_PER_LENGTH_OFFSET)
        .ok_or(SszError::ExpectedFurtherInput)?;
    let offset = u32::from_le_bytes(bytes.try_into().expect("checked length")) as usize;
    if offset > data.len() {
        return Err(SszError::OffsetOutOfBounds {
            offset,
            len: data.len(),
        });
    }
    Ok(offset)
}

/// Reads the remaining offsets of a sequence table (the first is
/// already known) and checks monotonicity and bounds.
fn read_offsets(data: &[u8], count: usize, first: usize) -> Result<Vec<usize>, SszError> {
    let mut offsets = Vec::with_capacity(count);
    offsets.push(first);
    for i in 1..count {
        offsets.push(read_offset(data, i * BYTES_PER_LENGTH_OFFSET)?);
    }
    validate_offsets(&offsets, data.len())?;
    Ok(offsets)
}

fn validate_offsets(offsets: &[usize], len: usize) -> Result<(), SszError> {
    for pair in offsets.windows(2) {
        if pair[0] > pair[1] {
            return Err(SszError::InvalidOffsetRange {
                start: pair[0],
                end: pair[1],
            });
        }
    }
    if let Some(&last) = offsets.last() {
        if last > len {
            return Err(SszError::OffsetOutOfBounds { offset: last, len });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use alloc::vec;

    #[test]
    fn test_bool_roundtrip() {
        let desc = TypeDescriptor::Boolean;
        assert_eq!(encode(&Value::Bool(true), &desc), Ok(vec![1]));
        assert_eq!(encode(&Value::Bool(false), &desc), Ok(vec![0]));
        assert_eq!(decode(&[1], &desc), Ok(Value::Bool(true)));
        assert_eq!(decode(&[2], &desc), Err(SszError::InvalidBooleanByte));
        assert_eq!(
            decode(&[], &desc),
            Err(SszError::InvalidLength { expected: 1, got: 0 })
        );
    }

    #[test]
    fn test_uint_roundtrip() {
        let desc = TypeDescriptor::Uint { bytes: 2 };
        assert_eq!(encode(&Value::U16(300), &desc), Ok(vec![44, 1]));
        assert_eq!(decode(&[44, 1], &desc), Ok(Value::U16(300)));
        assert!(decode(&[1], &desc).is_err());

        let desc = TypeDescriptor::Uint { bytes: 32 };
        let value = Value::U256(U256::MAX);
        let encoded = encode(&value, &desc).expect("can encode");
        assert_eq!(encoded, vec![0xff; 32]);
        assert_eq!(decode(&encoded, &desc), Ok(value));
    }

    #[test]
    fn test_fixed_vector_roundtrip() {
        let desc = TypeDescriptor::vector(TypeDescriptor::uint64(), 3);
        let value = Value::Vector(vec![Value::U64(10), Value::U64(20), Value::U64(30)]);
        let encoded = encode(&value, &desc).expect("can encode");
        assert_eq!(encoded.len(), 24);
        assert_eq!(decode(&encoded, &desc), Ok(value));

        assert!(decode(&encoded[..16], &desc).is_err());
    }

    #[test]
    fn test_variable_list_offsets() {
        let desc = TypeDescriptor::list(TypeDescriptor::byte_list(16), 8);
        let value = Value::List(vec![
            Value::Bytes(vec![1, 2, 3]),
            Value::Bytes(vec![4, 5]),
            Value::Bytes(vec![6, 7, 8, 9]),
        ]);
        let encoded = encode(&value, &desc).expect("can encode");

        // Offset table: 3 entries of 4 bytes each.
        assert_eq!(u32::from_le_bytes(encoded[0..4].try_into().unwrap()), 12);
        assert_eq!(u32::from_le_bytes(encoded[4..8].try_into().unwrap()), 15);
        assert_eq!(u32::from_le_bytes(encoded[8..12].try_into().unwrap()), 17);
        assert_eq!(encoded.len(), 21);

        assert_eq!(decode(&encoded, &desc), Ok(value));
    }

    #[test]
    fn test_non_monotonic_offsets_rejected() {
        let desc = TypeDescriptor::list(TypeDescriptor::byte_list(16), 8);
        // Two-element table with the second offset before the first.
        let mut data = Vec::new();
        data.extend(8u32.to_le_bytes());
        data.extend(6u32.to_le_bytes());
        data.extend([0u8; 4]);
        assert_eq!(
            decode(&data, &desc),
            Err(SszError::InvalidOffsetRange { start: 8, end: 6 })
        );
    }

    #[test]
    fn test_offset_out_of_bounds_rejected() {
        let desc = TypeDescriptor::list(TypeDescriptor::byte_list(16), 8);
        let data = 64u32.to_le_bytes();
        assert!(matches!(
            decode(&data, &desc),
            Err(SszError::OffsetOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_list_limit_enforced() {
        let desc = TypeDescriptor::list(TypeDescriptor::uint16(), 2);
        let data = [1u8, 0, 2, 0, 3, 0];
        assert_eq!(
            decode(&data, &desc),
            Err(SszError::ExceedsLimit { limit: 2, got: 3 })
        );
    }

    #[test]
    fn test_bitlist_delimiter() {
        let desc = TypeDescriptor::bitlist(32);

        // Empty list is just the delimiter bit.
        let empty = encode(&Value::Bits(vec![]), &desc).expect("can encode");
        assert_eq!(empty, vec![1]);
        assert_eq!(decode(&empty, &desc), Ok(Value::Bits(vec![])));

        let bits = vec![false, false, false, true, true, false, false, false];
        let encoded = encode(&Value::Bits(bits.clone()), &desc).expect("can encode");
        assert_eq!(encoded, vec![24, 1]);
        assert_eq!(decode(&encoded, &desc), Ok(Value::Bits(bits)));

        // All-zero final byte means the delimiter is missing.
        assert_eq!(
            decode(&[24, 0], &desc),
            Err(SszError::ExpectedDelimiterBit)
        );
        assert_eq!(decode(&[], &desc), Err(SszError::ExpectedDelimiterBit));
    }

    #[test]
    fn test_bitlist_limit_enforced() {
        let desc = TypeDescriptor::bitlist(4);
        // 8 data bits plus the delimiter in a second byte.
        assert_eq!(
            decode(&[0xff, 1], &desc),
            Err(SszError::ExceedsLimit { limit: 4, got: 8 })
        );
    }

    #[test]
    fn test_bitvector_padding_checked() {
        let desc = TypeDescriptor::bitvector(3);
        assert_eq!(
            decode(&[0b0000_0101], &desc),
            Ok(Value::Bits(vec![true, false, true]))
        );
        // Bit 3 is past the declared length.
        assert_eq!(decode(&[0b0000_1101], &desc), Err(SszError::InvalidBitvector));
    }

    #[test]
    fn test_container_mixed_fields() {
        let desc = TypeDescriptor::container(&[
            ("count", TypeDescriptor::uint32()),
            ("data", TypeDescriptor::byte_list(8)),
            ("flag", TypeDescriptor::boolean()),
        ]);
        let value = Value::Container(vec![
            Value::U32(7),
            Value::Bytes(vec![0xaa, 0xbb]),
            Value::Bool(true),
        ]);
        let encoded = encode(&value, &desc).expect("can encode");

        // Fixed section: u32, one offset, bool. Variable section after.
        assert_eq!(encoded.len(), 4 + 4 + 1 + 2);
        assert_eq!(u32::from_le_bytes(encoded[4..8].try_into().unwrap()), 9);
        assert_eq!(decode(&encoded, &desc), Ok(value));
    }

    #[test]
    fn test_container_first_offset_checked() {
        let desc = TypeDescriptor::container(&[
            ("count", TypeDescriptor::uint32()),
            ("data", TypeDescriptor::byte_list(8)),
        ]);
        // First offset must equal the fixed-section length (8).
        let mut data = Vec::new();
        data.extend(7u32.to_le_bytes());
        data.extend(9u32.to_le_bytes());
        data.push(0xaa);
        assert!(matches!(
            decode(&data, &desc),
            Err(SszError::OffsetOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_fixed_container_exact_length() {
        let desc = TypeDescriptor::container(&[
            ("a", TypeDescriptor::uint32()),
            ("b", TypeDescriptor::uint8()),
        ]);
        let value = Value::Container(vec![Value::U32(12), Value::U8(6)]);
        let encoded = encode(&value, &desc).expect("can encode");
        assert_eq!(encoded, vec![12, 0, 0, 0, 6]);
        assert_eq!(decode(&encoded, &desc), Ok(value));
        assert!(decode(&[12, 0, 0, 0, 6, 0], &desc).is_err());
    }

    #[test]
    fn test_union_roundtrip() {
        let desc = TypeDescriptor::union(&[
            None,
            Some(TypeDescriptor::uint32()),
            Some(TypeDescriptor::byte_list(8)),
        ]);

        let none = Value::Union {
            selector: 0,
            value: None,
        };
        assert_eq!(encode(&none, &desc), Ok(vec![0]));
        assert_eq!(decode(&[0], &desc), Ok(none));

        let num = Value::Union {
            selector: 1,
            value: Some(Box::new(Value::U32(12))),
        };
        let encoded = encode(&num, &desc).expect("can encode");
        assert_eq!(encoded, vec![1, 12, 0, 0, 0]);
        assert_eq!(decode(&encoded, &desc), Ok(num));

        let bytes = Value::Union {
            selector: 2,
            value: Some(Box::new(Value::Bytes(vec![1, 2, 3]))),
        };
        let encoded = encode(&bytes, &desc).expect("can encode");
        assert_eq!(decode(&encoded, &desc), Ok(bytes));
    }

    #[test]
    fn test_union_selector_errors() {
        let desc = TypeDescriptor::union(&[None, Some(TypeDescriptor::uint32())]);
        assert!(matches!(
            decode(&[5], &desc),
            Err(SszError::InvalidSelector { .. })
        ));
        assert!(matches!(
            decode(&[200, 1], &desc),
            Err(SszError::InvalidSelector { .. })
        ));
        // The none-variant carries no payload.
        assert_eq!(
            decode(&[0, 1], &desc),
            Err(SszError::InvalidLength { expected: 0, got: 1 })
        );
        assert_eq!(decode(&[], &desc), Err(SszError::ExpectedFurtherInput));
    }

    #[test]
    fn test_stable_container_roundtrip() {
        let desc = TypeDescriptor::stable_container(
            &[
                ("a", TypeDescriptor::uint32()),
                ("b", TypeDescriptor::boolean()),
                ("c", TypeDescriptor::uint64()),
            ],
            4,
        );
        let value = Value::Stable(vec![Some(Value::U32(9)), None, Some(Value::U64(70))]);
        let encoded = encode(&value, &desc).expect("can encode");

        // Bitvector prefix: fields a and c active.
        assert_eq!(encoded[0], 0b0000_0101);
        assert_eq!(encoded.len(), 1 + 4 + 8);
        assert_eq!(decode(&encoded, &desc), Ok(value));
    }

    #[test]
    fn test_stable_container_ghost_bits_rejected() {
        let desc = TypeDescriptor::stable_container(&[("a", TypeDescriptor::uint8())], 4);
        // Bit 1 is set but the type declares a single field.
        assert_eq!(
            decode(&[0b0000_0011, 1, 2], &desc),
            Err(SszError::InvalidBitvector)
        );
    }

    #[test]
    fn test_progressive_list_roundtrip() {
        let desc = TypeDescriptor::progressive_list(TypeDescriptor::uint32());
        let value = Value::List(vec![
            Value::U32(0x11223344),
            Value::U32(0x55667788),
        ]);
        let encoded = encode(&value, &desc).expect("can encode");
        assert_eq!(encoded, vec![0x44, 0x33, 0x22, 0x11, 0x88, 0x77, 0x66, 0x55]);
        assert_eq!(decode(&encoded, &desc), Ok(value));
    }

    #[test]
    fn test_nested_roundtrip() {
        let inner = TypeDescriptor::container(&[
            ("id", TypeDescriptor::uint64()),
            ("tag", TypeDescriptor::byte_list(4)),
        ]);
        let desc = TypeDescriptor::list(inner, 4);
        let value = Value::List(vec![
            Value::Container(vec![Value::U64(1), Value::Bytes(vec![0xaa])]),
            Value::Container(vec![Value::U64(2), Value::Bytes(vec![])]),
        ]);
        let encoded = encode(&value, &desc).expect("can encode");
        assert_eq!(decode(&encoded, &desc), Ok(value));
    }
}
