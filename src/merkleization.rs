//! SSZ Merkleization helper functions.
//!
//! Chunk-level helpers plus the flat [`hash_tree_root`] over a value
//! and its descriptor. The tree-backed root computed through
//! [`crate::view::View::hash_tree_root`] agrees with the flat
//! computation for every valid value.

use crate::constants::{BITS_PER_BYTE, BITS_PER_CHUNK, BYTES_PER_CHUNK};
use crate::descriptor::TypeDescriptor;
use crate::error::SszError;
use crate::value::Value;
use alloc::vec::Vec;
use alloy_primitives::B256;
use sha2::{Digest, Sha256};

/// Returns the next power of two >= i. 0 → 1
pub fn next_pow_of_two(i: usize) -> usize {
    if i == 0 {
        1
    } else {
        1 << (usize::BITS - (i - 1).leading_zeros())
    }
}

/// Returns `ceil(log2(i))`. 0 and 1 → 0
pub fn log2_ceil(i: usize) -> usize {
    next_pow_of_two(i).trailing_zeros() as usize
}

/// Hashes the concatenation of two 32-byte roots.
pub fn hash_concat(left: &B256, right: &B256) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(left.as_slice());
    hasher.update(right.as_slice());
    B256::from_slice(&hasher.finalize())
}

/// Packs serialized basic values into 32-byte chunks with right-padding.
pub fn pack(bytes: &[u8]) -> Vec<[u8; BYTES_PER_CHUNK]> {
    let mut out = Vec::new();
    for chunk in bytes.chunks(BYTES_PER_CHUNK) {
        let mut chunk_buf = [0u8; BYTES_PER_CHUNK];
        chunk_buf[..chunk.len()].copy_from_slice(chunk);
        out.push(chunk_buf);
    }
    out
}

/// Packs bits into 32-byte chunks, little-endian within each byte. The
/// bitlist delimiter bit is never part of the input here.
pub fn pack_bits(bits: &[bool]) -> Vec<[u8; BYTES_PER_CHUNK]> {
    let mut bytes = alloc::vec![0u8; bits.len().div_ceil(BITS_PER_BYTE)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / BITS_PER_BYTE] |= 1 << (i % BITS_PER_BYTE);
        }
    }
    pack(&bytes)
}

/// Zero-subtree roots by depth: entry 0 is the all-zero chunk, entry
/// `d` the root of a fully zero tree of depth `d`.
pub fn zero_hashes(depth: usize) -> Vec<B256> {
    let mut table = Vec::with_capacity(depth + 1);
    table.push(B256::ZERO);
    for d in 0..depth {
        let prev = table[d];
        table.push(hash_concat(&prev, &prev));
    }
    table
}

/// Merkleize a list of 32-byte chunks.
/// Optionally apply a chunk count limit (e.g., for lists or bitlists).
pub fn merkleize(
    chunks: &[[u8; BYTES_PER_CHUNK]],
    limit: Option<usize>,
) -> Result<B256, SszError> {
    if let Some(limit) = limit {
        if chunks.len() > limit {
            return Err(SszError::ChunkCountExceedsLimit {
                limit,
                count: chunks.len(),
            });
        }
    }

    let padded_len = match limit {
        Some(l) => next_pow_of_two(l),
        None => next_pow_of_two(chunks.len()),
    };

    if padded_len == 1 {
        let chunk = chunks.first().copied().unwrap_or([0u8; BYTES_PER_CHUNK]);
        return Ok(B256::from(chunk));
    }

    // Fold layer by layer; unfilled positions on the right of each
    // layer are zero subtrees of the corresponding depth.
    let zeros = zero_hashes(log2_ceil(padded_len));
    let mut layer: Vec<B256> = chunks.iter().map(|c| B256::from(*c)).collect();
    let mut width = padded_len;
    let mut depth = 0;
    while width > 1 {
        let mut next_layer = Vec::with_capacity(layer.len().div_ceil(2));
        for pair in layer.chunks(2) {
            let left = &pair[0];
            let right = if pair.len() == 2 { &pair[1] } else { &zeros[depth] };
            next_layer.push(hash_concat(left, right));
        }
        layer = next_layer;
        width /= 2;
        depth += 1;
    }

    Ok(layer.first().copied().unwrap_or(zeros[depth]))
}

/// Merkleize chunks of a progressive list: subtree sizes grow by 4x
/// per level, the balanced group sits on the right and the remainder
/// recurses on the left. Empty input is the zero chunk.
pub fn merkleize_progressive(
    chunks: &[[u8; BYTES_PER_CHUNK]],
    base: usize,
) -> Result<B256, SszError> {
    if chunks.is_empty() {
        return Ok(B256::ZERO);
    }
    let take = chunks.len().min(base);
    let right = merkleize(&chunks[..take], Some(base))?;
    let left = merkleize_progressive(&chunks[take..], base * 4)?;
    Ok(hash_concat(&left, &right))
}

/// Mix in length into a Merkle root (used for lists and bitlists).
pub fn mix_in_length(root: B256, len: usize) -> B256 {
    let mut len_bytes = [0u8; BYTES_PER_CHUNK];
    len_bytes[..8].copy_from_slice(&(len as u64).to_le_bytes());
    hash_concat(&root, &B256::from(len_bytes))
}

/// Mix in selector (used for unions)
pub fn mix_in_selector(root: B256, selector: usize) -> B256 {
    let mut sel_bytes = [0u8; BYTES_PER_CHUNK];
    sel_bytes[..8].copy_from_slice(&(selector as u64).to_le_bytes());
    hash_concat(&root, &B256::from(sel_bytes))
}

/// Mix in an auxiliary root (used for stable container active-field
/// bitvectors).
pub fn mix_in_aux(root: B256, aux: B256) -> B256 {
    hash_concat(&root, &aux)
}

/// Content chunks of a value: packed wire bytes for basic-element
/// shapes, one hash-tree-root chunk per element otherwise.
fn value_chunks(
    values: &[Value],
    element: &TypeDescriptor,
) -> Result<Vec<[u8; BYTES_PER_CHUNK]>, SszError> {
    if element.is_basic() {
        let mut bytes = Vec::new();
        for value in values {
            let le = value
                .basic_le_bytes()
                .ok_or_else(|| SszError::TypeMismatch {
                    expected: alloc::string::String::from("basic value"),
                    got: alloc::string::String::from(value.kind()),
                })?;
            bytes.extend(le);
        }
        Ok(pack(&bytes))
    } else {
        values
            .iter()
            .map(|v| hash_tree_root(v, element).map(|root| root.0))
            .collect()
    }
}

/// Calculates the hash tree root of `value` as described by `desc`,
/// chunk-wise without building a backing tree.
pub fn hash_tree_root(value: &Value, desc: &TypeDescriptor) -> Result<B256, SszError> {
    let value = value.coerce(desc)?;
    match (desc, &value) {
        (TypeDescriptor::Boolean | TypeDescriptor::Uint { .. }, v) => {
            let bytes = v.basic_le_bytes().expect("coerced basic value");
            let mut chunk = [0u8; BYTES_PER_CHUNK];
            chunk[..bytes.len()].copy_from_slice(&bytes);
            Ok(B256::from(chunk))
        }
        (TypeDescriptor::Bitvector { .. }, Value::Bits(bits)) => {
            merkleize(&pack_bits(bits), Some(desc.chunk_count()))
        }
        (TypeDescriptor::Bitlist { .. }, Value::Bits(bits)) => {
            let root = merkleize(&pack_bits(bits), Some(desc.chunk_count()))?;
            Ok(mix_in_length(root, bits.len()))
        }
        (TypeDescriptor::ByteVector { .. }, Value::Bytes(bytes)) => {
            merkleize(&pack(bytes), Some(desc.chunk_count()))
        }
        (TypeDescriptor::ByteList { .. }, Value::Bytes(bytes)) => {
            let root = merkleize(&pack(bytes), Some(desc.chunk_count()))?;
            Ok(mix_in_length(root, bytes.len()))
        }
        (TypeDescriptor::Vector { element, .. }, Value::Vector(elems)) => {
            merkleize(&value_chunks(elems, element)?, Some(desc.chunk_count()))
        }
        (TypeDescriptor::List { element, .. }, Value::List(elems)) => {
            let root = merkleize(&value_chunks(elems, element)?, Some(desc.chunk_count()))?;
            Ok(mix_in_length(root, elems.len()))
        }
        (TypeDescriptor::ProgressiveList { element }, Value::List(elems)) => {
            let root = merkleize_progressive(&value_chunks(elems, element)?, 1)?;
            Ok(mix_in_length(root, elems.len()))
        }
        (TypeDescriptor::Container { fields }, Value::Container(values)) => {
            let chunks = values
                .iter()
                .zip(fields.iter())
                .map(|(v, (_, f))| hash_tree_root(v, f).map(|root| root.0))
                .collect::<Result<Vec<_>, _>>()?;
            merkleize(&chunks, Some(desc.chunk_count()))
        }
        (TypeDescriptor::StableContainer { fields, capacity }, Value::Stable(values)) => {
            let mut chunks = Vec::with_capacity(fields.len());
            let mut active = alloc::vec![false; *capacity];
            for (i, (v, (_, f))) in values.iter().zip(fields.iter()).enumerate() {
                match v {
                    Some(v) => {
                        chunks.push(hash_tree_root(v, f)?.0);
                        active[i] = true;
                    }
                    None => chunks.push([0u8; BYTES_PER_CHUNK]),
                }
            }
            let content = merkleize(&chunks, Some(*capacity))?;
            let bits = merkleize(
                &pack_bits(&active),
                Some(capacity.div_ceil(BITS_PER_CHUNK).max(1)),
            )?;
            Ok(mix_in_aux(content, bits))
        }
        (TypeDescriptor::Union { variants }, Value::Union { selector, value }) => {
            match value {
                None => Ok(mix_in_selector(B256::ZERO, *selector as usize)),
                Some(inner) => {
                    let variant = variants[*selector as usize]
                        .as_ref()
                        .expect("coerced union value");
                    let root = hash_tree_root(inner, variant)?;
                    Ok(mix_in_selector(root, *selector as usize))
                }
            }
        }
        _ => unreachable!("coerce returns a value matching the descriptor"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use alloc::vec;
    use alloy_primitives::hex;

    #[test]
    fn test_next_pow_of_two() {
        assert_eq!(next_pow_of_two(0), 1);
        assert_eq!(next_pow_of_two(1), 1);
        assert_eq!(next_pow_of_two(3), 4);
        assert_eq!(next_pow_of_two(4), 4);
        assert_eq!(next_pow_of_two(5), 8);
    }

    #[test]
    fn test_log2_ceil() {
        assert_eq!(log2_ceil(0), 0);
        assert_eq!(log2_ceil(1), 0);
        assert_eq!(log2_ceil(2), 1);
        assert_eq!(log2_ceil(5), 3);
    }

    #[test]
    fn test_pack() {
        let chunks = pack(&[1u8, 2, 3]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(&chunks[0][..3], &[1, 2, 3]);
        assert_eq!(chunks[0][3], 0);

        let chunks = pack(&[0u8; 33]);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_zero_hashes_match_merkleize() {
        let zeros = zero_hashes(3);
        assert_eq!(zeros[0], B256::ZERO);
        for depth in 1..=3 {
            let root = merkleize(&[], Some(1 << depth)).expect("zero tree");
            assert_eq!(root, zeros[depth], "depth {depth}");
        }
    }

    #[test]
    fn test_single_chunk_identity() {
        let mut chunk = [0u8; 32];
        chunk[0] = 0xaa;
        let root = merkleize(&[chunk], None).expect("single chunk");
        assert_eq!(root, B256::from(chunk));
    }

    #[test]
    fn test_merkleize_exceeds_limit() {
        let chunks = [[0u8; 32]; 3];
        let result = merkleize(&chunks, Some(2));
        assert_eq!(
            result,
            Err(SszError::ChunkCountExceedsLimit { limit: 2, count: 3 })
        );
    }

    #[test]
    fn test_mix_in_length() {
        // hash(zero_chunk || uint256_le(5))
        let mixed = mix_in_length(B256::ZERO, 5);
        let mut len_chunk = [0u8; 32];
        len_chunk[0] = 5;
        assert_eq!(mixed, hash_concat(&B256::ZERO, &B256::from(len_chunk)));
    }

    #[test]
    fn test_uint_root_is_padded_chunk() {
        let root = hash_tree_root(&Value::U64(0xff00ff), &TypeDescriptor::Uint { bytes: 8 })
            .expect("uint root");
        let mut expected = [0u8; 32];
        expected[..8].copy_from_slice(&0xff00ffu64.to_le_bytes());
        assert_eq!(root, B256::from(expected));
    }

    #[test]
    fn test_vector_u16_root_single_chunk() {
        // 8 u16 values pack into exactly one chunk, so the root is the
        // chunk itself.
        let desc = TypeDescriptor::vector(TypeDescriptor::uint16(), 8);
        let value = Value::Vector((1u16..=8).map(Value::U16).collect());
        let root = hash_tree_root(&value, &desc).expect("vector root");
        assert_eq!(
            root,
            B256::from(hex!(
                "0100020003000400050006000700080000000000000000000000000000000000"
            ))
        );
    }

    #[test]
    fn test_list_root_mixes_length() {
        let desc = TypeDescriptor::list(TypeDescriptor::uint8(), 64);
        let value = Value::List(vec![Value::U8(1), Value::U8(2), Value::U8(3), Value::U8(4)]);
        let root = hash_tree_root(&value, &desc).expect("list root");

        let content = merkleize(&pack(&[1, 2, 3, 4]), Some(2)).expect("content");
        assert_eq!(root, mix_in_length(content, 4));
    }

    #[test]
    fn test_progressive_empty_and_single() {
        let desc = TypeDescriptor::progressive_list(TypeDescriptor::uint8());
        let empty = hash_tree_root(&Value::List(vec![]), &desc).expect("empty root");
        assert_eq!(empty, mix_in_length(B256::ZERO, 0));

        let one = hash_tree_root(&Value::List(vec![Value::U8(7)]), &desc).expect("one root");
        let mut chunk = [0u8; 32];
        chunk[0] = 7;
        let content = hash_concat(&B256::ZERO, &B256::from(chunk));
        assert_eq!(one, mix_in_length(content, 1));
    }

    #[test]
    fn test_progressive_spills_into_second_group() {
        // 33 bytes is two chunks: the first fills the size-1 group and
        // the second lands in the size-4 group on the next level.
        let desc = TypeDescriptor::progressive_list(TypeDescriptor::uint8());
        let value = Value::List((0..33u8).map(Value::U8).collect());
        let root = hash_tree_root(&value, &desc).expect("root");

        let chunks = pack(&(0..33u8).collect::<Vec<_>>());
        let level1 = merkleize(&chunks[1..], Some(4)).expect("group of 4");
        let left = hash_concat(&B256::ZERO, &level1);
        let content = hash_concat(&left, &B256::from(chunks[0]));
        assert_eq!(root, mix_in_length(content, 33));
    }

    #[test]
    fn test_union_none_root() {
        let desc = TypeDescriptor::union(&[None, Some(TypeDescriptor::uint32())]);
        let root = hash_tree_root(
            &Value::Union {
                selector: 0,
                value: None,
            },
            &desc,
        )
        .expect("none root");
        assert_eq!(root, mix_in_selector(B256::ZERO, 0));
    }
}
