//! Contains all the constants required for the ssz implementation.

/// Number of bytes per chunk.
pub const BYTES_PER_CHUNK: usize = 32;
/// Number of bytes per serialized length offset.
pub const BYTES_PER_LENGTH_OFFSET: usize = 4;
/// Number of bits per byte.
pub const BITS_PER_BYTE: usize = 8;
/// Number of bits packed into one chunk.
pub const BITS_PER_CHUNK: usize = BYTES_PER_CHUNK * BITS_PER_BYTE;
/// Bytes per U256.
pub const BYTES: usize = 32;
/// Highest union selector that is not reserved for forward compatibility.
pub const MAX_UNION_SELECTOR: u8 = 127;
