//! Error variants for SSZ.

use alloc::string::String;
use alloy_primitives::B256;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SszError {
    #[error("Invalid length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid byte for boolean deserialization")]
    InvalidBooleanByte,

    #[error("Offset {offset} out of bounds for data length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("Invalid offset range: start {start} is greater than end {end}")]
    InvalidOffsetRange { start: usize, end: usize },

    #[error("Expected delimiter bit not found")]
    ExpectedDelimiterBit,

    #[error("Invalid Chunk Count: limit {limit}, got {count}")]
    ChunkCountExceedsLimit { count: usize, limit: usize },

    #[error("Length {got} exceeds limit {limit}")]
    ExceedsLimit { limit: usize, got: usize },

    #[error("{reason} for {selector}")]
    InvalidSelector { reason: String, selector: usize },

    #[error("Invalid bitvector padding")]
    InvalidBitvector,

    #[error("Expected further input")]
    ExpectedFurtherInput,

    #[error("Value of kind {got} cannot be coerced to {expected}")]
    TypeMismatch { expected: String, got: String },

    #[error("Cannot navigate past a leaf node")]
    NavigationPastLeaf,

    #[error("Invalid generalized index {gindex}")]
    InvalidGindex { gindex: u64 },

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Unknown field: {name}")]
    UnknownField { name: String },

    #[error("Invalid path segment: {segment}")]
    InvalidPath { segment: String },

    #[error("Subtree is not resolved")]
    UnresolvedSubtree,

    #[error("Inconsistent roots: {left} != {right}")]
    InconsistentRoots { left: B256, right: B256 },

    #[error("Virtual source failure: {0}")]
    SourceFailure(String),
}
