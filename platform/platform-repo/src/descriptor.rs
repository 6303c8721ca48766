//! # Object Descriptors
//!
//! A descriptor is a view over one or more fixed-layout elements of a single
//! object kind. The repository copies the bytes on
//! [`add_object`](crate::DynamicPlatformRepository::add_object) and hands out
//! descriptors that borrow from its own storage after finalization.

use crate::object_id::{CM_REF, ObjectId};
use crate::token::Token;
use alloc::vec::Vec;

/// Size in bytes of one cross-reference record (a single little-endian token).
pub const CROSS_REF_SIZE: usize = size_of::<u64>();

/// Borrowed view of one object, or of a group of objects of the same kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor<'a> {
    /// Composite identifier of the object kind.
    pub id: ObjectId,
    /// Total payload size in bytes.
    pub size: usize,
    /// Number of elements in `data`.
    pub count: usize,
    /// Payload bytes; `data.len() == size`.
    pub data: &'a [u8],
}

impl<'a> ObjectDescriptor<'a> {
    /// Describe a single object occupying all of `data`.
    #[must_use]
    pub const fn single(id: ObjectId, data: &'a [u8]) -> Self {
        Self {
            id,
            size: data.len(),
            count: 1,
            data,
        }
    }

    /// Describe an array of `count` elements occupying all of `data`.
    #[must_use]
    pub const fn array(id: ObjectId, count: usize, data: &'a [u8]) -> Self {
        Self {
            id,
            size: data.len(),
            count,
            data,
        }
    }

    /// Describe a cross-reference array over `data`, as built by
    /// [`encode_references`].
    #[must_use]
    pub const fn references_of(data: &'a [u8]) -> Self {
        Self::array(CM_REF, data.len() / CROSS_REF_SIZE, data)
    }

    /// Iterate over the elements, assuming they all have the same size.
    ///
    /// Yields nothing if `count` is zero or does not divide `data`.
    pub fn elements(&self) -> impl Iterator<Item = &'a [u8]> + use<'a> {
        let data = self.data;
        let stride = match self.count {
            0 => 0,
            n if data.len() % n == 0 => data.len() / n,
            _ => 0,
        };
        let chunks = if stride == 0 { &data[..0] } else { data };
        chunks.chunks_exact(stride.max(1))
    }

    /// Decode the payload as cross-reference records.
    ///
    /// Trailing bytes that do not form a whole record are ignored.
    pub fn references(&self) -> impl Iterator<Item = Token> + use<'a> {
        self.data.chunks_exact(CROSS_REF_SIZE).map(|chunk| {
            let mut raw = [0u8; CROSS_REF_SIZE];
            raw.copy_from_slice(chunk);
            Token::new(u64::from_le_bytes(raw))
        })
    }
}

/// Encode `tokens` as a cross-reference payload.
#[must_use]
pub fn encode_references(tokens: &[Token]) -> Vec<u8> {
    tokens
        .iter()
        .flat_map(|t| t.as_u64().to_le_bytes())
        .collect()
}
