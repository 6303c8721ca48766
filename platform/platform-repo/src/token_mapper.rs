//! # Token Mapper
//!
//! A fixed-capacity table of `(token, object)` pairs answering "which object
//! did this token stand for?" after the repository has been finalized.
//!
//! The mapper never owns object bytes. Each entry stores a caller-chosen
//! reference `D` to data that lives elsewhere: a borrowed slice (`&'a [u8]`)
//! when used standalone, or a span into the repository's grouped arrays when
//! used by [`DynamicPlatformRepository`](crate::DynamicPlatformRepository).
//! The owner of the data therefore outlives every entry by construction.
//!
//! Lookups are a linear scan. The table holds one entry per platform object,
//! which is tens of entries, and is queried a handful of times per boot.

use crate::descriptor::{CROSS_REF_SIZE, ObjectDescriptor};
use crate::error::RepoError;
use crate::object_id::{CM_REF, ObjectId};
use crate::token::Token;
use alloc::vec::Vec;

/// Reference to an object's bytes as stored in a [`TokenMapper`] entry.
pub trait ObjectData: Copy {
    /// Number of bytes the reference covers.
    fn byte_len(&self) -> usize;
}

impl ObjectData for &[u8] {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

/// One registered object.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TokenMapEntry<D> {
    token: Token,
    id: ObjectId,
    size: usize,
    count: usize,
    data: D,
}

impl<D: Copy> TokenMapEntry<D> {
    #[must_use]
    pub const fn token(&self) -> Token {
        self.token
    }

    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Payload size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of elements: `1`, or the number of cross-reference records
    /// for [`CM_REF`] objects.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// The stored data reference.
    #[must_use]
    pub const fn data(&self) -> D {
        self.data
    }
}

impl<'a> TokenMapEntry<&'a [u8]> {
    /// View the entry as an object descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> ObjectDescriptor<'a> {
        ObjectDescriptor {
            id: self.id,
            size: self.size,
            count: self.count,
            data: self.data,
        }
    }
}

#[derive(Debug)]
enum MapperState<D> {
    Uninitialized,
    /// Initialized with a capacity of zero; stays empty forever.
    Empty,
    Active {
        capacity: usize,
        entries: Vec<TokenMapEntry<D>>,
    },
    ShutDown,
}

/// Fixed-capacity `(token, identifier) → object` map.
///
/// # Lifecycle
/// [`initialize`](Self::initialize) exactly once, then
/// [`add_object`](Self::add_object) up to `capacity` times, then any number of
/// [`get_object`](Self::get_object) calls, then [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct TokenMapper<D> {
    state: MapperState<D>,
}

impl<D> Default for TokenMapper<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> TokenMapper<D> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: MapperState::Uninitialized,
        }
    }

    /// Reserve room for exactly `capacity` entries.
    ///
    /// A capacity of zero is legal and makes the mapper permanently empty.
    ///
    /// # Errors
    /// - [`RepoError::AlreadyStarted`] if the mapper was initialized before.
    /// - [`RepoError::OutOfResources`] if the entry table cannot be reserved.
    pub fn initialize(&mut self, capacity: usize) -> Result<(), RepoError> {
        if !matches!(self.state, MapperState::Uninitialized) {
            return Err(RepoError::AlreadyStarted);
        }

        if capacity == 0 {
            self.state = MapperState::Empty;
            return Ok(());
        }

        let mut entries = Vec::new();
        entries.try_reserve_exact(capacity)?;
        self.state = MapperState::Active { capacity, entries };
        Ok(())
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.state {
            MapperState::Active { entries, .. } => entries.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity set by [`initialize`](Self::initialize); `0` before that.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        match &self.state {
            MapperState::Active { capacity, .. } => *capacity,
            _ => 0,
        }
    }

    /// Whether [`initialize`](Self::initialize) succeeded and
    /// [`shutdown`](Self::shutdown) has not released the table since.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        matches!(
            self.state,
            MapperState::Empty | MapperState::Active { .. }
        )
    }

    /// Release the entry table.
    ///
    /// Repeating this is only allowed for a mapper initialized with capacity
    /// zero, which has nothing to release.
    ///
    /// # Errors
    /// [`RepoError::InvalidParameter`] if the mapper was never initialized or
    /// has already been shut down.
    pub fn shutdown(&mut self) -> Result<(), RepoError> {
        match self.state {
            MapperState::Empty => Ok(()),
            MapperState::Active { .. } => {
                self.state = MapperState::ShutDown;
                Ok(())
            }
            MapperState::Uninitialized | MapperState::ShutDown => {
                Err(RepoError::InvalidParameter)
            }
        }
    }
}

impl<D: ObjectData> TokenMapper<D> {
    /// Register the object `data` under `(token, id)`.
    ///
    /// `data` is stored as given; the mapper does not copy what it refers to.
    ///
    /// # Errors
    /// - [`RepoError::InvalidParameter`] if the mapper is not initialized (or
    ///   was initialized empty), `size` is zero or differs from the length of
    ///   `data`, `token` is [`Token::NULL`], or a [`CM_REF`] size is not a
    ///   whole number of records.
    /// - [`RepoError::BufferTooSmall`] if all `capacity` entries are in use.
    pub fn add_object(
        &mut self,
        token: Token,
        id: ObjectId,
        size: usize,
        data: D,
    ) -> Result<(), RepoError> {
        let MapperState::Active { capacity, entries } = &mut self.state else {
            return Err(RepoError::InvalidParameter);
        };

        if size == 0 || size != data.byte_len() || token.is_null() {
            return Err(RepoError::InvalidParameter);
        }

        let count = if id == CM_REF {
            if size % CROSS_REF_SIZE != 0 {
                return Err(RepoError::InvalidParameter);
            }
            size / CROSS_REF_SIZE
        } else {
            1
        };

        if entries.len() >= *capacity {
            return Err(RepoError::BufferTooSmall);
        }

        entries.push(TokenMapEntry {
            token,
            id,
            size,
            count,
            data,
        });
        Ok(())
    }

    /// Find the entry registered under both `token` and `id`.
    ///
    /// # Errors
    /// - [`RepoError::InvalidParameter`] if `token` is [`Token::NULL`] or the
    ///   mapper is not initialized.
    /// - [`RepoError::NotFound`] if no entry matches, including always for a
    ///   mapper initialized empty.
    pub fn get_object(&self, token: Token, id: ObjectId) -> Result<&TokenMapEntry<D>, RepoError> {
        if token.is_null() {
            return Err(RepoError::InvalidParameter);
        }

        match &self.state {
            MapperState::Empty => Err(RepoError::NotFound),
            MapperState::Active { entries, .. } => entries
                .iter()
                .find(|e| e.token == token && e.id == id)
                .ok_or(RepoError::NotFound),
            MapperState::Uninitialized | MapperState::ShutDown => {
                Err(RepoError::InvalidParameter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::encode_references;
    use crate::object_id::{ArmObjectType, RiscVObjectType};

    const GICC: ObjectId = ArmObjectType::GicCInfo.id();
    const PLIC: ObjectId = RiscVObjectType::PlicInfo.id();

    #[test]
    fn capacity_is_enforced() {
        let bytes = [0u8; 4];
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(2).unwrap();

        mapper.add_object(Token::new(1), GICC, 4, &bytes).unwrap();
        mapper.add_object(Token::new(2), GICC, 4, &bytes).unwrap();
        assert_eq!(
            mapper.add_object(Token::new(3), GICC, 4, &bytes),
            Err(RepoError::BufferTooSmall)
        );
        assert_eq!(mapper.len(), 2);
    }

    #[test]
    fn zero_capacity_mapper_is_a_no_op() {
        let bytes = [0u8; 4];
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(0).unwrap();

        assert_eq!(
            mapper.add_object(Token::new(1), GICC, 4, &bytes),
            Err(RepoError::InvalidParameter)
        );
        assert_eq!(
            mapper.get_object(Token::new(1), GICC).unwrap_err(),
            RepoError::NotFound
        );
        assert_eq!(mapper.shutdown(), Ok(()));
        assert_eq!(mapper.shutdown(), Ok(()));
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(1).unwrap();
        assert_eq!(mapper.initialize(1), Err(RepoError::AlreadyStarted));

        let mut empty = TokenMapper::<&[u8]>::new();
        empty.initialize(0).unwrap();
        assert_eq!(empty.initialize(4), Err(RepoError::AlreadyStarted));
    }

    #[test]
    fn uninitialized_mapper_rejects_everything() {
        let bytes = [0u8; 4];
        let mut mapper = TokenMapper::<&[u8]>::new();
        assert_eq!(
            mapper.add_object(Token::new(1), GICC, 4, &bytes),
            Err(RepoError::InvalidParameter)
        );
        assert_eq!(
            mapper.get_object(Token::new(1), GICC).unwrap_err(),
            RepoError::InvalidParameter
        );
        assert_eq!(mapper.shutdown(), Err(RepoError::InvalidParameter));
    }

    #[test]
    fn double_shutdown_is_rejected() {
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(3).unwrap();
        assert_eq!(mapper.shutdown(), Ok(()));
        assert_eq!(mapper.shutdown(), Err(RepoError::InvalidParameter));
        assert!(!mapper.is_initialized());
    }

    #[test]
    fn add_rejects_zero_size_and_null_token() {
        let bytes = [0u8; 4];
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(4).unwrap();
        assert_eq!(
            mapper.add_object(Token::new(1), GICC, 0, &bytes),
            Err(RepoError::InvalidParameter)
        );
        assert_eq!(
            mapper.add_object(Token::NULL, GICC, 4, &bytes),
            Err(RepoError::InvalidParameter)
        );
        assert!(mapper.is_empty());
    }

    #[test]
    fn size_must_match_the_data() {
        let bytes = [0u8; 4];
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(1).unwrap();
        assert_eq!(
            mapper.add_object(Token::new(1), GICC, 100, &bytes),
            Err(RepoError::InvalidParameter)
        );
        assert_eq!(
            mapper.add_object(Token::new(1), GICC, 3, &bytes),
            Err(RepoError::InvalidParameter)
        );
        assert!(mapper.is_empty());

        mapper.add_object(Token::new(1), GICC, 4, &bytes).unwrap();
        let d = mapper.get_object(Token::new(1), GICC).unwrap().descriptor();
        assert_eq!(d.size, d.data.len());
    }

    #[test]
    fn lookup_requires_token_and_identifier() {
        let a = [1u8; 4];
        let b = [2u8; 4];
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(2).unwrap();
        mapper.add_object(Token::new(7), GICC, 4, &a).unwrap();
        mapper.add_object(Token::new(7), PLIC, 4, &b).unwrap();

        assert_eq!(mapper.get_object(Token::new(7), GICC).unwrap().data(), &a);
        assert_eq!(mapper.get_object(Token::new(7), PLIC).unwrap().data(), &b);
        assert_eq!(
            mapper.get_object(Token::new(8), GICC).unwrap_err(),
            RepoError::NotFound
        );
        assert_eq!(
            mapper.get_object(Token::NULL, GICC).unwrap_err(),
            RepoError::InvalidParameter
        );
    }

    #[test]
    fn cross_reference_count_is_record_count() {
        let refs = encode_references(&[Token::new(10), Token::new(11), Token::new(12)]);
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(1).unwrap();
        mapper
            .add_object(Token::new(1), CM_REF, refs.len(), refs.as_slice())
            .unwrap();

        let d = mapper.get_object(Token::new(1), CM_REF).unwrap().descriptor();
        assert_eq!(d.count, 3);
        assert_eq!(d.size, 3 * CROSS_REF_SIZE);
        assert!(d.references().map(Token::as_u64).eq([10, 11, 12]));
    }

    #[test]
    fn cross_reference_size_must_be_whole_records() {
        let bytes = [0u8; 12];
        let mut mapper = TokenMapper::<&[u8]>::new();
        mapper.initialize(1).unwrap();
        assert_eq!(
            mapper.add_object(Token::new(1), CM_REF, 12, &bytes),
            Err(RepoError::InvalidParameter)
        );
    }
}
