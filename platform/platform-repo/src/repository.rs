//! # Dynamic Platform Repository
//!
//! The repository collects configuration-manager objects while the platform
//! is being described, then freezes them into one contiguous array per object
//! kind and answers queries over the frozen data.
//!
//! ```text
//!   Transient                         Finalized
//! ┌──────────────────────────┐      ┌────────────────────────────────────┐
//! │ per (namespace, type):   │      │ per (namespace, type):             │
//! │   [node] [node] [node]   │ ───▶ │   one grouped array                │
//! │ each node owns a copy    │      │ token mapper: token → span in array│
//! └──────────────────────────┘      └────────────────────────────────────┘
//!        add_object()       finalize()       get_object()
//! ```
//!
//! The transition is one-way. Adding after finalization and querying before it
//! are both [`RepoError::InvalidParameter`].

use crate::descriptor::{CROSS_REF_SIZE, ObjectDescriptor};
use crate::error::RepoError;
use crate::object_id::{CM_REF, Namespace, ObjectId};
use crate::self_token::fixup_self_token;
use crate::token::{Token, TokenGenerator};
use crate::token_mapper::{ObjectData, TokenMapper};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;
use log::{debug, error, info, warn};

/// Lifecycle phase of a [`DynamicPlatformRepository`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RepoState {
    /// Open for [`add_object`](DynamicPlatformRepository::add_object).
    Transient,
    /// Frozen; only [`get_object`](DynamicPlatformRepository::get_object) is allowed.
    Finalized,
}

/// An object accepted during the transient phase, owning a copy of its bytes.
#[derive(Debug)]
struct ObjectNode {
    id: ObjectId,
    token: Token,
    count: usize,
    data: Vec<u8>,
}

/// All objects of one kind, concatenated in insertion order.
#[derive(Debug, Default)]
struct GroupedArray {
    /// Number of nodes that went into the array (not elements: a
    /// cross-reference node contributes one, however many records it holds).
    count: usize,
    data: Box<[u8]>,
}

/// Location of one object inside a grouped array.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct GroupSpan {
    namespace: Namespace,
    object_type: u8,
    offset: usize,
    len: usize,
}

impl ObjectData for GroupSpan {
    fn byte_len(&self) -> usize {
        self.len
    }
}

/// Storage for one namespace, indexed by type id.
#[derive(Debug)]
struct NamespaceTable {
    namespace: Namespace,
    lists: Vec<Vec<ObjectNode>>,
    groups: Vec<GroupedArray>,
}

impl NamespaceTable {
    fn new(namespace: Namespace) -> Result<Self, RepoError> {
        let type_count = usize::from(namespace.type_count());
        let mut lists = Vec::new();
        lists.try_reserve_exact(type_count)?;
        lists.resize_with(type_count, Vec::new);
        Ok(Self {
            namespace,
            lists,
            groups: Vec::new(),
        })
    }

    fn pending(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    /// Group every type list in ascending type order.
    ///
    /// Returns the number of non-empty groups. Stops at the first failing
    /// type; types grouped before it stay grouped.
    fn group_all(&mut self, mapper: &mut TokenMapper<GroupSpan>) -> Result<usize, RepoError> {
        self.groups.try_reserve_exact(self.lists.len())?;

        let mut populated = 0;
        for (object_type, list) in (0..=u8::MAX).zip(self.lists.iter_mut()) {
            let group = group_list(self.namespace, object_type, list, mapper)?;
            if group.count != 0 {
                populated += 1;
            }
            self.groups.push(group);
        }
        Ok(populated)
    }

    fn group(&self, object_type: u8) -> Option<&GroupedArray> {
        self.groups.get(usize::from(object_type))
    }
}

/// Turn one type list into a grouped array and register every node with the
/// token mapper.
///
/// On success the list is emptied; the node copies are released once their
/// bytes have been copied into the array.
fn group_list(
    namespace: Namespace,
    object_type: u8,
    list: &mut Vec<ObjectNode>,
    mapper: &mut TokenMapper<GroupSpan>,
) -> Result<GroupedArray, RepoError> {
    let expected = ObjectId::from_parts(namespace, object_type);
    let multi_element = expected == CM_REF;

    let mut total = 0usize;
    for node in list.iter() {
        if node.id != expected {
            error!("object {} found in the list for {expected}", node.id);
            return Err(RepoError::InvalidParameter);
        }
        if node.count != 1 && !multi_element {
            error!(
                "object {expected} (token {}) has {} elements; only cross-references may have more than one",
                node.token, node.count
            );
            return Err(RepoError::InvalidParameter);
        }
        total = total
            .checked_add(node.data.len())
            .ok_or(RepoError::OutOfResources)?;
    }

    if list.is_empty() {
        return Ok(GroupedArray::default());
    }

    let mut buffer = Vec::new();
    buffer.try_reserve_exact(total)?;
    for node in list.iter() {
        let span = GroupSpan {
            namespace,
            object_type,
            offset: buffer.len(),
            len: node.data.len(),
        };
        buffer.extend_from_slice(&node.data);
        mapper.add_object(node.token, node.id, node.data.len(), span)?;
    }

    let count = list.len();
    drop(mem::take(list));
    Ok(GroupedArray {
        count,
        data: buffer.into_boxed_slice(),
    })
}

/// Two-phase store of platform configuration objects.
///
/// # Example
/// ```rust
/// use platform_repo::{ArmObjectType, DynamicPlatformRepository, ObjectDescriptor};
///
/// let mut repo = DynamicPlatformRepository::new().unwrap();
/// let gicc = ArmObjectType::GicCInfo.id();
/// let token = repo.add_object(&ObjectDescriptor::single(gicc, &[1, 2, 3, 4])).unwrap();
/// repo.finalize().unwrap();
///
/// let all = repo.get_object(gicc, None).unwrap();
/// assert_eq!(all.count, 1);
/// let one = repo.get_object(gicc, Some(token)).unwrap();
/// assert_eq!(one.data, &[1, 2, 3, 4]);
/// repo.shutdown().unwrap();
/// ```
#[derive(Debug)]
pub struct DynamicPlatformRepository {
    state: RepoState,
    tokens: TokenGenerator,
    object_count: usize,
    arm: NamespaceTable,
    riscv: NamespaceTable,
    arch_common: NamespaceTable,
    mapper: TokenMapper<GroupSpan>,
}

impl DynamicPlatformRepository {
    /// Create an empty repository in the [`RepoState::Transient`] phase.
    ///
    /// # Errors
    /// [`RepoError::OutOfResources`] if the per-type tables cannot be allocated.
    pub fn new() -> Result<Self, RepoError> {
        Ok(Self {
            state: RepoState::Transient,
            tokens: TokenGenerator::new(),
            object_count: 0,
            arm: NamespaceTable::new(Namespace::Arm)?,
            riscv: NamespaceTable::new(Namespace::RiscV)?,
            arch_common: NamespaceTable::new(Namespace::ArchCommon)?,
            mapper: TokenMapper::new(),
        })
    }

    #[must_use]
    pub const fn state(&self) -> RepoState {
        self.state
    }

    /// Number of objects accepted by [`add_object`](Self::add_object).
    #[must_use]
    pub const fn object_count(&self) -> usize {
        self.object_count
    }

    const fn table(&self, namespace: Namespace) -> &NamespaceTable {
        match namespace {
            Namespace::Arm => &self.arm,
            Namespace::RiscV => &self.riscv,
            Namespace::ArchCommon => &self.arch_common,
        }
    }

    const fn table_mut(&mut self, namespace: Namespace) -> &mut NamespaceTable {
        match namespace {
            Namespace::Arm => &mut self.arm,
            Namespace::RiscV => &mut self.riscv,
            Namespace::ArchCommon => &mut self.arch_common,
        }
    }

    /// Split `id` into a known namespace and an in-range type id.
    fn resolve(id: ObjectId) -> Result<(Namespace, u8), RepoError> {
        let Some((namespace, object_type)) = id.split() else {
            warn!("object id {id} has an unknown namespace or reserved bits set");
            return Err(RepoError::InvalidParameter);
        };
        if object_type >= namespace.type_count() {
            warn!(
                "type id {object_type} is out of range for {namespace:?} (max {})",
                namespace.type_count()
            );
            return Err(RepoError::InvalidParameter);
        }
        Ok((namespace, object_type))
    }

    /// Copy the object described by `desc` into the repository.
    ///
    /// Returns the token minted for it. For Arm kinds that embed their own
    /// token the copy is patched with it (see [`fixup_self_token`]); the
    /// caller's bytes are never modified.
    ///
    /// # Errors
    /// - [`RepoError::InvalidParameter`] if the repository is finalized,
    ///   `size` or `count` is zero, `size` does not match the payload, the
    ///   identifier is unknown or out of range, or an architecture-common
    ///   object other than a cross-reference array has more than one element.
    /// - [`RepoError::Unsupported`] from the self-token fix-up.
    /// - [`RepoError::OutOfResources`] if the copy cannot be allocated.
    ///
    /// Nothing is stored on error.
    pub fn add_object(&mut self, desc: &ObjectDescriptor<'_>) -> Result<Token, RepoError> {
        if self.state != RepoState::Transient {
            warn!("add_object on a finalized repository");
            return Err(RepoError::InvalidParameter);
        }

        if desc.size == 0 || desc.count == 0 || desc.data.len() != desc.size {
            return Err(RepoError::InvalidParameter);
        }

        let (namespace, object_type) = Self::resolve(desc.id)?;
        if namespace == Namespace::ArchCommon && desc.count > 1 && desc.id != CM_REF {
            return Err(RepoError::InvalidParameter);
        }
        if desc.id == CM_REF && desc.count.checked_mul(CROSS_REF_SIZE) != Some(desc.size) {
            return Err(RepoError::InvalidParameter);
        }

        let token = self.tokens.generate();

        let mut data = Vec::new();
        data.try_reserve_exact(desc.size)?;
        data.extend_from_slice(desc.data);

        if namespace == Namespace::Arm {
            fixup_self_token(desc.id, &mut data, token)?;
        }

        let list = &mut self.table_mut(namespace).lists[usize::from(object_type)];
        list.try_reserve(1)?;
        list.push(ObjectNode {
            id: desc.id,
            token,
            count: desc.count,
            data,
        });
        self.object_count += 1;

        debug!(
            "added {} token={token} size={} count={}",
            desc.id, desc.size, desc.count
        );
        Ok(token)
    }

    /// Freeze the repository.
    ///
    /// Every type list is grouped in a fixed order (Arm, RISC-V, then
    /// architecture-common; ascending type ids within each), and every object
    /// is registered with the token mapper.
    ///
    /// The repository is finalized even if grouping fails. In that case the
    /// token mapper is shut down, types grouped before the failure remain
    /// queryable without a token, and the error is returned. This is a fatal
    /// platform description error; there is no retry.
    ///
    /// # Errors
    /// - [`RepoError::InvalidParameter`] if the repository is already
    ///   finalized, or a non-cross-reference object has more than one element.
    /// - [`RepoError::OutOfResources`] if a grouped array cannot be allocated.
    /// - Any error from [`TokenMapper::initialize`] or [`TokenMapper::add_object`].
    pub fn finalize(&mut self) -> Result<(), RepoError> {
        if self.state != RepoState::Transient {
            warn!("finalize on a finalized repository");
            return Err(RepoError::InvalidParameter);
        }
        self.state = RepoState::Finalized;

        self.mapper.initialize(self.object_count)?;

        let mut populated = 0;
        for namespace in Namespace::GROUPING_ORDER {
            let table = match namespace {
                Namespace::Arm => &mut self.arm,
                Namespace::RiscV => &mut self.riscv,
                Namespace::ArchCommon => &mut self.arch_common,
            };
            match table.group_all(&mut self.mapper) {
                Ok(n) => populated += n,
                Err(e) => {
                    error!("finalize aborted while grouping {namespace:?}: {e}");
                    if let Err(e) = self.mapper.shutdown() {
                        error!("token mapper shutdown failed: {e}");
                    }
                    return Err(e);
                }
            }
        }

        info!(
            "platform repository finalized: {} objects in {populated} groups",
            self.object_count
        );
        Ok(())
    }

    /// Look up frozen objects of kind `id`.
    ///
    /// With a token (other than [`Token::NULL`]) the single object registered
    /// under that token and identifier is returned; its `count` is the number
    /// of elements in that object. Without one, the whole grouped array of
    /// the kind is returned; its `count` is the number of objects added.
    ///
    /// # Errors
    /// - [`RepoError::InvalidParameter`] if the repository is not finalized,
    ///   the identifier is unknown or out of range, a cross-reference array
    ///   is requested without a token, or finalization failed before the
    ///   token mapper was populated.
    /// - [`RepoError::NotFound`] if nothing of that kind (or with that token)
    ///   was added.
    pub fn get_object(
        &self,
        id: ObjectId,
        token: Option<Token>,
    ) -> Result<ObjectDescriptor<'_>, RepoError> {
        if self.state != RepoState::Finalized {
            warn!("get_object on a repository that is not finalized");
            return Err(RepoError::InvalidParameter);
        }

        let (namespace, object_type) = Self::resolve(id)?;

        if let Some(token) = token.and_then(Token::non_null) {
            let entry = self.mapper.get_object(token, id)?;
            let data = self.span(entry.data()).ok_or(RepoError::NotFound)?;
            return Ok(ObjectDescriptor {
                id,
                size: entry.size(),
                count: entry.count(),
                data,
            });
        }

        if id == CM_REF {
            warn!("cross-reference arrays can only be queried by token");
            return Err(RepoError::InvalidParameter);
        }

        let group = self
            .table(namespace)
            .group(object_type)
            .filter(|g| g.count != 0)
            .ok_or(RepoError::NotFound)?;
        Ok(ObjectDescriptor {
            id,
            size: group.data.len(),
            count: group.count,
            data: &group.data,
        })
    }

    fn span(&self, span: GroupSpan) -> Option<&[u8]> {
        let group = self.table(span.namespace).group(span.object_type)?;
        group.data.get(span.offset..span.offset.checked_add(span.len)?)
    }

    /// Release all storage.
    ///
    /// Legal in either phase. Objects still waiting in type lists (because the
    /// repository was never finalized, or finalization failed) are released
    /// as well.
    ///
    /// # Errors
    /// Propagates a failure to shut down the token mapper.
    pub fn shutdown(mut self) -> Result<(), RepoError> {
        let pending: usize = Namespace::GROUPING_ORDER
            .iter()
            .map(|&ns| self.table(ns).pending())
            .sum();
        if pending != 0 {
            debug!("releasing {pending} ungrouped objects");
        }

        if self.mapper.is_initialized() {
            self.mapper.shutdown()?;
        }
        Ok(())
    }
}
