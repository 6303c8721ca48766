//! # Repository Errors

/// Errors reported by the repository, the token mapper and the self-token fixer.
///
/// The variants follow the firmware status taxonomy so that a driver can hand
/// them back to its caller unchanged (see the `uefi` feature).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    /// A contract was violated: wrong lifecycle phase, out-of-range type id,
    /// zero size or count, or a corrupted type list.
    #[error("invalid parameter")]
    InvalidParameter,
    /// Reserving memory for an object copy or a grouped array failed.
    #[error("out of resources")]
    OutOfResources,
    /// The query was well-formed but nothing matches it.
    #[error("object not found")]
    NotFound,
    /// The token mapper has no free entry left.
    #[error("token mapper capacity exhausted")]
    BufferTooSmall,
    /// A single-initialization component was initialized twice.
    #[error("already started")]
    AlreadyStarted,
    /// The object kind references itself but has no token fixer.
    #[error("self-token fix-up not supported for this object kind")]
    Unsupported,
}

impl From<alloc::collections::TryReserveError> for RepoError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfResources
    }
}

#[cfg(feature = "uefi")]
impl From<RepoError> for uefi::Status {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidParameter => Self::INVALID_PARAMETER,
            RepoError::OutOfResources => Self::OUT_OF_RESOURCES,
            RepoError::NotFound => Self::NOT_FOUND,
            RepoError::BufferTooSmall => Self::BUFFER_TOO_SMALL,
            RepoError::AlreadyStarted => Self::ALREADY_STARTED,
            RepoError::Unsupported => Self::UNSUPPORTED,
        }
    }
}
