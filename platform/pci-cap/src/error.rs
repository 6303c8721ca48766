/// Errors reported while building or using a [`CapabilityList`](crate::CapabilityList).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapError {
    /// The request does not make sense for this list, e.g. a capability
    /// that belongs to a different list.
    #[error("invalid parameter")]
    InvalidParameter,
    /// The index could not be allocated.
    #[error("out of resources")]
    OutOfResources,
    /// No capability matches the query.
    #[error("capability not found")]
    NotFound,
    /// The access would leave the capability's reachable span.
    #[error("access exceeds the capability's size hint")]
    BufferTooSmall,
    /// The capability lists are malformed (cyclic, overlapping or out of
    /// range), or the configuration space could not be accessed.
    #[error("device error")]
    DeviceError,
}

impl From<alloc::collections::TryReserveError> for CapError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfResources
    }
}

#[cfg(feature = "uefi")]
impl From<CapError> for uefi::Status {
    fn from(value: CapError) -> Self {
        match value {
            CapError::InvalidParameter => Self::INVALID_PARAMETER,
            CapError::OutOfResources => Self::OUT_OF_RESOURCES,
            CapError::NotFound => Self::NOT_FOUND,
            CapError::BufferTooSmall => Self::BUFFER_TOO_SMALL,
            CapError::DeviceError => Self::DEVICE_ERROR,
        }
    }
}
