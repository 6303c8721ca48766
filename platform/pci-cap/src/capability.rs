//! A single discovered capability and the bounded I/O on it.

use crate::config_space::{ConfigSpace, EXTENDED_CONFIG_SPACE_END, NORMAL_CONFIG_SPACE_END};
use crate::error::CapError;
use core::fmt;

/// Which of the two capability lists a capability was found on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapDomain {
    /// Conventional capability list, reached through the pointer at `0x34`.
    Normal,
    /// PCI Express extended capability list, starting at `0x100`.
    Extended,
}

impl CapDomain {
    /// Exclusive end of the configuration space region the domain lives in.
    #[must_use]
    pub const fn config_space_end(self) -> u16 {
        match self {
            Self::Normal => NORMAL_CONFIG_SPACE_END,
            Self::Extended => EXTENDED_CONFIG_SPACE_END,
        }
    }
}

impl fmt::Display for CapDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Extended => f.write_str("extended"),
        }
    }
}

/// Lookup key of a capability. Keys are unique within a list.
///
/// Instances of the same `(domain, id)` are numbered from `0` in discovery
/// order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapKey {
    pub domain: CapDomain,
    pub id: u16,
    pub instance: u16,
}

/// Instance bookkeeping. Handles are indices into the owning list's arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Instances {
    /// Instance 0; tracks how many instances share its `(domain, id)`.
    Owner { count: u16 },
    /// Any later instance; points back at instance 0.
    Instance { owner: usize },
}

/// A capability as found on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub(crate) key: CapKey,
    pub(crate) offset: u16,
    pub(crate) version: u8,
    pub(crate) max_size_hint: u16,
    pub(crate) instances: Instances,
}

impl Capability {
    #[must_use]
    pub const fn key(&self) -> CapKey {
        self.key
    }

    #[must_use]
    pub const fn domain(&self) -> CapDomain {
        self.key.domain
    }

    #[must_use]
    pub const fn id(&self) -> u16 {
        self.key.id
    }

    #[must_use]
    pub const fn instance(&self) -> u16 {
        self.key.instance
    }

    /// Offset of the capability header in configuration space.
    #[must_use]
    pub const fn offset(&self) -> u16 {
        self.offset
    }

    /// Extended capability version; always `0` for normal capabilities.
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Upper bound on the capability's size: the distance to the next
    /// capability header in the same domain, or to the end of the domain's
    /// region. The real structure may be shorter.
    #[must_use]
    pub const fn max_size_hint(&self) -> u16 {
        self.max_size_hint
    }

    /// Read `buf.len()` bytes starting `source_offset` bytes into the
    /// capability.
    ///
    /// # Errors
    /// * [`CapError::BufferTooSmall`] if the range leaves the size hint; the
    ///   medium is not touched in that case.
    /// * Any error the medium reports.
    pub fn read<M: ConfigSpace + ?Sized>(
        &self,
        dev: &mut M,
        source_offset: u16,
        buf: &mut [u8],
    ) -> Result<(), CapError> {
        let at = self.checked_span(source_offset, buf.len())?;
        dev.read(at, buf)
    }

    /// Write `buf` starting `dest_offset` bytes into the capability.
    ///
    /// # Errors
    /// * [`CapError::BufferTooSmall`] if the range leaves the size hint; the
    ///   medium is not touched in that case.
    /// * Any error the medium reports.
    pub fn write<M: ConfigSpace + ?Sized>(
        &self,
        dev: &mut M,
        dest_offset: u16,
        buf: &[u8],
    ) -> Result<(), CapError> {
        let at = self.checked_span(dest_offset, buf.len())?;
        dev.write(at, buf)
    }

    /// Absolute configuration space offset of `[offset, offset + len)`.
    fn checked_span(&self, offset: u16, len: usize) -> Result<u16, CapError> {
        let len = u16::try_from(len).map_err(|_| CapError::BufferTooSmall)?;
        match offset.checked_add(len) {
            Some(end) if end <= self.max_size_hint => Ok(self.offset + offset),
            _ => Err(CapError::BufferTooSmall),
        }
    }
}

/// Snapshot of a capability's properties, see
/// [`CapabilityList::info`](crate::CapabilityList::info).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CapabilityInfo {
    pub domain: CapDomain,
    pub id: u16,
    pub instance: u16,
    /// Number of capabilities sharing this `(domain, id)`.
    pub num_instances: u16,
    pub offset: u16,
    pub version: u8,
    pub max_size_hint: u16,
}
