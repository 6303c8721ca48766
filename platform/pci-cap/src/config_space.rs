//! # PCI Configuration Space Access
//!
//! The capability parser only needs byte-granular reads and writes at an
//! offset into one function's configuration space. [`ConfigSpace`] is that
//! seam; implement it over port I/O, ECAM, a firmware protocol, or use
//! [`ConfigSpaceImage`] for an in-memory copy.
//!
//! All multi-byte values are little-endian, as on the PCI bus.

use crate::error::CapError;
use alloc::vec;
use alloc::vec::Vec;

/// Offset of the 16-bit status register.
pub const STATUS_OFFSET: u16 = 0x06;

/// Status register bit: the function implements a capability list.
pub const STATUS_CAPABILITIES_LIST: u16 = 1 << 4;

/// Offset of the 8-bit pointer to the first normal capability.
pub const CAPABILITY_POINTER_OFFSET: u16 = 0x34;

/// Exclusive end of the normal (conventional PCI) configuration space.
pub const NORMAL_CONFIG_SPACE_END: u16 = 0x100;

/// Exclusive end of the extended (PCI Express) configuration space.
pub const EXTENDED_CONFIG_SPACE_END: u16 = 0x1000;

/// Offset of the first extended capability header.
pub const FIRST_EXTENDED_OFFSET: u16 = 0x100;

/// Byte-addressable configuration space of one PCI function.
pub trait ConfigSpace {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    /// An implementation-defined error, typically [`CapError::DeviceError`].
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), CapError>;

    /// Store `buf` starting at `offset`.
    ///
    /// # Errors
    /// An implementation-defined error, typically [`CapError::DeviceError`].
    fn write(&mut self, offset: u16, buf: &[u8]) -> Result<(), CapError>;

    /// # Errors
    /// See [`read`](Self::read).
    fn read_u8(&mut self, offset: u16) -> Result<u8, CapError> {
        let mut raw = [0u8; 1];
        self.read(offset, &mut raw)?;
        Ok(raw[0])
    }

    /// # Errors
    /// See [`read`](Self::read).
    fn read_u16(&mut self, offset: u16) -> Result<u16, CapError> {
        let mut raw = [0u8; 2];
        self.read(offset, &mut raw)?;
        Ok(u16::from_le_bytes(raw))
    }

    /// # Errors
    /// See [`read`](Self::read).
    fn read_u32(&mut self, offset: u16) -> Result<u32, CapError> {
        let mut raw = [0u8; 4];
        self.read(offset, &mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    /// # Errors
    /// See [`write`](Self::write).
    fn write_u8(&mut self, offset: u16, value: u8) -> Result<(), CapError> {
        self.write(offset, &[value])
    }

    /// # Errors
    /// See [`write`](Self::write).
    fn write_u16(&mut self, offset: u16, value: u16) -> Result<(), CapError> {
        self.write(offset, &value.to_le_bytes())
    }

    /// # Errors
    /// See [`write`](Self::write).
    fn write_u32(&mut self, offset: u16, value: u32) -> Result<(), CapError> {
        self.write(offset, &value.to_le_bytes())
    }
}

impl<T: ConfigSpace + ?Sized> ConfigSpace for &mut T {
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), CapError> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: u16, buf: &[u8]) -> Result<(), CapError> {
        (**self).write(offset, buf)
    }
}

/// In-memory copy of a configuration space.
///
/// Accesses outside the image fail with [`CapError::DeviceError`], which is
/// what a conventional PCI function reports for the extended range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSpaceImage {
    bytes: Vec<u8>,
}

impl ConfigSpaceImage {
    /// A zeroed 256-byte conventional configuration space.
    #[must_use]
    pub fn normal() -> Self {
        Self {
            bytes: vec![0; usize::from(NORMAL_CONFIG_SPACE_END)],
        }
    }

    /// A zeroed 4 KiB PCI Express configuration space.
    #[must_use]
    pub fn extended() -> Self {
        Self {
            bytes: vec![0; usize::from(EXTENDED_CONFIG_SPACE_END)],
        }
    }

    /// Wrap a captured configuration space.
    ///
    /// # Errors
    /// [`CapError::InvalidParameter`] if `bytes` is larger than 4 KiB.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CapError> {
        if bytes.len() > usize::from(EXTENDED_CONFIG_SPACE_END) {
            return Err(CapError::InvalidParameter);
        }
        Ok(Self { bytes })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, offset: u16, len: usize) -> Result<core::ops::Range<usize>, CapError> {
        let start = usize::from(offset);
        let end = start.checked_add(len).ok_or(CapError::DeviceError)?;
        if end > self.bytes.len() {
            return Err(CapError::DeviceError);
        }
        Ok(start..end)
    }
}

impl ConfigSpace for ConfigSpaceImage {
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), CapError> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: u16, buf: &[u8]) -> Result<(), CapError> {
        let range = self.range(offset, buf.len())?;
        self.bytes[range].copy_from_slice(buf);
        Ok(())
    }
}
