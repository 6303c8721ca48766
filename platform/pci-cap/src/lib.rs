//! # PCI Capability Lists
//!
//! Walks the capability lists of a single PCI function once and indexes the
//! result, so drivers can look capabilities up by id and access them without
//! re-walking configuration space.
//!
//! ```text
//! 0x000 ┌──────────────────────┐
//!       │ header (status 0x06, │
//!       │  cap pointer 0x34) ──┼──┐
//! 0x040 │ normal caps ◀────────┼──┘  id:u8  next:u8
//!       │  ...                 │
//! 0x100 ├──────────────────────┤
//!       │ extended caps        │     id:u16 ver:u4 next:u12
//!       │  ...                 │     (only if the PCI Express cap is present)
//! 0x1000└──────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! * [`ConfigSpace`]: the medium, byte reads and writes at an offset
//! * [`ConfigSpaceImage`]: an in-memory medium
//! * [`CapabilityList`]: discovery, lookup by `(domain, id, instance)` and by
//!   minimum version
//! * [`Capability`]: one capability, with reads and writes bounded by its
//!   size hint
//!
//! ## Malformed Devices
//!
//! Lists that loop, overlap, or point below `0x100` from the extended list
//! make [`CapabilityList::build`] fail with [`CapError::DeviceError`]. A
//! partially built list is never returned.
//!
//! ## Example
//!
//! ```
//! use pci_cap::{CapDomain, CapabilityList, ConfigSpace, ConfigSpaceImage};
//!
//! let mut dev = ConfigSpaceImage::normal();
//! dev.write_u16(0x06, 1 << 4).unwrap(); // capabilities list present
//! dev.write_u8(0x34, 0x40).unwrap();
//! dev.write_u16(0x40, 0x0005).unwrap(); // MSI, end of list
//!
//! let caps = CapabilityList::build(&mut dev).unwrap();
//! let msi = caps.find(CapDomain::Normal, 0x05, 0).unwrap();
//! assert_eq!(msi.offset(), 0x40);
//! assert_eq!(msi.max_size_hint(), 0xC0);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod capability;
pub mod config_space;
pub mod error;
mod header;
pub mod list;

pub use capability::{CapDomain, CapKey, Capability, CapabilityInfo};
pub use config_space::{
    CAPABILITY_POINTER_OFFSET, ConfigSpace, ConfigSpaceImage, EXTENDED_CONFIG_SPACE_END,
    FIRST_EXTENDED_OFFSET, NORMAL_CONFIG_SPACE_END, STATUS_CAPABILITIES_LIST, STATUS_OFFSET,
};
pub use error::CapError;
pub use list::{CapabilityList, PCI_EXPRESS_CAPABILITY_ID};
