//! Capability header layouts.

use bitfield_struct::bitfield;

/// Header of a normal capability: one byte id, one byte link.
#[bitfield(u16)]
pub struct NormalCapHeader {
    pub id: u8,
    /// Offset of the next header; `0` ends the list. The low two bits are
    /// reserved and must be masked off.
    pub next: u8,
}

/// Header of an extended capability.
#[bitfield(u32)]
pub struct ExtendedCapHeader {
    pub id: u16,
    #[bits(4)]
    pub version: u8,
    /// Offset of the next header; `0` ends the list. The low two bits are
    /// reserved and must be masked off.
    #[bits(12)]
    pub next: u16,
}
