//! # Configuration-Manager Object Identifiers
//!
//! Every object handed to the repository carries a 32-bit composite identifier:
//!
//! ```text
//!  31      28 27                            8 7          0
//! ┌──────────┬──────────────────────────────┬────────────┐
//! │namespace │         reserved (0)         │  type id   │
//! └──────────┴──────────────────────────────┴────────────┘
//! ```
//!
//! The namespace selects one of the closed type enumerations below
//! ([`ArmObjectType`], [`RiscVObjectType`], [`ArchCommonObjectType`]); each
//! enumeration's `COUNT` is the exclusive upper bound for type ids in that
//! namespace.

use bitfield_struct::bitfield;
use core::fmt;

/// Composite object identifier (`namespace | type`).
///
/// Raw values can be built with [`ObjectId::from_bits`]; this is how callers
/// end up with identifiers the repository has to reject.
#[bitfield(u32)]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    /// Bits 0–7 — Type id within the namespace.
    pub object_type: u8,

    /// Bits 8–27 — Reserved (must be 0).
    #[bits(20, default = 0)]
    _reserved_8_27: u32,

    /// Bits 28–31 — Namespace id.
    #[bits(4)]
    pub namespace: u8,
}

impl ObjectId {
    /// Build the identifier for `object_type` within `namespace`.
    #[inline]
    #[must_use]
    pub const fn from_parts(namespace: Namespace, object_type: u8) -> Self {
        Self::new()
            .with_namespace(namespace as u8)
            .with_object_type(object_type)
    }

    /// Split the identifier into a known namespace and its type id.
    ///
    /// Returns `None` for unknown namespaces and for identifiers with any
    /// reserved bit set. The type id is *not* range checked here.
    #[must_use]
    pub const fn split(self) -> Option<(Namespace, u8)> {
        if self.into_bits() & Self::RESERVED_MASK != 0 {
            return None;
        }
        match Namespace::from_raw(self.namespace()) {
            Some(ns) => Some((ns, self.object_type())),
            None => None,
        }
    }

    const RESERVED_MASK: u32 = 0x0FFF_FF00;
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.split() {
            Some((ns, ty)) => write!(f, "{ns:?}:{ty}"),
            None => write!(f, "0x{:08X}", self.into_bits()),
        }
    }
}

/// Object namespaces understood by the repository.
///
/// The remaining 4-bit values (standard `0`, x64 `3`, OEM `8`, ...) are valid
/// on the wire but are not stored here.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    ArchCommon = 1,
    Arm = 2,
    RiscV = 4,
}

impl Namespace {
    /// Namespaces in the order [`finalize`](crate::DynamicPlatformRepository::finalize)
    /// groups them.
    pub const GROUPING_ORDER: [Self; 3] = [Self::Arm, Self::RiscV, Self::ArchCommon];

    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::ArchCommon),
            2 => Some(Self::Arm),
            4 => Some(Self::RiscV),
            _ => None,
        }
    }

    /// Exclusive upper bound of type ids in this namespace (`<namespace>Max`).
    #[must_use]
    pub const fn type_count(self) -> u8 {
        match self {
            Self::ArchCommon => ArchCommonObjectType::COUNT,
            Self::Arm => ArmObjectType::COUNT,
            Self::RiscV => RiscVObjectType::COUNT,
        }
    }
}

/// Declares a namespace's closed type enumeration.
///
/// Discriminants are assigned in declaration order starting at zero, so
/// `COUNT` doubles as the namespace maximum.
macro_rules! object_types {
    (
        $(#[$meta:meta])*
        pub enum $name:ident in $ns:ident {
            $( $(#[$vmeta:meta])* $variant:ident, )+
        }
    ) => {
        $(#[$meta])*
        #[repr(u8)]
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// All types in ascending id order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Number of types, i.e. the namespace maximum.
            #[allow(clippy::cast_possible_truncation)]
            pub const COUNT: u8 = Self::ALL.len() as u8;

            #[must_use]
            pub const fn from_raw(raw: u8) -> Option<Self> {
                if raw < Self::COUNT {
                    Some(Self::ALL[raw as usize])
                } else {
                    None
                }
            }

            /// The composite identifier of this type.
            #[must_use]
            pub const fn id(self) -> ObjectId {
                ObjectId::from_parts(Namespace::$ns, self as u8)
            }
        }

        impl From<$name> for ObjectId {
            fn from(value: $name) -> Self {
                value.id()
            }
        }
    };
}

object_types! {
    /// Arm-specific object kinds.
    pub enum ArmObjectType in Arm {
        Reserved,
        BootArchInfo,
        GicCInfo,
        GicDInfo,
        GicMsiFrameInfo,
        GicRedistributorInfo,
        GicItsInfo,
        GenericTimerInfo,
        PlatformGtBlockInfo,
        GtBlockTimerFrameInfo,
        PlatformGenericWatchdogInfo,
        /// IORT ITS group node; carries its own token.
        ItsGroup,
        /// IORT named component node; carries its own token.
        NamedComponent,
        /// IORT root complex node; carries its own token.
        RootComplex,
        /// IORT SMMUv1/v2 node; carries its own token.
        SmmuV1SmmuV2,
        /// IORT SMMUv3 node; carries its own token.
        SmmuV3,
        /// IORT PMCG node.
        Pmcg,
        GicItsIdentifierArray,
        IdMappingArray,
        SmmuInterruptArray,
        Cmn600Info,
        /// IORT reserved memory range node.
        Rmr,
        MemoryRangeDescriptor,
        EtInfo,
    }
}

object_types! {
    /// RISC-V-specific object kinds.
    pub enum RiscVObjectType in RiscV {
        Reserved,
        RintcInfo,
        ImsicInfo,
        AplicInfo,
        PlicInfo,
        IsaStringInfo,
        CmoInfo,
        TimerInfo,
    }
}

object_types! {
    /// Object kinds shared by all architectures.
    pub enum ArchCommonObjectType in ArchCommon {
        Reserved,
        PowerManagementProfileInfo,
        SerialPortInfo,
        ConsolePortInfo,
        SerialDebugPortInfo,
        HypervisorVendorIdentity,
        FixedFeatureFlags,
        /// Array of cross-reference records; the only kind that may be
        /// submitted with a count above one.
        CmRef,
        PciConfigSpaceInfo,
        PciAddressMapInfo,
        PciInterruptMapInfo,
        MemoryAffinityInfo,
        DeviceHandleAcpi,
        DeviceHandlePci,
        GenericInitiatorAffinityInfo,
        LpiInfo,
        ProcHierarchyInfo,
        CacheInfo,
        CpcInfo,
        PccSubspaceType0Info,
        PccSubspaceType1Info,
        PccSubspaceType2Info,
        PccSubspaceType3Info,
        PccSubspaceType4Info,
        PccSubspaceType5Info,
        PsdInfo,
        Tpm2InterfaceInfo,
        SpmiInterfaceInfo,
        SpmiInterruptDeviceInfo,
    }
}

/// Identifier of the cross-reference array kind.
pub const CM_REF: ObjectId = ArchCommonObjectType::CmRef.id();
