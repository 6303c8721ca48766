//! Capability list discovery and lookup.

use crate::capability::{CapDomain, CapKey, Capability, CapabilityInfo, Instances};
use crate::config_space::{
    CAPABILITY_POINTER_OFFSET, ConfigSpace, FIRST_EXTENDED_OFFSET, STATUS_CAPABILITIES_LIST,
    STATUS_OFFSET,
};
use crate::error::CapError;
use crate::header::{ExtendedCapHeader, NormalCapHeader};
use alloc::vec::Vec;
use log::{debug, error, info, trace};

/// Normal capability id of the PCI Express capability structure. Its presence
/// means the function has an extended configuration space.
pub const PCI_EXPRESS_CAPABILITY_ID: u8 = 0x10;

/// The low two bits of every capability pointer are reserved.
const POINTER_MASK: u16 = !0x3;

/// Index of every capability a PCI function exposes.
///
/// ```text
///   records   [ cap @0x40 | cap @0x50 | cap @0x100 | ... ]   discovery order
///                  ▲            ▲           ▲
///   by_key    [(Normal,0x01,0), (Normal,0x05,0), (Extended,0x01,0), ...]
/// ```
///
/// The list is a snapshot; it is not updated if the device changes later.
#[derive(Debug, Default)]
pub struct CapabilityList {
    records: Vec<Capability>,
    by_key: Vec<(CapKey, usize)>,
}

impl CapabilityList {
    /// Walk the normal list and, for PCI Express functions, the extended list.
    ///
    /// On failure nothing is returned; the partial index is dropped.
    ///
    /// # Errors
    /// * [`CapError::DeviceError`] for a cycle, two capabilities at the same
    ///   offset, an extended pointer below `0x100`, or a failed medium read.
    /// * [`CapError::OutOfResources`] if the index cannot grow.
    pub fn build<M: ConfigSpace + ?Sized>(dev: &mut M) -> Result<Self, CapError> {
        let mut builder = Builder::default();

        let status = dev.read_u16(STATUS_OFFSET)?;
        let mut pcie = false;
        if status & STATUS_CAPABILITIES_LIST != 0 {
            let mut offset = u16::from(dev.read_u8(CAPABILITY_POINTER_OFFSET)?) & POINTER_MASK;
            while offset != 0 {
                let header = NormalCapHeader::from_bits(dev.read_u16(offset)?);
                builder.insert(CapDomain::Normal, header.id().into(), offset, 0)?;
                pcie |= header.id() == PCI_EXPRESS_CAPABILITY_ID;
                offset = u16::from(header.next()) & POINTER_MASK;
            }
        }

        if pcie {
            let mut offset = FIRST_EXTENDED_OFFSET;
            while offset != 0 {
                if offset < FIRST_EXTENDED_OFFSET {
                    error!("extended capability pointer {offset:#05x} below {FIRST_EXTENDED_OFFSET:#05x}");
                    return Err(CapError::DeviceError);
                }
                let header = ExtendedCapHeader::from_bits(dev.read_u32(offset)?);
                if offset == FIRST_EXTENDED_OFFSET && header.into_bits() == 0 {
                    // PCI Express function without extended capabilities
                    break;
                }
                builder.insert(CapDomain::Extended, header.id(), offset, header.version())?;
                offset = header.next() & POINTER_MASK;
            }
        }

        let list = builder.finish();
        info!(
            "found {} PCI capabilities{}",
            list.len(),
            if pcie { " (PCI Express)" } else { "" }
        );
        Ok(list)
    }

    /// Look up instance `instance` of capability `id` in `domain`.
    ///
    /// # Errors
    /// [`CapError::NotFound`] if there is no such capability.
    pub fn find(&self, domain: CapDomain, id: u16, instance: u16) -> Result<&Capability, CapError> {
        let key = CapKey {
            domain,
            id,
            instance,
        };
        self.by_key
            .binary_search_by_key(&key, |&(k, _)| k)
            .map(|pos| &self.records[self.by_key[pos].1])
            .map_err(|_| CapError::NotFound)
    }

    /// First instance (lowest instance number) of capability `id` in `domain`
    /// whose version is at least `min_version`.
    ///
    /// Normal capabilities have version `0`, so this only finds them with
    /// `min_version == 0`.
    ///
    /// # Errors
    /// [`CapError::NotFound`] if no instance qualifies.
    pub fn find_at_version(
        &self,
        domain: CapDomain,
        id: u16,
        min_version: u8,
    ) -> Result<&Capability, CapError> {
        let first = CapKey {
            domain,
            id,
            instance: 0,
        };
        let start = self.by_key.partition_point(|&(k, _)| k < first);
        self.by_key[start..]
            .iter()
            .take_while(|(k, _)| k.domain == domain && k.id == id)
            .map(|&(_, handle)| &self.records[handle])
            .find(|cap| cap.version >= min_version)
            .ok_or(CapError::NotFound)
    }

    /// Properties of `cap`, including how many instances share its id.
    ///
    /// # Errors
    /// [`CapError::InvalidParameter`] if `cap` was not produced by this list.
    pub fn info(&self, cap: &Capability) -> Result<CapabilityInfo, CapError> {
        let found = self
            .find(cap.domain(), cap.id(), cap.instance())
            .map_err(|_| CapError::InvalidParameter)?;
        if found != cap {
            return Err(CapError::InvalidParameter);
        }

        Ok(CapabilityInfo {
            domain: cap.domain(),
            id: cap.id(),
            instance: cap.instance(),
            num_instances: self.num_instances(cap)?,
            offset: cap.offset,
            version: cap.version,
            max_size_hint: cap.max_size_hint,
        })
    }

    fn num_instances(&self, cap: &Capability) -> Result<u16, CapError> {
        let owner = match cap.instances {
            Instances::Owner { count } => return Ok(count),
            Instances::Instance { owner } => owner,
        };
        match self.records.get(owner).map(|rec| rec.instances) {
            Some(Instances::Owner { count }) => Ok(count),
            _ => Err(CapError::InvalidParameter),
        }
    }

    /// All capabilities in key order: normal before extended, then by id, then
    /// by instance.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.by_key.iter().map(|&(_, handle)| &self.records[handle])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Log every capability in configuration space order at trace level.
    pub fn dump(&self) {
        let mut by_offset: Vec<&Capability> = self.records.iter().collect();
        by_offset.sort_unstable_by_key(|cap| cap.offset);
        for cap in by_offset {
            trace!(
                "{:#05x} {} id={:#06x} ver={} inst={} hint={:#x}",
                cap.offset,
                cap.domain(),
                cap.id(),
                cap.version,
                cap.instance(),
                cap.max_size_hint
            );
        }
    }
}

/// Construction state: the list being built plus an offset index that is
/// only needed to detect loops and derive the size hints.
#[derive(Default)]
struct Builder {
    list: CapabilityList,
    by_offset: Vec<(u16, usize)>,
}

impl Builder {
    fn insert(
        &mut self,
        domain: CapDomain,
        id: u16,
        offset: u16,
        version: u8,
    ) -> Result<(), CapError> {
        let Err(offset_pos) = self.by_offset.binary_search_by_key(&offset, |&(o, _)| o) else {
            error!("capability list revisits offset {offset:#05x}");
            return Err(CapError::DeviceError);
        };

        let handle = self.list.records.len();
        let owner_key = CapKey {
            domain,
            id,
            instance: 0,
        };
        let owner = self
            .list
            .by_key
            .binary_search_by_key(&owner_key, |&(k, _)| k)
            .ok()
            .map(|pos| self.list.by_key[pos].1);

        let (instance, instances) = match owner {
            None => (0, Instances::Owner { count: 1 }),
            Some(owner) => match self.list.records[owner].instances {
                Instances::Owner { count } => (count, Instances::Instance { owner }),
                Instances::Instance { .. } => return Err(CapError::DeviceError),
            },
        };
        let key = CapKey {
            domain,
            id,
            instance,
        };
        let Err(key_pos) = self.list.by_key.binary_search_by_key(&key, |&(k, _)| k) else {
            return Err(CapError::DeviceError);
        };

        self.list.records.try_reserve(1)?;
        self.list.by_key.try_reserve(1)?;
        self.by_offset.try_reserve(1)?;

        if let Some(owner) = owner
            && let Instances::Owner { count } = &mut self.list.records[owner].instances
        {
            *count = count.checked_add(1).ok_or(CapError::DeviceError)?;
        }
        self.list.records.push(Capability {
            key,
            offset,
            version,
            max_size_hint: 0,
            instances,
        });
        self.list.by_key.insert(key_pos, (key, handle));
        self.by_offset.insert(offset_pos, (offset, handle));

        debug!("capability {domain} id={id:#06x} ver={version} inst={instance} at {offset:#05x}");
        Ok(())
    }

    /// Derive each capability's size hint from the offset index and drop the
    /// index.
    fn finish(mut self) -> CapabilityList {
        for (i, &(offset, handle)) in self.by_offset.iter().enumerate() {
            let domain = self.list.records[handle].key.domain;
            let end = match self.by_offset.get(i + 1) {
                Some(&(next, next_handle))
                    if self.list.records[next_handle].key.domain == domain =>
                {
                    next
                }
                _ => domain.config_space_end(),
            };
            self.list.records[handle].max_size_hint = end - offset;
        }
        self.list
    }
}
