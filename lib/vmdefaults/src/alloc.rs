// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Storage bus slot allocation.
//!
//! Free slots are always recomputed from the devices currently in the
//! configuration, so the allocator holds no state of its own.

use std::collections::BTreeSet;

use crate::config::{DeviceKind, DeviceList, InterfaceType, VmConfiguration};
use crate::features::{GuestFeature, GuestFeatureQuery};
use crate::guest::{OsFamily, OsVersion};
use crate::host::CapabilityView;

/// Restricts where an attached backup disk may go on a Windows guest.
///
/// Windows probes IDE, then SATA, then SCSI for a boot disk and boots the
/// first clone of its system disk it finds. A backup image of that disk must
/// therefore sort after every in-use bootable hard disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackIndexLimit {
    iface: InterfaceType,
    stack_index: u32,
    active: bool,
}

impl StackIndexLimit {
    /// A limit that never restricts allocation.
    pub const fn inactive() -> Self {
        Self { iface: InterfaceType::Ide, stack_index: 0, active: false }
    }

    /// Builds the limit for adding a device of `kind` to `cfg`.
    pub fn for_device(cfg: &VmConfiguration, kind: DeviceKind) -> Self {
        let mut limit = Self::inactive();
        if kind != DeviceKind::AttachedBackupDisk
            || cfg.guest.family != OsFamily::Windows
        {
            return limit;
        }

        let bootable = cfg
            .startup
            .boot_order
            .iter()
            .filter(|e| e.kind == DeviceKind::HardDisk && e.in_use)
            .filter_map(|e| cfg.devices.hard_disk(e.index));

        for hdd in bootable {
            let iface = hdd.attachment.interface;
            let pref = iface.windows_boot_preference();
            let current = limit.iface.windows_boot_preference();
            if pref < current {
                continue;
            }
            if pref == current {
                limit.stack_index =
                    limit.stack_index.max(hdd.attachment.stack_index);
            } else {
                limit.iface = iface;
                limit.stack_index = hdd.attachment.stack_index;
            }
            limit.active = true;
        }

        limit
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn interface(&self) -> InterfaceType {
        self.iface
    }

    pub fn stack_index(&self) -> u32 {
        self.stack_index
    }

    /// Returns false if no slot on `iface` could satisfy this limit.
    pub fn has_free_stack_indices(&self, iface: InterfaceType) -> bool {
        !self.active
            || iface.windows_boot_preference()
                >= self.iface.windows_boot_preference()
    }

    /// Picks a slot on `iface` from the sorted set `free`.
    pub fn pick(
        &self,
        iface: InterfaceType,
        free: &BTreeSet<u32>,
    ) -> Option<u32> {
        if !self.active || iface != self.iface {
            return free.first().copied();
        }
        free.iter().copied().find(|slot| *slot > self.stack_index)
    }
}

impl Default for StackIndexLimit {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Finds free slots on storage buses.
#[derive(Clone, Copy, Debug)]
pub struct InterfaceAllocator<'a> {
    devices: &'a DeviceList,
    caps: CapabilityView<'a>,
}

impl<'a> InterfaceAllocator<'a> {
    pub fn new(devices: &'a DeviceList, caps: CapabilityView<'a>) -> Self {
        Self { devices, caps }
    }

    pub fn occupied_slots(&self, iface: InterfaceType) -> BTreeSet<u32> {
        self.devices
            .storage_attachments()
            .filter(|a| a.interface == iface)
            .map(|a| a.stack_index)
            .collect()
    }

    pub fn free_slots(&self, iface: InterfaceType) -> BTreeSet<u32> {
        let occupied = self.occupied_slots(iface);
        (0..self.caps.max_devices(iface))
            .filter(|slot| !occupied.contains(slot))
            .collect()
    }

    /// Returns a free slot on `iface` that satisfies `limit`.
    pub fn allocate(
        &self,
        iface: InterfaceType,
        limit: &StackIndexLimit,
    ) -> Option<u32> {
        if !limit.has_free_stack_indices(iface) {
            return None;
        }
        limit.pick(iface, &self.free_slots(iface))
    }
}

/// A bus and slot chosen for a new storage device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoragePlacement {
    pub interface: InterfaceType,
    pub stack_index: u32,
}

/// Chooses the bus and slot for a new hard disk, backup disk or optical
/// drive, or `None` if every candidate bus is full.
///
/// Guests with virtio drivers prefer SCSI, falling back to IDE unless the
/// guest is macOS. Optical drives on Windows and Debian stay on IDE so that
/// installers can boot from them. Other guests try IDE and then SCSI.
pub fn place_storage_device(
    cfg: &VmConfiguration,
    caps: CapabilityView<'_>,
    features: &dyn GuestFeatureQuery,
    kind: DeviceKind,
) -> Option<StoragePlacement> {
    let version = cfg.guest.version;
    let optical = kind == DeviceKind::OpticalDisk;
    let prefer_scsi = features.is_supported(version, GuestFeature::Virtio)
        && !(version.is_windows() && optical)
        && !(version == OsVersion::LIN_DEBIAN && optical);

    let candidates: &[InterfaceType] = if !prefer_scsi {
        &[InterfaceType::Ide, InterfaceType::Scsi]
    } else if version.is_valid_for(OsFamily::MacOs) {
        &[InterfaceType::Scsi]
    } else {
        &[InterfaceType::Scsi, InterfaceType::Ide]
    };

    let limit = StackIndexLimit::for_device(cfg, kind);
    let allocator = InterfaceAllocator::new(&cfg.devices, caps);
    candidates.iter().find_map(|iface| {
        allocator.allocate(*iface, &limit).map(|stack_index| StoragePlacement {
            interface: *iface,
            stack_index,
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{
        BootDeviceEntry, DeviceCommon, DiskImageType, HardDisk,
        StorageAttachment,
    };
    use crate::features::{BuiltinGuestFeatures, MockGuestFeatureQuery};
    use crate::guest::GuestIdentity;
    use crate::host::{HostCapabilitySnapshot, HostOsFamily, VtxMode};
    use proptest::prelude::*;

    fn hdd(index: u32, iface: InterfaceType, slot: u32) -> HardDisk {
        HardDisk {
            common: DeviceCommon::new(index, true, "harddisk.hdd"),
            attachment: StorageAttachment {
                interface: iface,
                stack_index: slot,
                sub_type: None,
            },
            image_type: DiskImageType::Expanding,
            size_mb: 65536,
            split: false,
            backup: false,
        }
    }

    fn boot_hdd(index: u32, in_use: bool) -> BootDeviceEntry {
        BootDeviceEntry {
            kind: DeviceKind::HardDisk,
            index,
            sequence: index,
            in_use,
        }
    }

    fn windows_vm(disks: &[(InterfaceType, u32)]) -> VmConfiguration {
        let mut cfg =
            VmConfiguration::new(GuestIdentity::new(OsVersion::WIN_XP));
        for (i, (iface, slot)) in disks.iter().enumerate() {
            cfg.devices.hard_disks.push(hdd(i as u32, *iface, *slot));
            cfg.startup.boot_order.push(boot_hdd(i as u32, true));
        }
        cfg
    }

    #[test]
    fn limit_inactive_for_other_kinds() {
        let cfg = windows_vm(&[(InterfaceType::Ide, 0)]);
        let limit = StackIndexLimit::for_device(&cfg, DeviceKind::HardDisk);
        assert!(!limit.is_active());
    }

    #[test]
    fn limit_inactive_for_non_windows() {
        let mut cfg = windows_vm(&[(InterfaceType::Ide, 0)]);
        cfg.guest = GuestIdentity::new(OsVersion::LIN_OTHER);
        let limit =
            StackIndexLimit::for_device(&cfg, DeviceKind::AttachedBackupDisk);
        assert!(!limit.is_active());
    }

    #[test]
    fn limit_ignores_disks_not_in_use() {
        let mut cfg = windows_vm(&[(InterfaceType::Ide, 0)]);
        cfg.startup.boot_order[0].in_use = false;
        let limit =
            StackIndexLimit::for_device(&cfg, DeviceKind::AttachedBackupDisk);
        assert!(!limit.is_active());
    }

    #[test]
    fn limit_tracks_least_preferred_bus() {
        let cfg = windows_vm(&[
            (InterfaceType::Ide, 2),
            (InterfaceType::Sata, 1),
            (InterfaceType::Ide, 3),
        ]);
        let limit =
            StackIndexLimit::for_device(&cfg, DeviceKind::AttachedBackupDisk);
        assert!(limit.is_active());
        assert_eq!(limit.interface(), InterfaceType::Sata);
        assert_eq!(limit.stack_index(), 1);
        assert!(!limit.has_free_stack_indices(InterfaceType::Ide));
        assert!(limit.has_free_stack_indices(InterfaceType::Sata));
        assert!(limit.has_free_stack_indices(InterfaceType::Scsi));
    }

    #[test]
    fn limit_takes_max_slot_on_same_bus() {
        let cfg =
            windows_vm(&[(InterfaceType::Ide, 1), (InterfaceType::Ide, 0)]);
        let limit =
            StackIndexLimit::for_device(&cfg, DeviceKind::AttachedBackupDisk);
        assert_eq!(limit.interface(), InterfaceType::Ide);
        assert_eq!(limit.stack_index(), 1);
    }

    #[test]
    fn allocator_skips_occupied_slots() {
        let cfg =
            windows_vm(&[(InterfaceType::Ide, 0), (InterfaceType::Ide, 2)]);
        let allocator =
            InterfaceAllocator::new(&cfg.devices, CapabilityView::new(None));
        let limit = StackIndexLimit::inactive();
        assert_eq!(
            allocator.free_slots(InterfaceType::Ide),
            BTreeSet::from([1, 3])
        );
        assert_eq!(allocator.allocate(InterfaceType::Ide, &limit), Some(1));
    }

    #[test]
    fn allocator_respects_host_capacity() {
        let mut host = HostCapabilitySnapshot::new(
            4,
            VtxMode::Vtx,
            8192,
            HostOsFamily::Linux,
        );
        host.interfaces.ide = 1;
        let cfg = windows_vm(&[(InterfaceType::Ide, 0)]);
        let caps = CapabilityView::new(Some(&host));
        let allocator = InterfaceAllocator::new(&cfg.devices, caps);
        let limit = StackIndexLimit::inactive();
        assert_eq!(allocator.allocate(InterfaceType::Ide, &limit), None);
    }

    #[test]
    fn backup_disk_lands_after_boot_disk() {
        let cfg = windows_vm(&[(InterfaceType::Ide, 0)]);
        let placement = place_storage_device(
            &cfg,
            CapabilityView::new(None),
            &BuiltinGuestFeatures,
            DeviceKind::AttachedBackupDisk,
        )
        .unwrap();
        assert_eq!(placement.interface, InterfaceType::Ide);
        assert_eq!(placement.stack_index, 1);
    }

    #[test]
    fn backup_disk_moves_to_scsi_when_ide_exhausted() {
        let cfg = windows_vm(&[(InterfaceType::Ide, 3)]);
        let placement = place_storage_device(
            &cfg,
            CapabilityView::new(None),
            &BuiltinGuestFeatures,
            DeviceKind::AttachedBackupDisk,
        )
        .unwrap();
        assert_eq!(placement.interface, InterfaceType::Scsi);
        assert_eq!(placement.stack_index, 0);
    }

    #[test]
    fn virtio_guest_prefers_scsi() {
        let cfg =
            VmConfiguration::new(GuestIdentity::new(OsVersion::LIN_UBUNTU));
        let caps = CapabilityView::new(None);
        let f = BuiltinGuestFeatures;
        let hdd = place_storage_device(&cfg, caps, &f, DeviceKind::HardDisk);
        assert_eq!(hdd.map(|p| p.interface), Some(InterfaceType::Scsi));
        let cd = place_storage_device(&cfg, caps, &f, DeviceKind::OpticalDisk);
        assert_eq!(cd.map(|p| p.interface), Some(InterfaceType::Scsi));
    }

    #[test]
    fn installer_media_stays_on_ide() {
        let caps = CapabilityView::new(None);
        let f = BuiltinGuestFeatures;
        for version in [OsVersion::WIN_10, OsVersion::LIN_DEBIAN] {
            let cfg = VmConfiguration::new(GuestIdentity::new(version));
            let cd =
                place_storage_device(&cfg, caps, &f, DeviceKind::OpticalDisk);
            assert_eq!(cd.map(|p| p.interface), Some(InterfaceType::Ide));
            let hdd =
                place_storage_device(&cfg, caps, &f, DeviceKind::HardDisk);
            assert_eq!(hdd.map(|p| p.interface), Some(InterfaceType::Scsi));
        }
    }

    #[test]
    fn virtio_macos_never_falls_back_to_ide() {
        let mut host = HostCapabilitySnapshot::new(
            4,
            VtxMode::Vtx,
            8192,
            HostOsFamily::Mac,
        );
        host.interfaces.scsi = 0;
        let cfg =
            VmConfiguration::new(GuestIdentity::new(OsVersion::MACOS_LEOPARD));

        let mut virtio = MockGuestFeatureQuery::new();
        virtio.expect_is_supported().return_const(true);
        let placement = place_storage_device(
            &cfg,
            CapabilityView::new(Some(&host)),
            &virtio,
            DeviceKind::HardDisk,
        );
        assert_eq!(placement, None);
    }

    #[test]
    fn placement_fails_when_all_buses_full() {
        let mut host = HostCapabilitySnapshot::new(
            4,
            VtxMode::Vtx,
            8192,
            HostOsFamily::Linux,
        );
        host.interfaces.ide = 0;
        host.interfaces.scsi = 0;
        let cfg = VmConfiguration::new(GuestIdentity::new(OsVersion::WIN_XP));
        let placement = place_storage_device(
            &cfg,
            CapabilityView::new(Some(&host)),
            &BuiltinGuestFeatures,
            DeviceKind::HardDisk,
        );
        assert_eq!(placement, None);
    }

    proptest! {
        #[test]
        fn allocations_fill_bus_exactly(capacity in 0u32..16) {
            let mut host = HostCapabilitySnapshot::new(
                1,
                VtxMode::None,
                1024,
                HostOsFamily::Linux,
            );
            host.interfaces.sata = capacity;
            let caps = CapabilityView::new(Some(&host));
            let mut cfg =
                VmConfiguration::new(GuestIdentity::new(OsVersion::WIN_XP));
            let limit = StackIndexLimit::inactive();

            for n in 0..capacity {
                let slot = InterfaceAllocator::new(&cfg.devices, caps)
                    .allocate(InterfaceType::Sata, &limit);
                prop_assert!(slot.is_some());
                let slot = slot.unwrap();
                cfg.devices.hard_disks.push(hdd(n, InterfaceType::Sata, slot));
            }

            let allocator = InterfaceAllocator::new(&cfg.devices, caps);
            let occupied = allocator.occupied_slots(InterfaceType::Sata);
            prop_assert_eq!(occupied.len() as u32, capacity);
            prop_assert!(occupied.iter().all(|s| *s < capacity));
            prop_assert_eq!(
                allocator.allocate(InterfaceType::Sata, &limit),
                None
            );
        }

        #[test]
        fn backup_never_precedes_boot_disk(
            k in 0u32..4,
            taken in proptest::collection::btree_set(0u32..4, 0..4),
        ) {
            let mut cfg = windows_vm(&[(InterfaceType::Ide, k)]);
            for (i, slot) in taken.iter().filter(|s| **s != k).enumerate() {
                let disk = hdd(10 + i as u32, InterfaceType::Ide, *slot);
                cfg.devices.hard_disks.push(disk);
            }
            let placement = place_storage_device(
                &cfg,
                CapabilityView::new(None),
                &BuiltinGuestFeatures,
                DeviceKind::AttachedBackupDisk,
            );
            if let Some(p) = placement {
                prop_assert!(
                    p.interface != InterfaceType::Ide || p.stack_index > k
                );
            }
        }
    }
}
