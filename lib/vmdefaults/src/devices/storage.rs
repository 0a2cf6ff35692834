// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::debug;

use super::{image_name, unused_index, AddDeviceError, DefaultDeviceFactory};
use crate::alloc::{place_storage_device, StoragePlacement};
use crate::config::{
    DeviceCommon, DeviceDescriptor, DeviceKind, DiskImageType, HardDisk,
    InterfaceType, OpticalDisk, OpticalEmulation, StorageAttachment,
    VmConfiguration,
};
use crate::features::scsi_sub_type;
use crate::host::HostFeature;
use crate::sizing::default_hdd_size;

impl DefaultDeviceFactory<'_> {
    fn attachment(
        &self,
        cfg: &VmConfiguration,
        kind: DeviceKind,
    ) -> Result<StorageAttachment, AddDeviceError> {
        let StoragePlacement { interface, stack_index } =
            place_storage_device(cfg, self.caps, self.features, kind)
                .ok_or(AddDeviceError::NoFreeSlot(kind))?;

        let sub_type = match interface {
            InterfaceType::Scsi => {
                scsi_sub_type(self.features, cfg.guest.version)
            }
            _ => None,
        };
        debug!(self.log, "placed storage device";
            "kind" => %kind,
            "interface" => %interface,
            "stack_index" => stack_index);

        Ok(StorageAttachment { interface, stack_index, sub_type })
    }

    pub(super) fn hard_disk(
        &self,
        cfg: &VmConfiguration,
        kind: DeviceKind,
    ) -> Result<DeviceDescriptor, AddDeviceError> {
        let index = unused_index(cfg.devices.indices(DeviceKind::HardDisk));
        let attachment = self.attachment(cfg, kind)?;

        let image_type = if self.caps.has_feature(HostFeature::PlainDiskAllowed)
        {
            DiskImageType::Plain
        } else {
            DiskImageType::Expanding
        };

        Ok(DeviceDescriptor::HardDisk(HardDisk {
            common: DeviceCommon::new(
                index,
                true,
                image_name("harddisk", "hdd", index),
            ),
            attachment,
            image_type,
            size_mb: default_hdd_size(cfg.guest.version),
            split: false,
            backup: kind == DeviceKind::AttachedBackupDisk,
        }))
    }

    pub(super) fn optical_disk(
        &self,
        cfg: &VmConfiguration,
    ) -> Result<DeviceDescriptor, AddDeviceError> {
        let attachment = self.attachment(cfg, DeviceKind::OpticalDisk)?;
        let index = unused_index(cfg.devices.indices(DeviceKind::OpticalDisk));

        Ok(DeviceDescriptor::OpticalDisk(OpticalDisk {
            common: DeviceCommon::new(index, true, String::new()),
            attachment,
            emulation: OpticalEmulation::Image,
            remote: false,
            passthrough: false,
        }))
    }
}
